//! Messages command - show a session's conversation.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use tether_client::Message;

use super::{Context, format_time};

/// Arguments for the messages command.
#[derive(Args, Debug)]
pub struct MessagesArgs {
    /// Session ID
    pub session_id: String,

    /// Fetch from the server even if the cached copy is fresh
    #[arg(short, long)]
    pub refresh: bool,
}

/// Run the messages command.
pub async fn run(args: MessagesArgs, ctx: &Context) -> Result<()> {
    let sync = ctx.sync()?;
    let result = sync.fetch_messages(&args.session_id, args.refresh).await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let dim = Style::new().dim();

    if result.messages.is_empty() {
        println!("{}", dim.apply_to("No messages"));
    }
    for message in &result.messages {
        println!(
            "{} {}",
            style(&message.info.role).cyan().bold(),
            dim.apply_to(format_time(message.created()))
        );
        for text in text_parts(message) {
            println!("{}", text);
        }
        println!();
    }

    if result.from_cache {
        let note = if result.is_complete {
            "From cache"
        } else {
            "From cache (history may be incomplete)"
        };
        println!("{}", dim.apply_to(note));
    }

    Ok(())
}

fn text_parts(message: &Message) -> impl Iterator<Item = &str> {
    message.parts.iter().filter_map(|part| {
        (part.get("type")?.as_str()? == "text")
            .then(|| part.get("text")?.as_str())
            .flatten()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_parts_skips_other_kinds() {
        let message: Message = serde_json::from_value(serde_json::json!({
            "info": { "id": "m1", "sessionID": "s", "role": "assistant", "time": { "created": 1 } },
            "parts": [
                { "type": "text", "text": "hello" },
                { "type": "tool", "tool": "bash" },
                { "type": "text", "text": "world" }
            ]
        }))
        .unwrap();

        assert_eq!(text_parts(&message).collect::<Vec<_>>(), vec!["hello", "world"]);
    }
}
