//! Events command - follow live events of one session.

use anyhow::{Result, bail};
use clap::Args;
use console::Style;
use tether_client::AppLifecycle;
use tether_stream::{SessionEvent, StreamEndpoint, StreamTransport, TransportEvent};

use super::Context;

/// Arguments for the events command.
#[derive(Args, Debug)]
pub struct EventsArgs {
    /// Session ID to follow
    pub session_id: String,

    /// Stop after this many events
    #[arg(short = 'n', long)]
    pub count: Option<usize>,
}

/// Run the events command.
pub async fn run(args: EventsArgs, ctx: &Context) -> Result<()> {
    let client = ctx.client()?;
    let transport = StreamTransport::new(
        client.clone(),
        ctx.config.stream.clone(),
        ctx.network(),
        AppLifecycle::new(),
    );
    let endpoint = StreamEndpoint::session_events(&client, Some(&args.session_id))?;
    let (handle, mut events) = transport.open(endpoint);

    let dim = Style::new().dim();
    let mut seen = 0usize;

    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = tokio::signal::ctrl_c() => break,
        };
        let Some(event) = event else { break };

        match event {
            TransportEvent::Event(event) => {
                if ctx.json_output {
                    println!("{}", serde_json::to_string(&event)?);
                } else {
                    println!("{}", describe(&event));
                }
                seen += 1;
                if args.count.is_some_and(|n| seen >= n) {
                    break;
                }
            }
            TransportEvent::Connected if !ctx.json_output => {
                eprintln!("{}", dim.apply_to(format!("Following {}", args.session_id)));
            }
            TransportEvent::Reconnecting { attempt, delay } if !ctx.json_output => {
                eprintln!(
                    "{}",
                    dim.apply_to(format!(
                        "Connection lost, retrying in {}ms (attempt {})",
                        delay.as_millis(),
                        attempt
                    ))
                );
            }
            TransportEvent::Error(e) => {
                handle.close();
                bail!("Event stream failed: {}", e);
            }
            _ => {}
        }
    }

    handle.close();
    Ok(())
}

/// One-line human summary of an event.
fn describe(event: &SessionEvent) -> String {
    let props = &event.properties;
    match (&props.message_id, part_kind(event)) {
        (Some(message), Some(kind)) => format!("{} {} ({})", event.kind, message, kind),
        (Some(message), None) => format!("{} {}", event.kind, message),
        (None, _) => event.kind.clone(),
    }
}

fn part_kind(event: &SessionEvent) -> Option<&str> {
    event.properties.part.as_ref()?.get("type")?.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(value: serde_json::Value) -> SessionEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_describe() {
        let bare = event(serde_json::json!({ "type": "session.idle", "properties": { "sessionID": "s" } }));
        assert_eq!(describe(&bare), "session.idle");

        let part = event(serde_json::json!({
            "type": "message.part.updated",
            "properties": { "sessionID": "s", "messageID": "m1", "part": { "type": "text" } }
        }));
        assert_eq!(describe(&part), "message.part.updated m1 (text)");
    }
}
