//! New command - create a session.

use anyhow::Result;
use clap::Args;
use console::Style;
use tether_client::CreateSessionRequest;

use super::Context;

/// Arguments for the new command.
#[derive(Args, Debug)]
pub struct NewArgs {
    /// Session title
    #[arg(short, long)]
    pub title: Option<String>,

    /// Fork from this session
    #[arg(long)]
    pub parent: Option<String>,
}

/// Run the new command.
pub async fn run(args: NewArgs, ctx: &Context) -> Result<()> {
    let sync = ctx.sync()?;
    let session = sync
        .create_session(CreateSessionRequest {
            title: args.title,
            parent_id: args.parent,
        })
        .await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        let green = Style::new().green();
        let dim = Style::new().dim();
        println!(
            "{} Session created: {}",
            green.apply_to("✓"),
            dim.apply_to(&session.id)
        );
    }
    Ok(())
}
