//! Rename command - change a session's title.

use anyhow::Result;
use clap::Args;
use console::Style;
use tether_client::UpdateSessionRequest;

use super::Context;

/// Arguments for the rename command.
#[derive(Args, Debug)]
pub struct RenameArgs {
    /// Session ID
    pub session_id: String,

    /// New title
    pub title: String,
}

/// Run the rename command.
pub async fn run(args: RenameArgs, ctx: &Context) -> Result<()> {
    let sync = ctx.sync()?;
    let session = sync
        .update_session(
            &args.session_id,
            UpdateSessionRequest {
                title: Some(args.title),
            },
        )
        .await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        let green = Style::new().green();
        println!("{} Renamed to \"{}\"", green.apply_to("✓"), session.title);
    }
    Ok(())
}
