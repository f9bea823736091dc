//! Delete command - delete a session locally and on the server.

use anyhow::Result;
use clap::Args;
use console::Style;
use serde::Serialize;
use tether_sync::SyncError;

use super::Context;

/// Arguments for the delete command.
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Session ID
    pub session_id: String,
}

#[derive(Debug, Serialize)]
struct DeleteOutput<'a> {
    session_id: &'a str,
    removed_locally: bool,
    deleted_remotely: bool,
}

/// Run the delete command.
pub async fn run(args: DeleteArgs, ctx: &Context) -> Result<()> {
    let sync = ctx.sync()?;
    let outcome = sync.delete_session(&args.session_id).await;

    // Only a cache failure leaves the local copy in place
    let removed_locally = !matches!(outcome, Err(SyncError::Cache(_)));
    let deleted_remotely = outcome.is_ok();

    if ctx.json_output {
        let output = DeleteOutput {
            session_id: &args.session_id,
            removed_locally,
            deleted_remotely,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        match &outcome {
            Ok(()) => {
                let green = Style::new().green();
                println!("{} Session deleted", green.apply_to("✓"));
            }
            Err(_) if removed_locally => {
                let yellow = Style::new().yellow();
                eprintln!("{} Removed from the local cache only", yellow.apply_to("!"));
            }
            Err(_) => {}
        }
    }

    outcome.map_err(Into::into)
}
