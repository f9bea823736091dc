//! Sessions command - list sessions, cache-first.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use tether_sync::SessionsResult;

use super::{Context, format_time, truncate};

/// Arguments for the sessions command.
#[derive(Args, Debug)]
pub struct SessionsArgs {
    /// Fetch from the server even if the cached list is fresh
    #[arg(short, long)]
    pub refresh: bool,

    /// Maximum sessions to show
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

/// Run the sessions command.
pub async fn run(args: SessionsArgs, ctx: &Context) -> Result<()> {
    let sync = ctx.sync()?;

    let result = if !args.refresh && !ctx.offline && !sync.cache().is_session_list_stale().await? {
        let (sessions, _) = sync.cache().get_session_list().await?;
        SessionsResult {
            sessions,
            from_cache: true,
            stale: false,
        }
    } else {
        sync.fetch_sessions().await?
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let green = Style::new().green();
    let yellow = Style::new().yellow();

    println!("{}", style("Sessions").bold());
    println!("{}", dim.apply_to("─".repeat(60)));
    println!();

    if result.sessions.is_empty() {
        println!("{}", dim.apply_to("No sessions found"));
    } else {
        for session in result.sessions.iter().take(args.limit) {
            let marker = if session.is_full_cache {
                green.apply_to("●")
            } else {
                dim.apply_to("○")
            };
            println!(
                "{} {} {}",
                marker,
                truncate(&session.title, 40),
                dim.apply_to(format!("[{}] {}", session.id, format_time(session.updated_at)))
            );
        }
        if result.sessions.len() > args.limit {
            println!();
            println!(
                "{}",
                dim.apply_to(format!("... and {} more", result.sessions.len() - args.limit))
            );
        }
    }

    println!();
    if result.stale {
        println!("{}", yellow.apply_to("Showing cached sessions; the server could not be reached"));
    } else if result.from_cache {
        println!("{}", dim.apply_to("From cache"));
    }
    if ctx.verbose {
        println!("{}", dim.apply_to("● = messages available offline"));
    }

    Ok(())
}
