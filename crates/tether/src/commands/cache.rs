//! Cache command - inspect and maintain the offline cache.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};

use super::{Context, format_time};

/// Arguments for the cache command.
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show cache size and hit rate
    Stats,

    /// Remove expired and unreadable entries and reconcile bookkeeping
    Sweep,

    /// Delete everything in the cache
    Clear {
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

/// Run the cache command.
pub async fn run(args: CacheArgs, ctx: &Context) -> Result<()> {
    match args.command {
        CacheCommand::Stats => cmd_stats(ctx).await,
        CacheCommand::Sweep => cmd_sweep(ctx).await,
        CacheCommand::Clear { force } => cmd_clear(force, ctx).await,
    }
}

async fn cmd_stats(ctx: &Context) -> Result<()> {
    let cache = ctx.cache();
    let stats = cache.stats().await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let config = cache.config();

    println!("{}", style("Offline Cache").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!(
        "  Size:       {} / {}",
        format_bytes(stats.total_size),
        format_bytes(config.max_total_bytes)
    );
    println!(
        "  Sessions:   {} with messages (max {})",
        stats.sessions_with_messages, config.max_sessions
    );
    let hit_rate = stats
        .hit_rate()
        .map(|rate| format!("{:.0}%", rate * 100.0))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  Hit rate:   {} ({} hits, {} misses)",
        hit_rate, stats.hits, stats.misses
    );
    let last_sweep = stats
        .last_cleanup
        .map(format_time)
        .unwrap_or_else(|| "never".to_string());
    println!("  Last sweep: {}", last_sweep);
    if ctx.verbose {
        println!("  Location:   {}", ctx.data_dir.join("cache").display());
    }
    Ok(())
}

async fn cmd_sweep(ctx: &Context) -> Result<()> {
    let report = ctx.cache().sweep().await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let green = Style::new().green();
    println!(
        "{} Swept cache: {} expired, {} unreadable, {} stale index entries, {} adopted",
        green.apply_to("✓"),
        report.expired,
        report.corrupt,
        report.dropped_from_index,
        report.adopted
    );
    println!(
        "  {} across {} sessions",
        format_bytes(report.total_size),
        report.sessions_with_messages
    );
    Ok(())
}

async fn cmd_clear(force: bool, ctx: &Context) -> Result<()> {
    if !force && !ctx.json_output {
        let yellow = Style::new().yellow();
        print!(
            "{} This removes all cached sessions and messages. Continue? [y/N] ",
            yellow.apply_to("!")
        );
        use std::io::Write;
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled");
            return Ok(());
        }
    }

    ctx.cache().clear_all().await?;

    if ctx.json_output {
        println!("{}", serde_json::json!({ "cleared": true }));
    } else {
        let green = Style::new().green();
        println!("{} Cache cleared", green.apply_to("✓"));
    }
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(50 * 1024 * 1024), "50.0 MB");
    }
}
