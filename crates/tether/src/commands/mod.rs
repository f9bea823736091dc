//! CLI command handlers.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use console::Style;
use tether_cache::OfflineCache;
use tether_client::{NetworkMonitor, NetworkStatus, TetherClient};
use tether_config::TetherConfig;
use tether_sync::SyncCoordinator;

pub mod attach;
pub mod cache;
pub mod delete;
pub mod events;
pub mod messages;
pub mod new;
pub mod rename;
pub mod sessions;

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:4096";

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Resolved configuration, CLI overrides applied.
    pub config: TetherConfig,
    /// Where the offline cache lives.
    pub data_dir: PathBuf,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Network treated as unavailable.
    pub offline: bool,
}

impl Context {
    pub fn server_url(&self) -> &str {
        self.config.server.url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    pub fn client(&self) -> Result<TetherClient> {
        let server = &self.config.server;
        let mut builder = TetherClient::builder().base_url(self.server_url());
        if let Some(token) = &server.token {
            builder = builder.auth_token(token.clone());
        }
        if let Some(directory) = &server.directory {
            builder = builder.directory(directory.clone());
        }
        builder
            .build()
            .with_context(|| format!("Invalid server URL: {}", self.server_url()))
    }

    pub fn network(&self) -> NetworkMonitor {
        if self.offline {
            NetworkMonitor::with_status(NetworkStatus::Offline)
        } else {
            NetworkMonitor::new()
        }
    }

    pub fn cache(&self) -> OfflineCache {
        OfflineCache::open(&self.data_dir.join("cache"), self.config.cache.clone())
    }

    pub fn sync(&self) -> Result<SyncCoordinator> {
        Ok(SyncCoordinator::new(
            self.client()?,
            self.cache(),
            self.network(),
            self.config.sync.clone(),
        ))
    }
}

/// Print a red `Error:` line to stderr.
pub fn print_error(message: impl std::fmt::Display) {
    let red = Style::new().red();
    eprintln!("{} {}", red.apply_to("Error:"), message);
}

/// Local time for an epoch-millisecond timestamp.
pub fn format_time(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|t| {
            t.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "-".to_string())
}

/// Shorten to `max_len` characters on a single line.
pub fn truncate(s: &str, max_len: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max_len {
        s
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a\nb", 10), "a b");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_format_time_out_of_range() {
        assert_eq!(format_time(i64::MAX), "-");
    }
}
