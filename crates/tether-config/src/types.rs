//! Configuration types.
//!
//! ```toml
//! [server]
//! url = "https://devbox.local:4096"
//! directory = "/home/me/project"
//!
//! [cache]
//! max_sessions = 100
//! max_full_sessions = 20
//! max_messages_per_session = 500
//! max_total_bytes = 52428800
//! message_ttl_secs = 604800
//! session_list_fresh_secs = 300
//!
//! [stream]
//! backoff_floor_ms = 1000
//! backoff_ceiling_ms = 30000
//! max_retries = 10
//! attempt_timeout_ms = 10000
//! flush_interval_ms = 16
//!
//! [sync]
//! messages_fresh_secs = 30
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Root
// ─────────────────────────────────────────────────────────────────────────────

/// Fully resolved client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TetherConfig {
    /// Remote backend connection.
    pub server: ServerConfig,
    /// Offline cache limits.
    pub cache: CacheConfig,
    /// Streaming transport timing.
    pub stream: StreamConfig,
    /// Read-path freshness policy.
    pub sync: SyncConfig,
}

impl TetherConfig {
    /// Create a configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a single TOML document into a full configuration.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let mut config = Self::default();
        config.merge(ConfigLayer::from_toml(toml_str)?);
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge a layer on top of this config. Sections present in the layer win.
    pub fn merge(&mut self, layer: ConfigLayer) {
        if let Some(server) = layer.server {
            if server.url.is_some() {
                self.server.url = server.url;
            }
            if server.token.is_some() {
                self.server.token = server.token;
            }
            if server.directory.is_some() {
                self.server.directory = server.directory;
            }
        }
        if let Some(cache) = layer.cache {
            self.cache = cache;
        }
        if let Some(stream) = layer.stream {
            self.stream = stream;
        }
        if let Some(sync) = layer.sync {
            self.sync = sync;
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        self.stream.validate()?;
        Ok(())
    }
}

/// One config file as written on disk. Missing sections leave lower layers alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigLayer {
    #[serde(default)]
    pub server: Option<ServerConfig>,
    #[serde(default)]
    pub cache: Option<CacheConfig>,
    #[serde(default)]
    pub stream: Option<StreamConfig>,
    #[serde(default)]
    pub sync: Option<SyncConfig>,
}

impl ConfigLayer {
    /// Parse a layer from TOML.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

/// Backend connection settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the backend, e.g. `http://127.0.0.1:4096`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Bearer credential sent with every request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Working directory passed to directory-scoped calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

impl ServerConfig {
    /// Whether the token came from a file rather than the environment.
    pub fn has_plaintext_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache
// ─────────────────────────────────────────────────────────────────────────────

/// Limits for the offline cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of sessions kept in the cached session list.
    pub max_sessions: usize,

    /// Maximum number of sessions that may hold a message blob.
    pub max_full_sessions: usize,

    /// Maximum messages stored per session. Older messages are dropped first.
    pub max_messages_per_session: usize,

    /// Byte budget across all message blobs.
    pub max_total_bytes: u64,

    /// Age after which a message blob is treated as expired.
    pub message_ttl_secs: u64,

    /// Age after which the cached session list counts as stale.
    pub session_list_fresh_secs: u64,

    /// Whether to run the periodic maintenance sweep.
    pub enable_sweep_task: bool,

    /// Interval between maintenance sweeps.
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_sessions: 100,
            max_full_sessions: 20,
            max_messages_per_session: 500,
            max_total_bytes: 50 * 1024 * 1024,
            message_ttl_secs: 7 * 24 * 60 * 60,
            session_list_fresh_secs: 5 * 60,
            enable_sweep_task: true,
            sweep_interval_secs: 60 * 60,
        }
    }
}

impl CacheConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session list cap.
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    /// Set the cap on sessions holding message blobs.
    pub fn with_max_full_sessions(mut self, max: usize) -> Self {
        self.max_full_sessions = max;
        self
    }

    /// Set the per-session message cap.
    pub fn with_max_messages_per_session(mut self, max: usize) -> Self {
        self.max_messages_per_session = max;
        self
    }

    /// Set the total byte budget.
    pub fn with_max_total_bytes(mut self, bytes: u64) -> Self {
        self.max_total_bytes = bytes;
        self
    }

    /// Set the message TTL.
    pub fn with_message_ttl(mut self, ttl: Duration) -> Self {
        self.message_ttl_secs = ttl.as_secs();
        self
    }

    /// Set the session-list freshness window.
    pub fn with_session_list_fresh(mut self, window: Duration) -> Self {
        self.session_list_fresh_secs = window.as_secs();
        self
    }

    /// Enable or disable the background sweep.
    pub fn with_sweep_task(mut self, enabled: bool) -> Self {
        self.enable_sweep_task = enabled;
        self
    }

    pub fn message_ttl(&self) -> Duration {
        Duration::from_secs(self.message_ttl_secs)
    }

    pub fn session_list_fresh(&self) -> Duration {
        Duration::from_secs(self.session_list_fresh_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    /// Reject limits that would make every write evict everything.
    pub fn validate(&self) -> Result<()> {
        if self.max_messages_per_session == 0 {
            return Err(ConfigError::Invalid {
                section: "cache",
                field: "max_messages_per_session",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_full_sessions == 0 {
            return Err(ConfigError::Invalid {
                section: "cache",
                field: "max_full_sessions",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stream
// ─────────────────────────────────────────────────────────────────────────────

/// Timing for the reconnecting stream transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// First retry delay; doubles per consecutive failure.
    pub backoff_floor_ms: u64,

    /// Upper bound on the retry delay.
    pub backoff_ceiling_ms: u64,

    /// Consecutive failed attempts tolerated before the transport gives up.
    pub max_retries: u32,

    /// How long a single attempt may wait for response headers.
    pub attempt_timeout_ms: u64,

    /// Coalescing window for terminal output.
    pub flush_interval_ms: u64,

    /// Undecodable lines up to this many bytes are forwarded as raw output.
    pub raw_fallback_max_len: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            backoff_floor_ms: 1_000,
            backoff_ceiling_ms: 30_000,
            max_retries: 10,
            attempt_timeout_ms: 10_000,
            flush_interval_ms: 16,
            raw_fallback_max_len: 256,
        }
    }
}

impl StreamConfig {
    pub fn backoff_floor(&self) -> Duration {
        Duration::from_millis(self.backoff_floor_ms)
    }

    pub fn backoff_ceiling(&self) -> Duration {
        Duration::from_millis(self.backoff_ceiling_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// The attempt timeout must be shorter than the backoff ceiling and at
    /// least one attempt must be allowed.
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid {
                section: "stream",
                field: "max_retries",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.attempt_timeout_ms >= self.backoff_ceiling_ms {
            return Err(ConfigError::Invalid {
                section: "stream",
                field: "attempt_timeout_ms",
                reason: format!(
                    "{}ms must be shorter than backoff_ceiling_ms ({}ms)",
                    self.attempt_timeout_ms, self.backoff_ceiling_ms
                ),
            });
        }
        if self.backoff_floor_ms > self.backoff_ceiling_ms {
            return Err(ConfigError::Invalid {
                section: "stream",
                field: "backoff_floor_ms",
                reason: "must not exceed backoff_ceiling_ms".to_string(),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sync
// ─────────────────────────────────────────────────────────────────────────────

/// Read-path policy for the sync coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Cached messages younger than this are served without a round-trip.
    pub messages_fresh_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            messages_fresh_secs: 30,
        }
    }
}

impl SyncConfig {
    pub fn messages_fresh(&self) -> Duration {
        Duration::from_secs(self.messages_fresh_secs)
    }
}
