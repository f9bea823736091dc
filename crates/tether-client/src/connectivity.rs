//! Process-wide connectivity and app-lifecycle signals.
//!
//! Both are built once at startup and cloned into every consumer. The
//! platform layer feeds them (`set_status`, `set_state`); consumers read the
//! current value or subscribe for changes.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::client::TetherClient;

// ─────────────────────────────────────────────────────────────────────────────
// Network
// ─────────────────────────────────────────────────────────────────────────────

/// Reachability of the network as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkStatus {
    Online,
    Offline,
    /// No report yet. Treated as online so the first read still tries the network.
    Unknown,
}

impl NetworkStatus {
    pub fn is_offline(self) -> bool {
        matches!(self, Self::Offline)
    }
}

impl fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Single online/offline/unknown signal with publish/subscribe.
#[derive(Clone)]
pub struct NetworkMonitor {
    tx: Arc<watch::Sender<NetworkStatus>>,
}

impl NetworkMonitor {
    /// Create a monitor in the `Unknown` state.
    pub fn new() -> Self {
        Self::with_status(NetworkStatus::Unknown)
    }

    /// Create a monitor with a known initial state.
    pub fn with_status(status: NetworkStatus) -> Self {
        let (tx, _rx) = watch::channel(status);
        Self { tx: Arc::new(tx) }
    }

    /// Current status.
    pub fn status(&self) -> NetworkStatus {
        *self.tx.borrow()
    }

    /// Shorthand for `status().is_offline()`.
    pub fn is_offline(&self) -> bool {
        self.status().is_offline()
    }

    /// Publish a new status. Subscribers are only woken on an actual change.
    pub fn set_status(&self, status: NetworkStatus) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
        if changed {
            tracing::info!(status = %status, "Network status changed");
        }
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.tx.subscribe()
    }

    /// Derive the status from periodic health checks against the backend.
    ///
    /// Used where the platform offers no connectivity callback. Abort the
    /// returned handle to stop probing.
    pub fn spawn_probe(&self, client: TetherClient, interval: Duration) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let healthy = client.health().is_healthy().await;
                tracing::trace!(healthy, "Connectivity probe");
                monitor.set_status(if healthy {
                    NetworkStatus::Online
                } else {
                    NetworkStatus::Offline
                });
            }
        })
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// App lifecycle
// ─────────────────────────────────────────────────────────────────────────────

/// Whether the host app is visible to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    Foreground,
    Background,
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Foreground => write!(f, "foreground"),
            Self::Background => write!(f, "background"),
        }
    }
}

/// Foreground/background signal with publish/subscribe.
#[derive(Clone)]
pub struct AppLifecycle {
    tx: Arc<watch::Sender<AppState>>,
}

impl AppLifecycle {
    /// Create a lifecycle signal starting in the foreground.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AppState::Foreground);
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> AppState {
        *self.tx.borrow()
    }

    pub fn is_foreground(&self) -> bool {
        self.state() == AppState::Foreground
    }

    /// Publish a lifecycle transition.
    pub fn set_state(&self, state: AppState) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        if changed {
            tracing::debug!(state = %state, "App lifecycle changed");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }
}

impl Default for AppLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
