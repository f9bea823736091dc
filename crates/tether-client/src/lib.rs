//! HTTP client for the long-running session backend.
//!
//! Provides the REST collaborators the offline layer sits on top of, plus the
//! process-wide connectivity signals it consults.
//!
//! # Example
//!
//! ```no_run
//! use tether_client::{TetherClient, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = TetherClient::builder()
//!     .base_url("http://localhost:4096")
//!     .auth_token("secret")
//!     .directory("/home/me/project")
//!     .build()?;
//!
//! let sessions = client.sessions().list().await?;
//! for session in &sessions {
//!     println!("{} {}", session.id, session.title);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # API Coverage
//!
//! - **Sessions**: list, get, create, update, delete
//! - **Messages**: list, append
//! - **Terminals**: create, write input, resize, close, stream URL
//! - **Events**: session event stream URL
//! - **Health**: reachability checks (also drive [`NetworkMonitor::spawn_probe`])

pub mod api;
pub mod client;
pub mod connectivity;
pub mod error;
pub mod types;

pub use client::{ClientBuilder, TetherClient};
pub use connectivity::{AppLifecycle, AppState, NetworkMonitor, NetworkStatus};
pub use error::{Error, Result};
pub use types::*;

pub use api::ListMessagesQuery;
