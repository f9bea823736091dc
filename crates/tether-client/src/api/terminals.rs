//! Terminals API.

use url::Url;

use crate::client::TetherClient;
use crate::error::Result;
use crate::types::{CreateTerminalRequest, TerminalInfo, TerminalInputRequest, TerminalSize};

/// Terminal sessions API client.
pub struct TerminalsApi {
    client: TetherClient,
}

impl TerminalsApi {
    pub(crate) fn new(client: TetherClient) -> Self {
        Self { client }
    }

    /// Create a terminal session.
    pub async fn create(&self, request: CreateTerminalRequest) -> Result<TerminalInfo> {
        self.client.post("pty", &request).await
    }

    /// Send input bytes to a terminal.
    pub async fn write(&self, id: &str, data: impl Into<String>) -> Result<()> {
        let request = TerminalInputRequest { data: data.into() };
        self.client
            .post_empty(&format!("pty/{}/input", id), &request)
            .await
    }

    /// Resize a terminal.
    pub async fn resize(&self, id: &str, size: TerminalSize) -> Result<()> {
        self.client
            .post_empty(&format!("pty/{}/resize", id), &size)
            .await
    }

    /// Close a terminal session.
    pub async fn close(&self, id: &str) -> Result<()> {
        self.client.delete(&format!("pty/{}", id)).await
    }

    /// URL of the terminal's output stream.
    pub fn stream_url(&self, id: &str) -> Result<Url> {
        self.client.scoped_url(&format!("pty/{}/stream", id))
    }
}
