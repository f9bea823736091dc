//! Sessions API.

use crate::client::TetherClient;
use crate::error::Result;
use crate::types::{CreateSessionRequest, Session, UpdateSessionRequest};

/// Sessions API client. All calls are scoped to the client's directory.
pub struct SessionsApi {
    client: TetherClient,
}

impl SessionsApi {
    pub(crate) fn new(client: TetherClient) -> Self {
        Self { client }
    }

    /// List sessions.
    pub async fn list(&self) -> Result<Vec<Session>> {
        self.client
            .get_with_query("session", &self.client.scope())
            .await
    }

    /// Get a session by ID.
    pub async fn get(&self, id: &str) -> Result<Session> {
        self.client
            .get_with_query(&format!("session/{}", id), &self.client.scope())
            .await
    }

    /// Create a new session.
    pub async fn create(&self, request: CreateSessionRequest) -> Result<Session> {
        self.client.post("session", &request).await
    }

    /// Update a session.
    pub async fn update(&self, id: &str, request: UpdateSessionRequest) -> Result<Session> {
        self.client.patch(&format!("session/{}", id), &request).await
    }

    /// Delete a session.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client.delete(&format!("session/{}", id)).await
    }
}
