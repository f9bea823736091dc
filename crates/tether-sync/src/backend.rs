//! The REST calls the coordinator depends on.

use async_trait::async_trait;
use tether_client::{
    CreateSessionRequest, Message, Result, Session, TetherClient, UpdateSessionRequest,
};

/// Remote session operations.
///
/// Implemented for [`TetherClient`]; tests substitute an in-process fake.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn list_sessions(&self) -> Result<Vec<Session>>;

    /// Full message history of a session.
    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>>;

    async fn create_session(&self, request: CreateSessionRequest) -> Result<Session>;

    async fn update_session(&self, session_id: &str, request: UpdateSessionRequest)
    -> Result<Session>;

    async fn delete_session(&self, session_id: &str) -> Result<()>;
}

#[async_trait]
impl SessionBackend for TetherClient {
    async fn list_sessions(&self) -> Result<Vec<Session>> {
        self.sessions().list().await
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        self.messages().list(session_id).await
    }

    async fn create_session(&self, request: CreateSessionRequest) -> Result<Session> {
        self.sessions().create(request).await
    }

    async fn update_session(
        &self,
        session_id: &str,
        request: UpdateSessionRequest,
    ) -> Result<Session> {
        self.sessions().update(session_id, request).await
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.sessions().delete(session_id).await
    }
}
