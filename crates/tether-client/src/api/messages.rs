//! Messages API.

use crate::client::TetherClient;
use crate::error::Result;
use crate::types::{AppendMessageRequest, Message};

/// Query parameters for listing messages.
#[derive(Debug, Default, serde::Serialize)]
pub struct ListMessagesQuery {
    /// Return at most this many of the most recent messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

#[derive(serde::Serialize)]
struct ScopedListQuery<'a> {
    #[serde(flatten)]
    scope: crate::client::DirectoryQuery<'a>,
    #[serde(flatten)]
    query: &'a ListMessagesQuery,
}

/// Messages API client.
pub struct MessagesApi {
    client: TetherClient,
}

impl MessagesApi {
    pub(crate) fn new(client: TetherClient) -> Self {
        Self { client }
    }

    /// List every message in a session, oldest first.
    pub async fn list(&self, session_id: &str) -> Result<Vec<Message>> {
        self.list_with_query(session_id, &ListMessagesQuery::default())
            .await
    }

    /// List messages with query parameters.
    pub async fn list_with_query(
        &self,
        session_id: &str,
        query: &ListMessagesQuery,
    ) -> Result<Vec<Message>> {
        let query = ScopedListQuery {
            scope: self.client.scope(),
            query,
        };
        self.client
            .get_with_query(&format!("session/{}/message", session_id), &query)
            .await
    }

    /// Append a message to a session.
    pub async fn append(&self, session_id: &str, request: AppendMessageRequest) -> Result<Message> {
        self.client
            .post(&format!("session/{}/message", session_id), &request)
            .await
    }
}
