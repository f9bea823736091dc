//! Session event stream API.

use url::Url;

use crate::client::TetherClient;
use crate::error::Result;

/// Event stream API client.
pub struct EventsApi {
    client: TetherClient,
}

impl EventsApi {
    pub(crate) fn new(client: TetherClient) -> Self {
        Self { client }
    }

    /// URL of the directory-scoped session event stream.
    pub fn stream_url(&self) -> Result<Url> {
        self.client.scoped_url("event")
    }
}
