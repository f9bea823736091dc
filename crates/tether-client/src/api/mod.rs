//! API endpoint implementations.

mod events;
mod health;
mod messages;
mod sessions;
mod terminals;

pub use events::EventsApi;
pub use health::HealthApi;
pub use messages::{ListMessagesQuery, MessagesApi};
pub use sessions::SessionsApi;
pub use terminals::TerminalsApi;
