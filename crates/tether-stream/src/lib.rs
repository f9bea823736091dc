//! Reconnecting streaming transport for terminal output and session events.
//!
//! A [`StreamTransport`] owns one long-lived HTTP streaming connection per
//! [`StreamEndpoint`]. It reconnects with capped exponential backoff, bounds
//! each attempt with a header timeout, suspends without penalty while the app
//! is backgrounded or the network is offline, and batches terminal output
//! through an [`OutputCoalescer`] before handing it to the consumer.
//!
//! ```rust,ignore
//! let transport = StreamTransport::new(client.clone(), config.stream, network, lifecycle);
//! let (handle, mut events) = transport.open(StreamEndpoint::terminal(&client, "pty_1")?);
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         TransportEvent::Output(text) => print!("{text}"),
//!         TransportEvent::Exit(status) => break,
//!         _ => {}
//!     }
//! }
//! handle.close();
//! ```

mod backoff;
mod coalesce;
mod error;
mod transport;
mod wire;

pub use backoff::Backoff;
pub use coalesce::OutputCoalescer;
pub use error::TransportError;
pub use transport::{
    ConnectionState, ExitStatus, StreamEndpoint, StreamTransport, TransportEvent,
    TransportEvents, TransportHandle,
};
pub use wire::{EventProperties, Frame, LineDecoder, SessionEvent, StreamKind, TerminalFrame};
