//! Live alert streaming over Server-Sent Events
//!
//! The [`Broadcaster`] keeps a registry of attached viewers and fans each new
//! alert out to all of them. A [`Heartbeat`] keeps idle connections open.

pub mod broadcaster;
pub mod frame;
pub mod heartbeat;

pub use broadcaster::{Broadcaster, ClientStream, DEFAULT_CLIENT_BUFFER};
pub use frame::StreamEvent;
pub use heartbeat::{Heartbeat, DEFAULT_HEARTBEAT_INTERVAL};
