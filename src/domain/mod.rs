//! Domain model for threshold breach alerts
//!
//! Value types describing a breach and the `Alert` aggregate that tracks its
//! delivery and read state. Nothing in here performs I/O.

pub mod alert;
pub mod alert_id;
pub mod breach;
pub mod error;
pub mod status;
pub mod time;

pub use alert::{Alert, TimestampInput};
pub use alert_id::AlertId;
pub use breach::BreachDetails;
pub use error::DomainError;
pub use status::AlertStatus;
