//! Alert application layer
//!
//! Orchestrates alert creation and delivery over the repository and sender
//! ports.

pub mod command;
pub mod ports;
pub mod service;

pub use command::CreateAlertCommand;
pub use ports::{AlertRepository, AlertSender, RepositoryError, SendError};
pub use service::{AlertService, AlertServiceError};
