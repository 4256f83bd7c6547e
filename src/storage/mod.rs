//! Alert repositories
//!
//! - [`InMemoryAlertRepository`]: process-local, nothing survives a restart
//! - [`JsonFileAlertRepository`]: same model, snapshotted to a JSON file

pub mod file;
pub mod memory;
pub mod record;

pub use file::JsonFileAlertRepository;
pub use memory::InMemoryAlertRepository;
pub use record::{AlertRecord, BreachRecord};
