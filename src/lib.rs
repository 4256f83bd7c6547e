//! Breach Alerts: threshold breach alerting with live fan-out
//!
//! When a measured utility value exceeds a configured threshold an alert is
//! created, delivered once to every attached viewer over Server-Sent Events,
//! and kept with its delivery and read state.
//!
//! # Layout
//!
//! - [`domain`]: `Alert` aggregate and its value types
//! - [`alerts`]: `AlertService` orchestration and the repository/sender ports
//! - [`broadcast`]: SSE `Broadcaster` and its keep-alive `Heartbeat`
//! - [`storage`]: in-memory and JSON-file repositories
//! - [`api`]: axum routes, authentication, presentation
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use breach_alerts::alerts::{AlertService, CreateAlertCommand};
//! use breach_alerts::broadcast::Broadcaster;
//! use breach_alerts::storage::InMemoryAlertRepository;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let broadcaster = Arc::new(Broadcaster::new());
//! let service = AlertService::new(Arc::new(InMemoryAlertRepository::new()), broadcaster.clone());
//!
//! let _viewer = broadcaster.add_client();
//! let id = service
//!     .create_and_send(CreateAlertCommand {
//!         threshold_id: "t-1".into(),
//!         threshold_name: "High electricity usage".into(),
//!         utility_type: "ELECTRICITY".into(),
//!         threshold_type: "ACTUAL".into(),
//!         period_type: None,
//!         limit_value: 2.2,
//!         detected_value: 2.5,
//!     })
//!     .await?;
//! println!("created {}", id);
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod api;
pub mod broadcast;
pub mod config;
pub mod domain;
pub mod storage;

// Re-export commonly used types
pub use alerts::{AlertService, AlertServiceError, CreateAlertCommand};
pub use broadcast::Broadcaster;
pub use domain::{Alert, AlertId, AlertStatus, BreachDetails};
