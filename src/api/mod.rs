pub mod auth;
pub mod handlers;
pub mod presenter;
pub mod server;

pub use auth::{AuthError, AuthScope, AuthUser, AuthVerifier, HttpAuthVerifier};
pub use handlers::{ApiError, AppState};
pub use presenter::AlertResponse;
pub use server::{build_router, run_server, ServerConfig};
