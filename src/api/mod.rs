//! The dispatch surface: request validation, route table, and handlers over
//! the core pipeline and analytics engines.

pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::{AppState, SharedState};
