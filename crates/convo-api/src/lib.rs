//! # Convo API
//! 
//! HTTP handlers, router, and error mapping.

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::{build_router, RouterOptions};
pub use state::AppState;
