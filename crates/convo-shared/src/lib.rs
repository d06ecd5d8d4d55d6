//! # Convo Shared
//! 
//! Shared configuration, telemetry, and error types for the session backend.

pub mod config;
pub mod constants;
pub mod error;
pub mod telemetry;

pub use config::Settings;
pub use error::AppError;
