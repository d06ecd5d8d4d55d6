//! # Convo Server
//!
//! Dependency wiring and the process lifecycle around the HTTP listener.

pub mod lifecycle;

pub use lifecycle::{shutdown_signal, Lifecycle, LifecycleError};
