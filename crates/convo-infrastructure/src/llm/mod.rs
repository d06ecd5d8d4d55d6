//! Model catalogue clients

pub mod ollama;

pub use ollama::OllamaCatalogue;
