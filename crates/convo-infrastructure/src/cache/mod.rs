//! Session store adapters

pub mod memory_store;
pub mod redis_store;

pub use memory_store::MemorySessionStore;
pub use redis_store::RedisSessionStore;
