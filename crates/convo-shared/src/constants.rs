//! Application-wide constants

pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 30 * 60;
pub const DEFAULT_STARTUP_TIMEOUT_MS: u64 = 1_000;
pub const DEFAULT_SHUTDOWN_GRACE_SECONDS: u64 = 5;
pub const DEFAULT_CONFIG_FILE: &str = "config/settings";
pub const ENV_PREFIX: &str = "APP";
