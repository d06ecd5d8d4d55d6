//! Configuration management
//!
//! Sources are layered in this order, later ones winning:
//! built-in defaults, the settings file, then `APP_*` environment variables
//! (`APP_SESSION__TTL_SECONDS=60` sets `session.ttl_seconds`).

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use validator::{Validate, ValidationError};

use crate::constants::{
    DEFAULT_CONFIG_FILE, DEFAULT_SESSION_TTL_SECONDS, DEFAULT_SHUTDOWN_GRACE_SECONDS,
    DEFAULT_STARTUP_TIMEOUT_MS, ENV_PREFIX,
};
use crate::error::AppError;

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct Settings {
    #[validate(nested)]
    pub server: ServerSettings,
    pub log: LogSettings,
    #[validate(nested)]
    pub ollama: OllamaSettings,
    #[validate(nested)]
    pub redis: RedisSettings,
    pub store: StoreSettings,
    #[validate(nested)]
    pub session: SessionSettings,
    #[validate(nested)]
    pub lifecycle: LifecycleSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Dev,
    Staging,
    Prod,
    Production,
}

impl AppEnv {
    pub fn is_production(self) -> bool {
        matches!(self, Self::Prod | Self::Production)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct ServerSettings {
    pub env: AppEnv,
    #[validate(custom(function = "validate_ip"))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    #[validate(range(min = 1))]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LogSettings {
    pub level: LogLevel,
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct OllamaSettings {
    #[validate(url)]
    pub base_url: String,
    #[validate(range(min = 1))]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct RedisSettings {
    #[validate(length(min = 1))]
    pub url: String,
    #[validate(range(min = 1))]
    pub max_connections: usize,
    #[validate(range(min = 1))]
    pub command_timeout_ms: u64,
}

impl RedisSettings {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreSettings {
    pub backend: StoreBackend,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct SessionSettings {
    #[validate(range(min = 1))]
    pub ttl_seconds: u64,
}

impl SessionSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct LifecycleSettings {
    #[validate(range(min = 1))]
    pub startup_timeout_ms: u64,
    #[validate(range(min = 1))]
    pub shutdown_grace_seconds: u64,
}

impl LifecycleSettings {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                env: AppEnv::Dev,
                host: "0.0.0.0".to_string(),
                port: 8080,
                request_timeout_seconds: 30,
            },
            log: LogSettings {
                level: LogLevel::Debug,
                format: LogFormat::Text,
            },
            ollama: OllamaSettings {
                base_url: "http://ollama:11434".to_string(),
                timeout_seconds: 30,
            },
            redis: RedisSettings {
                url: "redis://valkey:6379".to_string(),
                max_connections: 16,
                command_timeout_ms: 2_000,
            },
            store: StoreSettings {
                backend: StoreBackend::Redis,
            },
            session: SessionSettings {
                ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            },
            lifecycle: LifecycleSettings {
                startup_timeout_ms: DEFAULT_STARTUP_TIMEOUT_MS,
                shutdown_grace_seconds: DEFAULT_SHUTDOWN_GRACE_SECONDS,
            },
        }
    }
}

impl Settings {
    /// Load settings from defaults, the optional settings file and the environment.
    ///
    /// An explicit `path` must exist; without one, `config/settings.{toml,yaml,json}`
    /// is read when present.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Listener address from `server.host` and `server.port`.
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        let host: IpAddr = self.server.host.parse().map_err(|e| {
            AppError::ConfigError(::config::ConfigError::Message(format!(
                "invalid server.host {}: {}",
                self.server.host, e
            )))
        })?;
        Ok(SocketAddr::from((host, self.server.port)))
    }
}

fn validate_ip(host: &str) -> Result<(), ValidationError> {
    host.parse::<IpAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_ip"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.session.ttl(), Duration::from_secs(1800));
        assert_eq!(settings.lifecycle.startup_timeout(), Duration::from_secs(1));
        assert_eq!(settings.lifecycle.shutdown_grace(), Duration::from_secs(5));
        assert_eq!(settings.socket_addr().unwrap(), "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_rejects_invalid_values() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        settings.server.host = "not-an-ip".to_string();
        settings.ollama.base_url = "ollama without scheme".to_string();
        settings.session.ttl_seconds = 0;

        let errors = settings.validate().unwrap_err().to_string();
        assert!(errors.contains("port"));
        assert!(errors.contains("host"));
        assert!(errors.contains("base_url"));
        assert!(errors.contains("ttl_seconds"));
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9090

[log]
format = "json"

[store]
backend = "memory"

[session]
ttl_seconds = 120
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.log.format, LogFormat::Json);
        assert_eq!(settings.store.backend, StoreBackend::Memory);
        assert_eq!(settings.session.ttl_seconds, 120);
        // untouched keys keep their defaults
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.redis.max_connections, 16);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[log]\nlevel = \"verbose\"").unwrap();

        assert!(Settings::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Settings::load(Some(Path::new("/nonexistent/convo/settings.toml")));
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_socket_addr() {
        let mut settings = Settings::default();
        settings.server.host = "::1".to_string();
        settings.server.port = 9000;
        assert_eq!(settings.socket_addr().unwrap(), "[::1]:9000".parse::<SocketAddr>().unwrap());

        settings.server.host = "localhost".to_string();
        assert!(matches!(settings.socket_addr(), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_production_env() {
        assert!(AppEnv::Prod.is_production());
        assert!(AppEnv::Production.is_production());
        assert!(!AppEnv::Staging.is_production());
    }
}
