use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::marketplace::moderation::ModerationConfig;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub marketplace: MarketplaceConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = env::var("APP_LOG_FORMAT")
            .map(|raw| LogFormat::from_str(&raw))
            .unwrap_or_else(|_| LogFormat::default_for(environment));

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            marketplace: MarketplaceConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Output shape of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Compact,
        }
    }

    fn default_for(environment: AppEnvironment) -> Self {
        match environment {
            AppEnvironment::Production => Self::Json,
            AppEnvironment::Development | AppEnvironment::Test => Self::Compact,
        }
    }
}

pub const DEFAULT_POST_LISTING_FEE: u64 = 50_000;
pub const DEFAULT_PUSH_LISTING_FEE: u64 = 20_000;
pub const DEFAULT_TAKEOVER_FEE: u64 = 200_000;

/// Fee schedule (VND) charged by the lifecycle and takeover workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    pub post_listing: u64,
    pub push_listing: u64,
    pub takeover: u64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            post_listing: DEFAULT_POST_LISTING_FEE,
            push_listing: DEFAULT_PUSH_LISTING_FEE,
            takeover: DEFAULT_TAKEOVER_FEE,
        }
    }
}

/// Marketplace dials: fees and the forbidden-word extension list.
#[derive(Debug, Clone, Default)]
pub struct MarketplaceConfig {
    pub fees: FeeSchedule,
    pub moderation: ModerationConfig,
}

impl MarketplaceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let fees = FeeSchedule {
            post_listing: fee_from_env("LISTING_POST_FEE", DEFAULT_POST_LISTING_FEE)?,
            push_listing: fee_from_env("LISTING_PUSH_FEE", DEFAULT_PUSH_LISTING_FEE)?,
            takeover: fee_from_env("BROKER_TAKEOVER_FEE", DEFAULT_TAKEOVER_FEE)?,
        };

        let extra_words = env::var("MODERATION_EXTRA_FORBIDDEN_WORDS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|word| !word.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        Ok(Self {
            fees,
            moderation: ModerationConfig::default().with_extra_words(extra_words),
        })
    }
}

fn fee_from_env(variable: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(variable) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidFee { variable }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidFee { variable: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidFee { variable } => {
                write!(f, "{variable} must be a whole number of VND")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidFee { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_LOG_FORMAT",
            "LISTING_POST_FEE",
            "LISTING_PUSH_FEE",
            "BROKER_TAKEOVER_FEE",
            "MODERATION_EXTRA_FORBIDDEN_WORDS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.log_format, LogFormat::Compact);
        assert_eq!(config.marketplace.fees, FeeSchedule::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn production_defaults_to_json_logs() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.environment, AppEnvironment::Production);
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
        reset_env();
    }

    #[test]
    fn fee_overrides_and_extra_words_are_read() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("BROKER_TAKEOVER_FEE", "350000");
        env::set_var("MODERATION_EXTRA_FORBIDDEN_WORDS", " bán gấp lỗ , ,hàng cấm");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.marketplace.fees.takeover, 350_000);
        assert_eq!(config.marketplace.fees.post_listing, DEFAULT_POST_LISTING_FEE);
        let words = config.marketplace.moderation.forbidden_words();
        assert!(words.iter().any(|word| word == "bán gấp lỗ"));
        assert!(words.iter().any(|word| word == "hàng cấm"));
        reset_env();
    }

    #[test]
    fn rejects_non_numeric_fee() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("LISTING_PUSH_FEE", "twenty");
        match AppConfig::load() {
            Err(ConfigError::InvalidFee { variable }) => assert_eq!(variable, "LISTING_PUSH_FEE"),
            other => panic!("expected invalid fee error, got {other:?}"),
        }
        reset_env();
    }
}
