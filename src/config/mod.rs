use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

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
///
/// Everything the original deployment hard-coded (database location, session
/// secret, notification recipient, SMTP credentials) is read from the
/// environment here, once, at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub notifier: NotifierConfig,
}

const DEV_SESSION_SECRET: &str = "dev-only-session-secret";

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

        let database_path =
            PathBuf::from(env::var("APP_DATABASE_PATH").unwrap_or_else(|_| "incidents.db".into()));

        let secret = match env::var("APP_SESSION_SECRET") {
            Ok(value) if !value.trim().is_empty() => value,
            // A predictable secret is acceptable only outside production.
            _ if environment != AppEnvironment::Production => DEV_SESSION_SECRET.to_string(),
            _ => return Err(ConfigError::MissingSessionSecret),
        };

        let recipient =
            env::var("NOTIFY_RECIPIENT").unwrap_or_else(|_| "admin@example.com".to_string());
        let smtp = SmtpConfig::from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            database: DatabaseConfig {
                path: database_path,
            },
            session: SessionConfig { secret },
            notifier: NotifierConfig { recipient, smtp },
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
}

/// Location of the SQLite database file.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

/// Secret used to sign session cookies.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
}

/// Where incident notifications go and how they are delivered.
///
/// `smtp` is optional: without it the service logs notifications instead of
/// sending them, which keeps local development free of a mail relay.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub recipient: String,
    pub smtp: Option<SmtpConfig>,
}

/// SMTP relay settings, only present when `SMTP_HOST` is set.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

impl SmtpConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let host = match env::var("SMTP_HOST") {
            Ok(value) if !value.trim().is_empty() => value,
            _ => return Ok(None),
        };

        let port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidSmtpPort)?;

        let require = |key: &'static str| {
            env::var(key)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::IncompleteSmtp { missing: key })
        };

        Ok(Some(Self {
            host,
            port,
            username: require("SMTP_USERNAME")?,
            password: require("SMTP_PASSWORD")?,
            from_address: require("SMTP_FROM")?,
        }))
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingSessionSecret,
    InvalidSmtpPort,
    IncompleteSmtp { missing: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingSessionSecret => {
                write!(f, "APP_SESSION_SECRET must be set when APP_ENV is production")
            }
            ConfigError::InvalidSmtpPort => write!(f, "SMTP_PORT must be a valid u16"),
            ConfigError::IncompleteSmtp { missing } => {
                write!(f, "{missing} must be set when SMTP_HOST is configured")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
