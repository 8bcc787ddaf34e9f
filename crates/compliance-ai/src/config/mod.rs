use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::review::ProcessorSelection;

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
    pub review: ReviewConfig,
    pub http: HttpConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                json: environment == AppEnvironment::Production,
            },
            review: ReviewConfig::from_env()?,
            http: HttpConfig::from_env(),
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

/// Tracing output controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub json: bool,
}

/// Settings for the compliance review pipeline.
#[derive(Debug, Clone)]
pub struct ReviewConfig {
    /// Which provider backend `PDF_PROCESSOR` resolved to.
    pub processor: ProcessorSelection,
    /// Minimum matcher confidence before a reference is accepted.
    pub min_match_confidence: f32,
    /// Optional directory of reference documents; bundled set when absent.
    pub reference_dir: Option<PathBuf>,
    /// Overall budget for one provider analysis call.
    pub review_budget: Duration,
}

impl ReviewConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let processor =
            ProcessorSelection::parse(&env::var("PDF_PROCESSOR").unwrap_or_default());

        let min_match_confidence = match env::var("MATCH_MIN_CONFIDENCE") {
            Ok(raw) => {
                let value = raw
                    .trim()
                    .parse::<f32>()
                    .map_err(|_| ConfigError::InvalidConfidence { value: raw.clone() })?;
                if !(0.0..=1.0).contains(&value) {
                    return Err(ConfigError::InvalidConfidence { value: raw });
                }
                value
            }
            Err(_) => DEFAULT_MIN_MATCH_CONFIDENCE,
        };

        let reference_dir = env::var("REFERENCE_DIR").ok().map(PathBuf::from);

        let review_budget = match env::var("REVIEW_BUDGET_SECS") {
            Ok(raw) => Duration::from_secs(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidBudget { value: raw.clone() })?,
            ),
            Err(_) => Duration::from_secs(DEFAULT_REVIEW_BUDGET_SECS),
        };

        Ok(Self {
            processor,
            min_match_confidence,
            reference_dir,
            review_budget,
        })
    }
}

const DEFAULT_MIN_MATCH_CONFIDENCE: f32 = 0.35;
const DEFAULT_REVIEW_BUDGET_SECS: u64 = 45;

/// Front-end facing settings the core passes through untouched.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub project_name: String,
    pub api_v1_prefix: String,
    pub cors_origins: Vec<String>,
}

impl HttpConfig {
    fn from_env() -> Self {
        let project_name =
            env::var("PROJECT_NAME").unwrap_or_else(|_| "Compliance Review Service".to_string());

        let mut api_v1_prefix = env::var("API_V1_STR").unwrap_or_else(|_| "/api/v1".to_string());
        if !api_v1_prefix.starts_with('/') {
            api_v1_prefix.insert(0, '/');
        }
        while api_v1_prefix.len() > 1 && api_v1_prefix.ends_with('/') {
            api_v1_prefix.pop();
        }

        let cors_origins = env::var("BACKEND_CORS_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            project_name,
            api_v1_prefix,
            cors_origins,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidConfidence { value: String },
    InvalidBudget { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidConfidence { value } => {
                write!(
                    f,
                    "MATCH_MIN_CONFIDENCE must be a number in 0..=1, got '{value}'"
                )
            }
            ConfigError::InvalidBudget { value } => {
                write!(f, "REVIEW_BUDGET_SECS must be a whole number of seconds, got '{value}'")
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
