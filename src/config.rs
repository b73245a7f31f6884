use crate::freshness::{DEFAULT_TOLERANCE, FreshnessCheck};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.restful-api.dev";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub checks: CheckConfig,
    pub stub: StubConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub freshness_tolerance_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StubConfig {
    pub addr: SocketAddr,
    pub request_timeout_secs: u64,
    pub body_limit_bytes: usize,
    pub tcp_nodelay: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

fn env_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn env_or_parse<F, T: std::str::FromStr>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T::Err: std::fmt::Debug,
{
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; `from_env` reads the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Check suite config
        let base_url = env_or_default(&lookup, "BASE_URL", DEFAULT_BASE_URL);
        let request_timeout_secs = env_or_parse(&lookup, "REQUEST_TIMEOUT", 10);
        let freshness_tolerance_secs =
            env_or_parse(&lookup, "FRESHNESS_TOLERANCE_SECS", DEFAULT_TOLERANCE.as_secs());

        // Stub service config
        let addr = env_or_default(&lookup, "ADDR", "127.0.0.1:8080")
            .parse()
            .context("Failed to parse ADDR")?;
        let body_limit_bytes = env_or_parse(&lookup, "BODY_LIMIT_BYTES", 16 * 1024);
        let tcp_nodelay = env_or_parse(&lookup, "TCP_NODELAY", true);

        // Logging config
        let level = env_or_default(&lookup, "LOG_LEVEL", "info");
        let format = match env_or_default(&lookup, "LOG_FORMAT", "pretty")
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let config = Config {
            checks: CheckConfig {
                base_url,
                request_timeout_secs,
                freshness_tolerance_secs,
            },
            stub: StubConfig {
                addr,
                request_timeout_secs,
                body_limit_bytes,
                tcp_nodelay,
            },
            logging: LoggingConfig { level, format },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let base_url = self.checks.base_url.trim();
        if base_url.is_empty() {
            anyhow::bail!("BASE_URL cannot be empty");
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            anyhow::bail!("BASE_URL must be an http(s) URL, got {}", base_url);
        }
        if self.checks.request_timeout_secs < 1 {
            anyhow::bail!("REQUEST_TIMEOUT must be at least 1 second");
        }
        if self.stub.request_timeout_secs < 1 {
            anyhow::bail!("REQUEST_TIMEOUT must be at least 1 second");
        }
        if self.stub.body_limit_bytes < 64 {
            anyhow::bail!("BODY_LIMIT_BYTES must be at least 64");
        }
        FreshnessCheck::new(self.freshness_tolerance())
            .context("FRESHNESS_TOLERANCE_SECS is out of range")?;
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.checks.base_url.trim().trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.checks.request_timeout_secs)
    }

    pub fn stub_request_timeout(&self) -> Duration {
        Duration::from_secs(self.stub.request_timeout_secs)
    }

    pub fn freshness_tolerance(&self) -> Duration {
        Duration::from_secs(self.checks.freshness_tolerance_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            checks: CheckConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
                request_timeout_secs: 10,
                freshness_tolerance_secs: DEFAULT_TOLERANCE.as_secs(),
            },
            stub: StubConfig {
                addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
                request_timeout_secs: 10,
                body_limit_bytes: 16 * 1024,
                tcp_nodelay: true,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }
}
