//! Process configuration, read once from the environment at startup.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::upstream::{RetryPolicy, UpstreamSettings};

/// Startup configuration errors. Fatal: the binary exits on any of them.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Everything the proxy needs to start.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub upstream: UpstreamSettings,
    pub cache_ttl: Duration,
    /// `None` disables the background cache sweep.
    pub sweep_interval: Option<Duration>,
}

impl Config {
    pub const DEFAULT_PORT: u16 = 3000;
    pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
    pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from any variable source.
    ///
    /// `RETRY=0` and `TIMEOUT=0` fall back to their defaults rather than
    /// disabling retries or timeouts.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let attempts = vars
            .parse::<u32>("RETRY")?
            .filter(|n| *n > 0)
            .unwrap_or(RetryPolicy::DEFAULT_ATTEMPTS);
        let timeout = vars
            .parse::<u64>("TIMEOUT")?
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(UpstreamSettings::DEFAULT_TIMEOUT);
        let backoff = vars
            .parse::<u64>("RETRY_BACKOFF")?
            .map(Duration::from_millis)
            .unwrap_or(Duration::ZERO);

        let sweep_interval = match vars.parse::<u64>("CACHE_SWEEP_INTERVAL")? {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(Self::DEFAULT_SWEEP_INTERVAL),
        };

        Ok(Self {
            host: vars.get("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port: vars.parse("PORT")?.unwrap_or(Self::DEFAULT_PORT),
            upstream: UpstreamSettings {
                base_url: vars.require("FARMERS_API_URL")?,
                api_key: vars.require("FARMERS_API_KEY")?,
                timeout,
                retry: RetryPolicy::new(attempts).with_backoff(backoff),
            },
            cache_ttl: vars
                .parse::<u64>("CACHE_TTL")?
                .map(Duration::from_secs)
                .unwrap_or(Self::DEFAULT_CACHE_TTL),
            sweep_interval,
        })
    }

    /// `host:port` for [`Server::bind`](crate::server::Server::bind).
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Logs the effective settings, API key excluded.
    pub fn log_summary(&self) {
        info!(
            listen = %self.listen_addr(),
            upstream = %self.upstream.base_url,
            attempts = self.upstream.retry.max_attempts(),
            timeout_ms = self.upstream.timeout.as_millis() as u64,
            backoff_ms = self.upstream.retry.backoff().as_millis() as u64,
            cache_ttl_secs = self.cache_ttl.as_secs(),
            sweep_secs = self.sweep_interval.map(|d| d.as_secs()),
            "configuration loaded"
        );
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Unset and blank are the same thing.
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    }

    fn require(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing(name))
    }

    fn parse<T: FromStr>(&self, name: &'static str) -> Result<Option<T>, ConfigError> {
        self.get(name)
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| ConfigError::Invalid { name, value })
            })
            .transpose()
    }
}
