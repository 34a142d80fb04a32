use std::env;
use std::time::Duration;

use url::Url;

use crate::core::error::{AppError, AppResult};

/// Default values used when neither the environment nor the caller
/// overrides them
pub mod defaults {
    /// Base URL of the download service
    pub const SERVER_URL: &str = "http://127.0.0.1:5000/";

    /// User agent sent with every request
    pub const USER_AGENT: &str = concat!("tubedeck/", env!("CARGO_PKG_VERSION"));

    /// Log level used by the front-end when none is given
    pub const LOG_LEVEL: &str = "info";
}

/// Progress polling configuration
pub mod polling {
    use super::Duration;

    /// Interval between progress queries (in milliseconds)
    pub const INTERVAL_MS: u64 = 500;

    /// Progress polling interval duration
    pub fn interval() -> Duration {
        Duration::from_millis(INTERVAL_MS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// TCP connect timeout (in seconds)
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;

    /// Connect timeout duration
    pub fn connect_timeout() -> Duration {
        Duration::from_secs(CONNECT_TIMEOUT_SECS)
    }
}

/// Client configuration for talking to the download service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the service, always ending in `/`
    pub server_url: Url,
    /// Delay between progress ticks
    pub poll_interval: Duration,
    /// TCP connect timeout for every request
    pub connect_timeout: Duration,
    /// Whole-request timeout for user-triggered calls only.
    /// Progress polls never carry one.
    pub action_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for ClientConfig {
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        Self {
            server_url: Url::parse(defaults::SERVER_URL).expect("default server URL literal should always parse"),
            poll_interval: polling::interval(),
            connect_timeout: network::connect_timeout(),
            action_timeout: None,
            user_agent: defaults::USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Creates a config pointing at `server_url` with default timings.
    pub fn new(server_url: &str) -> AppResult<Self> {
        Ok(Self {
            server_url: normalize_server_url(server_url)?,
            ..Self::default()
        })
    }

    /// Reads the configuration from the environment.
    ///
    /// * `TUBEDECK_SERVER_URL` - base URL of the service
    /// * `TUBEDECK_POLL_INTERVAL_MS` - progress polling interval
    /// * `TUBEDECK_ACTION_TIMEOUT_SECS` - timeout for user-triggered calls
    ///
    /// Unset variables keep their defaults; malformed ones are an error.
    pub fn from_env() -> AppResult<Self> {
        let mut config = match env::var("TUBEDECK_SERVER_URL") {
            Ok(url) => Self::new(&url)?,
            Err(_) => Self::default(),
        };

        if let Some(ms) = parse_env_u64("TUBEDECK_POLL_INTERVAL_MS")? {
            config = config.poll_interval(Duration::from_millis(ms))?;
        }
        if let Some(secs) = parse_env_u64("TUBEDECK_ACTION_TIMEOUT_SECS")? {
            config = config.action_timeout(Some(Duration::from_secs(secs)));
        }

        Ok(config)
    }

    /// Replaces the server URL.
    pub fn server_url(mut self, url: &str) -> AppResult<Self> {
        self.server_url = normalize_server_url(url)?;
        Ok(self)
    }

    /// Sets the polling interval. Zero is rejected.
    pub fn poll_interval(mut self, interval: Duration) -> AppResult<Self> {
        if interval.is_zero() {
            return Err(AppError::Config("poll interval must be greater than zero".into()));
        }
        self.poll_interval = interval;
        Ok(self)
    }

    /// Sets the timeout applied to user-triggered calls.
    #[must_use]
    pub fn action_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.action_timeout = timeout;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Log settings read from the environment by the front-end.
pub fn log_level_from_env() -> String {
    env::var("TUBEDECK_LOG_LEVEL").unwrap_or_else(|_| defaults::LOG_LEVEL.to_string())
}

/// Optional log file path from `TUBEDECK_LOG_FILE`.
pub fn log_file_from_env() -> Option<String> {
    env::var("TUBEDECK_LOG_FILE").ok().filter(|p| !p.trim().is_empty())
}

fn parse_env_u64(key: &str) -> AppResult<Option<u64>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("{} must be a non-negative integer: {}", key, e))),
        Err(_) => Ok(None),
    }
}

/// Parses and validates the base URL; the path always ends in `/` so that
/// `Url::join` appends endpoints instead of replacing the last segment.
pub fn normalize_server_url(raw: &str) -> AppResult<Url> {
    let mut url = Url::parse(raw.trim())?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(AppError::Config(format!(
                "server URL must use http or https, got {}",
                other
            )))
        }
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_interval_is_500ms() {
        assert_eq!(polling::interval(), Duration::from_millis(500));
        assert_eq!(ClientConfig::default().poll_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_default_has_no_action_timeout() {
        assert!(ClientConfig::default().action_timeout.is_none());
    }

    #[test]
    fn test_normalize_adds_trailing_slash() {
        let url = normalize_server_url("http://media.local:5000/ytdlp").unwrap();
        assert_eq!(url.as_str(), "http://media.local:5000/ytdlp/");

        let root = normalize_server_url("https://media.local").unwrap();
        assert_eq!(root.as_str(), "https://media.local/");
    }

    #[test]
    fn test_normalize_rejects_other_schemes() {
        let err = normalize_server_url("ftp://media.local/").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        assert!(matches!(normalize_server_url("not a url"), Err(AppError::Url(_))));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let result = ClientConfig::default().poll_interval(Duration::ZERO);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_builder_setters() {
        let config = ClientConfig::new("http://localhost:8080")
            .unwrap()
            .action_timeout(Some(Duration::from_secs(30)))
            .connect_timeout(Duration::from_secs(3));
        assert_eq!(config.server_url.as_str(), "http://localhost:8080/");
        assert_eq!(config.action_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
    }
}
