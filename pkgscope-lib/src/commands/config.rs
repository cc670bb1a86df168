use crate::Result;
use crate::facts::Upstreams;
use crate::facts::key_selector::KeyRotation;
use crate::facts::resilient_http::{HttpSettings, RetryPolicy};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{NaiveDate, Utc};
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "pkgscope.toml";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Base URLs of the upstream services
    #[serde(default)]
    pub upstreams: Upstreams,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub aggregate: AggregateConfig,

    #[serde(default)]
    pub downloads: DownloadsConfig,

    #[serde(default)]
    pub vulnerability: VulnerabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct HttpConfig {
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    #[serde(with = "humantime_serde")]
    pub slow_call_threshold: Duration,

    pub max_connections_per_host: usize,
    pub max_idle_per_host: usize,

    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,

    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        let settings = HttpSettings::default();
        Self {
            request_timeout: settings.request_timeout,
            slow_call_threshold: settings.slow_call_threshold,
            max_connections_per_host: settings.max_connections_per_host,
            max_idle_per_host: settings.max_idle_per_host,
            idle_timeout: settings.idle_timeout,
            user_agent: settings.user_agent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct RetryConfig {
    pub max_retries: u32,

    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,

    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,

    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            base_delay: policy.base_delay,
            max_delay: policy.max_delay,
            backoff_multiplier: policy.backoff_multiplier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct AggregateConfig {
    /// Aggregations slower than this are flagged, never aborted
    #[serde(with = "humantime_serde")]
    pub soft_deadline: Duration,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            soft_deadline: Duration::from_secs(8),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct DownloadsConfig {
    pub first_available_date: NaiveDate,
    pub max_days_per_request: u32,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            first_available_date: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default(),
            max_days_per_request: 365,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct VulnerabilityConfig {
    pub key_rotation: KeyRotation,
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// Without an explicit path, `pkgscope.toml` in the working directory is used when present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if it fails validation
    pub fn load(config_path: Option<&Utf8Path>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading pkgscope configuration file '{path}'"))?;
            (path.to_path_buf(), text)
        } else {
            let path = Utf8PathBuf::from(DEFAULT_CONFIG_FILE);
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    log::debug!("No '{DEFAULT_CONFIG_FILE}' found, using the built-in configuration");
                    return Ok(Self::default());
                }
                Err(e) => return Err(e).into_app_err_with(|| format!("reading pkgscope configuration file '{path}'")),
            }
        };

        let config: Self = toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))?;
        config.validate()?;

        Ok(config)
    }

    /// Save the default configuration to a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        fs::write(output_path, DEFAULT_CONFIG_TOML).into_app_err_with(|| format!("writing default configuration to {output_path}"))?;
        Ok(())
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if a value is out of range or inconsistent with another
    pub fn validate(&self) -> Result<()> {
        for (name, url) in self.upstreams.iter() {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(app_err!("upstreams.{name} must be an http or https URL, got '{url}'"));
            }
        }

        if self.http.request_timeout.is_zero() {
            return Err(app_err!("http.request_timeout must be greater than zero"));
        }

        if self.http.max_connections_per_host == 0 {
            return Err(app_err!("http.max_connections_per_host must be at least 1"));
        }

        if self.http.user_agent.trim().is_empty() {
            return Err(app_err!("http.user_agent must not be empty"));
        }

        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(app_err!(
                "retry.backoff_multiplier must be at least 1.0, got {}",
                self.retry.backoff_multiplier
            ));
        }

        if self.retry.base_delay > self.retry.max_delay {
            return Err(app_err!(
                "retry.base_delay ({:?}) must not exceed retry.max_delay ({:?})",
                self.retry.base_delay,
                self.retry.max_delay
            ));
        }

        if self.aggregate.soft_deadline.is_zero() {
            return Err(app_err!("aggregate.soft_deadline must be greater than zero"));
        }

        if self.downloads.max_days_per_request == 0 {
            return Err(app_err!("downloads.max_days_per_request must be at least 1"));
        }

        let today = Utc::now().date_naive();
        if self.downloads.first_available_date > today {
            return Err(app_err!(
                "downloads.first_available_date ({}) must not be in the future",
                self.downloads.first_available_date
            ));
        }

        Ok(())
    }

    /// Transport settings for the shared HTTP client.
    #[must_use]
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            request_timeout: self.http.request_timeout,
            slow_call_threshold: self.http.slow_call_threshold,
            max_connections_per_host: self.http.max_connections_per_host,
            max_idle_per_host: self.http.max_idle_per_host,
            idle_timeout: self.http.idle_timeout,
            user_agent: self.http.user_agent.clone(),
            retry: RetryPolicy {
                max_retries: self.retry.max_retries,
                base_delay: self.retry.base_delay,
                max_delay: self.retry.max_delay,
                backoff_multiplier: self.retry.backoff_multiplier,
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to Config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
    }

    #[test]
    fn test_default_config_matches_built_in_defaults() {
        let config = Config::default();
        assert_eq!(config.upstreams, Upstreams::default());
        assert_eq!(config.http.request_timeout, Duration::from_secs(3));
        assert_eq!(config.http.slow_call_threshold, Duration::from_secs(5));
        assert_eq!(config.http.max_connections_per_host, 50);
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.aggregate.soft_deadline, Duration::from_secs(8));
        assert_eq!(config.downloads, DownloadsConfig::default());
        assert_eq!(config.vulnerability.key_rotation, KeyRotation::RoundRobin);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: Config = toml::from_str("[aggregate]\nsoft_deadline = \"2s\"\n").unwrap();
        assert_eq!(config.aggregate.soft_deadline, Duration::from_secs(2));
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.upstreams, Upstreams::default());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(toml::from_str::<Config>("[http]\nrequest_timeout = \"1s\"\nbogus = 1\n").is_err());
        assert!(toml::from_str::<Config>("[secrets]\ngithub_token = \"x\"\n").is_err());
    }

    #[test]
    fn test_parse_random_key_rotation() {
        let config: Config = toml::from_str("[vulnerability]\nkey_rotation = \"random\"\n").unwrap();
        assert_eq!(config.vulnerability.key_rotation, KeyRotation::Random);
    }

    #[test]
    fn test_validate_backoff_multiplier_below_one() {
        let mut config = Config::default();
        config.retry.backoff_multiplier = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_base_delay_above_max_delay() {
        let mut config = Config::default();
        config.retry.base_delay = Duration::from_secs(20);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_connections() {
        let mut config = Config::default();
        config.http.max_connections_per_host = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_days_per_request() {
        let mut config = Config::default();
        config.downloads.max_days_per_request = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_non_http_upstream() {
        let mut config = Config::default();
        config.upstreams.bundle = url::Url::parse("ftp://bundlephobia.com").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_http_settings_carry_retry_policy() {
        let mut config = Config::default();
        config.retry.max_retries = 1;
        config.retry.base_delay = Duration::from_millis(5);

        let settings = config.http_settings();
        assert_eq!(settings.retry.max_retries, 1);
        assert_eq!(settings.retry.base_delay, Duration::from_millis(5));
        assert_eq!(settings.request_timeout, config.http.request_timeout);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_save_default_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let output_path = Utf8PathBuf::try_from(tmp.path().join("pkgscope.toml")).unwrap();
        Config::save_default(&output_path).unwrap();
        let loaded = Config::load(Some(&output_path)).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_load_reports_parse_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(tmp.path().join("broken.toml")).unwrap();
        fs::write(&path, "[http\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_default_config_toml_is_not_empty() {
        assert!(!DEFAULT_CONFIG_TOML.is_empty());
    }
}
