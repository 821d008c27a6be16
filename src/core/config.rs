use super::pacing::Pacer;
use super::price::{Period, RangeSpec};
use super::screen::Thresholds;
use crate::providers::util::RetryPolicy;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_YAHOO_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_YAHOO_COOKIE_URL: &str = "https://fc.yahoo.com/consent";
pub const DEFAULT_NASDAQ_URL: &str = "https://www.nasdaqtrader.com/dynamic/SymDir";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
    /// Page that sets the session cookie needed for quote lookups.
    #[serde(default)]
    pub cookie_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NasdaqProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
    pub nasdaq: Option<NasdaqProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: DEFAULT_YAHOO_URL.to_string(),
                cookie_url: None,
            }),
            nasdaq: Some(NasdaqProviderConfig {
                base_url: DEFAULT_NASDAQ_URL.to_string(),
            }),
        }
    }
}

impl ProvidersConfig {
    pub fn yahoo_url(&self) -> &str {
        self.yahoo
            .as_ref()
            .map_or(DEFAULT_YAHOO_URL, |p| p.base_url.as_str())
    }

    pub fn yahoo_cookie_url(&self) -> &str {
        self.yahoo
            .as_ref()
            .and_then(|p| p.cookie_url.as_deref())
            .unwrap_or(DEFAULT_YAHOO_COOKIE_URL)
    }

    pub fn nasdaq_url(&self) -> &str {
        self.nasdaq
            .as_ref()
            .map_or(DEFAULT_NASDAQ_URL, |p| p.base_url.as_str())
    }
}

/// Price history downloads into the cache.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DownloadConfig {
    pub period: Period,
    pub delay_ms: u64,
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        DownloadConfig {
            period: Period::EightYears,
            delay_ms: 500,
            max_attempts: 3,
            backoff_ms: 1000,
        }
    }
}

impl DownloadConfig {
    pub fn range(&self) -> RangeSpec {
        RangeSpec::Period(self.period)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }

    pub fn pacer(&self) -> Pacer {
        Pacer::new(Duration::from_millis(self.delay_ms))
    }
}

/// Summary collection and filter thresholds.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ScreenConfig {
    pub min_price: f64,
    pub min_market_cap: f64,
    pub min_volume: f64,
    pub delay_ms: u64,
    pub throttle_every: usize,
    pub throttle_pause_ms: u64,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        ScreenConfig {
            min_price: thresholds.min_price,
            min_market_cap: thresholds.min_market_cap,
            min_volume: thresholds.min_volume,
            delay_ms: 100,
            throttle_every: 10,
            throttle_pause_ms: 1000,
        }
    }
}

impl ScreenConfig {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            min_price: self.min_price,
            min_market_cap: self.min_market_cap,
            min_volume: self.min_volume,
        }
    }

    pub fn pacer(&self) -> Pacer {
        Pacer::new(Duration::from_millis(self.delay_ms)).with_throttle(
            self.throttle_every,
            Duration::from_millis(self.throttle_pause_ms),
        )
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub data_path: Option<String>,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub screen: ScreenConfig,
}

impl AppConfig {
    /// Loads the default config file, or built-in defaults when it does not exist.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "stockfetch", "stockfetch")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "stockfetch", "stockfetch")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        Ok(self.data_path()?.join("data_cache"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").expect("Failed to deserialize");
        assert_eq!(config.providers.yahoo_url(), DEFAULT_YAHOO_URL);
        assert_eq!(config.providers.nasdaq_url(), DEFAULT_NASDAQ_URL);
        assert_eq!(config.download.period, Period::EightYears);
        assert_eq!(config.download.max_attempts, 3);
        assert_eq!(config.download.retry_policy().backoff, Duration::from_secs(1));
        assert_eq!(config.download.pacer().delay, Duration::from_millis(500));
        assert_eq!(config.screen.thresholds(), Thresholds::default());

        let pacer = config.screen.pacer();
        assert_eq!(pacer.delay, Duration::from_millis(100));
        assert_eq!(pacer.throttle_every, Some(10));
        assert_eq!(pacer.throttle_pause, Duration::from_secs(1));
    }

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
providers:
  yahoo:
    base_url: "http://example.com/yahoo"
    cookie_url: "http://example.com/consent"
  nasdaq:
    base_url: "http://example.com/nasdaq"
data_path: "/tmp/stockfetch"
download:
  period: "10y"
  delay_ms: 0
screen:
  min_price: 1.5
  throttle_every: 0
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.providers.yahoo_url(), "http://example.com/yahoo");
        assert_eq!(
            config.providers.yahoo_cookie_url(),
            "http://example.com/consent"
        );
        assert_eq!(config.providers.nasdaq_url(), "http://example.com/nasdaq");
        assert_eq!(
            config.cache_dir().unwrap(),
            PathBuf::from("/tmp/stockfetch/data_cache")
        );
        assert_eq!(config.download.range(), RangeSpec::Period(Period::TenYears));
        assert_eq!(config.download.delay_ms, 0);
        assert_eq!(config.download.backoff_ms, 1000);
        assert_eq!(config.screen.min_price, 1.5);
        assert_eq!(config.screen.min_volume, 100_000.0);
        assert_eq!(config.screen.pacer().throttle_every, None);
    }

    #[test]
    fn test_partial_providers_fall_back() {
        let config: AppConfig = serde_yaml::from_str(
            r#"
providers:
  yahoo:
    base_url: "http://localhost:1234"
"#,
        )
        .unwrap();
        assert_eq!(config.providers.yahoo_url(), "http://localhost:1234");
        assert_eq!(config.providers.yahoo_cookie_url(), DEFAULT_YAHOO_COOKIE_URL);
        assert_eq!(config.providers.nasdaq_url(), DEFAULT_NASDAQ_URL);
    }
}
