use crate::common::error::{Result, ScraperError};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub crawl: CrawlConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("city_scrapers/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Days before today included in the calendar window
    pub lookback_days: i64,
    /// Days after today included in the calendar window
    pub lookahead_days: i64,
    pub output_dir: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            lookback_days: 180,
            lookahead_days: 180,
            output_dir: "output".to_string(),
        }
    }
}

impl Config {
    /// Load a TOML config file, falling back to defaults when it is absent.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let config_content = fs::read_to_string(path).map_err(|e| {
                ScraperError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
            })?;
            Self::from_toml(&config_content)?
        } else {
            Self::default()
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(agent) = std::env::var("CITY_SCRAPERS_USER_AGENT") {
            if !agent.trim().is_empty() {
                self.http.user_agent = agent;
            }
        }
        if let Ok(dir) = std::env::var("CITY_SCRAPERS_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.crawl.output_dir = dir;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.crawl.lookback_days < 0 || self.crawl.lookahead_days < 0 {
            return Err(ScraperError::Config(
                "lookback_days and lookahead_days must not be negative".into(),
            ));
        }
        if self.http.timeout_seconds == 0 {
            return Err(ScraperError::Config("timeout_seconds must be positive".into()));
        }
        Ok(())
    }
}
