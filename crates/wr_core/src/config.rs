use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Which Wikipedia API the article source talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// MediaWiki action API: random page, intro extract, image list, image info
    #[default]
    Wikipedia,
    /// REST `page/random/summary` endpoint, one request per article
    Rest,
}

impl SourceKind {
    pub fn all() -> [SourceKind; 2] {
        [SourceKind::Wikipedia, SourceKind::Rest]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Wikipedia => "wikipedia",
            SourceKind::Rest => "rest",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wikipedia" | "action" => Ok(SourceKind::Wikipedia),
            "rest" => Ok(SourceKind::Rest),
            other => Err(Error::Config(format!("Unknown source: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub language: String,
    pub source: SourceKind,
    /// Overrides `https://{language}.wikipedia.org`
    pub api_base_url: Option<String>,
    pub max_slides: usize,
    pub batch_workers: usize,
    pub look_ahead: usize,
    pub initial_batch: usize,
    pub refill_batch: usize,
    pub fetch_timeout_secs: u64,
    pub retry_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: "ru".to_string(),
            source: SourceKind::default(),
            api_base_url: None,
            max_slides: 10,
            batch_workers: 5,
            look_ahead: 3,
            initial_batch: 5,
            refill_batch: 4,
            fetch_timeout_secs: 15,
            retry_delay_ms: 500,
        }
    }
}

impl Config {
    /// Defaults overridden by `WR_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(language) = lookup("WR_LANGUAGE") {
            self.language = language.trim().to_string();
        }
        if let Some(source) = lookup("WR_SOURCE") {
            self.source = source.parse()?;
        }
        if let Some(url) = lookup("WR_API_BASE_URL") {
            self.api_base_url = Some(url);
        }
        parse_var(&lookup, "WR_MAX_SLIDES", &mut self.max_slides)?;
        parse_var(&lookup, "WR_BATCH_WORKERS", &mut self.batch_workers)?;
        parse_var(&lookup, "WR_LOOK_AHEAD", &mut self.look_ahead)?;
        parse_var(&lookup, "WR_INITIAL_BATCH", &mut self.initial_batch)?;
        parse_var(&lookup, "WR_REFILL_BATCH", &mut self.refill_batch)?;
        parse_var(&lookup, "WR_TIMEOUT_SECS", &mut self.fetch_timeout_secs)?;
        parse_var(&lookup, "WR_RETRY_DELAY_MS", &mut self.retry_delay_ms)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let valid_code = |c: char| c.is_ascii_alphanumeric() || c == '-';
        if self.language.is_empty() || !self.language.chars().all(valid_code) {
            return Err(Error::Config(format!("Invalid language code: {:?}", self.language)));
        }
        let sizes = [
            ("max_slides", self.max_slides),
            ("batch_workers", self.batch_workers),
            ("initial_batch", self.initial_batch),
            ("refill_batch", self.refill_batch),
        ];
        for (name, value) in sizes {
            if value == 0 {
                return Err(Error::Config(format!("{} must be greater than zero", name)));
            }
        }
        if self.fetch_timeout_secs == 0 {
            return Err(Error::Config("fetch_timeout_secs must be greater than zero".to_string()));
        }
        if let Some(base) = &self.api_base_url {
            url::Url::parse(base).map_err(|e| Error::InvalidUrl(format!("{}: {}", base, e)))?;
        }
        Ok(())
    }

    pub fn base_url(&self) -> String {
        match &self.api_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.wikipedia.org", self.language),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} is not a valid number: {:?}", key, raw)))?;
    }
    Ok(())
}
