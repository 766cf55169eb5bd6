use std::sync::Arc;
use std::time::Duration;

use wr_core::{ArticleSource, Config, Error, Result, SourceKind};

pub mod wikipedia;

pub use wikipedia::{RestSummaryClient, WikipediaClient};

pub const USER_AGENT: &str = concat!(
    "wikiroll/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/wikiroll/wikiroll)"
);

/// Builds the article source selected in `config`.
pub fn create_source(config: &Config) -> Result<Arc<dyn ArticleSource>> {
    config.validate()?;
    let source: Arc<dyn ArticleSource> = match config.source {
        SourceKind::Wikipedia => Arc::new(WikipediaClient::with_base_url(
            &config.language,
            &config.base_url(),
            config.fetch_timeout(),
        )?),
        SourceKind::Rest => Arc::new(RestSummaryClient::with_base_url(
            &config.language,
            &config.base_url(),
            config.fetch_timeout(),
        )?),
    };
    Ok(source)
}

/// Common utilities for sources
pub(crate) mod utils {
    use super::*;

    pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(Error::from)
    }

    pub fn parse_base_url(base: &str) -> Result<url::Url> {
        url::Url::parse(base).map_err(|e| Error::InvalidUrl(format!("{}: {}", base, e)))
    }

    /// Splits `items` into consecutive chunks of at most `size`.
    pub fn batches<T>(items: &[T], size: usize) -> impl Iterator<Item = &[T]> {
        items.chunks(size.max(1))
    }
}
