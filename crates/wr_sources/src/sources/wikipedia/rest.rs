use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;
use wr_core::{is_raster_image, Article, ArticleSource, Error, Result};

use crate::logging::Logger;
use crate::sources::utils;

/// Random articles through the REST `page/random/summary` endpoint. One
/// request yields the title, intro and a lead image.
#[derive(Debug, Clone)]
pub struct RestSummaryClient {
    client: reqwest::Client,
    summary_url: Url,
    language: String,
    logger: Logger,
}

#[derive(Debug, Deserialize)]
struct Summary {
    title: Option<String>,
    pageid: Option<u64>,
    #[serde(default)]
    extract: String,
    thumbnail: Option<ImageSource>,
    originalimage: Option<ImageSource>,
}

#[derive(Debug, Deserialize)]
struct ImageSource {
    source: Option<String>,
}

impl Summary {
    /// Full-size image if it is a raster file, otherwise the thumbnail.
    fn image_url(&self) -> Option<String> {
        [&self.originalimage, &self.thumbnail]
            .into_iter()
            .flatten()
            .filter_map(|image| image.source.as_deref())
            .find(|url| is_raster_image(url))
            .map(str::to_string)
    }
}

impl RestSummaryClient {
    pub fn new(language: &str, timeout: Duration) -> Result<Self> {
        Self::with_base_url(language, &format!("https://{}.wikipedia.org", language), timeout)
    }

    pub fn with_base_url(language: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        let summary_url = utils::parse_base_url(&format!(
            "{}/api/rest_v1/page/random/summary",
            base_url.trim_end_matches('/')
        ))?;
        Ok(Self {
            client: utils::http_client(timeout)?,
            summary_url,
            language: language.to_string(),
            logger: Logger::new()
                .with_prefix("[rest]".to_string())
                .with_prefix(format!("[{}]", language)),
        })
    }
}

#[async_trait]
impl ArticleSource for RestSummaryClient {
    fn name(&self) -> &str {
        "rest"
    }

    fn language(&self) -> &str {
        &self.language
    }

    async fn fetch_random_article(&self) -> Result<Article> {
        let summary: Summary = self
            .client
            .get(self.summary_url.clone())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let image_url = summary.image_url();
        let id = summary.pageid.ok_or_else(|| Error::missing("pageid"))?;
        let title = summary.title.ok_or_else(|| Error::missing("title"))?;
        self.logger.debug(&format!("random summary {} ({})", title, id));

        Ok(Article::new(id, title, summary.extract.trim(), image_url, self.language.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use wr_core::FailureKind;

    async fn client_with_body(body: serde_json::Value) -> (MockServer, RestSummaryClient) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/rest_v1/page/random/summary"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        let client =
            RestSummaryClient::with_base_url("en", &server.uri(), Duration::from_secs(5)).unwrap();
        (server, client)
    }

    #[tokio::test]
    async fn test_fetch_summary() {
        let (_server, client) = client_with_body(json!({
            "title": "Lighthouse",
            "pageid": 1001,
            "extract": "A lighthouse is a tower.\n",
            "thumbnail": { "source": "https://upload.wikimedia.org/thumb/320px-Lighthouse.jpg" },
            "originalimage": { "source": "https://upload.wikimedia.org/Lighthouse.jpg" },
            "content_urls": { "desktop": { "page": "https://en.wikipedia.org/wiki/Lighthouse" } }
        }))
        .await;

        let article = client.fetch_random_article().await.unwrap();
        assert_eq!(article.id, 1001);
        assert_eq!(article.title, "Lighthouse");
        assert_eq!(article.summary, "A lighthouse is a tower.");
        assert_eq!(
            article.image_url.as_deref(),
            Some("https://upload.wikimedia.org/Lighthouse.jpg")
        );
        assert_eq!(article.language, "en");
    }

    #[tokio::test]
    async fn test_svg_original_falls_back_to_thumbnail() {
        let (_server, client) = client_with_body(json!({
            "title": "Flag",
            "pageid": 5,
            "extract": "",
            "thumbnail": {
                "source": "https://upload.wikimedia.org/thumb/Flag.svg/320px-Flag.svg.png"
            },
            "originalimage": { "source": "https://upload.wikimedia.org/Flag.svg" }
        }))
        .await;

        let article = client.fetch_random_article().await.unwrap();
        assert_eq!(
            article.image_url.as_deref(),
            Some("https://upload.wikimedia.org/thumb/Flag.svg/320px-Flag.svg.png")
        );
    }

    #[tokio::test]
    async fn test_summary_without_image() {
        let (_server, client) =
            client_with_body(json!({ "title": "Stub", "pageid": 6, "extract": "Short." })).await;
        let article = client.fetch_random_article().await.unwrap();
        assert!(!article.has_image());
    }

    #[tokio::test]
    async fn test_missing_pageid_is_decode_failure() {
        let (_server, client) = client_with_body(json!({ "title": "Broken" })).await;
        let err = client.fetch_random_article().await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Decode);
    }
}
