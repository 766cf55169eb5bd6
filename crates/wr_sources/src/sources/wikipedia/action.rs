use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;
use wr_core::{is_raster_image, Article, ArticleSource, Error, Result};

use super::IMAGEINFO_BATCH_LIMIT;
use crate::logging::Logger;
use crate::sources::utils;

/// Random articles through the MediaWiki action API (`/w/api.php`).
#[derive(Debug, Clone)]
pub struct WikipediaClient {
    client: reqwest::Client,
    api_url: Url,
    language: String,
    logger: Logger,
}

#[derive(Debug, Deserialize)]
struct QueryResponse<T> {
    query: Option<T>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct RandomQuery {
    random: Vec<RandomPage>,
}

#[derive(Debug, Deserialize)]
struct RandomPage {
    id: u64,
    title: String,
}

#[derive(Debug, Default, Deserialize)]
struct PagesQuery {
    #[serde(default)]
    normalized: Vec<Normalized>,
    #[serde(default)]
    pages: HashMap<String, PageEntry>,
}

#[derive(Debug, Deserialize)]
struct Normalized {
    from: String,
    to: String,
}

#[derive(Debug, Default, Deserialize)]
struct PageEntry {
    title: Option<String>,
    extract: Option<String>,
    #[serde(default)]
    images: Vec<ImageRef>,
    #[serde(default)]
    imageinfo: Vec<ImageInfo>,
}

#[derive(Debug, Deserialize)]
struct ImageRef {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ImageInfo {
    url: Option<String>,
}

impl WikipediaClient {
    pub fn new(language: &str, timeout: Duration) -> Result<Self> {
        Self::with_base_url(language, &format!("https://{}.wikipedia.org", language), timeout)
    }

    pub fn with_base_url(language: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        let api_url =
            utils::parse_base_url(&format!("{}/w/api.php", base_url.trim_end_matches('/')))?;
        Ok(Self {
            client: utils::http_client(timeout)?,
            api_url,
            language: language.to_string(),
            logger: Logger::new()
                .with_prefix("[wikipedia]".to_string())
                .with_prefix(format!("[{}]", language)),
        })
    }

    async fn query<T: DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T> {
        let response = self
            .client
            .get(self.api_url.clone())
            .query(&[("action", "query"), ("format", "json")])
            .query(params)
            .send()
            .await?
            .error_for_status()?;
        let body: QueryResponse<T> = response.json().await?;
        if let Some(error) = body.error {
            return Err(Error::Decode(format!("API error {}: {}", error.code, error.info)));
        }
        body.query.ok_or_else(|| Error::missing("query"))
    }

    async fn random_page(&self) -> Result<RandomPage> {
        let query: RandomQuery = self
            .query(&[("list", "random"), ("rnnamespace", "0"), ("rnlimit", "1")])
            .await?;
        query.random.into_iter().next().ok_or_else(|| Error::missing("random[0]"))
    }

    async fn intro_extract(&self, page_id: u64) -> Result<String> {
        let id = page_id.to_string();
        let mut query: PagesQuery = self
            .query(&[
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("pageids", id.as_str()),
            ])
            .await?;
        let page = query
            .pages
            .remove(&id)
            .ok_or_else(|| Error::missing(&format!("pages.{}", id)))?;
        Ok(page.extract.unwrap_or_default().trim().to_string())
    }

    async fn image_titles(&self, page_id: u64) -> Result<Vec<String>> {
        let id = page_id.to_string();
        let query: PagesQuery = self
            .query(&[("prop", "images"), ("pageids", id.as_str()), ("imlimit", "max")])
            .await?;
        Ok(query
            .pages
            .into_values()
            .flat_map(|page| page.images.into_iter().map(|image| image.title))
            .collect())
    }

    /// Resolves image titles to direct URLs, one request per batch of at most
    /// `IMAGEINFO_BATCH_LIMIT` titles. Returns the first raster URL in title
    /// order and stops issuing requests once one is found.
    async fn first_raster_url(&self, titles: &[String]) -> Result<Option<String>> {
        for batch in utils::batches(titles, IMAGEINFO_BATCH_LIMIT) {
            let joined = batch.join("|");
            let query: PagesQuery = self
                .query(&[("prop", "imageinfo"), ("iiprop", "url"), ("titles", joined.as_str())])
                .await?;

            let renamed: HashMap<&str, &str> = query
                .normalized
                .iter()
                .map(|n| (n.from.as_str(), n.to.as_str()))
                .collect();
            let urls: HashMap<&str, &str> = query
                .pages
                .values()
                .filter_map(|page| {
                    let title = page.title.as_deref()?;
                    let url = page.imageinfo.first()?.url.as_deref()?;
                    Some((title, url))
                })
                .collect();

            let found = batch.iter().find_map(|title| {
                let title = renamed.get(title.as_str()).copied().unwrap_or(title.as_str());
                urls.get(title).filter(|url| is_raster_image(url)).map(|url| url.to_string())
            });
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl ArticleSource for WikipediaClient {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn language(&self) -> &str {
        &self.language
    }

    async fn fetch_random_article(&self) -> Result<Article> {
        let page = self.random_page().await?;
        self.logger.debug(&format!("random page {} ({})", page.title, page.id));

        let summary = self.intro_extract(page.id).await?;
        let titles = self.image_titles(page.id).await?;
        self.logger.debug(&format!("{} image references for {}", titles.len(), page.title));

        let image_url = self.first_raster_url(&titles).await?;
        if image_url.is_none() {
            self.logger.debug(&format!("no raster image for {}", page.title));
        }

        Ok(Article::new(page.id, page.title, summary, image_url, self.language.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use wr_core::FailureKind;

    async fn mount_page(server: &MockServer, id: u64, title: &str, extract: &str, images: &[&str]) {
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("list", "random"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "batchcomplete": "",
                "query": { "random": [{ "id": id, "ns": 0, "title": title }] }
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("prop", "extracts"))
            .and(query_param("pageids", id.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": { "pages": { id.to_string(): {
                    "pageid": id, "title": title, "extract": extract
                } } }
            })))
            .mount(server)
            .await;

        let images: Vec<_> = images.iter().map(|t| json!({ "ns": 6, "title": t })).collect();
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("prop", "images"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": { "pages": { id.to_string(): {
                    "pageid": id, "title": title, "images": images
                } } }
            })))
            .mount(server)
            .await;
    }

    fn imageinfo_body(titles: &[&str]) -> serde_json::Value {
        let pages: serde_json::Map<String, serde_json::Value> = titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                let file = title.trim_start_matches("File:");
                (
                    format!("-{}", i + 1),
                    json!({
                        "ns": 6,
                        "title": title,
                        "imageinfo": [{ "url": format!("https://upload.wikimedia.org/x/{}", file) }]
                    }),
                )
            })
            .collect();
        json!({ "query": { "pages": pages } })
    }

    fn client_for(server: &MockServer) -> WikipediaClient {
        WikipediaClient::with_base_url("ru", &server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_random_article() {
        let server = MockServer::start().await;
        let titles = ["File:Flag.svg", "File:Cat.JPG", "File:Dog.png"];
        mount_page(&server, 42, "Кошка", "  Кошка — животное.\nВторой абзац.  ", &titles).await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("prop", "imageinfo"))
            .and(query_param("titles", titles.join("|")))
            .respond_with(ResponseTemplate::new(200).set_body_json(imageinfo_body(&titles)))
            .expect(1)
            .mount(&server)
            .await;

        let article = client_for(&server).fetch_random_article().await.unwrap();
        assert_eq!(article.id, 42);
        assert_eq!(article.title, "Кошка");
        assert_eq!(article.summary, "Кошка — животное.\nВторой абзац.");
        assert_eq!(article.image_url.as_deref(), Some("https://upload.wikimedia.org/x/Cat.JPG"));
        assert_eq!(article.canonical_url(), "https://ru.wikipedia.org/?curid=42");
    }

    #[tokio::test]
    async fn test_page_without_images() {
        let server = MockServer::start().await;
        mount_page(&server, 7, "Пустая", "Текст.", &[]).await;

        let article = client_for(&server).fetch_random_article().await.unwrap();
        assert_eq!(article.title, "Пустая");
        assert!(article.image_url.is_none());
    }

    #[tokio::test]
    async fn test_image_titles_resolved_in_batches_of_twenty() {
        let server = MockServer::start().await;
        let mut titles: Vec<String> = (0..25).map(|i| format!("File:Icon{}.svg", i)).collect();
        titles[22] = "File:Photo.jpeg".to_string();
        let title_refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        mount_page(&server, 9, "Много", "", &title_refs).await;

        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("prop", "imageinfo"))
            .and(query_param("titles", title_refs[..20].join("|")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(imageinfo_body(&title_refs[..20])),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("prop", "imageinfo"))
            .and(query_param("titles", title_refs[20..].join("|")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(imageinfo_body(&title_refs[20..])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let article = client_for(&server).fetch_random_article().await.unwrap();
        assert_eq!(article.image_url.as_deref(), Some("https://upload.wikimedia.org/x/Photo.jpeg"));
    }

    #[tokio::test]
    async fn test_normalized_titles_are_followed() {
        let server = MockServer::start().await;
        mount_page(&server, 11, "Мост", "", &["File:Old bridge.png"]).await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("prop", "imageinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": {
                    "normalized": [{ "from": "File:Old bridge.png", "to": "Файл:Old bridge.png" }],
                    "pages": { "-1": {
                        "title": "Файл:Old bridge.png",
                        "imageinfo": [{ "url": "https://upload.wikimedia.org/x/Old_bridge.png" }]
                    } }
                }
            })))
            .mount(&server)
            .await;

        let article = client_for(&server).fetch_random_article().await.unwrap();
        assert_eq!(
            article.image_url.as_deref(),
            Some("https://upload.wikimedia.org/x/Old_bridge.png")
        );
    }

    #[tokio::test]
    async fn test_malformed_response_is_decode_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "query": { "random": [] } })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_random_article().await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Decode);
        assert!(err.to_string().contains("random[0]"));
    }

    #[tokio::test]
    async fn test_api_error_is_decode_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": { "code": "badvalue", "info": "Unrecognized value" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_random_article().await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Decode);
        assert!(err.to_string().contains("badvalue"));
    }

    #[tokio::test]
    async fn test_server_error_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_random_article().await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Transport);
    }
}
