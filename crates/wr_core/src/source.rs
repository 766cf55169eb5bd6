use async_trait::async_trait;
use crate::types::Article;
use crate::Result;

#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Short name used in logs and on the command line
    fn name(&self) -> &str;

    /// Wiki language code this source fetches from
    fn language(&self) -> &str;

    /// Fetches one random article. An article without a usable image is
    /// still a success; `image_url` is `None` in that case.
    async fn fetch_random_article(&self) -> Result<Article>;
}
