use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: u64,
    pub title: String,
    pub summary: String,
    pub image_url: Option<String>,
    pub language: String,
    pub fetched_at: DateTime<Utc>,
}

impl Article {
    pub fn new(
        id: u64,
        title: impl Into<String>,
        summary: impl Into<String>,
        image_url: Option<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            summary: summary.into(),
            image_url,
            language: language.into(),
            fetched_at: Utc::now(),
        }
    }

    /// Link to the article that survives renames.
    pub fn canonical_url(&self) -> String {
        format!("https://{}.wikipedia.org/?curid={}", self.language, self.id)
    }

    /// Summary text up to the first line break.
    pub fn lead_paragraph(&self) -> &str {
        match self.summary.find('\n') {
            Some(end) => &self.summary[..end],
            None => &self.summary,
        }
    }

    pub fn has_image(&self) -> bool {
        self.image_url.is_some()
    }
}
