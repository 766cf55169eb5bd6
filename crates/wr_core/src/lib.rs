pub mod config;
pub mod error;
pub mod gesture;
pub mod source;
pub mod types;

pub use config::{Config, SourceKind};
pub use error::{Error, FailureKind};
pub use gesture::DoubleActivation;
pub use source::ArticleSource;
pub use types::Article;

pub type Result<T> = std::result::Result<T, Error>;

/// Raster formats a slide can display.
pub const RASTER_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

/// Returns true if the URL points at a `.jpg`, `.jpeg` or `.png` file.
pub fn is_raster_image(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    RASTER_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
