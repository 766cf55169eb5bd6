pub mod action;
pub mod rest;

pub use action::WikipediaClient;
pub use rest::RestSummaryClient;

/// The image-info query accepts at most this many titles per request.
pub const IMAGEINFO_BATCH_LIMIT: usize = 20;
