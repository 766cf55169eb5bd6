use tracing::{info, warn};
use wr_core::{Error, Result};

/// Opens `url` in the user's default browser.
pub fn open(url: &str) -> Result<()> {
    info!("🌐 Opening {}", url);
    webbrowser::open(url).map_err(|e| {
        warn!("⚠️ Could not open {}: {}", url, e);
        Error::Browser(format!("{}: {}", url, e))
    })
}
