pub mod cli;
pub mod logging;
pub mod prefetch;
pub mod sources;

pub use cli::{handle_command, SourceArgs, SourceCommands};
pub use prefetch::{near_end, BatchReport, PrefetchBuffer, PrefetchConfig};
pub use sources::{create_source, RestSummaryClient, WikipediaClient};
