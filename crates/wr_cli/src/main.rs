mod browser;
mod carousel;
mod console;

use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser};
use tokio::io::BufReader;
use tracing::Level;
use wr_core::{Config, SourceKind};
use wr_sources::logging::{init_logging, LogOutput};
use wr_sources::{create_source, handle_command, PrefetchBuffer, PrefetchConfig, SourceArgs};

use carousel::Carousel;

#[derive(Parser, Debug)]
#[command(author, version, about = "Random Wikipedia articles in the terminal", long_about = None)]
pub struct Cli {
    /// Wiki language code, e.g. ru or en
    #[arg(long, global = true)]
    language: Option<String>,
    /// Which Wikipedia API to fetch articles from
    #[arg(long, global = true, value_enum)]
    source: Option<SourceKind>,
    /// Override the API host, e.g. a local mirror
    #[arg(long, global = true)]
    api_base_url: Option<String>,
    /// Give up on a single article fetch after this many seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    /// Log progress at info level
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Show random articles one at a time and open the one you like
    Roll,
    /// Browse prefetched articles with images
    Carousel(CarouselArgs),
    /// Work with article sources directly
    Source(SourceArgs),
}

#[derive(Args, Debug, Default)]
struct CarouselArgs {
    /// Most slides kept in memory; the oldest are dropped first
    #[arg(long)]
    max_slides: Option<usize>,
    /// Concurrent fetches within one batch
    #[arg(long)]
    batch_workers: Option<usize>,
    /// Prefetch when the cursor is this close to the last slide
    #[arg(long)]
    look_ahead: Option<usize>,
    /// Articles requested at startup
    #[arg(long)]
    initial_batch: Option<usize>,
    /// Articles requested on each refill
    #[arg(long)]
    refill_batch: Option<usize>,
}

impl Cli {
    /// The carousel owns the terminal, so it only logs when given a file.
    fn log_output(&self) -> LogOutput {
        match (&self.log_file, &self.command) {
            (Some(path), _) => LogOutput::File(path.clone()),
            (None, Some(Commands::Carousel(_))) => LogOutput::Discard,
            (None, _) => LogOutput::Stderr,
        }
    }

    fn apply(&self, config: &mut Config) {
        if let Some(language) = &self.language {
            config.language = language.clone();
        }
        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(url) = &self.api_base_url {
            config.api_base_url = Some(url.clone());
        }
        if let Some(secs) = self.timeout_secs {
            config.fetch_timeout_secs = secs;
        }
    }
}

impl CarouselArgs {
    fn apply(&self, config: &mut Config) {
        let overrides = [
            (self.max_slides, &mut config.max_slides),
            (self.batch_workers, &mut config.batch_workers),
            (self.look_ahead, &mut config.look_ahead),
            (self.initial_batch, &mut config.initial_batch),
            (self.refill_batch, &mut config.refill_batch),
        ];
        for (value, target) in overrides {
            if let Some(value) = value {
                *target = value;
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::INFO } else { Level::WARN };
    let logger = init_logging(level, &cli.log_output())?.with_prefix("[wr]".to_string());

    let mut config = Config::from_env()?;
    cli.apply(&mut config);
    if let Some(Commands::Carousel(args)) = &cli.command {
        args.apply(&mut config);
    }
    config.validate()?;
    logger.info(&format!("⚙️ Using {} ({})", config.source, config.base_url()));

    match cli.command.unwrap_or(Commands::Roll) {
        Commands::Roll => {
            let source = create_source(&config)?;
            let mut stdout = std::io::stdout();
            let liked = console::roll(
                source.as_ref(),
                config.fetch_timeout(),
                config.retry_delay(),
                BufReader::new(tokio::io::stdin()),
                &mut stdout,
            )
            .await?;
            if let Some(article) = liked {
                let url = article.canonical_url();
                if let Err(e) = browser::open(&url) {
                    logger.warn(&format!("Could not open {}: {}", url, e));
                    writeln!(stdout, "{}\n{}", e, url)?;
                }
            }
        }
        Commands::Carousel(_) => {
            let source = create_source(&config)?;
            let buffer = PrefetchBuffer::new(source, PrefetchConfig::from(&config));
            let carousel = Carousel::new(buffer, config.refill_batch);
            carousel::run(carousel, config.initial_batch).await?;
        }
        Commands::Source(args) => {
            handle_command(args, &config).await?;
        }
    }

    Ok(())
}
