use clap::{Args, Subcommand};
use wr_core::{Config, Result, SourceKind};

use crate::prefetch::{PrefetchBuffer, PrefetchConfig};
use crate::sources::create_source;

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    #[command(subcommand)]
    pub command: SourceCommands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SourceCommands {
    /// Fetch a batch of random articles and print the ones with images as JSON
    Fetch {
        /// How many articles to request
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
    /// List available article sources
    List,
}

pub async fn handle_command(args: SourceArgs, config: &Config) -> Result<()> {
    match args.command {
        SourceCommands::Fetch { count } => {
            let source = create_source(config)?;
            // One batch must be able to hold everything it fetched.
            let prefetch = PrefetchConfig {
                max_slides: count.max(1),
                ..PrefetchConfig::from(config)
            };
            let mut buffer = PrefetchBuffer::new(source, prefetch);
            if let Some(report) = buffer.load(count).await {
                eprintln!(
                    "Fetched {}/{} articles ({} failed, {} without image)",
                    report.appended, report.requested, report.failed, report.without_image
                );
            }
            let articles: Vec<_> = buffer.slides().collect();
            println!("{}", serde_json::to_string_pretty(&articles)?);
        }
        SourceCommands::List => {
            println!("{}", list_sources(config));
        }
    }
    Ok(())
}

fn list_sources(config: &Config) -> String {
    SourceKind::all()
        .iter()
        .map(|kind| {
            let marker = if *kind == config.source { "*" } else { " " };
            format!("{} {}", marker, kind)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
