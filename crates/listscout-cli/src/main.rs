mod output;
mod scrape;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "listscout")]
#[command(about = "Scrape marketplace listing pages into JSON")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Paginate a single search or category URL.
    Scrape {
        #[arg(long)]
        url: String,
        /// Targets file to take the proxy pool from.
        #[arg(long)]
        targets: Option<PathBuf>,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Paginate every category in the targets file.
    Categories {
        /// Defaults to `LISTSCOUT_TARGETS_PATH`.
        #[arg(long)]
        file: Option<PathBuf>,
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Debug, Args, PartialEq)]
struct RunArgs {
    /// Defaults to `LISTSCOUT_MAX_PAGES`.
    #[arg(long)]
    max_pages: Option<u32>,
    /// Use the concurrent engine instead of the adaptive serialized one.
    #[arg(long)]
    concurrent: bool,
    /// Trim, drop incomplete, dedupe by url, and add a parsed `price_value`.
    #[arg(long)]
    clean: bool,
    /// Write JSON here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Abort the run after this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = listscout_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Scrape { url, targets, run }) => {
            let proxies = match targets {
                Some(path) => scrape::load_proxies(&path)?,
                None => Vec::new(),
            };
            scrape::run_scrape(&config, &url, proxies, &run.into_options(&config)).await?;
        }
        Some(Commands::Categories { file, run }) => {
            let path = file.unwrap_or_else(|| config.targets_path.clone());
            scrape::run_categories(&config, &path, &run.into_options(&config)).await?;
        }
        None => println!("no command given; run `listscout --help` for usage"),
    }

    Ok(())
}

impl RunArgs {
    fn into_options(self, config: &listscout_core::AppConfig) -> scrape::RunOptions {
        scrape::RunOptions {
            max_pages: self.max_pages.unwrap_or(config.max_pages),
            concurrent: self.concurrent,
            clean: self.clean,
            output: self.output,
            timeout: self.timeout_secs.map(std::time::Duration::from_secs),
        }
    }
}
