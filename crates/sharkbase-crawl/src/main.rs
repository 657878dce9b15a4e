//! sharkbase-crawl - rebuild the family/genus/species classification from WoRMS

use anyhow::{bail, Context, Result};
use clap::Parser;
use sharkbase_common::logging::{init_logging, LogConfig, LogLevel};
use sharkbase_crawl::{config::CrawlConfig, crawl::Crawler, output, source::WormsClient};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "sharkbase-crawl")]
#[command(author, version, about = "Rebuild a family → genus → species tree from WoRMS")]
struct Cli {
    /// AphiaID of the taxon to start from
    #[arg(short, long)]
    root: Option<u64>,

    /// Output JSON file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// WoRMS REST base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Deepest level to expand
    #[arg(long)]
    max_depth: Option<usize>,

    /// Minimum spacing between registry requests (0 disables pacing)
    #[arg(long)]
    request_interval_ms: Option<u64>,

    /// Only request the first page of each child listing
    #[arg(long)]
    no_paginate: bool,

    /// Include non-marine taxa
    #[arg(long)]
    include_non_marine: bool,

    /// Write whatever was collected if the crawl is interrupted
    #[arg(long)]
    write_partial: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Command-line flags take precedence over `SHARKBASE_*` variables
    fn apply(&self, mut config: CrawlConfig) -> CrawlConfig {
        if let Some(root) = self.root {
            config = config.with_root_id(root);
        }
        if let Some(ref path) = self.output {
            config = config.with_output_path(path.clone());
        }
        if let Some(ref url) = self.base_url {
            config = config.with_base_url(url.clone());
        }
        if let Some(depth) = self.max_depth {
            config = config.with_max_depth(depth);
        }
        if let Some(ms) = self.request_interval_ms {
            config = config.with_request_interval_ms(ms);
        }
        if self.no_paginate {
            config = config.with_paginate(false);
        }
        if self.include_non_marine {
            config = config.with_marine_only(false);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("sharkbase-crawl")
        .filter_directives("hyper=warn,reqwest=warn")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    let config = cli.apply(CrawlConfig::from_env()?);
    config.validate()?;

    let source = WormsClient::new(&config).context("Failed to create WoRMS client")?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping crawl");
                cancel.cancel();
            }
        }
    });

    info!(
        root = %config.root_id,
        base_url = %config.base_url(),
        output = %config.output_path.display(),
        "Exploring registry; large groups take several minutes"
    );

    let report = Crawler::new(source, &config)
        .with_cancellation(cancel)
        .crawl()
        .await;

    if !report.completed && !cli.write_partial {
        bail!(
            "Crawl interrupted after {} taxa; nothing written (pass --write-partial to keep the partial tree)",
            report.stats.expanded
        );
    }

    output::write_tree(&report.tree, &config.output_path).with_context(|| {
        format!("Failed to write classification to {}", config.output_path.display())
    })?;

    info!(
        species = report.tree.species_count(),
        stats = %serde_json::to_string(&report.stats)?,
        path = %config.output_path.display(),
        "Done"
    );
    Ok(())
}
