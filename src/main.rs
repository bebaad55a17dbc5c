//! Linkarbor main entry point
//!
//! This is the command-line interface for the linkarbor site-map tree
//! builder: it runs one links request against a target URL and prints the
//! response as JSON.

use clap::Parser;
use linkarbor::config::{load_config_with_hash, Config};
use linkarbor::links::{LinksOptions, Orchestrator};
use linkarbor::tree::LinksOrder;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Linkarbor: a site-map tree builder
///
/// Linkarbor scrapes a target URL together with its ancestors, root, and
/// descendants, classifies every outgoing link, and assembles a
/// hierarchical links tree. Results are cached and reused on repeat
/// requests.
#[derive(Parser, Debug)]
#[command(name = "linkarbor")]
#[command(version)]
#[command(about = "A site-map tree builder", long_about = None)]
struct Cli {
    /// Target URL to build the links tree for
    #[arg(value_name = "URL")]
    url: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Return flat data for the target instead of a tree
    #[arg(long)]
    no_tree: bool,

    /// Attach extracted links to each node
    #[arg(long)]
    extracted_links: bool,

    /// Attach metadata to each node
    #[arg(long)]
    metadata: bool,

    /// Attach cleaned HTML to each node
    #[arg(long)]
    cleaned_html: bool,

    /// Capture robots.txt for the root
    #[arg(long)]
    robots: bool,

    /// Capture sitemap.xml for the root
    #[arg(long)]
    sitemap: bool,

    /// Treat the subdomain host as the crawl root
    #[arg(long)]
    subdomain_root: bool,

    /// Force platform-mode classification
    #[arg(long)]
    platform: bool,

    /// Order folders before leaves
    #[arg(long)]
    folder_first: bool,

    /// Sort siblings alphabetically instead of in discovery order
    #[arg(long)]
    alphabetical: bool,

    /// Include external links in extraction output
    #[arg(long)]
    include_external: bool,

    /// Include media links in extraction output
    #[arg(long)]
    include_media: bool,

    /// Disable cache reads and writes
    #[arg(long)]
    no_cache: bool,

    /// Attach timing metrics to the response
    #[arg(long)]
    metrics: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load configuration, or fall back to defaults
    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    let options = build_options(&cli);

    let orchestrator = Orchestrator::new(config)?;
    let cancel = CancellationToken::new();

    let response = orchestrator.process_links_request(&options, cancel).await;

    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

/// Maps CLI flags onto request options
fn build_options(cli: &Cli) -> LinksOptions {
    let mut options = LinksOptions::new(&cli.url);

    options.tree = !cli.no_tree;
    options.extracted_links = cli.extracted_links;
    options.metadata = cli.metadata;
    options.cleaned_html = cli.cleaned_html;
    options.robots = cli.robots;
    options.sitemap_xml = cli.sitemap;
    options.subdomain_as_root_url = cli.subdomain_root;
    options.is_platform_url = cli.platform;
    options.folder_first = cli.folder_first;
    options.metrics_options.enable = cli.metrics;
    options.link_extraction_options.include_external = cli.include_external;
    options.link_extraction_options.include_media = cli.include_media;

    if cli.alphabetical {
        options.links_order = LinksOrder::Alphabetical;
    }
    if cli.no_cache {
        options.cache_options.enabled = false;
    }

    options
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("linkarbor=info,warn"),
            1 => EnvFilter::new("linkarbor=debug,info"),
            2 => EnvFilter::new("linkarbor=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
