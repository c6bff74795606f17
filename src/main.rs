//! lnsync main entry point
//!
//! This is the command-line interface for the lnsync novel cache.

use anyhow::Context;
use clap::Parser;
use lnsync::config::{load_config_with_hash, Config};
use lnsync::model::{NovelCollectionModel, NovelContentModel, PageModel};
use lnsync::storage::{open_storage, SqliteStorage};
use lnsync::ContentRepository;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// lnsync: a local-first cache for wiki-hosted light novels
///
/// lnsync serves the novel listing, novel details, chapter bodies and images
/// from a local SQLite cache and syncs them from the wiki when they are
/// missing or stale.
#[derive(Parser, Debug)]
#[command(name = "lnsync")]
#[command(version = "1.0.0")]
#[command(about = "A local-first cache for wiki-hosted light novels", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Ignore the cache and fetch from the wiki
    #[arg(long)]
    force: bool,

    /// List novels (default action)
    #[arg(long, group = "action")]
    novels: bool,

    /// List watched novels from the cache
    #[arg(long, group = "action")]
    watched: bool,

    /// Show a novel's details
    #[arg(long, value_name = "PAGE", group = "action")]
    details: Option<String>,

    /// Show a page's content
    #[arg(long, value_name = "PAGE", group = "action")]
    content: Option<String>,

    /// Resolve an image by URL or file page
    #[arg(long, value_name = "KEY", group = "action")]
    image: Option<String>,

    /// Start watching a novel
    #[arg(long, value_name = "PAGE", group = "action")]
    watch: Option<String>,

    /// Stop watching a novel
    #[arg(long, value_name = "PAGE", group = "action")]
    unwatch: Option<String>,

    /// Show statistics from the database and exit
    #[arg(long, group = "action")]
    stats: bool,

    /// Validate config and show what would be used without touching the network
    #[arg(long, group = "action")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let storage = open_storage(Path::new(&config.cache.database_path))
        .with_context(|| format!("failed to open {}", config.cache.database_path))?;

    if cli.stats {
        return handle_stats(&config, &storage);
    }

    let repository = ContentRepository::from_config(&config, Arc::new(Mutex::new(storage)))
        .context("failed to set up the wiki client")?;

    if cli.watched {
        let novels = repository.get_watched_novels()?;
        print_pages(&novels);
    } else if let Some(page) = &cli.details {
        let novel = if cli.force {
            repository.refresh_novel_details(page).await
        } else {
            repository.get_novel_details(page).await
        }
        .with_context(|| format!("failed to get details of {}", page))?;
        print_details(&novel);
    } else if let Some(page) = &cli.content {
        let content = if cli.force {
            repository.refresh_novel_content(page).await
        } else {
            repository.get_novel_content(page).await
        }
        .with_context(|| format!("failed to get content of {}", page))?;
        print_content(&content);
    } else if let Some(key) = &cli.image {
        let image = repository
            .get_image(key)
            .await
            .with_context(|| format!("failed to resolve image {}", key))?;
        match &image.local_path {
            Some(path) => println!("{} -> {}", image.url, path.display()),
            None => println!("{} (not downloaded)", image.url),
        }
    } else if let Some(page) = &cli.watch {
        let page = repository.set_watched(page, true).await?;
        println!("Watching {}", page.title);
    } else if let Some(page) = &cli.unwatch {
        let page = repository.set_watched(page, false).await?;
        println!("No longer watching {}", page.title);
    } else {
        let novels = repository
            .get_novels(cli.force)
            .await
            .context("failed to get the novel listing")?;
        print_pages(&novels);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lnsync=info,warn"),
            1 => EnvFilter::new("lnsync=debug,info"),
            2 => EnvFilter::new("lnsync=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== lnsync Dry Run ===\n");

    println!("Source:");
    println!("  Base URL: {}", config.source.base_url);
    println!("  API: {}", config.source.api_path);
    println!("  Index: {}", config.source.index_path);
    println!("  Listing: {}", config.source.listing_path);
    println!("  Index page: {}", config.source.index_page);
    println!("  Timeout: {}s", config.source.timeout_secs);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.client_name);
    println!("  Version: {}", config.user_agent.client_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);

    println!("\nCache:");
    println!("  Database: {}", config.cache.database_path);
    println!("  Assets: {}", config.cache.asset_dir);
    println!("  Listing TTL: {}s", config.cache.ttl_secs);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config, storage: &SqliteStorage) -> anyhow::Result<()> {
    use lnsync::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.cache.database_path);

    let stats = load_statistics(storage)?;
    print_statistics(&stats);

    Ok(())
}

fn print_pages(pages: &[PageModel]) {
    for page in pages {
        let marker = if page.is_watched { "*" } else { " " };
        println!("{} {} ({})", marker, page.title, page.page);
    }
    println!("\n{} novels", pages.len());
}

fn print_details(novel: &NovelCollectionModel) {
    println!("=== {} ===\n", novel.page);
    if !novel.synopsis.is_empty() {
        println!("{}\n", novel.synopsis);
    }
    if let Some(cover) = &novel.cover_url {
        println!("Cover: {}\n", cover);
    }

    for book in &novel.books {
        println!("{}", book.title);
        for chapter in &book.chapters {
            println!("  - {} ({})", chapter.title, chapter.page);
        }
    }
}

fn print_content(content: &NovelContentModel) {
    println!("{}", content.content);

    let missing = content.missing_images().count();
    tracing::info!(
        "{}: {} images, {} not downloaded",
        content.key(),
        content.images.len(),
        missing
    );
}
