mod table;

use anyhow::Context;
use clap::Parser;
use ipotrack_api::SheetClient;
use ipotrack_cache::FeedCache;
use ipotrack_core::models::fields;
use ipotrack_core::providers::{FileSource, SheetSource};
use ipotrack_core::{
    Config, ExportFormat, Exporter, FeedOrigin, FeedService, FeedSource, SortDirection,
    StatusFilter,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ipotrack")]
#[command(version, about = "IPO dashboard from a published spreadsheet feed", long_about = None)]
struct Cli {
    /// CSV feed URL (overrides the config file)
    #[arg(long, global = true, env = "IPOTRACK_FEED_URL", conflicts_with = "file")]
    feed: Option<String>,

    /// Read the feed from a local CSV file instead
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// Don't fetch; use the last cached copy of the feed
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// List IPOs as a table
    List {
        /// all, open, upcoming, listed or allotted
        #[arg(long, default_value = "all")]
        status: StatusFilter,

        /// Case-insensitive text to look for
        #[arg(long)]
        search: Option<String>,

        /// Columns to search in, comma separated
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,

        /// Column to sort by
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Columns to print, comma separated
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
    },
    /// Show current, upcoming and listed sections
    Buckets {
        #[arg(long)]
        sort: Option<String>,

        #[arg(long)]
        desc: bool,

        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
    },
    /// Show every field of one IPO
    Show {
        /// IPO name (case-insensitive)
        name: String,
    },
    /// Write the feed to a file
    Export {
        path: PathBuf,

        /// json, csv or md; guessed from the extension when omitted
        #[arg(long)]
        format: Option<ExportFormat>,
    },
    /// Print the effective configuration
    Config {
        /// Write the default config file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ipotrack=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = Config::load().context("Failed to load config")?;
    if let Some(url) = &cli.feed {
        config.feed.url = url.clone();
    }
    if cli.offline {
        config.cache.offline_mode = true;
    }

    match cli.command {
        Some(Commands::Config { init }) => show_config(&config, init)?,
        Some(Commands::List {
            status,
            search,
            fields,
            sort,
            desc,
            columns,
        }) => {
            let service = load_feed(&cli.file, cli.offline, &config).await?;
            let mut records = service.snapshot().filter_status(status);

            if let Some(term) = search {
                records = if fields.is_empty() {
                    records.search_in(&term, &config.search.default_fields[..])
                } else {
                    records.search_in(&term, &fields[..])
                };
            }
            if let Some(key) = sort {
                records = records.sort_by(&key, direction(desc));
            }

            let picked = table::pick_columns(&records, &columns);
            print!("{}", table::render(&records, &picked));
            println!("\n{} IPO(s)", records.len());
        }
        Some(Commands::Show { name }) => {
            let service = load_feed(&cli.file, cli.offline, &config).await?;
            let snapshot = service.snapshot();
            let record = snapshot
                .find_by_name(&name)
                .with_context(|| format!("No IPO named '{}' in the feed", name))?;

            let details: Vec<(&str, &str)> = record
                .fields()
                .filter(|(key, value)| !value.trim().is_empty() && !is_link_column(key))
                .collect();
            let width = details.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
            for (key, value) in details {
                println!("{:<width$}  {}", key, value.trim(), width = width);
            }

            if let Some(url) = record.apply_url() {
                println!("\nApply: {}", url);
            }
            for (i, link) in record.allotment_links().iter().enumerate() {
                println!("Allotment check #{}: {}", i + 1, link);
            }
        }
        Some(Commands::Export { path, format }) => {
            let service = load_feed(&cli.file, cli.offline, &config).await?;
            let snapshot = service.snapshot();
            match format {
                Some(format) => Exporter::export_to_file_with_format(&snapshot, &path, format)?,
                None => Exporter::export_to_file(&snapshot, &path)?,
            }
            println!("Exported {} IPO(s) to {}", snapshot.len(), path.display());
        }
        Some(Commands::Buckets {
            sort,
            desc,
            columns,
        }) => {
            print_buckets(&cli.file, cli.offline, &config, sort, desc, &columns).await?;
        }
        None => {
            print_buckets(&cli.file, cli.offline, &config, None, false, &[]).await?;
        }
    }

    Ok(())
}

fn is_link_column(key: &str) -> bool {
    key == fields::APPLY_URL
        || key == fields::IMAGE_URL
        || key == fields::IMAGE
        || fields::ALLOTMENT_LINKS.contains(&key)
}

fn direction(desc: bool) -> SortDirection {
    if desc {
        SortDirection::Descending
    } else {
        SortDirection::Ascending
    }
}

async fn print_buckets(
    file: &Option<PathBuf>,
    offline: bool,
    config: &Config,
    sort: Option<String>,
    desc: bool,
    columns: &[String],
) -> anyhow::Result<()> {
    let service = load_feed(file, offline, config).await?;
    let buckets = service.snapshot().categorize_with(&config.buckets);

    for (bucket, section) in buckets.iter() {
        let section = match &sort {
            Some(key) => section.sort_by(key, direction(desc)),
            None => section.clone(),
        };

        println!("== {} ({}) ==", bucket.label(), section.len());
        if section.is_empty() {
            println!("(none)\n");
            continue;
        }
        let picked = table::pick_columns(&section, columns);
        println!("{}", table::render(&section, &picked));
    }

    Ok(())
}

/// Build the feed service from config and flags, then fill its store
async fn load_feed(
    file: &Option<PathBuf>,
    offline: bool,
    config: &Config,
) -> anyhow::Result<FeedService> {
    let source: Box<dyn FeedSource> = match file {
        Some(path) => Box::new(FileSource::new(path.clone())),
        None => {
            let client = SheetClient::with_timeout(config.feed.url.clone(), config.feed.timeout())?
                .with_retry_config(config.retry.to_retry_config());
            Box::new(SheetSource::new(client))
        }
    };

    let service = match open_cache(config) {
        Some(cache) => FeedService::with_cache(source, cache, config.cache.clone()),
        None => FeedService::new(source),
    };

    let origin = if offline {
        service.load_cached()?
    } else {
        service.refresh().await?
    };

    if let FeedOrigin::Cache { fetched_at } = origin {
        eprintln!(
            "Showing cached feed from {}",
            fetched_at.format("%Y-%m-%d %H:%M UTC")
        );
    }

    Ok(service)
}

fn open_cache(config: &Config) -> Option<FeedCache> {
    if !config.cache.enabled {
        return None;
    }

    let opened = Config::cache_db_path().map_err(anyhow::Error::from).and_then(|path| {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(FeedCache::new(&path)?)
    });

    match opened {
        Ok(cache) => Some(cache),
        Err(e) => {
            tracing::warn!("Feed cache unavailable, continuing without it: {}", e);
            None
        }
    }
}

fn show_config(config: &Config, init: bool) -> anyhow::Result<()> {
    if init {
        let path = Config::default().save()?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let path = Config::config_path()?;
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
