use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use photo_dedup::config::Settings;
use photo_dedup::dedup::{self, RunOptions};
use photo_dedup::history::{History, Selection};
use photo_dedup::logging;
use photo_dedup::report::Reporter;
use photo_dedup::store::{self, ListingStore, Query};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "photo-dedup",
    version,
    about = "Trash photo uploads that duplicate a higher-resolution copy"
)]
struct Cli {
    /// Config file (default: `<config dir>/photo-dedup/config.toml`)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` (overrides config; `RUST_LOG` overrides both)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find duplicate groups and report (or apply) what would be trashed
    Scan {
        /// Dump every record as JSON
        #[arg(short, long)]
        verbose: bool,
        /// Actually move duplicates to the trash
        #[arg(short, long)]
        delete: bool,
        /// Also match renamed uploads when nothing else was found
        #[arg(short, long)]
        fuzzy: bool,
        /// Extra clause appended to the listing query
        #[arg(short, long, value_name = "EXPR")]
        query: Option<String>,
        /// Exported listing JSON (overrides config)
        #[arg(long, value_name = "FILE")]
        listing: Option<PathBuf>,
        /// Skip the confirmation prompt in delete mode
        #[arg(short, long)]
        yes: bool,
    },

    /// Work with the history of trashed duplicates
    History {
        #[command(subcommand)]
        command: HistoryCmd,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryCmd {
    /// List all history records
    List,

    /// Take trashed files back out of the trash
    Restore {
        /// Restore a specific record index
        #[arg(long, conflicts_with = "all")]
        record: Option<usize>,
        /// Restore all records
        #[arg(long, conflicts_with = "record")]
        all: bool,
        /// Exported listing JSON (overrides config)
        #[arg(long, value_name = "FILE")]
        listing: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    logging::init_logger(cli.log_level.as_deref().unwrap_or(&settings.log_level));
    log::debug!("settings: {:?}", settings);

    match cli.command {
        Commands::Scan {
            verbose,
            delete,
            fuzzy,
            query,
            listing,
            yes,
        } => {
            if delete && !yes {
                let confirmed = Confirm::new()
                    .with_prompt("Move duplicate photos to the trash?")
                    .default(false)
                    .interact()
                    .context("Failed to read confirmation")?;
                if !confirmed {
                    println!("Aborted; nothing was trashed.");
                    return Ok(());
                }
            }

            let mut store = open_store(&settings, listing.as_deref())?;
            let query = Query {
                mime_type: settings.mime_type.clone(),
                ..Query::default()
            }
            .with_extra(query);

            println!("▶ Fetching metadata for: {}", query);
            let fetched = store::fetch_all(&store, &query).context("Failed to fetch listing")?;
            println!(
                "▶ Found files: {}, fetched {} page(s)",
                fetched.files.len(),
                fetched.pages
            );

            let mut reporter = Reporter::stdout(verbose);
            reporter.listing(&fetched.files)?;

            let history = History::new(&settings.state_dir);
            let options = RunOptions {
                apply: delete,
                fuzzy: fuzzy || settings.fuzzy,
            };
            let summary = dedup::run(
                &mut store,
                &fetched.files,
                options,
                Some(&history),
                &mut reporter,
            )?;
            if summary.trashed > 0 {
                println!("✅ Recorded history in {}", history.path().display());
            }
            println!("Done");
        }

        Commands::History { command } => {
            let history = History::new(&settings.state_dir);
            match command {
                HistoryCmd::List => {
                    let records = history.load().with_context(|| {
                        format!("Could not read history file {:?}", history.path())
                    })?;
                    if records.is_empty() {
                        println!("No history recorded.");
                        return Ok(());
                    }
                    println!("🗂️  Dedup History:");
                    for (i, rec) in records.iter().enumerate() {
                        let trashed: Vec<&str> =
                            rec.trashed.iter().map(|f| f.name.as_str()).collect();
                        println!(
                            "[{}] {} ({:?})\n     key: {}\n     kept: {}\n     trashed: {:?}\n",
                            i, rec.timestamp, rec.pass, rec.key, rec.retained.name, trashed
                        );
                    }
                }

                HistoryCmd::Restore {
                    record,
                    all,
                    listing,
                } => {
                    let selection = match (all, record) {
                        (true, _) => Selection::All,
                        (false, Some(index)) => Selection::Index(index),
                        (false, None) => Selection::Latest,
                    };
                    let mut store = open_store(&settings, listing.as_deref())?;
                    let restored = history.restore(&mut store, selection)?;
                    for file in &restored {
                        println!("🔄 Restored {} ({})", file.name, file.id);
                    }
                    println!("🧹 Restored {} file(s)", restored.len());
                }
            }
        }
    }

    Ok(())
}

fn open_store(settings: &Settings, listing: Option<&Path>) -> Result<ListingStore> {
    let path = listing
        .or(settings.listing.as_deref())
        .context("No listing given; pass --listing or set `listing` in the config file")?;
    let store = ListingStore::open(path, &settings.state_dir)
        .with_context(|| format!("Failed to open listing {:?}", path))?;
    Ok(store.with_page_size(settings.page_size))
}
