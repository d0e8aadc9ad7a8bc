mod review;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use retain_core::{
    Catalog, ContentCatalog, MS_PER_DAY, SchedulerParams, Weights, format_interval,
    now_unix_millis, unix_millis_to_iso8601,
};
use retain_store::{ConfigStore, Library, SessionManager, resolve_data_dir, sync_cards};

#[derive(Parser)]
#[command(name = "retain", about = "Spaced-repetition scheduler for vocabulary decks")]
struct Cli {
    /// Data directory (default: $RETAIN_DATA_DIR or ~/.retain)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create scheduling records for new catalog items
    Sync {
        /// Catalog JSON file (overrides `catalog` in config.toml)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Review due cards interactively
    Review {
        /// Only review this deck
        #[arg(long)]
        deck: Option<String>,

        /// Catalog JSON file used to show card text
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Show how many cards are due
    Due {
        #[arg(long)]
        deck: Option<String>,
    },

    /// Show per-deck statistics
    Stats,

    /// Show the review log for a card
    History {
        /// Card id
        card: String,
    },

    /// Show or change scheduler parameters
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Export cards, reviews and settings to a JSON file
    Export {
        /// Output file path
        path: PathBuf,
    },

    /// Import a JSON snapshot (all or nothing)
    Import {
        /// Input file path
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current parameters as JSON
    Show,

    /// Update parameters; unspecified ones keep their value
    Set {
        /// Target recall probability at the due date, in (0, 1)
        #[arg(long)]
        retention: Option<f64>,

        /// Longest interval in days
        #[arg(long)]
        max_interval: Option<u32>,

        /// All 19 weights, comma separated
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        weights: Option<Vec<f64>>,

        /// Restore every parameter to its default first
        #[arg(long)]
        reset: bool,
    },
}

fn open_library(cli: &Cli) -> Result<Library> {
    let dir = resolve_data_dir(cli.data_dir.as_deref());
    Library::open(&dir).with_context(|| format!("failed to open data directory {}", dir.display()))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Sync { catalog } => cmd_sync(&cli, catalog.as_deref()),
        Commands::Review { deck, catalog } => cmd_review(&cli, deck.clone(), catalog.as_deref()),
        Commands::Due { deck } => cmd_due(&cli, deck.as_deref()),
        Commands::Stats => cmd_stats(&cli),
        Commands::History { card } => cmd_history(&cli, card),
        Commands::Config { action } => cmd_config(&cli, action),
        Commands::Export { path } => cmd_export(&cli, path),
        Commands::Import { path } => cmd_import(&cli, path),
    }
}

fn cmd_sync(cli: &Cli, catalog: Option<&Path>) -> Result<()> {
    let lib = open_library(cli)?;
    let catalog = lib.load_catalog(catalog).context("failed to load catalog")?;
    let report = sync_cards(lib.store(), &catalog).context("sync failed")?;
    println!(
        "synced {} items: {} created, {} existing",
        report.total, report.created, report.existing
    );
    Ok(())
}

fn cmd_review(cli: &Cli, deck: Option<String>, catalog: Option<&Path>) -> Result<()> {
    let lib = open_library(cli)?;
    let scheduler = ConfigStore::new(lib.store())
        .scheduler()
        .context("failed to load scheduler parameters")?;
    // Card text is optional; without a catalog the loop shows ids.
    let catalog = match lib.catalog_path(catalog) {
        Some(_) => Some(lib.load_catalog(catalog).context("failed to load catalog")?),
        None => None,
    };
    let deck = deck.or_else(|| lib.config().default_deck.clone());

    let mut session = SessionManager::new(lib.store(), scheduler);
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    review::run(
        &mut session,
        deck,
        catalog.as_ref(),
        stdin.lock(),
        stdout.lock(),
    )
}

fn cmd_due(cli: &Cli, deck: Option<&str>) -> Result<()> {
    let lib = open_library(cli)?;
    let deck = deck.or(lib.config().default_deck.as_deref());
    let now = now_unix_millis();
    let due = lib.store().count_due(deck, now).context("failed to count due cards")?;
    let new = lib.store().count_new(deck).context("failed to count new cards")?;

    println!("deck: {}", deck.unwrap_or("all"));
    println!("due:  {due}");
    println!("new:  {new}");
    Ok(())
}

fn cmd_stats(cli: &Cli) -> Result<()> {
    let lib = open_library(cli)?;
    let now = now_unix_millis();
    let stats = lib
        .store()
        .deck_stats(now)
        .context("failed to read deck stats")?;
    // Display names only; a broken catalog should not hide the numbers.
    let catalog: Option<Catalog> = lib.load_catalog(None).ok();

    if stats.is_empty() {
        println!("(no cards; run `retain sync` first)");
        return Ok(());
    }

    println!("{:<20} {:>6} {:>6} {:>6}", "deck", "total", "new", "due");
    for deck in &stats {
        let name = catalog
            .as_ref()
            .map(|c| c.deck_name(&deck.deck))
            .unwrap_or_else(|| deck.deck.clone());
        println!(
            "{:<20} {:>6} {:>6} {:>6}",
            name, deck.total, deck.new, deck.due
        );
    }
    let total: u64 = stats.iter().map(|d| d.total).sum();
    let due: u64 = stats.iter().map(|d| d.due).sum();
    println!("total: {total}, due now: {due}");

    // UTC day boundaries.
    let day_start = now - now.rem_euclid(MS_PER_DAY);
    let today = lib
        .store()
        .get_reviews_between(day_start, now + 1)
        .context("failed to read review log")?;
    println!("reviewed today: {}", today.len());
    Ok(())
}

fn cmd_history(cli: &Cli, card: &str) -> Result<()> {
    let lib = open_library(cli)?;
    let record = lib
        .store()
        .get(card)
        .context("failed to read card")?
        .with_context(|| format!("no card with id {card}"))?;
    let events = lib
        .store()
        .get_review_history(card)
        .context("failed to read review history")?;

    println!(
        "{} [{}] state={} reps={} lapses={} due={}",
        record.id,
        record.deck,
        record.state,
        record.reps,
        record.lapses,
        unix_millis_to_iso8601(record.due)
    );
    if events.is_empty() {
        println!("(no reviews)");
    }
    for event in &events {
        println!(
            "{}  {:<5}  elapsed={:.1}d  S={:.2}  D={:.2}  next={}",
            unix_millis_to_iso8601(event.timestamp),
            event.rating.as_str(),
            event.elapsed_days,
            event.stability,
            event.difficulty,
            format_interval(event.interval)
        );
    }
    Ok(())
}

fn cmd_config(cli: &Cli, action: &ConfigAction) -> Result<()> {
    let lib = open_library(cli)?;
    let config = ConfigStore::new(lib.store());

    match action {
        ConfigAction::Show => {
            let params = config.load_params().context("failed to load parameters")?;
            println!("{}", serde_json::to_string_pretty(&params)?);
        }
        ConfigAction::Set {
            retention,
            max_interval,
            weights,
            reset,
        } => {
            if retention.is_none() && max_interval.is_none() && weights.is_none() && !reset {
                bail!("nothing to set (use --retention, --max-interval, --weights or --reset)");
            }
            let mut params = if *reset {
                SchedulerParams::default()
            } else {
                config.load_params().context("failed to load parameters")?
            };
            if let Some(r) = retention {
                params.request_retention = *r;
            }
            if let Some(m) = max_interval {
                params.max_interval_days = *m;
            }
            if let Some(w) = weights {
                params.weights = Weights::try_from(w.clone()).context("invalid --weights")?;
            }
            let scheduler = config.save(params).context("failed to save parameters")?;
            println!(
                "saved: retention={} max_interval={}d",
                scheduler.params().request_retention,
                scheduler.params().max_interval_days
            );
        }
    }
    Ok(())
}

fn cmd_export(cli: &Cli, path: &Path) -> Result<()> {
    let lib = open_library(cli)?;
    let snapshot = lib.store().export_all().context("failed to read store")?;
    let json = serde_json::to_string_pretty(&snapshot).context("failed to serialize snapshot")?;
    std::fs::write(path, &json).with_context(|| format!("failed to write {}", path.display()))?;

    println!(
        "exported {} cards, {} reviews to {}",
        snapshot.cards.len(),
        snapshot.reviews.len(),
        path.display()
    );
    Ok(())
}

fn cmd_import(cli: &Cli, path: &Path) -> Result<()> {
    let lib = open_library(cli)?;
    let report = lib
        .store()
        .import_json_file(path)
        .with_context(|| format!("failed to import {}", path.display()))?;

    println!(
        "imported {} cards, {} reviews, {} settings from {}",
        report.cards,
        report.reviews,
        report.meta,
        path.display()
    );
    Ok(())
}
