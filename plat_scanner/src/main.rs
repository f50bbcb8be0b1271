//! PlatScanner - Warframe inventory screenshot scanner
//!
//! Finds prime parts and relics in screenshots, prices them on
//! warframe.market and keeps a local inventory.

use clap::{Parser, Subcommand, ValueEnum};
use plat_common::{sort_items, ItemCategory, SortDirection, SortField};
use plat_scanner::detector::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
use plat_scanner::market::DEFAULT_MARKET_URL;
use plat_scanner::pricing::DEFAULT_LOOKUP_RETRIES;
use plat_scanner::{default_db_path, report, web, Result, Scanner, ScannerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Scan Warframe inventory screenshots and price what you own
#[derive(Parser, Debug)]
#[command(name = "plat_scanner")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, default_value_os_t = default_db_path())]
    database: PathBuf,

    /// Gemini API key used for screenshot analysis
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// Gemini model name
    #[arg(long, default_value = DEFAULT_GEMINI_MODEL)]
    model: String,

    /// Gemini API base URL
    #[arg(long, default_value = DEFAULT_GEMINI_BASE_URL)]
    gemini_url: String,

    /// warframe.market API base URL
    #[arg(long, default_value = DEFAULT_MARKET_URL)]
    market_url: String,

    /// Minimum delay between market requests in milliseconds
    #[arg(long, default_value_t = 334)]
    rate_limit_ms: u64,

    /// Retries for a market lookup that fails transiently
    #[arg(long, default_value_t = DEFAULT_LOOKUP_RETRIES)]
    lookup_retries: u32,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan screenshots and add new items to the inventory
    Scan {
        /// Screenshot files (png, jpg, jpeg, webp)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show the inventory
    Inventory {
        /// Only this category (prime_parts or relics)
        #[arg(long)]
        category: Option<ItemCategory>,

        #[arg(long, value_enum, default_value_t = SortArg::Price)]
        sort: SortArg,

        /// Sort ascending instead of descending
        #[arg(long)]
        asc: bool,
    },
    /// Remove one item from the inventory
    Remove { name: String },
    /// Fetch fresh prices for one item or a whole category
    Refresh {
        #[arg(required_unless_present = "category", conflicts_with = "category")]
        name: Option<String>,

        #[arg(long)]
        category: Option<ItemCategory>,
    },
    /// Delete the inventory, or one category of it
    Clear {
        #[arg(long)]
        category: Option<ItemCategory>,
    },
    /// Serve the JSON API
    Serve {
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SortArg {
    Price,
    Name,
    Ducats,
}

impl From<SortArg> for SortField {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Price => SortField::Price,
            SortArg::Name => SortField::Name,
            SortArg::Ducats => SortField::Ducats,
        }
    }
}

impl Args {
    fn scanner_config(&self) -> ScannerConfig {
        let mut config = ScannerConfig::default()
            .with_request_timeout(Duration::from_secs(self.timeout_secs));
        config.database = Some(self.database.clone());
        config.detector.api_key = self.gemini_api_key.clone();
        config.detector.model = self.model.clone();
        config.detector.base_url = self.gemini_url.clone();
        config.market.base_url = self.market_url.clone();
        config.rate_limit = Duration::from_millis(self.rate_limit_ms);
        config.lookup_retries = self.lookup_retries;
        config
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.scanner_config();

    let scanner = match Scanner::from_config(&config) {
        Ok(scanner) => Arc::new(scanner),
        Err(e) => {
            log::error!("Failed to start: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(args.command, scanner).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command, scanner: Arc<Scanner>) -> Result<()> {
    match command {
        Command::Scan { files } => {
            let outcome = scanner.upload_paths(&files)?;
            for name in &outcome.duplicates {
                log::warn!("Skipped duplicate screenshot {}", name);
            }
            log::info!("Queued {} screenshot(s)", outcome.accepted.len());

            scanner.wait_idle().await;

            let snapshot = scanner.snapshot();
            print!("{}", report::format_jobs(&snapshot));
            println!();

            let mut results = snapshot.combined;
            sort_items(&mut results, SortField::Price, SortDirection::Descending);
            print!("{}", report::format_results(&results));
        }
        Command::Inventory {
            category,
            sort,
            asc,
        } => {
            let direction = if asc {
                SortDirection::Ascending
            } else {
                SortDirection::Descending
            };
            let entries = scanner.inventory_view(category, sort.into(), direction);
            print!("{}", report::format_inventory(&entries, &scanner.stats()));
            if let Some(error) = scanner.persistence_error() {
                log::warn!("Inventory is not being saved: {}", error);
            }
        }
        Command::Remove { name } => {
            scanner.remove_inventory_item(&name)?;
            println!("Removed {name}");
        }
        Command::Refresh { name, category } => match (name, category) {
            (_, Some(category)) => {
                let summary = scanner.refresh_category(category).await?;
                println!(
                    "Refreshed {} {} ({} failed)",
                    summary.updated,
                    category.display_name(),
                    summary.failed.len()
                );
                for name in summary.failed {
                    println!("  failed: {name}");
                }
            }
            (Some(name), None) => {
                let entry = scanner.refresh_item(&name).await?;
                print!("{}", report::format_results(&[entry.item]));
            }
            (None, None) => unreachable!("clap requires a name or a category"),
        },
        Command::Clear { category } => {
            let removed = scanner.clear_category(category);
            match category {
                Some(category) => println!("Removed {} {}", removed, category.display_name()),
                None => println!("Removed {removed} item(s)"),
            }
        }
        Command::Serve { port } => {
            web::serve(scanner, port).await?;
        }
    }

    Ok(())
}
