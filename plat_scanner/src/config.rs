//! Runtime configuration, built from CLI arguments in `main`

use crate::detector::DetectorConfig;
use crate::market::{MarketConfig, DEFAULT_MIN_INTERVAL};
use crate::pricing::DEFAULT_LOOKUP_RETRIES;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything needed to assemble a [`Scanner`](crate::Scanner)
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// SQLite file for the inventory; `None` keeps it in memory
    pub database: Option<PathBuf>,
    pub detector: DetectorConfig,
    pub market: MarketConfig,
    /// Minimum spacing between market requests
    pub rate_limit: Duration,
    pub lookup_retries: u32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            database: Some(default_db_path()),
            detector: DetectorConfig::default(),
            market: MarketConfig::default(),
            rate_limit: DEFAULT_MIN_INTERVAL,
            lookup_retries: DEFAULT_LOOKUP_RETRIES,
        }
    }
}

impl ScannerConfig {
    /// Apply one timeout to both HTTP clients
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.detector.timeout = timeout;
        self.market.timeout = timeout;
        self
    }
}

/// Returns the default database path: ~/.local/share/plat_scanner/inventory.db
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("plat_scanner")
        .join("inventory.db")
}
