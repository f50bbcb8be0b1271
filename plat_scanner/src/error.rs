//! Error types for plat_scanner

use plat_common::{DetectionError, LookupError, ParseCategoryError};
use std::fmt;
use std::path::PathBuf;

/// Unified error type for plat_scanner operations
#[derive(Debug)]
pub enum ScannerError {
    /// HTTP request failed (network error, timeout, etc.)
    Network(reqwest::Error),
    /// Failed to parse JSON
    Parse(serde_json::Error),
    /// Storage backend operation failed
    Database(rusqlite::Error),
    /// File I/O failed
    Io(std::io::Error),
    /// Required configuration is missing (e.g. the Gemini API key)
    Configuration(String),
    /// Image could not be analyzed
    Detection(DetectionError),
    /// Price lookup failed
    Lookup(LookupError),
    /// File is not a supported screenshot format
    UnsupportedImage(PathBuf),
    /// No inventory entry with this name
    UnknownItem(String),
    /// Category name not recognised
    UnknownCategory(String),
    /// No image job with this id
    UnknownJob(String),
}

/// Short alias used across the crate
pub type Error = ScannerError;

impl fmt::Display for ScannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScannerError::Network(e) => write!(f, "Network error: {}", e),
            ScannerError::Parse(e) => write!(f, "Parse error: {}", e),
            ScannerError::Database(e) => write!(f, "Database error: {}", e),
            ScannerError::Io(e) => write!(f, "I/O error: {}", e),
            ScannerError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ScannerError::Detection(e) => write!(f, "Detection error: {}", e),
            ScannerError::Lookup(e) => write!(f, "Lookup error: {}", e),
            ScannerError::UnsupportedImage(path) => {
                write!(f, "Unsupported image file: {}", path.display())
            }
            ScannerError::UnknownItem(name) => write!(f, "Item not in inventory: {}", name),
            ScannerError::UnknownCategory(name) => write!(f, "Unknown category: {}", name),
            ScannerError::UnknownJob(id) => write!(f, "No image job with id: {}", id),
        }
    }
}

impl std::error::Error for ScannerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScannerError::Network(e) => Some(e),
            ScannerError::Parse(e) => Some(e),
            ScannerError::Database(e) => Some(e),
            ScannerError::Io(e) => Some(e),
            ScannerError::Detection(e) => Some(e),
            ScannerError::Lookup(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ScannerError {
    fn from(err: reqwest::Error) -> Self {
        ScannerError::Network(err)
    }
}

impl From<serde_json::Error> for ScannerError {
    fn from(err: serde_json::Error) -> Self {
        ScannerError::Parse(err)
    }
}

impl From<rusqlite::Error> for ScannerError {
    fn from(err: rusqlite::Error) -> Self {
        ScannerError::Database(err)
    }
}

impl From<std::io::Error> for ScannerError {
    fn from(err: std::io::Error) -> Self {
        ScannerError::Io(err)
    }
}

impl From<DetectionError> for ScannerError {
    fn from(err: DetectionError) -> Self {
        match err {
            DetectionError::NotConfigured(msg) => ScannerError::Configuration(msg),
            other => ScannerError::Detection(other),
        }
    }
}

impl From<LookupError> for ScannerError {
    fn from(err: LookupError) -> Self {
        ScannerError::Lookup(err)
    }
}

impl From<ParseCategoryError> for ScannerError {
    fn from(err: ParseCategoryError) -> Self {
        ScannerError::UnknownCategory(err.0)
    }
}

/// Result alias for plat_scanner operations
pub type Result<T> = std::result::Result<T, ScannerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn missing_detector_key_maps_to_configuration_error() {
        let err: ScannerError = DetectionError::NotConfigured("no API key".into()).into();
        assert!(matches!(err, ScannerError::Configuration(_)));
        assert_eq!(err.to_string(), "Configuration error: no API key");
    }

    #[test]
    fn lookup_error_keeps_source() {
        let err: ScannerError = LookupError::Transient("timeout".into()).into();
        assert!(err.source().is_some());
    }

    #[test]
    fn category_parse_error_converts() {
        let err: ScannerError = ParseCategoryError("mods".into()).into();
        assert_eq!(err.to_string(), "Unknown category: mods");
    }
}
