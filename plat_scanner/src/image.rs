//! Uploaded screenshots and their duplicate fingerprint

use crate::error::{Result, ScannerError};
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Accepted screenshot extensions and their MIME types
const SUPPORTED_TYPES: [(&str, &str); 4] = [
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("webp", "image/webp"),
];

/// Identity of an uploaded file for duplicate detection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentFingerprint {
    pub name: String,
    pub size: u64,
    /// Last-modified time in milliseconds since the Unix epoch
    pub modified_ms: i64,
}

/// One screenshot ready for analysis
#[derive(Debug, Clone)]
pub struct ImageSource {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub modified_ms: i64,
    /// Where the image came from, shown in place of a thumbnail
    pub preview: String,
}

impl ImageSource {
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
        modified_ms: i64,
    ) -> Self {
        let name = name.into();
        Self {
            preview: name.clone(),
            name,
            mime_type: mime_type.into(),
            bytes,
            modified_ms,
        }
    }

    /// Read a screenshot from disk. Only png, jpg/jpeg and webp are accepted.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mime_type =
            mime_type_for(path).ok_or_else(|| ScannerError::UnsupportedImage(path.to_path_buf()))?;

        let metadata = std::fs::metadata(path)?;
        let modified_ms = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        let bytes = std::fs::read(path)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        log::debug!("Read {} ({} bytes, {})", name, bytes.len(), mime_type);

        Ok(Self {
            name,
            mime_type: mime_type.to_string(),
            bytes,
            modified_ms,
            preview: path.display().to_string(),
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn fingerprint(&self) -> ContentFingerprint {
        ContentFingerprint {
            name: self.name.clone(),
            size: self.size(),
            modified_ms: self.modified_ms,
        }
    }
}

/// MIME type for a supported screenshot path
pub fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    SUPPORTED_TYPES
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, mime)| *mime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn mime_types_by_extension() {
        assert_eq!(mime_type_for(Path::new("a.PNG")), Some("image/png"));
        assert_eq!(mime_type_for(Path::new("a.jpeg")), Some("image/jpeg"));
        assert_eq!(mime_type_for(Path::new("a.webp")), Some("image/webp"));
        assert_eq!(mime_type_for(Path::new("a.gif")), None);
        assert_eq!(mime_type_for(Path::new("noext")), None);
    }

    #[test]
    fn from_path_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inventory_1.png");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&[0x89, b'P', b'N', b'G']).unwrap();
        drop(file);

        let image = ImageSource::from_path(&path).unwrap();
        assert_eq!(image.name, "inventory_1.png");
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.size(), 4);
        assert!(image.modified_ms > 0);
        assert_eq!(image.preview, path.display().to_string());
    }

    #[test]
    fn from_path_rejects_other_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        match ImageSource::from_path(&path) {
            Err(ScannerError::UnsupportedImage(p)) => assert_eq!(p, path),
            other => panic!("Expected UnsupportedImage, got: {other:?}"),
        }
    }

    #[test]
    fn fingerprint_uses_name_size_and_mtime() {
        let a = ImageSource::from_bytes("shot.png", "image/png", vec![1, 2, 3], 1000);
        let b = ImageSource::from_bytes("shot.png", "image/png", vec![9, 9, 9], 1000);
        let c = ImageSource::from_bytes("shot.png", "image/png", vec![1, 2, 3], 2000);

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
