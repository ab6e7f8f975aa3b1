//! Transfer manifest types
//!
//! A manifest lists the logical files contained in an artifact. It is stored on
//! the transfer record as JSON and is used for notification content and audit.

use serde::{Deserialize, Serialize};

/// One logical file inside an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Sanitized relative path as stored in the artifact
    pub path: String,
    /// Uncompressed size in bytes
    pub size: u64,
}

impl ManifestEntry {
    pub fn new(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }
}

/// Ordered list of manifest entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(Vec<ManifestEntry>);

impl Manifest {
    #[must_use]
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self(entries)
    }

    /// Sum of all entry sizes
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.0.iter().map(|e| e.size).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ManifestEntry> {
        self.0.iter()
    }

    /// Serialize to the JSON column representation
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse the JSON column representation
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a ManifestEntry;
    type IntoIter = std::slice::Iter<'a, ManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Format a byte count for humans (`0 B`, `1.50 KB`, `12.00 MB`)
///
/// Uses binary (1024) units, matching what file managers show.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{value:.2} {}", UNITS[unit])
}
