use std::path::Path;

use crate::{
    content::ContentEntry,
    error::{Error, Result},
};

/// Parse a JSON array of catalog entries.
///
/// Entries with a blank id are dropped with a warning.
pub fn parse_catalog(json: &str) -> Result<Vec<ContentEntry>> {
    let entries: Vec<ContentEntry> = serde_json::from_str(json)?;
    let total = entries.len();
    let entries: Vec<ContentEntry> = entries
        .into_iter()
        .filter(|e| !e.id.trim().is_empty())
        .collect();
    if entries.len() < total {
        tracing::warn!(
            skipped = total - entries.len(),
            "catalog entries without an id were skipped"
        );
    }
    Ok(entries)
}

/// Read and parse the catalog file at `path`.
pub fn load_catalog(path: &Path) -> Result<Vec<ContentEntry>> {
    if !path.exists() {
        return Err(Error::NotFound {
            kind: "catalog",
            name: path.display().to_string(),
        });
    }
    let json = std::fs::read_to_string(path)?;
    let entries = parse_catalog(&json)?;
    tracing::debug!(
        path = %path.display(),
        entries = entries.len(),
        "loaded catalog"
    );
    Ok(entries)
}
