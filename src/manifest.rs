//! Listing manifest loading.
//!
//! The auction search client writes the candidate listings as JSON, either
//! a bare array or an object with an `items` array.

use crate::models::ListingItem;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum Manifest {
    List(Vec<ListingItem>),
    Wrapped { items: Vec<ListingItem> },
}

/// Parse a manifest from JSON text.
pub fn parse_items(content: &str) -> Result<Vec<ListingItem>> {
    let manifest: Manifest =
        serde_json::from_str(content).context("Manifest is not a list of listings")?;

    Ok(match manifest {
        Manifest::List(items) => items,
        Manifest::Wrapped { items } => items,
    })
}

/// Load a manifest file.
pub fn load_items(path: &Path) -> Result<Vec<ListingItem>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;

    parse_items(&content).with_context(|| format!("Failed to parse manifest: {}", path.display()))
}
