//! Image sources for listing appraisal.
//!
//! Images are expected to be downloaded and resized already. The directory
//! source reads them from `<root>/<item_id>/`, sorted by file name, pausing
//! between reads to keep disk or network mounts from being hammered.

use crate::models::{ImageHandle, ListingItem};
use anyhow::Result;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Supplies the images for one listing. May return none.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn images_for(&self, item: &ListingItem) -> Result<Vec<ImageHandle>>;
}

/// Configuration for the directory image source.
#[derive(Debug, Clone)]
pub struct ImageScanConfig {
    /// Image file extensions to include (lowercase, no dot).
    pub extensions: Vec<String>,
    /// Files larger than this are skipped.
    pub max_file_size: u64,
    /// Pause between individual image reads.
    pub fetch_delay: Duration,
}

impl Default for ImageScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["jpg", "jpeg", "png", "webp"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_file_size: 20 * 1024 * 1024,
            fetch_delay: Duration::from_millis(100),
        }
    }
}

impl From<&crate::config::ImagesConfig> for ImageScanConfig {
    fn from(config: &crate::config::ImagesConfig) -> Self {
        Self {
            extensions: config
                .extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
            max_file_size: config.max_file_size,
            fetch_delay: Duration::from_millis(config.fetch_delay_ms),
        }
    }
}

/// Reads per-item image folders below a root directory.
pub struct DirectoryImageSource {
    root: PathBuf,
    config: ImageScanConfig,
}

impl DirectoryImageSource {
    pub fn new(root: PathBuf, config: ImageScanConfig) -> Self {
        Self { root, config }
    }

    /// Folder holding an item's images.
    pub fn item_dir(&self, item: &ListingItem) -> Result<PathBuf> {
        if !is_plain_name(&item.item_id) {
            return Err(anyhow::anyhow!(
                "Item id is not a plain folder name: {:?}",
                item.item_id
            ));
        }
        Ok(self.root.join(&item.item_id))
    }

    /// Matching image files for an item, sorted by file name.
    pub fn scan(&self, item: &ListingItem) -> Result<Vec<PathBuf>> {
        let dir = self.item_dir(item)?;
        if !dir.is_dir() {
            debug!("No image folder for item {}", item.item_id);
            return Ok(vec![]);
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Cannot read entry in {}: {}", dir.display(), e);
                    continue;
                }
            };

            if entry.file_type().is_file() && self.matches(entry.path()) {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }

    /// Check if a file is an image we should submit.
    pub fn matches(&self, path: &Path) -> bool {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.starts_with('.') {
            return false;
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if !self.config.extensions.contains(&ext) {
            return false;
        }

        match std::fs::metadata(path) {
            Ok(metadata) => metadata.len() <= self.config.max_file_size,
            Err(_) => false,
        }
    }
}

#[async_trait]
impl ImageSource for DirectoryImageSource {
    async fn images_for(&self, item: &ListingItem) -> Result<Vec<ImageHandle>> {
        let paths = self.scan(item)?;
        let mut images = Vec::with_capacity(paths.len());

        for (i, path) in paths.iter().enumerate() {
            if i > 0 && !self.config.fetch_delay.is_zero() {
                tokio::time::sleep(self.config.fetch_delay).await;
            }

            match tokio::fs::read(path).await {
                Ok(data) => images.push(ImageHandle {
                    name: path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default(),
                    mime_type: mime_type_for(path).to_string(),
                    data,
                }),
                Err(e) => warn!("Failed to read {}: {}", path.display(), e),
            }
        }

        debug!("Loaded {} images for item {}", images.len(), item.item_id);
        Ok(images)
    }
}

/// MIME type from a file extension.
pub fn mime_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

/// A single normal path component: no separators, no `..`.
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
