//! Reference bitmaps for correlation matching

use image::GrayImage;
use std::path::{Path, PathBuf};

/// Default similarity threshold for template matching (0.0 to 1.0).
pub const DEFAULT_THRESHOLD: f32 = 0.9;

/// A named reference bitmap plus a similarity threshold. Immutable; the
/// backing file is resolved from disk at call time.
#[derive(Debug, Clone)]
pub struct Template {
    pub path: PathBuf,
    pub name: String,
    pub threshold: f32,
}

impl Template {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();
        Self {
            path,
            name,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Load the backing bitmap as grayscale. A missing or corrupt file is a
    /// precondition violation for the single call: it is logged and reported
    /// as absent by the matcher, never propagated.
    pub fn load(&self) -> Option<GrayImage> {
        match image::open(&self.path) {
            Ok(img) => Some(img.to_luma8()),
            Err(e) => {
                log::error!("failed to load template {}: {e}", self.path.display());
                None
            }
        }
    }
}

/// A directory of interchangeable templates, matched with first-hit
/// semantics. Enumeration order is alphabetical by file name so results do
/// not depend on filesystem iteration order.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    pub dir: PathBuf,
    pub threshold: f32,
}

impl TemplateSet {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Member templates, sorted by file name.
    pub fn templates(&self) -> Vec<Template> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::error!("failed to read template set {}: {e}", self.dir.display());
                return Vec::new();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_image(path))
            .collect();
        paths.sort();

        paths
            .into_iter()
            .map(|p| Template::new(p).with_threshold(self.threshold))
            .collect()
    }
}

fn is_image(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("png") | Some("jpg") | Some("jpeg")
    )
}
