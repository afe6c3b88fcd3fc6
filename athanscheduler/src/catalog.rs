//! Audio files available for a broadcast.

use rand::seq::IndexedRandom;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// One playable file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioItem {
    /// Path below the catalog root, `/`-separated (`fajr/adhan 1.mp3`)
    pub relative_path: String,
    pub file_path: PathBuf,
}

pub trait AudioCatalog: Send + Sync {
    /// A random playable item of `folder` (`""` is the root), or `None`
    /// when the folder is missing or holds no playable file.
    fn pick(&self, folder: &str) -> Option<AudioItem>;
}

/// Catalog backed by a directory tree. Only the immediate `.mp3` / `.wav`
/// files of a folder are candidates (extension matched case-insensitively).
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    root: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Playable file names of `folder`, sorted
    pub fn list(&self, folder: &str) -> Vec<String> {
        let folder = folder.trim_matches('/');
        if !is_safe_folder(folder) {
            warn!("⚠️ Refusing audio folder '{}'", folder);
            return Vec::new();
        }

        let dir = self.root.join(folder);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("⚠️ Cannot read audio folder {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| is_playable(name))
            .collect();
        names.sort();
        names
    }
}

impl AudioCatalog for DirectoryCatalog {
    fn pick(&self, folder: &str) -> Option<AudioItem> {
        let folder = folder.trim_matches('/');
        let names = self.list(folder);
        let name = names.choose(&mut rand::rng())?;

        let relative_path = if folder.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", folder, name)
        };
        debug!("🎵 Picked {} out of {} file(s)", relative_path, names.len());

        Some(AudioItem {
            file_path: self.root.join(&relative_path),
            relative_path,
        })
    }
}

fn is_playable(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("mp3") || ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

// Folders stay below the root
fn is_safe_folder(folder: &str) -> bool {
    Path::new(folder)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}
