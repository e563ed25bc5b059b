// Synremap Input Layer - Device Path Resolution
// Vendor interface discovery and composite-device sibling expansion

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use regex::Regex;

use super::device::{classify, DeviceKind};

pub const DEFAULT_VENDOR: &str = "Razer";
pub const DEFAULT_BY_ID_DIR: &str = "/dev/input/by-id";
pub const DEFAULT_BY_PATH_DIR: &str = "/dev/input/by-path";

/// Finds a vendor's input interfaces under the udev symlink directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    vendor: String,
    by_id_dir: PathBuf,
    by_path_dir: PathBuf,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new(DEFAULT_VENDOR, DEFAULT_BY_ID_DIR, DEFAULT_BY_PATH_DIR)
    }
}

impl PathResolver {
    pub fn new(
        vendor: impl Into<String>,
        by_id_dir: impl Into<PathBuf>,
        by_path_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            vendor: vendor.into(),
            by_id_dir: by_id_dir.into(),
            by_path_dir: by_path_dir.into(),
        }
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// List the vendor's event interfaces currently present.
    ///
    /// Keyboard interfaces first, then mice, then generic vendor interfaces,
    /// then by-path entries. Duplicates keep their first position. Missing
    /// directories simply contribute nothing.
    pub fn discover(&self) -> Vec<String> {
        let vendor = regex::escape(&self.vendor);
        let vendor_lower = regex::escape(&self.vendor.to_lowercase());

        let patterns = [
            (&self.by_id_dir, format!("^.*{}.*-event-kbd$", vendor)),
            (&self.by_id_dir, format!("^.*{}.*-event-mouse$", vendor)),
            (&self.by_id_dir, format!("^.*{}.*-event-if.*$", vendor)),
            (&self.by_path_dir, format!("^.*-{}-.*event.*$", vendor_lower)),
        ];

        let mut found = Vec::new();
        for (dir, pattern) in &patterns {
            found.extend(match_entries(dir, pattern));
        }
        unique(found)
    }

    /// Expand one chosen interface into all interfaces of the same device.
    ///
    /// Paths that are not by-id event interfaces come back unchanged. For a
    /// keyboard or mouse interface the result is narrowed to siblings of the
    /// same kind when there are any, so remapping the keyboard function does
    /// not also capture the device's macro or pointer functions.
    pub fn expand(&self, selected: &str) -> Vec<String> {
        let Some((dir, base)) = self.composite_base(selected) else {
            return vec![selected.to_string()];
        };

        let base = regex::escape(&base);
        let patterns = [
            format!("^{}-event.*$", base),
            format!("^{}-if.*-event.*$", base),
        ];

        let mut matches = Vec::new();
        for pattern in &patterns {
            matches.extend(match_entries(&dir, pattern));
        }
        let mut matches = unique(matches);
        if !matches.iter().any(|path| path == selected) {
            matches.insert(0, selected.to_string());
        }

        let target_kind = classify(selected);
        if matches!(target_kind, DeviceKind::Keyboard | DeviceKind::Mouse) {
            let same_kind: Vec<String> = matches
                .iter()
                .filter(|path| classify(path) == target_kind)
                .cloned()
                .collect();
            if !same_kind.is_empty() {
                return same_kind;
            }
        }

        matches
    }

    /// Directory and base file name shared by a composite device's
    /// interfaces, or `None` when `selected` is not a by-id event path.
    fn composite_base(&self, selected: &str) -> Option<(PathBuf, String)> {
        let path = Path::new(selected);
        if path.parent()? != self.by_id_dir.as_path() {
            return None;
        }
        let file_name = path.file_name()?.to_str()?;
        let (prefix, _) = file_name.split_once("-event")?;
        let base = match prefix.split_once("-if") {
            Some((base, _)) => base,
            None => prefix,
        };
        Some((self.by_id_dir.clone(), base.to_string()))
    }
}

/// User-facing label for an interface path.
pub fn display_name(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.replace("usb-", "")
        .replace("-event-kbd", "")
        .replace("-event-mouse", "")
}

/// Entries of `dir` whose file name matches `pattern`, sorted, existing only.
fn match_entries(dir: &Path, pattern: &str) -> Vec<String> {
    let regex = match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(e) => {
            log::warn!("Invalid interface pattern '{}': {}", pattern, e);
            return Vec::new();
        }
    };

    let mut paths = match read_dir_names(dir) {
        Ok(names) => names
            .into_iter()
            .filter(|name| regex.is_match(name))
            .map(|name| dir.join(name))
            // Dangling udev symlinks point at interfaces that are gone.
            .filter(|path| path.exists())
            .filter_map(|path| path.to_str().map(str::to_string))
            .collect::<Vec<_>>(),
        Err(e) => {
            log::trace!("Cannot list {}: {}", dir.display(), e);
            Vec::new()
        }
    };
    paths.sort();
    paths
}

fn read_dir_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    Ok(names)
}

fn unique(items: Vec<String>) -> Vec<String> {
    items.into_iter().collect::<IndexSet<_>>().into_iter().collect()
}
