//! Store version detection.
//!
//! Which decryption strategy applies depends on the generation of the
//! installed application. Platform-specific probing (registry lookups,
//! process inspection) lives outside this crate behind [`VersionProbe`];
//! the shipped [`DirectoryProbe`] recognizes the two supported on-disk
//! store layouts directly.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Store layout generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreVariant {
    /// 3.x stores: databases under a `Msg/` directory.
    V3,
    /// 4.0 stores: databases under a `db_storage/` directory.
    V4,
    Unknown,
}

impl StoreVariant {
    /// Name of the directory holding the store's databases.
    pub fn store_subdir(&self) -> Option<&'static str> {
        match self {
            StoreVariant::V3 => Some("Msg"),
            StoreVariant::V4 => Some("db_storage"),
            StoreVariant::Unknown => None,
        }
    }
}

impl fmt::Display for StoreVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreVariant::V3 => write!(f, "3.x"),
            StoreVariant::V4 => write!(f, "4.0"),
            StoreVariant::Unknown => write!(f, "unknown"),
        }
    }
}

/// Outcome of a probe: the version string when one could be read, and the
/// recognized store variant (`Unknown` when no supported layout was found).
#[derive(Debug, Clone)]
pub struct Detection {
    pub version: Option<String>,
    pub variant: StoreVariant,
}

pub trait VersionProbe: Send + Sync {
    fn probe(&self) -> Result<Detection>;
}

/// Detects the store variant by inspecting the source directory layout.
///
/// A `version.txt` file next to the store, when present, supplies the full
/// version string; the variant itself is decided by the layout alone.
pub struct DirectoryProbe {
    root: PathBuf,
}

impl DirectoryProbe {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl VersionProbe for DirectoryProbe {
    fn probe(&self) -> Result<Detection> {
        let variant = if self.root.join("Msg").is_dir() {
            StoreVariant::V3
        } else if self.root.join("db_storage").is_dir() {
            StoreVariant::V4
        } else {
            StoreVariant::Unknown
        };

        let version = read_version_marker(&self.root);
        Ok(Detection { version, variant })
    }
}

fn read_version_marker(root: &Path) -> Option<String> {
    std::fs::read_to_string(root.join("version.txt"))
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_v3_layout() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("Msg")).unwrap();
        std::fs::write(dir.path().join("version.txt"), "3.9.8.25\n").unwrap();

        let d = DirectoryProbe::new(dir.path()).probe().unwrap();
        assert_eq!(d.variant, StoreVariant::V3);
        assert_eq!(d.version.as_deref(), Some("3.9.8.25"));
    }

    #[test]
    fn detects_v4_layout_without_version_marker() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("db_storage")).unwrap();

        let d = DirectoryProbe::new(dir.path()).probe().unwrap();
        assert_eq!(d.variant, StoreVariant::V4);
        assert!(d.version.is_none());
    }

    #[test]
    fn unrecognized_layout_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let d = DirectoryProbe::new(dir.path()).probe().unwrap();
        assert_eq!(d.variant, StoreVariant::Unknown);
    }
}
