//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the application needs from external systems.
//! The `pbxgen-adapters` crate provides implementations.

use std::fmt;
use std::path::Path;

use crate::domain::{ConfigKind, Platform, ProductType, Settings};
use crate::error::PbxResult;

/// Port for filesystem operations.
///
/// Implemented by:
/// - `pbxgen_adapters::filesystem::LocalFilesystem` (production)
/// - `pbxgen_adapters::filesystem::MemoryFilesystem` (testing)
#[cfg_attr(test, mockall::automock)]
pub trait Filesystem: Send + Sync {
    /// Names of the entries of a directory, in no particular order.
    fn read_dir(&self, path: &Path) -> PbxResult<Vec<String>>;

    fn is_dir(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> PbxResult<String>;

    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> PbxResult<()>;

    /// Write content to a file, replacing it.
    fn write_file(&self, path: &Path, content: &str) -> PbxResult<()>;

    /// Move a file or directory.
    fn rename(&self, from: &Path, to: &Path) -> PbxResult<()>;

    /// Remove a directory and all contents.
    fn remove_dir_all(&self, path: &Path) -> PbxResult<()>;
}

/// Key of a preset in the preset library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetKey<'a> {
    /// Applied to every project configuration.
    Base,
    Config(ConfigKind),
    Platform(Platform),
    Product(ProductType),
    PlatformProduct(Platform, ProductType),
    /// A group name referenced from settings.
    Named(&'a str),
}

impl fmt::Display for PresetKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => f.write_str("base"),
            Self::Config(kind) => write!(f, "config/{kind}"),
            Self::Platform(platform) => write!(f, "platform/{platform}"),
            Self::Product(product) => write!(f, "product/{product}"),
            Self::PlatformProduct(platform, product) => {
                write!(f, "platform-product/{platform}/{product}")
            }
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// Port for named build-setting presets.
///
/// Presets are opaque data to the resolver.
pub trait PresetLibrary: Send + Sync {
    fn preset(&self, key: PresetKey<'_>) -> Option<Settings>;

    fn contains(&self, name: &str) -> bool {
        self.preset(PresetKey::Named(name)).is_some()
    }
}

/// Port for metadata shipped alongside prebuilt frameworks.
pub trait FrameworkMetadata: Send + Sync {
    /// Frameworks bundled with `reference` for `platform`, as declared by the
    /// dependency manager under `build_root`. `None` when no metadata exists
    /// or it cannot be parsed.
    fn related_frameworks(
        &self,
        build_root: &Path,
        reference: &str,
        platform: Platform,
    ) -> Option<Vec<String>>;
}
