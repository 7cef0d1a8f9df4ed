//! Version-file metadata for prebuilt frameworks.
//!
//! The dependency manager writes `<build root>/.<Name>.version` next to the
//! frameworks it builds:
//!
//! ```json
//! {
//!   "commitish": "6.0.0",
//!   "iOS": [{ "name": "ReactiveSwift", "hash": "..." }, { "name": "Result", "hash": "..." }],
//!   "Mac": [{ "name": "ReactiveSwift", "hash": "..." }]
//! }
//! ```
//!
//! Parsed files are kept for the lifetime of the adapter. Reads share the
//! lock; the first load of a file takes it exclusively.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::Deserialize;
use tracing::{debug, warn};

use pbxgen_core::{application::ports::FrameworkMetadata, domain::Platform};

use crate::error::LoadError;

#[derive(Debug, Deserialize)]
struct Reference {
    name: String,
}

/// One parsed version file: framework names per platform directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionFile {
    frameworks: BTreeMap<String, Vec<String>>,
}

impl VersionFile {
    pub fn parse(path: &Path, text: &str) -> Result<Self, LoadError> {
        let raw: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(text).map_err(|e| LoadError::parse(path, &e))?;

        let mut frameworks = BTreeMap::new();
        for platform in Platform::ALL {
            let key = platform.framework_dir();
            let Some(value) = raw.get(key) else {
                continue;
            };
            let references: Vec<Reference> = serde_json::from_value(value.clone())
                .map_err(|e| LoadError::parse(path, &e))?;
            let names: BTreeSet<String> = references.into_iter().map(|r| r.name).collect();
            frameworks.insert(key.to_string(), names.into_iter().collect());
        }
        Ok(Self { frameworks })
    }

    /// Framework names for `platform`, sorted and de-duplicated.
    pub fn frameworks(&self, platform: Platform) -> &[String] {
        self.frameworks
            .get(platform.framework_dir())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Reads version files from disk, once per file.
#[derive(Debug, Default)]
pub struct VersionFileMetadata {
    loaded: RwLock<HashMap<PathBuf, Option<VersionFile>>>,
}

impl VersionFileMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version_file_path(build_root: &Path, reference: &str) -> PathBuf {
        build_root.join(format!(".{reference}.version"))
    }

    fn load(&self, path: &Path) -> Option<VersionFile> {
        if let Ok(loaded) = self.loaded.read() {
            if let Some(file) = loaded.get(path) {
                return file.clone();
            }
        }

        let file = match std::fs::read_to_string(path) {
            Ok(text) => match VersionFile::parse(path, &text) {
                Ok(file) => Some(file),
                Err(e) => {
                    warn!(error = %e, "Ignoring unparsable version file");
                    None
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "No version file");
                None
            }
        };

        if let Ok(mut loaded) = self.loaded.write() {
            loaded.insert(path.to_path_buf(), file.clone());
        }
        file
    }
}

impl FrameworkMetadata for VersionFileMetadata {
    fn related_frameworks(
        &self,
        build_root: &Path,
        reference: &str,
        platform: Platform,
    ) -> Option<Vec<String>> {
        let file = self.load(&Self::version_file_path(build_root, reference))?;
        Some(
            file.frameworks(platform)
                .iter()
                .filter(|name| name.as_str() != reference)
                .cloned()
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const REACTIVE_COCOA: &str = r#"{
        "commitish": "10.0.0",
        "iOS": [
            { "name": "ReactiveCocoa", "hash": "a" },
            { "name": "ReactiveSwift", "hash": "b" },
            { "name": "ReactiveSwift", "hash": "b" }
        ],
        "Mac": [{ "name": "ReactiveCocoa", "hash": "c" }]
    }"#;

    #[test]
    fn parses_platform_lists() {
        let file = VersionFile::parse(Path::new(".ReactiveCocoa.version"), REACTIVE_COCOA).unwrap();
        assert_eq!(file.frameworks(Platform::Ios), ["ReactiveCocoa", "ReactiveSwift"]);
        assert_eq!(file.frameworks(Platform::Macos), ["ReactiveCocoa"]);
        assert!(file.frameworks(Platform::Tvos).is_empty());
    }

    #[test]
    fn related_frameworks_exclude_the_reference() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".ReactiveCocoa.version"), REACTIVE_COCOA).unwrap();

        let metadata = VersionFileMetadata::new();
        let related = metadata.related_frameworks(dir.path(), "ReactiveCocoa", Platform::Ios);
        assert_eq!(related, Some(vec!["ReactiveSwift".to_string()]));
        assert_eq!(
            metadata.related_frameworks(dir.path(), "ReactiveCocoa", Platform::Macos),
            Some(vec![])
        );
    }

    #[test]
    fn missing_or_broken_files_have_no_metadata() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".Broken.version"), "[").unwrap();

        let metadata = VersionFileMetadata::new();
        assert_eq!(metadata.related_frameworks(dir.path(), "Missing", Platform::Ios), None);
        assert_eq!(metadata.related_frameworks(dir.path(), "Broken", Platform::Ios), None);
    }

    #[test]
    fn files_are_read_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ReactiveCocoa.version");
        fs::write(&path, REACTIVE_COCOA).unwrap();

        let metadata = VersionFileMetadata::new();
        assert!(metadata.related_frameworks(dir.path(), "ReactiveCocoa", Platform::Ios).is_some());
        fs::remove_file(&path).unwrap();
        assert!(metadata.related_frameworks(dir.path(), "ReactiveCocoa", Platform::Ios).is_some());
    }
}
