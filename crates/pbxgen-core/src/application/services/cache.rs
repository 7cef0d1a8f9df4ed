//! Cache manager.
//!
//! The cache is a single text file holding the signature of the last
//! generated spec. A matching signature and an existing bundle skip
//! generation entirely. Cache failures never fail a run.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use crate::{
    application::{error::CacheError, ports::Filesystem},
    domain::ProjectSpec,
    error::PbxResult,
};

/// Directory under the user cache dir holding cache files.
pub const CACHE_DIR_NAME: &str = "pbxgen";

/// Everything a signature is computed over.
#[derive(Debug, Clone, Copy)]
pub struct SignatureInput<'a> {
    pub tool_version: &'a semver::Version,
    pub spec: &'a ProjectSpec,
    /// Resolved source file paths, in any order.
    pub files: &'a [PathBuf],
    /// One line per resolved dependency, in resolution order.
    pub dependencies: &'a [String],
    /// One line per resolved build setting, project first, then targets.
    pub settings: &'a [String],
    /// Script bodies as they will be written, one entry per script.
    pub scripts: &'a [String],
    /// One line per source tree node, in any order.
    pub tree: &'a [String],
}

/// SHA-256 hex of the canonical signature text.
///
/// Object keys of the spec JSON are sorted, and so are the file and tree
/// lists, so neither declaration order of maps nor walk order changes the
/// result.
pub fn compute_signature(input: &SignatureInput<'_>) -> PbxResult<String> {
    let spec = serde_json::to_value(input.spec)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .map_err(|e| CacheError::Signature {
            reason: e.to_string(),
        })?;

    let mut files: Vec<String> = input
        .files
        .iter()
        .map(|path| path.to_string_lossy().replace('\\', "/"))
        .collect();
    files.sort();
    files.dedup();

    let mut tree = input.tree.to_vec();
    tree.sort();
    tree.dedup();

    let text = format!(
        "# TOOL VERSION\n{}\n\n# SPEC\n{}\n\n# FILES\n{}\n\n# DEPENDENCIES\n{}\n\n\
         # SETTINGS\n{}\n\n# SCRIPTS\n{}\n\n# SOURCE TREE\n{}",
        input.tool_version,
        spec,
        files.join("\n"),
        input.dependencies.join("\n"),
        input.settings.join("\n"),
        input.scripts.join("\n"),
        tree.join("\n"),
    );
    Ok(hex::encode(Sha256::digest(text.as_bytes())))
}

/// Cache file name for a spec: SHA-256 hex of its absolute path.
pub fn default_cache_file_name(spec_path: &Path) -> String {
    hex::encode(Sha256::digest(spec_path.to_string_lossy().as_bytes()))
}

pub struct CacheManager<'a> {
    filesystem: &'a dyn Filesystem,
    path: PathBuf,
}

impl<'a> CacheManager<'a> {
    pub fn new(filesystem: &'a dyn Filesystem, path: impl Into<PathBuf>) -> Self {
        Self {
            filesystem,
            path: path.into(),
        }
    }

    /// Cache at `<cache_dir>/pbxgen/<hash of spec path>`.
    pub fn for_spec(filesystem: &'a dyn Filesystem, cache_dir: &Path, spec_path: &Path) -> Self {
        Self::new(
            filesystem,
            cache_dir
                .join(CACHE_DIR_NAME)
                .join(default_cache_file_name(spec_path)),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored signature, `None` if absent or unreadable.
    pub fn read(&self) -> Option<String> {
        if !self.filesystem.is_file(&self.path) {
            return None;
        }
        match self.filesystem.read_to_string(&self.path) {
            Ok(content) => Some(content.trim().to_string()),
            Err(e) => {
                let error = CacheError::Read {
                    path: self.path.clone(),
                    reason: e.to_string(),
                };
                warn!(error = %error, "Ignoring unreadable cache");
                None
            }
        }
    }

    /// Whether generation can be skipped: the stored signature equals
    /// `signature` and the output bundle still exists.
    #[instrument(skip_all, fields(cache = %self.path.display()))]
    pub fn should_skip(&self, signature: &str, bundle: &Path) -> bool {
        let Some(previous) = self.read() else {
            debug!("No previous signature");
            return false;
        };
        if previous != signature {
            debug!("Signature changed");
            return false;
        }
        let exists = self.filesystem.exists(bundle);
        debug!(bundle_exists = exists, "Signature unchanged");
        exists
    }

    /// Persist `signature`. Failures are logged and otherwise ignored.
    pub fn store(&self, signature: &str) {
        if let Err(error) = self.try_store(signature) {
            warn!(error = %error, "Could not update cache");
        }
    }

    fn try_store(&self, signature: &str) -> Result<(), CacheError> {
        let to_error = |e: crate::error::PbxError| CacheError::Write {
            path: self.path.clone(),
            reason: e.to_string(),
        };
        if let Some(parent) = self.path.parent() {
            self.filesystem.create_dir_all(parent).map_err(to_error)?;
        }
        self.filesystem
            .write_file(&self.path, signature)
            .map_err(to_error)?;
        debug!(cache = %self.path.display(), "Cache updated");
        Ok(())
    }
}
