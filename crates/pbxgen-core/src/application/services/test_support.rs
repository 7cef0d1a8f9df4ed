//! In-crate filesystem fake for service tests.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::{
    application::{error::FilesystemError, ports::Filesystem},
    error::PbxResult,
};

#[derive(Default)]
struct Inner {
    files: BTreeMap<PathBuf, String>,
    dirs: BTreeSet<PathBuf>,
}

/// A tree of files held in memory. Parent directories are implied.
#[derive(Default)]
pub struct TreeFs {
    inner: RwLock<Inner>,
}

impl TreeFs {
    pub fn with_files(paths: &[&str]) -> Self {
        let fs = Self::default();
        for path in paths {
            fs.add_file(path, "");
        }
        fs
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: &str) {
        let path = path.as_ref().to_path_buf();
        let mut inner = self.inner.write().unwrap();
        let mut parent = path.parent();
        while let Some(dir) = parent {
            if dir.as_os_str().is_empty() {
                break;
            }
            inner.dirs.insert(dir.to_path_buf());
            parent = dir.parent();
        }
        inner.files.insert(path, content.to_string());
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut inner = self.inner.write().unwrap();
        let mut current = Some(path.as_ref());
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            inner.dirs.insert(dir.to_path_buf());
            current = dir.parent();
        }
    }

    pub fn content(&self, path: impl AsRef<Path>) -> Option<String> {
        self.inner.read().unwrap().files.get(path.as_ref()).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.inner.read().unwrap().files.len()
    }
}

fn missing(path: &Path, operation: &'static str) -> crate::error::PbxError {
    FilesystemError {
        path: path.to_path_buf(),
        operation,
        reason: "not found".into(),
    }
    .into()
}

impl Filesystem for TreeFs {
    fn read_dir(&self, path: &Path) -> PbxResult<Vec<String>> {
        let inner = self.inner.read().unwrap();
        if !inner.dirs.contains(path) {
            return Err(missing(path, "read directory"));
        }
        let children = inner
            .dirs
            .iter()
            .chain(inner.files.keys())
            .filter(|p| p.parent() == Some(path))
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        Ok(children)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner.read().unwrap().dirs.contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.inner.read().unwrap().files.contains_key(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.is_dir(path) || self.is_file(path)
    }

    fn read_to_string(&self, path: &Path) -> PbxResult<String> {
        self.content(path).ok_or_else(|| missing(path, "read"))
    }

    fn create_dir_all(&self, path: &Path) -> PbxResult<()> {
        self.add_dir(path);
        Ok(())
    }

    fn write_file(&self, path: &Path, content: &str) -> PbxResult<()> {
        self.add_file(path, content);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> PbxResult<()> {
        let mut inner = self.inner.write().unwrap();
        let moved_files: Vec<(PathBuf, String)> = inner
            .files
            .iter()
            .filter(|(p, _)| p.starts_with(from))
            .map(|(p, c)| (p.clone(), c.clone()))
            .collect();
        let moved_dirs: Vec<PathBuf> = inner
            .dirs
            .iter()
            .filter(|p| p.starts_with(from))
            .cloned()
            .collect();
        if moved_files.is_empty() && moved_dirs.is_empty() {
            return Err(missing(from, "rename"));
        }
        for (path, content) in moved_files {
            inner.files.remove(&path);
            if let Ok(rest) = path.strip_prefix(from) {
                inner.files.insert(to.join(rest), content);
            }
        }
        for path in moved_dirs {
            inner.dirs.remove(&path);
            if let Ok(rest) = path.strip_prefix(from) {
                inner.dirs.insert(to.join(rest));
            }
        }
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> PbxResult<()> {
        let mut inner = self.inner.write().unwrap();
        inner.files.retain(|p, _| !p.starts_with(path));
        inner.dirs.retain(|p| !p.starts_with(path));
        Ok(())
    }
}
