//! Cache file location.

use std::path::{Path, PathBuf};

use pbxgen_core::application::{CacheManager, ports::Filesystem};

/// The platform user cache directory, if the platform has one.
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir()
}

/// Cache manager for `spec_path`.
///
/// `explicit` wins. Otherwise the file lives under `cache_dir`, falling back
/// to the platform cache directory and finally to the spec's own directory.
pub fn cache_for_spec<'a>(
    filesystem: &'a dyn Filesystem,
    explicit: Option<&Path>,
    cache_dir: Option<&Path>,
    spec_path: &Path,
) -> CacheManager<'a> {
    if let Some(path) = explicit {
        return CacheManager::new(filesystem, path);
    }
    let spec_path = std::path::absolute(spec_path).unwrap_or_else(|_| spec_path.to_path_buf());
    let cache_dir = cache_dir
        .map(Path::to_path_buf)
        .or_else(default_cache_dir)
        .unwrap_or_else(|| {
            spec_path
                .parent()
                .map(|dir| dir.join(".cache"))
                .unwrap_or_default()
        });
    CacheManager::for_spec(filesystem, &cache_dir, &spec_path)
}

#[cfg(test)]
mod tests {
    use pbxgen_core::application::services::cache::default_cache_file_name;

    use super::*;
    use crate::MemoryFilesystem;

    #[test]
    fn explicit_path_wins() {
        let fs = MemoryFilesystem::new();
        let cache = cache_for_spec(
            &fs,
            Some(Path::new("/tmp/sig")),
            Some(Path::new("/cache")),
            Path::new("/p/project.json"),
        );
        assert_eq!(cache.path(), Path::new("/tmp/sig"));
    }

    #[test]
    fn cache_dir_holds_hashed_name() {
        let fs = MemoryFilesystem::new();
        let cache = cache_for_spec(&fs, None, Some(Path::new("/cache")), Path::new("/p/project.json"));
        assert_eq!(
            cache.path(),
            Path::new("/cache/pbxgen").join(default_cache_file_name(Path::new("/p/project.json")))
        );
    }
}
