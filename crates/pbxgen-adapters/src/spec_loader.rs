//! JSON spec loader.
//!
//! Variable expansion and other spec formats happen before this point; the
//! loader only parses and anchors relative paths.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use pbxgen_core::domain::ProjectSpec;

use crate::error::LoadError;

/// Load a spec from a JSON file.
///
/// A missing `basePath` becomes the directory holding the file; a relative
/// one is resolved against it.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_spec(path: impl AsRef<Path>) -> Result<ProjectSpec, LoadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| LoadError::read(path, e))?;
    let mut spec = parse_spec(path, &text)?;

    let spec_dir = spec_dir(path);
    spec.base_path = if spec.base_path.as_os_str().is_empty() {
        spec_dir
    } else if spec.base_path.is_relative() {
        spec_dir.join(&spec.base_path)
    } else {
        spec.base_path
    };

    debug!(
        name = %spec.name,
        targets = spec.targets.len(),
        base = %spec.base_path.display(),
        "Spec loaded"
    );
    Ok(spec)
}

/// Parse spec JSON. `path` is only used in errors.
pub fn parse_spec(path: &Path, text: &str) -> Result<ProjectSpec, LoadError> {
    serde_json::from_str(text).map_err(|e| LoadError::parse(path, &e))
}

fn spec_dir(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pbxgen_core::domain::{Platform, ProductType};

    use super::*;

    const SPEC: &str = r#"{
        "name": "Demo",
        "targets": [
            { "name": "App", "type": "application", "platform": "iOS", "sources": [{ "path": "App" }] }
        ]
    }"#;

    #[test]
    fn base_path_defaults_to_spec_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        fs::write(&path, SPEC).unwrap();

        let spec = load_spec(&path).unwrap();

        assert_eq!(spec.name, "Demo");
        assert_eq!(spec.base_path, dir.path());
        assert_eq!(spec.targets[0].platform, Platform::Ios);
        assert_eq!(spec.targets[0].product_type, ProductType::Application);
    }

    #[test]
    fn relative_base_path_is_anchored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        fs::write(&path, SPEC.replacen("{", r#"{ "basePath": "ios","#, 1)).unwrap();

        let spec = load_spec(&path).unwrap();
        assert_eq!(spec.base_path, dir.path().join("ios"));
    }

    #[test]
    fn parse_errors_carry_position() {
        let err = parse_spec(Path::new("p.json"), "{\n  \"name\": }").unwrap_err();
        assert!(matches!(err, LoadError::Parse { line: 2, .. }), "{err:?}");
        assert_eq!(err.path(), Path::new("p.json"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_spec("/no/such/project.json").unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
    }
}
