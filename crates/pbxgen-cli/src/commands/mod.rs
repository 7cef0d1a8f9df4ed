//! Command handlers, one module per subcommand.
//!
//! Handlers translate arguments and configuration into core calls and
//! report the outcome. Generation semantics live in `pbxgen-core`.

use std::path::{Path, PathBuf};

use pbxgen_adapters::{BuiltinPresets, DirectoryPresets, LocalFilesystem, VersionFileMetadata};
use pbxgen_core::{
    application::{Generator, GeneratorOptions, PresetLibrary},
    domain::{GlobBehavior, ProjectSpec},
};
use tracing::debug;

use crate::error::{CliError, CliResult, IntoCli};

pub mod completions;
pub mod config;
pub mod generate;
pub mod signature;

/// Load a spec, reporting a missing file as not-found rather than a read error.
pub(crate) fn load_spec_file(path: &Path) -> CliResult<ProjectSpec> {
    if !path.is_file() {
        return Err(CliError::SpecNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(pbxgen_adapters::load_spec(path)?)
}

/// Absolute directory holding the spec file.
pub(crate) fn spec_dir(spec_path: &Path) -> CliResult<PathBuf> {
    let absolute = std::path::absolute(spec_path)
        .with_cli_context(|| format!("resolving {}", spec_path.display()))?;
    Ok(absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default())
}

/// Use `behavior` for specs that kept the default glob behavior.
pub(crate) fn apply_glob_default(spec: &mut ProjectSpec, behavior: Option<GlobBehavior>) {
    let Some(behavior) = behavior else {
        return;
    };
    if spec.options.glob_behavior == GlobBehavior::default() {
        debug!(glob = %behavior, "Applying configured glob behavior");
        spec.options.glob_behavior = behavior;
    }
}

/// Generator over the local filesystem.
pub(crate) fn build_generator(
    options: GeneratorOptions,
    presets_dir: Option<&Path>,
) -> CliResult<Generator> {
    let presets: Box<dyn PresetLibrary> = match presets_dir {
        Some(dir) => Box::new(DirectoryPresets::load(dir).map_err(|e| CliError::ConfigError {
            message: format!("Cannot load presets: {e}"),
            source: Some(Box::new(e)),
        })?),
        None => Box::new(BuiltinPresets::new()),
    };
    Ok(Generator::new(
        Box::new(LocalFilesystem::new()),
        presets,
        Box::new(VersionFileMetadata::new()),
        options,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_spec_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_spec_file(&dir.path().join("project.json")).unwrap_err();
        assert!(matches!(err, CliError::SpecNotFound { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn spec_dir_is_absolute() {
        let dir = spec_dir(Path::new("project.json")).unwrap();
        assert!(dir.is_absolute());
    }

    #[test]
    fn glob_default_only_replaces_the_default() {
        let mut spec = ProjectSpec::new("Demo", "/p");
        apply_glob_default(&mut spec, Some(GlobBehavior::Gradle));
        assert_eq!(spec.options.glob_behavior, GlobBehavior::Gradle);

        let mut spec = ProjectSpec::new("Demo", "/p");
        spec.options.glob_behavior = GlobBehavior::BashV3;
        apply_glob_default(&mut spec, Some(GlobBehavior::Gradle));
        assert_eq!(spec.options.glob_behavior, GlobBehavior::BashV3);

        let mut spec = ProjectSpec::new("Demo", "/p");
        apply_glob_default(&mut spec, None);
        assert_eq!(spec.options.glob_behavior, GlobBehavior::default());
    }

    #[test]
    fn missing_presets_dir_falls_back_to_builtins() {
        let dir = tempfile::tempdir().unwrap();
        assert!(
            build_generator(GeneratorOptions::default(), Some(&dir.path().join("none"))).is_ok()
        );
    }
}
