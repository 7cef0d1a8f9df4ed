//! Project writer.
//!
//! Everything is rendered in memory before the first write. The bundle is
//! staged into a hidden sibling directory and swapped into place, so a
//! failure before the swap leaves any previous bundle untouched.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::{
    application::{
        error::WritingError,
        ports::Filesystem,
        services::serializer::{render_plist, render_project, render_scheme},
    },
    domain::ObjectGraph,
    error::{PbxError, PbxResult},
};

pub const PROJECT_FILE: &str = "project.pbxproj";
pub const SCHEMES_DIR: &str = "xcshareddata/xcschemes";

/// A rendered file, relative to its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub path: PathBuf,
    pub content: String,
}

/// Render the bundle contents: the project file and one file per scheme.
pub fn render_bundle(graph: &ObjectGraph) -> Vec<RenderedFile> {
    let mut files = vec![RenderedFile {
        path: PathBuf::from(PROJECT_FILE),
        content: render_project(graph),
    }];
    for document in &graph.schemes {
        files.push(RenderedFile {
            path: Path::new(SCHEMES_DIR).join(format!("{}.xcscheme", document.scheme.name)),
            content: render_scheme(graph, document),
        });
    }
    files
}

/// Path of the bundle written for `graph` under `destination`.
pub fn bundle_path(graph: &ObjectGraph, destination: &Path) -> PathBuf {
    destination.join(format!("{}.xcodeproj", graph.project_name))
}

pub struct ProjectWriter<'a> {
    filesystem: &'a dyn Filesystem,
}

impl<'a> ProjectWriter<'a> {
    pub fn new(filesystem: &'a dyn Filesystem) -> Self {
        Self { filesystem }
    }

    /// Write the bundle and the declaration files of `graph`.
    ///
    /// An existing bundle is only replaced when `override_existing` is set.
    #[instrument(
        skip_all,
        fields(project = %graph.project_name, destination = %destination.display())
    )]
    pub fn write(
        &self,
        graph: &ObjectGraph,
        destination: &Path,
        override_existing: bool,
    ) -> PbxResult<()> {
        let bundle = bundle_path(graph, destination);
        if self.filesystem.exists(&bundle) && !override_existing {
            return Err(WritingError::BundleExists { path: bundle }.into());
        }

        let files = render_bundle(graph);
        let declarations: Vec<RenderedFile> = graph
            .declarations
            .iter()
            .map(|declaration| RenderedFile {
                path: destination.join(&declaration.path),
                content: render_plist(&declaration.properties),
            })
            .collect();

        let staging = destination.join(format!(".{}.xcodeproj.staging", graph.project_name));
        if self.filesystem.exists(&staging) {
            self.filesystem
                .remove_dir_all(&staging)
                .map_err(io_error(&staging))?;
        }

        if let Err(e) = self.stage(&staging, &files) {
            warn!("Staging failed, removing staged files");
            self.discard(&staging);
            return Err(e);
        }
        self.swap(&staging, &bundle)?;
        info!(files = files.len(), bundle = %bundle.display(), "Project bundle written");

        for declaration in &declarations {
            self.write_if_changed(declaration)?;
        }
        Ok(())
    }

    fn stage(&self, staging: &Path, files: &[RenderedFile]) -> PbxResult<()> {
        self.filesystem
            .create_dir_all(staging)
            .map_err(io_error(staging))?;
        for file in files {
            let path = staging.join(&file.path);
            if let Some(parent) = path.parent() {
                self.filesystem
                    .create_dir_all(parent)
                    .map_err(io_error(parent))?;
            }
            self.filesystem
                .write_file(&path, &file.content)
                .map_err(io_error(&path))?;
        }
        debug!(staging = %staging.display(), "Bundle staged");
        Ok(())
    }

    /// Move the staged bundle into place, keeping the previous bundle aside
    /// until the move succeeded.
    fn swap(&self, staging: &Path, bundle: &Path) -> PbxResult<()> {
        let backup = bundle.with_extension("xcodeproj.previous");
        let had_previous = self.filesystem.exists(bundle);
        if had_previous {
            if self.filesystem.exists(&backup) {
                self.filesystem
                    .remove_dir_all(&backup)
                    .map_err(io_error(&backup))?;
            }
            if let Err(e) = self.filesystem.rename(bundle, &backup) {
                self.discard(staging);
                return Err(io_error(bundle)(e));
            }
        }

        if let Err(e) = self.filesystem.rename(staging, bundle) {
            self.discard(staging);
            if had_previous {
                self.filesystem.rename(&backup, bundle).map_err(|restore| {
                    WritingError::RollbackFailed {
                        path: bundle.to_path_buf(),
                        reason: restore.to_string(),
                    }
                })?;
            }
            return Err(io_error(bundle)(e));
        }

        if had_previous {
            if let Err(e) = self.filesystem.remove_dir_all(&backup) {
                warn!(error = %e, path = %backup.display(), "Could not remove previous bundle");
            }
        }
        Ok(())
    }

    /// Write a file unless its current bytes already match.
    fn write_if_changed(&self, file: &RenderedFile) -> PbxResult<()> {
        if self.filesystem.is_file(&file.path)
            && self
                .filesystem
                .read_to_string(&file.path)
                .is_ok_and(|current| current == file.content)
        {
            debug!(path = %file.path.display(), "Unchanged, skipped");
            return Ok(());
        }
        if let Some(parent) = file.path.parent() {
            self.filesystem
                .create_dir_all(parent)
                .map_err(io_error(parent))?;
        }
        self.filesystem
            .write_file(&file.path, &file.content)
            .map_err(io_error(&file.path))
    }

    /// Best-effort removal of a staging directory.
    fn discard(&self, staging: &Path) {
        if let Err(e) = self.filesystem.remove_dir_all(staging) {
            warn!(error = %e, path = %staging.display(), "Could not remove staging directory");
        }
    }
}

fn io_error(path: &Path) -> impl Fn(PbxError) -> PbxError + '_ {
    move |e| {
        WritingError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
        .into()
    }
}
