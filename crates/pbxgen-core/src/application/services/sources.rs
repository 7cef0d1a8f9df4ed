//! Source tree builder: walks a target's source entries into a node tree and
//! a flat list of classified files.
//!
//! Paths in the output are absolute (joined onto the spec's base path). Node
//! identity is `(kind, path)`; the graph builder merges equal nodes across
//! targets, so a file reached twice is still one file reference.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::{
    application::{
        error::GenerationError,
        ports::Filesystem,
        services::{
            glob::{BLACKLISTED_DIRECTORIES, ExcludeFilter, GlobWalker},
            ordering::natural_cmp,
        },
    },
    domain::{
        BuildPhase, GlobBehavior, HeaderVisibility, ProjectSpec, SourceType, SpecOptions, Target,
        TargetSource, capabilities,
    },
    error::{PbxError, PbxResult},
};

/// File names never picked up by a directory walk.
const IGNORED_FILE_NAMES: &[&str] = &[".DS_Store"];
/// Extensions never picked up by a directory walk.
const IGNORED_EXTENSIONS: &[&str] = &["orig"];
/// Variant bases whose translations are `.strings` files of the same stem.
const STRINGS_BACKED_EXTENSIONS: &[&str] = &["storyboard", "xib", "intentdefinition"];
const BASE_LOCALE: &str = "Base";
const CURRENT_VERSION_FILE: &str = ".xccurrentversion";
const CURRENT_VERSION_KEY: &str = "_XCCurrentVersionName";

// ── Output types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceNodeKind {
    Group,
    File,
    FolderReference,
    VariantGroup,
    VersionGroup,
}

/// Identity of a node across targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub kind: SourceNodeKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceNode {
    pub kind: SourceNodeKind,
    /// Absolute path. A variant group's path is `<directory>/<name>`.
    pub path: PathBuf,
    /// Display name overriding the last path component.
    pub name: Option<String>,
    pub children: Vec<SourceNode>,
    /// Selected model of a version group.
    pub current_version: Option<PathBuf>,
}

impl SourceNode {
    fn new(kind: SourceNodeKind, path: PathBuf) -> Self {
        Self {
            kind,
            path,
            name: None,
            children: Vec::new(),
            current_version: None,
        }
    }

    pub fn key(&self) -> NodeKey {
        NodeKey {
            kind: self.kind,
            path: self.path.clone(),
        }
    }

    pub fn file_name(&self) -> String {
        file_name(&self.path)
    }

    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.file_name())
    }

    pub fn is_group(&self) -> bool {
        matches!(
            self.kind,
            SourceNodeKind::Group | SourceNodeKind::VariantGroup | SourceNodeKind::VersionGroup
        )
    }

    /// Every node in this subtree, parents before children.
    pub fn descendants(&self) -> Vec<&SourceNode> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.descendants());
        }
        out
    }
}

/// A file (or variant/version group) and its build-phase classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub key: NodeKey,
    /// `None` keeps the file out of every phase.
    pub phase: Option<BuildPhase>,
    pub compiler_flags: Vec<String>,
    pub header_visibility: HeaderVisibility,
}

/// Everything discovered for one target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TargetSources {
    pub target: String,
    /// One root per declared source entry, in declared order.
    pub roots: Vec<SourceNode>,
    /// De-duplicated by node, first declaration wins.
    pub files: Vec<SourceFile>,
    /// Locales of every localized directory found.
    pub locales: BTreeSet<String>,
}

impl TargetSources {
    pub fn files_in(&self, phase: BuildPhase) -> impl Iterator<Item = &SourceFile> {
        self.files.iter().filter(move |f| f.phase == Some(phase))
    }
}

// ── Builder ──────────────────────────────────────────────────────────────────

/// State of one source entry's walk.
struct Walk<'w> {
    source: &'w TargetSource,
    root: PathBuf,
    excludes: ExcludeFilter,
    includes: Option<BTreeSet<PathBuf>>,
    walker: GlobWalker<'w>,
    files: Vec<SourceFile>,
    locales: BTreeSet<String>,
}

impl Walk<'_> {
    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    fn is_included(&self, path: &Path, is_dir: bool) -> bool {
        let Some(includes) = &self.includes else {
            return true;
        };
        includes.contains(path)
            || path
                .ancestors()
                .skip(1)
                .take_while(|a| a.starts_with(&self.root))
                .any(|a| includes.contains(a))
            || (is_dir && includes.iter().any(|p| p.starts_with(path)))
    }

    fn phase_for(&self, name: &str) -> Option<BuildPhase> {
        match self.source.build_phase {
            Some(explicit) => explicit.phase(),
            None if self.source.source_type == Some(SourceType::Folder) => {
                Some(BuildPhase::Resources)
            }
            None => capabilities::default_phase(name, extension(name)),
        }
    }

    fn register(&mut self, key: NodeKey, classify_as: &str) {
        let phase = self.phase_for(classify_as);
        self.files.push(SourceFile {
            key,
            phase,
            compiler_flags: self.source.compiler_flags.clone(),
            header_visibility: self.source.header_visibility,
        });
    }
}

pub struct SourceTreeBuilder<'a> {
    fs: &'a dyn Filesystem,
    base_path: &'a Path,
    options: &'a SpecOptions,
    /// Declaration files the writer will produce. They are listed whether or
    /// not they exist yet, so a second run sees the same tree as the first.
    generated: BTreeSet<PathBuf>,
}

impl<'a> SourceTreeBuilder<'a> {
    pub fn new(fs: &'a dyn Filesystem, spec: &'a ProjectSpec) -> Self {
        let generated = spec
            .targets
            .iter()
            .filter(|t| capabilities::needs_info_plist(t.product_type) || t.info.is_some())
            .map(|t| spec.base_path.join(t.info_plist_path()))
            .collect();
        Self {
            fs,
            base_path: &spec.base_path,
            options: &spec.options,
            generated,
        }
    }

    /// Discover the sources of one target.
    #[instrument(skip_all, fields(target = %target.name))]
    pub fn build(&self, target: &Target) -> PbxResult<TargetSources> {
        let mut out = TargetSources {
            target: target.name.clone(),
            ..TargetSources::default()
        };
        let mut seen = HashSet::new();

        for source in &target.sources {
            let Some((root, walk)) = self.walk_entry(source)? else {
                continue;
            };
            out.roots.push(root);
            out.locales.extend(walk.locales);
            for file in walk.files {
                if seen.insert(file.key.clone()) {
                    out.files.push(file);
                }
            }
        }

        debug!(
            roots = out.roots.len(),
            files = out.files.len(),
            "Sources discovered"
        );
        Ok(out)
    }

    /// Node tree of a file group. Files join no phase.
    pub fn build_file_group(&self, path: &str) -> PbxResult<Option<SourceNode>> {
        let source = TargetSource::new(path);
        Ok(self.walk_entry(&source)?.map(|(root, _)| root))
    }

    fn walk_entry<'s>(&'s self, source: &'s TargetSource) -> PbxResult<Option<(SourceNode, Walk<'s>)>> {
        let root = self.base_path.join(source.normalized_path());
        if !self.fs.exists(&root) {
            if source.optional {
                debug!(path = %root.display(), "Skipping missing optional source");
                return Ok(None);
            }
            return Err(GenerationError::UnreadablePath {
                path: root,
                reason: "path does not exist".into(),
            }
            .into());
        }

        let behavior: GlobBehavior = self.options.glob_behavior;
        let mut walk = Walk {
            source,
            root: root.clone(),
            excludes: ExcludeFilter::new(&source.excludes),
            includes: None,
            walker: GlobWalker::new(self.fs, behavior),
            files: Vec::new(),
            locales: BTreeSet::new(),
        };
        if !source.includes.is_empty() {
            let mut included = BTreeSet::new();
            for pattern in &source.includes {
                included.extend(walk.walker.expand(&root, pattern)?);
            }
            walk.includes = Some(included);
        }

        let is_dir = walk.walker.is_dir(&root)?;
        let name = file_name(&root);
        let ext = extension(&name);

        let mut node = match source.source_type {
            Some(SourceType::Folder) => {
                let node = SourceNode::new(SourceNodeKind::FolderReference, root.clone());
                walk.register(node.key(), &name);
                node
            }
            Some(SourceType::Group) if is_dir => self.walk_directory(&mut walk, &root)?.unwrap_or_else(
                || SourceNode::new(SourceNodeKind::Group, root.clone()),
            ),
            Some(SourceType::File) => self.leaf(&mut walk, &root, is_dir)?,
            _ if is_dir && !ext.is_some_and(capabilities::is_opaque_directory) => self
                .walk_directory(&mut walk, &root)?
                .unwrap_or_else(|| SourceNode::new(SourceNodeKind::Group, root.clone())),
            _ => self.leaf(&mut walk, &root, is_dir)?,
        };
        node.name = source.name.clone();
        Ok(Some((node, walk)))
    }

    fn read_sorted(&self, dir: &Path) -> PbxResult<Vec<String>> {
        let mut names = self.fs.read_dir(dir).map_err(|e| unreadable(dir, e))?;
        for path in &self.generated {
            if path.parent() == Some(dir) {
                names.extend(path.file_name().map(|n| n.to_string_lossy().into_owned()));
            }
        }
        names.sort_by(|a, b| natural_cmp(a, b));
        names.dedup();
        Ok(names)
    }

    /// Group node for `dir`, or `None` when nothing inside was included and
    /// empty directories are not kept.
    fn walk_directory(&self, walk: &mut Walk<'_>, dir: &Path) -> PbxResult<Option<SourceNode>> {
        let mut children = Vec::new();
        let mut localized = Vec::new();

        for name in self.read_sorted(dir)? {
            if IGNORED_FILE_NAMES.contains(&name.as_str())
                || extension(&name).is_some_and(|e| IGNORED_EXTENSIONS.contains(&e))
            {
                continue;
            }
            let path = dir.join(&name);
            let is_dir = walk.walker.is_dir(&path)?;
            if is_dir && BLACKLISTED_DIRECTORIES.contains(&name.as_str()) {
                continue;
            }
            if walk.excludes.is_excluded(&walk.relative(&path), is_dir)
                || !walk.is_included(&path, is_dir)
            {
                continue;
            }

            let ext = extension(&name);
            if is_dir && ext == Some("lproj") {
                localized.push(path);
            } else if is_dir && !ext.is_some_and(capabilities::is_opaque_directory) {
                if let Some(group) = self.walk_directory(walk, &path)? {
                    children.push(group);
                }
            } else {
                children.push(self.leaf(walk, &path, is_dir)?);
            }
        }

        children.extend(self.variant_groups(walk, dir, &localized)?);

        if children.is_empty() && !self.options.generate_empty_directories {
            return Ok(None);
        }
        let mut group = SourceNode::new(SourceNodeKind::Group, dir.to_path_buf());
        group.children = children;
        Ok(Some(group))
    }

    fn leaf(&self, walk: &mut Walk<'_>, path: &Path, is_dir: bool) -> PbxResult<SourceNode> {
        let name = file_name(path);
        let node = if is_dir && extension(&name) == Some("xcdatamodeld") {
            self.version_group(path)?
        } else {
            SourceNode::new(SourceNodeKind::File, path.to_path_buf())
        };
        walk.register(node.key(), &name);
        Ok(node)
    }

    fn version_group(&self, path: &Path) -> PbxResult<SourceNode> {
        let mut group = SourceNode::new(SourceNodeKind::VersionGroup, path.to_path_buf());
        for name in self.read_sorted(path)? {
            if extension(&name) == Some("xcdatamodel") {
                group
                    .children
                    .push(SourceNode::new(SourceNodeKind::File, path.join(&name)));
            }
        }

        let marker = path.join(CURRENT_VERSION_FILE);
        let declared = if self.fs.is_file(&marker) {
            self.fs
                .read_to_string(&marker)
                .ok()
                .and_then(|content| plist_string(&content, CURRENT_VERSION_KEY))
        } else {
            None
        };

        group.current_version = declared
            .map(|name| path.join(name))
            .filter(|current| group.children.iter().any(|c| &c.path == current))
            .or_else(|| group.children.last().map(|c| c.path.clone()));
        Ok(group)
    }

    /// Coalesce the files of `xx.lproj` directories under `dir` into variant
    /// groups, seeded by `Base.lproj`.
    fn variant_groups(
        &self,
        walk: &mut Walk<'_>,
        dir: &Path,
        localized: &[PathBuf],
    ) -> PbxResult<Vec<SourceNode>> {
        let mut ordered: Vec<&PathBuf> = localized.iter().collect();
        ordered.sort_by_key(|p| (locale_of(p) != BASE_LOCALE, locale_of(p)));

        let mut groups: Vec<SourceNode> = Vec::new();
        for lproj in ordered {
            let locale = locale_of(lproj);
            walk.locales.insert(locale.clone());

            for name in self.read_sorted(lproj)? {
                if IGNORED_FILE_NAMES.contains(&name.as_str()) {
                    continue;
                }
                let path = lproj.join(&name);
                let is_dir = walk.walker.is_dir(&path)?;
                if is_dir && !extension(&name).is_some_and(capabilities::is_opaque_directory) {
                    continue;
                }
                if walk.excludes.is_excluded(&walk.relative(&path), is_dir)
                    || !walk.is_included(&path, is_dir)
                {
                    continue;
                }

                let mut child = SourceNode::new(SourceNodeKind::File, path);
                child.name = Some(locale.clone());
                match groups
                    .iter_mut()
                    .find(|g| is_translation_of(&g.file_name(), &name))
                {
                    Some(group) => group.children.push(child),
                    None => {
                        let mut group =
                            SourceNode::new(SourceNodeKind::VariantGroup, dir.join(&name));
                        group.children.push(child);
                        groups.push(group);
                    }
                }
            }
        }

        let development = self.options.development_language();
        for group in &mut groups {
            group.children.sort_by_key(|c| {
                let locale = c.name.clone().unwrap_or_default();
                (locale != BASE_LOCALE, locale != development, locale)
            });
            walk.register(group.key(), &group.file_name());
        }
        Ok(groups)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn unreadable(path: &Path, error: PbxError) -> PbxError {
    GenerationError::UnreadablePath {
        path: path.to_path_buf(),
        reason: error.to_string(),
    }
    .into()
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

pub(crate) fn extension(name: &str) -> Option<&str> {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

fn stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

fn locale_of(lproj: &Path) -> String {
    stem(&file_name(lproj)).to_string()
}

/// Whether `file` in a locale directory belongs to the variant group `group`.
fn is_translation_of(group: &str, file: &str) -> bool {
    group == file
        || (extension(file) == Some("strings")
            && stem(group) == stem(file)
            && extension(group).is_some_and(|e| STRINGS_BACKED_EXTENSIONS.contains(&e)))
}

/// Value of a `<string>` entry following `<key>key</key>` in an XML plist.
fn plist_string(content: &str, key: &str) -> Option<String> {
    let marker = format!("<key>{key}</key>");
    let after_key = &content[content.find(&marker)? + marker.len()..];
    let start = after_key.find("<string>")? + "<string>".len();
    let end = after_key[start..].find("</string>")? + start;
    Some(after_key[start..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::TreeFs;
    use crate::domain::{BuildPhaseOverride, Platform, ProductType};

    fn spec() -> ProjectSpec {
        ProjectSpec::new("Demo", "/p")
    }

    fn target(sources: Vec<TargetSource>) -> Target {
        let mut target = Target::new("App", ProductType::Application, Platform::Ios);
        target.sources = sources;
        target
    }

    fn relative_files(sources: &TargetSources, root: &str) -> Vec<String> {
        sources
            .files
            .iter()
            .map(|f| {
                f.key
                    .path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }

    #[test]
    fn excluded_names_are_dropped_at_every_depth() {
        let fs = TreeFs::with_files(&[
            "/p/Sources/A/a.swift",
            "/p/Sources/A/B/b.swift",
            "/p/Sources/B/b.swift",
        ]);
        let spec = spec();
        let builder = SourceTreeBuilder::new(&fs, &spec);
        let sources = builder
            .build(&target(vec![TargetSource::new("Sources").with_excludes(["B"])]))
            .unwrap();

        assert_eq!(relative_files(&sources, "/p/Sources"), vec!["A/a.swift"]);
    }

    #[test]
    fn files_are_classified_by_extension() {
        let fs = TreeFs::with_files(&[
            "/p/S/main.swift",
            "/p/S/Bridge.h",
            "/p/S/Info.plist",
            "/p/S/Config.xcconfig",
            "/p/S/logo.png",
            "/p/S/.DS_Store",
            "/p/S/old.swift.orig",
        ]);
        let spec = spec();
        let sources = SourceTreeBuilder::new(&fs, &spec)
            .build(&target(vec!["S".into()]))
            .unwrap();

        let phase_of = |name: &str| {
            sources
                .files
                .iter()
                .find(|f| f.key.path.ends_with(name))
                .map(|f| f.phase)
        };
        assert_eq!(phase_of("main.swift"), Some(Some(BuildPhase::Sources)));
        assert_eq!(phase_of("Bridge.h"), Some(Some(BuildPhase::Headers)));
        assert_eq!(phase_of("logo.png"), Some(Some(BuildPhase::Resources)));
        assert_eq!(phase_of("Info.plist"), Some(None));
        assert_eq!(phase_of("Config.xcconfig"), Some(None));
        assert_eq!(phase_of(".DS_Store"), None);
        assert_eq!(phase_of("old.swift.orig"), None);
    }

    #[test]
    fn explicit_none_phase_excludes_from_all_phases() {
        let fs = TreeFs::with_files(&["/p/Scripts/run.swift"]);
        let spec = spec();
        let sources = SourceTreeBuilder::new(&fs, &spec)
            .build(&target(vec![
                TargetSource::new("Scripts").with_build_phase(BuildPhaseOverride::None),
            ]))
            .unwrap();
        assert_eq!(sources.files.len(), 1);
        assert_eq!(sources.files[0].phase, None);
    }

    #[test]
    fn duplicate_declarations_collapse() {
        let fs = TreeFs::with_files(&["/p/App/main.swift"]);
        let spec = spec();
        let sources = SourceTreeBuilder::new(&fs, &spec)
            .build(&target(vec!["App/main.swift".into(), "App/main.swift".into()]))
            .unwrap();
        assert_eq!(sources.files_in(BuildPhase::Sources).count(), 1);
    }

    #[test]
    fn opaque_directories_are_single_references() {
        let fs = TreeFs::with_files(&[
            "/p/R/Assets.xcassets/AppIcon.appiconset/Contents.json",
            "/p/R/Vendor.framework/Vendor",
        ]);
        let spec = spec();
        let sources = SourceTreeBuilder::new(&fs, &spec)
            .build(&target(vec!["R".into()]))
            .unwrap();

        let root = &sources.roots[0];
        assert_eq!(root.children.len(), 2);
        assert!(root.children.iter().all(|c| c.kind == SourceNodeKind::File));
        assert_eq!(
            sources.files.iter().map(|f| f.phase).collect::<Vec<_>>(),
            vec![Some(BuildPhase::Resources), Some(BuildPhase::Frameworks)]
        );
    }

    #[test]
    fn folder_references_go_to_resources() {
        let fs = TreeFs::with_files(&["/p/Web/index.html"]);
        let spec = spec();
        let sources = SourceTreeBuilder::new(&fs, &spec)
            .build(&target(vec![TargetSource::new("Web").with_type(SourceType::Folder)]))
            .unwrap();
        assert_eq!(sources.roots[0].kind, SourceNodeKind::FolderReference);
        assert_eq!(sources.files[0].phase, Some(BuildPhase::Resources));
    }

    #[test]
    fn localized_files_become_variant_groups() {
        let fs = TreeFs::with_files(&[
            "/p/UI/Base.lproj/Main.storyboard",
            "/p/UI/en.lproj/Main.strings",
            "/p/UI/fr.lproj/Main.strings",
            "/p/UI/fr.lproj/Localizable.strings",
        ]);
        let spec = spec();
        let sources = SourceTreeBuilder::new(&fs, &spec)
            .build(&target(vec!["UI".into()]))
            .unwrap();

        let root = &sources.roots[0];
        let names: Vec<_> = root.children.iter().map(|c| c.file_name()).collect();
        assert_eq!(names, vec!["Main.storyboard", "Localizable.strings"]);

        let main = &root.children[0];
        assert_eq!(main.kind, SourceNodeKind::VariantGroup);
        let locales: Vec<_> = main.children.iter().map(|c| c.display_name()).collect();
        assert_eq!(locales, vec!["Base", "en", "fr"]);

        assert_eq!(
            sources.locales.iter().cloned().collect::<Vec<_>>(),
            vec!["Base", "en", "fr"]
        );
        assert_eq!(sources.files.len(), 2);
        assert!(sources.files.iter().all(|f| f.key.kind == SourceNodeKind::VariantGroup));
    }

    #[test]
    fn version_group_reads_current_version_marker() {
        let fs = TreeFs::with_files(&[
            "/p/M/Model.xcdatamodeld/Model 2.xcdatamodel/contents",
            "/p/M/Model.xcdatamodeld/Model 10.xcdatamodel/contents",
            "/p/M/Model.xcdatamodeld/Model 1.xcdatamodel/contents",
        ]);
        let spec = spec();
        let builder = SourceTreeBuilder::new(&fs, &spec);

        let sources = builder.build(&target(vec!["M".into()])).unwrap();
        let group = &sources.roots[0].children[0];
        assert_eq!(group.kind, SourceNodeKind::VersionGroup);
        assert_eq!(
            group.current_version.as_deref(),
            Some(Path::new("/p/M/Model.xcdatamodeld/Model 10.xcdatamodel"))
        );

        fs.add_file(
            "/p/M/Model.xcdatamodeld/.xccurrentversion",
            "<plist><dict><key>_XCCurrentVersionName</key>\n<string>Model 2.xcdatamodel</string></dict></plist>",
        );
        let sources = builder.build(&target(vec!["M".into()])).unwrap();
        assert_eq!(
            sources.roots[0].children[0].current_version.as_deref(),
            Some(Path::new("/p/M/Model.xcdatamodeld/Model 2.xcdatamodel"))
        );
    }

    #[test]
    fn includes_restrict_the_walk() {
        let fs = TreeFs::with_files(&[
            "/p/S/a.swift",
            "/p/S/Sub/b.swift",
            "/p/S/Sub/c.m",
        ]);
        let spec = spec();
        let sources = SourceTreeBuilder::new(&fs, &spec)
            .build(&target(vec![TargetSource::new("S").with_includes(["**/*.swift"])]))
            .unwrap();
        assert_eq!(relative_files(&sources, "/p/S"), vec!["a.swift", "Sub/b.swift"]);
    }

    #[test]
    fn empty_directories_are_dropped_unless_requested() {
        let fs = TreeFs::with_files(&["/p/S/a.swift"]);
        fs.add_dir("/p/S/Empty");
        let mut spec = spec();
        let sources = SourceTreeBuilder::new(&fs, &spec)
            .build(&target(vec!["S".into()]))
            .unwrap();
        assert_eq!(sources.roots[0].children.len(), 1);

        spec.options.generate_empty_directories = true;
        let sources = SourceTreeBuilder::new(&fs, &spec)
            .build(&target(vec!["S".into()]))
            .unwrap();
        assert_eq!(sources.roots[0].children.len(), 2);
    }

    #[test]
    fn missing_paths_fail_unless_optional() {
        let fs = TreeFs::with_files(&["/p/S/a.swift"]);
        let spec = spec();
        let builder = SourceTreeBuilder::new(&fs, &spec);

        let err = builder.build(&target(vec!["Gone".into()])).unwrap_err();
        assert!(err.to_string().contains("/p/Gone"));

        let mut optional = TargetSource::new("Gone");
        optional.optional = true;
        let sources = builder.build(&target(vec![optional])).unwrap();
        assert!(sources.roots.is_empty());
    }

    #[test]
    fn blacklisted_directories_are_skipped() {
        let fs = TreeFs::with_files(&["/p/S/a.swift", "/p/S/node_modules/x/index.js"]);
        let spec = spec();
        let sources = SourceTreeBuilder::new(&fs, &spec)
            .build(&target(vec!["S".into()]))
            .unwrap();
        assert_eq!(relative_files(&sources, "/p/S"), vec!["a.swift"]);
    }

    #[test]
    fn plist_string_extraction() {
        let content = "<dict>\n\t<key>_XCCurrentVersionName</key>\n\t<string>V3.xcdatamodel</string>\n</dict>";
        assert_eq!(
            plist_string(content, "_XCCurrentVersionName").as_deref(),
            Some("V3.xcdatamodel")
        );
        assert_eq!(plist_string(content, "Other"), None);
    }

    #[test]
    fn pending_declaration_is_listed_once() {
        let app = target(vec!["App".into()]);
        let spec = spec().with_target(app.clone());

        let before = TreeFs::with_files(&["/p/App/a.swift"]);
        let after = TreeFs::with_files(&["/p/App/a.swift", "/p/App/Info.plist"]);
        let first = SourceTreeBuilder::new(&before, &spec).build(&app).unwrap();
        let second = SourceTreeBuilder::new(&after, &spec).build(&app).unwrap();

        assert_eq!(first, second);
        assert_eq!(relative_files(&first, "/p/App"), vec!["a.swift", "Info.plist"]);
    }
}
