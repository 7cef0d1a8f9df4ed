//! Generation pipeline - main application orchestrator.
//!
//! 1. Validate the spec
//! 2. Resolve settings, sources, scripts and dependencies per target on a
//!    bounded worker pool
//! 3. Synthesize schemes
//! 4. Build the object graph single-threaded, in target order
//! 5. Write the bundle (separate call, after everything above succeeded)
//!
//! It implements the driving port and uses the driven ports.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::{
    application::{
        error::GenerationError,
        ports::{Filesystem, FrameworkMetadata, PresetLibrary},
        services::{
            cache::{SignatureInput, compute_signature},
            dependencies::DependencyResolver,
            graph_builder::{GraphBuilder, GraphInput, ResolvedTarget},
            schemes::SchemeSynthesizer,
            settings::SettingsResolver,
            sources::{SourceNode, SourceTreeBuilder},
            writer::ProjectWriter,
        },
    },
    domain::{
        AnyTarget, BuildScript, BuildSettings, ObjectGraph, ProjectSpec, ProjectTarget,
        ScriptSource, SpecValidator, ValidationContext,
    },
    error::PbxResult,
};

/// Explicit configuration of one generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Worker pool size for per-target resolution.
    pub jobs: usize,
    /// Fail on prebuilt frameworks missing from disk.
    pub strict: bool,
    /// Version of the running tool, checked against the spec's minimum.
    pub tool_version: semver::Version,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            jobs: std::thread::available_parallelism().map_or(1, |n| n.get()),
            strict: false,
            tool_version: semver::Version::parse(crate::VERSION)
                .unwrap_or_else(|_| semver::Version::new(0, 0, 0)),
        }
    }
}

/// Main generation service.
pub struct Generator {
    filesystem: Box<dyn Filesystem>,
    presets: Box<dyn PresetLibrary>,
    metadata: Box<dyn FrameworkMetadata>,
    options: GeneratorOptions,
}

impl Generator {
    /// Create a generator with the given adapters.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use pbxgen_core::application::{Generator, GeneratorOptions};
    ///
    /// let generator = Generator::new(
    ///     filesystem, // impl Filesystem
    ///     presets,    // impl PresetLibrary
    ///     metadata,   // impl FrameworkMetadata
    ///     GeneratorOptions::default(),
    /// );
    /// ```
    pub fn new(
        filesystem: Box<dyn Filesystem>,
        presets: Box<dyn PresetLibrary>,
        metadata: Box<dyn FrameworkMetadata>,
        options: GeneratorOptions,
    ) -> Self {
        Self {
            filesystem,
            presets,
            metadata,
            options,
        }
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    pub fn filesystem(&self) -> &dyn Filesystem {
        self.filesystem.as_ref()
    }

    /// Resolve a spec into a complete object graph. No graph is returned
    /// unless every stage succeeded.
    #[instrument(skip_all, fields(project = %spec.name, jobs = self.options.jobs))]
    pub fn resolve(&self, spec: &ProjectSpec) -> PbxResult<ObjectGraph> {
        info!(targets = spec.targets.len(), "Resolving project");
        let filesystem = MemoFilesystem::new(self.filesystem.as_ref());

        self.validate(spec, &filesystem)?;
        let (project_settings, targets) = self.resolve_targets(spec, &filesystem)?;

        let sources = SourceTreeBuilder::new(&filesystem, spec);
        let mut file_groups = Vec::new();
        for path in &spec.file_groups {
            file_groups.extend(sources.build_file_group(path)?);
        }

        let schemes = SchemeSynthesizer::new(spec).synthesize_all()?;
        let graph = GraphBuilder::new(spec, &self.options.tool_version).build(GraphInput {
            project_settings,
            targets,
            file_groups,
            schemes,
        })?;

        info!(objects = graph.len(), schemes = graph.schemes.len(), "Project resolved");
        Ok(graph)
    }

    /// Write a resolved graph under `destination`.
    pub fn write(
        &self,
        graph: &ObjectGraph,
        destination: &Path,
        override_existing: bool,
    ) -> PbxResult<()> {
        ProjectWriter::new(self.filesystem.as_ref()).write(graph, destination, override_existing)
    }

    /// Signature over the spec and everything resolved from disk: source
    /// files and tree shape, dependencies, build settings including presets,
    /// and script bodies.
    #[instrument(skip_all, fields(project = %spec.name))]
    pub fn signature(&self, spec: &ProjectSpec) -> PbxResult<String> {
        let filesystem = MemoFilesystem::new(self.filesystem.as_ref());
        let (project_settings, targets) = self.resolve_targets(spec, &filesystem)?;

        let sources = SourceTreeBuilder::new(&filesystem, spec);
        let mut file_groups = Vec::new();
        for path in &spec.file_groups {
            file_groups.extend(sources.build_file_group(path)?);
        }

        let mut files = Vec::new();
        let mut dependencies = Vec::new();
        let mut settings = Vec::new();
        let mut scripts = Vec::new();
        let mut tree = Vec::new();

        push_settings(&mut settings, "project", spec, &project_settings);
        for node in &file_groups {
            push_tree(&mut tree, node);
        }
        for target in &targets {
            files.extend(target.sources.files.iter().map(|f| f.key.path.clone()));
            for root in &target.sources.roots {
                push_tree(&mut tree, root);
            }
            dependencies.extend(
                target
                    .dependencies
                    .iter()
                    .map(|dependency| format!("{}: {dependency:?}", target.name)),
            );
            push_settings(&mut settings, &target.name, spec, &target.settings);
            scripts.extend(
                target
                    .scripts
                    .iter()
                    .enumerate()
                    .map(|(index, body)| format!("{}[{index}]: {body:?}", target.name)),
            );
        }

        let signature = compute_signature(&SignatureInput {
            tool_version: &self.options.tool_version,
            spec,
            files: &files,
            dependencies: &dependencies,
            settings: &settings,
            scripts: &scripts,
            tree: &tree,
        })?;
        debug!(%signature, "Signature computed");
        Ok(signature)
    }

    // -------------------------------------------------------------------------
    // Internal Helpers
    // -------------------------------------------------------------------------

    fn validate(&self, spec: &ProjectSpec, filesystem: &dyn Filesystem) -> PbxResult<()> {
        let path_exists = |path: &Path| filesystem.exists(path);
        let is_preset = |name: &str| self.presets.contains(name);
        SpecValidator::validate(
            spec,
            &ValidationContext {
                tool_version: &self.options.tool_version,
                path_exists: &path_exists,
                is_preset: &is_preset,
            },
        )?;
        debug!("Spec validated");
        Ok(())
    }

    /// Project settings per config and every target's resolution, in
    /// `ProjectSpec::all_targets` order.
    fn resolve_targets(
        &self,
        spec: &ProjectSpec,
        filesystem: &dyn Filesystem,
    ) -> PbxResult<(Vec<BuildSettings>, Vec<ResolvedTarget>)> {
        let settings = SettingsResolver::new(spec, self.presets.as_ref());
        let sources = SourceTreeBuilder::new(filesystem, spec);
        let dependencies =
            DependencyResolver::new(spec, filesystem, self.metadata.as_ref(), self.options.strict);

        let project_settings = spec
            .configs
            .iter()
            .map(|config| settings.project_settings(config))
            .collect::<PbxResult<Vec<_>>>()?;

        let targets: Vec<AnyTarget<'_>> = spec.all_targets().collect();
        let resolved = self.run_pool(targets.len(), |index| {
            let target = targets[index];
            let _span = tracing::debug_span!("target", name = %target.name()).entered();

            let target_settings = spec
                .configs
                .iter()
                .map(|config| settings.target_settings(target, config))
                .collect::<PbxResult<Vec<_>>>()?;
            let scripts = target
                .build_scripts()
                .iter()
                .map(|script| self.script_body(spec, filesystem, script))
                .collect::<PbxResult<Vec<_>>>()?;

            let mut resolved = ResolvedTarget {
                name: target.name().to_string(),
                settings: target_settings,
                scripts,
                ..ResolvedTarget::default()
            };
            if let Some(native) = target.as_native() {
                resolved.sources = sources.build(native)?;
                resolved.dependencies = dependencies.resolve(native)?;
            }
            debug!(
                files = resolved.sources.files.len(),
                dependencies = resolved.dependencies.len(),
                "Target resolved"
            );
            Ok(resolved)
        })?;

        Ok((project_settings, resolved))
    }

    /// Run `work` for `0..count` on the worker pool. Results come back in
    /// index order; on failure the error of the lowest failing index is
    /// returned, whatever order the workers finished in.
    fn run_pool<T, F>(&self, count: usize, work: F) -> PbxResult<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> PbxResult<T> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.jobs.max(1))
            .build()
            .map_err(|e| GenerationError::WorkerPool {
                reason: e.to_string(),
            })?;

        let first_failure = AtomicUsize::new(usize::MAX);
        let results: Vec<Option<PbxResult<T>>> = pool.install(|| {
            (0..count)
                .into_par_iter()
                .map(|index| {
                    // Work past a known failure is skipped; its result is discarded anyway.
                    if index > first_failure.load(Ordering::Acquire) {
                        return None;
                    }
                    let result = work(index);
                    if result.is_err() {
                        first_failure.fetch_min(index, Ordering::AcqRel);
                    }
                    Some(result)
                })
                .collect()
        });

        let mut values = Vec::with_capacity(count);
        for result in results {
            match result {
                Some(Ok(value)) => values.push(value),
                Some(Err(e)) => return Err(e),
                None => {}
            }
        }
        Ok(values)
    }

    fn script_body(
        &self,
        spec: &ProjectSpec,
        filesystem: &dyn Filesystem,
        script: &BuildScript,
    ) -> PbxResult<String> {
        match &script.source {
            ScriptSource::Script(body) => Ok(body.clone()),
            ScriptSource::Path(path) => {
                let path = spec.base_path.join(path);
                filesystem.read_to_string(&path).map_err(|e| {
                    GenerationError::UnreadableScript {
                        path,
                        reason: e.to_string(),
                    }
                    .into()
                })
            }
        }
    }
}

/// `<owner>/<config>: KEY = value` for every resolved setting.
fn push_settings(
    out: &mut Vec<String>,
    owner: &str,
    spec: &ProjectSpec,
    per_config: &[BuildSettings],
) {
    for (config, settings) in spec.configs.iter().zip(per_config) {
        out.extend(
            settings
                .iter()
                .map(|(key, value)| format!("{owner}/{}: {key} = {value:?}", config.name)),
        );
    }
}

/// One line per node of a source tree, with its display name and selected
/// model version.
fn push_tree(out: &mut Vec<String>, root: &SourceNode) {
    out.extend(root.descendants().into_iter().map(|node| {
        format!(
            "{:?} {} name={:?} current={:?}",
            node.kind,
            node.path.display(),
            node.name,
            node.current_version,
        )
    }));
}

// ── Directory memo ───────────────────────────────────────────────────────────

/// Memoizes existence checks for the length of one run.
///
/// Reads share the lock; inserts take it exclusively. Dropped with the run,
/// so nothing is remembered across runs. Writes go straight through and
/// forget what they touch.
struct MemoFilesystem<'a> {
    inner: &'a dyn Filesystem,
    kinds: RwLock<HashMap<PathBuf, EntryKind>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Dir,
    File,
    Missing,
}

impl<'a> MemoFilesystem<'a> {
    fn new(inner: &'a dyn Filesystem) -> Self {
        Self {
            inner,
            kinds: RwLock::new(HashMap::new()),
        }
    }

    fn kind(&self, path: &Path) -> EntryKind {
        if let Ok(kinds) = self.kinds.read() {
            if let Some(kind) = kinds.get(path) {
                return *kind;
            }
        }
        let kind = if self.inner.is_dir(path) {
            EntryKind::Dir
        } else if self.inner.is_file(path) {
            EntryKind::File
        } else {
            EntryKind::Missing
        };
        if let Ok(mut kinds) = self.kinds.write() {
            kinds.insert(path.to_path_buf(), kind);
        }
        kind
    }

    fn forget(&self, path: &Path) {
        if let Ok(mut kinds) = self.kinds.write() {
            kinds.retain(|known, _| !known.starts_with(path) && !path.starts_with(known));
        }
    }
}

impl Filesystem for MemoFilesystem<'_> {
    fn read_dir(&self, path: &Path) -> PbxResult<Vec<String>> {
        self.inner.read_dir(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.kind(path) == EntryKind::Dir
    }

    fn is_file(&self, path: &Path) -> bool {
        self.kind(path) == EntryKind::File
    }

    fn exists(&self, path: &Path) -> bool {
        self.kind(path) != EntryKind::Missing
    }

    fn read_to_string(&self, path: &Path) -> PbxResult<String> {
        self.inner.read_to_string(path)
    }

    fn create_dir_all(&self, path: &Path) -> PbxResult<()> {
        self.forget(path);
        self.inner.create_dir_all(path)
    }

    fn write_file(&self, path: &Path, content: &str) -> PbxResult<()> {
        self.forget(path);
        self.inner.write_file(path, content)
    }

    fn rename(&self, from: &Path, to: &Path) -> PbxResult<()> {
        self.forget(from);
        self.forget(to);
        self.inner.rename(from, to)
    }

    fn remove_dir_all(&self, path: &Path) -> PbxResult<()> {
        self.forget(path);
        self.inner.remove_dir_all(path)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::application::ports::PresetKey;
    use crate::application::services::test_support::TreeFs;
    use crate::domain::{
        Dependency, Platform, ProductType, ScriptTiming, Settings, Target, TargetSource,
    };
    use crate::error::PbxError;

    struct NoPresets;

    impl PresetLibrary for NoPresets {
        fn preset(&self, _: PresetKey<'_>) -> Option<Settings> {
            None
        }
    }

    struct NoMetadata;

    impl FrameworkMetadata for NoMetadata {
        fn related_frameworks(&self, _: &Path, _: &str, _: Platform) -> Option<Vec<String>> {
            None
        }
    }

    /// Shares one tree between the generator and the test.
    struct Shared(Arc<TreeFs>);

    impl Filesystem for Shared {
        fn read_dir(&self, path: &Path) -> PbxResult<Vec<String>> {
            self.0.read_dir(path)
        }
        fn is_dir(&self, path: &Path) -> bool {
            self.0.is_dir(path)
        }
        fn is_file(&self, path: &Path) -> bool {
            self.0.is_file(path)
        }
        fn exists(&self, path: &Path) -> bool {
            self.0.exists(path)
        }
        fn read_to_string(&self, path: &Path) -> PbxResult<String> {
            self.0.read_to_string(path)
        }
        fn create_dir_all(&self, path: &Path) -> PbxResult<()> {
            self.0.create_dir_all(path)
        }
        fn write_file(&self, path: &Path, content: &str) -> PbxResult<()> {
            self.0.write_file(path, content)
        }
        fn rename(&self, from: &Path, to: &Path) -> PbxResult<()> {
            self.0.rename(from, to)
        }
        fn remove_dir_all(&self, path: &Path) -> PbxResult<()> {
            self.0.remove_dir_all(path)
        }
    }

    /// Same preset for every key.
    struct FixedPreset(Settings);

    impl PresetLibrary for FixedPreset {
        fn preset(&self, _: PresetKey<'_>) -> Option<Settings> {
            Some(self.0.clone())
        }
    }

    /// Frameworks bundled with the prebuilt `Kit`.
    struct KitBundles(Vec<String>);

    impl FrameworkMetadata for KitBundles {
        fn related_frameworks(&self, _: &Path, reference: &str, _: Platform) -> Option<Vec<String>> {
            (reference == "Kit").then(|| self.0.clone())
        }
    }

    fn generator(tree: &Arc<TreeFs>, jobs: usize) -> Generator {
        let mut generator = generator_with(tree, Box::new(NoPresets), Box::new(NoMetadata));
        generator.options.jobs = jobs;
        generator
    }

    fn generator_with(
        tree: &Arc<TreeFs>,
        presets: Box<dyn PresetLibrary>,
        metadata: Box<dyn FrameworkMetadata>,
    ) -> Generator {
        Generator::new(
            Box::new(Shared(Arc::clone(tree))),
            presets,
            metadata,
            GeneratorOptions {
                jobs: 2,
                strict: false,
                tool_version: semver::Version::new(1, 5, 0),
            },
        )
    }

    fn spec() -> ProjectSpec {
        ProjectSpec::new("Demo", "/p")
            .with_target(
                Target::new("App", ProductType::Application, Platform::Ios)
                    .with_source("App")
                    .with_dependency(Dependency::target("Core")),
            )
            .with_target(
                Target::new("Core", ProductType::Framework, Platform::Ios).with_source("Core"),
            )
    }

    fn tree() -> Arc<TreeFs> {
        Arc::new(TreeFs::with_files(&[
            "/p/App/AppDelegate.swift",
            "/p/App/View.swift",
            "/p/Core/Model.swift",
        ]))
    }

    #[test]
    fn worker_count_does_not_change_output() {
        let tree = tree();
        let one = generator(&tree, 1).resolve(&spec()).unwrap();
        let many = generator(&tree, 8).resolve(&spec()).unwrap();
        assert_eq!(one, many);
    }

    #[test]
    fn lowest_failing_target_is_reported() {
        let tree = Arc::new(TreeFs::default());
        let mut spec = ProjectSpec::new("Demo", "/p");
        for name in ["A", "B", "C"] {
            spec.targets.push(
                Target::new(name, ProductType::Framework, Platform::Ios)
                    .with_build_script(BuildScript {
                        source: ScriptSource::Path(format!("{name}.sh")),
                        ..BuildScript::inline("", ScriptTiming::PreBuild)
                    }),
            );
        }

        for jobs in [1, 4] {
            let err = generator(&tree, jobs).resolve(&spec).unwrap_err();
            let PbxError::Application(error) = err else {
                panic!("unexpected error: {err:?}");
            };
            assert!(error.to_string().contains("/p/A.sh"), "{error}");
        }
    }

    #[test]
    fn validation_runs_first() {
        let tree = tree();
        let spec = ProjectSpec::new("Demo", "/p").with_target(
            Target::new("App", ProductType::Application, Platform::Ios)
                .with_dependency(Dependency::target("Ghost")),
        );
        let err = generator(&tree, 2).resolve(&spec).unwrap_err();
        assert!(matches!(err, PbxError::Domain(_)), "{err:?}");
    }

    #[test]
    fn optional_missing_source_is_fine() {
        let tree = tree();
        let mut source = TargetSource::new("Generated");
        source.optional = true;
        let mut spec = spec();
        spec.targets[1].sources.push(source);
        assert!(generator(&tree, 2).resolve(&spec).is_ok());
    }

    #[test]
    fn signature_is_stable_and_tracks_files() {
        let tree = tree();
        let generator = generator(&tree, 4);
        let first = generator.signature(&spec()).unwrap();
        assert_eq!(first, generator.signature(&spec()).unwrap());

        tree.add_file("/p/Core/Extra.swift", "");
        assert_ne!(first, generator.signature(&spec()).unwrap());
    }

    #[test]
    fn signature_tracks_script_files() {
        let tree = tree();
        tree.add_file("/p/run.sh", "echo a");
        let mut spec = spec();
        spec.targets[0] = spec.targets[0].clone().with_build_script(BuildScript {
            source: ScriptSource::Path("run.sh".into()),
            ..BuildScript::inline("", ScriptTiming::PreBuild)
        });
        let generator = generator(&tree, 2);
        let (signature, graph) = (
            generator.signature(&spec).unwrap(),
            generator.resolve(&spec).unwrap(),
        );

        tree.add_file("/p/run.sh", "echo b");
        assert_ne!(graph, generator.resolve(&spec).unwrap());
        assert_ne!(signature, generator.signature(&spec).unwrap());
    }

    #[test]
    fn signature_tracks_presets() {
        let tree = tree();
        let preset = |version: &str| {
            Box::new(FixedPreset(Settings::new().with_setting("SWIFT_VERSION", version)))
        };
        let old = generator_with(&tree, preset("5.0"), Box::new(NoMetadata));
        let new = generator_with(&tree, preset("6.0"), Box::new(NoMetadata));

        assert_ne!(old.resolve(&spec()).unwrap(), new.resolve(&spec()).unwrap());
        assert_ne!(old.signature(&spec()).unwrap(), new.signature(&spec()).unwrap());
    }

    #[test]
    fn signature_tracks_current_model_version() {
        let tree = tree();
        tree.add_file("/p/Core/Model.xcdatamodeld/Model 1.xcdatamodel/contents", "");
        tree.add_file("/p/Core/Model.xcdatamodeld/Model 2.xcdatamodel/contents", "");
        let generator = generator(&tree, 2);
        let signature = generator.signature(&spec()).unwrap();

        tree.add_file(
            "/p/Core/Model.xcdatamodeld/.xccurrentversion",
            "<plist><dict><key>_XCCurrentVersionName</key>\n<string>Model 1.xcdatamodel</string></dict></plist>",
        );
        assert_ne!(signature, generator.signature(&spec()).unwrap());
    }

    #[test]
    fn signature_tracks_dependency_resolution() {
        let tree = tree();
        let mut kit = Dependency::prebuilt("Kit");
        if let crate::domain::DependencyKind::Prebuilt { find_related, .. } = &mut kit.kind {
            *find_related = Some(true);
        }
        let mut spec = spec();
        spec.targets[0] = spec.targets[0].clone().with_dependency(kit);

        let alone = generator_with(&tree, Box::new(NoPresets), Box::new(KitBundles(vec![])));
        let bundled = generator_with(
            &tree,
            Box::new(NoPresets),
            Box::new(KitBundles(vec!["KitCore".into()])),
        );
        assert_ne!(
            alone.signature(&spec).unwrap(),
            bundled.signature(&spec).unwrap()
        );
    }

    #[test]
    fn resolve_then_write() {
        let tree = tree();
        let generator = generator(&tree, 2);
        let graph = generator.resolve(&spec()).unwrap();
        generator.write(&graph, Path::new("/p"), false).unwrap();

        assert!(tree.is_file(Path::new("/p/Demo.xcodeproj/project.pbxproj")));
        assert!(tree.is_file(Path::new("/p/App/Info.plist")));
        assert!(tree.is_file(Path::new("/p/Core/Info.plist")));
    }

    #[test]
    fn memo_forgets_written_paths() {
        let tree = TreeFs::default();
        let memo = MemoFilesystem::new(&tree);
        assert!(!memo.exists(Path::new("/x/a.txt")));
        memo.write_file(Path::new("/x/a.txt"), "a").unwrap();
        assert!(memo.is_file(Path::new("/x/a.txt")));
    }
}
