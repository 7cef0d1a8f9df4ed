//! Object graph builder.
//!
//! Runs single-threaded over the per-target results in target order, so the
//! identifiers and the ordering of every list depend only on the spec and the
//! filesystem, never on how the worker pool scheduled targets.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, instrument};

use crate::{
    application::{
        error::GenerationError,
        services::{
            dependencies::{ResolvedDependency, ResolvedKind},
            identifiers::IdAllocator,
            ordering::{GroupChild, apply_group_ordering, sort_children},
            sources::{NodeKey, SourceNode, SourceNodeKind, TargetSources, extension, file_name},
        },
    },
    domain::{
        AggregateTarget, AnyTarget, BuildPhase, BuildRule, BuildScript, BuildSettings,
        BuildableReference, Declaration, DomainError, FileMatcher, Isa, Object, ObjectGraph,
        ObjectId, PlistValue, ProjectSpec, ProjectTarget, RuleAction, Scheme, SchemeDocument,
        ScriptTiming, SettingValue, SpecValidator, Target, Value, VersionRequirement,
        capabilities,
    },
    error::PbxResult,
};

const SOURCE_TREE_GROUP: &str = "<group>";
const SOURCE_TREE_ABSOLUTE: &str = "<absolute>";
const SOURCE_TREE_PRODUCTS: &str = "BUILT_PRODUCTS_DIR";
const BUILD_ACTION_MASK: &str = "2147483647";
const COMPATIBILITY_VERSION: &str = "Xcode 14.0";
const EMBED_FRAMEWORKS: &str = "Embed Frameworks";
const EMBED_EXTENSIONS: &str = "Embed App Extensions";
const COPY_FRAMEWORKS: &str = "Copy Frameworks";
const COPY_FRAMEWORKS_SCRIPT: &str = "carthage copy-frameworks\n";
/// `dstSubfolderSpec` of the frameworks and plug-ins bundle folders.
const FRAMEWORKS_FOLDER: &str = "10";
const PLUGINS_FOLDER: &str = "13";

// ── Inputs ───────────────────────────────────────────────────────────────────

/// Everything resolved for one target before assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub name: String,
    /// Build settings per config, aligned with the spec's configs.
    pub settings: Vec<BuildSettings>,
    pub sources: TargetSources,
    pub dependencies: Vec<ResolvedDependency>,
    /// Script bodies, aligned with the target's build scripts.
    pub scripts: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GraphInput {
    /// Project build settings per config, aligned with the spec's configs.
    pub project_settings: Vec<BuildSettings>,
    /// One entry per target, in `ProjectSpec::all_targets` order.
    pub targets: Vec<ResolvedTarget>,
    pub file_groups: Vec<SourceNode>,
    pub schemes: Vec<Scheme>,
}

// ── Source forest ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct MergedNode {
    kind: SourceNodeKind,
    path: PathBuf,
    name: Option<String>,
    children: Vec<NodeKey>,
    current_version: Option<PathBuf>,
}

impl MergedNode {
    fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| file_name(&self.path))
    }
}

/// Source trees of every target merged by node identity.
#[derive(Debug, Default)]
struct SourceForest {
    nodes: BTreeMap<NodeKey, MergedNode>,
    roots: Vec<NodeKey>,
}

impl SourceForest {
    fn add_root(&mut self, node: &SourceNode) {
        let key = self.merge(node);
        if !self.roots.contains(&key) {
            self.roots.push(key);
        }
    }

    fn merge(&mut self, node: &SourceNode) -> NodeKey {
        let children: Vec<NodeKey> = node.children.iter().map(|c| self.merge(c)).collect();
        let key = node.key();
        let entry = self.nodes.entry(key.clone()).or_insert_with(|| MergedNode {
            kind: node.kind,
            path: node.path.clone(),
            name: None,
            children: Vec::new(),
            current_version: node.current_version.clone(),
        });
        if entry.name.is_none() {
            entry.name = node.name.clone();
        }
        for child in children {
            if !entry.children.contains(&child) {
                entry.children.push(child);
            }
        }
        key
    }

    /// Wrap every root in groups for the directories between `base` and it.
    fn add_intermediate_groups(&mut self, base: &Path) {
        let roots = std::mem::take(&mut self.roots);
        for root in roots {
            let mut key = root;
            while let Some(parent) = key.path.parent() {
                let inside = parent
                    .strip_prefix(base)
                    .is_ok_and(|rel| !rel.components().any(|c| c == Component::ParentDir));
                if parent == base || !inside {
                    break;
                }
                let parent_key = NodeKey {
                    kind: SourceNodeKind::Group,
                    path: parent.to_path_buf(),
                };
                let entry = self
                    .nodes
                    .entry(parent_key.clone())
                    .or_insert_with(|| MergedNode {
                        kind: SourceNodeKind::Group,
                        path: parent.to_path_buf(),
                        name: None,
                        children: Vec::new(),
                        current_version: None,
                    });
                if !entry.children.contains(&key) {
                    entry.children.push(key);
                }
                key = parent_key;
            }
            if !self.roots.contains(&key) {
                self.roots.push(key);
            }
        }
    }

    /// Roots not nested under another node, in first-seen order.
    fn top_level(&self) -> Vec<NodeKey> {
        let nested: HashSet<&NodeKey> = self.nodes.values().flat_map(|n| &n.children).collect();
        self.roots
            .iter()
            .filter(|key| !nested.contains(key))
            .cloned()
            .collect()
    }

    fn display_name(&self, key: &NodeKey) -> String {
        self.nodes
            .get(key)
            .map(MergedNode::display_name)
            .unwrap_or_else(|| file_name(&key.path))
    }
}

/// A child entry of a group being assembled.
struct Child {
    id: ObjectId,
    name: String,
    is_group: bool,
}

impl GroupChild for Child {
    fn sort_name(&self) -> &str {
        &self.name
    }

    fn is_group(&self) -> bool {
        self.is_group
    }
}

fn child_ids(children: Vec<Child>) -> Value {
    Value::ids(children.into_iter().map(|c| c.id))
}

// ── Builder ──────────────────────────────────────────────────────────────────

pub struct GraphBuilder<'a> {
    spec: &'a ProjectSpec,
    tool_version: &'a semver::Version,
    ids: IdAllocator,
    graph: ObjectGraph,
    forest: SourceForest,
    /// Prebuilt framework paths relative to the base path.
    prebuilt: BTreeSet<String>,
    /// SDK references as `(source tree, path)`.
    sdk: BTreeSet<(String, String)>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(spec: &'a ProjectSpec, tool_version: &'a semver::Version) -> Self {
        Self {
            spec,
            tool_version,
            ids: IdAllocator::new(),
            graph: ObjectGraph::new(&spec.name),
            forest: SourceForest::default(),
            prebuilt: BTreeSet::new(),
            sdk: BTreeSet::new(),
        }
    }

    /// Assemble the full graph. Nothing is returned unless every reference
    /// in the object table resolves.
    #[instrument(skip_all, fields(project = %self.spec.name))]
    pub fn build(mut self, input: GraphInput) -> PbxResult<ObjectGraph> {
        let spec = self.spec;
        let project_id = self.ids.id(Isa::Project, "project");

        for group in &input.file_groups {
            self.forest.add_root(group);
        }
        for resolved in &input.targets {
            for root in &resolved.sources.roots {
                self.forest.add_root(root);
            }
        }
        if spec.options.create_intermediate_groups {
            self.forest.add_intermediate_groups(&spec.base_path);
        }

        let package_refs = self.emit_packages();

        let mut target_ids = Vec::new();
        for (target, resolved) in spec.all_targets().zip(&input.targets) {
            let id = match target {
                AnyTarget::Native(target) => self.emit_native(target, resolved, &project_id),
                AnyTarget::Aggregate(target) => {
                    self.emit_aggregate(target, resolved, &project_id)
                }
            };
            target_ids.push(id);
        }

        let main_group = self.emit_main_group();
        let products_group = self.ids.id(Isa::Group, "<products>");
        let config_list = self.config_list(
            "project",
            &format!("PBXProject \"{}\"", spec.name),
            &input.project_settings,
        );

        let mut regions: BTreeSet<String> = input
            .targets
            .iter()
            .flat_map(|t| t.sources.locales.iter().cloned())
            .collect();
        regions.insert("Base".into());
        regions.insert(spec.options.development_language().to_string());

        let project = Object::new(Isa::Project, "Project object")
            .with("attributes", self.project_attributes(&target_ids))
            .with("buildConfigurationList", config_list)
            .with("compatibilityVersion", COMPATIBILITY_VERSION)
            .with("developmentRegion", spec.options.development_language())
            .with("hasScannedForEncodings", "0")
            .with("knownRegions", Value::strings(regions))
            .with("mainGroup", main_group)
            .with_opt(
                "packageReferences",
                (!package_refs.is_empty()).then(|| Value::ids(package_refs)),
            )
            .with("productRefGroup", products_group)
            .with("projectDirPath", "")
            .with("projectRoot", "")
            .with("targets", Value::ids(target_ids));
        self.graph.insert(project_id.clone(), project);
        self.graph.set_root(project_id);

        self.graph.declarations = self.declarations();
        self.graph.schemes = self.scheme_documents(&input.schemes)?;

        let dangling = self.graph.dangling_references();
        if let Some(first) = dangling.iter().next() {
            return Err(GenerationError::IncompleteGraph {
                count: dangling.len(),
                first: first.to_string(),
            }
            .into());
        }

        debug!(objects = self.graph.len(), "Object graph built");
        Ok(self.graph)
    }

    // ── Identifiers ──────────────────────────────────────────────────────────

    fn node_id(&mut self, key: &NodeKey) -> ObjectId {
        let (rel, _) = relative(&key.path, &self.spec.base_path);
        match key.kind {
            SourceNodeKind::Group => self.ids.id(Isa::Group, &rel),
            SourceNodeKind::File => self.ids.id(Isa::FileReference, &rel),
            SourceNodeKind::FolderReference => {
                self.ids.id(Isa::FileReference, &format!("folder:{rel}"))
            }
            SourceNodeKind::VariantGroup => self.ids.id(Isa::VariantGroup, &rel),
            SourceNodeKind::VersionGroup => self.ids.id(Isa::VersionGroup, &rel),
        }
    }

    fn product_ref_id(&mut self, target: &str) -> ObjectId {
        self.ids.id(Isa::FileReference, &format!("<product>/{target}"))
    }

    fn prebuilt_ref_id(&mut self, path: &str) -> ObjectId {
        self.ids.id(Isa::FileReference, &format!("<prebuilt>/{path}"))
    }

    fn sdk_ref_id(&mut self, source_tree: &str, path: &str) -> ObjectId {
        self.ids
            .id(Isa::FileReference, &format!("<sdk>/{source_tree}/{path}"))
    }

    fn package_ref_id(&mut self, package: &str) -> ObjectId {
        self.ids.id(Isa::RemotePackageReference, package)
    }

    // ── Groups ───────────────────────────────────────────────────────────────

    fn order_children(&self, children: &mut Vec<Child>, group_name: &str) {
        let options = &self.spec.options;
        sort_children(children, options.group_sort_position);
        apply_group_ordering(children, Some(group_name), &options.group_ordering);
    }

    fn emit_main_group(&mut self) -> ObjectId {
        let base = self.spec.base_path.clone();
        let mut children = Vec::new();
        for key in self.forest.top_level() {
            children.push(self.emit_node(&key, &base));
        }
        if let Some(frameworks) = self.emit_frameworks_group() {
            children.push(frameworks);
        }
        children.push(self.emit_products_group());
        apply_group_ordering(&mut children, None, &self.spec.options.group_ordering);

        let id = self.ids.id(Isa::Group, "<main>");
        self.graph.insert(
            id.clone(),
            Object::new(Isa::Group, "")
                .with("children", child_ids(children))
                .with("sourceTree", SOURCE_TREE_GROUP),
        );
        id
    }

    fn emit_children(&mut self, keys: &[NodeKey], dir: &Path) -> Vec<Child> {
        keys.iter().map(|key| self.emit_node(key, dir)).collect()
    }

    /// Emit a node and its subtree. `parent_dir` is the directory the
    /// node's `path` is written relative to.
    fn emit_node(&mut self, key: &NodeKey, parent_dir: &Path) -> Child {
        let id = self.node_id(key);
        let Some(node) = self.forest.nodes.get(key).cloned() else {
            return Child {
                id,
                name: file_name(&key.path),
                is_group: false,
            };
        };

        let display = node.display_name();
        let file = file_name(&node.path);
        let (path, source_tree) = relative(&node.path, parent_dir);
        let name = node.name.clone().or_else(|| (path != file).then(|| file.clone()));

        let object = match node.kind {
            SourceNodeKind::Group => {
                let mut children = self.emit_children(&node.children, &node.path);
                self.order_children(&mut children, &display);
                Object::new(Isa::Group, &display)
                    .with("children", child_ids(children))
                    .with_opt("name", name)
                    .with("path", path)
                    .with("sourceTree", source_tree)
            }
            SourceNodeKind::VariantGroup => {
                let dir = node.path.parent().unwrap_or(parent_dir).to_path_buf();
                let children = self.emit_children(&node.children, &dir);
                Object::new(Isa::VariantGroup, &display)
                    .with("children", child_ids(children))
                    .with("name", display.as_str())
                    .with("sourceTree", SOURCE_TREE_GROUP)
            }
            SourceNodeKind::VersionGroup => {
                let children = self.emit_children(&node.children, &node.path);
                let current = node.current_version.as_ref().map(|current| {
                    self.node_id(&NodeKey {
                        kind: SourceNodeKind::File,
                        path: current.clone(),
                    })
                });
                Object::new(Isa::VersionGroup, &display)
                    .with("children", child_ids(children))
                    .with_opt("currentVersion", current)
                    .with_opt("name", name)
                    .with("path", path)
                    .with("sourceTree", source_tree)
                    .with("versionGroupType", "wrapper.xcdatamodel")
            }
            SourceNodeKind::File | SourceNodeKind::FolderReference => {
                let file_type = match node.kind {
                    SourceNodeKind::FolderReference => "folder",
                    _ => capabilities::last_known_file_type(extension(&file)),
                };
                Object::new(Isa::FileReference, &display)
                    .with("lastKnownFileType", file_type)
                    .with_opt("name", name)
                    .with("path", path)
                    .with("sourceTree", source_tree)
            }
        };
        self.graph.insert(id.clone(), object);

        Child {
            id,
            name: display,
            is_group: node.kind == SourceNodeKind::Group,
        }
    }

    fn emit_frameworks_group(&mut self) -> Option<Child> {
        if self.prebuilt.is_empty() && self.sdk.is_empty() {
            return None;
        }

        let mut children = Vec::new();
        if !self.prebuilt.is_empty() {
            children.push(self.emit_prebuilt_group());
        }
        let sdk: Vec<(String, String)> = self.sdk.iter().cloned().collect();
        for (source_tree, path) in sdk {
            let id = self.sdk_ref_id(&source_tree, &path);
            let file = file_name(Path::new(&path));
            self.graph.insert(
                id.clone(),
                Object::new(Isa::FileReference, &file)
                    .with(
                        "lastKnownFileType",
                        capabilities::last_known_file_type(extension(&file)),
                    )
                    .with("name", file.as_str())
                    .with("path", path.as_str())
                    .with("sourceTree", source_tree.as_str()),
            );
            children.push(Child {
                id,
                name: file,
                is_group: false,
            });
        }
        self.order_children(&mut children, "Frameworks");

        let id = self.ids.id(Isa::Group, "<frameworks>");
        self.graph.insert(
            id.clone(),
            Object::new(Isa::Group, "Frameworks")
                .with("children", child_ids(children))
                .with("name", "Frameworks")
                .with("sourceTree", SOURCE_TREE_GROUP),
        );
        Some(Child {
            id,
            name: "Frameworks".into(),
            is_group: true,
        })
    }

    /// `<framework build path>/<platform>/<file>` as nested groups.
    fn emit_prebuilt_group(&mut self) -> Child {
        let root = self
            .spec
            .options
            .framework_build_path()
            .trim_end_matches('/')
            .to_string();

        let mut platforms: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
        for path in &self.prebuilt {
            let rest = path
                .strip_prefix(&root)
                .map(|r| r.trim_start_matches('/'))
                .unwrap_or(path);
            let (platform, file) = rest.split_once('/').unwrap_or(("", rest));
            platforms
                .entry(platform.to_string())
                .or_default()
                .push((path.clone(), file.to_string()));
        }

        let mut platform_children = Vec::new();
        for (platform, files) in platforms {
            let mut children = Vec::new();
            for (full, rel) in files {
                let id = self.prebuilt_ref_id(&full);
                let file = file_name(Path::new(&rel));
                self.graph.insert(
                    id.clone(),
                    Object::new(Isa::FileReference, &file)
                        .with(
                            "lastKnownFileType",
                            capabilities::last_known_file_type(extension(&file)),
                        )
                        .with_opt("name", (rel != file).then(|| file.clone()))
                        .with("path", rel.as_str())
                        .with("sourceTree", SOURCE_TREE_GROUP),
                );
                children.push(Child {
                    id,
                    name: file,
                    is_group: false,
                });
            }
            self.order_children(&mut children, &platform);

            let id = self
                .ids
                .id(Isa::Group, &format!("<frameworks>/{root}/{platform}"));
            self.graph.insert(
                id.clone(),
                Object::new(Isa::Group, &platform)
                    .with("children", child_ids(children))
                    .with("path", platform.as_str())
                    .with("sourceTree", SOURCE_TREE_GROUP),
            );
            platform_children.push(Child {
                id,
                name: platform,
                is_group: true,
            });
        }

        let display = root.split('/').next().unwrap_or(&root).to_string();
        let id = self.ids.id(Isa::Group, &format!("<frameworks>/{root}"));
        self.graph.insert(
            id.clone(),
            Object::new(Isa::Group, &display)
                .with("children", child_ids(platform_children))
                .with_opt("name", (display != root).then(|| display.clone()))
                .with("path", root.as_str())
                .with("sourceTree", SOURCE_TREE_GROUP),
        );
        Child {
            id,
            name: display,
            is_group: true,
        }
    }

    fn emit_products_group(&mut self) -> Child {
        let spec = self.spec;
        let mut children = Vec::new();
        for target in &spec.targets {
            let product =
                capabilities::product_file_name(target.product_type, target.product_name());
            let file_type = capabilities::find_product(target.product_type)
                .map(|def| def.file_type)
                .unwrap_or("file");
            let id = self.product_ref_id(&target.name);
            self.graph.insert(
                id.clone(),
                Object::new(Isa::FileReference, &product)
                    .with("explicitFileType", file_type)
                    .with("includeInIndex", "0")
                    .with("path", product.as_str())
                    .with("sourceTree", SOURCE_TREE_PRODUCTS),
            );
            children.push(Child {
                id,
                name: product,
                is_group: false,
            });
        }
        self.order_children(&mut children, "Products");

        let id = self.ids.id(Isa::Group, "<products>");
        self.graph.insert(
            id.clone(),
            Object::new(Isa::Group, "Products")
                .with("children", child_ids(children))
                .with("name", "Products")
                .with("sourceTree", SOURCE_TREE_GROUP),
        );
        Child {
            id,
            name: "Products".into(),
            is_group: true,
        }
    }

    // ── Targets ──────────────────────────────────────────────────────────────

    fn emit_native(
        &mut self,
        target: &Target,
        resolved: &ResolvedTarget,
        project_id: &ObjectId,
    ) -> ObjectId {
        let name = target.name.as_str();
        let target_id = self.ids.id(Isa::NativeTarget, name);
        let mut phases = Vec::new();
        let mut dependencies = Vec::new();
        let mut package_products = Vec::new();

        phases.extend(self.script_phases(
            name,
            &target.build_scripts,
            &resolved.scripts,
            ScriptTiming::PreBuild,
        ));

        let sources = self.source_build_files(name, BuildPhase::Sources, &resolved.sources);
        phases.push(self.phase(Isa::SourcesBuildPhase, name, "Sources", sources));

        phases.extend(self.script_phases(
            name,
            &target.build_scripts,
            &resolved.scripts,
            ScriptTiming::PostCompile,
        ));

        let resources = self.source_build_files(name, BuildPhase::Resources, &resolved.sources);
        if !resources.is_empty() {
            phases.push(self.phase(Isa::ResourcesBuildPhase, name, "Resources", resources));
        }
        let headers = self.source_build_files(name, BuildPhase::Headers, &resolved.sources);
        if !headers.is_empty() {
            phases.push(self.phase(Isa::HeadersBuildPhase, name, "Headers", headers));
        }

        let mut frameworks =
            self.source_build_files(name, BuildPhase::Frameworks, &resolved.sources);
        let mut embed_frameworks = Vec::new();
        let mut embed_extensions = Vec::new();
        let mut copy_inputs = Vec::new();

        for dependency in &resolved.dependencies {
            let link_settings = dependency.weak.then(|| attribute_settings(&["Weak"]));
            match &dependency.kind {
                ResolvedKind::Target {
                    product_type,
                    product,
                } => {
                    if dependency.top_level {
                        dependencies.push(self.target_dependency(
                            name,
                            &dependency.reference,
                            Isa::NativeTarget,
                            project_id,
                        ));
                    }
                    let product_ref = self.product_ref_id(&dependency.reference);
                    if dependency.link {
                        frameworks.push(self.build_file(
                            name,
                            "Frameworks",
                            "fileRef",
                            &product_ref,
                            product,
                            link_settings,
                        ));
                    }
                    if dependency.embed {
                        if product_type.is_extension() {
                            let settings = attribute_settings(&["RemoveHeadersOnCopy"]);
                            embed_extensions.push(self.build_file(
                                name,
                                EMBED_EXTENSIONS,
                                "fileRef",
                                &product_ref,
                                product,
                                Some(settings),
                            ));
                        } else {
                            embed_frameworks.push(self.build_file(
                                name,
                                EMBED_FRAMEWORKS,
                                "fileRef",
                                &product_ref,
                                product,
                                Some(embed_settings(dependency.code_sign)),
                            ));
                        }
                    }
                }
                ResolvedKind::Aggregate => {
                    if dependency.top_level {
                        dependencies.push(self.target_dependency(
                            name,
                            &dependency.reference,
                            Isa::AggregateTarget,
                            project_id,
                        ));
                    }
                }
                ResolvedKind::Package { package } => {
                    let product_id = self.ids.id(
                        Isa::PackageProductDependency,
                        &format!("{name}/{package}/{}", dependency.reference),
                    );
                    let package_ref = self.package_ref_id(package);
                    self.graph.insert(
                        product_id.clone(),
                        Object::new(Isa::PackageProductDependency, &dependency.reference)
                            .with("package", package_ref)
                            .with("productName", dependency.reference.as_str()),
                    );
                    package_products.push(product_id.clone());
                    if dependency.link {
                        frameworks.push(self.build_file(
                            name,
                            "Frameworks",
                            "productRef",
                            &product_id,
                            &dependency.reference,
                            link_settings,
                        ));
                    }
                }
                ResolvedKind::Prebuilt { path, .. } => {
                    self.prebuilt.insert(path.clone());
                    let file_ref = self.prebuilt_ref_id(path);
                    let file = file_name(Path::new(path));
                    if dependency.link {
                        frameworks.push(self.build_file(
                            name,
                            "Frameworks",
                            "fileRef",
                            &file_ref,
                            &file,
                            link_settings,
                        ));
                    }
                    if dependency.embed {
                        embed_frameworks.push(self.build_file(
                            name,
                            EMBED_FRAMEWORKS,
                            "fileRef",
                            &file_ref,
                            &file,
                            Some(embed_settings(dependency.code_sign)),
                        ));
                    }
                    if dependency.copy_script {
                        copy_inputs.push(format!("$(SRCROOT)/{path}"));
                    }
                }
                ResolvedKind::Sdk { path, source_tree } => {
                    self.sdk.insert((source_tree.clone(), path.clone()));
                    let file_ref = self.sdk_ref_id(source_tree, path);
                    if dependency.link {
                        let file = file_name(Path::new(path));
                        frameworks.push(self.build_file(
                            name,
                            "Frameworks",
                            "fileRef",
                            &file_ref,
                            &file,
                            link_settings,
                        ));
                    }
                }
            }
        }

        phases.push(self.phase(Isa::FrameworksBuildPhase, name, "Frameworks", frameworks));
        if !embed_extensions.is_empty() {
            phases.push(self.copy_phase(name, EMBED_EXTENSIONS, PLUGINS_FOLDER, embed_extensions));
        }
        if !embed_frameworks.is_empty() {
            phases.push(self.copy_phase(
                name,
                EMBED_FRAMEWORKS,
                FRAMEWORKS_FOLDER,
                embed_frameworks,
            ));
        }
        if !copy_inputs.is_empty() {
            phases.push(self.copy_frameworks_script(name, copy_inputs));
        }
        phases.extend(self.script_phases(
            name,
            &target.build_scripts,
            &resolved.scripts,
            ScriptTiming::PostBuild,
        ));

        let rules = self.build_rules(name, &target.build_rules);
        let config_list = self.config_list(
            &format!("target/{name}"),
            &format!("PBXNativeTarget \"{name}\""),
            &resolved.settings,
        );
        let product_ref = self.product_ref_id(name);

        self.graph.insert(
            target_id.clone(),
            Object::new(Isa::NativeTarget, name)
                .with("buildConfigurationList", config_list)
                .with("buildPhases", Value::ids(phases))
                .with("buildRules", Value::ids(rules))
                .with("dependencies", Value::ids(dependencies))
                .with("name", name)
                .with_opt(
                    "packageProductDependencies",
                    (!package_products.is_empty()).then(|| Value::ids(package_products)),
                )
                .with("productName", target.product_name())
                .with("productReference", product_ref)
                .with("productType", target.product_type.identifier()),
        );
        target_id
    }

    fn emit_aggregate(
        &mut self,
        aggregate: &AggregateTarget,
        resolved: &ResolvedTarget,
        project_id: &ObjectId,
    ) -> ObjectId {
        let spec = self.spec;
        let name = aggregate.name.as_str();
        let target_id = self.ids.id(Isa::AggregateTarget, name);

        let mut phases = Vec::new();
        for timing in [
            ScriptTiming::PreBuild,
            ScriptTiming::PostCompile,
            ScriptTiming::PostBuild,
        ] {
            phases.extend(self.script_phases(
                name,
                &aggregate.build_scripts,
                &resolved.scripts,
                timing,
            ));
        }

        let mut dependencies = Vec::new();
        for dependency in &aggregate.targets {
            let isa = match spec.project_target(dependency) {
                Some(AnyTarget::Aggregate(_)) => Isa::AggregateTarget,
                _ => Isa::NativeTarget,
            };
            dependencies.push(self.target_dependency(name, dependency, isa, project_id));
        }

        let config_list = self.config_list(
            &format!("target/{name}"),
            &format!("PBXAggregateTarget \"{name}\""),
            &resolved.settings,
        );
        self.graph.insert(
            target_id.clone(),
            Object::new(Isa::AggregateTarget, name)
                .with("buildConfigurationList", config_list)
                .with("buildPhases", Value::ids(phases))
                .with("dependencies", Value::ids(dependencies))
                .with("name", name)
                .with("productName", name),
        );
        target_id
    }

    fn target_dependency(
        &mut self,
        owner: &str,
        dependency: &str,
        isa: Isa,
        project_id: &ObjectId,
    ) -> ObjectId {
        let key = format!("{owner}/{dependency}");
        let remote = self.ids.id(isa, dependency);
        let proxy = self.ids.id(Isa::ContainerItemProxy, &key);
        self.graph.insert(
            proxy.clone(),
            Object::new(Isa::ContainerItemProxy, "PBXContainerItemProxy")
                .with("containerPortal", project_id.clone())
                .with("proxyType", "1")
                .with("remoteGlobalIDString", remote.to_string())
                .with("remoteInfo", dependency),
        );

        let id = self.ids.id(Isa::TargetDependency, &key);
        self.graph.insert(
            id.clone(),
            Object::new(Isa::TargetDependency, "PBXTargetDependency")
                .with("target", remote)
                .with("targetProxy", proxy),
        );
        id
    }

    // ── Phases ───────────────────────────────────────────────────────────────

    fn phase(&mut self, isa: Isa, owner: &str, name: &str, mut files: Vec<ObjectId>) -> ObjectId {
        let mut seen = HashSet::new();
        files.retain(|id| seen.insert(id.clone()));

        let id = self.ids.id(isa, &format!("{owner}/{name}"));
        self.graph.insert(
            id.clone(),
            Object::new(isa, name)
                .with("buildActionMask", BUILD_ACTION_MASK)
                .with("files", Value::ids(files))
                .with("runOnlyForDeploymentPostprocessing", "0"),
        );
        id
    }

    fn copy_phase(
        &mut self,
        owner: &str,
        name: &str,
        folder: &str,
        mut files: Vec<ObjectId>,
    ) -> ObjectId {
        let mut seen = HashSet::new();
        files.retain(|id| seen.insert(id.clone()));

        let id = self
            .ids
            .id(Isa::CopyFilesBuildPhase, &format!("{owner}/{name}"));
        self.graph.insert(
            id.clone(),
            Object::new(Isa::CopyFilesBuildPhase, name)
                .with("buildActionMask", BUILD_ACTION_MASK)
                .with("dstPath", "")
                .with("dstSubfolderSpec", folder)
                .with("files", Value::ids(files))
                .with("name", name)
                .with("runOnlyForDeploymentPostprocessing", "0"),
        );
        id
    }

    fn build_file(
        &mut self,
        owner: &str,
        phase: &str,
        field: &str,
        reference: &ObjectId,
        comment: &str,
        settings: Option<Value>,
    ) -> ObjectId {
        let id = self
            .ids
            .id(Isa::BuildFile, &format!("{owner}/{phase}/{reference}"));
        self.graph.insert(
            id.clone(),
            Object::new(Isa::BuildFile, format!("{comment} in {phase}"))
                .with(field, reference.clone())
                .with_opt("settings", settings),
        );
        id
    }

    fn source_build_files(
        &mut self,
        owner: &str,
        phase: BuildPhase,
        sources: &TargetSources,
    ) -> Vec<ObjectId> {
        let mut files = Vec::new();
        for file in sources.files_in(phase) {
            let reference = self.node_id(&file.key);
            let comment = self.forest.display_name(&file.key);
            let settings = match phase {
                BuildPhase::Sources if !file.compiler_flags.is_empty() => {
                    let mut map = BTreeMap::new();
                    map.insert(
                        "COMPILER_FLAGS".to_string(),
                        Value::String(file.compiler_flags.join(" ")),
                    );
                    Some(Value::Map(map))
                }
                BuildPhase::Headers => file
                    .header_visibility
                    .attribute()
                    .map(|attribute| attribute_settings(&[attribute])),
                _ => None,
            };
            files.push(self.build_file(
                owner,
                phase.as_str(),
                "fileRef",
                &reference,
                &comment,
                settings,
            ));
        }
        files
    }

    fn script_phases(
        &mut self,
        owner: &str,
        scripts: &[BuildScript],
        bodies: &[String],
        timing: ScriptTiming,
    ) -> Vec<ObjectId> {
        let mut phases = Vec::new();
        for (index, (script, body)) in scripts.iter().zip(bodies).enumerate() {
            if script.timing != timing {
                continue;
            }
            let id = self
                .ids
                .id(Isa::ShellScriptBuildPhase, &format!("{owner}/script/{index}"));
            self.graph.insert(
                id.clone(),
                Object::new(Isa::ShellScriptBuildPhase, script.display_name())
                    .with("buildActionMask", BUILD_ACTION_MASK)
                    .with("files", Value::Array(Vec::new()))
                    .with("inputPaths", Value::strings(script.input_files.iter().cloned()))
                    .with("name", script.display_name())
                    .with("outputPaths", Value::strings(script.output_files.iter().cloned()))
                    .with(
                        "runOnlyForDeploymentPostprocessing",
                        if script.run_only_when_installing { "1" } else { "0" },
                    )
                    .with("shellPath", script.shell_path())
                    .with("shellScript", body.as_str())
                    .with_opt("showEnvVarsInLog", (!script.show_env_vars).then_some("0")),
            );
            phases.push(id);
        }
        phases
    }

    fn copy_frameworks_script(&mut self, owner: &str, inputs: Vec<String>) -> ObjectId {
        let id = self
            .ids
            .id(Isa::ShellScriptBuildPhase, &format!("{owner}/copy-frameworks"));
        self.graph.insert(
            id.clone(),
            Object::new(Isa::ShellScriptBuildPhase, COPY_FRAMEWORKS)
                .with("buildActionMask", BUILD_ACTION_MASK)
                .with("files", Value::Array(Vec::new()))
                .with("inputPaths", Value::strings(inputs))
                .with("name", COPY_FRAMEWORKS)
                .with("outputPaths", Value::Array(Vec::new()))
                .with("runOnlyForDeploymentPostprocessing", "0")
                .with("shellPath", "/bin/sh")
                .with("shellScript", COPY_FRAMEWORKS_SCRIPT),
        );
        id
    }

    fn build_rules(&mut self, owner: &str, rules: &[BuildRule]) -> Vec<ObjectId> {
        let mut ids = Vec::new();
        for (index, rule) in rules.iter().enumerate() {
            let id = self.ids.id(Isa::BuildRule, &format!("{owner}/rule/{index}"));
            let pattern = match &rule.matcher {
                FileMatcher::FilePattern(pattern) => Some(pattern.as_str()),
                FileMatcher::FileType(_) => None,
            };
            let script = match &rule.action {
                RuleAction::Script(script) => Some(script.as_str()),
                RuleAction::CompilerSpec(_) => None,
            };
            self.graph.insert(
                id.clone(),
                Object::new(Isa::BuildRule, "PBXBuildRule")
                    .with("compilerSpec", rule.compiler_spec())
                    .with_opt("filePatterns", pattern)
                    .with("fileType", rule.file_type())
                    .with("isEditable", "1")
                    .with_opt("name", rule.name.as_deref())
                    .with("outputFiles", Value::strings(rule.output_files.iter().cloned()))
                    .with_opt(
                        "outputFilesCompilerFlags",
                        (!rule.output_files_compiler_flags.is_empty()).then(|| {
                            Value::strings(rule.output_files_compiler_flags.iter().cloned())
                        }),
                    )
                    .with_opt("script", script),
            );
            ids.push(id);
        }
        ids
    }

    // ── Configurations ───────────────────────────────────────────────────────

    fn config_list(&mut self, owner: &str, comment: &str, settings: &[BuildSettings]) -> ObjectId {
        let spec = self.spec;
        let mut configs = Vec::new();
        for (config, build_settings) in spec.configs.iter().zip(settings) {
            let id = self
                .ids
                .id(Isa::BuildConfiguration, &format!("{owner}/{}", config.name));
            self.graph.insert(
                id.clone(),
                Object::new(Isa::BuildConfiguration, &config.name)
                    .with("buildSettings", settings_value(build_settings))
                    .with("name", config.name.as_str()),
            );
            configs.push(id);
        }

        let id = self.ids.id(Isa::ConfigurationList, owner);
        self.graph.insert(
            id.clone(),
            Object::new(
                Isa::ConfigurationList,
                format!("Build configuration list for {comment}"),
            )
            .with("buildConfigurations", Value::ids(configs))
            .with("defaultConfigurationIsVisible", "0")
            .with_opt("defaultConfigurationName", spec.default_config_name()),
        );
        id
    }

    // ── Project level ────────────────────────────────────────────────────────

    fn emit_packages(&mut self) -> Vec<ObjectId> {
        let spec = self.spec;
        let mut ids = Vec::new();
        for (name, package) in &spec.packages {
            let (kind, key, value) = match &package.requirement {
                VersionRequirement::Exact(v) => ("exactVersion", "version", v),
                VersionRequirement::From(v) => ("upToNextMajorVersion", "minimumVersion", v),
                VersionRequirement::Branch(v) => ("branch", "branch", v),
                VersionRequirement::Revision(v) => ("revision", "revision", v),
            };
            let mut requirement = BTreeMap::new();
            requirement.insert("kind".to_string(), Value::from(kind));
            requirement.insert(key.to_string(), Value::String(value.clone()));

            let id = self.package_ref_id(name);
            self.graph.insert(
                id.clone(),
                Object::new(
                    Isa::RemotePackageReference,
                    format!("XCRemoteSwiftPackageReference \"{name}\""),
                )
                .with("repositoryURL", package.url.as_str())
                .with("requirement", Value::Map(requirement)),
            );
            ids.push(id);
        }
        ids
    }

    /// Version the project attributes are derived from: the spec override,
    /// else the running tool.
    fn effective_tool_version(&self) -> semver::Version {
        self.spec
            .options
            .tool_version
            .as_deref()
            .and_then(SpecValidator::parse_version)
            .unwrap_or_else(|| self.tool_version.clone())
    }

    fn project_attributes(&self, target_ids: &[ObjectId]) -> Value {
        let version = self.effective_tool_version();
        let created_on = format!("{}.{}", version.major, version.minor);
        let upgrade_check = self
            .spec
            .options
            .last_upgrade_check
            .clone()
            .unwrap_or_else(|| last_upgrade_check(&version));

        let mut targets = BTreeMap::new();
        for (target, id) in self.spec.all_targets().zip(target_ids) {
            let mut attributes = BTreeMap::new();
            attributes.insert(
                "CreatedOnToolsVersion".to_string(),
                Value::String(created_on.clone()),
            );
            for (key, value) in target.attributes() {
                attributes.insert(key.clone(), setting_value(value));
            }
            targets.insert(id.to_string(), Value::Map(attributes));
        }

        let mut attributes = BTreeMap::new();
        attributes.insert(
            "BuildIndependentTargetsInParallel".to_string(),
            Value::from("YES"),
        );
        attributes.insert("LastUpgradeCheck".to_string(), Value::String(upgrade_check));
        attributes.insert("TargetAttributes".to_string(), Value::Map(targets));
        for (key, value) in &self.spec.attributes {
            attributes.insert(key.clone(), setting_value(value));
        }
        Value::Map(attributes)
    }

    fn declarations(&self) -> Vec<Declaration> {
        self.spec
            .targets
            .iter()
            .filter(|t| capabilities::needs_info_plist(t.product_type) || t.info.is_some())
            .map(|target| {
                let package_type = capabilities::find_product(target.product_type)
                    .and_then(|def| def.package_type)
                    .unwrap_or("$(PRODUCT_BUNDLE_PACKAGE_TYPE)");
                let mut properties: BTreeMap<String, PlistValue> = [
                    ("CFBundleDevelopmentRegion", "$(DEVELOPMENT_LANGUAGE)"),
                    ("CFBundleExecutable", "$(EXECUTABLE_NAME)"),
                    ("CFBundleIdentifier", "$(PRODUCT_BUNDLE_IDENTIFIER)"),
                    ("CFBundleInfoDictionaryVersion", "6.0"),
                    ("CFBundleName", "$(PRODUCT_NAME)"),
                    ("CFBundlePackageType", package_type),
                    ("CFBundleShortVersionString", "1.0"),
                    ("CFBundleVersion", "1"),
                ]
                .into_iter()
                .map(|(key, value)| (key.to_string(), PlistValue::from(value)))
                .collect();
                if let Some(info) = &target.info {
                    properties.extend(info.properties.clone());
                }
                Declaration {
                    path: target.info_plist_path(),
                    properties,
                }
            })
            .collect()
    }

    fn scheme_documents(&mut self, schemes: &[Scheme]) -> PbxResult<Vec<SchemeDocument>> {
        let spec = self.spec;
        let container = format!("container:{}", spec.bundle_name());
        let mut documents = Vec::new();

        for scheme in schemes {
            let launch_target = scheme.run.as_ref().and_then(|r| r.executable.clone());
            let mut names = scheme.referenced_targets();
            names.extend(launch_target.as_deref());

            let mut buildables = BTreeMap::new();
            for name in names {
                let reference = match spec.project_target(name) {
                    Some(AnyTarget::Native(target)) => BuildableReference {
                        blueprint_id: self.ids.id(Isa::NativeTarget, name),
                        buildable_name: capabilities::product_file_name(
                            target.product_type,
                            target.product_name(),
                        ),
                        blueprint_name: name.to_string(),
                        container: container.clone(),
                    },
                    Some(AnyTarget::Aggregate(_)) => BuildableReference {
                        blueprint_id: self.ids.id(Isa::AggregateTarget, name),
                        buildable_name: name.to_string(),
                        blueprint_name: name.to_string(),
                        container: container.clone(),
                    },
                    None => {
                        return Err(DomainError::InvalidSchemeTarget {
                            scheme: scheme.name.clone(),
                            target: name.to_string(),
                        }
                        .into());
                    }
                };
                buildables.insert(name.to_string(), reference);
            }

            let launch_runnable = launch_target
                .as_deref()
                .and_then(|name| spec.target(name))
                .is_some_and(|t| t.product_type.is_executable());
            documents.push(SchemeDocument {
                scheme: scheme.clone(),
                buildables,
                launch_target,
                launch_runnable,
            });
        }
        Ok(documents)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// `LastUpgradeCheck` for a tool version: `1.5.0` becomes `0150`.
pub fn last_upgrade_check(version: &semver::Version) -> String {
    format!("{:02}{}0", version.major, version.minor)
}

/// `path` relative to `dir` and the source tree it is relative to.
fn relative(path: &Path, dir: &Path) -> (String, &'static str) {
    match path.strip_prefix(dir) {
        Ok(rel) => (slash_path(rel), SOURCE_TREE_GROUP),
        Err(_) => (slash_path(path), SOURCE_TREE_ABSOLUTE),
    }
}

fn slash_path(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    if text.is_empty() { ".".into() } else { text }
}

fn setting_value(value: &SettingValue) -> Value {
    match value {
        SettingValue::List(items) => Value::strings(items.iter().cloned()),
        other => Value::String(other.as_setting_string()),
    }
}

fn settings_value(settings: &BuildSettings) -> Value {
    Value::Map(
        settings
            .iter()
            .map(|(key, value)| (key.clone(), setting_value(value)))
            .collect(),
    )
}

fn attribute_settings(attributes: &[&str]) -> Value {
    let mut map = BTreeMap::new();
    map.insert(
        "ATTRIBUTES".to_string(),
        Value::strings(attributes.iter().copied()),
    );
    Value::Map(map)
}

fn embed_settings(code_sign: bool) -> Value {
    if code_sign {
        attribute_settings(&["CodeSignOnCopy", "RemoveHeadersOnCopy"])
    } else {
        attribute_settings(&["RemoveHeadersOnCopy"])
    }
}
