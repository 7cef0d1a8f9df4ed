//! Dependency resolver: turns a target's declared dependencies into an
//! ordered, de-duplicated list with link and embed directives.
//!
//! Prebuilt frameworks are resolved transitively through the metadata the
//! dependency manager leaves next to them. A platform filter never removes a
//! dependency from the list; it only switches off its link and embed flags.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;

use tracing::{debug, instrument, warn};

use crate::{
    application::{
        error::GenerationError,
        ports::{Filesystem, FrameworkMetadata},
        services::sources::extension,
    },
    domain::{
        AnyTarget, Dependency, DependencyKind, DomainError, Linkage, Platform, ProductType,
        ProjectSpec, Target, capabilities,
    },
    error::PbxResult,
};

/// What a resolved dependency points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedKind {
    /// A native target of this project.
    Target {
        product_type: ProductType,
        /// File name of the built product.
        product: String,
    },
    /// An aggregate target. Ordered, never linked.
    Aggregate,
    /// A product of a remote package.
    Package { package: String },
    /// A prebuilt framework, path relative to the base path.
    Prebuilt { path: String, linkage: Linkage },
    /// An SDK framework or library.
    Sdk {
        path: String,
        source_tree: String,
    },
}

impl ResolvedKind {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Target { .. } | Self::Aggregate => "target",
            Self::Package { .. } => "package",
            Self::Prebuilt { .. } => "prebuilt",
            Self::Sdk { .. } => "sdk",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    /// Target name, package product, framework or SDK reference.
    pub reference: String,
    pub kind: ResolvedKind,
    /// Declared by the target itself rather than reached transitively.
    pub top_level: bool,
    pub link: bool,
    pub embed: bool,
    pub code_sign: bool,
    pub weak: bool,
    /// Copied by the framework copy script instead of an embed phase.
    pub copy_script: bool,
}

impl ResolvedDependency {
    fn key(&self) -> (&'static str, String) {
        (self.kind.tag(), self.reference.clone())
    }
}

/// A prebuilt framework whose related frameworks still need expanding.
struct Expansion<'d> {
    dependency: &'d Dependency,
    reference: String,
    linkage: Linkage,
}

pub struct DependencyResolver<'a> {
    spec: &'a ProjectSpec,
    fs: &'a dyn Filesystem,
    metadata: &'a dyn FrameworkMetadata,
    strict: bool,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(
        spec: &'a ProjectSpec,
        fs: &'a dyn Filesystem,
        metadata: &'a dyn FrameworkMetadata,
        strict: bool,
    ) -> Self {
        Self {
            spec,
            fs,
            metadata,
            strict,
        }
    }

    /// Resolve every dependency of `target`.
    ///
    /// Directly declared non-prebuilt dependencies keep their declared order.
    /// Prebuilt frameworks follow, sorted by reference.
    #[instrument(skip_all, fields(target = %target.name))]
    pub fn resolve(&self, target: &Target) -> PbxResult<Vec<ResolvedDependency>> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        let mut prebuilt = Vec::new();
        let mut expansions = Vec::new();

        for dependency in &target.dependencies {
            for resolved in self.resolve_one(target, dependency, true, &mut expansions)? {
                if seen.insert(resolved.key()) {
                    match resolved.kind {
                        ResolvedKind::Prebuilt { .. } => prebuilt.push(resolved),
                        _ => ordered.push(resolved),
                    }
                }
            }
        }

        if self.spec.options.transitively_link_dependencies
            && (target.product_type.is_application() || target.product_type.is_test())
        {
            let mut visited = HashSet::new();
            let mut pending: VecDeque<&str> = target
                .dependencies
                .iter()
                .filter_map(|d| match &d.kind {
                    DependencyKind::Target(name) => Some(name.as_str()),
                    _ => None,
                })
                .collect();

            while let Some(name) = pending.pop_front() {
                if !visited.insert(name) {
                    continue;
                }
                let Some(upstream) = self.spec.target(name) else {
                    continue;
                };
                for dependency in upstream.dependencies.iter().filter(|d| !d.target_only) {
                    for resolved in self.resolve_one(target, dependency, false, &mut expansions)? {
                        if seen.insert(resolved.key()) {
                            match resolved.kind {
                                ResolvedKind::Prebuilt { .. } => prebuilt.push(resolved),
                                _ => ordered.push(resolved),
                            }
                        }
                    }
                    if let DependencyKind::Target(next) = &dependency.kind {
                        pending.push_back(next);
                    }
                }
            }
        }

        // Upstream prebuilt frameworks reached above bring their related
        // frameworks along too.
        for expansion in expansions {
            for resolved in self.related_frameworks(target, &expansion)? {
                if seen.insert(resolved.key()) {
                    prebuilt.push(resolved);
                }
            }
        }

        prebuilt.sort_by(|a, b| a.reference.cmp(&b.reference));
        ordered.extend(prebuilt);

        debug!(count = ordered.len(), "Dependencies resolved");
        Ok(ordered)
    }

    fn resolve_one<'d>(
        &self,
        target: &Target,
        dependency: &'d Dependency,
        top_level: bool,
        expansions: &mut Vec<Expansion<'d>>,
    ) -> PbxResult<Vec<ResolvedDependency>> {
        let applies = dependency.applies_to(target.platform);
        let base = |reference: &str, kind: ResolvedKind| ResolvedDependency {
            reference: reference.to_string(),
            kind,
            top_level,
            link: false,
            embed: false,
            code_sign: dependency.code_sign.unwrap_or(true),
            weak: dependency.weak,
            copy_script: false,
        };

        match &dependency.kind {
            DependencyKind::Target(name) => {
                let Some(upstream) = self.spec.project_target(name) else {
                    return Err(DomainError::InvalidTargetDependency {
                        target: target.name.clone(),
                        dependency: name.clone(),
                    }
                    .into());
                };

                let mut resolved = match upstream {
                    AnyTarget::Native(upstream) => base(
                        name,
                        ResolvedKind::Target {
                            product_type: upstream.product_type,
                            product: capabilities::product_file_name(
                                upstream.product_type,
                                upstream.product_name(),
                            ),
                        },
                    ),
                    AnyTarget::Aggregate(_) => return Ok(vec![base(name, ResolvedKind::Aggregate)]),
                };

                if let ResolvedKind::Target { product_type, .. } = resolved.kind {
                    let linkable = capabilities::product_linkage(product_type) != Linkage::None
                        && target.product_type != ProductType::StaticLibrary;
                    let embeddable = target.product_type.is_application()
                        && capabilities::is_embeddable(product_type);
                    resolved.link = applies && dependency.link.unwrap_or(linkable);
                    resolved.embed = applies && dependency.embed.unwrap_or(embeddable);
                }
                Ok(vec![resolved])
            }

            DependencyKind::Package { name, products } => {
                if !self.spec.packages.contains_key(name) {
                    return Err(DomainError::UnknownPackage {
                        target: target.name.clone(),
                        package: name.clone(),
                    }
                    .into());
                }
                if products.is_empty() {
                    return Err(DomainError::EmptyPackageProducts {
                        target: target.name.clone(),
                        package: name.clone(),
                    }
                    .into());
                }
                Ok(products
                    .iter()
                    .map(|product| {
                        let mut resolved = base(
                            product,
                            ResolvedKind::Package {
                                package: name.clone(),
                            },
                        );
                        resolved.link = applies && dependency.link.unwrap_or(true);
                        resolved
                    })
                    .collect())
            }

            DependencyKind::Prebuilt {
                reference,
                linkage,
                find_related,
            } => {
                if find_related.unwrap_or(self.spec.options.find_related_frameworks) {
                    expansions.push(Expansion {
                        dependency,
                        reference: reference.clone(),
                        linkage: *linkage,
                    });
                }
                Ok(vec![self.prebuilt(target, dependency, reference, *linkage, top_level)?])
            }

            DependencyKind::Sdk { reference, root } => {
                let (path, source_tree) = sdk_location(reference, root.as_deref());
                let mut resolved = base(reference, ResolvedKind::Sdk { path, source_tree });
                resolved.link = applies && dependency.link.unwrap_or(true);
                Ok(vec![resolved])
            }
        }
    }

    fn prebuilt(
        &self,
        target: &Target,
        dependency: &Dependency,
        reference: &str,
        linkage: Linkage,
        top_level: bool,
    ) -> PbxResult<ResolvedDependency> {
        let path = self.prebuilt_path(target.platform, reference, linkage);
        let expected = self.spec.base_path.join(&path);
        if !self.fs.exists(&expected) {
            if self.strict {
                return Err(GenerationError::UnresolvedDependency {
                    target: target.name.clone(),
                    reference: reference.to_string(),
                    expected,
                }
                .into());
            }
            debug!(reference, path = %expected.display(), "Prebuilt framework not built yet");
        }

        let applies = dependency.applies_to(target.platform);
        let is_app = target.product_type.is_application();
        let dynamic = linkage == Linkage::Dynamic;
        let embeds = applies && dependency.embed.unwrap_or(is_app && dynamic);
        let scripted = embeds && target.platform != Platform::Macos;

        Ok(ResolvedDependency {
            reference: reference.to_string(),
            kind: ResolvedKind::Prebuilt { path, linkage },
            top_level,
            link: applies
                && linkage != Linkage::None
                && dependency
                    .link
                    .unwrap_or(top_level || is_app || target.product_type.is_test()),
            embed: embeds && !scripted,
            code_sign: dependency.code_sign.unwrap_or(true),
            weak: dependency.weak,
            copy_script: scripted,
        })
    }

    /// Path of a prebuilt framework relative to the base path.
    fn prebuilt_path(&self, platform: Platform, reference: &str, linkage: Linkage) -> String {
        let root = self.spec.options.framework_build_path().trim_end_matches('/');
        let flavour = if linkage == Linkage::Static { "/Static" } else { "" };
        let file = if extension(reference).is_some() {
            reference.to_string()
        } else {
            format!("{reference}.framework")
        };
        format!("{root}/{}{flavour}/{file}", platform.framework_dir())
    }

    /// Breadth-first expansion of the frameworks bundled with a prebuilt
    /// dependency. Everything found is non-top-level.
    fn related_frameworks(
        &self,
        target: &Target,
        expansion: &Expansion<'_>,
    ) -> PbxResult<Vec<ResolvedDependency>> {
        let build_root: PathBuf = self
            .spec
            .base_path
            .join(self.spec.options.framework_build_path());

        let mut found = Vec::new();
        let mut visited = HashSet::from([expansion.reference.clone()]);
        let mut queue = VecDeque::from([expansion.reference.clone()]);

        while let Some(reference) = queue.pop_front() {
            let Some(mut related) =
                self.metadata
                    .related_frameworks(&build_root, &reference, target.platform)
            else {
                if reference == expansion.reference {
                    warn!(reference = %reference, "No metadata for prebuilt framework");
                }
                continue;
            };
            related.sort();
            for name in related {
                if visited.insert(name.clone()) {
                    found.push(self.prebuilt(
                        target,
                        expansion.dependency,
                        &name,
                        expansion.linkage,
                        false,
                    )?);
                    queue.push_back(name);
                }
            }
        }
        Ok(found)
    }
}

/// Location of an SDK reference: frameworks live under the SDK's
/// `System/Library/Frameworks`, libraries under `usr/lib`.
fn sdk_location(reference: &str, root: Option<&str>) -> (String, String) {
    if let Some(root) = root {
        return (reference.to_string(), root.to_string());
    }
    if reference.contains('/') {
        return (reference.to_string(), "SDKROOT".to_string());
    }
    let path = match extension(reference) {
        Some("framework") => format!("System/Library/Frameworks/{reference}"),
        _ => format!("usr/lib/{reference}"),
    };
    (path, "SDKROOT".to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::Path;

    use super::*;
    use crate::application::services::test_support::TreeFs;
    use crate::domain::{Package, VersionRequirement};
    use crate::error::PbxError;

    #[derive(Default)]
    struct Metadata(HashMap<String, Vec<String>>);

    impl FrameworkMetadata for Metadata {
        fn related_frameworks(
            &self,
            _build_root: &Path,
            reference: &str,
            _platform: Platform,
        ) -> Option<Vec<String>> {
            self.0.get(reference).cloned()
        }
    }

    fn app() -> Target {
        Target::new("App", ProductType::Application, Platform::Ios)
    }

    fn references(resolved: &[ResolvedDependency]) -> Vec<&str> {
        resolved.iter().map(|r| r.reference.as_str()).collect()
    }

    #[test]
    fn direct_and_transitive_framework_collapse() {
        let mut metadata = Metadata::default();
        metadata.0.insert(
            "ReactiveCocoa".into(),
            vec!["ReactiveSwift".into(), "Result".into()],
        );
        metadata
            .0
            .insert("ReactiveSwift".into(), vec!["Result".into()]);

        let mut cocoa = Dependency::prebuilt("ReactiveCocoa");
        if let DependencyKind::Prebuilt { find_related, .. } = &mut cocoa.kind {
            *find_related = Some(true);
        }
        let target = app()
            .with_dependency(cocoa)
            .with_dependency(Dependency::prebuilt("ReactiveSwift"));
        let spec = ProjectSpec::new("Demo", "/p").with_target(target.clone());
        let fs = TreeFs::default();

        let resolved = DependencyResolver::new(&spec, &fs, &metadata, false)
            .resolve(&target)
            .unwrap();

        assert_eq!(references(&resolved), vec!["ReactiveCocoa", "ReactiveSwift", "Result"]);
        assert!(resolved[1].top_level);
        assert!(!resolved[2].top_level);
        assert_eq!(resolved.iter().filter(|r| r.link).count(), 3);
    }

    #[test]
    fn missing_prebuilt_degrades_unless_strict() {
        let target = app().with_dependency(Dependency::prebuilt("Alamofire"));
        let spec = ProjectSpec::new("Demo", "/p").with_target(target.clone());
        let fs = TreeFs::default();
        let metadata = Metadata::default();

        let lenient = DependencyResolver::new(&spec, &fs, &metadata, false)
            .resolve(&target)
            .unwrap();
        assert_eq!(
            lenient[0].kind,
            ResolvedKind::Prebuilt {
                path: "Carthage/Build/iOS/Alamofire.framework".into(),
                linkage: Linkage::Dynamic,
            }
        );
        assert!(lenient[0].copy_script);
        assert!(!lenient[0].embed);

        let err = DependencyResolver::new(&spec, &fs, &metadata, true)
            .resolve(&target)
            .unwrap_err();
        assert!(matches!(
            err,
            PbxError::Application(crate::application::ApplicationError::Generation(
                GenerationError::UnresolvedDependency { .. }
            ))
        ));

        fs.add_dir("/p/Carthage/Build/iOS/Alamofire.framework");
        assert!(
            DependencyResolver::new(&spec, &fs, &metadata, true)
                .resolve(&target)
                .is_ok()
        );
    }

    #[test]
    fn static_prebuilt_frameworks_live_under_static() {
        let mut dependency = Dependency::prebuilt("Lib");
        if let DependencyKind::Prebuilt { linkage, .. } = &mut dependency.kind {
            *linkage = Linkage::Static;
        }
        let target = Target::new("Tool", ProductType::CommandLineTool, Platform::Macos)
            .with_dependency(dependency);
        let spec = ProjectSpec::new("Demo", "/p").with_target(target.clone());
        let fs = TreeFs::default();
        let resolved = DependencyResolver::new(&spec, &fs, &Metadata::default(), false)
            .resolve(&target)
            .unwrap();
        assert_eq!(
            resolved[0].kind,
            ResolvedKind::Prebuilt {
                path: "Carthage/Build/Mac/Static/Lib.framework".into(),
                linkage: Linkage::Static,
            }
        );
        assert!(resolved[0].link);
        assert!(!resolved[0].embed);
    }

    #[test]
    fn unknown_target_fails_with_reference() {
        let target = app().with_dependency(Dependency::target("Ghost"));
        let spec = ProjectSpec::new("Demo", "/p").with_target(target.clone());
        let fs = TreeFs::default();
        let err = DependencyResolver::new(&spec, &fs, &Metadata::default(), false)
            .resolve(&target)
            .unwrap_err();
        assert!(err.to_string().contains("Ghost"));
    }

    #[test]
    fn frameworks_are_linked_and_embedded_into_apps() {
        let framework = Target::new("Core", ProductType::Framework, Platform::Ios);
        let extension = Target::new("Widget", ProductType::AppExtension, Platform::Ios);
        let target = app()
            .with_dependency(Dependency::target("Core"))
            .with_dependency(Dependency::target("Widget"));
        let spec = ProjectSpec::new("Demo", "/p")
            .with_target(target.clone())
            .with_target(framework)
            .with_target(extension);
        let fs = TreeFs::default();

        let resolved = DependencyResolver::new(&spec, &fs, &Metadata::default(), false)
            .resolve(&target)
            .unwrap();
        assert!(resolved[0].link && resolved[0].embed);
        assert!(!resolved[1].link && resolved[1].embed);
    }

    #[test]
    fn platform_filter_keeps_entry_but_drops_linking() {
        let target = app()
            .with_dependency(Dependency::sdk("AppKit.framework").for_platform(Platform::Macos))
            .with_dependency(Dependency::sdk("libz.tbd"));
        let spec = ProjectSpec::new("Demo", "/p").with_target(target.clone());
        let fs = TreeFs::default();

        let resolved = DependencyResolver::new(&spec, &fs, &Metadata::default(), false)
            .resolve(&target)
            .unwrap();
        assert_eq!(resolved.len(), 2);
        assert!(!resolved[0].link);
        assert!(resolved[1].link);
        assert_eq!(
            resolved[1].kind,
            ResolvedKind::Sdk {
                path: "usr/lib/libz.tbd".into(),
                source_tree: "SDKROOT".into(),
            }
        );
    }

    #[test]
    fn packages_expand_per_product() {
        let target = app().with_dependency(Dependency::package(
            "Kit",
            vec!["KitCore".into(), "KitUI".into()],
        ));
        let mut spec = ProjectSpec::new("Demo", "/p").with_target(target.clone());
        spec.packages.insert(
            "Kit".into(),
            Package {
                url: "https://example.com/kit".into(),
                requirement: VersionRequirement::From("1.0.0".into()),
            },
        );
        let fs = TreeFs::default();
        let resolved = DependencyResolver::new(&spec, &fs, &Metadata::default(), false)
            .resolve(&target)
            .unwrap();
        assert_eq!(references(&resolved), vec!["KitCore", "KitUI"]);
    }

    #[test]
    fn transitive_linking_pulls_upstream_dependencies() {
        let core = Target::new("Core", ProductType::Framework, Platform::Ios)
            .with_dependency(Dependency::sdk("CoreData.framework"))
            .with_dependency(Dependency {
                target_only: true,
                ..Dependency::sdk("Private.framework")
            });
        let target = app().with_dependency(Dependency::target("Core"));
        let mut spec = ProjectSpec::new("Demo", "/p")
            .with_target(target.clone())
            .with_target(core);
        spec.options.transitively_link_dependencies = true;
        let fs = TreeFs::default();

        let resolved = DependencyResolver::new(&spec, &fs, &Metadata::default(), false)
            .resolve(&target)
            .unwrap();
        assert_eq!(references(&resolved), vec!["Core", "CoreData.framework"]);
        assert!(!resolved[1].top_level);
    }

    #[test]
    fn transitive_linking_expands_upstream_related_frameworks() {
        let mut metadata = Metadata::default();
        metadata
            .0
            .insert("ReactiveCocoa".into(), vec!["ReactiveSwift".into()]);

        let mut cocoa = Dependency::prebuilt("ReactiveCocoa");
        if let DependencyKind::Prebuilt { find_related, .. } = &mut cocoa.kind {
            *find_related = Some(true);
        }
        let core = Target::new("Core", ProductType::Framework, Platform::Ios).with_dependency(cocoa);
        let target = app().with_dependency(Dependency::target("Core"));
        let mut spec = ProjectSpec::new("Demo", "/p")
            .with_target(target.clone())
            .with_target(core.clone());
        spec.options.transitively_link_dependencies = true;
        let fs = TreeFs::default();
        let resolver = DependencyResolver::new(&spec, &fs, &metadata, false);

        let upstream = resolver.resolve(&core).unwrap();
        assert_eq!(references(&upstream), vec!["ReactiveCocoa", "ReactiveSwift"]);

        let resolved = resolver.resolve(&target).unwrap();
        assert_eq!(
            references(&resolved),
            vec!["Core", "ReactiveCocoa", "ReactiveSwift"]
        );
        assert!(resolved[1..].iter().all(|r| !r.top_level && r.link));
    }
}
