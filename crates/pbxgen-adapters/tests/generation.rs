//! End-to-end generation against real directory trees.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use pbxgen_adapters::{
    BuiltinPresets, LocalFilesystem, VersionFileMetadata, cache_for_spec, load_spec,
};
use pbxgen_core::{
    application::{
        Generator, GeneratorOptions,
        services::{
            DependencyResolver, ResolvedKind, SchemeSynthesizer, SettingsResolver,
            bundle_path, serializer::render_project,
        },
    },
    domain::{
        AnyTarget, BuildAction, BuildFor, BuildTarget, Config, Dependency, DependencyKind, Platform,
        ProductType, ProjectSpec, Scheme, SettingValue, Settings, Target, TargetSource,
    },
};
use tempfile::TempDir;
use walkdir::WalkDir;

fn generator(jobs: usize) -> Generator {
    Generator::new(
        Box::new(LocalFilesystem::new()),
        Box::new(BuiltinPresets::new()),
        Box::new(VersionFileMetadata::new()),
        GeneratorOptions {
            jobs,
            ..GeneratorOptions::default()
        },
    )
}

fn tree(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (path, content) in files {
        let path = dir.path().join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

/// Every file under `root`, relative path to contents.
fn snapshot(root: &Path) -> BTreeMap<PathBuf, String> {
    WalkDir::new(root)
        .into_iter()
        .map(Result::unwrap)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            (
                e.path().strip_prefix(root).unwrap().to_path_buf(),
                fs::read_to_string(e.path()).unwrap(),
            )
        })
        .collect()
}

fn sample_tree() -> TempDir {
    tree(&[
        ("App/AppDelegate.swift", "import UIKit"),
        ("App/Views/RootView.swift", "import SwiftUI"),
        ("App/Base.lproj/Main.storyboard", "<document/>"),
        ("App/en.lproj/Localizable.strings", "\"a\" = \"b\";"),
        ("App/de.lproj/Localizable.strings", "\"a\" = \"c\";"),
        ("App/Assets.xcassets/Contents.json", "{}"),
        ("Core/Model.swift", "struct Model {}"),
        ("Core/Core.h", "#import <Foundation/Foundation.h>"),
        ("Tests/ModelTests.swift", "import XCTest"),
    ])
}

fn sample_spec(base: &Path) -> ProjectSpec {
    ProjectSpec::new("Sample", base)
        .with_target(
            Target::new("App", ProductType::Application, Platform::Ios)
                .with_source("App")
                .with_dependency(Dependency::target("Core"))
                .with_dependency(Dependency::sdk("StoreKit.framework"))
                .with_scheme(Default::default()),
        )
        .with_target(
            Target::new("Core", ProductType::Framework, Platform::Ios).with_source("Core"),
        )
        .with_target(
            Target::new("CoreTests", ProductType::UnitTestBundle, Platform::Ios)
                .with_source("Tests")
                .with_dependency(Dependency::target("Core")),
        )
}

#[test]
fn consecutive_runs_are_byte_identical() {
    let dir = sample_tree();
    let spec = sample_spec(dir.path());
    let generator = generator(4);

    let graph = generator.resolve(&spec).unwrap();
    generator.write(&graph, dir.path(), false).unwrap();
    let first = snapshot(dir.path());

    let graph = generator.resolve(&spec).unwrap();
    generator.write(&graph, dir.path(), true).unwrap();
    let second = snapshot(dir.path());

    assert_eq!(first, second);
    assert!(first.contains_key(Path::new("Sample.xcodeproj/project.pbxproj")));
    assert!(first.contains_key(Path::new("Sample.xcodeproj/xcshareddata/xcschemes/App.xcscheme")));
    assert!(first.contains_key(Path::new("App/Info.plist")));
    assert!(first.contains_key(Path::new("Core/Info.plist")));
}

#[test]
fn worker_count_does_not_change_bytes() {
    let dir = sample_tree();
    let spec = sample_spec(dir.path());

    let one = render_project(&generator(1).resolve(&spec).unwrap());
    for jobs in [2, 8] {
        assert_eq!(one, render_project(&generator(jobs).resolve(&spec).unwrap()));
    }
}

#[test]
fn excludes_match_directories_by_name() {
    let dir = tree(&[
        ("Sources/A/a.swift", ""),
        ("Sources/A/B/b.swift", ""),
        ("Sources/B/b.swift", ""),
    ]);
    let spec = ProjectSpec::new("Demo", dir.path()).with_target(
        Target::new("Tool", ProductType::CommandLineTool, Platform::Macos)
            .with_source(TargetSource::new("Sources").with_excludes(["B"])),
    );

    let project = render_project(&generator(2).resolve(&spec).unwrap());

    assert!(project.contains("a.swift in Sources"));
    assert!(!project.contains("b.swift"));
}

#[test]
fn explicit_settings_win_over_groups() {
    let mut spec = ProjectSpec::new("Demo", "/p");
    spec.setting_groups.insert(
        "base".into(),
        Settings::new().with_setting("X", "1").with_setting("Y", "1"),
    );
    spec.setting_groups
        .insert("debug".into(), Settings::new().with_setting("Y", "2"));
    let mut target = Target::new("App", ProductType::Application, Platform::Ios);
    target.settings = Settings::new()
        .with_group("base")
        .with_group("debug")
        .with_setting("Y", "3")
        .with_setting("Z", "1");
    spec.targets.push(target);

    let presets = BuiltinPresets::new();
    let resolver = SettingsResolver::new(&spec, &presets);
    let resolved = resolver
        .resolve(&spec.targets[0].settings, &Config::debug("Debug"))
        .unwrap();

    let expected: BTreeMap<String, SettingValue> = [("X", "1"), ("Y", "3"), ("Z", "1")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), SettingValue::from(v)))
        .collect();
    assert_eq!(resolved, expected);

    let full = resolver
        .target_settings(AnyTarget::Native(&spec.targets[0]), &Config::debug("Debug"))
        .unwrap();
    assert_eq!(full["Y"], SettingValue::from("3"));
    assert_eq!(full["TARGETED_DEVICE_FAMILY"], SettingValue::from("1,2"));
}

#[test]
fn scheme_actions_default_by_config_kind() {
    let spec = ProjectSpec::new("Demo", "/p")
        .with_target(Target::new("App", ProductType::Application, Platform::Ios))
        .with_scheme(Scheme::new(
            "App",
            BuildAction {
                targets: vec![BuildTarget::new("App", BuildFor::all())],
                ..BuildAction::default()
            },
        ));

    let schemes = SchemeSynthesizer::new(&spec).synthesize_all().unwrap();
    let scheme = &schemes[0];

    let config = |c: Option<&String>| c.cloned().unwrap_or_default();
    assert_eq!(config(scheme.run.as_ref().unwrap().common.config.as_ref()), "Debug");
    assert_eq!(config(scheme.test.as_ref().unwrap().common.config.as_ref()), "Debug");
    assert_eq!(config(scheme.analyze.as_ref().unwrap().config.as_ref()), "Debug");
    assert_eq!(config(scheme.profile.as_ref().unwrap().common.config.as_ref()), "Release");
    assert_eq!(config(scheme.archive.as_ref().unwrap().common.config.as_ref()), "Release");
}

#[test]
fn shared_prebuilt_framework_is_linked_once() {
    let dir = tree(&[(
        "Carthage/Build/.ReactiveCocoa.version",
        r#"{ "iOS": [{ "name": "ReactiveCocoa", "hash": "a" }, { "name": "ReactiveSwift", "hash": "b" }] }"#,
    )]);

    let mut cocoa = Dependency::prebuilt("ReactiveCocoa");
    if let DependencyKind::Prebuilt { find_related, .. } = &mut cocoa.kind {
        *find_related = Some(true);
    }
    let target = Target::new("App", ProductType::Application, Platform::Ios)
        .with_dependency(cocoa)
        .with_dependency(Dependency::prebuilt("ReactiveSwift"));
    let spec = ProjectSpec::new("Demo", dir.path()).with_target(target);

    let fs = LocalFilesystem::new();
    let metadata = VersionFileMetadata::new();
    let resolved = DependencyResolver::new(&spec, &fs, &metadata, false)
        .resolve(&spec.targets[0])
        .unwrap();

    let swift: Vec<_> = resolved
        .iter()
        .filter(|d| matches!(d.kind, ResolvedKind::Prebuilt { .. }))
        .filter(|d| d.reference == "ReactiveSwift")
        .collect();
    assert_eq!(swift.len(), 1, "{resolved:#?}");
    assert!(swift[0].top_level);
}

#[test]
fn duplicate_source_declaration_builds_once() {
    let dir = tree(&[("App/main.swift", "")]);
    let spec = ProjectSpec::new("Demo", dir.path()).with_target(
        Target::new("Tool", ProductType::CommandLineTool, Platform::Macos)
            .with_source("App/main.swift")
            .with_source("App/main.swift"),
    );

    let project = render_project(&generator(2).resolve(&spec).unwrap());
    assert_eq!(project.matches("/* main.swift in Sources */ = {").count(), 1);
}

#[test]
fn unchanged_spec_skips_generation() {
    let dir = sample_tree();
    let spec = sample_spec(dir.path());
    let generator = generator(2);
    let fs = LocalFilesystem::new();
    let cache_dir = dir.path().join(".cache");
    let cache = cache_for_spec(&fs, None, Some(&cache_dir), &dir.path().join("project.json"));

    let graph = generator.resolve(&spec).unwrap();
    let bundle = bundle_path(&graph, dir.path());
    let signature = generator.signature(&spec).unwrap();
    assert!(!cache.should_skip(&signature, &bundle));

    generator.write(&graph, dir.path(), false).unwrap();
    cache.store(&signature);
    assert!(cache.should_skip(&generator.signature(&spec).unwrap(), &bundle));

    fs::write(dir.path().join("Core/Extra.swift"), "").unwrap();
    assert!(!cache.should_skip(&generator.signature(&spec).unwrap(), &bundle));
}

#[test]
fn json_spec_round_trip_through_the_loader() {
    let dir = sample_tree();
    let spec_path = dir.path().join("project.json");
    fs::write(
        &spec_path,
        r#"{
            "name": "FromJson",
            "options": { "bundleIdPrefix": "com.example" },
            "targets": [
                {
                    "name": "App",
                    "type": "application",
                    "platform": "iOS",
                    "sources": [{ "path": "App" }],
                    "dependencies": [{ "target": "Core" }],
                    "scheme": {}
                },
                { "name": "Core", "type": "framework", "platform": "iOS", "sources": [{ "path": "Core" }] }
            ]
        }"#,
    )
    .unwrap();

    let spec = load_spec(&spec_path).unwrap();
    let generator = generator(2);
    let graph = generator.resolve(&spec).unwrap();
    generator.write(&graph, &spec.base_path, false).unwrap();

    let project = fs::read_to_string(dir.path().join("FromJson.xcodeproj/project.pbxproj")).unwrap();
    assert!(project.contains("PRODUCT_BUNDLE_IDENTIFIER = com.example.App;"));
    assert!(project.contains("Core.framework in Embed Frameworks"));
}

#[test]
fn existing_bundle_is_kept_without_override() {
    let dir = sample_tree();
    let spec = sample_spec(dir.path());
    let generator = generator(2);
    fs::create_dir_all(dir.path().join("Sample.xcodeproj")).unwrap();
    fs::write(dir.path().join("Sample.xcodeproj/project.pbxproj"), "old").unwrap();

    let graph = generator.resolve(&spec).unwrap();
    assert!(generator.write(&graph, dir.path(), false).is_err());
    assert_eq!(
        fs::read_to_string(dir.path().join("Sample.xcodeproj/project.pbxproj")).unwrap(),
        "old"
    );
}
