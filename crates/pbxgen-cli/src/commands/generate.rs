//! Implementation of the `pbxgen generate` command.
//!
//! Dispatch sequence:
//! 1. Load the spec and derive `GeneratorOptions` from flags and config
//! 2. Compare cache signatures when caching is on, and stop if unchanged
//! 3. Run the spec's pre-generation command
//! 4. Resolve the object graph
//! 5. Write the bundle (or describe it for `--dry-run`)
//! 6. Store the signature and run the post-generation command

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::json;
use tracing::{debug, info, instrument};

use pbxgen_adapters::{LocalFilesystem, cache_for_spec};
use pbxgen_core::{
    application::{
        GeneratorOptions,
        services::writer::{RenderedFile, render_bundle},
    },
    domain::{GlobBehavior, ObjectGraph, ProjectSpec},
};

use crate::{
    cli::GenerateArgs,
    commands::{apply_glob_default, build_generator, load_spec_file, spec_dir},
    config::AppConfig,
    error::{CliError, CliResult, IntoCli},
    output::OutputManager,
};

/// Execute the `pbxgen generate` command.
#[instrument(skip_all, fields(spec = %args.spec.display()))]
pub fn execute(args: GenerateArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let mut spec = load_spec_file(&args.spec)?;
    apply_glob_default(
        &mut spec,
        args.glob
            .map(GlobBehavior::from)
            .or(config.generation.glob_behavior),
    );

    let project_dir = match &args.project {
        Some(dir) if dir.is_file() => {
            return Err(CliError::InvalidInput {
                message: format!("--project {} is a file, not a directory", dir.display()),
            });
        }
        Some(dir) => dir.clone(),
        None => spec_dir(&args.spec)?,
    };
    if spec.targets.is_empty() && spec.aggregate_targets.is_empty() {
        output.warning("The spec declares no targets")?;
    }
    let bundle = project_dir.join(format!("{}.xcodeproj", spec.name));
    let options = generator_options(&args, &config);
    debug!(jobs = options.jobs, strict = options.strict, "Generator options");

    let presets_dir = args.presets.as_deref().or(config.generation.presets_dir.as_deref());
    let generator = build_generator(options, presets_dir)?;

    // ── cache ─────────────────────────────────────────────────────────────
    let cache_fs = LocalFilesystem::new();
    let use_cache = !args.dry_run
        && (args.use_cache || args.cache_path.is_some() || config.cache.enabled);
    let cache = use_cache.then(|| {
        cache_for_spec(
            &cache_fs,
            args.cache_path.as_deref(),
            config.cache.dir.as_deref(),
            &args.spec,
        )
    });
    let signature = match &cache {
        Some(_) => Some(generator.signature(&spec)?),
        None => None,
    };
    if let (Some(cache), Some(signature)) = (&cache, &signature) {
        if cache.should_skip(signature, &bundle) {
            info!(bundle = %bundle.display(), "Spec unchanged, skipping generation");
            return report_unchanged(&spec, &bundle, &output);
        }
    }

    // ── generate ──────────────────────────────────────────────────────────
    if !args.dry_run && !args.no_commands {
        if let Some(command) = &spec.options.pre_gen_command {
            run_spec_command(command, &project_dir, &output)?;
        }
    }

    output.header(&format!("Generating '{}'...", spec.name))?;
    let graph = generator.resolve(&spec)?;

    if args.dry_run {
        return report_dry_run(&graph, &project_dir, &bundle, &output);
    }

    generator.write(&graph, &project_dir, args.force || config.generation.overwrite)?;
    info!(bundle = %bundle.display(), "Project generated");

    if let (Some(cache), Some(signature)) = (&cache, &signature) {
        cache.store(signature);
    }

    if !args.no_commands {
        if let Some(command) = &spec.options.post_gen_command {
            run_spec_command(command, &project_dir, &output)?;
        }
    }

    if output.is_json() {
        output.json(&json!({
            "project": spec.name,
            "bundle": bundle,
            "status": "generated",
            "schemes": graph.schemes.len(),
            "declarations": graph.declarations.len(),
        }))?;
    } else {
        output.success(&format!("Created project at {}", bundle.display()))?;
    }
    Ok(())
}

/// Flags win over configuration; configuration wins over core defaults.
fn generator_options(args: &GenerateArgs, config: &AppConfig) -> GeneratorOptions {
    let defaults = GeneratorOptions::default();
    GeneratorOptions {
        jobs: args
            .jobs
            .map(usize::from)
            .or(config.generation.jobs)
            .unwrap_or(defaults.jobs)
            .max(1),
        strict: args.strict || config.generation.strict,
        ..defaults
    }
}

/// Run a spec command through the platform shell in `dir`.
fn run_spec_command(command: &str, dir: &Path, output: &OutputManager) -> CliResult<()> {
    output.info(&format!("Running: {command}"))?;
    debug!(command, dir = %dir.display(), "Running spec command");

    let mut shell = if cfg!(windows) {
        let mut shell = Command::new("cmd");
        shell.arg("/C");
        shell
    } else {
        let mut shell = Command::new("/bin/sh");
        shell.arg("-c");
        shell
    };
    let status = shell
        .arg(command)
        .current_dir(dir)
        .status()
        .with_cli_context(|| format!("starting '{command}'"))?;

    if !status.success() {
        return Err(CliError::ExternalCommandFailed {
            command: command.to_string(),
            reason: status.to_string(),
        });
    }
    Ok(())
}

fn report_unchanged(spec: &ProjectSpec, bundle: &Path, output: &OutputManager) -> CliResult<()> {
    if output.is_json() {
        output.json(&json!({
            "project": spec.name,
            "bundle": bundle,
            "status": "unchanged",
        }))?;
    } else {
        output.success("Project has not changed since the cache was written")?;
    }
    Ok(())
}

/// Every file a write would produce, bundle files first.
fn planned_files(graph: &ObjectGraph, project_dir: &Path, bundle: &Path) -> Vec<(PathBuf, usize)> {
    let mut files: Vec<(PathBuf, usize)> = render_bundle(graph)
        .into_iter()
        .map(|RenderedFile { path, content }| (bundle.join(path), content.len()))
        .collect();
    files.extend(
        graph
            .declarations
            .iter()
            .map(|declaration| (project_dir.join(&declaration.path), 0)),
    );
    files
}

fn report_dry_run(
    graph: &ObjectGraph,
    project_dir: &Path,
    bundle: &Path,
    output: &OutputManager,
) -> CliResult<()> {
    let files = planned_files(graph, project_dir, bundle);
    if output.is_json() {
        let paths: Vec<&Path> = files.iter().map(|(path, _)| path.as_path()).collect();
        output.json(&json!({
            "project": graph.project_name,
            "bundle": bundle,
            "status": "dry-run",
            "files": paths,
        }))?;
        return Ok(());
    }

    output.info(&format!("Dry run: would write {} files", files.len()))?;
    for (path, bytes) in &files {
        if *bytes > 0 {
            output.print(&format!("  {} ({bytes} bytes)", path.display()))?;
        } else {
            output.print(&format!("  {}", path.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Commands};

    fn args(extra: &[&str]) -> GenerateArgs {
        let mut argv = vec!["pbxgen", "generate"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Generate(args) => args,
            other => panic!("expected Generate, got {other:?}"),
        }
    }

    #[test]
    fn flags_win_over_config() {
        let mut config = AppConfig::default();
        config.generation.jobs = Some(3);
        assert_eq!(generator_options(&args(&[]), &config).jobs, 3);
        assert_eq!(generator_options(&args(&["--jobs", "5"]), &config).jobs, 5);
    }

    #[test]
    fn zero_configured_jobs_still_runs() {
        let mut config = AppConfig::default();
        config.generation.jobs = Some(0);
        assert_eq!(generator_options(&args(&[]), &config).jobs, 1);
    }

    #[test]
    fn strict_from_either_source() {
        let mut config = AppConfig::default();
        assert!(!generator_options(&args(&[]), &config).strict);
        assert!(generator_options(&args(&["--strict"]), &config).strict);
        config.generation.strict = true;
        assert!(generator_options(&args(&[]), &config).strict);
    }

    #[test]
    fn planned_files_list_bundle_then_declarations() {
        use pbxgen_core::domain::{Declaration, Isa, Object, ObjectId};

        let mut graph = ObjectGraph::new("Demo");
        let root = ObjectId::new("ROOT");
        graph.insert(root.clone(), Object::new(Isa::Project, "Project object"));
        graph.set_root(root);
        graph.declarations.push(Declaration {
            path: "App/Info.plist".into(),
            properties: Default::default(),
        });
        let files = planned_files(&graph, Path::new("/p"), Path::new("/p/Demo.xcodeproj"));

        assert_eq!(files[0].0, PathBuf::from("/p/Demo.xcodeproj/project.pbxproj"));
        assert!(files[0].1 > 0);
        assert_eq!(files.last().unwrap().0, PathBuf::from("/p/App/Info.plist"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_spec_command_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let output = quiet_output();
        assert!(run_spec_command("true", dir.path(), &output).is_ok());
        let err = run_spec_command("exit 3", dir.path(), &output).unwrap_err();
        assert!(matches!(err, CliError::ExternalCommandFailed { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn spec_command_runs_in_the_project_dir() {
        let dir = tempfile::tempdir().unwrap();
        run_spec_command("touch marker", dir.path(), &quiet_output()).unwrap();
        assert!(dir.path().join("marker").is_file());
    }

    fn quiet_output() -> OutputManager {
        let cli = Cli::parse_from(["pbxgen", "--quiet", "--output-format", "plain", "signature"]);
        OutputManager::new(&cli.global, &AppConfig::default())
    }
}
