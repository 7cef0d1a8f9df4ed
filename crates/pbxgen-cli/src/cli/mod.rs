//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums.  No generation logic lives here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pbxgen_core::domain::GlobBehavior;

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

/// Spec file looked up in the current directory when `--spec` is absent.
pub const DEFAULT_SPEC_FILE: &str = "project.json";

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "pbxgen",
    bin_name = "pbxgen",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "Generate Xcode projects from a declarative spec",
    long_about = "pbxgen turns a JSON project spec into a deterministic \
                  .xcodeproj bundle: project file, shared schemes and \
                  Info.plist declarations.",
    after_help = "EXAMPLES:\n\
        \x20 pbxgen generate\n\
        \x20 pbxgen generate --spec App/project.json --project build --force\n\
        \x20 pbxgen generate --use-cache --jobs 4\n\
        \x20 pbxgen completions bash > /usr/share/bash-completion/completions/pbxgen",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate the project bundle for a spec.
    #[command(
        visible_alias = "gen",
        about = "Generate an Xcode project",
        after_help = "EXAMPLES:\n\
            \x20 pbxgen generate\n\
            \x20 pbxgen generate --spec project.json --force\n\
            \x20 pbxgen generate --dry-run --output-format json"
    )]
    Generate(GenerateArgs),

    /// Print the cache signature of a spec.
    #[command(
        about = "Print the cache signature of a spec",
        after_help = "EXAMPLES:\n\
            \x20 pbxgen signature\n\
            \x20 pbxgen signature --spec App/project.json"
    )]
    Signature(SignatureArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 pbxgen completions bash > ~/.local/share/bash-completion/completions/pbxgen\n\
            \x20 pbxgen completions zsh  > ~/.zfunc/_pbxgen\n\
            \x20 pbxgen completions fish > ~/.config/fish/completions/pbxgen.fish"
    )]
    Completions(CompletionsArgs),

    /// Inspect the pbxgen configuration.
    #[command(
        about = "Configuration management",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 pbxgen config get generation.jobs\n\
            \x20 pbxgen config list\n\
            \x20 pbxgen config path"
    )]
    Config(ConfigCommands),
}

// ── generate ──────────────────────────────────────────────────────────────────

/// Arguments for `pbxgen generate`.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Path to the JSON project spec.
    #[arg(
        short = 's',
        long = "spec",
        value_name = "FILE",
        default_value = DEFAULT_SPEC_FILE,
        help = "Project spec file"
    )]
    pub spec: PathBuf,

    /// Directory the bundle is written into. Defaults to the spec's directory.
    #[arg(
        short = 'p',
        long = "project",
        value_name = "DIR",
        help = "Output directory (default: the spec's directory)"
    )]
    pub project: Option<PathBuf>,

    /// Replace an existing bundle.
    #[arg(long = "force", help = "Overwrite an existing project bundle")]
    pub force: bool,

    /// Skip generation when the spec has not changed since the last run.
    #[arg(long = "use-cache", help = "Skip generation if nothing changed")]
    pub use_cache: bool,

    /// Explicit cache file. Implies `--use-cache`.
    #[arg(
        long = "cache-path",
        value_name = "FILE",
        help = "Cache file location (implies --use-cache)"
    )]
    pub cache_path: Option<PathBuf>,

    /// Worker pool size for per-target resolution.
    #[arg(
        short = 'j',
        long = "jobs",
        value_name = "N",
        value_parser = clap::value_parser!(u16).range(1..),
        help = "Number of worker threads"
    )]
    pub jobs: Option<u16>,

    /// Fail on prebuilt frameworks that are missing on disk.
    #[arg(long = "strict", help = "Fail on unresolved prebuilt dependencies")]
    pub strict: bool,

    /// Include pattern convention, when the spec does not pick one.
    #[arg(
        long = "glob",
        value_name = "BEHAVIOR",
        value_enum,
        help = "Default glob behavior for include patterns"
    )]
    pub glob: Option<GlobArg>,

    /// Directory of JSON setting presets replacing the built-in ones.
    #[arg(long = "presets", value_name = "DIR", help = "Setting presets directory")]
    pub presets: Option<PathBuf>,

    /// Resolve and render without writing anything.
    #[arg(long = "dry-run", help = "Show what would be written without writing")]
    pub dry_run: bool,

    /// Do not run the spec's pre/post generation commands.
    #[arg(long = "no-commands", help = "Skip preGenCommand and postGenCommand")]
    pub no_commands: bool,
}

// ── signature ─────────────────────────────────────────────────────────────────

/// Arguments for `pbxgen signature`.
#[derive(Debug, Args)]
pub struct SignatureArgs {
    /// Path to the JSON project spec.
    #[arg(
        short = 's',
        long = "spec",
        value_name = "FILE",
        default_value = DEFAULT_SPEC_FILE,
        help = "Project spec file"
    )]
    pub spec: PathBuf,
}

// ── completions ───────────────────────────────────────────────────────────────

/// Arguments for `pbxgen completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── config subcommands ────────────────────────────────────────────────────────

/// Subcommands for `pbxgen config`.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a configuration key.
    Get {
        /// Dotted key path, e.g. `generation.jobs`.
        key: String,
    },
    /// Print all configuration values.
    List,
    /// Print the path to the default configuration file.
    Path,
}

// ── value enums ───────────────────────────────────────────────────────────────

/// Include pattern conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GlobArg {
    #[value(name = "bash-v3")]
    BashV3,
    #[value(name = "bash-v4", alias = "bash")]
    BashV4,
    Gradle,
}

impl From<GlobArg> for GlobBehavior {
    fn from(arg: GlobArg) -> Self {
        match arg {
            GlobArg::BashV3 => Self::BashV3,
            GlobArg::BashV4 => Self::BashV4,
            GlobArg::Gradle => Self::Gradle,
        }
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, Parser};

    #[test]
    fn verify_cli_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_defaults_to_project_json() {
        let cli = Cli::parse_from(["pbxgen", "generate"]);
        let Commands::Generate(args) = cli.command else {
            panic!("expected Generate command");
        };
        assert_eq!(args.spec, PathBuf::from(DEFAULT_SPEC_FILE));
        assert!(args.project.is_none());
        assert!(!args.force);
        assert!(args.jobs.is_none());
    }

    #[test]
    fn gen_alias_and_flags() {
        let cli = Cli::parse_from([
            "pbxgen", "gen", "-s", "App/spec.json", "-p", "out", "-j", "4", "--glob", "bash",
            "--force",
        ]);
        let Commands::Generate(args) = cli.command else {
            panic!("expected Generate command");
        };
        assert_eq!(args.spec, PathBuf::from("App/spec.json"));
        assert_eq!(args.project, Some(PathBuf::from("out")));
        assert_eq!(args.jobs, Some(4));
        assert_eq!(args.glob, Some(GlobArg::BashV4));
        assert!(args.force);
    }

    #[test]
    fn zero_jobs_is_rejected() {
        assert!(Cli::try_parse_from(["pbxgen", "generate", "--jobs", "0"]).is_err());
    }

    #[test]
    fn glob_arg_maps_to_core() {
        assert_eq!(GlobBehavior::from(GlobArg::Gradle), GlobBehavior::Gradle);
        assert_eq!(GlobBehavior::from(GlobArg::BashV3), GlobBehavior::BashV3);
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        let result = Cli::try_parse_from(["pbxgen", "--quiet", "--verbose", "signature"]);
        assert!(result.is_err());
    }
}
