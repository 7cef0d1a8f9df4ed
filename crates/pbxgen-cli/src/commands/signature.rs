//! `pbxgen signature`: print the cache signature of a spec.
//!
//! The value is the one `generate --use-cache` compares, so scripts can
//! detect spec or source changes without generating.

use serde_json::json;
use tracing::instrument;

use pbxgen_core::application::GeneratorOptions;

use crate::{
    cli::SignatureArgs,
    commands::{apply_glob_default, build_generator, load_spec_file},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

#[instrument(skip_all, fields(spec = %args.spec.display()))]
pub fn execute(args: SignatureArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let mut spec = load_spec_file(&args.spec)?;
    apply_glob_default(&mut spec, config.generation.glob_behavior);

    let options = GeneratorOptions {
        strict: config.generation.strict,
        ..GeneratorOptions::default()
    };
    let generator = build_generator(options, config.generation.presets_dir.as_deref())?;
    let signature = generator.signature(&spec)?;

    if output.is_json() {
        output.json(&json!({ "project": spec.name, "signature": signature }))?;
    } else {
        output.result(&signature)?;
    }
    Ok(())
}
