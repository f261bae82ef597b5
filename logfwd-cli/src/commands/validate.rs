//! `logfwd validate` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use logfwd_core::config::LogFwdConfig;
use logfwd_generator::{Generated, compile};

use crate::cli::ValidateArgs;
use crate::commands::load_input;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `validate` command.
///
/// Runs a full compile and discards the output. The report is rendered in
/// both outcomes; an invalid spec still returns the original error so the
/// exit code tells spec problems apart from render failures.
pub async fn execute(
    args: ValidateArgs,
    config: &LogFwdConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let target = match args.target {
        Some(arg) => arg.into(),
        None => config.target()?,
    };

    let outcome = dry_compile(&args, config).await;

    let source = args.spec.display().to_string();
    let report = match &outcome {
        Ok(generated) => SpecValidationReport {
            source,
            target: target.to_string(),
            valid: true,
            warnings: generated.warnings.iter().map(ToString::to_string).collect(),
            errors: Vec::new(),
        },
        Err(e) => SpecValidationReport {
            source,
            target: target.to_string(),
            valid: false,
            warnings: Vec::new(),
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;
    outcome.map(|_| ())
}

async fn dry_compile(args: &ValidateArgs, config: &LogFwdConfig) -> Result<Generated, CliError> {
    let input = load_input(&args.spec, args.secrets.as_deref(), args.target, config).await?;
    let options = config.compile_options()?;
    let generated = compile(
        input.target,
        &input.spec,
        &input.secrets,
        &input.config_maps,
        &options,
    )?;
    info!(
        target = %input.target,
        bytes = generated.conf.len(),
        warnings = generated.warnings.len(),
        "forwarder spec is valid"
    );
    Ok(generated)
}

/// Forwarder spec validation report.
#[derive(Serialize)]
pub struct SpecValidationReport {
    /// Forwarder spec file path
    pub source: String,
    /// Collector dialect the forwarder was checked against
    pub target: String,
    /// Whether the forwarder compiles
    pub valid: bool,
    /// Ignored fields (empty if invalid)
    pub warnings: Vec<String>,
    /// Error messages (empty if valid)
    pub errors: Vec<String>,
}

impl Render for SpecValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Spec Validation: {} (target: {})",
            self.source.bold(),
            self.target
        )?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
            for warning in &self.warnings {
                writeln!(w, "  Warning: {}", warning.yellow())?;
            }
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}
