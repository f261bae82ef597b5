//! `logfwd generate` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use logfwd_core::config::LogFwdConfig;
use logfwd_generator::compile;

use crate::cli::GenerateArgs;
use crate::commands::load_input;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `generate` command.
///
/// Without `--out` the configuration itself is the output: text mode writes
/// it verbatim, JSON mode embeds it in the report.
pub async fn execute(
    args: GenerateArgs,
    config: &LogFwdConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let input = load_input(&args.spec, args.secrets.as_deref(), args.target, config).await?;
    let options = config.compile_options()?;

    let generated = compile(
        input.target,
        &input.spec,
        &input.secrets,
        &input.config_maps,
        &options,
    )?;

    let credentials_out = match (&args.credentials_out, &generated.aws_credentials) {
        (Some(path), Some(credentials)) => {
            write_file(path, credentials).await?;
            info!(path = %path.display(), "credentials file written");
            Some(path.display().to_string())
        }
        (Some(path), None) => {
            warn!(
                path = %path.display(),
                "no role-based CloudWatch outputs, credentials file not written"
            );
            None
        }
        (None, Some(_)) => {
            warn!("role-based CloudWatch outputs need a credentials file, use --credentials-out");
            None
        }
        (None, None) => None,
    };

    let conf = match &args.out {
        Some(path) => {
            write_file(path, &generated.conf).await?;
            info!(path = %path.display(), bytes = generated.conf.len(), "configuration written");
            None
        }
        None => Some(generated.conf.clone()),
    };

    let report = GenerateReport {
        spec: args.spec.display().to_string(),
        target: input.target.to_string(),
        out: args.out.as_ref().map(|p| p.display().to_string()),
        bytes: generated.conf.len(),
        credentials_out,
        warnings: generated.warnings.iter().map(ToString::to_string).collect(),
        conf,
    };

    writer.render(&report)
}

async fn write_file(path: &Path, content: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    Ok(())
}

/// Result of a single `generate` run.
#[derive(Serialize)]
pub struct GenerateReport {
    /// Forwarder spec file path
    pub spec: String,
    /// Collector dialect
    pub target: String,
    /// Configuration file written, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out: Option<String>,
    /// Size of the generated configuration
    pub bytes: usize,
    /// Credentials file written, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_out: Option<String>,
    /// Ignored fields, one line per warning
    pub warnings: Vec<String>,
    /// Configuration text when no `--out` was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conf: Option<String>,
}

impl Render for GenerateReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        // configuration only, no header
        if let Some(ref conf) = self.conf {
            return write!(w, "{conf}");
        }

        writeln!(w, "Generated {} configuration from {}", self.target.bold(), self.spec)?;
        if let Some(ref out) = self.out {
            writeln!(w, "  Output:      {} ({} bytes)", out, self.bytes)?;
        }
        if let Some(ref credentials) = self.credentials_out {
            writeln!(w, "  Credentials: {}", credentials)?;
        }
        for warning in &self.warnings {
            writeln!(w, "  {}: {}", "Warning".yellow().bold(), warning)?;
        }
        Ok(())
    }
}
