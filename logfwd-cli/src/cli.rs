//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use logfwd_core::options::Target;

/// logfwd -- compile a log forwarder spec into a collector configuration.
///
/// Use `logfwd <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "logfwd", version, about, long_about = None)]
pub struct Cli {
    /// Path to the logfwd.toml configuration file.
    ///
    /// A missing file falls back to built-in defaults plus env overrides.
    #[arg(short, long, global = true, default_value = "logfwd.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

/// Collector dialect selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetArg {
    /// TOML configuration for Vector.
    Vector,
    /// Ruby-style configuration for Fluentd.
    Fluentd,
}

impl From<TargetArg> for Target {
    fn from(arg: TargetArg) -> Self {
        match arg {
            TargetArg::Vector => Target::Vector,
            TargetArg::Fluentd => Target::Fluentd,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a forwarder spec and write the collector configuration.
    Generate(GenerateArgs),

    /// Validate a forwarder spec with a dry compile.
    Validate(ValidateArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- generate ----

/// Compile a forwarder spec into a collector configuration.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Forwarder spec file (YAML, or JSON with a `.json` extension).
    pub spec: PathBuf,

    /// Collector dialect (default: `generator.target` from the config).
    #[arg(short, long)]
    pub target: Option<TargetArg>,

    /// Secrets and configmaps document referenced by the outputs.
    #[arg(short, long)]
    pub secrets: Option<PathBuf>,

    /// Write the configuration to this file instead of stdout.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Write the CloudWatch credentials file here when role-based outputs exist.
    #[arg(long)]
    pub credentials_out: Option<PathBuf>,
}

// ---- validate ----

/// Validate a forwarder spec without writing anything.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Forwarder spec file (YAML, or JSON with a `.json` extension).
    pub spec: PathBuf,

    /// Collector dialect (default: `generator.target` from the config).
    #[arg(short, long)]
    pub target: Option<TargetArg>,

    /// Secrets and configmaps document referenced by the outputs.
    #[arg(short, long)]
    pub secrets: Option<PathBuf>,
}

// ---- config ----

/// Manage logfwd configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, generator).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_generate_defaults() {
        let cli = Cli::try_parse_from(["logfwd", "generate", "clf.yaml"]).expect("parse succeeded");
        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.spec, PathBuf::from("clf.yaml"));
                assert!(args.target.is_none(), "target should default to config");
                assert!(args.secrets.is_none());
                assert!(args.out.is_none(), "output should default to stdout");
                assert!(args.credentials_out.is_none());
            }
            _ => panic!("expected Generate command"),
        }
        assert_eq!(cli.config, PathBuf::from("logfwd.toml"));
        assert_eq!(cli.output, OutputFormat::Text);
    }

    #[test]
    fn test_cli_parse_generate_all_flags() {
        let cli = Cli::try_parse_from([
            "logfwd",
            "generate",
            "clf.yaml",
            "--target",
            "fluentd",
            "--secrets",
            "refs.yaml",
            "--out",
            "fluent.conf",
            "--credentials-out",
            "credentials",
        ])
        .expect("parse succeeded");
        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.target, Some(TargetArg::Fluentd));
                assert_eq!(args.secrets, Some(PathBuf::from("refs.yaml")));
                assert_eq!(args.out, Some(PathBuf::from("fluent.conf")));
                assert_eq!(args.credentials_out, Some(PathBuf::from("credentials")));
            }
            _ => panic!("expected Generate command"),
        }
    }

    #[test]
    fn test_cli_parse_generate_requires_spec() {
        let result = Cli::try_parse_from(["logfwd", "generate"]);
        assert!(result.is_err(), "spec path is required");
    }

    #[test]
    fn test_cli_parse_invalid_target() {
        let result = Cli::try_parse_from(["logfwd", "generate", "clf.yaml", "--target", "logstash"]);
        assert!(result.is_err(), "unknown dialect should be rejected");
    }

    #[test]
    fn test_cli_parse_validate() {
        let cli = Cli::try_parse_from(["logfwd", "validate", "clf.json", "-t", "vector"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Validate(args) => {
                assert_eq!(args.spec, PathBuf::from("clf.json"));
                assert_eq!(args.target, Some(TargetArg::Vector));
            }
            _ => panic!("expected Validate command"),
        }
    }

    #[test]
    fn test_cli_parse_config_show_section() {
        let cli = Cli::try_parse_from(["logfwd", "config", "show", "--section", "generator"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Config(args) => match args.action {
                ConfigAction::Show { section } => {
                    assert_eq!(section, Some("generator".to_owned()));
                }
                _ => panic!("expected Show action"),
            },
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "logfwd",
            "config",
            "validate",
            "--output",
            "json",
            "--log-level",
            "debug",
            "--config",
            "/etc/logfwd/logfwd.toml",
        ])
        .expect("parse succeeded");
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.config, PathBuf::from("/etc/logfwd/logfwd.toml"));
    }

    #[test]
    fn test_target_arg_converts() {
        assert_eq!(Target::from(TargetArg::Vector), Target::Vector);
        assert_eq!(Target::from(TargetArg::Fluentd), Target::Fluentd);
    }

    #[test]
    fn test_cli_command_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
