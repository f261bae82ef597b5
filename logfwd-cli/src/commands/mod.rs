//! Command handlers -- one module per subcommand

pub mod config;
pub mod generate;
pub mod validate;

use std::path::Path;

use tracing::{debug, info};

use logfwd_core::config::LogFwdConfig;
use logfwd_core::forwarder::ForwarderSpec;
use logfwd_core::options::Target;
use logfwd_core::secrets::{ConfigMaps, ReferenceBundle, Secrets};

use crate::cli::TargetArg;
use crate::error::CliError;

/// Load the effective configuration.
///
/// An existing file is loaded with env overrides applied. A missing file
/// falls back to built-in defaults, still honouring env overrides.
pub async fn load_config(path: &Path) -> Result<LogFwdConfig, CliError> {
    if tokio::fs::try_exists(path).await? {
        Ok(LogFwdConfig::load(path).await?)
    } else {
        let mut config = LogFwdConfig::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

/// Everything a single compile needs, loaded from disk.
pub(crate) struct CompileInput {
    pub spec: ForwarderSpec,
    pub secrets: Secrets,
    pub config_maps: ConfigMaps,
    pub target: Target,
}

/// Load the forwarder definition and its references and pick the target dialect.
///
/// The `--target` flag wins over `generator.target` from the configuration.
pub(crate) async fn load_input(
    spec_path: &Path,
    secrets_path: Option<&Path>,
    target: Option<TargetArg>,
    config: &LogFwdConfig,
) -> Result<CompileInput, CliError> {
    let target = match target {
        Some(arg) => arg.into(),
        None => config.target()?,
    };

    info!(path = %spec_path.display(), target = %target, "loading forwarder spec");
    let spec = ForwarderSpec::load(spec_path).await?;

    let bundle = match secrets_path {
        Some(path) => {
            debug!(path = %path.display(), "loading references");
            ReferenceBundle::load(path).await?
        }
        None => ReferenceBundle::default(),
    };

    Ok(CompileInput {
        spec,
        secrets: bundle.secrets(),
        config_maps: bundle.config_maps(),
        target,
    })
}
