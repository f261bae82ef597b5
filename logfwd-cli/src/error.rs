//! CLI-specific error types and exit code mapping

use logfwd_core::error::LogFwdError;
use logfwd_generator::GeneratorError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The forwarder spec or its references were rejected.
    #[error("invalid forwarder spec: {0}")]
    Spec(String),

    /// The generator failed while rendering a valid spec.
    #[error("render error: {0}")]
    Render(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from logfwd-core.
    #[error("{0}")]
    Core(#[from] LogFwdError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                 |
    /// |------|-----------------------------------------|
    /// | 0    | Success                                 |
    /// | 1    | General / command error                 |
    /// | 2    | Configuration error                     |
    /// | 3    | Invalid spec or missing reference       |
    /// | 4    | Internal render failure                 |
    /// | 10   | IO error                                |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Spec(_) => 3,
            Self::Render(_) => 4,
            Self::Io(_) => 10,
            Self::Core(inner) => match inner {
                LogFwdError::Config(_) => 2,
                LogFwdError::Spec(_) => 3,
                LogFwdError::Io(_) => 10,
                LogFwdError::Generate(_) => 1,
            },
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}

impl From<GeneratorError> for CliError {
    fn from(e: GeneratorError) -> Self {
        if e.is_user_error() {
            Self::Spec(e.to_string())
        } else {
            Self::Render(e.to_string())
        }
    }
}
