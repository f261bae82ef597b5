//! 에러 타입 — 도메인별 에러 정의

/// logfwd 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogFwdError {
    /// 도구 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 포워더 스펙 로딩/검사 에러
    #[error("spec error: {0}")]
    Spec(#[from] SpecError),

    /// 설정 생성(컴파일) 에러
    #[error("generate error: {0}")]
    Generate(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 포워더 스펙 에러
#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    /// 스펙 파일을 찾을 수 없음
    #[error("spec file not found: {path}")]
    FileNotFound { path: String },

    /// 스펙 파싱 실패
    #[error("failed to parse {format} spec: {reason}")]
    ParseFailed {
        /// 입력 형식 (yaml, json)
        format: String,
        /// 실패 사유
        reason: String,
    },

    /// 같은 종류 안에서 이름이 중복됨
    #[error("duplicate {kind} name '{name}'")]
    DuplicateName {
        /// 이름 종류 (input, output, pipeline, filter)
        kind: String,
        /// 중복된 이름
        name: String,
    },

    /// 파이프라인이 존재하지 않는 입력/출력/필터를 참조함
    #[error("pipeline '{pipeline}' references unknown {kind} '{reference}'")]
    UnknownReference {
        /// 파이프라인 이름
        pipeline: String,
        /// 참조 종류 (input, output, filter)
        kind: String,
        /// 참조된 이름
        reference: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_top_level() {
        let err: LogFwdError = ConfigError::FileNotFound {
            path: "/etc/logfwd/logfwd.toml".to_owned(),
        }
        .into();
        assert!(matches!(err, LogFwdError::Config(_)));
        assert!(err.to_string().contains("logfwd.toml"));
    }

    #[test]
    fn unknown_reference_display() {
        let err = SpecError::UnknownReference {
            pipeline: "p1".to_owned(),
            kind: "output".to_owned(),
            reference: "loki-2".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("p1"));
        assert!(msg.contains("output"));
        assert!(msg.contains("loki-2"));
    }

    #[test]
    fn parse_failed_display_names_format() {
        let err = SpecError::ParseFailed {
            format: "yaml".to_owned(),
            reason: "mapping values are not allowed".to_owned(),
        };
        assert!(err.to_string().starts_with("failed to parse yaml spec"));
    }

    #[test]
    fn io_error_converts_to_top_level() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: LogFwdError = io.into();
        assert!(matches!(err, LogFwdError::Io(_)));
    }
}
