//! 생성기 에러 타입
//!
//! [`GeneratorError`]는 컴파일 한 번에서 발생할 수 있는 세 가지 치명적 에러를
//! 표현합니다. 어떤 에러든 발생하면 부분 출력 없이 컴파일이 중단됩니다.
//! `From<GeneratorError> for LogFwdError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.

use logfwd_core::error::LogFwdError;

/// 설정 생성 도메인 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeneratorError {
    /// 스키마로 강제할 수 없는 의미 규칙 위반
    #[error("invalid spec: '{name}': {reason}")]
    InvalidSpec {
        /// 문제가 된 출력 또는 파이프라인 이름
        name: String,
        /// 위반 사유
        reason: String,
    },

    /// 참조한 시크릿/configmap 또는 필수 키가 없음
    #[error("missing reference: {kind} '{name}' key '{key}'")]
    MissingReference {
        /// 참조 종류 (secret, configmap)
        kind: String,
        /// 참조 이름
        name: String,
        /// 키 (참조 자체가 없으면 빈 문자열)
        key: String,
    },

    /// 템플릿 렌더링 실패 (프로그래밍 오류)
    #[error("render failure in element '{element}': {reason}")]
    RenderFailure {
        /// 실패한 엘리먼트 이름
        element: String,
        /// 실패 사유
        reason: String,
    },
}

impl GeneratorError {
    pub(crate) fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSpec {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing_secret(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingReference {
            kind: "secret".to_owned(),
            name: name.into(),
            key: key.into(),
        }
    }

    pub(crate) fn missing_config_map(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingReference {
            kind: "configmap".to_owned(),
            name: name.into(),
            key: key.into(),
        }
    }

    pub(crate) fn render(element: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RenderFailure {
            element: element.into(),
            reason: reason.into(),
        }
    }

    /// 사용자에게 보여야 하는 에러인지 여부
    ///
    /// 렌더링 실패는 프로그래밍 오류이므로 사용자 상태로 노출하지 않습니다.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::RenderFailure { .. })
    }
}

impl From<GeneratorError> for LogFwdError {
    fn from(err: GeneratorError) -> Self {
        LogFwdError::Generate(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_spec_display() {
        let err = GeneratorError::invalid("syslog-out", "compression is not supported");
        let msg = err.to_string();
        assert!(msg.contains("syslog-out"));
        assert!(msg.contains("compression"));
    }

    #[test]
    fn missing_reference_display() {
        let err = GeneratorError::missing_secret("splunk-secret", "hecToken");
        let msg = err.to_string();
        assert!(msg.contains("secret"));
        assert!(msg.contains("splunk-secret"));
        assert!(msg.contains("hecToken"));
    }

    #[test]
    fn render_failure_is_not_user_error() {
        assert!(!GeneratorError::render("remap", "duplicate id").is_user_error());
        assert!(GeneratorError::invalid("x", "y").is_user_error());
        assert!(GeneratorError::missing_config_map("ca", "ca.crt").is_user_error());
    }

    #[test]
    fn converts_to_logfwd_error() {
        let err = GeneratorError::invalid("out", "bad");
        let top: LogFwdError = err.into();
        assert!(matches!(top, LogFwdError::Generate(ref m) if m.contains("out")));
    }
}
