//! 설정 관리 — logfwd.toml 파싱 및 도구 설정
//!
//! [`LogFwdConfig`]는 CLI와 생성기의 동작을 결정하는 최상위 설정입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGFWD_GENERATOR_TARGET=fluentd` 형식)
//! 3. 설정 파일 (`logfwd.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logfwd_core::error::LogFwdError> {
//! use logfwd_core::config::LogFwdConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogFwdConfig::load("logfwd.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogFwdConfig::parse("[generator]\ntarget = \"fluentd\"")?;
//! let options = config.compile_options()?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogFwdError};
use crate::options::{CompileOptions, Target, TlsProfile, TlsVersion, VectorLogLevel};

/// logfwd 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogFwdConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 생성기 설정
    #[serde(default)]
    pub generator: GeneratorConfig,
}

impl LogFwdConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogFwdError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogFwdError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogFwdError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogFwdError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogFwdError> {
        toml::from_str(toml_str).map_err(|e| {
            LogFwdError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGFWD_{SECTION}_{FIELD}`
    /// 예: `LOGFWD_GENERATOR_VECTOR_LOG_LEVEL=debug`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGFWD_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGFWD_GENERAL_LOG_FORMAT");

        // Generator
        override_string(&mut self.generator.target, "LOGFWD_GENERATOR_TARGET");
        override_string(
            &mut self.generator.vector_log_level,
            "LOGFWD_GENERATOR_VECTOR_LOG_LEVEL",
        );
        override_string(&mut self.generator.namespace, "LOGFWD_GENERATOR_NAMESPACE");
        override_string(
            &mut self.generator.forwarder_name,
            "LOGFWD_GENERATOR_FORWARDER_NAME",
        );
        override_bool(
            &mut self.generator.include_legacy_forward_config,
            "LOGFWD_GENERATOR_INCLUDE_LEGACY_FORWARD_CONFIG",
        );
        override_bool(
            &mut self.generator.include_legacy_syslog_config,
            "LOGFWD_GENERATOR_INCLUDE_LEGACY_SYSLOG_CONFIG",
        );
        override_bool(
            &mut self.generator.annotation_enable_schema,
            "LOGFWD_GENERATOR_ANNOTATION_ENABLE_SCHEMA",
        );
        override_bool(
            &mut self.generator.annotation_collector_as_deployment,
            "LOGFWD_GENERATOR_ANNOTATION_COLLECTOR_AS_DEPLOYMENT",
        );

        // TLS profile
        override_string(
            &mut self.generator.tls_profile.min_version,
            "LOGFWD_TLS_PROFILE_MIN_VERSION",
        );
        override_csv(
            &mut self.generator.tls_profile.ciphers,
            "LOGFWD_TLS_PROFILE_CIPHERS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogFwdError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        self.generator.target.parse::<Target>()?;
        self.generator.vector_log_level.parse::<VectorLogLevel>()?;

        if self.generator.namespace.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "generator.namespace".to_owned(),
                reason: "namespace must not be empty".to_owned(),
            }
            .into());
        }

        if self.generator.forwarder_name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "generator.forwarder_name".to_owned(),
                reason: "forwarder name must not be empty".to_owned(),
            }
            .into());
        }

        // TLS 프로파일은 min_version이 비어 있으면 미설정으로 취급
        if !self.generator.tls_profile.min_version.is_empty() {
            self.generator.tls_profile.min_version.parse::<TlsVersion>()?;
        } else if !self.generator.tls_profile.ciphers.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "generator.tls_profile.ciphers".to_owned(),
                reason: "ciphers require min_version to be set".to_owned(),
            }
            .into());
        }

        Ok(())
    }

    /// 생성 대상 방언
    pub fn target(&self) -> Result<Target, LogFwdError> {
        Ok(self.generator.target.parse()?)
    }

    /// 생성기에 전달할 타입 있는 옵션을 만듭니다.
    pub fn compile_options(&self) -> Result<CompileOptions, LogFwdError> {
        let g = &self.generator;
        let cluster_tls_profile = if g.tls_profile.min_version.is_empty() {
            None
        } else {
            Some(TlsProfile {
                min_tls_version: g.tls_profile.min_version.parse()?,
                ciphers: g.tls_profile.ciphers.clone(),
            })
        };

        Ok(CompileOptions {
            cluster_tls_profile,
            include_legacy_forward_config: g.include_legacy_forward_config,
            include_legacy_syslog_config: g.include_legacy_syslog_config,
            annotation_enable_schema: g.annotation_enable_schema,
            annotation_collector_as_deployment: g.annotation_collector_as_deployment,
            vector_log_level: g.vector_log_level.parse()?,
            namespace: g.namespace.clone(),
            forwarder_name: g.forwarder_name.clone(),
        })
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 생성기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// 생성 대상 (vector, fluentd)
    pub target: String,
    /// 수집기 로그 레벨 (trace, debug, info, warn, error, off)
    pub vector_log_level: String,
    /// 포워더 네임스페이스
    pub namespace: String,
    /// 포워더 이름
    pub forwarder_name: String,
    /// 레거시 secure-forward 설정 포함
    pub include_legacy_forward_config: bool,
    /// 레거시 syslog 설정 포함
    pub include_legacy_syslog_config: bool,
    /// OTEL 스키마 변환 활성화
    pub annotation_enable_schema: bool,
    /// 리시버 전용 모드
    pub annotation_collector_as_deployment: bool,
    /// 클러스터 TLS 프로파일
    #[serde(default)]
    pub tls_profile: TlsProfileConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            target: "vector".to_owned(),
            vector_log_level: "warn".to_owned(),
            namespace: crate::options::DEFAULT_NAMESPACE.to_owned(),
            forwarder_name: crate::options::DEFAULT_FORWARDER_NAME.to_owned(),
            include_legacy_forward_config: false,
            include_legacy_syslog_config: false,
            annotation_enable_schema: false,
            annotation_collector_as_deployment: false,
            tls_profile: TlsProfileConfig::default(),
        }
    }
}

/// 클러스터 TLS 프로파일 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsProfileConfig {
    /// 최소 버전 토큰 (VersionTLS12 등, 비어 있으면 미설정)
    pub min_version: String,
    /// 암호 스위트 목록
    pub ciphers: Vec<String>,
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
