//! 컴파일 옵션 — 생성기에 전달되는 타입 있는 옵션 구조체
//!
//! 인식되는 모든 옵션이 필드로 열거되어 있으므로 알 수 없는 옵션은
//! 컴파일 단계에서 걸러집니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 기본 포워더 네임스페이스
pub const DEFAULT_NAMESPACE: &str = "openshift-logging";
/// 기본 포워더 이름
pub const DEFAULT_FORWARDER_NAME: &str = "collector";

/// 생성 대상 수집기 방언
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// TOML 스타일 설정
    #[default]
    Vector,
    /// Ruby 스타일 설정
    Fluentd,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Fluentd => "fluentd",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vector" => Ok(Self::Vector),
            "fluentd" => Ok(Self::Fluentd),
            other => Err(ConfigError::InvalidValue {
                field: "generator.target".to_owned(),
                reason: format!("unknown target '{other}', must be one of: vector, fluentd"),
            }),
        }
    }
}

/// 수집기 자체 로그 레벨
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorLogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
    Off,
}

impl VectorLogLevel {
    /// 허용되는 값 목록
    pub const ALLOWED: [&'static str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Off => "off",
        }
    }

    /// 수집기 API를 켜야 하는 상세 레벨인지 여부
    pub fn is_verbose(&self) -> bool {
        matches!(self, Self::Trace | Self::Debug)
    }
}

impl FromStr for VectorLogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "off" => Ok(Self::Off),
            other => Err(ConfigError::InvalidValue {
                field: "generator.vector_log_level".to_owned(),
                reason: format!(
                    "unknown level '{other}', must be one of: {}",
                    Self::ALLOWED.join(", ")
                ),
            }),
        }
    }
}

/// TLS 최소 버전
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TlsVersion {
    #[serde(rename = "VersionTLS10")]
    Tls10,
    #[serde(rename = "VersionTLS11")]
    Tls11,
    #[serde(rename = "VersionTLS12")]
    Tls12,
    #[serde(rename = "VersionTLS13")]
    Tls13,
}

impl TlsVersion {
    /// 설정 파일에 쓰는 버전 토큰 (`VersionTLS12`)
    pub fn token(&self) -> &'static str {
        match self {
            Self::Tls10 => "VersionTLS10",
            Self::Tls11 => "VersionTLS11",
            Self::Tls12 => "VersionTLS12",
            Self::Tls13 => "VersionTLS13",
        }
    }
}

impl FromStr for TlsVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VersionTLS10" => Ok(Self::Tls10),
            "VersionTLS11" => Ok(Self::Tls11),
            "VersionTLS12" => Ok(Self::Tls12),
            "VersionTLS13" => Ok(Self::Tls13),
            other => Err(ConfigError::InvalidValue {
                field: "generator.tls_profile.min_version".to_owned(),
                reason: format!("unknown TLS version '{other}'"),
            }),
        }
    }
}

/// TLS 보안 프로파일 스냅샷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsProfile {
    #[serde(rename = "minTLSVersion")]
    pub min_tls_version: TlsVersion,
    /// 선호 순서대로 나열된 암호 스위트
    #[serde(default)]
    pub ciphers: Vec<String>,
}

impl TlsProfile {
    /// Intermediate 프로파일 (TLS 1.2 이상)
    pub fn intermediate() -> Self {
        Self {
            min_tls_version: TlsVersion::Tls12,
            ciphers: [
                "TLS_AES_128_GCM_SHA256",
                "TLS_AES_256_GCM_SHA384",
                "TLS_CHACHA20_POLY1305_SHA256",
                "ECDHE-ECDSA-AES128-GCM-SHA256",
                "ECDHE-RSA-AES128-GCM-SHA256",
                "ECDHE-ECDSA-AES256-GCM-SHA384",
                "ECDHE-RSA-AES256-GCM-SHA384",
                "ECDHE-ECDSA-CHACHA20-POLY1305",
                "ECDHE-RSA-CHACHA20-POLY1305",
                "DHE-RSA-AES128-GCM-SHA256",
                "DHE-RSA-AES256-GCM-SHA384",
            ]
            .iter()
            .map(|c| (*c).to_owned())
            .collect(),
        }
    }

    /// Modern 프로파일 (TLS 1.3 전용)
    pub fn modern() -> Self {
        Self {
            min_tls_version: TlsVersion::Tls13,
            ciphers: [
                "TLS_AES_128_GCM_SHA256",
                "TLS_AES_256_GCM_SHA384",
                "TLS_CHACHA20_POLY1305_SHA256",
            ]
            .iter()
            .map(|c| (*c).to_owned())
            .collect(),
        }
    }

    /// 구분자로 이어 붙인 암호 스위트 목록
    pub fn cipher_list(&self, separator: &str) -> String {
        self.ciphers.join(separator)
    }
}

/// 생성기 컴파일 옵션
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions {
    /// 클러스터 TLS 프로파일 (최하위 우선순위)
    #[serde(default, rename = "clusterTLSProfile")]
    pub cluster_tls_profile: Option<TlsProfile>,
    /// 레거시 secure-forward 저장소 추가
    #[serde(default)]
    pub include_legacy_forward_config: bool,
    /// 레거시 syslog 저장소 추가
    #[serde(default)]
    pub include_legacy_syslog_config: bool,
    /// OTEL 스키마 변환 활성화
    #[serde(default)]
    pub annotation_enable_schema: bool,
    /// 리시버 전용(디플로이먼트) 모드
    #[serde(default)]
    pub annotation_collector_as_deployment: bool,
    #[serde(default)]
    pub vector_log_level: VectorLogLevel,
    /// 포워더 네임스페이스
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// 포워더 이름
    #[serde(default = "default_forwarder_name")]
    pub forwarder_name: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            cluster_tls_profile: None,
            include_legacy_forward_config: false,
            include_legacy_syslog_config: false,
            annotation_enable_schema: false,
            annotation_collector_as_deployment: false,
            vector_log_level: VectorLogLevel::default(),
            namespace: default_namespace(),
            forwarder_name: default_forwarder_name(),
        }
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_owned()
}

fn default_forwarder_name() -> String {
    DEFAULT_FORWARDER_NAME.to_owned()
}
