//! 입력 스펙
//!
//! 내장 입력(`application`, `infrastructure`, `audit`)과 사용자 정의 입력
//! (네임스페이스/레이블 셀렉터 기반 애플리케이션 입력, HTTP/syslog 리시버)을 표현합니다.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 내장 애플리케이션 입력 이름
pub const INPUT_APPLICATION: &str = "application";
/// 내장 인프라 입력 이름
pub const INPUT_INFRASTRUCTURE: &str = "infrastructure";
/// 내장 감사(audit) 입력 이름
pub const INPUT_AUDIT: &str = "audit";

/// 기본 HTTP 리시버 포트
pub const DEFAULT_HTTP_RECEIVER_PORT: u16 = 8443;
/// 기본 syslog 리시버 포트
pub const DEFAULT_SYSLOG_RECEIVER_PORT: u16 = 10514;

/// 소스 타입
///
/// 선언 순서가 곧 소스 카탈로그의 고정 순서입니다 (`Ord` 파생).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// 애플리케이션 컨테이너 로그
    Application,
    /// 인프라 컨테이너 + 노드 저널 로그
    Infrastructure,
    /// 감사 로그
    Audit,
    /// 리시버 (HTTP, syslog)
    Receiver,
}

impl SourceType {
    /// 소스 타입 이름을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Application => INPUT_APPLICATION,
            Self::Infrastructure => INPUT_INFRASTRUCTURE,
            Self::Audit => INPUT_AUDIT,
            Self::Receiver => "receiver",
        }
    }

    /// 내장 입력 이름을 소스 타입으로 변환합니다.
    pub fn from_builtin(name: &str) -> Option<Self> {
        match name {
            INPUT_APPLICATION => Some(Self::Application),
            INPUT_INFRASTRUCTURE => Some(Self::Infrastructure),
            INPUT_AUDIT => Some(Self::Audit),
            _ => None,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 입력 정의
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSpec {
    /// 입력 이름 (파이프라인 `inputRefs`에서 참조)
    pub name: String,
    /// 애플리케이션 로그 입력
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<ApplicationInput>,
    /// 인프라 로그 입력
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure: Option<InfrastructureInput>,
    /// 감사 로그 입력
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit: Option<AuditInput>,
    /// 리시버 입력
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<ReceiverSpec>,
}

impl InputSpec {
    /// 이 입력이 생성하는 소스 타입
    ///
    /// 여러 블록이 지정된 경우 카탈로그 순서상 첫 번째가 우선합니다.
    pub fn source_type(&self) -> Option<SourceType> {
        if self.application.is_some() {
            Some(SourceType::Application)
        } else if self.infrastructure.is_some() {
            Some(SourceType::Infrastructure)
        } else if self.audit.is_some() {
            Some(SourceType::Audit)
        } else if self.receiver.is_some() {
            Some(SourceType::Receiver)
        } else {
            None
        }
    }

    /// 네임스페이스 또는 레이블 셀렉터로 라우팅이 필요한 애플리케이션 입력인지 여부
    pub fn is_routed_application(&self) -> bool {
        self.application
            .as_ref()
            .is_some_and(ApplicationInput::has_selector)
    }
}

/// 애플리케이션 입력 선택 조건
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInput {
    /// 수집할 네임스페이스 목록 (비어 있으면 전체)
    #[serde(default)]
    pub namespaces: Vec<String>,
    /// 파드 레이블 셀렉터
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
}

impl ApplicationInput {
    /// 선택 조건이 하나라도 있는지 확인합니다.
    pub fn has_selector(&self) -> bool {
        !self.namespaces.is_empty() || !self.match_labels().is_empty()
    }

    /// 레이블 일치 조건 (키 정렬 순)
    pub fn match_labels(&self) -> &BTreeMap<String, String> {
        static EMPTY: BTreeMap<String, String> = BTreeMap::new();
        self.selector
            .as_ref()
            .map(|s| &s.match_labels)
            .unwrap_or(&EMPTY)
    }
}

/// 레이블 셀렉터
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    /// 정확히 일치해야 하는 레이블
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}

/// 인프라 입력
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureInput {}

/// 감사 입력
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditInput {}

/// 리시버 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiverType {
    /// HTTP 서버
    Http,
    /// syslog 리스너
    Syslog,
}

/// HTTP 리시버 전송 포맷
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpReceiverFormat {
    /// Kubernetes API 서버 감사 웹훅 포맷
    #[serde(rename = "kubeAPIAudit")]
    KubeApiAudit,
}

/// 리시버 입력
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiverSpec {
    /// 리시버 종류
    #[serde(rename = "type")]
    pub kind: ReceiverType,
    /// 수신 포트 (미지정 시 종류별 기본값)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// HTTP 전용 옵션
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpReceiverOptions>,
}

impl ReceiverSpec {
    /// 유효 포트를 반환합니다.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(match self.kind {
            ReceiverType::Http => DEFAULT_HTTP_RECEIVER_PORT,
            ReceiverType::Syslog => DEFAULT_SYSLOG_RECEIVER_PORT,
        })
    }

    /// HTTP 포맷 (미지정 시 None)
    pub fn http_format(&self) -> Option<HttpReceiverFormat> {
        self.http.as_ref().and_then(|h| h.format)
    }
}

/// HTTP 리시버 옵션
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpReceiverOptions {
    /// 전송 포맷
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<HttpReceiverFormat>,
}
