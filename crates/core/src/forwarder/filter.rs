//! 필터 스펙
//!
//! 현재 지원하는 필터는 Kubernetes API 감사 정책(`kubeAPIAudit`)입니다.

use serde::{Deserialize, Serialize};

/// 기본으로 `None` 레벨로 강제되는 응답 코드
pub const DEFAULT_OMIT_RESPONSE_CODES: [u16; 4] = [404, 409, 422, 429];

/// 필터 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterType {
    #[serde(rename = "kubeAPIAudit")]
    KubeApiAudit,
}

impl FilterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KubeApiAudit => "kubeAPIAudit",
        }
    }
}

/// 필터 정의
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FilterType,
    #[serde(default, rename = "kubeAPIAudit", skip_serializing_if = "Option::is_none")]
    pub kube_api_audit: Option<KubeApiAudit>,
}

/// 감사 이벤트 레벨
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditLevel {
    /// 이벤트 폐기
    None,
    /// 요청/응답 본문 제거
    Metadata,
    /// 응답 본문 제거
    Request,
    /// 모두 유지
    RequestResponse,
}

impl AuditLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Metadata => "Metadata",
            Self::Request => "Request",
            Self::RequestResponse => "RequestResponse",
        }
    }
}

/// 감사 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditStage {
    RequestReceived,
    ResponseStarted,
    ResponseComplete,
    Panic,
}

impl AuditStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestReceived => "RequestReceived",
            Self::ResponseStarted => "ResponseStarted",
            Self::ResponseComplete => "ResponseComplete",
            Self::Panic => "Panic",
        }
    }
}

/// 그룹 단위 리소스 선택
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupResources {
    /// API 그룹 (빈 문자열은 core 그룹)
    #[serde(default)]
    pub group: String,
    /// 리소스 이름 목록 (비어 있으면 그룹 전체)
    #[serde(default)]
    pub resources: Vec<String>,
}

/// 감사 정책 규칙
///
/// 비어 있는 조건은 모두 일치로 취급합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRule {
    pub level: AuditLevel,
    /// 사용자 이름 (`*` 글롭 지원)
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub user_groups: Vec<String>,
    #[serde(default)]
    pub verbs: Vec<String>,
    #[serde(default)]
    pub resources: Vec<GroupResources>,
    #[serde(default)]
    pub namespaces: Vec<String>,
    #[serde(default, rename = "nonResourceURLs")]
    pub non_resource_urls: Vec<String>,
    #[serde(default)]
    pub omit_stages: Vec<AuditStage>,
}

impl AuditRule {
    /// 레벨만 지정된 규칙
    pub fn with_level(level: AuditLevel) -> Self {
        Self {
            level,
            users: Vec::new(),
            user_groups: Vec::new(),
            verbs: Vec::new(),
            resources: Vec::new(),
            namespaces: Vec::new(),
            non_resource_urls: Vec::new(),
            omit_stages: Vec::new(),
        }
    }
}

/// `kubeAPIAudit` 필터 본문
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeApiAudit {
    /// 선언 순서대로 평가되는 규칙 (첫 일치가 결정)
    #[serde(default)]
    pub rules: Vec<AuditRule>,
    /// 모든 규칙에 앞서 제외되는 단계
    #[serde(default)]
    pub omit_stages: Vec<AuditStage>,
    /// `None`으로 강제되는 응답 코드
    #[serde(default = "default_omit_response_codes")]
    pub omit_response_codes: Vec<u16>,
}

impl Default for KubeApiAudit {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            omit_stages: Vec::new(),
            omit_response_codes: default_omit_response_codes(),
        }
    }
}

fn default_omit_response_codes() -> Vec<u16> {
    DEFAULT_OMIT_RESPONSE_CODES.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omit_response_codes_default_when_absent() {
        let yaml = r#"
name: my-policy
type: kubeAPIAudit
kubeAPIAudit:
  rules:
    - level: RequestResponse
      users: ["*apiserver"]
    - level: None
      verbs: [get]
    - level: Metadata
"#;
        let filter: FilterSpec = serde_yaml::from_str(yaml).unwrap();
        let audit = filter.kube_api_audit.unwrap();
        assert_eq!(audit.omit_response_codes, vec![404, 409, 422, 429]);
        assert_eq!(audit.rules.len(), 3);
        assert_eq!(audit.rules[0].users, vec!["*apiserver"]);
        assert_eq!(audit.rules[2].level, AuditLevel::Metadata);
    }

    #[test]
    fn explicit_empty_response_codes_are_kept() {
        let yaml = r#"
rules: []
omitResponseCodes: []
"#;
        let audit: KubeApiAudit = serde_yaml::from_str(yaml).unwrap();
        assert!(audit.omit_response_codes.is_empty());
    }

    #[test]
    fn rule_parses_resources_and_urls() {
        let yaml = r#"
level: Request
resources:
  - group: apps
    resources: [deployments]
nonResourceURLs: ["/healthz*"]
omitStages: [RequestReceived]
"#;
        let rule: AuditRule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.resources[0].group, "apps");
        assert_eq!(rule.non_resource_urls, vec!["/healthz*"]);
        assert_eq!(rule.omit_stages, vec![AuditStage::RequestReceived]);
    }
}
