//! 원시 소스 카탈로그
//!
//! 소스 타입 집합이 어떤 원시 수집 소스를 필요로 하는지 결정합니다.
//! 리시버는 사용자 입력마다 만들어지므로 방언별 빌더가 직접 다룹니다.
//! 파이프라인이 실제로 참조하는 입력을 고르는 질의도 여기 있습니다.

use std::collections::BTreeSet;

use logfwd_core::forwarder::{ForwarderSpec, INPUT_APPLICATION, InputSpec, SourceType};

/// 컨테이너 로그 경로
pub const CONTAINER_LOGS_PATH: &str = "/var/log/pods/*/*/*.log";
/// 호스트 저널 디렉토리
pub const JOURNAL_DIR: &str = "/var/log/journal";
/// 리눅스 감사 로그
pub const HOST_AUDIT_PATH: &str = "/var/log/audit/audit.log";
/// Kubernetes API 서버 감사 로그
pub const K8S_AUDIT_PATH: &str = "/var/log/kube-apiserver/audit.log";
/// OpenShift API 서버 감사 로그
pub const OPENSHIFT_AUDIT_PATHS: [&str; 2] = [
    "/var/log/oauth-apiserver/audit.log",
    "/var/log/openshift-apiserver/audit.log",
];
/// OVN ACL 감사 로그
pub const OVN_AUDIT_PATH: &str = "/var/log/ovn/acl-audit-log.log";

/// 노드 로컬 원시 소스
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RawSource {
    Container,
    Journal,
    HostAudit,
    K8sAudit,
    OpenshiftAudit,
    OvnAudit,
}

impl RawSource {
    /// 감사 로그 소스 (카탈로그 순서)
    pub const AUDIT: [RawSource; 4] = [
        RawSource::HostAudit,
        RawSource::K8sAudit,
        RawSource::OpenshiftAudit,
        RawSource::OvnAudit,
    ];

    /// Vector 원시 소스 ID
    pub fn id(&self) -> &'static str {
        match self {
            Self::Container => "raw_container_logs",
            Self::Journal => "raw_journal_logs",
            Self::HostAudit => "raw_host_audit_logs",
            Self::K8sAudit => "raw_k8s_audit_logs",
            Self::OpenshiftAudit => "raw_openshift_audit_logs",
            Self::OvnAudit => "raw_ovn_audit_logs",
        }
    }

    /// 정규화 단계 ID
    pub fn normalized_id(&self) -> &'static str {
        match self {
            Self::Container => "container_logs",
            Self::Journal => "journal_logs",
            Self::HostAudit => "host_audit_logs",
            Self::K8sAudit => "k8s_audit_logs",
            Self::OpenshiftAudit => "openshift_audit_logs",
            Self::OvnAudit => "ovn_audit_logs",
        }
    }

    /// 레코드에 붙는 내부 태그 (Fluentd 태그와 같은 값)
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Container => "kubernetes",
            Self::Journal => "journal",
            Self::HostAudit => "linux-audit.log",
            Self::K8sAudit => "k8s-audit.log",
            Self::OpenshiftAudit => "openshift-audit.log",
            Self::OvnAudit => "ovn-audit.log",
        }
    }

    /// tail 대상 경로
    pub fn paths(&self) -> Vec<&'static str> {
        match self {
            Self::Container => vec![CONTAINER_LOGS_PATH],
            Self::Journal => vec![JOURNAL_DIR],
            Self::HostAudit => vec![HOST_AUDIT_PATH],
            Self::K8sAudit => vec![K8S_AUDIT_PATH],
            Self::OpenshiftAudit => OPENSHIFT_AUDIT_PATHS.to_vec(),
            Self::OvnAudit => vec![OVN_AUDIT_PATH],
        }
    }

    /// 설정 파일에 붙일 설명
    pub fn description(&self) -> &'static str {
        match self {
            Self::Container => "Logs from containers (including openshift containers)",
            Self::Journal => "Logs from linux journal",
            Self::HostAudit => "Logs from host audit",
            Self::K8sAudit => "Logs from kubernetes audit",
            Self::OpenshiftAudit => "Logs from openshift audit",
            Self::OvnAudit => "Logs from ovn audit",
        }
    }
}

/// 소스 타입 집합에 필요한 원시 소스 (카탈로그 순서, 중복 없음)
pub fn raw_sources(types: &BTreeSet<SourceType>) -> Vec<RawSource> {
    let mut sources = BTreeSet::new();
    for source_type in types {
        match source_type {
            SourceType::Application => {
                sources.insert(RawSource::Container);
            }
            SourceType::Infrastructure => {
                sources.insert(RawSource::Container);
                sources.insert(RawSource::Journal);
            }
            SourceType::Audit => sources.extend(RawSource::AUDIT),
            SourceType::Receiver => {}
        }
    }
    sources.into_iter().collect()
}

/// 컨테이너 tail에서 제외할 경로 패턴
///
/// 수집기 자신과 로그 저장소 구성 요소의 파드, 압축/임시 파일을 제외합니다.
pub fn excluded_container_paths(namespace: &str, collector_name: &str) -> Vec<String> {
    vec![
        format!("/var/log/pods/{namespace}_{collector_name}-*/*/*.log"),
        format!("/var/log/pods/{namespace}_logfilesmetricexporter-*/*/*.log"),
        format!("/var/log/pods/{namespace}_elasticsearch-*/*/*.log"),
        format!("/var/log/pods/{namespace}_kibana-*/*/*.log"),
        format!("/var/log/pods/{namespace}_*/loki*/*.log"),
        format!("/var/log/pods/{namespace}_*/gateway/*.log"),
        format!("/var/log/pods/{namespace}_*/opa/*.log"),
        "/var/log/pods/*/*/*.gz".to_owned(),
        "/var/log/pods/*/*/*.tmp".to_owned(),
    ]
}

/// 파이프라인이 참조하는 입력 이름
pub fn referenced_inputs(spec: &ForwarderSpec) -> BTreeSet<&str> {
    spec.pipelines
        .iter()
        .flat_map(|p| p.input_refs.iter().map(String::as_str))
        .collect()
}

/// 파이프라인이 참조하는 리시버 입력 (스펙 순서)
pub fn referenced_receivers(spec: &ForwarderSpec) -> Vec<&InputSpec> {
    let refs = referenced_inputs(spec);
    spec.inputs
        .iter()
        .filter(|i| i.receiver.is_some() && refs.contains(i.name.as_str()))
        .collect()
}

/// 셀렉터 경로를 가진 사용자 애플리케이션 입력 (이름 순)
pub fn routed_inputs(spec: &ForwarderSpec) -> Vec<&InputSpec> {
    let refs = referenced_inputs(spec);
    let mut inputs: Vec<&InputSpec> = spec
        .inputs
        .iter()
        .filter(|i| i.is_routed_application() && refs.contains(i.name.as_str()))
        .collect();
    inputs.sort_by(|a, b| a.name.cmp(&b.name));
    inputs
}

/// 셀렉터 없는 애플리케이션 소비자(내장 입력 포함)가 있는지 여부
pub fn has_unrouted_application(spec: &ForwarderSpec) -> bool {
    referenced_inputs(spec).into_iter().any(|r| match spec.input(r) {
        Some(input) => {
            input.source_type() == Some(SourceType::Application) && !input.is_routed_application()
        }
        None => r == INPUT_APPLICATION,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(list: &[SourceType]) -> BTreeSet<SourceType> {
        list.iter().copied().collect()
    }

    #[test]
    fn application_needs_container_tail_only() {
        assert_eq!(
            raw_sources(&types(&[SourceType::Application])),
            vec![RawSource::Container]
        );
    }

    #[test]
    fn infrastructure_adds_journal() {
        assert_eq!(
            raw_sources(&types(&[SourceType::Infrastructure])),
            vec![RawSource::Container, RawSource::Journal]
        );
    }

    #[test]
    fn application_and_infrastructure_share_container_tail() {
        let sources = raw_sources(&types(&[
            SourceType::Application,
            SourceType::Infrastructure,
        ]));
        assert_eq!(sources, vec![RawSource::Container, RawSource::Journal]);
    }

    #[test]
    fn audit_needs_four_tailers_in_order() {
        assert_eq!(
            raw_sources(&types(&[SourceType::Audit])),
            RawSource::AUDIT.to_vec()
        );
    }

    #[test]
    fn receiver_needs_no_node_local_source() {
        assert!(raw_sources(&types(&[SourceType::Receiver])).is_empty());
    }

    #[test]
    fn exclusions_cover_collector_and_compressed_files() {
        let paths = excluded_container_paths("openshift-logging", "collector");
        assert!(paths.contains(&"/var/log/pods/openshift-logging_collector-*/*/*.log".to_owned()));
        assert!(paths.contains(&"/var/log/pods/*/*/*.gz".to_owned()));
        assert!(paths.contains(&"/var/log/pods/*/*/*.tmp".to_owned()));
        assert_eq!(paths.len(), 9);
    }

    #[test]
    fn openshift_audit_has_two_paths() {
        assert_eq!(RawSource::OpenshiftAudit.paths().len(), 2);
    }
}
