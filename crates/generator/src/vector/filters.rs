//! `kubeAPIAudit` 필터 VRL
//!
//! 순서가 있는 규칙표를 첫 일치 규칙이 결정하는 VRL로 옮깁니다.
//! 응답 코드 제외와 전역 단계 제외가 모든 규칙보다 먼저 적용되고,
//! 어떤 규칙에도 맞지 않은 이벤트는 시스템 이벤트 기본 규칙을 따릅니다.

use logfwd_core::forwarder::{AuditRule, AuditStage, FilterSpec, FilterType, KubeApiAudit};

use crate::engine::BoxedElement;
use crate::error::GeneratorError;
use crate::vector::elements::Remap;
use crate::vector::vrl::quote;

const READ_ONLY_VERBS: [&str; 3] = ["get", "list", "watch"];
/// 서비스 계정 사용자 이름 접두어 (`system:serviceaccount:<ns>[:<name>]`)
const SERVICE_ACCOUNT_PREFIX: &str = "system:serviceaccount:";
/// 서비스 계정 사용자 이름에서 네임스페이스를 꺼내는 패턴 (`$1`)
const SERVICE_ACCOUNT_NAMESPACE: &str = "^system:serviceaccount:([^:]*).*$";

/// 글롭 목록을 하나의 정규식으로 (`*`만 와일드카드)
pub fn glob_regex<S: AsRef<str>>(globs: &[S]) -> String {
    let alternatives: Vec<String> = globs
        .iter()
        .map(|g| {
            g.as_ref()
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*")
        })
        .collect();
    format!("^(?:{})$", alternatives.join("|")).replace('\'', r"\x27")
}

fn string_array<S: AsRef<str>>(items: &[S]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| quote(s.as_ref())).collect();
    format!("[{}]", quoted.join(", "))
}

fn stages(stages: &[AuditStage]) -> Vec<&'static str> {
    stages.iter().map(AuditStage::as_str).collect()
}

fn rule_conditions(rule: &AuditRule) -> Vec<String> {
    let mut conds = Vec::new();
    if !rule.users.is_empty() {
        conds.push(format!("match(user, r'{}')", glob_regex(&rule.users)));
    }
    if !rule.user_groups.is_empty() {
        let groups: Vec<String> = rule
            .user_groups
            .iter()
            .map(|g| format!("includes(groups, {})", quote(g)))
            .collect();
        conds.push(format!("({})", groups.join(" || ")));
    }
    if !rule.verbs.is_empty() {
        conds.push(format!("includes({}, verb)", string_array(&rule.verbs)));
    }
    if !rule.namespaces.is_empty() {
        conds.push(format!(
            "match(namespace, r'{}')",
            glob_regex(&rule.namespaces)
        ));
    }
    if !rule.resources.is_empty() {
        let resources: Vec<String> = rule
            .resources
            .iter()
            .map(|gr| {
                if gr.resources.is_empty() {
                    format!("api_group == {}", quote(&gr.group))
                } else {
                    format!(
                        "(api_group == {} && includes({}, resource))",
                        quote(&gr.group),
                        string_array(&gr.resources)
                    )
                }
            })
            .collect();
        conds.push(format!("is_resource && ({})", resources.join(" || ")));
    }
    if !rule.non_resource_urls.is_empty() {
        conds.push(format!(
            "!is_resource && match(uri, r'{}')",
            glob_regex(&rule.non_resource_urls)
        ));
    }
    conds
}

fn rule_branch(rule: &AuditRule) -> String {
    let mut guard = vec!["level == null".to_owned()];
    guard.extend(rule_conditions(rule));
    let level = quote(rule.level.as_str());
    if rule.omit_stages.is_empty() {
        format!("if {} {{ level = {level} }}", guard.join(" && "))
    } else {
        format!(
            "if {} {{\n  if includes({}, stage) {{ level = \"None\" }} else {{ level = {level} }}\n}}",
            guard.join(" && "),
            string_array(&stages(&rule.omit_stages))
        )
    }
}

const PRELUDE: &str = r#"verb = to_string(.verb) ?? ""
user = to_string(.user.username) ?? ""
groups = array(.user.groups) ?? []
namespace = to_string(.objectRef.namespace) ?? ""
api_group = to_string(.objectRef.apiGroup) ?? ""
resource = to_string(.objectRef.resource) ?? ""
subresource = to_string(.objectRef.subresource) ?? ""
if subresource != "" { resource = resource + "/" + subresource }
uri = to_string(.requestURI) ?? ""
stage = to_string(.stage) ?? ""
code = to_int(.responseStatus.code) ?? 0
is_resource = exists(.objectRef)
level = null"#;

const APPLY_LEVEL: &str = r#"if level == "None" { abort }
if level == "Metadata" { del(.requestObject); del(.responseObject) }
if level == "Request" { del(.responseObject) }
.k8s_audit_level = level"#;

/// `kubeAPIAudit` 정책 VRL
pub fn kube_api_audit_vrl(audit: &KubeApiAudit) -> String {
    let mut lines = vec![PRELUDE.to_owned()];

    if !audit.omit_response_codes.is_empty() {
        let codes: Vec<String> = audit
            .omit_response_codes
            .iter()
            .map(u16::to_string)
            .collect();
        lines.push(format!(
            "if includes([{}], code) {{ level = \"None\" }}",
            codes.join(", ")
        ));
    }
    if !audit.omit_stages.is_empty() {
        lines.push(format!(
            "if level == null && includes({}, stage) {{ level = \"None\" }}",
            string_array(&stages(&audit.omit_stages))
        ));
    }
    for rule in &audit.rules {
        lines.push(rule_branch(rule));
    }

    let read_only = string_array(&READ_ONLY_VERBS);
    lines.push(format!(
        r#"if level == null {{
  system = starts_with(user, "system:")
  own_scope = false
  if starts_with(user, "{SERVICE_ACCOUNT_PREFIX}") {{
    sa_namespace = replace(user, r'{SERVICE_ACCOUNT_NAMESPACE}', "$1")
    own_scope = namespace == "" || namespace == sa_namespace
  }}
  succeeded = code == 0 || (code >= 200 && code < 300)
  if system && includes({read_only}, verb) {{
    level = "None"
  }} else if own_scope && succeeded && !includes({read_only}, verb) {{
    level = "None"
  }} else if system {{
    level = "Request"
  }} else {{
    level = "RequestResponse"
  }}
}}"#
    ));
    lines.push(APPLY_LEVEL.to_owned());

    let body = lines.join("\n");
    format!(
        "if is_string(.auditID) && is_string(.stage) {{\n{}\n}}",
        crate::engine::indent(1, &body)
    )
}

/// 파이프라인 필터 엘리먼트 (`pipeline_<p>_<filter>`)
pub fn filter_element(
    id: String,
    inputs: Vec<String>,
    filter: &FilterSpec,
) -> Result<BoxedElement, GeneratorError> {
    match filter.kind {
        FilterType::KubeApiAudit => {
            let default = KubeApiAudit::default();
            let audit = filter.kube_api_audit.as_ref().unwrap_or(&default);
            Ok(Box::new(Remap::new(id, inputs, kube_api_audit_vrl(audit))))
        }
    }
}

#[cfg(test)]
mod tests {
    use logfwd_core::forwarder::{AuditLevel, GroupResources};

    use super::*;

    fn rule(level: AuditLevel) -> AuditRule {
        AuditRule::with_level(level)
    }

    fn s2_policy() -> KubeApiAudit {
        let mut keep = rule(AuditLevel::RequestResponse);
        keep.users = vec!["*apiserver".to_owned()];
        let mut drop_get = rule(AuditLevel::None);
        drop_get.verbs = vec!["get".to_owned()];
        KubeApiAudit {
            rules: vec![keep, drop_get, rule(AuditLevel::Metadata)],
            ..KubeApiAudit::default()
        }
    }

    #[test]
    fn glob_regex_escapes_and_expands_wildcards() {
        assert_eq!(glob_regex(&["*apiserver"]), "^(?:.*apiserver)$");
        assert_eq!(glob_regex(&["a.b", "c*"]), r"^(?:a\.b|c.*)$");
    }

    #[test]
    fn rules_follow_response_code_coercion_in_order() {
        let vrl = kube_api_audit_vrl(&s2_policy());
        let codes = vrl.find("if includes([404, 409, 422, 429], code)").unwrap();
        let users = vrl
            .find(r#"if level == null && match(user, r'^(?:.*apiserver)$') { level = "RequestResponse" }"#)
            .unwrap();
        let verbs = vrl
            .find(r#"if level == null && includes(["get"], verb) { level = "None" }"#)
            .unwrap();
        let default = vrl.find(r#"if level == null { level = "Metadata" }"#).unwrap();
        assert!(codes < users && users < verbs && verbs < default);
    }

    #[test]
    fn empty_response_codes_skip_coercion() {
        let audit = KubeApiAudit {
            omit_response_codes: Vec::new(),
            ..KubeApiAudit::default()
        };
        assert!(!kube_api_audit_vrl(&audit).contains("code) { level = \"None\" }"));
    }

    #[test]
    fn resource_rules_check_group_and_names() {
        let mut r = rule(AuditLevel::Request);
        r.resources = vec![GroupResources {
            group: "apps".to_owned(),
            resources: vec!["deployments".to_owned()],
        }];
        let vrl = kube_api_audit_vrl(&KubeApiAudit {
            rules: vec![r],
            ..KubeApiAudit::default()
        });
        assert!(vrl.contains(r#"is_resource && ((api_group == "apps" && includes(["deployments"], resource)))"#));
    }

    #[test]
    fn rule_omit_stages_force_none() {
        let mut r = rule(AuditLevel::RequestResponse);
        r.omit_stages = vec![AuditStage::RequestReceived];
        let branch = rule_branch(&r);
        assert!(branch.contains(r#"if includes(["RequestReceived"], stage) { level = "None" }"#));
    }

    #[test]
    fn service_account_namespace_is_first_segment() {
        let re = regex::Regex::new(SERVICE_ACCOUNT_NAMESPACE).unwrap();
        assert_eq!(re.replace("system:serviceaccount:foo", "$1"), "foo");
        assert_eq!(re.replace("system:serviceaccount:foo:builder", "$1"), "foo");
        assert_eq!(re.replace("system:serviceaccount::x", "$1"), "");
        assert!(!re.is_match("system:node:worker-1"));
    }

    #[test]
    fn service_account_writes_drop_in_own_or_cluster_scope() {
        let vrl = kube_api_audit_vrl(&KubeApiAudit::default());
        assert!(vrl.contains(r#"if starts_with(user, "system:serviceaccount:") {"#));
        // cluster-scoped target counts as own scope
        assert!(vrl.contains(r#"own_scope = namespace == "" || namespace == sa_namespace"#));
        // missing responseStatus reads as code 0
        assert!(vrl.contains("succeeded = code == 0 || (code >= 200 && code < 300)"));
        let read_only = vrl.find(r#"if system && includes(["get", "list", "watch"], verb) {"#).unwrap();
        let writes = vrl
            .find(r#"} else if own_scope && succeeded && !includes(["get", "list", "watch"], verb) {"#)
            .unwrap();
        let system = vrl.find("} else if system {
").unwrap();
        assert!(read_only < writes && writes < system);
        assert!(!vrl.contains("sa_prefix"));
    }

    #[test]
    fn defaults_cover_system_events() {
        let vrl = kube_api_audit_vrl(&KubeApiAudit::default());
        assert!(vrl.contains(r#"system = starts_with(user, "system:")"#));
        assert!(vrl.contains(r#"level = "Request""#));
        assert!(vrl.contains("if level == \"None\" { abort }"));
        assert!(vrl.starts_with("if is_string(.auditID) && is_string(.stage) {\n"));
    }
}
