//! OpenTelemetry 로그 레코드 변환
//!
//! 내부 레코드를 OTLP JSON 로그 레코드(`resource`, `logRecords`) 모양으로
//! 바꾸는 VRL입니다. HTTP 출력의 `opentelemetry` 스키마와 LokiStack의
//! Otel 데이터 모델이 함께 사용합니다.

const RESOURCE: &str = r#"resource = {"attributes": []}
resource.attributes = push(resource.attributes, {"key": "k8s.cluster.uid", "value": {"stringValue": to_string(.openshift.cluster_id) ?? ""}})
resource.attributes = push(resource.attributes, {"key": "openshift.log.type", "value": {"stringValue": to_string(.log_type) ?? ""}})
if .log_type == "application" || exists(.kubernetes.pod_name) {
  resource.attributes = push(resource.attributes, {"key": "k8s.namespace.name", "value": {"stringValue": to_string(.kubernetes.namespace_name) ?? ""}})
  resource.attributes = push(resource.attributes, {"key": "k8s.pod.name", "value": {"stringValue": to_string(.kubernetes.pod_name) ?? ""}})
  resource.attributes = push(resource.attributes, {"key": "k8s.container.name", "value": {"stringValue": to_string(.kubernetes.container_name) ?? ""}})
}
resource.attributes = push(resource.attributes, {"key": "k8s.node.name", "value": {"stringValue": to_string(.hostname) ?? ""}})"#;

const LOG_RECORD: &str = r#"r = {}
ts = parse_timestamp(to_string(."@timestamp") ?? "", format: "%+") ?? now()
r.timeUnixNano = to_string(to_unix_timestamp(ts, unit: "nanoseconds"))
r.observedTimeUnixNano = to_string(to_unix_timestamp(now(), unit: "nanoseconds"))
r.severityText = to_string(.level) ?? "unknown"
r.severityNumber = to_syslog_severity(to_string(.level) ?? "") ?? 9
body = .message
if body == null { body = encode_json(.structured) }
r.body = {"stringValue": to_string(body) ?? ""}
r.attributes = []
if is_object(.openshift.labels) {
  for_each(object!(.openshift.labels)) -> |key, value| {
    r.attributes = push(r.attributes, {"key": "openshift.label." + key, "value": {"stringValue": to_string(value) ?? ""}})
  }
}
if is_object(.kubernetes.labels) {
  for_each(object!(.kubernetes.labels)) -> |key, value| {
    r.attributes = push(r.attributes, {"key": "k8s.pod.label." + key, "value": {"stringValue": to_string(value) ?? ""}})
  }
}
if .log_type == "audit" && exists(.auditID) {
  r.attributes = push(r.attributes, {"key": "http.request.method", "value": {"stringValue": to_string(.verb) ?? ""}})
  r.attributes = push(r.attributes, {"key": "user.name", "value": {"stringValue": to_string(.user.username) ?? ""}})
  r.attributes = push(r.attributes, {"key": "url.path", "value": {"stringValue": to_string(.requestURI) ?? ""}})
}"#;

const REGROUP: &str = r#". = {
  "openshift": {"log_type": .log_type, "cluster_id": .openshift.cluster_id},
  "kubernetes": {"namespace_name": .kubernetes.namespace_name},
  "resource": resource,
  "logRecords": r
}"#;

/// OTLP 로그 레코드 변환 VRL
pub fn otel_vrl() -> String {
    [RESOURCE, LOG_RECORD, REGROUP].join("\n")
}
