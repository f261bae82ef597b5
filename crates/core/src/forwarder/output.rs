//! 출력 스펙
//!
//! 열 가지 출력 타입과 공통 블록(TLS, 시크릿, 속도 제한, 튜닝)을 정의합니다.
//! 타입별 옵션은 출력 타입과 같은 이름의 인라인 블록으로 지정합니다.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::options::TlsProfile;

/// 출력 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputType {
    Elasticsearch,
    Loki,
    LokiStack,
    Kafka,
    Cloudwatch,
    Splunk,
    Syslog,
    Http,
    AzureMonitor,
    GoogleCloudLogging,
    FluentdForward,
}

impl OutputType {
    /// 스펙에서 쓰는 타입 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Elasticsearch => "elasticsearch",
            Self::Loki => "loki",
            Self::LokiStack => "lokiStack",
            Self::Kafka => "kafka",
            Self::Cloudwatch => "cloudwatch",
            Self::Splunk => "splunk",
            Self::Syslog => "syslog",
            Self::Http => "http",
            Self::AzureMonitor => "azureMonitor",
            Self::GoogleCloudLogging => "googleCloudLogging",
            Self::FluentdForward => "fluentdForward",
        }
    }

    /// 압축 튜닝을 지원하는 타입인지 여부
    pub fn supports_compression(&self) -> bool {
        !matches!(self, Self::Syslog | Self::AzureMonitor | Self::GoogleCloudLogging)
    }

    /// 재시도 기간 튜닝을 지원하는 타입인지 여부
    pub fn supports_retry(&self) -> bool {
        !matches!(self, Self::Syslog | Self::Kafka)
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 출력 정의
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSpec {
    /// 출력 이름 (파이프라인 `outputRefs`에서 참조)
    pub name: String,
    /// 출력 타입
    #[serde(rename = "type")]
    pub kind: OutputType,
    /// 엔드포인트 URL
    #[serde(default)]
    pub url: String,
    /// TLS 설정
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<OutputTls>,
    /// 인증 자료가 담긴 시크릿 참조
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretRef>,
    /// 속도 제한
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<LimitSpec>,
    /// 전송 튜닝
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuning: Option<OutputTuning>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elasticsearch: Option<ElasticsearchOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loki: Option<LokiOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loki_stack: Option<LokiStackOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kafka: Option<KafkaOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudwatch: Option<CloudwatchOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub splunk: Option<SplunkOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syslog: Option<SyslogOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_monitor: Option<AzureMonitorOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_cloud_logging: Option<GoogleCloudLoggingOptions>,
}

impl OutputSpec {
    /// 주어진 이름과 타입으로 나머지는 비어 있는 출력을 만듭니다.
    pub fn new(name: impl Into<String>, kind: OutputType, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            url: url.into(),
            tls: None,
            secret: None,
            limit: None,
            tuning: None,
            elasticsearch: None,
            loki: None,
            loki_stack: None,
            kafka: None,
            cloudwatch: None,
            splunk: None,
            syslog: None,
            http: None,
            azure_monitor: None,
            google_cloud_logging: None,
        }
    }

    /// 참조된 시크릿 이름
    pub fn secret_name(&self) -> Option<&str> {
        self.secret.as_ref().map(|s| s.name.as_str())
    }

    /// 초당 최대 레코드 수 (설정된 경우)
    pub fn max_records_per_second(&self) -> Option<u64> {
        self.limit.as_ref().map(|l| l.max_records_per_second)
    }

    /// 출력 자체에 지정된 TLS 프로파일
    pub fn tls_profile(&self) -> Option<&TlsProfile> {
        self.tls.as_ref().and_then(|t| t.security_profile.as_ref())
    }

    /// 인증서 검증 생략 여부
    pub fn insecure_skip_verify(&self) -> bool {
        self.tls.as_ref().is_some_and(|t| t.insecure_skip_verify)
    }

    /// 전달 보장 모드
    pub fn delivery(&self) -> Option<DeliveryMode> {
        self.tuning.as_ref().and_then(|t| t.delivery)
    }

    /// 유효 압축 방식 (`none` 또는 미지정이면 None)
    pub fn compression(&self) -> Option<&str> {
        self.tuning
            .as_ref()
            .and_then(|t| t.compression.as_deref())
            .filter(|c| !c.is_empty() && *c != "none")
    }

    /// URL 스킴 (소문자, 없으면 빈 문자열)
    pub fn url_scheme(&self) -> String {
        if !self.url.contains("://") {
            return String::new();
        }
        Url::parse(&self.url)
            .map(|u| u.scheme().to_owned())
            .unwrap_or_default()
    }

    /// 보안 연결용 URL 스킴인지 여부
    pub fn is_secure_url(&self) -> bool {
        matches!(self.url_scheme().as_str(), "https" | "tls")
    }
}

/// 시크릿 참조
///
/// 키 이름은 관례를 따릅니다 (`tls.crt`, `username`, `token` 등).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretRef {
    pub name: String,
}

/// 출력 TLS 블록
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputTls {
    /// 인증서 검증 생략
    #[serde(default)]
    pub insecure_skip_verify: bool,
    /// 출력 전용 TLS 보안 프로파일
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_profile: Option<TlsProfile>,
    /// configmap에 담긴 CA 번들
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca: Option<ConfigMapKeyRef>,
}

/// configmap 키 참조
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMapKeyRef {
    /// configmap 이름
    pub name: String,
    /// 키
    pub key: String,
}

/// 속도 제한
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitSpec {
    /// 초당 최대 레코드 수
    pub max_records_per_second: u64,
}

/// 전달 보장 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryMode {
    /// 디스크 버퍼, 가득 차면 대기
    AtLeastOnce,
    /// 메모리 버퍼, 가득 차면 폐기
    AtMostOnce,
}

/// 출력 튜닝
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputTuning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryMode>,
    /// 압축 방식 (gzip, zlib, snappy, zstd, lz4, none)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,
    /// 최소 재시도 간격 (초)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_retry_duration: Option<u64>,
    /// 최대 재시도 기간 (초)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retry_duration: Option<u64>,
    /// 한 번에 전송할 최대 바이트 수 (`10M`, `512Ki` 같은 수량 표기)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_write: Option<String>,
}

/// Elasticsearch 옵션
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElasticsearchOptions {
    /// 고정 인덱스 이름 (설정 시 구조화 인덱스 선택보다 우선)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// 서버 메이저 버전
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// 인덱스 이름을 가져올 레코드 경로
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_type_key: Option<String>,
    /// 경로 값이 없을 때 사용할 인덱스 이름
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_type_name: Option<String>,
}

/// Loki 옵션
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LokiOptions {
    /// 테넌트 ID로 사용할 레코드 경로
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_key: Option<String>,
    /// 스트림 레이블로 투영할 레코드 경로 목록
    #[serde(default)]
    pub label_keys: Vec<String>,
}

/// LokiStack 데이터 모델
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LokiStackDataModel {
    #[default]
    Viaq,
    #[serde(rename = "Otel", alias = "OpenTelemetry")]
    Otel,
}

/// LokiStack 대상 서비스
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LokiStackTarget {
    /// LokiStack 리소스 이름
    pub name: String,
    /// LokiStack 네임스페이스 (미지정 시 포워더 네임스페이스)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// LokiStack 옵션
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LokiStackOptions {
    pub target: LokiStackTarget,
    #[serde(default)]
    pub data_model: LokiStackDataModel,
    #[serde(default)]
    pub label_keys: Vec<String>,
}

/// Kafka 옵션
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KafkaOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// 추가 브로커 목록 (URL 호스트 다음에 붙음)
    #[serde(default)]
    pub brokers: Vec<String>,
}

/// CloudWatch 로그 그룹 분류 기준
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CloudwatchGroupBy {
    #[default]
    LogType,
    NamespaceName,
    #[serde(rename = "namespaceUUID")]
    NamespaceUuid,
}

/// CloudWatch 교차 계정 역할 전환
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssumeRole {
    #[serde(rename = "roleARN")]
    pub role_arn: String,
    #[serde(default, rename = "externalID", skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

/// CloudWatch 옵션
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudwatchOptions {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub group_by: CloudwatchGroupBy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assume_role: Option<AssumeRole>,
}

/// Splunk 옵션
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplunkOptions {
    /// 인덱스 이름을 가져올 레코드 경로
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_key: Option<String>,
    /// 고정 인덱스 이름
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// 지원하지 않는 필드 (경고만 발생)
    #[serde(default)]
    pub fields: Vec<String>,
}

/// syslog 메시지 포맷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyslogRfc {
    #[serde(rename = "RFC3164")]
    Rfc3164,
    #[default]
    #[serde(rename = "RFC5424")]
    Rfc5424,
}

/// syslog 옵션
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyslogOptions {
    #[serde(default)]
    pub rfc: SyslogRfc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(default, rename = "procID", skip_serializing_if = "Option::is_none")]
    pub proc_id: Option<String>,
    #[serde(default, rename = "msgID", skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// 메시지 본문으로 보낼 레코드 필드
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_key: Option<String>,
    /// 네임스페이스/파드/컨테이너 정보를 메시지 앞에 덧붙임
    #[serde(default)]
    pub add_log_source: bool,
}

/// HTTP 옵션
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpOptions {
    /// 추가 헤더 (키 정렬 순으로 출력)
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// 요청 타임아웃 (초)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    /// POST 또는 PUT
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// 출력 스키마 (`opentelemetry`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// Azure Monitor 옵션
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureMonitorOptions {
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub log_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// Google Cloud Logging 옵션
///
/// 네 가지 상위 리소스 ID 중 정확히 하나만 지정해야 합니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleCloudLoggingOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// 로그 스트림을 식별하는 로그 ID
    #[serde(default)]
    pub log_id: String,
}

impl GoogleCloudLoggingOptions {
    /// 설정된 상위 리소스 ID들 (`(싱크 키, 값)`)
    pub fn parent_ids(&self) -> Vec<(&'static str, &str)> {
        [
            ("billing_account_id", &self.billing_account_id),
            ("organization_id", &self.organization_id),
            ("folder_id", &self.folder_id),
            ("project_id", &self.project_id),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (key, v))
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_type_names_match_serde() {
        for kind in [
            OutputType::Elasticsearch,
            OutputType::LokiStack,
            OutputType::AzureMonitor,
            OutputType::GoogleCloudLogging,
            OutputType::FluentdForward,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn compression_and_retry_support() {
        assert!(!OutputType::Syslog.supports_compression());
        assert!(!OutputType::AzureMonitor.supports_compression());
        assert!(OutputType::Kafka.supports_compression());
        assert!(!OutputType::Kafka.supports_retry());
        assert!(OutputType::Loki.supports_retry());
    }

    #[test]
    fn compression_none_is_treated_as_unset() {
        let mut out = OutputSpec::new("s", OutputType::Syslog, "tcp://rsyslog:514");
        out.tuning = Some(OutputTuning {
            compression: Some("none".to_owned()),
            ..Default::default()
        });
        assert_eq!(out.compression(), None);
    }

    #[test]
    fn parses_loki_output_with_tuning() {
        let yaml = r#"
name: loki-1
type: loki
url: https://loki:3100
secret:
  name: loki-secret
limit:
  maxRecordsPerSecond: 100
tuning:
  delivery: atLeastOnce
  maxRetryDuration: 30
loki:
  tenantKey: kubernetes.namespace_name
"#;
        let out: OutputSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(out.kind, OutputType::Loki);
        assert_eq!(out.secret_name(), Some("loki-secret"));
        assert_eq!(out.max_records_per_second(), Some(100));
        assert_eq!(out.delivery(), Some(DeliveryMode::AtLeastOnce));
        assert!(out.is_secure_url());
        assert_eq!(
            out.loki.unwrap().tenant_key.as_deref(),
            Some("kubernetes.namespace_name")
        );
    }

    #[test]
    fn url_scheme_is_lowercase_and_empty_without_separator() {
        let out = OutputSpec::new("k", OutputType::Kafka, "TLS://broker:9093/topic");
        assert_eq!(out.url_scheme(), "tls");
        assert!(out.is_secure_url());
        let bare = OutputSpec::new("s", OutputType::Syslog, "rsyslog:514");
        assert_eq!(bare.url_scheme(), "");
        assert!(!bare.is_secure_url());
        let broken = OutputSpec::new("h", OutputType::Http, "http://");
        assert_eq!(broken.url_scheme(), "");
    }

    #[test]
    fn parses_cloudwatch_assume_role() {
        let yaml = r#"
name: cw
type: cloudwatch
cloudwatch:
  region: us-east-2
  groupBy: namespaceUUID
  assumeRole:
    roleARN: arn:aws:iam::987654321098:role/cross
    externalID: unique-external-id
"#;
        let out: OutputSpec = serde_yaml::from_str(yaml).unwrap();
        let cw = out.cloudwatch.unwrap();
        assert_eq!(cw.group_by, CloudwatchGroupBy::NamespaceUuid);
        let role = cw.assume_role.unwrap();
        assert_eq!(role.external_id.as_deref(), Some("unique-external-id"));
    }

    #[test]
    fn parses_google_cloud_logging() {
        let yaml = r#"
name: gcl-1
type: googleCloudLogging
secret:
  name: gcl-secret
googleCloudLogging:
  billingAccountId: billing-1
  logId: vector-1
"#;
        let out: OutputSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(out.kind, OutputType::GoogleCloudLogging);
        assert!(!out.kind.supports_compression());
        let gcl = out.google_cloud_logging.unwrap();
        assert_eq!(gcl.parent_ids(), vec![("billing_account_id", "billing-1")]);
        assert_eq!(gcl.log_id, "vector-1");
    }

    #[test]
    fn lokistack_data_model_accepts_alias() {
        let yaml = r#"
target:
  name: lokistack-dev
dataModel: OpenTelemetry
"#;
        let opts: LokiStackOptions = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(opts.data_model, LokiStackDataModel::Otel);
    }
}
