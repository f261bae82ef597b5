//! Fluentd 소스 패스
//!
//! 헤더와 `<system>`, 프로메테우스 모니터링 소스, 소스 타입 집합이 요구하는
//! tail/systemd 소스, 파이프라인이 참조하는 리시버를 만듭니다.
//! 컨테이너 tail은 `@CONCAT`으로, 나머지 노드 로컬 소스는 `@INGRESS`로,
//! 리시버는 자기 레인 레이블로 레코드를 보냅니다.

use std::collections::BTreeSet;

use logfwd_core::forwarder::{ForwarderSpec, InputSpec, ReceiverType, SourceType};
use logfwd_core::options::CompileOptions;

use crate::catalogue::{self, RawSource, referenced_receivers};
use crate::engine::{BoxedElement, Raw};
use crate::fluentd::POS_DIR;
use crate::fluentd::elements::{Block, from_env, quoted};
use crate::fluentd::ingress::{CONCAT, INGRESS};
use crate::fluentd::inputs::receiver_label;
use crate::naming::make_id;
use crate::tls::{METRICS_TLS_DIR, transport_tls_version};

const HEADER: &str = "## GENERATED COLLECTOR CONFIGURATION ##\n\
# Rendered from the log forwarder spec; local edits are overwritten.";

/// CRI 로그 줄 파서
pub const CRI_EXPRESSION: &str =
    r"/^(?<@timestamp>[^\s]+) (?<stream>stdout|stderr) (?<logtag>[F|P]) (?<message>.*)$/";

/// 리시버가 바인딩하는 주소
pub const BIND_ALL: &str = "0.0.0.0";

/// 헤더 주석과 `<system>` 블록
pub fn header() -> Vec<BoxedElement> {
    vec![
        Box::new(Raw::new("header", HEADER)),
        Box::new(Block::new("system").param("log_level", from_env("LOG_LEVEL", "warn"))),
    ]
}

/// 서버 측 `<transport tls>` 블록
///
/// 클러스터 프로파일이 있으면 최소 버전과 `:`로 이은 암호 목록을 붙입니다.
fn transport_tls(dir: &str, options: &CompileOptions) -> Block {
    let mut transport = Block::new("transport")
        .arg("tls")
        .param("cert_path", format!("{dir}/tls.crt"))
        .param("private_key_path", format!("{dir}/tls.key"));
    if let Some(profile) = options.cluster_tls_profile.as_ref() {
        transport.push_param("min_version", transport_tls_version(profile.min_tls_version));
        transport.push_param("max_version", "TLS1_3");
        if !profile.ciphers.is_empty() {
            transport.push_param("ciphers", profile.cipher_list(":"));
        }
    }
    transport
}

fn monitor(plugin: &str) -> Block {
    Block::source()
        .param("@type", plugin)
        .child(Block::new("labels").param("hostname", "${hostname}"))
}

/// 프로메테우스 모니터링 소스
pub fn metrics(options: &CompileOptions) -> Vec<BoxedElement> {
    vec![
        Box::new(
            Block::source()
                .desc("Prometheus Monitoring")
                .param("@type", "prometheus")
                .param("bind", "\"#{ENV['PROM_BIND_IP']}\"")
                .child(transport_tls(METRICS_TLS_DIR, options)),
        ),
        Box::new(monitor("prometheus_monitor")),
        Box::new(
            monitor("collected_tail_monitor")
                .desc("publishes log_collected_bytes_total without per-file path labels"),
        ),
        Box::new(monitor("prometheus_output_monitor")),
    ]
}

fn pos_file(name: &str) -> String {
    format!("\"{POS_DIR}/{name}\"")
}

fn tail(raw: RawSource, id: &str, pos: &str, spec: &ForwarderSpec) -> Block {
    let paths = raw.paths().join(",");
    Block::source()
        .desc(raw.description())
        .param("@type", "tail")
        .param("@id", id)
        .param("@label", INGRESS)
        .param("path", format!("\"{paths}\""))
        .param("pos_file", pos_file(pos))
        .param("follow_inodes", "true")
        .param("tag", raw.tag())
        .opt_param(
            "read_lines_limit",
            spec.tuning.read_lines_limit.map(|n| n.to_string()),
        )
}

fn json_audit_parse() -> Block {
    Block::new("parse")
        .param("@type", "json")
        .param("time_key", "requestReceivedTimestamp")
        .param("keep_time_key", "true")
        .param("time_format", "%Y-%m-%dT%H:%M:%S.%N%z")
}

fn raw_source(raw: RawSource, spec: &ForwarderSpec, options: &CompileOptions) -> Block {
    match raw {
        RawSource::Container => {
            let excludes =
                catalogue::excluded_container_paths(&options.namespace, &options.forwarder_name);
            let exclude = serde_json::to_string(&excludes).unwrap_or_else(|_| "[]".to_owned());
            Block::source()
                .desc(raw.description())
                .param("@type", "tail")
                .param("@id", "container-input")
                .param("path", format!("\"{}\"", catalogue::CONTAINER_LOGS_PATH))
                .param("exclude_path", exclude)
                .param("pos_file", pos_file("es-containers.log.pos"))
                .param("follow_inodes", "true")
                .param("refresh_interval", "5")
                .param("rotate_wait", "5")
                .param("tag", "kubernetes.*")
                .param("read_from_head", "\"true\"")
                .param("skip_refresh_on_startup", "true")
                .opt_param(
                    "read_lines_limit",
                    spec.tuning.read_lines_limit.map(|n| n.to_string()),
                )
                .param("@label", CONCAT)
                .child(
                    Block::new("parse")
                        .param("@type", "regexp")
                        .param("expression", CRI_EXPRESSION)
                        .param("time_key", quoted("@timestamp"))
                        .param("keep_time_key", "true"),
                )
        }
        RawSource::Journal => Block::source()
            .desc(raw.description())
            .param("@type", "systemd")
            .param("@id", "systemd-input")
            .param("@label", INGRESS)
            .param("path", quoted(catalogue::JOURNAL_DIR))
            .child(
                Block::new("storage")
                    .param("@type", "local")
                    .param("persistent", "true")
                    .comment("the path must end in .json or it is taken as a directory")
                    .param("path", quoted(&format!("{POS_DIR}/journal_pos.json"))),
            )
            .param("matches", from_env("JOURNAL_FILTERS_JSON", "[]"))
            .param("tag", raw.tag())
            .param(
                "read_from_head",
                "\"#{if (val = ENV.fetch('JOURNAL_READ_FROM_HEAD','')) && (val.length > 0); val; else 'false'; end}\"",
            ),
        RawSource::HostAudit => tail(raw, "audit-input", "audit.log.pos", spec)
            .child(Block::new("parse").param("@type", "viaq_host_audit")),
        RawSource::K8sAudit => tail(raw, "k8s-audit-input", "kube-apiserver.audit.log.pos", spec)
            .child(json_audit_parse()),
        RawSource::OpenshiftAudit => tail(raw, "openshift-audit-input", "oauth-apiserver.audit.log", spec)
            .child(json_audit_parse()),
        RawSource::OvnAudit => tail(raw, "ovn-audit-input", "acl-audit-log.pos", spec)
            .param("refresh_interval", "5")
            .param("rotate_wait", "5")
            .param("read_from_head", "true")
            .child(Block::new("parse").param("@type", "none")),
    }
}

/// 리시버 소스 ID (`input_<name>`)
pub fn receiver_id(input: &str) -> String {
    make_id(&["input", input])
}

fn receiver(input: &InputSpec, options: &CompileOptions) -> Option<Block> {
    let spec = input.receiver.as_ref()?;
    let id = receiver_id(&input.name);
    let source = Block::source();
    let block = match spec.kind {
        ReceiverType::Http => source
            .desc(format!("HTTP receiver {}", input.name))
            .param("@type", "http")
            .param("@id", id.as_str())
            .param("port", spec.port().to_string())
            .param("bind", quoted(BIND_ALL))
            .param("@label", receiver_label(&input.name))
            .child(transport_tls(&format!("/etc/collector/{id}"), options))
            .child(Block::new("parse").param("@type", "json")),
        ReceiverType::Syslog => source
            .desc(format!("Syslog receiver {}", input.name))
            .param("@type", "syslog")
            .param("@id", id.as_str())
            .param("port", spec.port().to_string())
            .param("bind", quoted(BIND_ALL))
            .param("tag", format!("receiver.{id}"))
            .param("@label", receiver_label(&input.name))
            .child(Block::new("transport").arg("tcp"))
            .child(
                Block::new("parse")
                    .param("@type", "syslog")
                    .param("message_format", "auto"),
            ),
    };
    Some(block)
}

/// 소스 섹션 엘리먼트
///
/// 배포 모드에서는 노드 로컬 소스를 만들지 않습니다.
pub fn sources(
    spec: &ForwarderSpec,
    types: &BTreeSet<SourceType>,
    options: &CompileOptions,
) -> Vec<BoxedElement> {
    let mut elements: Vec<BoxedElement> = Vec::new();
    if !options.annotation_collector_as_deployment {
        for raw in catalogue::raw_sources(types) {
            elements.push(Box::new(raw_source(raw, spec, options)));
        }
    }
    for input in referenced_receivers(spec) {
        if let Some(block) = receiver(input, options) {
            elements.push(Box::new(block));
        }
    }
    elements
}
