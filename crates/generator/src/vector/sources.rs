//! Vector 소스 패스
//!
//! 소스 타입 집합에 필요한 원시 소스, 파이프라인이 참조하는 리시버,
//! 항상 존재하는 내부 메트릭 소스를 만듭니다.

use std::collections::BTreeSet;

use logfwd_core::forwarder::{ForwarderSpec, HttpReceiverFormat, InputSpec, ReceiverType, SourceType};
use logfwd_core::options::CompileOptions;

use crate::catalogue::{self, RawSource, referenced_receivers};
use crate::engine::BoxedElement;
use crate::naming::make_id;
use crate::vector::elements::{Component, Remap};

/// 내부 메트릭 소스 ID
pub const INTERNAL_METRICS: &str = "internal_metrics";
/// 리시버가 바인딩하는 주소
pub const LISTEN_ALL: &str = "[::]";

/// 리시버 소스 ID (`input_<name>`)
pub fn receiver_id(input: &str) -> String {
    make_id(&["input", input])
}

/// 리시버 출력 중 정규화 단계가 소비하는 ID
pub fn receiver_output_id(input: &InputSpec) -> String {
    let id = receiver_id(&input.name);
    match input.receiver.as_ref().and_then(|r| r.http_format()) {
        Some(HttpReceiverFormat::KubeApiAudit) => format!("{id}_items"),
        None => id,
    }
}

/// 소스 섹션 엘리먼트
pub fn sources(
    spec: &ForwarderSpec,
    types: &BTreeSet<SourceType>,
    options: &CompileOptions,
) -> Vec<BoxedElement> {
    let mut elements: Vec<BoxedElement> = Vec::new();
    if !options.annotation_collector_as_deployment {
        for raw in catalogue::raw_sources(types) {
            elements.push(Box::new(raw_source(raw, options)));
        }
    }
    for input in referenced_receivers(spec) {
        elements.extend(receiver(input, options));
    }
    let mut metrics = Component::source(INTERNAL_METRICS, "internal_metrics");
    metrics.main().int("scrape_interval_secs", 2);
    elements.push(Box::new(metrics));
    elements
}

fn raw_source(raw: RawSource, options: &CompileOptions) -> Component {
    let source = match raw {
        RawSource::Container => {
            let excludes =
                catalogue::excluded_container_paths(&options.namespace, &options.forwarder_name);
            let mut c = Component::source(raw.id(), "kubernetes_logs");
            c.main()
                .array("exclude_paths_glob_patterns", &excludes)
                .int("glob_minimum_cooldown_ms", 15000)
                .boolean("auto_partial_merge", true)
                .string("pod_annotation_fields.pod_labels", "kubernetes.labels")
                .string("pod_annotation_fields.pod_namespace", "kubernetes.namespace_name")
                .string("pod_annotation_fields.pod_annotations", "kubernetes.annotations")
                .string("pod_annotation_fields.pod_uid", "kubernetes.pod_id")
                .string("pod_annotation_fields.pod_node_name", "hostname");
            c
        }
        RawSource::Journal => {
            let mut c = Component::source(raw.id(), "journald");
            c.main().string("journal_directory", catalogue::JOURNAL_DIR);
            c
        }
        _ => {
            let mut c = Component::source(raw.id(), "file");
            c.main()
                .array("include", &raw.paths())
                .string("host_key", "hostname")
                .int("glob_minimum_cooldown_ms", 15000);
            c
        }
    };
    source.desc(raw.description())
}

fn receiver(input: &InputSpec, options: &CompileOptions) -> Vec<BoxedElement> {
    let Some(spec) = input.receiver.as_ref() else {
        return Vec::new();
    };
    let id = receiver_id(&input.name);
    let address = format!("{LISTEN_ALL}:{}", spec.port());

    let mut elements: Vec<BoxedElement> = Vec::new();
    match spec.kind {
        ReceiverType::Http => {
            let mut c = Component::source(&id, "http_server");
            c.main()
                .string("address", &address)
                .string("decoding.codec", "json");
            let tls = c.table("tls");
            tls.boolean("enabled", true)
                .string("key_file", &format!("/etc/collector/{id}/tls.key"))
                .string("crt_file", &format!("/etc/collector/{id}/tls.crt"));
            if let Some(profile) = options.cluster_tls_profile.as_ref() {
                tls.string("min_tls_version", profile.min_tls_version.token());
                if !profile.ciphers.is_empty() {
                    tls.string("ciphersuites", &profile.cipher_list(","));
                }
            }
            elements.push(Box::new(c.desc(format!("HTTP receiver {}", input.name))));

            if spec.http_format() == Some(HttpReceiverFormat::KubeApiAudit) {
                let split = format!("{id}_split");
                elements.push(Box::new(Remap::new(
                    split.clone(),
                    vec![id.clone()],
                    "if exists(.items) && is_array(.items) {. = unnest!(.items)} else {.}",
                )));
                elements.push(Box::new(Remap::new(
                    format!("{id}_items"),
                    vec![split],
                    "if exists(.items) {. = .items} else {.}",
                )));
            }
        }
        ReceiverType::Syslog => {
            let mut c = Component::source(&id, "syslog");
            c.main().string("address", &address).string("mode", "tcp");
            elements.push(Box::new(c.desc(format!("Syslog receiver {}", input.name))));
        }
    }
    elements
}
