//! Fluentd 수집 레이블 (`@CONCAT`, `@INGRESS`)
//!
//! 컨테이너 로그는 `@CONCAT`에서 부분 줄을 합친 뒤 `@INGRESS`로 갑니다.
//! `@INGRESS`는 저널/감사 레코드를 정리하고 Kubernetes 메타데이터와 ViaQ 데이터
//! 모델을 적용한 다음, 태그 술어로 소스 타입 레인에 넘깁니다.
//! 어떤 파이프라인도 쓰지 않는 소스 타입은 여기서 버려집니다.

use std::collections::BTreeSet;

use logfwd_core::forwarder::SourceType;
use logfwd_core::options::CompileOptions;

use crate::catalogue::{self, RawSource};
use crate::fluentd::elements::{ANY, Block, Label, discard, quoted, record_modifier, relabel};
use crate::naming::source_type_label;

pub const CONCAT: &str = "@CONCAT";
pub const INGRESS: &str = "@INGRESS";

/// 인프라 컨테이너와 저널 태그
pub const INFRA_TAGS: &str = "kubernetes.var.log.pods.openshift_** kubernetes.var.log.pods.openshift-*_** kubernetes.var.log.pods.default_** kubernetes.var.log.pods.kube-*_** journal.** system.var.log**";
/// 애플리케이션 컨테이너 태그 (인프라 술어 뒤에 평가)
pub const APP_TAGS: &str = "kubernetes.**";
/// 감사 로그 태그
pub const AUDIT_TAGS: &str = "linux-audit.log** k8s-audit.log** openshift-audit.log** ovn-audit.log**";

const JOURNAL_FIELDS: &str = "log,stream,MESSAGE,_SOURCE_REALTIME_TIMESTAMP,__REALTIME_TIMESTAMP,CONTAINER_ID,CONTAINER_ID_FULL,CONTAINER_NAME,PRIORITY,_BOOT_ID,_CAP_EFFECTIVE,_CMDLINE,_COMM,_EXE,_GID,_HOSTNAME,_MACHINE_ID,_PID,_SELINUX_CONTEXT,_SYSTEMD_CGROUP,_SYSTEMD_SLICE,_SYSTEMD_UNIT,_TRANSPORT,_UID,_AUDIT_LOGINUID,_AUDIT_SESSION,_SYSTEMD_OWNER_UID,_SYSTEMD_SESSION,_SYSTEMD_USER_UNIT,CODE_FILE,CODE_FUNCTION,CODE_LINE,ERRNO,MESSAGE_ID,RESULT,UNIT,_KERNEL_DEVICE,_KERNEL_SUBSYSTEM,_UDEV_SYSNAME,_UDEV_DEVNODE,_UDEV_DEVLINK,SYSLOG_FACILITY,SYSLOG_IDENTIFIER,SYSLOG_PID";

const KEEP_FIELDS: &str = "CEE,time,@timestamp,aushape,ci_job,collectd,docker,fedora-ci,file,foreman,geoip,hostname,ipaddr4,ipaddr6,kubernetes,level,message,namespace_name,namespace_uuid,offset,openstack,ovirt,pid,pipeline_metadata,rsyslog,service,systemd,tags,testcase,tlog,viaq_msg_id";

/// (레벨, 메시지 패턴)
const LEVELS: [(&str, &str); 5] = [
    ("warn", r#"'Warning|WARN|^W[0-9]+|level=warn|Value:warn|"level":"warn"'"#),
    ("info", r#"'Info|INFO|^I[0-9]+|level=info|Value:info|"level":"info"'"#),
    ("error", r#"'Error|ERROR|^E[0-9]+|level=error|Value:error|"level":"error"'"#),
    ("critical", r#"'Critical|CRITICAL|C[0-9]+|level=critical|Value:critical|"level":"critical"'"#),
    ("debug", r#"'Debug|DEBUG|^D[0-9]+|level=debug|Value:debug|"level":"debug"'"#),
];

/// 저널 `CONTAINER_NAME` 규칙 (패턴, 새 태그)
const JOURNAL_RETAG: [(&str, &str, &str); 9] = [
    ("CONTAINER_NAME", r"^k8s_kibana\.", "kubernetes.journal.container.kibana"),
    ("CONTAINER_NAME", r"^k8s_[^_]+_logging-eventrouter-[^_]+_", "kubernetes.journal.container._default_.kubernetes-event"),
    ("CONTAINER_NAME", r"^k8s_[^_]+_[^_]+_default_", "kubernetes.journal.container._default_"),
    ("CONTAINER_NAME", r"^k8s_[^_]+_[^_]+_kube-(.+)_", "kubernetes.journal.container._kube-$1_"),
    ("CONTAINER_NAME", r"^k8s_[^_]+_[^_]+_openshift-(.+)_", "kubernetes.journal.container._openshift-$1_"),
    ("CONTAINER_NAME", r"^k8s_[^_]+_[^_]+_openshift_", "kubernetes.journal.container._openshift_"),
    ("CONTAINER_NAME", r"^k8s_.*fluentd", "kubernetes.journal.container.fluentd"),
    ("CONTAINER_NAME", r"^k8s_", "kubernetes.journal.container"),
    ("_TRANSPORT", ".+", "journal.system"),
];

fn node_local(types: &BTreeSet<SourceType>, options: &CompileOptions) -> Vec<RawSource> {
    if options.annotation_collector_as_deployment {
        return Vec::new();
    }
    catalogue::raw_sources(types)
}

/// 부분 줄 병합 레이블 (컨테이너 tail이 있을 때만)
pub fn concat(types: &BTreeSet<SourceType>, options: &CompileOptions) -> Option<Label> {
    if !node_local(types, options).contains(&RawSource::Container) {
        return None;
    }
    Some(
        Label::new(CONCAT)
            .desc("Concat log lines of container logs, and send to INGRESS pipeline")
            .block(
                Block::filter(APP_TAGS)
                    .param("@type", "concat")
                    .param("key", "message")
                    .param("partial_key", "logtag")
                    .param("partial_value", "P")
                    .param("separator", "''"),
            )
            .block(relabel(APP_TAGS, INGRESS)),
    )
}

fn journal_steps() -> Vec<Block> {
    let mut retag = Block::matching("journal")
        .desc("Retag Journal logs to specific tags")
        .param("@type", "rewrite_tag_filter")
        .param("@label", INGRESS);
    for (key, pattern, tag) in JOURNAL_RETAG {
        retag.push_child(
            Block::new("rule")
                .param("key", key)
                .param("pattern", pattern)
                .param("tag", tag),
        );
    }
    vec![
        Block::filter("journal")
            .desc("Filter out PRIORITY from journal logs")
            .param("@type", "grep")
            .child(
                Block::new("exclude")
                    .param("key", "PRIORITY")
                    .param("pattern", "^7$"),
            ),
        retag,
    ]
}

fn audit_steps() -> Vec<Block> {
    vec![
        record_modifier(
            "ovn-audit.log**",
            &[
                ("@timestamp", "${DateTime.parse(record['message'].split('|')[0]).rfc3339(6)}"),
                ("level", "${record['message'].split('|')[3].downcase}"),
            ],
        )
        .desc("Process OVN logs"),
        record_modifier("k8s-audit.log**", &[("k8s_audit_level", "${record['level']}")])
            .desc("Fix level field in audit logs"),
        record_modifier(
            "openshift-audit.log**",
            &[("openshift_audit_level", "${record['level']}")],
        ),
    ]
}

fn container_steps() -> Vec<Block> {
    let parse_json = |tags: &str, merge: &str| {
        Block::filter(tags)
            .param("@type", "parse_json_field")
            .param("merge_json_log", merge)
            .param("preserve_json_log", "'true'")
            .param("json_fields", "'log,MESSAGE'")
    };
    vec![
        Block::filter("kubernetes.**")
            .desc("Invoke kubernetes apiserver to get kubernetes metadata")
            .param("@id", "kubernetes-metadata")
            .param("@type", "kubernetes_metadata")
            .param("kubernetes_url", quoted("https://kubernetes.default.svc"))
            .param("annotation_match", r#"["^containerType\.logging\.openshift\.io\/.*$"]"#)
            .param("allow_orphans", "false")
            .param("cache_size", "'1000'")
            .param("ssl_partial_chain", "'true'"),
        parse_json("kubernetes.journal.**", "'false'")
            .desc("Parse Json fields for container, journal and eventrouter logs"),
        parse_json("kubernetes.var.log.pods.**_eventrouter-**", "true"),
    ]
}

fn viaq_data_model() -> Block {
    let mut block = Block::filter(ANY)
        .desc("Viaq Data Model")
        .param("@type", "viaq_data_model")
        .param("elasticsearch_index_prefix_field", "'viaq_index_name'")
        .param("default_keep_fields", KEEP_FIELDS)
        .param("extra_keep_fields", "''")
        .param("keep_empty_fields", "'message'")
        .param("use_undefined", "false")
        .param("undefined_name", "'undefined'")
        .param("rename_time", "true")
        .param("rename_time_if_missing", "false")
        .param("src_time_name", "'time'")
        .param("dest_time_name", "'@timestamp'")
        .param("pipeline_type", "'collector'")
        .param("undefined_to_string", "'false'")
        .param("undefined_dot_replace_char", "'UNUSED'")
        .param("undefined_max_num_fields", "'-1'")
        .param("process_kubernetes_events", "'false'");
    for (name, pattern) in LEVELS {
        block.push_child(
            Block::new("level")
                .param("name", name)
                .param("match", pattern),
        );
    }
    let formatter = |tag: &str, kind: &str, remove: &str| {
        Block::new("formatter")
            .param("tag", format!("\"{tag}\""))
            .param("type", kind)
            .param("remove_keys", remove)
    };
    let container_fields = "log,stream,CONTAINER_ID_FULL,CONTAINER_NAME";
    block
        .child(formatter("system.var.log**", "sys_var_log", "host,pid,ident"))
        .child(formatter("journal.system**", "sys_journal", JOURNAL_FIELDS))
        .child(formatter(
            "kubernetes.journal.container**",
            "k8s_journal",
            &quoted(JOURNAL_FIELDS),
        ))
        .child(
            formatter(
                "kubernetes.var.log.pods.**_eventrouter-** k8s-audit.log** openshift-audit.log** ovn-audit.log**",
                "k8s_json_file",
                container_fields,
            )
            .param("process_kubernetes_events", "'true'"),
        )
        .child(formatter("kubernetes.var.log.pods**", "k8s_json_file", container_fields))
}

fn gen_id() -> Block {
    Block::filter(ANY)
        .desc("Generate elasticsearch id")
        .param("@type", "elasticsearch_genid_ext")
        .param("hash_id_key", "viaq_msg_id")
        .param("alt_key", "kubernetes.event.metadata.uid")
        .param(
            "alt_tags",
            "'kubernetes.var.log.pods.**_eventrouter-*.** kubernetes.journal.container._default_.kubernetes-event'",
        )
}

fn route(tags: &str, source_type: SourceType, types: &BTreeSet<SourceType>) -> Block {
    let name = source_type.as_str();
    if types.contains(&source_type) {
        relabel(tags, &source_type_label(source_type)).desc(format!("Include {name} logs"))
    } else {
        discard(tags).desc(format!("Discard {name} logs"))
    }
}

/// 수집 레이블 (노드 로컬 소스가 있을 때만)
pub fn ingress(types: &BTreeSet<SourceType>, options: &CompileOptions) -> Option<Label> {
    let raws = node_local(types, options);
    if raws.is_empty() {
        return None;
    }
    let mut label = Label::new(INGRESS).desc("Ingress pipeline");
    if raws.contains(&RawSource::Journal) {
        for block in journal_steps() {
            label.push(block);
        }
    }
    if raws.contains(&RawSource::HostAudit) {
        for block in audit_steps() {
            label.push(block);
        }
    }
    if raws.contains(&RawSource::Container) {
        for block in container_steps() {
            label.push(block);
        }
    }
    label.push(viaq_data_model());
    label.push(gen_id());

    label.push(route(INFRA_TAGS, SourceType::Infrastructure, types));
    label.push(route(APP_TAGS, SourceType::Application, types));
    label.push(route(AUDIT_TAGS, SourceType::Audit, types));
    label.push(discard(ANY).desc("Discard any remaining unmatched tags"));
    Some(label)
}
