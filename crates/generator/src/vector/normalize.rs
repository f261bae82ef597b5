//! Vector 정규화 패스
//!
//! 원시 스트림마다 레벨 추정, 수집기 내부 필드 제거, `@timestamp` 정리를
//! 수행하는 remap을 만듭니다. 저널 레코드는 systemd 필드를 `systemd.k`
//! (커널), `systemd.t` (신뢰), `systemd.u` (사용자)로 나눕니다.

use std::collections::BTreeSet;

use logfwd_core::forwarder::{ForwarderSpec, InputSpec, ReceiverType, SourceType};
use logfwd_core::options::CompileOptions;

use crate::catalogue::{self, RawSource};
use crate::engine::BoxedElement;
use crate::vector::elements::{Filter, Remap};
use crate::catalogue::referenced_receivers;
use crate::vector::sources::{receiver_id, receiver_output_id};
use crate::vector::vrl::quote;

/// 디버그 저널 레코드를 걸러낸 스트림 ID
pub const DROP_JOURNAL_LOGS: &str = "drop_journal_logs";

/// 메시지 내용으로 레벨을 추정합니다 (warn, info, error, critical, debug 순).
pub const FIX_LOG_LEVEL: &str = r#"if !exists(.level) {
  .level = "unknown"
  msg = to_string(.message) ?? ""
  if match(msg, r'Warning|WARN|^W[0-9]+|level=warn|Value:warn|"level":"warn"|<warn>') {
    .level = "warn"
  } else if match(msg, r'Info|INFO|^I[0-9]+|level=info|Value:info|"level":"info"|<info>') {
    .level = "info"
  } else if match(msg, r'Error|ERROR|^E[0-9]+|level=error|Value:error|"level":"error"|<error>') {
    .level = "error"
  } else if match(msg, r'Critical|CRITICAL|^C[0-9]+|level=critical|Value:critical|"level":"critical"|<critical>') {
    .level = "critical"
  } else if match(msg, r'Debug|DEBUG|^D[0-9]+|level=debug|Value:debug|"level":"debug"|<debug>') {
    .level = "debug"
  }
}"#;

/// 수집 시각을 `@timestamp`로 옮깁니다.
pub const FIX_TIMESTAMP: &str = r#"ts = del(.timestamp); if !exists(."@timestamp") { ."@timestamp" = ts }"#;

const CONTAINER_INTERNAL_FIELDS: [&str; 4] = ["file", "source_type", "stream", "kubernetes.pod_ips"];

const JOURNAL_META_FIELDS: [&str; 9] = [
    "source_type",
    "_CPU_USAGE_NSEC",
    "__REALTIME_TIMESTAMP",
    "__MONOTONIC_TIMESTAMP",
    "_SOURCE_REALTIME_TIMESTAMP",
    "JOB_RESULT",
    "JOB_TYPE",
    "TIMESTAMP_BOOTTIME",
    "TIMESTAMP_MONOTONIC",
];

const SYSTEMD_KERNEL: [&str; 5] = [
    "KERNEL_DEVICE",
    "KERNEL_SUBSYSTEM",
    "UDEV_DEVLINK",
    "UDEV_DEVNODE",
    "UDEV_SYSNAME",
];

const SYSTEMD_TRUSTED: [&str; 23] = [
    "_AUDIT_LOGINUID",
    "_AUDIT_SESSION",
    "_BOOT_ID",
    "_CAP_EFFECTIVE",
    "_CMDLINE",
    "_COMM",
    "_EXE",
    "_GID",
    "_HOSTNAME",
    "_LINE_BREAK",
    "_MACHINE_ID",
    "_PID",
    "_SELINUX_CONTEXT",
    "_STREAM_ID",
    "_SYSTEMD_CGROUP",
    "_SYSTEMD_INVOCATION_ID",
    "_SYSTEMD_OWNER_UID",
    "_SYSTEMD_SESSION",
    "_SYSTEMD_SLICE",
    "_SYSTEMD_UNIT",
    "_SYSTEMD_USER_UNIT",
    "_TRANSPORT",
    "_UID",
];

/// (원래 필드, `systemd.u` 아래 이름)
const SYSTEMD_USER: [(&str, &str); 10] = [
    ("CODE_FILE", "CODE_FILE"),
    ("CODE_FUNC", "CODE_FUNCTION"),
    ("CODE_LINE", "CODE_LINE"),
    ("ERRNO", "ERRNO"),
    ("MESSAGE_ID", "MESSAGE_ID"),
    ("RESULT", "RESULT"),
    ("SYSLOG_FACILITY", "SYSLOG_FACILITY"),
    ("SYSLOG_IDENTIFIER", "SYSLOG_IDENTIFIER"),
    ("SYSLOG_PID", "SYSLOG_PID"),
    ("UNIT", "UNIT"),
];

const JOURNAL_LEVEL: &str = r#"if .PRIORITY == "8" || .PRIORITY == 8 {
  .level = "trace"
} else {
  priority = to_int(.PRIORITY) ?? -1
  .level, err = to_syslog_level(priority)
  if err != null {
    .level = "unknown"
  } else {
    del(.PRIORITY)
  }
}"#;

const PARSE_HOST_AUDIT: &str = r#"match1 = parse_regex(.message, r'type=(?P<type>[^ ]+)') ?? {}
envelop = {}
envelop |= {"type": match1.type}
match2, err = parse_regex(.message, r'msg=audit\((?P<ts_record>[^ ]+)\):')
if err == null {
  sp = split(match2.ts_record, ":")
  if length(sp) == 2 {
    ts = parse_timestamp(sp[0], "%s.%3f") ?? ""
    envelop |= {"record_id": sp[1]}
    . |= {"audit.linux": envelop}
    . |= {"@timestamp": format_timestamp(ts, "%+") ?? ""}
  }
}"#;

const PARSE_AND_FLATTEN: &str = ". = merge(., parse_json!(string!(.message))) ?? .\ndel(.message)";

fn tag(value: &str) -> String {
    format!(".tag = {}", quote(&format!(".{value}")))
}

fn delete_fields(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|f| format!("del(.{f})"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// systemd 필드 분류 블록
fn systemd_fields() -> String {
    let mut lines = Vec::new();
    for field in SYSTEMD_KERNEL {
        lines.push(format!(
            "if exists(.{field}) {{ .systemd.k.{field} = del(.{field}) }}"
        ));
    }
    lines.push(".systemd.t = {}".to_owned());
    for field in SYSTEMD_TRUSTED {
        let name = field.trim_start_matches('_');
        lines.push(format!(
            "if exists(.{field}) {{ .systemd.t.{name} = del(.{field}) }}"
        ));
    }
    lines.push(".systemd.u = {}".to_owned());
    for (field, name) in SYSTEMD_USER {
        lines.push(format!(
            "if exists(.{field}) {{ .systemd.u.{name} = del(.{field}) }}"
        ));
    }
    lines.join("\n")
}

fn join(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// 컨테이너 레코드 정규화 VRL
pub fn container_vrl() -> String {
    join(&[
        FIX_LOG_LEVEL,
        &delete_fields(&CONTAINER_INTERNAL_FIELDS),
        FIX_TIMESTAMP,
    ])
}

/// 저널 레코드 정규화 VRL
pub fn journal_vrl() -> String {
    join(&[
        &tag("journal.system"),
        &delete_fields(&JOURNAL_META_FIELDS),
        JOURNAL_LEVEL,
        ".hostname = del(.host)",
        &systemd_fields(),
        r#".time = format_timestamp(.timestamp, format: "%FT%T%:z") ?? null"#,
        FIX_TIMESTAMP,
    ])
}

fn audit_vrl(raw: RawSource) -> String {
    let tag = tag(raw.tag());
    match raw {
        RawSource::HostAudit => join(&[&tag, PARSE_HOST_AUDIT, r#".level = "default""#, FIX_TIMESTAMP]),
        RawSource::K8sAudit => join(&[
            &tag,
            PARSE_AND_FLATTEN,
            ".k8s_audit_level = .level",
            r#".level = "default""#,
            FIX_TIMESTAMP,
        ]),
        RawSource::OpenshiftAudit => join(&[
            &tag,
            PARSE_AND_FLATTEN,
            ".openshift_audit_level = .level",
            r#".level = "default""#,
            FIX_TIMESTAMP,
        ]),
        _ => join(&[&tag, FIX_LOG_LEVEL, FIX_TIMESTAMP]),
    }
}

/// 정규화된 리시버 스트림 ID
pub fn receiver_normalized_id(input: &str) -> String {
    format!("{}_viaq", receiver_id(input))
}

fn receiver_vrl(input: &InputSpec) -> String {
    match input.receiver.as_ref().map(|r| r.kind) {
        Some(ReceiverType::Syslog) => join(&[
            &tag("syslog"),
            r#".log_type = "infrastructure""#,
            FIX_LOG_LEVEL,
            FIX_TIMESTAMP,
        ]),
        _ => join(&[
            &tag(catalogue::RawSource::K8sAudit.tag()),
            ".k8s_audit_level = .level",
            r#".level = "default""#,
            r#".log_type = "audit""#,
            FIX_TIMESTAMP,
        ]),
    }
}

/// 정규화 섹션 엘리먼트
pub fn normalize(
    spec: &ForwarderSpec,
    types: &BTreeSet<SourceType>,
    options: &CompileOptions,
) -> Vec<BoxedElement> {
    let mut elements: Vec<BoxedElement> = Vec::new();
    if !options.annotation_collector_as_deployment {
        for raw in catalogue::raw_sources(types) {
            match raw {
                RawSource::Container => elements.push(Box::new(Remap::new(
                    raw.normalized_id(),
                    vec![raw.id().to_owned()],
                    container_vrl(),
                ))),
                RawSource::Journal => {
                    elements.push(Box::new(Filter {
                        id: DROP_JOURNAL_LOGS.to_owned(),
                        inputs: vec![raw.id().to_owned()],
                        condition: r#".PRIORITY != "7" && .PRIORITY != 7"#.to_owned(),
                    }));
                    elements.push(Box::new(Remap::new(
                        raw.normalized_id(),
                        vec![DROP_JOURNAL_LOGS.to_owned()],
                        journal_vrl(),
                    )));
                }
                _ => elements.push(Box::new(Remap::new(
                    raw.normalized_id(),
                    vec![raw.id().to_owned()],
                    audit_vrl(raw),
                ))),
            }
        }
    }
    for input in referenced_receivers(spec) {
        elements.push(Box::new(Remap::new(
            receiver_normalized_id(&input.name),
            vec![receiver_output_id(input)],
            receiver_vrl(input),
        )));
    }
    elements
}
