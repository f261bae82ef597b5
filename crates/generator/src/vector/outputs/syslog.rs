//! syslog 출력
//!
//! `parse_encoding` remap이 레코드 출처별 기본 헤더 값을 `._syslog`에 채우고,
//! 사용자 지정 값이 그 위에 덮어씁니다. 소켓 싱크의 syslog 코덱은
//! 그 필드들을 템플릿으로 참조합니다.

use logfwd_core::forwarder::{SyslogOptions, SyslogRfc};

use crate::engine::BoxedElement;
use crate::error::GeneratorError;
use crate::vector::elements::{Component, Remap};
use crate::vector::outputs::{OutputContext, add_buffer, add_tls, url_authority};
use crate::vector::vrl::{path, quote};

const FIELD: &str = "_syslog";

const DEFAULTS: &str = r#"._syslog.facility = "user"
._syslog.severity = "informational"
._syslog.app_name = "-"
._syslog.proc_id = "-"
._syslog.msg_id = to_string(.log_type) ?? "-"
._syslog.tag = ""
if .log_type == "audit" {
  ._syslog.facility = "security"
  ._syslog.app_name = to_string(.log_type) ?? "-"
  ._syslog.proc_id = to_string(.auditID) ?? "-"
} else if exists(.kubernetes.pod_name) {
  ._syslog.app_name = join([to_string(.kubernetes.namespace_name) ?? "", to_string(.kubernetes.pod_name) ?? "", to_string(.kubernetes.container_name) ?? ""], "_") ?? "-"
  ._syslog.proc_id = to_string(.kubernetes.pod_id) ?? "-"
  tag = replace(join([to_string(.kubernetes.namespace_name) ?? "", to_string(.kubernetes.pod_name) ?? "", to_string(.kubernetes.container_name) ?? ""]) ?? "", r'[^a-zA-Z0-9]', "")
  ._syslog.tag = truncate(tag, 32)
} else if exists(.systemd.u.SYSLOG_IDENTIFIER) {
  ._syslog.app_name = to_string(.systemd.u.SYSLOG_IDENTIFIER) ?? "-"
  ._syslog.proc_id = to_string(.systemd.t.PID) ?? "-"
  ._syslog.tag = ._syslog.app_name
}"#;

/// 사용자 값 → VRL 식 (`$.a.b`는 레코드 경로, 나머지는 리터럴)
pub fn value_expr(value: &str, fallback: &str) -> String {
    match value.strip_prefix("$.") {
        Some(field) => format!("to_string({}) ?? {}", path(field), quote(fallback)),
        None => quote(value),
    }
}

/// 헤더 필드 계산 VRL
pub fn encoding_vrl(syslog: &SyslogOptions) -> String {
    let mut lines = vec![DEFAULTS.to_owned()];
    let overrides = [
        ("facility", syslog.facility.as_deref(), "user"),
        ("severity", syslog.severity.as_deref(), "informational"),
        ("app_name", syslog.app_name.as_deref(), "-"),
        ("proc_id", syslog.proc_id.as_deref(), "-"),
        ("msg_id", syslog.msg_id.as_deref(), "-"),
        ("tag", syslog.tag.as_deref(), ""),
    ];
    for (field, value, fallback) in overrides {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            lines.push(format!("._syslog.{field} = {}", value_expr(value, fallback)));
        }
    }
    if syslog.rfc == SyslogRfc::Rfc3164 {
        lines.push(
            r#"if ._syslog.proc_id != "-" && ._syslog.proc_id != "" {
  tag = to_string(._syslog.tag) ?? ""
  ._syslog.tag = tag + "[" + (to_string(._syslog.proc_id) ?? "") + "]"
}"#
            .to_owned(),
        );
    }
    if let Some(key) = syslog.payload_key.as_deref().filter(|k| !k.is_empty()) {
        lines.push(format!(
            "._syslog.payload = {p}\nif is_null(._syslog.payload) {{ ._syslog.payload = encode_json(.) }}",
            p = path(key)
        ));
    }
    lines.join("\n")
}

fn rfc_token(rfc: SyslogRfc) -> &'static str {
    match rfc {
        SyslogRfc::Rfc3164 => "rfc3164",
        SyslogRfc::Rfc5424 => "rfc5424",
    }
}

/// URL 스킴 → 소켓 모드 (`tls`는 tcp)
pub fn socket_mode(scheme: &str) -> Option<&'static str> {
    match scheme {
        "tcp" | "tls" => Some("tcp"),
        "udp" => Some("udp"),
        _ => None,
    }
}

pub fn render(ctx: &mut OutputContext<'_>) -> Result<Vec<BoxedElement>, GeneratorError> {
    let output = ctx.output;
    let syslog = output.syslog.clone().unwrap_or_default();
    let scheme = output.url_scheme();
    let mode = socket_mode(&scheme).ok_or_else(|| {
        GeneratorError::invalid(
            &output.name,
            format!("syslog url scheme must be tcp, tls or udp, got '{scheme}'"),
        )
    })?;

    let parse_id = ctx.sub_id("parse_encoding");
    let parse = Remap::new(parse_id.clone(), ctx.inputs.clone(), encoding_vrl(&syslog));

    let mut sink = Component::sink(&ctx.id, "socket", &[parse_id]);
    sink.main()
        .string("address", &url_authority(&output.url))
        .string("mode", mode);
    add_buffer(&mut sink, output);

    let encoding = sink.table("encoding");
    encoding
        .string("codec", "syslog")
        .array("except_fields", &[FIELD])
        .string("rfc", rfc_token(syslog.rfc));
    for field in ["facility", "severity", "proc_id", "tag"] {
        encoding.string(field, &format!("{{{{ {FIELD}.{field} }}}}"));
    }
    if syslog.rfc == SyslogRfc::Rfc5424 {
        for field in ["app_name", "msg_id"] {
            encoding.string(field, &format!("{{{{ {FIELD}.{field} }}}}"));
        }
    }
    if syslog.add_log_source {
        encoding.boolean("add_log_source", true);
    }
    if syslog.payload_key.as_deref().is_some_and(|k| !k.is_empty()) {
        encoding.string("payload_key", &format!("{FIELD}.payload"));
    }
    add_tls(&mut sink, ctx, true)?;

    Ok(vec![Box::new(parse), Box::new(sink)])
}
