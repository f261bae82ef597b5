//! syslog 출력 (`remote_syslog`)
//!
//! `$.a.b` 형태의 헤더 값은 `<field>_key a.b`로 바뀌어 레코드에서 읽힙니다.

use logfwd_core::forwarder::SyslogRfc;

use crate::endpoint::{url_host, url_port};
use crate::error::GeneratorError;
use crate::fluentd::elements::{ANY, Block, Label, quoted};
use crate::fluentd::outputs::buffer::buffer;
use crate::fluentd::outputs::OutputContext;

const DEFAULT_PORT: u16 = 514;
const DEFAULT_FACILITY: &str = "user";
const DEFAULT_SEVERITY: &str = "debug";
const PACKET_SIZE: &str = "4096";
const NODE_HOSTNAME: &str = "\"#{ENV['NODE_NAME']}\"";

const LOG_SOURCE_KEYS: &str =
    "kubernetes_info, namespace_info, pod_info, container_info, msg_key, msg_info";

/// 메시지 앞에 네임스페이스/파드/컨테이너 정보를 붙이는 필터
fn log_source() -> Block {
    let mut record = Block::new("record");
    for (key, value) in [
        (
            "kubernetes_info",
            r#"${if record.has_key?('kubernetes'); record['kubernetes']; else {}; end}"#,
        ),
        (
            "namespace_info",
            r#"${if record['kubernetes_info'] != nil && record['kubernetes_info'] != {}; "namespace_name=" + record['kubernetes_info']['namespace_name']; else nil; end}"#,
        ),
        (
            "pod_info",
            r#"${if record['kubernetes_info'] != nil && record['kubernetes_info'] != {}; "pod_name=" + record['kubernetes_info']['pod_name']; else nil; end}"#,
        ),
        (
            "container_info",
            r#"${if record['kubernetes_info'] != nil && record['kubernetes_info'] != {}; "container_name=" + record['kubernetes_info']['container_name']; else nil; end}"#,
        ),
        (
            "msg_key",
            r#"${if record.has_key?('message') && record['message'] != nil; record['message']; else nil; end}"#,
        ),
        (
            "msg_info",
            r#"${if record['msg_key'] != nil && record['msg_key'].is_a?(Hash); require 'json'; "message="+record['message'].to_json; elsif record['msg_key'] != nil; "message="+record['message']; else nil; end}"#,
        ),
        (
            "message",
            r#"${if record['msg_key'] != nil && record['kubernetes_info'] != nil && record['kubernetes_info'] != {}; record['namespace_info'] + ", " + record['container_info'] + ", " + record['pod_info'] + ", " + record['msg_info']; else record['message']; end}"#,
        ),
    ] {
        record.push_param(key, value);
    }
    Block::filter(ANY)
        .desc("Prepend the log source to the message")
        .param("@type", "record_modifier")
        .child(record)
        .param("remove_keys", LOG_SOURCE_KEYS)
}

/// 고정 값 또는 레코드 키 참조
fn header(block: &mut Block, field: &str, value: Option<&str>) -> bool {
    match value.filter(|v| !v.is_empty()) {
        Some(v) => match v.strip_prefix("$.") {
            Some(key) => {
                block.push_param(&format!("{field}_key"), key);
                true
            }
            None => {
                block.push_param(field, v);
                false
            }
        },
        None => false,
    }
}

pub fn render(ctx: &mut OutputContext<'_>, label: &mut Label) -> Result<(), GeneratorError> {
    let output = ctx.output;
    let syslog = output.syslog.clone().unwrap_or_default();
    let scheme = output.url_scheme();
    let protocol = match scheme.as_str() {
        "tcp" | "tls" => "tcp",
        "udp" => "udp",
        other => {
            return Err(GeneratorError::invalid(
                &output.name,
                format!("syslog url scheme must be tcp, tls or udp, got '{other}'"),
            ));
        }
    };

    let rfc = match syslog.rfc {
        SyslogRfc::Rfc3164 => "rfc3164",
        SyslogRfc::Rfc5424 => "rfc5424",
    };
    let mut block = Block::matching(ANY)
        .param("@type", "remote_syslog")
        .param("@id", ctx.store_id.as_str())
        .param("host", url_host(&output.url))
        .param("port", url_port(&output.url).unwrap_or(DEFAULT_PORT).to_string())
        .param("rfc", rfc);

    let mut use_record = false;
    let facility = syslog.facility.as_deref().or(Some(DEFAULT_FACILITY));
    let severity = syslog.severity.as_deref().or(Some(DEFAULT_SEVERITY));
    use_record |= header(&mut block, "facility", facility);
    use_record |= header(&mut block, "severity", severity);
    use_record |= header(&mut block, "appname", syslog.app_name.as_deref());
    use_record |= header(&mut block, "msgid", syslog.msg_id.as_deref());
    use_record |= header(&mut block, "procid", syslog.proc_id.as_deref());
    use_record |= header(&mut block, "program", syslog.tag.as_deref());
    if use_record {
        block.push_param("use_record", "true");
    }

    block = block
        .param("protocol", protocol)
        .param("packet_size", PACKET_SIZE)
        .param("hostname", NODE_HOSTNAME);

    if scheme == "tls" {
        let tls = ctx.tls()?;
        block = block
            .param("tls", "true")
            .opt_param("ca_file", tls.ca_file.as_deref().map(quoted))
            .param("verify_mode", if tls.insecure { "0" } else { "1" });
    }
    if protocol == "tcp" {
        block = block
            .param("timeout", "60")
            .param("timeout_exception", "true")
            .param("keep_alive", "true")
            .param("keep_alive_idle", "75")
            .param("keep_alive_cnt", "9")
            .param("keep_alive_intvl", "7200");
    }

    let format = match syslog.payload_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => Block::new("format")
            .param("@type", "single_value")
            .param("message_key", key),
        None => Block::new("format").param("@type", "json"),
    };

    if syslog.add_log_source {
        label.push(log_source());
    }
    label.push(block.child(format).child(buffer(ctx, &[], &ctx.store_id)));
    Ok(())
}
