//! CloudWatch 출력
//!
//! 그룹/스트림 이름을 레코드에 계산해 둔 뒤 싱크가 템플릿으로 참조합니다.
//! 인증은 액세스 키 또는 역할 기반 자격 증명 파일 프로파일 중 하나입니다.

use logfwd_core::forwarder::{CloudwatchGroupBy, CloudwatchOptions};

use crate::aws::{CREDENTIALS_PATH, is_role_auth};
use crate::engine::BoxedElement;
use crate::error::GeneratorError;
use crate::tls::keys;
use crate::vector::elements::{Component, Remap};
use crate::vector::outputs::{OutputContext, add_tls, add_tuning, disable_healthcheck};
use crate::vector::vrl::quote;

fn group_field(group_by: CloudwatchGroupBy) -> &'static str {
    match group_by {
        CloudwatchGroupBy::LogType => ".log_type",
        CloudwatchGroupBy::NamespaceName => ".kubernetes.namespace_name",
        CloudwatchGroupBy::NamespaceUuid => ".kubernetes.namespace_id",
    }
}

/// 그룹/스트림 이름 계산 VRL
///
/// 네임스페이스 기준 분류는 애플리케이션 레코드에만 적용되고,
/// 나머지 레코드는 로그 타입을 그룹 이름으로 씁니다.
pub fn group_and_stream_vrl(cw: &CloudwatchOptions) -> String {
    let prefix = cw
        .group_prefix
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(|p| format!("{p}."))
        .unwrap_or_default();
    let prefix = quote(&prefix);
    let mut lines = vec![format!(
        ".group_name = {prefix} + (to_string(.log_type) ?? \"none\")"
    )];
    if cw.group_by != CloudwatchGroupBy::LogType {
        lines.push(format!(
            "if .log_type == \"application\" {{\n  .group_name = {prefix} + (to_string({}) ?? \"none\")\n}}",
            group_field(cw.group_by)
        ));
    }
    lines.push(
        r#".stream_name = to_string(.hostname) ?? "unknown"
if exists(.kubernetes.pod_name) {
  .stream_name = (to_string(.kubernetes.namespace_name) ?? "") + "_" + (to_string(.kubernetes.pod_name) ?? "") + "_" + (to_string(.kubernetes.container_name) ?? "")
}
if .log_type == "audit" {
  .stream_name = (to_string(.hostname) ?? "unknown") + "." + (to_string(.tag) ?? "audit")
}"#
        .to_owned(),
    );
    lines.join("\n")
}

pub fn render(ctx: &mut OutputContext<'_>) -> Result<Vec<BoxedElement>, GeneratorError> {
    let output = ctx.output;
    let cw = output.cloudwatch.clone().unwrap_or_default();
    if cw.region.is_empty() {
        return Err(GeneratorError::invalid(
            &output.name,
            "cloudwatch output requires a region",
        ));
    }

    let normalize_id = ctx.sub_id("normalize_group_and_streams");
    let normalize = Remap::new(
        normalize_id.clone(),
        ctx.inputs.clone(),
        group_and_stream_vrl(&cw),
    )
    .with_desc("Cloudwatch Group and Stream Names");

    let mut sink = Component::sink(&ctx.id, "aws_cloudwatch_logs", &[normalize_id]);
    sink.main()
        .string("region", &cw.region)
        .string("group_name", "{{ group_name }}")
        .string("stream_name", "{{ stream_name }}");
    if output.compression().is_none() {
        sink.main().string("compression", "none");
    }
    disable_healthcheck(&mut sink);
    if !output.url.is_empty() {
        sink.main().string("endpoint", &output.url);
    }
    add_tuning(&mut sink, output)?;
    sink.table("encoding").string("codec", "json");

    if is_role_auth(output, ctx.secret) {
        sink.table("auth")
            .string("credentials_file", CREDENTIALS_PATH)
            .string("profile", &output.name);
    } else {
        let key_id = ctx.required_secret(keys::AWS_ACCESS_KEY_ID)?;
        let secret_key = ctx.required_secret(keys::AWS_SECRET_ACCESS_KEY)?;
        sink.table("auth")
            .string("access_key_id", &key_id)
            .string("secret_access_key", &secret_key);
    }
    add_tls(&mut sink, ctx, false)?;

    Ok(vec![Box::new(normalize), Box::new(sink)])
}
