//! CloudWatch 출력 (`cloudwatch_logs`)
//!
//! 태그 분류마다 `record_modifier`가 `cw_group_name` / `cw_stream_name`을
//! 채우고, 저장소는 두 키를 그룹/스트림 이름으로 씁니다.

use logfwd_core::forwarder::{CloudwatchGroupBy, CloudwatchOptions};

use crate::aws::role_arn_from_secret;
use crate::error::GeneratorError;
use crate::fluentd::elements::{ANY, Block, Label, from_env, quoted, record_modifier};
use crate::fluentd::ingress::{APP_TAGS, AUDIT_TAGS, INFRA_TAGS};
use crate::fluentd::outputs::buffer::buffer;
use crate::fluentd::outputs::OutputContext;
use crate::tls::keys;

const GROUP_KEY: &str = "cw_group_name";
const STREAM_KEY: &str = "cw_stream_name";
const HOST_STREAM: &str = "${record['hostname']}.${tag}";

/// AWS 키 파일을 읽어 공백을 제거합니다.
fn key_file(path: &str) -> String {
    format!("\"#{{open('{path}','r') do |f|f.read.strip end}}\"")
}

fn prefix(cw: &CloudwatchOptions) -> String {
    cw.group_prefix
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(|p| format!("{p}."))
        .unwrap_or_default()
}

/// 태그 분류별 (태그, 그룹, 스트림)
///
/// 필터는 차례로 모두 적용되므로 인프라 규칙이 애플리케이션 규칙(`kubernetes.**`)
/// 뒤에 와서 인프라 네임스페이스의 컨테이너 로그를 덮어씁니다.
fn group_rules(cw: &CloudwatchOptions) -> Vec<(&'static str, String, &'static str)> {
    let prefix = prefix(cw);
    let app_group = match cw.group_by {
        CloudwatchGroupBy::LogType => format!("{prefix}application"),
        CloudwatchGroupBy::NamespaceName => {
            format!("{prefix}${{record['kubernetes']['namespace_name']}}")
        }
        CloudwatchGroupBy::NamespaceUuid => {
            format!("{prefix}${{record['kubernetes']['namespace_id']}}")
        }
    };
    vec![
        (APP_TAGS, app_group, "${tag}"),
        (INFRA_TAGS, format!("{prefix}infrastructure"), HOST_STREAM),
        (AUDIT_TAGS, format!("{prefix}audit"), HOST_STREAM),
    ]
}

pub fn render(ctx: &mut OutputContext<'_>, label: &mut Label) -> Result<(), GeneratorError> {
    let output = ctx.output;
    let cw = output.cloudwatch.clone().unwrap_or_default();
    if cw.region.is_empty() {
        return Err(GeneratorError::invalid(
            &output.name,
            "cloudwatch output requires a region",
        ));
    }

    for (tags, group, stream) in group_rules(&cw) {
        label.push(record_modifier(
            tags,
            &[(GROUP_KEY, group.as_str()), (STREAM_KEY, stream)],
        ));
    }

    let mut block = Block::matching(ANY)
        .param("@type", "cloudwatch_logs")
        .param("@id", ctx.store_id.as_str())
        .param("auto_create_stream", "true")
        .param("region", cw.region.as_str())
        .param("log_group_name_key", GROUP_KEY)
        .param("log_stream_name_key", STREAM_KEY)
        .param("remove_log_group_name_key", "true")
        .param("remove_log_stream_name_key", "true")
        .param("concurrency", "2");

    match ctx.secret.and_then(role_arn_from_secret) {
        Some(role_arn) => {
            let token_file = ctx
                .secret_file(keys::TOKEN)
                .unwrap_or_else(|| crate::aws::PROJECTED_TOKEN_PATH.to_owned());
            block.push_child(
                Block::new("web_identity_credentials")
                    .param("role_arn", quoted(&role_arn))
                    .param("web_identity_token_file", quoted(&token_file))
                    .param(
                        "role_session_name",
                        from_env("POD_NAME", &ctx.options.forwarder_name),
                    ),
            );
        }
        None => {
            ctx.required_secret(keys::AWS_ACCESS_KEY_ID)?;
            ctx.required_secret(keys::AWS_SECRET_ACCESS_KEY)?;
            let key_id = ctx.secret_file(keys::AWS_ACCESS_KEY_ID).unwrap_or_default();
            let secret_key = ctx
                .secret_file(keys::AWS_SECRET_ACCESS_KEY)
                .unwrap_or_default();
            block = block
                .param("aws_key_id", key_file(&key_id))
                .param("aws_sec_key", key_file(&secret_key));
        }
    }

    block = block
        .param("include_time_key", "true")
        .param("log_rejected_request", "true");
    if !output.url.is_empty() {
        block.push_param("endpoint", output.url.as_str());
        if ctx.tls()?.insecure {
            block.push_param("ssl_verify_peer", "false");
        }
    }
    label.push(block.child(buffer(ctx, &[], &ctx.store_id)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use logfwd_core::forwarder::{OutputSpec, OutputTls, OutputType, SecretRef};
    use logfwd_core::options::CompileOptions;
    use logfwd_core::secrets::Secret;

    use super::*;
    use crate::fluentd::outputs::test_support::render_label;

    fn cw(group_by: CloudwatchGroupBy) -> OutputSpec {
        let mut out = OutputSpec::new("cw", OutputType::Cloudwatch, "");
        out.secret = Some(SecretRef {
            name: "cw-secret".to_owned(),
        });
        out.cloudwatch = Some(CloudwatchOptions {
            region: "us-east-2".to_owned(),
            group_by,
            group_prefix: Some("prod".to_owned()),
            assume_role: None,
        });
        out
    }

    fn keys_secret() -> Secret {
        Secret::new()
            .with("aws_access_key_id", "AKIA")
            .with("aws_secret_access_key", "s3cr3t")
    }

    #[test]
    fn groups_follow_tag_classes() {
        let (text, _) = render_label(
            &cw(CloudwatchGroupBy::NamespaceName),
            Some(&keys_secret()),
            &CompileOptions::default(),
        )
        .unwrap();
        let infra = text.find("cw_group_name prod.infrastructure").unwrap();
        let app = text
            .find("cw_group_name prod.${record['kubernetes']['namespace_name']}")
            .unwrap();
        let audit = text.find("cw_group_name prod.audit").unwrap();
        assert!(app < infra && infra < audit);
        assert!(text.contains("<filter kubernetes.**>"));
        assert!(text.contains(
            r##"aws_key_id "#{open('/var/run/ocp-collector/secrets/cw-secret/aws_access_key_id','r') do |f|f.read.strip end}""##
        ));
        assert!(!text.contains("web_identity_credentials"));
    }

    #[test]
    fn role_arn_uses_web_identity() {
        let secret = Secret::new().with("role_arn", "arn:aws:iam::123456789012:role/my-role");
        let (text, _) = render_label(
            &cw(CloudwatchGroupBy::LogType),
            Some(&secret),
            &CompileOptions::default(),
        )
        .unwrap();
        assert!(text.contains("role_arn 'arn:aws:iam::123456789012:role/my-role'"));
        assert!(text.contains("web_identity_token_file '/var/run/ocp-collector/serviceaccount/token'"));
        assert!(text.contains("cw_group_name prod.application"));
        assert!(!text.contains("aws_key_id"));
    }

    #[test]
    fn endpoint_can_skip_peer_verification() {
        let mut out = cw(CloudwatchGroupBy::LogType);
        out.url = "https://logs.internal:443".to_owned();
        out.tls = Some(OutputTls {
            insecure_skip_verify: true,
            ..OutputTls::default()
        });
        let (text, _) = render_label(&out, Some(&keys_secret()), &CompileOptions::default()).unwrap();
        assert!(text.contains("endpoint https://logs.internal:443\n    ssl_verify_peer false\n"));
    }

    #[test]
    fn missing_keys_is_missing_reference() {
        let err = render_label(
            &cw(CloudwatchGroupBy::LogType),
            Some(&Secret::new()),
            &CompileOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GeneratorError::MissingReference { .. }));
    }
}
