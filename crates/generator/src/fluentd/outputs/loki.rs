//! Loki / LokiStack 출력
//!
//! 스트림 레이블 값은 `record_modifier`가 `_<label>` 임시 필드에 먼저 채우고,
//! `<label>` 블록이 그 필드를 참조합니다. LokiStack은 테넌트마다 레이블을
//! 하나씩 만들어 `log_type`으로 거른 뒤 게이트웨이로 보냅니다.

use logfwd_core::forwarder::LokiStackDataModel;

use crate::error::GeneratorError;
use crate::fluentd::elements::{ANY, Block, Label, copy, dig, quoted, record_modifier};
use crate::fluentd::outputs::buffer::buffer;
use crate::fluentd::outputs::{OutputContext, basic_auth_files, dedot_labels};
use crate::naming::{self, make_id};
use crate::tls::{SERVICE_CA_PATH, keys, transport_tls_version};
use crate::vector::outputs::loki::{DEFAULT_LABEL_KEYS, gateway_url, label_name, stack_tenants};

const HOST_KEY: &str = "kubernetes.host";
const POD_LABELS_PREFIX: &str = "kubernetes.labels.";

/// 레이블 키 → (레이블 이름, 값 식)
fn stream_label(key: &str) -> (String, String) {
    let name = label_name(key);
    if key == HOST_KEY {
        return (name, "\"#{ENV['NODE_NAME']}\"".to_owned());
    }
    let value = match key.strip_prefix(POD_LABELS_PREFIX) {
        Some(label) => dig(&format!("kubernetes.labels.{}", label.replace(['.', '/'], "_"))),
        None => dig(key),
    };
    (name, format!("${{{value}}}"))
}

/// 정렬된 스트림 레이블 (호스트 레이블 포함)
fn stream_labels(label_keys: &[String]) -> Vec<(String, String)> {
    let mut keys: Vec<&str> = if label_keys.is_empty() {
        DEFAULT_LABEL_KEYS.to_vec()
    } else {
        label_keys.iter().map(String::as_str).collect()
    };
    keys.push(HOST_KEY);
    let mut labels: Vec<(String, String)> = keys.into_iter().map(stream_label).collect();
    labels.sort();
    labels.dedup_by(|a, b| a.0 == b.0);
    labels
}

fn label_fields(labels: &[(String, String)]) -> Block {
    let records: Vec<(String, String)> = labels
        .iter()
        .map(|(name, value)| (format!("_{name}"), value.clone()))
        .collect();
    record_modifier(ANY, &records)
}

struct LokiStore<'a> {
    id: String,
    url: String,
    label_keys: &'a [String],
    tenant_key: Option<&'a str>,
    /// 게이트웨이 토큰 파일과 기본 CA
    gateway_token_file: Option<String>,
}

fn store(ctx: &OutputContext<'_>, store: &LokiStore<'_>) -> Result<Block, GeneratorError> {
    let output = ctx.output;
    let mut block = Block::matching(ANY)
        .param("@type", "loki")
        .param("@id", store.id.as_str())
        .param("line_format", "json")
        .param("url", store.url.as_str());
    let mut buffer_keys = Vec::new();
    if let Some(key) = store.tenant_key {
        block.push_param("tenant", format!("${{{}}}", dig(key)));
        buffer_keys.push(format!("$.{key}"));
    }
    if let Some((user, password)) = basic_auth_files(ctx) {
        block = block.param("username", user).param("password", password);
    }

    let tls = ctx.tls()?;
    let ca = tls
        .ca_file
        .clone()
        .or_else(|| store.gateway_token_file.as_ref().map(|_| SERVICE_CA_PATH.to_owned()));
    block = block
        .opt_param("key", tls.key_file.as_deref().map(quoted))
        .opt_param("cert", tls.cert_file.as_deref().map(quoted))
        .opt_param("ca_cert", ca.as_deref().map(quoted));
    let token_file = store
        .gateway_token_file
        .clone()
        .or_else(|| ctx.secret_file(keys::TOKEN));
    block = block.opt_param("bearer_token_file", token_file.as_deref().map(quoted));

    if output.is_secure_url() || store.gateway_token_file.is_some() {
        if let Some(profile) = &tls.profile {
            block.push_param("min_version", transport_tls_version(profile.min_tls_version));
            if !profile.ciphers.is_empty() {
                block.push_param("ciphers", profile.cipher_list(":"));
            }
        }
        if tls.insecure {
            block.push_param("insecure_tls", "true");
        }
    }

    let labels = stream_labels(store.label_keys);
    let mut label = Block::new("label");
    for (name, _) in &labels {
        label.push_param(name, format!("_{name}"));
    }
    let keys: Vec<&str> = buffer_keys.iter().map(String::as_str).collect();
    Ok(block.child(label).child(buffer(ctx, &keys, &store.id)))
}

pub fn render(ctx: &mut OutputContext<'_>, label: &mut Label) -> Result<(), GeneratorError> {
    let loki = ctx.output.loki.as_ref();
    let label_keys = loki.map_or(&[][..], |l| l.label_keys.as_slice());
    let store_spec = LokiStore {
        id: ctx.store_id.clone(),
        url: ctx.output.url.clone(),
        label_keys,
        tenant_key: loki.and_then(|l| l.tenant_key.as_deref()),
        gateway_token_file: None,
    };
    label.push(dedot_labels());
    label.push(label_fields(&stream_labels(label_keys)));
    label.push(store(ctx, &store_spec)?);
    Ok(())
}

/// LokiStack: 테넌트별 레이블로 복제합니다.
pub fn render_stack(ctx: &mut OutputContext<'_>, label: &mut Label) -> Result<Vec<Label>, GeneratorError> {
    let output = ctx.output;
    let stack = output.loki_stack.as_ref().ok_or_else(|| {
        GeneratorError::invalid(&output.name, "lokiStack output requires a target")
    })?;
    if stack.data_model == LokiStackDataModel::Otel {
        ctx.warn(
            "lokiStack.dataModel",
            "the otel data model is not supported by the fluentd collector; viaq is used",
        );
    }
    ctx.required_secret(keys::TOKEN)?;
    let token_file = ctx.secret_file(keys::TOKEN);
    let namespace = stack
        .target
        .namespace
        .as_deref()
        .unwrap_or(&ctx.options.namespace);
    let base = gateway_url(&stack.target.name, namespace);

    let tenants = stack_tenants(ctx.spec, &output.name);
    if tenants.is_empty() {
        return Ok(Vec::new());
    }
    let tenant_labels: Vec<String> = tenants
        .iter()
        .map(|t| naming::label_name(&format!("{}_{}", output.name, t.as_str())))
        .collect();
    label.push(copy(ANY, &tenant_labels, true));

    let mut labels = Vec::new();
    for (tenant, name) in tenants.iter().zip(&tenant_labels) {
        let store_spec = LokiStore {
            id: make_id(&[&ctx.store_id, tenant.as_str()]),
            url: format!("{base}/{}", tenant.as_str()),
            label_keys: &stack.label_keys,
            tenant_key: None,
            gateway_token_file: token_file.clone(),
        };
        let grep = Block::filter(ANY)
            .desc(format!("Keep {} logs", tenant.as_str()))
            .param("@type", "grep")
            .child(
                Block::new("regexp")
                    .param("key", "log_type")
                    .param("pattern", format!("^{}$", tenant.as_str())),
            );
        labels.push(
            Label::new(name.as_str())
                .block(grep)
                .block(dedot_labels())
                .block(label_fields(&stream_labels(&stack.label_keys)))
                .block(store(ctx, &store_spec)?),
        );
    }
    Ok(labels)
}
