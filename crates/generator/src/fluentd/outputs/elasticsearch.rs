//! Elasticsearch 출력
//!
//! 인덱스 이름은 수집 단계의 ViaQ 데이터 모델이 `viaq_index_name`에 채웁니다.
//! 실패한 벌크 요청은 `retry_<id>` 태그로 다시 들어와 별도 저장소를 거칩니다.

use logfwd_core::forwarder::OutputSpec;

use crate::endpoint::{url_host, url_port};
use crate::error::GeneratorError;
use crate::fluentd::elements::{ANY, Block, Label, dig, quoted, record_modifier};
use crate::fluentd::outputs::buffer::buffer;
use crate::fluentd::outputs::{OutputContext, basic_auth_files};
use crate::tls::ruby_tls_version;

const DEFAULT_PORT: u16 = 9200;
/// 타입 이름 없이 색인하는 첫 버전
const FIRST_VERSION_WITHOUT_TYPE: u32 = 8;

fn flatten_labels() -> Block {
    Block::filter(ANY)
        .desc("flatten labels to prevent field explosion in ES")
        .param("@type", "record_transformer")
        .param("enable_ruby", "true")
        .child(Block::new("record").param(
            "kubernetes",
            r##"${!record['kubernetes'].nil? ? record['kubernetes'].merge({"flat_labels": (record['kubernetes']['labels']||{}).map{|k,v| "#{k}=#{v}"}}) : {} }"##,
        ))
        .param("remove_keys", "$.kubernetes.labels")
}

/// 구조화 레코드의 인덱스 선택
///
/// 타입 키/이름이 없으면 `structured` 필드를 버립니다.
fn structured_index(output: &OutputSpec) -> Block {
    let es = output.elasticsearch.as_ref();
    let key = es.and_then(|e| e.structured_type_key.as_deref());
    let name = es.and_then(|e| e.structured_type_name.as_deref());
    if key.is_none() && name.is_none() {
        return Block::filter(ANY)
            .desc("remove structured field if present")
            .param("@type", "record_modifier")
            .param("remove_keys", "structured");
    }
    let lookup = match (key, name) {
        (Some(k), Some(n)) => format!("({} || {})", dig(k), quoted(n)),
        (Some(k), None) => dig(k),
        (None, Some(n)) => quoted(n),
        (None, None) => "nil".to_owned(),
    };
    record_modifier(
        ANY,
        &[(
            "viaq_index_name",
            format!(
                "${{if !record['structured'].nil? && !(t = {lookup}).to_s.empty? then \"app-#{{t}}-write\" else record['viaq_index_name'] end}}"
            ),
        )],
    )
    .desc("Select the structured index by type")
}

fn store(ctx: &OutputContext<'_>, id: &str, retry_tag: Option<&str>) -> Result<Block, GeneratorError> {
    let output = ctx.output;
    let mut block = Block::new("match")
        .param("@type", "elasticsearch")
        .param("@id", id)
        .param("host", url_host(&output.url))
        .param("port", url_port(&output.url).unwrap_or(DEFAULT_PORT).to_string());

    let tls = ctx.tls()?;
    if output.is_secure_url() {
        let version = tls
            .profile
            .as_ref()
            .map_or("TLSv1_2", |p| ruby_tls_version(p.min_tls_version));
        block = block.param("scheme", "https").param("ssl_version", version);
        if tls.insecure {
            block.push_param("ssl_verify", "false");
        }
    } else {
        block.push_param("scheme", "http");
    }
    if let Some((user, password)) = basic_auth_files(ctx) {
        block = block.param("user", user).param("password", password);
    }
    block = block
        .opt_param("client_key", tls.key_file.as_deref().map(quoted))
        .opt_param("client_cert", tls.cert_file.as_deref().map(quoted))
        .opt_param("ca_file", tls.ca_file.as_deref().map(quoted))
        .opt_param("client_key_pass", tls.key_pass.as_deref().map(quoted))
        .param("target_index_key", "viaq_index_name")
        .param("id_key", "viaq_msg_id")
        .param("remove_keys", "viaq_index_name");

    let version = output.elasticsearch.as_ref().and_then(|e| e.version);
    if version.is_some_and(|v| v >= FIRST_VERSION_WITHOUT_TYPE) {
        block.push_param("suppress_type_name", "true");
    } else {
        block = block
            .param("verify_es_version_at_startup", "false")
            .param("type_name", "_doc");
    }
    Ok(block
        .opt_param("retry_tag", retry_tag)
        .param("http_backend", "typhoeus")
        .param("write_operation", "create")
        .param("reload_connections", "'true'")
        .param("reload_after", "'200'")
        .param("sniffer_class_name", "'Fluent::Plugin::ElasticsearchSimpleSniffer'")
        .param("reload_on_failure", "false")
        .param("request_timeout", "2147483648")
        .child(buffer(ctx, &[], id)))
}

pub fn render(ctx: &mut OutputContext<'_>, label: &mut Label) -> Result<(), GeneratorError> {
    if ctx
        .output
        .elasticsearch
        .as_ref()
        .is_some_and(|e| e.index.is_some())
    {
        ctx.warn(
            "elasticsearch.index",
            "index templates are not supported by the fluentd collector; viaq index names are used",
        );
    }
    let id = ctx.store_id.clone();
    let retry_id = format!("retry_{id}");
    label.push(structured_index(ctx.output));
    label.push(flatten_labels());
    label.push(store(ctx, &retry_id, None)?.arg(retry_id.as_str()));
    label.push(store(ctx, &id, Some(&retry_id))?.arg(ANY));
    Ok(())
}
