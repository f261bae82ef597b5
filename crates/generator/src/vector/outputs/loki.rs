//! Loki / LokiStack 출력
//!
//! Loki 싱크 앞에는 태그 제거, 레이블 dedot, 레이블 경로 기본값 remap이
//! 순서대로 붙습니다. LokiStack은 `log_type`별로 레코드를 나눠 테넌트마다
//! 게이트웨이 엔드포인트를 가진 Loki(또는 OTLP) 싱크를 만듭니다.

use std::collections::BTreeSet;

use logfwd_core::forwarder::{ForwarderSpec, LokiStackDataModel, ReceiverType, SourceType};

use crate::engine::BoxedElement;
use crate::error::GeneratorError;
use crate::tls::{SERVICE_CA_PATH, keys};
use crate::vector::elements::{Component, Remap, Route, toml_key};
use crate::vector::otel::otel_vrl;
use crate::vector::outputs::{
    DEDOT_LABELS, OutputContext, add_bearer, add_http_auth, add_tls, add_tuning,
    disable_healthcheck,
};
use crate::vector::vrl::{eq, path, quote};

/// `labelKeys`가 없을 때의 기본 스트림 레이블
pub const DEFAULT_LABEL_KEYS: [&str; 4] = [
    "log_type",
    "kubernetes.namespace_name",
    "kubernetes.pod_name",
    "kubernetes.container_name",
];
/// 항상 붙는 호스트 레이블
pub const HOST_LABEL: &str = "kubernetes_host";
const HOST_VALUE: &str = "${VECTOR_SELF_NODE_NAME}";
const POD_LABELS_PREFIX: &str = "kubernetes.labels.";

/// LokiStack 테넌트 (경로 이름 순)
pub const TENANTS: [SourceType; 3] = [
    SourceType::Application,
    SourceType::Audit,
    SourceType::Infrastructure,
];

/// 입력 참조가 들어가는 테넌트 (리시버는 정규화된 `log_type` 기준)
fn tenant_of(spec: &ForwarderSpec, input_ref: &str) -> Option<SourceType> {
    match spec.source_type_of(input_ref)? {
        SourceType::Receiver => match spec.input(input_ref)?.receiver.as_ref()?.kind {
            ReceiverType::Syslog => Some(SourceType::Infrastructure),
            ReceiverType::Http => Some(SourceType::Audit),
        },
        tenant => Some(tenant),
    }
}

/// 출력을 참조하는 파이프라인 입력에 실제로 있는 테넌트 (`TENANTS` 순서)
pub fn stack_tenants(spec: &ForwarderSpec, output_name: &str) -> Vec<SourceType> {
    let present: BTreeSet<SourceType> = spec
        .pipelines
        .iter()
        .filter(|p| p.output_refs.iter().any(|o| o == output_name))
        .flat_map(|p| p.input_refs.iter())
        .filter_map(|r| tenant_of(spec, r))
        .collect();
    TENANTS.into_iter().filter(|t| present.contains(t)).collect()
}

/// Loki 레이블 이름 (`.`, `/`, `\`, `-` → `_`)
pub fn label_name(key: &str) -> String {
    key.chars()
        .map(|c| if matches!(c, '.' | '/' | '\\' | '-') { '_' } else { c })
        .collect()
}

fn dedot(key: &str) -> String {
    key.replace(['.', '/'], "_")
}

/// 레이블 키가 가리키는 레코드 경로 (VRL, 템플릿)
///
/// 파드 레이블은 dedot 이후 이름으로 참조합니다.
fn label_paths(key: &str) -> (String, String) {
    match key.strip_prefix(POD_LABELS_PREFIX) {
        Some(label) => {
            let label = dedot(label);
            (
                format!(".kubernetes.labels.{}", quote(&label)),
                format!("{{{{ kubernetes.labels.{} }}}}", quote(&label)),
            )
        }
        None => (path(key), format!("{{{{ {key} }}}}")),
    }
}

/// 정렬된 (레이블 이름, 값 템플릿) 목록
pub fn stream_labels(label_keys: &[String]) -> Vec<(String, String)> {
    let keys: Vec<&str> = if label_keys.is_empty() {
        DEFAULT_LABEL_KEYS.to_vec()
    } else {
        label_keys.iter().map(String::as_str).collect()
    };
    let mut labels: Vec<(String, String)> = keys
        .into_iter()
        .map(|k| (label_name(k), label_paths(k).1))
        .filter(|(name, _)| name != HOST_LABEL)
        .collect();
    labels.push((HOST_LABEL.to_owned(), HOST_VALUE.to_owned()));
    labels.sort();
    labels.dedup_by(|a, b| a.0 == b.0);
    labels
}

fn remap_label_vrl(label_keys: &[String]) -> String {
    let keys: Vec<&str> = if label_keys.is_empty() {
        DEFAULT_LABEL_KEYS.to_vec()
    } else {
        label_keys.iter().map(String::as_str).collect()
    };
    keys.into_iter()
        .filter(|k| label_name(k) != HOST_LABEL)
        .map(|k| {
            let (p, _) = label_paths(k);
            format!("if !exists({p}) {{ {p} = \"\" }}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

struct LokiSink<'s> {
    id: String,
    inputs: Vec<String>,
    endpoint: String,
    label_keys: &'s [String],
    tenant_key: Option<&'s str>,
    /// LokiStack 게이트웨이 토큰
    gateway_token: Option<String>,
}

fn loki_graph(
    ctx: &OutputContext<'_>,
    loki: LokiSink<'_>,
) -> Result<Vec<BoxedElement>, GeneratorError> {
    let remap_id = format!("{}_remap", loki.id);
    let dedot_id = format!("{}_dedot", loki.id);
    let label_id = format!("{}_remap_label", loki.id);

    let remap = Remap::new(remap_id.clone(), loki.inputs, "del(.tag)");
    let dedot = Remap::new(dedot_id.clone(), vec![remap_id], DEDOT_LABELS);
    let remap_label = Remap::new(
        label_id.clone(),
        vec![dedot_id],
        remap_label_vrl(loki.label_keys),
    );

    let mut sink = Component::sink(&loki.id, "loki", &[label_id]);
    sink.main()
        .string("endpoint", &loki.endpoint)
        .string("out_of_order_action", "accept");
    disable_healthcheck(&mut sink);
    if let Some(key) = loki.tenant_key.filter(|k| !k.is_empty()) {
        sink.main().string("tenant_id", &format!("{{{{ {key} }}}}"));
    }
    add_tuning(&mut sink, ctx.output)?;
    sink.table("encoding").string("codec", "json");
    let labels = sink.table("labels");
    for (name, value) in stream_labels(loki.label_keys) {
        labels.string(&toml_key(&name), &value);
    }
    add_tls(&mut sink, ctx, false)?;
    match &loki.gateway_token {
        Some(token) => {
            let tls = sink.table("tls");
            if !tls.has_key("ca_file") {
                tls.string("ca_file", SERVICE_CA_PATH);
            }
            add_bearer(&mut sink, token);
        }
        None => add_http_auth(&mut sink, ctx),
    }

    Ok(vec![Box::new(remap), Box::new(dedot), Box::new(remap_label), Box::new(sink)])
}

pub fn render(ctx: &mut OutputContext<'_>) -> Result<Vec<BoxedElement>, GeneratorError> {
    let output = ctx.output;
    let loki = output.loki.as_ref();
    let empty = Vec::new();
    let sink = LokiSink {
        id: ctx.id.clone(),
        inputs: ctx.inputs.clone(),
        endpoint: output.url.clone(),
        label_keys: loki.map_or(&empty, |l| &l.label_keys),
        tenant_key: loki.and_then(|l| l.tenant_key.as_deref()),
        gateway_token: None,
    };
    loki_graph(ctx, sink)
}

/// LokiStack 게이트웨이 기본 URL (테넌트 경로 제외)
pub fn gateway_url(name: &str, namespace: &str) -> String {
    format!("https://{name}-gateway-http.{namespace}.svc:8080/api/logs/v1")
}

pub fn render_stack(ctx: &mut OutputContext<'_>) -> Result<Vec<BoxedElement>, GeneratorError> {
    let output = ctx.output;
    let stack = output.loki_stack.as_ref().ok_or_else(|| {
        GeneratorError::invalid(&output.name, "lokiStack output requires a target")
    })?;
    let namespace = stack
        .target
        .namespace
        .as_deref()
        .unwrap_or(&ctx.options.namespace);
    let base = gateway_url(&stack.target.name, namespace);
    let token = ctx.required_secret(keys::TOKEN)?;
    let tenants = stack_tenants(ctx.spec, &output.name);
    if tenants.is_empty() {
        return Ok(Vec::new());
    }

    let route_id = ctx.sub_id("route");
    let mut elements: Vec<BoxedElement> = vec![Box::new(Route {
        id: route_id.clone(),
        inputs: ctx.inputs.clone(),
        routes: tenants
            .iter()
            .map(|t| (t.as_str().to_owned(), eq(".log_type", t.as_str())))
            .collect(),
    })];

    for tenant in tenants {
        let tenant_id = ctx.sub_id(tenant.as_str());
        let input = format!("{route_id}.{}", tenant.as_str());
        match stack.data_model {
            LokiStackDataModel::Viaq => {
                elements.extend(loki_graph(
                    ctx,
                    LokiSink {
                        id: tenant_id,
                        inputs: vec![input],
                        endpoint: format!("{base}/{}", tenant.as_str()),
                        label_keys: &stack.label_keys,
                        tenant_key: None,
                        gateway_token: Some(token.clone()),
                    },
                )?);
            }
            LokiStackDataModel::Otel => {
                let otel_id = format!("{tenant_id}_otel");
                elements.push(Box::new(Remap::new(
                    otel_id.clone(),
                    vec![input],
                    otel_vrl(),
                )));
                let mut sink = Component::sink(&tenant_id, "http", &[otel_id]);
                sink.main()
                    .string("uri", &format!("{base}/{}/otlp/v1/logs", tenant.as_str()))
                    .string("method", "post");
                disable_healthcheck(&mut sink);
                add_tuning(&mut sink, output)?;
                sink.table("encoding").string("codec", "json");
                sink.table("request")
                    .string("headers.Content-Type", "application/json");
                add_tls(&mut sink, ctx, false)?;
                let tls = sink.table("tls");
                if !tls.has_key("ca_file") {
                    tls.string("ca_file", SERVICE_CA_PATH);
                }
                add_bearer(&mut sink, &token);
                elements.push(Box::new(sink));
            }
        }
    }
    Ok(elements)
}
