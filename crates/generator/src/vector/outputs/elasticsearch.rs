//! Elasticsearch 출력

use logfwd_core::forwarder::ElasticsearchOptions;

use crate::engine::BoxedElement;
use crate::error::GeneratorError;
use crate::vector::elements::{Component, Remap};
use crate::vector::outputs::{
    DEDOT_LABELS, OutputContext, add_http_auth, add_tls, add_tuning, disable_healthcheck,
};
use crate::vector::vrl::{path, quote};

/// `suppress_type_name`이 필요한 최소 메이저 버전
const SUPPRESS_TYPE_NAME_VERSION: u32 = 8;
/// 사실상 무제한 요청 타임아웃
const REQUEST_TIMEOUT_SECS: i64 = 2_147_483_648;

const DEFAULT_INDEX: &str = r#"index = "default"
if .log_type == "application" { index = "app" }
if .log_type == "infrastructure" { index = "infra" }
if .log_type == "audit" { index = "audit" }
.write_index = index + "-write"
._id = encode_base64(uuid_v4())
del(.file)
del(.tag)
del(.source_type)"#;

/// 인덱스 선택 VRL
pub fn index_vrl(es: Option<&ElasticsearchOptions>) -> String {
    let Some(es) = es else {
        return DEFAULT_INDEX.to_owned();
    };
    let mut parts = vec![DEFAULT_INDEX.to_owned()];
    let key = es.structured_type_key.as_deref().filter(|k| !k.is_empty());
    let name = es.structured_type_name.as_deref().filter(|n| !n.is_empty());
    match (key, name) {
        (Some(key), name) => {
            let fallback = name
                .map(|n| format!(" else {{ .write_index = {} }}", quote(&format!("app-{n}-write"))))
                .unwrap_or_default();
            parts.push(format!(
                "if .log_type == \"application\" && .structured != null {{\n  val = {}\n  if val != null {{\n    name = to_string(val) ?? \"\"\n    .write_index = \"app-\" + name + \"-write\"\n  }}{fallback}\n}}",
                path(key)
            ));
        }
        (None, Some(name)) => {
            parts.push(format!(
                "if .log_type == \"application\" && .structured != null {{ .write_index = {} }}",
                quote(&format!("app-{name}-write"))
            ));
        }
        (None, None) => {}
    }
    if let Some(index) = es.index.as_deref().filter(|i| !i.is_empty()) {
        parts.push(format!(".write_index = {}", quote(index)));
    }
    parts.push(
        "if .structured != null && .write_index == \"app-write\" {\n  .message = encode_json(.structured)\n  del(.structured)\n}"
            .to_owned(),
    );
    parts.join("\n")
}

pub fn render(ctx: &mut OutputContext<'_>) -> Result<Vec<BoxedElement>, GeneratorError> {
    let output = ctx.output;
    let es = output.elasticsearch.as_ref();

    let index_id = ctx.sub_id("add_es_index");
    let index = Remap::new(index_id.clone(), ctx.inputs.clone(), index_vrl(es))
        .with_desc("Set Elasticsearch index");
    let dedot_id = ctx.sub_id("dedot");
    let dedot = Remap::new(dedot_id.clone(), vec![index_id], DEDOT_LABELS);

    let mut sink = Component::sink(&ctx.id, "elasticsearch", &[dedot_id]);
    sink.main()
        .array("endpoints", &[output.url.as_str()])
        .string("id_key", "_id");
    if es
        .and_then(|e| e.version)
        .is_some_and(|v| v >= SUPPRESS_TYPE_NAME_VERSION)
    {
        sink.main().boolean("suppress_type_name", true);
    }
    disable_healthcheck(&mut sink);
    add_tuning(&mut sink, output)?;
    sink.table("bulk")
        .string("index", "{{ write_index }}")
        .string("action", "create");
    sink.table("encoding").array("except_fields", &["write_index"]);
    sink.table("request").int("timeout_secs", REQUEST_TIMEOUT_SECS);
    add_tls(&mut sink, ctx, false)?;
    add_http_auth(&mut sink, ctx);

    Ok(vec![Box::new(index), Box::new(dedot), Box::new(sink)])
}

#[cfg(test)]
mod tests {
    use logfwd_core::forwarder::{ForwarderSpec, OutputSpec, OutputType, SecretRef};
    use logfwd_core::options::CompileOptions;
    use logfwd_core::secrets::{ConfigMaps, Secret};

    use super::*;
    use crate::vector::outputs::test_support::{context, render_toml};

    fn es_output(version: Option<u32>) -> OutputSpec {
        let mut out = OutputSpec::new("es-1", OutputType::Elasticsearch, "https://es.svc:9200");
        out.elasticsearch = Some(ElasticsearchOptions {
            version,
            ..ElasticsearchOptions::default()
        });
        out
    }

    #[test]
    fn sink_uses_write_index_and_create_action() {
        let out = es_output(Some(8));
        let spec = ForwarderSpec::default();
        let options = CompileOptions::default();
        let config_maps = ConfigMaps::new();
        let mut ctx = context(&out, &spec, None, &config_maps, &options);
        let (_, value) = render_toml(&render(&mut ctx).unwrap());
        let sink = &value["sinks"]["output_es_1"];
        assert_eq!(sink["inputs"][0].as_str(), Some("output_es_1_dedot"));
        assert_eq!(sink["endpoints"][0].as_str(), Some("https://es.svc:9200"));
        assert_eq!(sink["bulk"]["index"].as_str(), Some("{{ write_index }}"));
        assert_eq!(sink["bulk"]["action"].as_str(), Some("create"));
        assert_eq!(sink["id_key"].as_str(), Some("_id"));
        assert_eq!(sink["suppress_type_name"].as_bool(), Some(true));
        assert_eq!(
            sink["request"]["timeout_secs"].as_integer(),
            Some(2_147_483_648)
        );
        assert_eq!(
            value["transforms"]["output_es_1_add_es_index"]["inputs"][0].as_str(),
            Some("pipeline_p1")
        );
    }

    #[test]
    fn older_servers_keep_type_name() {
        let out = es_output(Some(6));
        let spec = ForwarderSpec::default();
        let options = CompileOptions::default();
        let config_maps = ConfigMaps::new();
        let mut ctx = context(&out, &spec, None, &config_maps, &options);
        let (text, _) = render_toml(&render(&mut ctx).unwrap());
        assert!(!text.contains("suppress_type_name"));
    }

    #[test]
    fn structured_type_key_with_fallback_name() {
        let vrl = index_vrl(Some(&ElasticsearchOptions {
            structured_type_key: Some("kubernetes.labels.logFormat".to_owned()),
            structured_type_name: Some("nologformat".to_owned()),
            ..ElasticsearchOptions::default()
        }));
        assert!(vrl.contains("val = .kubernetes.labels.logFormat"));
        assert!(vrl.contains(r#"else { .write_index = "app-nologformat-write" }"#));
    }

    #[test]
    fn fixed_index_overrides_default() {
        let vrl = index_vrl(Some(&ElasticsearchOptions {
            index: Some("custom".to_owned()),
            ..ElasticsearchOptions::default()
        }));
        let default = vrl.find(".write_index = index + \"-write\"").unwrap();
        let fixed = vrl.find(r#".write_index = "custom""#).unwrap();
        assert!(default < fixed);
    }

    #[test]
    fn client_certificate_goes_in_tls_table() {
        let mut out = es_output(None);
        out.secret = Some(SecretRef {
            name: "es-secret".to_owned(),
        });
        let secret = Secret::new()
            .with("tls.crt", "c")
            .with("tls.key", "k")
            .with("ca-bundle.crt", "ca");
        let spec = ForwarderSpec::default();
        let options = CompileOptions::default();
        let config_maps = ConfigMaps::new();
        let mut ctx = context(&out, &spec, Some(&secret), &config_maps, &options);
        let (_, value) = render_toml(&render(&mut ctx).unwrap());
        let tls = &value["sinks"]["output_es_1"]["tls"];
        assert_eq!(
            tls["crt_file"].as_str(),
            Some("/var/run/ocp-collector/secrets/es-secret/tls.crt")
        );
        assert_eq!(
            tls["ca_file"].as_str(),
            Some("/var/run/ocp-collector/secrets/es-secret/ca-bundle.crt")
        );
        assert!(value["sinks"]["output_es_1"].get("auth").is_none());
    }
}
