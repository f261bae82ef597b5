//! Splunk HEC 출력

use crate::engine::BoxedElement;
use crate::error::GeneratorError;
use crate::tls::keys;
use crate::vector::elements::{Component, Remap};
use crate::vector::outputs::{OutputContext, add_tls, add_tuning, disable_healthcheck};
use crate::vector::vrl::path;

const INDEX_FIELD: &str = "_splunk_index";

pub fn render(ctx: &mut OutputContext<'_>) -> Result<Vec<BoxedElement>, GeneratorError> {
    let output = ctx.output;
    let splunk = output.splunk.clone().unwrap_or_default();
    let token = ctx.required_secret(keys::HEC_TOKEN)?;

    let mut elements: Vec<BoxedElement> = Vec::new();
    let mut inputs = ctx.inputs.clone();
    let index_key = splunk.index_key.as_deref().filter(|k| !k.is_empty());
    if let Some(key) = index_key {
        let id = ctx.sub_id("add_splunk_index");
        elements.push(Box::new(Remap::new(
            id.clone(),
            inputs,
            format!(".{INDEX_FIELD} = to_string({}) ?? \"\"", path(key)),
        )));
        inputs = vec![id];
    }

    let mut sink = Component::sink(&ctx.id, "splunk_hec_logs", &inputs);
    sink.main()
        .string("endpoint", &output.url)
        .string("default_token", &token)
        .string("timestamp_key", "@timestamp");
    match (splunk.index_name.as_deref().filter(|n| !n.is_empty()), index_key) {
        (Some(name), _) => {
            sink.main().string("index", name);
        }
        (None, Some(_)) => {
            sink.main().string("index", &format!("{{{{ {INDEX_FIELD} }}}}"));
        }
        (None, None) => {}
    }
    sink.main().opt_string("source", splunk.source.as_deref());
    disable_healthcheck(&mut sink);
    add_tuning(&mut sink, output)?;
    sink.table("encoding").string("codec", "json");
    if index_key.is_some() {
        sink.table("encoding").array("except_fields", &[INDEX_FIELD]);
    }
    add_tls(&mut sink, ctx, false)?;

    if !splunk.fields.is_empty() {
        ctx.warn(
            "splunk.fields",
            format!(
                "indexed fields are not supported and will be ignored: {}",
                splunk.fields.join(", ")
            ),
        );
    }

    elements.push(Box::new(sink));
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use logfwd_core::forwarder::{ForwarderSpec, OutputSpec, OutputType, SecretRef, SplunkOptions};
    use logfwd_core::options::CompileOptions;
    use logfwd_core::secrets::{ConfigMaps, Secret};

    use super::*;
    use crate::vector::outputs::test_support::{context, render_toml};

    fn splunk_output(options: SplunkOptions) -> OutputSpec {
        let mut out = OutputSpec::new("splunk", OutputType::Splunk, "https://splunk:8088");
        out.secret = Some(SecretRef {
            name: "hec".to_owned(),
        });
        out.splunk = Some(options);
        out
    }

    #[test]
    fn index_key_templates_the_index() {
        let out = splunk_output(SplunkOptions {
            index_key: Some("kubernetes.namespace_name".to_owned()),
            ..SplunkOptions::default()
        });
        let secret = Secret::new().with("hecToken", "tok");
        let spec = ForwarderSpec::default();
        let options = CompileOptions::default();
        let config_maps = ConfigMaps::new();
        let mut ctx = context(&out, &spec, Some(&secret), &config_maps, &options);
        let (text, value) = render_toml(&render(&mut ctx).unwrap());
        assert!(text.contains(r#"._splunk_index = to_string(.kubernetes.namespace_name) ?? """#));
        let sink = &value["sinks"]["output_splunk"];
        assert_eq!(sink["index"].as_str(), Some("{{ _splunk_index }}"));
        assert_eq!(sink["default_token"].as_str(), Some("tok"));
        assert_eq!(sink["inputs"][0].as_str(), Some("output_splunk_add_splunk_index"));
    }

    #[test]
    fn missing_hec_token_is_missing_reference() {
        let out = splunk_output(SplunkOptions::default());
        let secret = Secret::new();
        let spec = ForwarderSpec::default();
        let options = CompileOptions::default();
        let config_maps = ConfigMaps::new();
        let mut ctx = context(&out, &spec, Some(&secret), &config_maps, &options);
        let err = render(&mut ctx).err().unwrap();
        assert!(matches!(
            err,
            GeneratorError::MissingReference { ref name, ref key, .. } if name == "hec" && key == "hecToken"
        ));
    }

    #[test]
    fn fields_are_reported_not_rendered() {
        let out = splunk_output(SplunkOptions {
            index_name: Some("main".to_owned()),
            fields: vec!["cluster".to_owned()],
            ..SplunkOptions::default()
        });
        let secret = Secret::new().with("hecToken", "tok");
        let spec = ForwarderSpec::default();
        let options = CompileOptions::default();
        let config_maps = ConfigMaps::new();
        let mut ctx = context(&out, &spec, Some(&secret), &config_maps, &options);
        let (text, _) = render_toml(&render(&mut ctx).unwrap());
        assert!(!text.contains("cluster"));
        assert_eq!(ctx.warnings.len(), 1);
        assert_eq!(ctx.warnings[0].field, "splunk.fields");
    }
}
