//! HTTP 출력

use crate::engine::BoxedElement;
use crate::error::GeneratorError;
use crate::vector::elements::{Component, Remap, toml_key};
use crate::vector::otel::otel_vrl;
use crate::vector::outputs::{
    OutputContext, add_http_auth, add_tls, add_tuning, disable_healthcheck,
};

const DEFAULT_TIMEOUT_SECS: i64 = 10;
const OTEL_SCHEMA: &str = "opentelemetry";

pub fn render(ctx: &mut OutputContext<'_>) -> Result<Vec<BoxedElement>, GeneratorError> {
    let output = ctx.output;
    let http = output.http.clone().unwrap_or_default();
    let method = http
        .method
        .as_deref()
        .filter(|m| !m.is_empty())
        .unwrap_or("post")
        .to_ascii_lowercase();
    if !matches!(method.as_str(), "post" | "put") {
        return Err(GeneratorError::invalid(
            &output.name,
            format!("http method must be POST or PUT, got '{method}'"),
        ));
    }

    let mut elements: Vec<BoxedElement> = Vec::new();
    let mut inputs = ctx.inputs.clone();
    let otel = ctx.options.annotation_enable_schema
        && http.schema.as_deref() == Some(OTEL_SCHEMA);
    if otel {
        let id = ctx.sub_id("otel");
        elements.push(Box::new(
            Remap::new(id.clone(), inputs, otel_vrl())
                .with_desc("Normalize log records to OTEL schema"),
        ));
        inputs = vec![id];
    }

    let mut sink = Component::sink(&ctx.id, "http", &inputs);
    sink.main()
        .string("uri", &output.url)
        .string("method", &method);
    disable_healthcheck(&mut sink);
    add_tuning(&mut sink, output)?;
    sink.table("encoding").string("codec", "json");

    let timeout = http.timeout.map_or(DEFAULT_TIMEOUT_SECS, i64::from);
    sink.table("request").int("timeout_secs", timeout);
    let headers = sink.table("request.headers");
    for (name, value) in &http.headers {
        headers.string(&toml_key(name), value);
    }
    add_tls(&mut sink, ctx, false)?;
    add_http_auth(&mut sink, ctx);

    elements.push(Box::new(sink));
    Ok(elements)
}
