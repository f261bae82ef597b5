//! HTTP 출력 (`http`)

use std::collections::BTreeMap;

use crate::error::GeneratorError;
use crate::fluentd::elements::{ANY, Block, Label, quoted};
use crate::fluentd::outputs::buffer::buffer;
use crate::fluentd::outputs::{OutputContext, basic_auth_files, dedot_labels};
use crate::tls::{keys, ruby_tls_version};

const CONTENT_TYPE: &str = "application/x-ndjson";

fn http_method(method: Option<&str>) -> Option<&'static str> {
    match method.map(str::to_ascii_lowercase).as_deref() {
        None | Some("") | Some("post") => Some("post"),
        Some("put") => Some("put"),
        Some(_) => None,
    }
}

pub fn render(ctx: &mut OutputContext<'_>, label: &mut Label) -> Result<(), GeneratorError> {
    let output = ctx.output;
    let http = output.http.clone().unwrap_or_default();
    let method = http_method(http.method.as_deref()).ok_or_else(|| {
        GeneratorError::invalid(&output.name, "http method must be POST or PUT")
    })?;

    let mut headers: BTreeMap<String, String> = http.headers.clone();
    if let Some(token) = ctx.secret_value(keys::TOKEN) {
        headers.insert("Authorization".to_owned(), format!("Bearer {token}"));
    }

    let mut block = Block::matching(ANY)
        .param("@type", "http")
        .param("@id", ctx.store_id.as_str())
        .param("endpoint", output.url.as_str())
        .param("http_method", method)
        .param("content_type", CONTENT_TYPE);
    if !headers.is_empty() {
        let json = serde_json::to_string(&headers)
            .map_err(|e| GeneratorError::render("http", e.to_string()))?;
        block.push_param("headers", json);
    }
    if let Some(timeout) = http.timeout {
        block.push_param("read_timeout", timeout.to_string());
    }

    if output.is_secure_url() {
        let tls = ctx.tls()?;
        if tls.insecure {
            block.push_param("tls_verify_mode", "none");
        }
        if let Some(profile) = &tls.profile {
            block.push_param("tls_version", ruby_tls_version(profile.min_tls_version));
            if !profile.ciphers.is_empty() {
                block.push_param("tls_ciphers", profile.cipher_list(":"));
            }
        }
        block = block
            .opt_param("tls_ca_cert_path", tls.ca_file.as_deref().map(quoted))
            .opt_param("tls_client_cert_path", tls.cert_file.as_deref().map(quoted))
            .opt_param("tls_private_key_path", tls.key_file.as_deref().map(quoted))
            .opt_param(
                "tls_private_key_passphrase",
                tls.key_pass.as_deref().map(quoted),
            );
    }

    block = block.child(
        Block::new("format")
            .param("@type", "json")
            .param("json_array", "false"),
    );
    if let Some((user, password)) = basic_auth_files(ctx) {
        block = block.child(
            Block::new("auth")
                .param("method", "basic")
                .param("username", user)
                .param("password", password),
        );
    }

    label.push(dedot_labels());
    label.push(block.child(buffer(ctx, &[], &ctx.store_id)));
    Ok(())
}
