//! Kafka 출력 (`kafka2`)

use crate::error::GeneratorError;
use crate::fluentd::elements::{ANY, Block, Label, file_contents, quoted};
use crate::fluentd::outputs::buffer::buffer;
use crate::fluentd::outputs::{OutputContext, dedot_labels};
use crate::tls::keys;
use crate::vector::outputs::kafka::{bootstrap_servers, topic};

/// SASL 메커니즘 → `scram_mechanism` 값
fn scram_mechanism(mechanism: &str) -> Option<&'static str> {
    match mechanism.trim().to_ascii_uppercase().as_str() {
        "SCRAM-SHA-256" => Some("sha256"),
        "SCRAM-SHA-512" => Some("sha512"),
        _ => None,
    }
}

fn is_secure(url: &str, brokers: &[String]) -> bool {
    let secure = |u: &str| u.starts_with("tls://") || u.starts_with("ssl://");
    if url.is_empty() {
        !brokers.is_empty() && brokers.iter().all(|b| secure(b))
    } else {
        secure(url)
    }
}

pub fn render(ctx: &mut OutputContext<'_>, label: &mut Label) -> Result<(), GeneratorError> {
    let output = ctx.output;
    let kafka = output.kafka.clone().unwrap_or_default();
    let brokers = bootstrap_servers(&output.url, &kafka.brokers);
    if brokers.is_empty() {
        return Err(GeneratorError::invalid(
            &output.name,
            "kafka output requires a url or at least one broker",
        ));
    }
    let secure = is_secure(&output.url, &kafka.brokers);

    let mut block = Block::matching(ANY)
        .param("@type", "kafka2")
        .param("@id", ctx.store_id.as_str())
        .param("brokers", brokers)
        .param("default_topic", topic(&output.url, kafka.topic.as_deref()))
        .param("use_event_time", "true");

    let sasl = ctx
        .secret_value(keys::SASL_ENABLE)
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
    if let Some(user) = ctx.secret_file(keys::USERNAME) {
        block.push_param("username", file_contents(&user));
    }
    if let Some(password) = ctx.secret_file(keys::PASSWORD) {
        block.push_param("password", file_contents(&password));
    }

    let tls = ctx.tls()?;
    if secure {
        block = block
            .opt_param("ssl_client_cert", tls.cert_file.as_deref().map(quoted))
            .opt_param("ssl_client_cert_key", tls.key_file.as_deref().map(quoted))
            .opt_param("ssl_client_cert_key_password", tls.key_pass.as_deref().map(quoted))
            .opt_param("ssl_ca_cert", tls.ca_file.as_deref().map(quoted));
        if tls.insecure {
            block.push_param("ssl_verify_hostname", "false");
        }
    }
    if sasl {
        block.push_param("sasl_over_ssl", secure.to_string());
        if let Some(mechanism) = ctx
            .secret_value(keys::SASL_MECHANISMS)
            .as_deref()
            .and_then(scram_mechanism)
        {
            block.push_param("scram_mechanism", mechanism);
        }
    }

    label.push(dedot_labels());
    label.push(
        block
            .child(Block::new("format").param("@type", "json"))
            .child(buffer(ctx, &[], &ctx.store_id)),
    );
    Ok(())
}
