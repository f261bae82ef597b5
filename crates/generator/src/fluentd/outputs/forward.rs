//! fluentd forward 출력

use crate::endpoint::{url_host, url_port};
use crate::error::GeneratorError;
use crate::fluentd::elements::{ANY, Block, Label, file_contents, quoted};
use crate::fluentd::outputs::buffer::buffer;
use crate::fluentd::outputs::{OutputContext, basic_auth_files};
use crate::tls::{keys, ruby_tls_version};

const DEFAULT_PORT: u16 = 24224;
const NODE_HOSTNAME: &str = "\"#{ENV['NODE_NAME']}\"";

pub fn render(ctx: &mut OutputContext<'_>, label: &mut Label) -> Result<(), GeneratorError> {
    let output = ctx.output;
    let scheme = output.url_scheme();
    if !matches!(scheme.as_str(), "tcp" | "tls") {
        return Err(GeneratorError::invalid(
            &output.name,
            format!("fluentdForward url scheme must be tcp or tls, got '{scheme}'"),
        ));
    }

    let mut block = Block::matching(ANY)
        .param("@type", "forward")
        .param("@id", ctx.store_id.as_str())
        .param("heartbeat_type", "none")
        .param("keepalive", "true");

    if scheme == "tls" {
        let tls = ctx.tls()?;
        block = block.param("transport", "tls");
        if let Some(profile) = &tls.profile {
            block.push_param("tls_version", ruby_tls_version(profile.min_tls_version));
            if !profile.ciphers.is_empty() {
                block.push_param("tls_ciphers", profile.cipher_list(":"));
            }
        }
        if tls.insecure {
            block = block
                .param("tls_verify_hostname", "false")
                .param("tls_insecure_mode", "true");
        }
        block = block
            .opt_param("tls_cert_path", tls.ca_file.as_deref().map(quoted))
            .opt_param("tls_client_cert_path", tls.cert_file.as_deref().map(quoted))
            .opt_param(
                "tls_client_private_key_path",
                tls.key_file.as_deref().map(quoted),
            )
            .opt_param(
                "tls_client_private_key_passphrase",
                tls.key_pass.as_deref().map(quoted),
            );
    }

    if let Some(shared_key) = ctx.secret_file(keys::SHARED_KEY) {
        block.push_child(
            Block::new("security")
                .param("self_hostname", NODE_HOSTNAME)
                .param("shared_key", file_contents(&shared_key)),
        );
    }

    let mut server = Block::new("server")
        .param("host", url_host(&output.url))
        .param("port", url_port(&output.url).unwrap_or(DEFAULT_PORT).to_string());
    if let Some((user, password)) = basic_auth_files(ctx) {
        server = server.param("username", user).param("password", password);
    }

    label.push(block.child(server).child(buffer(ctx, &[], &ctx.store_id)));
    Ok(())
}
