//! 내부 메트릭 내보내기 패스

use logfwd_core::options::CompileOptions;

use crate::engine::BoxedElement;
use crate::tls::METRICS_TLS_DIR;
use crate::vector::elements::{Component, Remap};
use crate::vector::sources::INTERNAL_METRICS;

pub const ADD_NODENAME: &str = "add_nodename_to_metric";
pub const PROMETHEUS_OUTPUT: &str = "prometheus_output";
pub const PROMETHEUS_ADDRESS: &str = "[::]:24231";

pub fn metrics(options: &CompileOptions) -> Vec<BoxedElement> {
    let remap = Remap::new(
        ADD_NODENAME,
        vec![INTERNAL_METRICS.to_owned()],
        r#".tags.hostname = get_env_var("VECTOR_SELF_NODE_NAME") ?? """#,
    );

    let mut sink = Component::sink(PROMETHEUS_OUTPUT, "prometheus_exporter", &[ADD_NODENAME]);
    sink.main()
        .string("address", PROMETHEUS_ADDRESS)
        .string("default_namespace", "collector");
    let tls = sink.table("tls");
    tls.boolean("enabled", true)
        .string("key_file", &format!("{METRICS_TLS_DIR}/tls.key"))
        .string("crt_file", &format!("{METRICS_TLS_DIR}/tls.crt"));
    if let Some(profile) = options.cluster_tls_profile.as_ref() {
        tls.string("min_tls_version", profile.min_tls_version.token());
        if !profile.ciphers.is_empty() {
            tls.string("ciphersuites", &profile.cipher_list(","));
        }
    }

    vec![Box::new(remap), Box::new(sink)]
}
