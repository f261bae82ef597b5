//! Kafka 출력

use crate::engine::BoxedElement;
use crate::error::GeneratorError;
use crate::tls::keys;
use crate::vector::elements::Component;
use crate::vector::outputs::{
    OutputContext, add_tls, add_tuning, disable_healthcheck, url_authority, url_path,
};

const DEFAULT_TOPIC: &str = "topic";
const DEFAULT_SASL_MECHANISM: &str = "PLAIN";

/// URL 호스트 다음에 추가 브로커를 붙인 부트스트랩 서버 목록
pub fn bootstrap_servers(url: &str, brokers: &[String]) -> String {
    let mut hosts = Vec::new();
    if !url.is_empty() {
        hosts.push(url_authority(url));
    }
    hosts.extend(brokers.iter().map(|b| url_authority(b)));
    hosts.retain(|h| !h.is_empty());
    hosts.join(",")
}

/// 토픽: 스펙 → URL 경로 → `topic`
pub fn topic(url: &str, topic: Option<&str>) -> String {
    if let Some(t) = topic.filter(|t| !t.is_empty()) {
        return t.to_owned();
    }
    let from_url = url_path(url);
    if from_url.is_empty() {
        DEFAULT_TOPIC.to_owned()
    } else {
        from_url
    }
}

fn tls_brokers(brokers: &[String]) -> bool {
    !brokers.is_empty() && brokers.iter().all(|b| b.starts_with("tls://"))
}

pub fn render(ctx: &mut OutputContext<'_>) -> Result<Vec<BoxedElement>, GeneratorError> {
    let output = ctx.output;
    let kafka = output.kafka.clone().unwrap_or_default();

    let mut sink = Component::sink(&ctx.id, "kafka", &ctx.inputs);
    sink.main()
        .string(
            "bootstrap_servers",
            &bootstrap_servers(&output.url, &kafka.brokers),
        )
        .string("topic", &topic(&output.url, kafka.topic.as_deref()));
    disable_healthcheck(&mut sink);
    add_tuning(&mut sink, output)?;
    sink.table("encoding")
        .string("codec", "json")
        .string("timestamp_format", "rfc3339");

    let sasl_enabled = ctx
        .secret_value(keys::SASL_ENABLE)
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
    if sasl_enabled {
        let mechanism = ctx
            .secret_value(keys::SASL_MECHANISMS)
            .unwrap_or_else(|| DEFAULT_SASL_MECHANISM.to_owned());
        let sasl = sink.table("sasl");
        sasl.boolean("enabled", true).string("mechanism", &mechanism);
        if let Some(user) = ctx.secret_value(keys::USERNAME) {
            sasl.string("username", &user);
        }
        if let Some(password) = ctx.secret_value(keys::PASSWORD) {
            sasl.string("password", &password);
        }
    }

    add_tls(&mut sink, ctx, true)?;
    if output.url.is_empty() && tls_brokers(&kafka.brokers) {
        let tls = sink.table("tls");
        if !tls.has_key("enabled") {
            tls.boolean("enabled", true);
        }
    }

    Ok(vec![Box::new(sink)])
}

#[cfg(test)]
mod tests {
    use logfwd_core::forwarder::{ForwarderSpec, KafkaOptions, OutputSpec, OutputType, SecretRef};
    use logfwd_core::options::CompileOptions;
    use logfwd_core::secrets::{ConfigMaps, Secret};

    use super::*;
    use crate::vector::outputs::test_support::{context, render_toml};

    #[test]
    fn servers_join_url_host_and_brokers() {
        assert_eq!(
            bootstrap_servers(
                "tls://broker-0:9093/app",
                &["tls://broker-1:9093".to_owned(), "tls://broker-2:9093".to_owned()]
            ),
            "broker-0:9093,broker-1:9093,broker-2:9093"
        );
    }

    #[test]
    fn topic_falls_back_to_url_path_then_default() {
        assert_eq!(topic("tcp://b:9092/from-url", Some("spec")), "spec");
        assert_eq!(topic("tcp://b:9092/from-url", None), "from-url");
        assert_eq!(topic("tcp://b:9092", None), "topic");
    }

    #[test]
    fn tls_url_with_sasl_secret() {
        let mut out = OutputSpec::new("kafka-app", OutputType::Kafka, "tls://broker:9093/app");
        out.secret = Some(SecretRef {
            name: "kafka-secret".to_owned(),
        });
        out.kafka = Some(KafkaOptions::default());
        let secret = Secret::new()
            .with("sasl.enable", "true")
            .with("username", "u")
            .with("password", "p");
        let spec = ForwarderSpec::default();
        let options = CompileOptions::default();
        let config_maps = ConfigMaps::new();
        let mut ctx = context(&out, &spec, Some(&secret), &config_maps, &options);
        let (_, value) = render_toml(&render(&mut ctx).unwrap());
        let sink = &value["sinks"]["output_kafka_app"];
        assert_eq!(sink["topic"].as_str(), Some("app"));
        assert_eq!(sink["encoding"]["timestamp_format"].as_str(), Some("rfc3339"));
        assert_eq!(sink["sasl"]["mechanism"].as_str(), Some("PLAIN"));
        assert_eq!(sink["sasl"]["username"].as_str(), Some("u"));
        assert_eq!(sink["tls"]["enabled"].as_bool(), Some(true));
    }

    #[test]
    fn plaintext_broker_has_no_tls_or_sasl() {
        let out = OutputSpec::new("k", OutputType::Kafka, "tcp://broker:9092/app");
        let spec = ForwarderSpec::default();
        let options = CompileOptions::default();
        let config_maps = ConfigMaps::new();
        let mut ctx = context(&out, &spec, None, &config_maps, &options);
        let (text, _) = render_toml(&render(&mut ctx).unwrap());
        assert!(!text.contains("[sinks.output_k.tls]"));
        assert!(!text.contains("[sinks.output_k.sasl]"));
    }
}
