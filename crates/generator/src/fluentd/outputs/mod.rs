//! Fluentd 출력 패스
//!
//! 파이프라인이 참조하는 출력마다 `<label @OUTPUT>` 하나를 만듭니다.
//! 속도 제한이 있으면 레이블 맨 앞에 throttle 필터를 두어 이 출력을 향하는
//! 모든 파이프라인의 합에 한도가 걸립니다. 레거시 저장소 옵션이 켜져 있으면
//! `@include` 레이블을 함께 만듭니다.

pub mod buffer;
pub mod cloudwatch;
pub mod elasticsearch;
pub mod forward;
pub mod http;
pub mod kafka;
pub mod loki;
pub mod syslog;

use std::collections::BTreeSet;

use logfwd_core::forwarder::{ForwarderSpec, OutputSpec, OutputType};
use logfwd_core::options::CompileOptions;
use logfwd_core::secrets::{ConfigMaps, Secret, Secrets};
use tracing::debug;

use crate::Warning;
use crate::error::GeneratorError;
use crate::fluentd::elements::{ANY, Block, Label, file_contents, record_modifier};
use crate::fluentd::pipelines::{LEGACY_SECUREFORWARD, LEGACY_SYSLOG};
use crate::naming::{label_name, lane_label, store_id};
use crate::tls::{self, ResolvedTls, secret_path};

const SECURE_FORWARD_CONF: &str = "/etc/fluent/configs.d/secure-forward/secure-forward.conf";
const SYSLOG_CONF: &str = "/etc/fluent/configs.d/syslog/syslog.conf";

/// 출력 하나를 렌더링하는 동안 쓰는 문맥
pub struct OutputContext<'a> {
    pub output: &'a OutputSpec,
    pub spec: &'a ForwarderSpec,
    pub secret: Option<&'a Secret>,
    pub config_maps: &'a ConfigMaps,
    pub options: &'a CompileOptions,
    /// `@id`와 버퍼 경로에 쓰는 저장소 ID
    pub store_id: String,
    pub warnings: Vec<Warning>,
}

impl OutputContext<'_> {
    /// 시크릿에 키가 있으면 그 마운트 경로
    pub fn secret_file(&self, key: &str) -> Option<String> {
        let name = self.output.secret_name()?;
        self.secret
            .filter(|s| s.has(key))
            .map(|_| secret_path(name, key))
    }

    /// 시크릿 키 값 (없거나 비어 있으면 None)
    pub fn secret_value(&self, key: &str) -> Option<String> {
        self.secret
            .filter(|s| s.has_value(key))
            .map(|s| s.get(key))
    }

    pub fn required_secret(&self, key: &str) -> Result<String, GeneratorError> {
        tls::required_secret_value(self.output, self.secret, key)
    }

    pub fn tls(&self) -> Result<ResolvedTls, GeneratorError> {
        tls::resolve(
            self.output,
            self.secret,
            self.config_maps,
            self.spec,
            self.options,
        )
    }

    /// 지원하지 않는 필드 경고를 남깁니다.
    pub fn warn(&mut self, field: &str, message: impl Into<String>) {
        self.warnings
            .push(Warning::new(&self.output.name, field, message));
    }
}

/// 파일 내용 표현식 (`"#{File.read(...) rescue nil}"`)으로 읽는 `username`/`password`
pub fn basic_auth_files(ctx: &OutputContext<'_>) -> Option<(String, String)> {
    let user = ctx.secret_file(tls::keys::USERNAME)?;
    let password = ctx.secret_file(tls::keys::PASSWORD)?;
    Some((file_contents(&user), file_contents(&password)))
}

/// `kubernetes.labels` / `namespace_labels` / `flat_labels` 키의 `.`과 `/`를 `_`로 바꿉니다.
pub fn dedot_labels() -> Block {
    record_modifier(
        ANY,
        &[
            (
                "_dummy_",
                r#"${if m=record.dig("kubernetes","namespace_labels");record["kubernetes"]["namespace_labels"]={}.tap{|n|m.each{|k,v|n[k.gsub(/[.\/]/,'_')]=v}};end}"#,
            ),
            (
                "_dummy2_",
                r#"${if m=record.dig("kubernetes","labels");record["kubernetes"]["labels"]={}.tap{|n|m.each{|k,v|n[k.gsub(/[.\/]/,'_')]=v}};end}"#,
            ),
            (
                "_dummy3_",
                r#"${if m=record.dig("kubernetes","flat_labels");record["kubernetes"]["flat_labels"]=[].tap{|n|m.each_with_index{|s, i|n[i] = s.gsub(/[.\/]/,'_')}};end}"#,
            ),
        ],
    )
    .desc("dedot namespace_labels and rebuild message field if present")
    .param("remove_keys", "_dummy_, _dummy2_, _dummy3_")
}

/// throttle 그룹 키로 쓰는 임시 필드
pub const THROTTLE_GROUP_FIELD: &str = "_throttle_group";

/// 초당 레코드 한도 필터
///
/// 모든 레코드에 출력 이름을 그룹 키로 심어 출력 전체가 버킷 하나를 공유하고,
/// throttle 뒤에서 그 필드를 지웁니다.
pub fn throttle(group: &str, threshold: u64) -> [Block; 3] {
    [
        record_modifier(ANY, &[(THROTTLE_GROUP_FIELD, group)]),
        Block::filter(ANY)
            .desc("Throttle records for the whole output")
            .param("@type", "throttle")
            .param("group_key", THROTTLE_GROUP_FIELD)
            .param("group_bucket_period_s", "1")
            .param("group_bucket_limit", threshold.to_string()),
        Block::filter(ANY)
            .param("@type", "record_modifier")
            .param("remove_keys", THROTTLE_GROUP_FIELD),
    ]
}

/// 이 수집기가 처리하지 않는 튜닝 필드를 경고로 남깁니다.
fn warn_unsupported_tuning(ctx: &mut OutputContext<'_>) {
    let Some(tuning) = ctx.output.tuning.as_ref() else {
        return;
    };
    let delivery = tuning.delivery.is_some();
    let max_write = tuning.max_write.is_some();
    if delivery {
        ctx.warn(
            "tuning.deliveryMode",
            "delivery mode is not supported by the fluentd collector; file buffers are always used",
        );
    }
    if max_write {
        ctx.warn(
            "tuning.maxWrite",
            "maxWrite is not supported by the fluentd collector",
        );
    }
    if ctx.output.compression().is_some() {
        ctx.warn(
            "tuning.compression",
            "compression is not supported by the fluentd collector",
        );
    }
}

fn render_output(ctx: &mut OutputContext<'_>, label: &mut Label) -> Result<Vec<Label>, GeneratorError> {
    match ctx.output.kind {
        OutputType::Elasticsearch => elasticsearch::render(ctx, label).map(|()| Vec::new()),
        OutputType::Loki => loki::render(ctx, label).map(|()| Vec::new()),
        OutputType::LokiStack => loki::render_stack(ctx, label),
        OutputType::Kafka => kafka::render(ctx, label).map(|()| Vec::new()),
        OutputType::Cloudwatch => cloudwatch::render(ctx, label).map(|()| Vec::new()),
        OutputType::Syslog => syslog::render(ctx, label).map(|()| Vec::new()),
        OutputType::Http => http::render(ctx, label).map(|()| Vec::new()),
        OutputType::FluentdForward => forward::render(ctx, label).map(|()| Vec::new()),
        OutputType::Splunk | OutputType::AzureMonitor | OutputType::GoogleCloudLogging => {
            Err(GeneratorError::invalid(
                &ctx.output.name,
                format!(
                    "{} is not supported by the fluentd collector",
                    ctx.output.kind.as_str()
                ),
            ))
        }
    }
}

fn legacy_label(name: &str, include: &str) -> Label {
    Label::new(lane_label(name)).block(
        Block::matching(ANY)
            .param("@type", "copy")
            .line(format!("@include {include}")),
    )
}

/// 레거시 저장소 레이블 (옵션이 켜진 것만)
pub fn legacy(options: &CompileOptions) -> Vec<Label> {
    let mut labels = Vec::new();
    if options.include_legacy_forward_config {
        labels.push(legacy_label(LEGACY_SECUREFORWARD, SECURE_FORWARD_CONF));
    }
    if options.include_legacy_syslog_config {
        labels.push(legacy_label(LEGACY_SYSLOG, SYSLOG_CONF));
    }
    labels
}

/// 출력 레이블 (스펙 순서)
///
/// 어떤 파이프라인도 참조하지 않는 출력은 건너뜁니다.
pub fn outputs(
    spec: &ForwarderSpec,
    secrets: &Secrets,
    config_maps: &ConfigMaps,
    options: &CompileOptions,
    warnings: &mut Vec<Warning>,
) -> Result<Vec<Label>, GeneratorError> {
    let referenced: BTreeSet<&str> = spec
        .pipelines
        .iter()
        .flat_map(|p| p.output_refs.iter().map(String::as_str))
        .collect();
    let mut labels = Vec::new();

    for output in &spec.outputs {
        if !referenced.contains(output.name.as_str()) {
            debug!(output = %output.name, "output not referenced by any pipeline, skipping");
            continue;
        }
        let mut ctx = OutputContext {
            output,
            spec,
            secret: tls::output_secret(output, secrets)?,
            config_maps,
            options,
            store_id: store_id(&output.name),
            warnings: Vec::new(),
        };
        warn_unsupported_tuning(&mut ctx);

        let mut label = Label::new(label_name(&output.name));
        if let Some(threshold) = output.max_records_per_second() {
            for block in throttle(&ctx.store_id, threshold) {
                label.push(block);
            }
        }
        let extra = render_output(&mut ctx, &mut label)?;
        labels.push(label);
        labels.extend(extra);
        warnings.append(&mut ctx.warnings);
    }
    labels.extend(legacy(options));
    Ok(labels)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// 단일 출력용 문맥
    pub fn context<'a>(
        output: &'a OutputSpec,
        spec: &'a ForwarderSpec,
        secret: Option<&'a Secret>,
        config_maps: &'a ConfigMaps,
        options: &'a CompileOptions,
    ) -> OutputContext<'a> {
        OutputContext {
            output,
            spec,
            secret,
            config_maps,
            options,
            store_id: store_id(&output.name),
            warnings: Vec::new(),
        }
    }

    /// 출력 하나를 레이블 텍스트로 렌더링합니다.
    pub fn render_label(
        output: &OutputSpec,
        secret: Option<&Secret>,
        options: &CompileOptions,
    ) -> Result<(String, Vec<Warning>), GeneratorError> {
        render_label_in(&ForwarderSpec::default(), output, secret, options)
    }

    /// 주어진 포워더 안에서 출력 레이블을 렌더링합니다.
    pub fn render_label_in(
        spec: &ForwarderSpec,
        output: &OutputSpec,
        secret: Option<&Secret>,
        options: &CompileOptions,
    ) -> Result<(String, Vec<Warning>), GeneratorError> {
        let config_maps = ConfigMaps::new();
        let mut ctx = context(output, spec, secret, &config_maps, options);
        let mut label = Label::new(label_name(&output.name));
        let extra = render_output(&mut ctx, &mut label)?;
        let mut text = crate::engine::Context::new().compose_one(&label)?;
        for l in &extra {
            text.push_str("\n\n");
            text.push_str(&crate::engine::Context::new().compose_one(l)?);
        }
        Ok((text, ctx.warnings))
    }
}

#[cfg(test)]
mod tests {
    use logfwd_core::forwarder::{DeliveryMode, LimitSpec, OutputTuning, PipelineSpec};

    use super::*;
    use crate::engine::Context;

    fn pipeline(outputs: &[&str]) -> PipelineSpec {
        PipelineSpec {
            name: "p1".to_owned(),
            input_refs: vec!["application".to_owned()],
            output_refs: outputs.iter().map(|s| (*s).to_owned()).collect(),
            ..PipelineSpec::default()
        }
    }

    fn compile(spec: &ForwarderSpec, options: &CompileOptions) -> (Vec<Label>, Vec<Warning>) {
        let mut warnings = Vec::new();
        let labels = outputs(spec, &Secrets::new(), &ConfigMaps::new(), options, &mut warnings).unwrap();
        (labels, warnings)
    }

    #[test]
    fn throttle_leads_the_output_label() {
        let mut out = OutputSpec::new("loki", OutputType::Loki, "http://loki:3100");
        out.limit = Some(LimitSpec {
            max_records_per_second: 100,
        });
        let spec = ForwarderSpec {
            outputs: vec![out],
            pipelines: vec![pipeline(&["loki"])],
            ..ForwarderSpec::default()
        };
        let (labels, _) = compile(&spec, &CompileOptions::default());
        let text = Context::new().compose_one(&labels[0]).unwrap();
        assert!(text.starts_with(
            "<label @LOKI>\n  <filter **>\n    @type record_modifier\n    <record>\n      _throttle_group loki\n"
        ));
        assert!(text.contains("group_bucket_limit 100"));
        assert!(text.find("@type throttle").unwrap() < text.find("@type loki").unwrap());
        assert!(text.find("@type throttle").unwrap() < text.find("remove_keys _throttle_group").unwrap());
    }

    #[test]
    fn throttle_groups_the_whole_output_not_each_container() {
        let mut out = OutputSpec::new("es-1", OutputType::Elasticsearch, "http://es:9200");
        out.limit = Some(LimitSpec {
            max_records_per_second: 10,
        });
        let mut second = pipeline(&["es-1"]);
        second.name = "p2".to_owned();
        second.input_refs = vec!["infrastructure".to_owned()];
        let spec = ForwarderSpec {
            outputs: vec![out],
            pipelines: vec![pipeline(&["es-1"]), second],
            ..ForwarderSpec::default()
        };
        let (labels, _) = compile(&spec, &CompileOptions::default());
        let text = Context::new().compose_one(&labels[0]).unwrap();
        assert!(text.contains("group_key _throttle_group\n"));
        assert!(!text.contains("group_key kubernetes"));
        assert_eq!(text.matches("@type throttle").count(), 1);
        assert!(text.contains("_throttle_group es_1\n"));
    }

    #[test]
    fn unreferenced_outputs_are_skipped() {
        let spec = ForwarderSpec {
            outputs: vec![
                OutputSpec::new("used", OutputType::Http, "http://h"),
                OutputSpec::new("lonely", OutputType::Http, "http://h"),
            ],
            pipelines: vec![pipeline(&["used"])],
            ..ForwarderSpec::default()
        };
        let (labels, _) = compile(&spec, &CompileOptions::default());
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].name(), "@USED");
    }

    #[test]
    fn unsupported_tuning_is_a_warning() {
        let mut out = OutputSpec::new("h", OutputType::Http, "http://h");
        out.tuning = Some(OutputTuning {
            delivery: Some(DeliveryMode::AtLeastOnce),
            max_write: Some("1M".to_owned()),
            ..OutputTuning::default()
        });
        let spec = ForwarderSpec {
            outputs: vec![out],
            pipelines: vec![pipeline(&["h"])],
            ..ForwarderSpec::default()
        };
        let (_, warnings) = compile(&spec, &CompileOptions::default());
        let fields: Vec<&str> = warnings.iter().map(|w| w.field.as_str()).collect();
        assert_eq!(fields, vec!["tuning.deliveryMode", "tuning.maxWrite"]);
    }

    #[test]
    fn splunk_is_rejected() {
        let spec = ForwarderSpec {
            outputs: vec![OutputSpec::new("s", OutputType::Splunk, "https://hec:8088")],
            pipelines: vec![pipeline(&["s"])],
            ..ForwarderSpec::default()
        };
        let mut warnings = Vec::new();
        let err = outputs(&spec, &Secrets::new(), &ConfigMaps::new(), &CompileOptions::default(), &mut warnings)
            .unwrap_err();
        assert!(matches!(err, GeneratorError::InvalidSpec { ref name, .. } if name == "s"));
    }

    #[test]
    fn legacy_labels_include_mounted_configs() {
        let options = CompileOptions {
            include_legacy_syslog_config: true,
            ..CompileOptions::default()
        };
        let labels = legacy(&options);
        assert_eq!(labels.len(), 1);
        let text = Context::new().compose_one(&labels[0]).unwrap();
        assert_eq!(
            text,
            "<label @_LEGACY_SYSLOG>\n  <match **>\n    @type copy\n    @include /etc/fluent/configs.d/syslog/syslog.conf\n  </match>\n</label>"
        );
    }

    #[test]
    fn dedot_removes_scratch_keys() {
        let text = dedot_labels().to_conf();
        assert!(text.contains("gsub(/[.\\/]/,'_')"));
        assert!(text.ends_with("  remove_keys _dummy_, _dummy2_, _dummy3_\n</filter>"));
    }
}
