//! Fluentd 파이프라인 레이블
//!
//! 파이프라인마다 `<label @NAME>` 하나를 만들고 다음 순서로 단계를 놓습니다.
//! 멀티라인 예외 결합, 사용자 레이블, JSON 파싱, 출력 레이블로의 디스패치.

use logfwd_core::forwarder::{ForwarderSpec, PipelineSpec};
use logfwd_core::options::CompileOptions;
use serde_json::{Map, Value};

use crate::error::GeneratorError;
use crate::fluentd::elements::{ANY, Block, Label, copy};
use crate::naming::{label_name, lane_label};

pub const LEGACY_SECUREFORWARD: &str = "legacy_secureforward";
pub const LEGACY_SYSLOG: &str = "legacy_syslog";

fn detect_exceptions() -> Block {
    Block::matching("kubernetes.**")
        .desc("Join multiline exception stack traces")
        .param("@type", "detect_exceptions")
        .param("remove_tag_prefix", "'kubernetes'")
        .param("message", "message")
        .param("force_line_breaks", "true")
        .param("multiline_flush_interval", ".2")
}

fn user_labels(pipeline: &PipelineSpec) -> Result<Block, GeneratorError> {
    let map: Map<String, Value> = pipeline
        .labels
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    let labels = serde_json::to_string(&Value::Object(map))
        .map_err(|e| GeneratorError::render("pipeline labels", e.to_string()))?;
    Ok(Block::filter(ANY)
        .desc("Add pipeline labels")
        .param("@type", "record_transformer")
        .child(Block::new("record").param("openshift", format!("{{ \"labels\": {labels} }}"))))
}

fn parse_json() -> Block {
    Block::filter(ANY)
        .desc("Parse the message field as JSON into structured")
        .param("@type", "parser")
        .param("key_name", "message")
        .param("reserve_data", "yes")
        .param("hash_value_field", "structured")
        .param("remove_key_name_field", "true")
        .param("emit_invalid_record_to_error", "false")
        .child(
            Block::new("parse")
                .param("@type", "json")
                .param("json_parser", "oj"),
        )
}

/// 파이프라인이 레코드를 넘기는 레이블 (출력 참조 순, 레거시 저장소 포함)
pub fn dispatch_targets(pipeline: &PipelineSpec, options: &CompileOptions) -> Vec<String> {
    let mut targets: Vec<String> = Vec::new();
    for output in &pipeline.output_refs {
        let label = label_name(output);
        if !targets.contains(&label) {
            targets.push(label);
        }
    }
    if options.include_legacy_forward_config {
        targets.push(lane_label(LEGACY_SECUREFORWARD));
    }
    if options.include_legacy_syslog_config {
        targets.push(lane_label(LEGACY_SYSLOG));
    }
    targets
}

fn pipeline_label(pipeline: &PipelineSpec, options: &CompileOptions) -> Result<Label, GeneratorError> {
    let mut label = Label::new(label_name(&pipeline.name))
        .desc(format!("Pipeline '{}'", pipeline.name));
    if pipeline.detect_multiline_errors {
        label.push(detect_exceptions());
    }
    if !pipeline.labels.is_empty() {
        label.push(user_labels(pipeline)?);
    }
    if pipeline.parses_json() {
        label.push(parse_json());
    }
    let targets = dispatch_targets(pipeline, options);
    if !targets.is_empty() {
        label.push(copy(ANY, &targets, true));
    }
    Ok(label)
}

/// 파이프라인 레이블 (이름 순)
pub fn pipelines(spec: &ForwarderSpec, options: &CompileOptions) -> Result<Vec<Label>, GeneratorError> {
    spec.sorted_pipelines()
        .into_iter()
        .map(|p| pipeline_label(p, options))
        .collect()
}
