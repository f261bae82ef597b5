//! Vector 파이프라인 패스
//!
//! 파이프라인을 이름 순으로 처리합니다. 각 파이프라인은 예외 감지(선택),
//! 레이블/JSON 파싱 remap, 필터 체인 순서로 이어지며 마지막 컴포넌트가
//! 출력이 소비하는 ID가 됩니다.

use std::collections::BTreeMap;

use logfwd_core::forwarder::{ForwarderSpec, PipelineSpec};

use crate::engine::BoxedElement;
use crate::error::GeneratorError;
use crate::naming::make_id;
use crate::vector::elements::{DetectExceptions, Remap};
use crate::vector::filters::filter_element;
use crate::vector::inputs::input_component;

pub const PARSE_JSON: &str = r#"parsed, err = parse_json(to_string(.message) ?? "")
if err == null {
  .structured = parsed
  del(.message)
}"#;

/// 파이프라인 remap ID (`pipeline_<name>`)
pub fn pipeline_id(pipeline: &str) -> String {
    make_id(&["pipeline", pipeline])
}

/// `.openshift.labels` 대입 (키 정렬)
pub fn labels_vrl(labels: &BTreeMap<String, String>) -> Result<String, GeneratorError> {
    let json = serde_json::to_string(labels)
        .map_err(|e| GeneratorError::render("remap", format!("labels: {e}")))?;
    Ok(format!(".openshift.labels = {json}"))
}

fn pipeline_vrl(pipeline: &PipelineSpec) -> Result<String, GeneratorError> {
    let mut parts = Vec::new();
    if !pipeline.labels.is_empty() {
        parts.push(labels_vrl(&pipeline.labels)?);
    }
    if pipeline.parses_json() {
        parts.push(PARSE_JSON.to_owned());
    }
    Ok(parts.join("\n"))
}

/// 파이프라인 입력 컴포넌트 (참조 순서, 중복 제거)
fn pipeline_inputs(spec: &ForwarderSpec, pipeline: &PipelineSpec) -> Result<Vec<String>, GeneratorError> {
    let mut inputs: Vec<String> = Vec::new();
    for input_ref in &pipeline.input_refs {
        let id = input_component(spec, input_ref).ok_or_else(|| {
            GeneratorError::invalid(&pipeline.name, format!("unknown input '{input_ref}'"))
        })?;
        if !inputs.contains(&id) {
            inputs.push(id);
        }
    }
    Ok(inputs)
}

/// 파이프라인 섹션 결과
pub struct Pipelines {
    pub elements: Vec<BoxedElement>,
    /// 파이프라인 이름 → 마지막 컴포넌트 ID
    pub terminals: BTreeMap<String, String>,
}

pub fn pipelines(spec: &ForwarderSpec) -> Result<Pipelines, GeneratorError> {
    let mut elements: Vec<BoxedElement> = Vec::new();
    let mut terminals = BTreeMap::new();

    for pipeline in spec.sorted_pipelines() {
        let mut inputs = pipeline_inputs(spec, pipeline)?;
        let id = pipeline_id(&pipeline.name);

        if pipeline.detect_multiline_errors {
            let detect = format!("{id}_detect_exceptions");
            elements.push(Box::new(DetectExceptions {
                id: detect.clone(),
                inputs,
            }));
            inputs = vec![detect];
        }

        elements.push(Box::new(Remap::new(id.clone(), inputs, pipeline_vrl(pipeline)?)));
        let mut last = id;

        for filter_ref in &pipeline.filter_refs {
            let filter = spec.filter(filter_ref).ok_or_else(|| {
                GeneratorError::invalid(&pipeline.name, format!("unknown filter '{filter_ref}'"))
            })?;
            let filter_id = make_id(&["pipeline", &pipeline.name, &filter.name]);
            elements.push(filter_element(filter_id.clone(), vec![last], filter)?);
            last = filter_id;
        }
        terminals.insert(pipeline.name.clone(), last);
    }
    Ok(Pipelines { elements, terminals })
}
