//! Fluentd (Ruby 스타일) 방언
//!
//! # 섹션 순서
//!
//! ```text
//! header -> metrics -> sources -> @CONCAT/@INGRESS -> lanes -> pipelines -> outputs
//! ```
//!
//! 소스 이후의 모든 단계는 `<label>`이며, 레이블 사이의 간선은
//! `relabel`/`copy` 저장소가 만듭니다. 렌더링 전에 간선 그래프가
//! 정의된 레이블만 가리키고 순환이 없는지 확인합니다.

pub mod elements;
pub mod ingress;
pub mod inputs;
pub mod outputs;
pub mod pipelines;
pub mod sources;

use std::collections::BTreeMap;

use logfwd_core::forwarder::ForwarderSpec;
use logfwd_core::options::CompileOptions;
use logfwd_core::secrets::{ConfigMaps, Secrets};
use tracing::debug;

use crate::Warning;
use crate::engine::{BoxedElement, Context, Section};
use crate::error::GeneratorError;
use crate::fluentd::elements::Label;

/// 버퍼 파일 루트
pub const DATA_DIR: &str = "/var/lib/fluentd";
/// tail 위치 파일 디렉토리
pub const POS_DIR: &str = "/var/lib/fluentd/pos";

fn boxed(labels: Vec<Label>) -> Vec<BoxedElement> {
    labels
        .into_iter()
        .map(|l| Box::new(l) as BoxedElement)
        .collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Active,
    Done,
}

fn visit<'a>(
    name: &'a str,
    edges: &BTreeMap<&'a str, Vec<String>>,
    state: &mut BTreeMap<&'a str, Visit>,
) -> Result<(), GeneratorError> {
    match state.get(name) {
        Some(Visit::Done) => return Ok(()),
        Some(Visit::Active) => {
            return Err(GeneratorError::render(
                "label",
                format!("label graph has a cycle through '{name}'"),
            ));
        }
        None => {}
    }
    state.insert(name, Visit::Active);
    if let Some(targets) = edges.get(name) {
        for target in targets {
            if let Some((key, _)) = edges.get_key_value(target.as_str()) {
                visit(*key, edges, state)?;
            }
        }
    }
    state.insert(name, Visit::Done);
    Ok(())
}

/// 레이블 이름이 겹치지 않고, 간선이 정의된 레이블만 가리키며,
/// 순환이 없는지 확인합니다.
pub fn check_label_graph(labels: &[&Label]) -> Result<(), GeneratorError> {
    let mut edges: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for label in labels {
        if edges.insert(label.name(), label.targets()).is_some() {
            return Err(GeneratorError::render(
                "label",
                format!("duplicate label '{}'", label.name()),
            ));
        }
    }
    for (name, targets) in &edges {
        if let Some(missing) = targets.iter().find(|t| !edges.contains_key(t.as_str())) {
            return Err(GeneratorError::render(
                "label",
                format!("label '{name}' routes to undefined label '{missing}'"),
            ));
        }
    }
    let mut state = BTreeMap::new();
    for name in edges.keys() {
        visit(*name, &edges, &mut state)?;
    }
    Ok(())
}

/// 포워더 스펙을 Fluentd 설정 텍스트로 컴파일합니다.
///
/// 검증은 호출자가 먼저 수행합니다. 렌더링 중 발견된 지원하지 않는 필드는
/// `warnings`에 추가됩니다.
pub fn generate(
    spec: &ForwarderSpec,
    secrets: &Secrets,
    config_maps: &ConfigMaps,
    options: &CompileOptions,
    warnings: &mut Vec<Warning>,
) -> Result<String, GeneratorError> {
    let types = spec.source_types();
    debug!(source_types = types.len(), "building fluentd sections");

    let ingress: Vec<Label> = [
        ingress::concat(&types, options),
        ingress::ingress(&types, options),
    ]
    .into_iter()
    .flatten()
    .collect();
    let lanes = inputs::lanes(spec, &types);
    let pipelines = pipelines::pipelines(spec, options)?;
    let outputs = outputs::outputs(spec, secrets, config_maps, options, warnings)?;

    let all: Vec<&Label> = ingress
        .iter()
        .chain(&lanes)
        .chain(&pipelines)
        .chain(&outputs)
        .collect();
    debug!(labels = all.len(), "checking fluentd label graph");
    check_label_graph(&all)?;

    let sections = vec![
        Section::new("Header", sources::header()),
        Section::new("Metrics", sources::metrics(options)),
        Section::new("Sources", sources::sources(spec, &types, options)),
        Section::new("Ingress", boxed(ingress)),
        Section::new("Inputs", boxed(lanes)),
        Section::new("Pipelines", boxed(pipelines)),
        Section::new("Outputs", boxed(outputs)),
    ];

    let mut ctx = Context::new();
    let mut conf = ctx.render_sections(&sections)?;
    conf.push('\n');
    debug!(
        templates = ctx.templates().count(),
        bytes = conf.len(),
        "fluentd config rendered"
    );
    Ok(conf)
}
