//! Fluentd 소스 타입 레인
//!
//! `@INGRESS`가 넘긴 레코드에 `log_type`을 붙이고 해당 타입을 소비하는
//! 파이프라인 레이블로 복제합니다. 셀렉터가 있는 애플리케이션 입력은
//! `label_router`가 입력별 레인으로 나누며, 어느 셀렉터에도 잡히지 않은
//! 레코드만 `@_APPLICATION_ALL`로 갑니다.

use std::collections::{BTreeMap, BTreeSet};

use logfwd_core::forwarder::{
    ApplicationInput, ForwarderSpec, InputSpec, ReceiverType, SourceType,
};

use crate::catalogue::{referenced_receivers, routed_inputs};
use crate::engine::comma_separated;
use crate::fluentd::elements::{ANY, Block, Label, copy, record_modifier};
use crate::naming::{label_name, lane_label, source_type_label};

/// 사용자 셀렉터에 잡히지 않은 애플리케이션 레코드
pub const APPLICATION_ALL: &str = "application_all";

/// 리시버 입력 레인 레이블
pub fn receiver_label(name: &str) -> String {
    lane_label(&format!("receiver_{name}"))
}

/// 셀렉터 입력 레인 레이블
pub fn routed_label(name: &str) -> String {
    lane_label(&format!("input_{name}"))
}

/// 입력 참조가 흘러드는 레인 레이블
pub fn input_lane(spec: &ForwarderSpec, input_ref: &str) -> Option<String> {
    let application = || {
        if routed_inputs(spec).is_empty() {
            source_type_label(SourceType::Application)
        } else {
            lane_label(APPLICATION_ALL)
        }
    };
    match spec.input(input_ref) {
        Some(input) if input.is_routed_application() => Some(routed_label(&input.name)),
        Some(input) => match input.source_type()? {
            SourceType::Application => Some(application()),
            SourceType::Receiver => Some(receiver_label(&input.name)),
            other => Some(source_type_label(other)),
        },
        None => match SourceType::from_builtin(input_ref)? {
            SourceType::Application => Some(application()),
            SourceType::Receiver => None,
            other => Some(source_type_label(other)),
        },
    }
}

/// 레인별 소비 파이프라인 레이블 (파이프라인 이름 순, 중복 없음)
fn consumers(spec: &ForwarderSpec) -> BTreeMap<String, Vec<String>> {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for pipeline in spec.sorted_pipelines() {
        let lanes: BTreeSet<String> = pipeline
            .input_refs
            .iter()
            .filter_map(|r| input_lane(spec, r))
            .collect();
        for lane in lanes {
            map.entry(lane).or_default().push(label_name(&pipeline.name));
        }
    }
    map
}

/// 모든 출력 레이블이 레코드를 다시 쓰므로 둘 이상의 저장소는 항상 깊은 복사입니다.
fn fan_out(label: &mut Label, lane: &str, consumers: &BTreeMap<String, Vec<String>>) {
    if let Some(labels) = consumers.get(lane) {
        label.push(copy(ANY, labels, true));
    }
}

fn selector_block(directive: &'static str, app: &ApplicationInput) -> Block {
    let mut block = Block::new(directive);
    if !app.namespaces.is_empty() {
        block.push_param("namespaces", comma_separated(&app.namespaces));
    }
    let labels: Vec<String> = app
        .match_labels()
        .iter()
        .map(|(k, v)| format!("{k}:{v}"))
        .collect();
    if !labels.is_empty() {
        block.push_param("labels", comma_separated(&labels));
    }
    block
}

fn application_router(routed: &[&InputSpec], unrouted: bool) -> Block {
    let mut router = Block::matching(ANY).param("@type", "label_router");
    let mut excludes = Vec::new();
    for input in routed {
        let Some(app) = input.application.as_ref() else {
            continue;
        };
        router.push_child(
            Block::new("route")
                .param("@label", routed_label(&input.name))
                .child(selector_block("match", app)),
        );
        excludes.push(selector_block("exclude", app));
    }
    if unrouted {
        let mut all = Block::new("route").param("@label", lane_label(APPLICATION_ALL));
        for exclude in excludes {
            all.push_child(exclude);
        }
        router.push_child(all);
    }
    router
}

fn log_type(source_type: &str) -> Block {
    record_modifier(ANY, &[("log_type", source_type)])
}

/// 소스 타입 레인과 입력 레인 레이블
pub fn lanes(spec: &ForwarderSpec, types: &BTreeSet<SourceType>) -> Vec<Label> {
    let consumers = consumers(spec);
    let routed = routed_inputs(spec);
    let mut labels = Vec::new();

    for source_type in types {
        if *source_type == SourceType::Receiver {
            continue;
        }
        let lane = source_type_label(*source_type);
        let mut label = Label::new(lane.as_str())
            .desc(format!("Set log_type to \"{}\"", source_type.as_str()))
            .block(log_type(source_type.as_str()));
        if *source_type == SourceType::Application && !routed.is_empty() {
            let unrouted = consumers.contains_key(&lane_label(APPLICATION_ALL));
            label.push(application_router(&routed, unrouted));
        } else {
            fan_out(&mut label, &lane, &consumers);
        }
        labels.push(label);
    }

    let all = lane_label(APPLICATION_ALL);
    if consumers.contains_key(&all) {
        let mut label = Label::new(all.as_str()).desc("Application logs not claimed by any selector");
        fan_out(&mut label, &all, &consumers);
        labels.push(label);
    }

    for input in &routed {
        let lane = routed_label(&input.name);
        let mut label = Label::new(lane.as_str()).desc(format!("Application input '{}'", input.name));
        fan_out(&mut label, &lane, &consumers);
        labels.push(label);
    }

    for input in referenced_receivers(spec) {
        let Some(receiver) = input.receiver.as_ref() else {
            continue;
        };
        let lane = receiver_label(&input.name);
        let block = match receiver.kind {
            ReceiverType::Syslog => log_type(SourceType::Infrastructure.as_str()),
            ReceiverType::Http => record_modifier(
                ANY,
                &[
                    ("log_type", SourceType::Audit.as_str()),
                    ("k8s_audit_level", "${record['level']}"),
                ],
            ),
        };
        let mut label = Label::new(lane.as_str())
            .desc(format!("Receiver input '{}'", input.name))
            .block(block);
        fan_out(&mut label, &lane, &consumers);
        labels.push(label);
    }
    labels
}
