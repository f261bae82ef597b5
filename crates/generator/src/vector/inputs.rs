//! Vector 입력 팬아웃 패스
//!
//! 컨테이너 레코드를 네임스페이스 술어로 애플리케이션/인프라로 나누고,
//! 소스 타입별 remap으로 `.log_type`을 붙입니다. 셀렉터가 있는 사용자
//! 애플리케이션 입력은 `route_application_logs`가 나눠 가지며,
//! 어느 경로에도 잡히지 않은 레코드는 `application_all` 경로로 갑니다.

use std::collections::BTreeSet;

use logfwd_core::forwarder::{
    ApplicationInput, ForwarderSpec, INPUT_APPLICATION, INPUT_AUDIT, INPUT_INFRASTRUCTURE,
    SourceType,
};

use crate::catalogue::{RawSource, has_unrouted_application, routed_inputs};
use crate::engine::BoxedElement;
use crate::naming::component_id;
use crate::vector::elements::{Remap, Route};
use crate::vector::normalize::receiver_normalized_id;
use crate::vector::vrl::{and, eq, label_path, neg, or, paren, starts_with};

pub const ROUTE_CONTAINER_LOGS: &str = "route_container_logs";
pub const ROUTE_APPLICATION_LOGS: &str = "route_application_logs";
/// 사용자 경로에 잡히지 않은 애플리케이션 레코드
pub const APPLICATION_ALL: &str = "application_all";

const NAMESPACE: &str = ".kubernetes.namespace_name";

/// 인프라 네임스페이스 술어
pub fn infra_predicate() -> String {
    or(&[
        starts_with(NAMESPACE, "kube-"),
        starts_with(NAMESPACE, "openshift-"),
        eq(NAMESPACE, "default"),
        eq(NAMESPACE, "openshift"),
        eq(NAMESPACE, "kube"),
    ])
}

/// 애플리케이션 네임스페이스 술어 (인프라 술어의 부정)
pub fn app_predicate() -> String {
    neg(&paren(&infra_predicate()))
}

/// 네임스페이스 집합 AND 레이블 일치 술어
pub fn selector_predicate(app: &ApplicationInput) -> String {
    let mut terms = Vec::new();
    if !app.namespaces.is_empty() {
        let namespaces: Vec<String> = app.namespaces.iter().map(|ns| eq(NAMESPACE, ns)).collect();
        terms.push(or(&namespaces));
    }
    for (key, value) in app.match_labels() {
        terms.push(eq(&label_path(key), value));
    }
    and(&terms)
}

/// 입력 참조가 소비할 컴포넌트 ID
pub fn input_component(spec: &ForwarderSpec, input_ref: &str) -> Option<String> {
    let routed = !routed_inputs(spec).is_empty();
    let application = || {
        if routed {
            format!("{ROUTE_APPLICATION_LOGS}.{APPLICATION_ALL}")
        } else {
            INPUT_APPLICATION.to_owned()
        }
    };
    match spec.input(input_ref) {
        Some(input) if input.is_routed_application() => Some(format!(
            "{ROUTE_APPLICATION_LOGS}.{}",
            component_id(&input.name)
        )),
        Some(input) => match input.source_type()? {
            SourceType::Application => Some(application()),
            SourceType::Infrastructure => Some(INPUT_INFRASTRUCTURE.to_owned()),
            SourceType::Audit => Some(INPUT_AUDIT.to_owned()),
            SourceType::Receiver => Some(receiver_normalized_id(&input.name)),
        },
        None => match SourceType::from_builtin(input_ref)? {
            SourceType::Application => Some(application()),
            SourceType::Infrastructure => Some(INPUT_INFRASTRUCTURE.to_owned()),
            SourceType::Audit => Some(INPUT_AUDIT.to_owned()),
            SourceType::Receiver => None,
        },
    }
}

fn log_type(source_type: SourceType) -> String {
    format!(".log_type = {}", crate::vector::vrl::quote(source_type.as_str()))
}

/// 팬아웃 섹션 엘리먼트
pub fn fan_out(spec: &ForwarderSpec, types: &BTreeSet<SourceType>) -> Vec<BoxedElement> {
    let mut elements: Vec<BoxedElement> = Vec::new();
    let app = types.contains(&SourceType::Application);
    let infra = types.contains(&SourceType::Infrastructure);

    if app || infra {
        let mut routes = Vec::new();
        if app {
            routes.push(("app".to_owned(), app_predicate()));
        }
        if infra {
            routes.push(("infra".to_owned(), infra_predicate()));
        }
        elements.push(Box::new(Route {
            id: ROUTE_CONTAINER_LOGS.to_owned(),
            inputs: vec![RawSource::Container.normalized_id().to_owned()],
            routes,
        }));
    }
    if app {
        elements.push(Box::new(
            Remap::new(
                INPUT_APPLICATION,
                vec![format!("{ROUTE_CONTAINER_LOGS}.app")],
                log_type(SourceType::Application),
            )
            .with_desc("Set log_type to \"application\""),
        ));
    }
    if infra {
        elements.push(Box::new(
            Remap::new(
                INPUT_INFRASTRUCTURE,
                vec![
                    format!("{ROUTE_CONTAINER_LOGS}.infra"),
                    RawSource::Journal.normalized_id().to_owned(),
                ],
                log_type(SourceType::Infrastructure),
            )
            .with_desc("Set log_type to \"infrastructure\""),
        ));
    }
    if types.contains(&SourceType::Audit) {
        elements.push(Box::new(
            Remap::new(
                INPUT_AUDIT,
                RawSource::AUDIT
                    .iter()
                    .map(|r| r.normalized_id().to_owned())
                    .collect(),
                log_type(SourceType::Audit),
            )
            .with_desc("Set log_type to \"audit\""),
        ));
    }

    let routed = routed_inputs(spec);
    if !routed.is_empty() {
        let mut routes: Vec<(String, String)> = Vec::new();
        let mut predicates = Vec::new();
        for input in &routed {
            if let Some(selector) = input.application.as_ref() {
                let predicate = selector_predicate(selector);
                routes.push((component_id(&input.name), predicate.clone()));
                predicates.push(neg(&paren(&predicate)));
            }
        }
        if has_unrouted_application(spec) {
            routes.push((APPLICATION_ALL.to_owned(), and(&predicates)));
        }
        elements.push(Box::new(Route {
            id: ROUTE_APPLICATION_LOGS.to_owned(),
            inputs: vec![INPUT_APPLICATION.to_owned()],
            routes,
        }));
    }
    elements
}
