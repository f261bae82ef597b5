//! 파이프라인 스펙

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 파이프라인 메시지 파싱 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// `message` 필드를 JSON으로 파싱하여 `structured`로 이동
    Json,
}

/// 파이프라인 정의
///
/// 입력 집합과 출력 집합을 잇는 이름 있는 간선이며,
/// 레코드 단위 변환(레이블, JSON 파싱, 필터)을 선택적으로 가집니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSpec {
    pub name: String,
    /// 입력 이름 (내장 타입 또는 사용자 정의 입력)
    #[serde(default)]
    pub input_refs: Vec<String>,
    /// 출력 이름
    #[serde(default)]
    pub output_refs: Vec<String>,
    /// 필터 이름 (선언 순서대로 적용)
    #[serde(default)]
    pub filter_refs: Vec<String>,
    /// 사용자 레이블 (`openshift.labels`에 키 정렬 순으로 기록)
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse: Option<ParseMode>,
    /// 멀티라인 예외(스택 트레이스) 감지
    #[serde(default)]
    pub detect_multiline_errors: bool,
}

impl PipelineSpec {
    /// JSON 파싱 단계가 있는지 여부
    pub fn parses_json(&self) -> bool {
        self.parse == Some(ParseMode::Json)
    }

    /// 레코드를 변경하는 단계가 있는지 여부
    ///
    /// 필터 체인은 항상 레코드를 변경할 수 있는 단계로 취급합니다.
    pub fn mutates_records(&self) -> bool {
        self.parses_json() || !self.labels.is_empty() || !self.filter_refs.is_empty()
    }
}
