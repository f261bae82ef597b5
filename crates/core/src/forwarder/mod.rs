//! 포워더 스펙 — 입력, 파이프라인, 출력, 필터, 전역 튜닝
//!
//! [`ForwarderSpec`]은 컴파일 동안 읽기 전용으로 사용되는 선언적 모델입니다.
//! YAML/JSON 문서에서 로드하며, 로드 직후 [`ForwarderSpec::check_references`]로
//! 이름 중복과 참조 누락을 검사합니다.
//!
//! # 사용 예시
//! ```
//! use logfwd_core::forwarder::ForwarderSpec;
//!
//! let spec = ForwarderSpec::parse_yaml(r#"
//! outputs:
//!   - name: loki-1
//!     type: loki
//!     url: http://loki:3100
//! pipelines:
//!   - name: p1
//!     inputRefs: [application]
//!     outputRefs: [loki-1]
//! "#).unwrap();
//! spec.check_references().unwrap();
//! ```

mod filter;
mod input;
mod output;
mod pipeline;

pub use filter::*;
pub use input::*;
pub use output::*;
pub use pipeline::*;

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LogFwdError, SpecError};
use crate::options::TlsProfile;

/// 포워더 스펙
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwarderSpec {
    /// 사용자 정의 입력
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
    #[serde(default)]
    pub outputs: Vec<OutputSpec>,
    #[serde(default)]
    pub pipelines: Vec<PipelineSpec>,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    /// 포워더 수준 TLS 프로파일 (출력 프로파일이 없을 때 적용)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_security_profile: Option<TlsProfile>,
    /// 전역 튜닝
    #[serde(default)]
    pub tuning: ForwarderTuning,
}

/// 전역 튜닝
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwarderTuning {
    /// 파일 버퍼 설정
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer: Option<BufferTuning>,
    /// 파일 tail 한 번에 읽을 최대 줄 수
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_lines_limit: Option<u32>,
}

/// 버퍼 가득 참 동작
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverflowAction {
    /// 입력 측에 예외를 던짐
    ThrowException,
    /// 입력을 멈춤
    Block,
    /// 가장 오래된 청크 폐기
    DropOldestChunk,
}

impl OverflowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThrowException => "throw_exception",
            Self::Block => "block",
            Self::DropOldestChunk => "drop_oldest_chunk",
        }
    }
}

/// 재시도 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RetryType {
    ExponentialBackoff,
    Periodic,
}

impl RetryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExponentialBackoff => "exponential_backoff",
            Self::Periodic => "periodic",
        }
    }
}

/// 플러시 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlushMode {
    Lazy,
    Interval,
    Immediate,
}

impl FlushMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lazy => "lazy",
            Self::Interval => "interval",
            Self::Immediate => "immediate",
        }
    }
}

/// 파일 버퍼 튜닝
///
/// 지정하지 않은 값은 출력기가 환경변수 기반 기본값을 사용합니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferTuning {
    /// 청크 최대 크기 (`8m` 같은 수량 표기)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_limit_size: Option<String>,
    /// 버퍼 전체 최대 크기
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_limit_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overflow_action: Option<OverflowAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flush_thread_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flush_mode: Option<FlushMode>,
    /// 플러시 간격 (`1s` 같은 기간 표기)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flush_interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_wait: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_type: Option<RetryType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_max_interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_timeout: Option<String>,
}

impl ForwarderSpec {
    /// YAML 문자열에서 스펙을 파싱합니다.
    pub fn parse_yaml(yaml: &str) -> Result<Self, LogFwdError> {
        serde_yaml::from_str(yaml).map_err(|e| {
            SpecError::ParseFailed {
                format: "yaml".to_owned(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// JSON 문자열에서 스펙을 파싱합니다.
    pub fn parse_json(json: &str) -> Result<Self, LogFwdError> {
        serde_json::from_str(json).map_err(|e| {
            SpecError::ParseFailed {
                format: "json".to_owned(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// 파일에서 스펙을 로드하고 참조를 검사합니다.
    ///
    /// 확장자가 `.json`이면 JSON, 그 외에는 YAML로 해석합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogFwdError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogFwdError::Spec(SpecError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogFwdError::Io(e)
            }
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let spec = if is_json {
            Self::parse_json(&content)?
        } else {
            Self::parse_yaml(&content)?
        };
        spec.check_references()?;
        Ok(spec)
    }

    /// 이름으로 사용자 정의 입력을 찾습니다.
    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputSpec> {
        self.outputs.iter().find(|o| o.name == name)
    }

    pub fn pipeline(&self, name: &str) -> Option<&PipelineSpec> {
        self.pipelines.iter().find(|p| p.name == name)
    }

    pub fn filter(&self, name: &str) -> Option<&FilterSpec> {
        self.filters.iter().find(|f| f.name == name)
    }

    /// 입력 참조의 소스 타입을 결정합니다.
    ///
    /// 같은 이름의 사용자 정의 입력이 내장 입력보다 우선합니다.
    pub fn source_type_of(&self, input_ref: &str) -> Option<SourceType> {
        match self.input(input_ref) {
            Some(input) => input.source_type(),
            None => SourceType::from_builtin(input_ref),
        }
    }

    /// 파이프라인이 참조하는 소스 타입 집합 (카탈로그 순서)
    pub fn source_types(&self) -> BTreeSet<SourceType> {
        self.pipelines
            .iter()
            .flat_map(|p| p.input_refs.iter())
            .filter_map(|r| self.source_type_of(r))
            .collect()
    }

    /// 이름으로 정렬된 파이프라인
    pub fn sorted_pipelines(&self) -> Vec<&PipelineSpec> {
        let mut pipelines: Vec<&PipelineSpec> = self.pipelines.iter().collect();
        pipelines.sort_by(|a, b| a.name.cmp(&b.name));
        pipelines
    }

    /// 이름 중복과 참조 누락을 검사합니다.
    pub fn check_references(&self) -> Result<(), SpecError> {
        check_unique("input", self.inputs.iter().map(|i| i.name.as_str()))?;
        check_unique("output", self.outputs.iter().map(|o| o.name.as_str()))?;
        check_unique("pipeline", self.pipelines.iter().map(|p| p.name.as_str()))?;
        check_unique("filter", self.filters.iter().map(|f| f.name.as_str()))?;

        for pipeline in &self.pipelines {
            for input_ref in &pipeline.input_refs {
                if self.source_type_of(input_ref).is_none() {
                    return Err(unknown(pipeline, "input", input_ref));
                }
            }
            for output_ref in &pipeline.output_refs {
                if self.output(output_ref).is_none() {
                    return Err(unknown(pipeline, "output", output_ref));
                }
            }
            for filter_ref in &pipeline.filter_refs {
                if self.filter(filter_ref).is_none() {
                    return Err(unknown(pipeline, "filter", filter_ref));
                }
            }
        }
        Ok(())
    }
}

fn check_unique<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> Result<(), SpecError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(SpecError::DuplicateName {
                kind: kind.to_owned(),
                name: name.to_owned(),
            });
        }
    }
    Ok(())
}

fn unknown(pipeline: &PipelineSpec, kind: &str, reference: &str) -> SpecError {
    SpecError::UnknownReference {
        pipeline: pipeline.name.clone(),
        kind: kind.to_owned(),
        reference: reference.to_owned(),
    }
}
