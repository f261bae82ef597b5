#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`engine`]: 엘리먼트 트레이트와 렌더 컨텍스트 (compose, kv, indent)
//! - [`catalogue`]: 소스 타입별 원시 소스 카탈로그
//! - [`endpoint`]: 출력 URL 분해 (authority, host, port, path)
//! - [`validate`]: 스키마로 강제할 수 없는 의미 규칙
//! - [`tls`]: 출력별 TLS 프로파일/인증 경로 해석
//! - [`aws`]: CloudWatch 역할 인증 자격 증명 파일
//! - [`vector`]: TOML 방언 그래프 빌더와 출력 렌더러
//! - [`fluentd`]: Ruby 방언 그래프 빌더와 출력 렌더러
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! ForwarderSpec -> validate -> sources -> normalize -> fan-out -> pipelines -> outputs
//!                                 |                                               |
//!                           SourceCatalogue                              TLS / auth / buffer
//! ```

pub mod aws;
pub mod catalogue;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod fluentd;
pub mod naming;
pub mod tls;
pub mod validate;
pub mod vector;

use std::fmt;
use std::time::Instant;

use logfwd_core::forwarder::ForwarderSpec;
use logfwd_core::metrics as m;
use logfwd_core::options::{CompileOptions, Target};
use logfwd_core::secrets::{ConfigMaps, Secrets};
use metrics::{counter, histogram};
use tracing::{debug, info, warn};

// --- 주요 타입 re-export ---

// 에러
pub use error::GeneratorError;

// 엔진
pub use engine::{BoxedElement, Context, Element, Section};

// CloudWatch 자격 증명
pub use aws::WebIdentity;

/// 지원하지 않아 무시된 필드에 대한 경고
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// 출력 이름
    pub output: String,
    /// 무시된 필드 (예: `tuning.deliveryMode`)
    pub field: String,
    pub message: String,
}

impl Warning {
    pub fn new(
        output: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            output: output.into(),
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "output '{}': {}: {}", self.output, self.field, self.message)
    }
}

/// 컴파일 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    /// 수집기 설정 텍스트
    pub conf: String,
    /// 렌더링 중 발견된 경고 (출력 순서)
    pub warnings: Vec<Warning>,
    /// CloudWatch 역할 인증용 AWS 자격 증명 파일 (역할 인증 출력이 없으면 None)
    pub aws_credentials: Option<String>,
}

/// 포워더 스펙을 수집기 설정으로 컴파일합니다.
///
/// 검증 후 대상 방언의 그래프를 만들어 렌더링합니다. 어떤 에러든 발생하면
/// 부분 출력 없이 실패합니다. 같은 입력은 항상 같은 텍스트를 만듭니다.
pub fn compile(
    target: Target,
    spec: &ForwarderSpec,
    secrets: &Secrets,
    config_maps: &ConfigMaps,
    options: &CompileOptions,
) -> Result<Generated, GeneratorError> {
    let started = Instant::now();
    debug!(
        target = %target,
        inputs = spec.inputs.len(),
        outputs = spec.outputs.len(),
        pipelines = spec.pipelines.len(),
        "compiling forwarder spec"
    );

    let result = compile_inner(target, spec, secrets, config_maps, options);

    let outcome = if result.is_ok() { "success" } else { "failure" };
    counter!(
        m::GENERATOR_COMPILATIONS_TOTAL,
        m::LABEL_TARGET => target.as_str(),
        m::LABEL_RESULT => outcome,
    )
    .increment(1);
    histogram!(m::GENERATOR_COMPILE_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

    match &result {
        Ok(generated) => {
            for w in &generated.warnings {
                warn!(output = %w.output, field = %w.field, "{}", w.message);
                let output_type = spec
                    .outputs
                    .iter()
                    .find(|o| o.name == w.output)
                    .map_or("unknown", |o| o.kind.as_str());
                counter!(m::GENERATOR_WARNINGS_TOTAL, m::LABEL_OUTPUT_TYPE => output_type)
                    .increment(1);
            }
            info!(
                target = %target,
                bytes = generated.conf.len(),
                warnings = generated.warnings.len(),
                "collector config generated"
            );
        }
        Err(e) if e.is_user_error() => {
            debug!(target = %target, error = %e, "compilation rejected");
        }
        Err(e) => {
            warn!(target = %target, error = %e, "compilation failed while rendering");
        }
    }
    result
}

fn compile_inner(
    target: Target,
    spec: &ForwarderSpec,
    secrets: &Secrets,
    config_maps: &ConfigMaps,
    options: &CompileOptions,
) -> Result<Generated, GeneratorError> {
    validate::validate(spec, target, options)?;

    let mut warnings = Vec::new();
    let conf = match target {
        Target::Vector => vector::generate(spec, secrets, config_maps, options, &mut warnings)?,
        Target::Fluentd => fluentd::generate(spec, secrets, config_maps, options, &mut warnings)?,
    };

    let referenced = spec
        .outputs
        .iter()
        .filter(|o| spec.pipelines.iter().any(|p| p.output_refs.contains(&o.name)));
    for output in referenced {
        counter!(m::GENERATOR_SINKS_RENDERED_TOTAL, m::LABEL_OUTPUT_TYPE => output.kind.as_str())
            .increment(1);
    }

    let identities = aws::gather_web_identities(spec, secrets, options);
    Ok(Generated {
        conf,
        warnings,
        aws_credentials: aws::render_credentials(&identities),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_display_names_output_and_field() {
        let w = Warning::new("es", "tuning.deliveryMode", "not supported");
        assert_eq!(w.to_string(), "output 'es': tuning.deliveryMode: not supported");
    }
}
