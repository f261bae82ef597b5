//! Vector (TOML) 방언
//!
//! # 섹션 순서
//!
//! ```text
//! global -> sources -> normalize -> fan-out -> pipelines -> outputs -> metrics
//! ```
//!
//! 각 패스는 엘리먼트 목록을 만들고, [`Context::render_sections`]가
//! 빈 줄로 구분해 이어 붙입니다.

pub mod elements;
pub mod filters;
pub mod inputs;
pub mod metrics;
pub mod normalize;
pub mod otel;
pub mod outputs;
pub mod pipelines;
pub mod sources;
pub mod vrl;

use logfwd_core::forwarder::ForwarderSpec;
use logfwd_core::options::CompileOptions;
use logfwd_core::secrets::{ConfigMaps, Secrets};
use tracing::debug;

use crate::Warning;
use crate::engine::{BoxedElement, Context, Raw, Section};
use crate::error::GeneratorError;
use crate::vector::elements::toml_string;

/// 수집기 상태 디렉토리 루트
pub const DATA_DIR_ROOT: &str = "/var/lib/vector";

/// 전역 설정 (로그 레벨 힌트, 메트릭 만료, 데이터 디렉토리, API)
pub fn global(options: &CompileOptions) -> Vec<BoxedElement> {
    let data_dir = format!(
        "{DATA_DIR_ROOT}/{}/{}",
        options.namespace, options.forwarder_name
    );
    let mut text = format!(
        "# VECTOR_LOG={}\nexpire_metrics_secs = 60\ndata_dir = {}",
        options.vector_log_level.as_str(),
        toml_string(&data_dir)
    );
    if options.vector_log_level.is_verbose() {
        text.push_str("\n\n[api]\nenabled = true");
    }
    vec![Box::new(Raw::new("global", text))]
}

/// 포워더 스펙을 Vector 설정 텍스트로 컴파일합니다.
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
    debug!(source_types = types.len(), "building vector sections");

    let built = pipelines::pipelines(spec)?;
    let sections = vec![
        Section::new("Global", global(options)),
        Section::new("Sources", sources::sources(spec, &types, options)),
        Section::new("Normalize", normalize::normalize(spec, &types, options)),
        Section::new("Inputs", inputs::fan_out(spec, &types)),
        Section::new("Pipelines", built.elements),
        Section::new(
            "Outputs",
            outputs::outputs(
                spec,
                &built.terminals,
                secrets,
                config_maps,
                options,
                warnings,
            )?,
        ),
        Section::new("Metrics", metrics::metrics(options)),
    ];

    let mut ctx = Context::new();
    let mut conf = ctx.render_sections(&sections)?;
    conf.push('\n');
    debug!(
        templates = ctx.templates().count(),
        bytes = conf.len(),
        "vector config rendered"
    );
    Ok(conf)
}
