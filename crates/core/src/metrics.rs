//! 메트릭 상수 및 설명 등록
//!
//! 생성기와 CLI가 사용하는 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 레코더가 설치되지 않은 프로세스에서는 모든 호출이 no-op입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logfwd_`
//! - 모듈명: `generator_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(
//!     logfwd_core::metrics::GENERATOR_COMPILATIONS_TOTAL,
//!     logfwd_core::metrics::LABEL_TARGET => "vector",
//!     logfwd_core::metrics::LABEL_RESULT => "success",
//! )
//! .increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 생성 대상 레이블 키 (vector, fluentd)
pub const LABEL_TARGET: &str = "target";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 출력 타입 레이블 키 (loki, splunk, ...)
pub const LABEL_OUTPUT_TYPE: &str = "output_type";

// ─── Generator 메트릭 ──────────────────────────────────────────────

/// Generator: 컴파일 횟수 (counter, label: target, result)
pub const GENERATOR_COMPILATIONS_TOTAL: &str = "logfwd_generator_compilations_total";

/// Generator: 지원하지 않는 필드 경고 수 (counter, label: output_type)
pub const GENERATOR_WARNINGS_TOTAL: &str = "logfwd_generator_warnings_total";

/// Generator: 렌더링된 출력 싱크 수 (counter, label: output_type)
pub const GENERATOR_SINKS_RENDERED_TOTAL: &str = "logfwd_generator_sinks_rendered_total";

/// Generator: 컴파일 소요 시간 (histogram, 초)
pub const GENERATOR_COMPILE_DURATION_SECONDS: &str = "logfwd_generator_compile_duration_seconds";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 컴파일 소요 시간 히스토그램 버킷 (초)
///
/// 10us ~ 1s 범위
pub const COMPILE_DURATION_BUCKETS: [f64; 8] =
    [0.00001, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.1, 1.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 레코더를 설치한 임베딩 프로세스가 시작 시점에 한 번 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        GENERATOR_COMPILATIONS_TOTAL,
        "Total number of forwarder compilations by target and result"
    );
    describe_counter!(
        GENERATOR_WARNINGS_TOTAL,
        "Total number of unsupported-field warnings emitted during compilation"
    );
    describe_counter!(
        GENERATOR_SINKS_RENDERED_TOTAL,
        "Total number of output sinks rendered by output type"
    );
    describe_histogram!(
        GENERATOR_COMPILE_DURATION_SECONDS,
        "Time to compile a forwarder spec into collector configuration in seconds"
    );
}
