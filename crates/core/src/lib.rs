#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod forwarder;
pub mod metrics;
pub mod options;
pub mod secrets;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, LogFwdError, SpecError};

// 설정
pub use config::LogFwdConfig;

// 포워더 스펙
pub use forwarder::{
    FilterSpec, ForwarderSpec, InputSpec, OutputSpec, OutputType, PipelineSpec, SourceType,
};

// 컴파일 옵션
pub use options::{CompileOptions, Target, TlsProfile, TlsVersion, VectorLogLevel};

// 참조 자료
pub use secrets::{ConfigMaps, ReferenceBundle, Secret, Secrets};
