//! 이름 정규화
//!
//! 사용자 이름을 수집기 컴포넌트 ID로 바꿉니다.
//! Vector ID는 소문자 + `_`, Fluentd 레이블은 `@` 접두어 + 대문자 + `_`입니다.

use logfwd_core::forwarder::SourceType;

fn canonical(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Vector 컴포넌트 ID (`my-out.1` → `my_out_1`)
pub fn component_id(name: &str) -> String {
    canonical(name).to_ascii_lowercase()
}

/// 여러 조각을 `_`로 이은 Vector 컴포넌트 ID
pub fn make_id(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| component_id(p))
        .collect::<Vec<_>>()
        .join("_")
}

/// Fluentd 레이블 이름 (`p1` → `@P1`)
pub fn label_name(name: &str) -> String {
    format!("@{}", canonical(name).to_ascii_uppercase())
}

/// 소스 타입 레인 레이블 (`application` → `@_APPLICATION`)
pub fn source_type_label(source_type: SourceType) -> String {
    format!("@_{}", source_type.as_str().to_ascii_uppercase())
}

/// 보조 레인 레이블 (`APPLICATION_ALL` → `@_APPLICATION_ALL`)
pub fn lane_label(name: &str) -> String {
    format!("@_{}", canonical(name).to_ascii_uppercase())
}

/// Fluentd `@id` 및 버퍼 경로용 저장소 ID
pub fn store_id(name: &str) -> String {
    component_id(name)
}
