//! VRL 조건식/리터럴 도우미

/// VRL 문자열 리터럴 (JSON 이스케이프 규칙과 같음)
pub fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_owned()).to_string()
}

pub fn eq(path: &str, value: &str) -> String {
    format!("{path} == {}", quote(value))
}

pub fn starts_with(path: &str, prefix: &str) -> String {
    format!("starts_with!({path},{})", quote(prefix))
}

pub fn paren(expr: &str) -> String {
    format!("({expr})")
}

pub fn neg(expr: &str) -> String {
    format!("!{expr}")
}

/// 각 항을 괄호로 감싸 `||`로 잇습니다.
pub fn or<S: AsRef<str>>(terms: &[S]) -> String {
    terms
        .iter()
        .map(|t| paren(t.as_ref()))
        .collect::<Vec<_>>()
        .join(" || ")
}

/// 각 항을 괄호로 감싸 `&&`로 잇습니다.
pub fn and<S: AsRef<str>>(terms: &[S]) -> String {
    terms
        .iter()
        .map(|t| paren(t.as_ref()))
        .collect::<Vec<_>>()
        .join(" && ")
}

/// 레코드 경로 (`kubernetes.labels."app"` 같은 인용 세그먼트 허용)
pub fn path(key: &str) -> String {
    if key.starts_with('.') {
        key.to_owned()
    } else {
        format!(".{key}")
    }
}

/// `kubernetes.labels.<key>` 경로 (키에 `.`/`/`가 있어도 한 세그먼트)
pub fn label_path(label: &str) -> String {
    format!(".kubernetes.labels.{}", quote(label))
}
