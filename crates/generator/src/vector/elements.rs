//! Vector 엘리먼트 라이브러리
//!
//! 모든 엘리먼트는 TOML 테이블 하나 이상으로 렌더링됩니다.
//! 값은 `toml` 크레이트로 이스케이프하고, 매핑 본문(VRL)만 `'''` 블록으로 씁니다.

use std::fmt::Write as _;

use crate::engine::{Context, Element, indent};
use crate::error::GeneratorError;

/// TOML 문자열 리터럴
pub fn toml_string(value: &str) -> String {
    toml::Value::String(value.to_owned()).to_string()
}

/// TOML 문자열 배열
pub fn toml_array<S: AsRef<str>>(items: &[S]) -> String {
    toml::Value::Array(
        items
            .iter()
            .map(|s| toml::Value::String(s.as_ref().to_owned()))
            .collect(),
    )
    .to_string()
}

/// TOML 키 (bare key로 쓸 수 없으면 따옴표로 감쌉니다)
pub fn toml_key(key: &str) -> String {
    let bare = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if bare { key.to_owned() } else { toml_string(key) }
}

/// 키-값 목록을 가진 TOML 테이블
#[derive(Debug, Clone, Default)]
pub struct Table {
    header: String,
    desc: Option<String>,
    entries: Vec<(String, String)>,
}

impl Table {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            ..Self::default()
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    /// 테이블 앞에 붙는 `# ...` 주석
    pub fn desc(&mut self, desc: impl Into<String>) -> &mut Self {
        self.desc = Some(desc.into());
        self
    }

    pub fn string(&mut self, key: &str, value: &str) -> &mut Self {
        self.raw(key, toml_string(value))
    }

    pub fn int(&mut self, key: &str, value: i64) -> &mut Self {
        self.raw(key, value.to_string())
    }

    pub fn boolean(&mut self, key: &str, value: bool) -> &mut Self {
        self.raw(key, value.to_string())
    }

    pub fn array<S: AsRef<str>>(&mut self, key: &str, items: &[S]) -> &mut Self {
        self.raw(key, toml_array(items))
    }

    /// 값이 있을 때만 문자열 키를 추가합니다.
    pub fn opt_string(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            self.string(key, v);
        }
        self
    }

    /// 이미 TOML로 렌더링된 값
    pub fn raw(&mut self, key: &str, rendered: impl Into<String>) -> &mut Self {
        self.entries.push((key.to_owned(), rendered.into()));
        self
    }

    /// VRL 본문 (`source = '''`)
    pub fn vrl(&mut self, body: &str) -> &mut Self {
        let body = body.trim();
        let body = if body.is_empty() { "." } else { body };
        self.raw("source", format!("'''\n{}\n'''", indent(1, body)))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// 테이블 텍스트 (엔트리가 없으면 빈 문자열)
    pub fn to_toml(&self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        let mut out = String::new();
        if let Some(desc) = &self.desc {
            let _ = writeln!(out, "# {desc}");
        }
        let _ = writeln!(out, "[{}]", self.header);
        for (key, value) in &self.entries {
            let _ = writeln!(out, "{key} = {value}");
        }
        out
    }
}

/// 소스/변환/싱크 컴포넌트 하나
///
/// 주 테이블(`[<kind>.<id>]`) 뒤에 하위 테이블(`[<kind>.<id>.<name>]`)이
/// 추가된 순서대로 붙습니다. 비어 있는 하위 테이블은 출력하지 않습니다.
#[derive(Debug, Clone)]
pub struct Component {
    name: &'static str,
    kind: &'static str,
    id: String,
    main: Table,
    tables: Vec<(String, Table)>,
}

impl Component {
    fn new(name: &'static str, kind: &'static str, id: &str, component_type: &str) -> Self {
        let mut main = Table::new(format!("{kind}.{id}"));
        main.string("type", component_type);
        Self {
            name,
            kind,
            id: id.to_owned(),
            main,
            tables: Vec::new(),
        }
    }

    pub fn source(id: &str, component_type: &str) -> Self {
        Self::new("source", "sources", id, component_type)
    }

    pub fn transform<S: AsRef<str>>(id: &str, component_type: &str, inputs: &[S]) -> Self {
        let mut c = Self::new("transform", "transforms", id, component_type);
        c.main.array("inputs", inputs);
        c
    }

    pub fn sink<S: AsRef<str>>(id: &str, component_type: &str, inputs: &[S]) -> Self {
        let mut c = Self::new("sink", "sinks", id, component_type);
        c.main.array("inputs", inputs);
        c
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn desc(mut self, desc: impl Into<String>) -> Self {
        self.main.desc(desc);
        self
    }

    /// 주 테이블
    pub fn main(&mut self) -> &mut Table {
        &mut self.main
    }

    /// 하위 테이블 (없으면 만듭니다)
    pub fn table(&mut self, name: &str) -> &mut Table {
        let pos = match self.tables.iter().position(|(n, _)| n == name) {
            Some(pos) => pos,
            None => {
                let header = format!("{}.{}.{name}", self.kind, self.id);
                self.tables.push((name.to_owned(), Table::new(header)));
                self.tables.len() - 1
            }
        };
        &mut self.tables[pos].1
    }

    /// 이미 만들어진 하위 테이블을 붙입니다.
    pub fn push_table(&mut self, name: &str, table: Table) {
        let mut table = table;
        table.header = format!("{}.{}.{name}", self.kind, self.id);
        self.tables.retain(|(n, _)| n != name);
        self.tables.push((name.to_owned(), table));
    }

    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }
}

impl Element for Component {
    fn name(&self) -> &'static str {
        self.name
    }

    fn component_id(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn render(&self, _ctx: &mut Context) -> Result<String, GeneratorError> {
        let mut parts = vec![self.main.to_toml()];
        parts.extend(
            self.tables
                .iter()
                .map(|(_, t)| t.to_toml())
                .filter(|t| !t.is_empty()),
        );
        Ok(parts
            .iter()
            .map(|p| p.trim_end_matches('\n'))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

/// `remap` 변환
pub struct Remap {
    pub id: String,
    pub inputs: Vec<String>,
    pub vrl: String,
    pub desc: Option<String>,
}

impl Remap {
    pub fn new(id: impl Into<String>, inputs: Vec<String>, vrl: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            inputs,
            vrl: vrl.into(),
            desc: None,
        }
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }
}

impl Element for Remap {
    fn name(&self) -> &'static str {
        "remap"
    }

    fn component_id(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn render(&self, _ctx: &mut Context) -> Result<String, GeneratorError> {
        let mut table = Table::new(format!("transforms.{}", self.id));
        if let Some(desc) = &self.desc {
            table.desc(desc.as_str());
        }
        table
            .string("type", "remap")
            .array("inputs", &self.inputs)
            .vrl(&self.vrl);
        Ok(table.to_toml())
    }
}

/// `route` 변환 (경로 이름 → 조건)
pub struct Route {
    pub id: String,
    pub inputs: Vec<String>,
    pub routes: Vec<(String, String)>,
}

impl Element for Route {
    fn name(&self) -> &'static str {
        "route"
    }

    fn component_id(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn render(&self, _ctx: &mut Context) -> Result<String, GeneratorError> {
        if self.routes.is_empty() {
            return Err(GeneratorError::render(
                self.name(),
                format!("route '{}' has no routes", self.id),
            ));
        }
        let mut table = Table::new(format!("transforms.{}", self.id));
        table.string("type", "route").array("inputs", &self.inputs);
        for (name, condition) in &self.routes {
            table.string(&format!("route.{name}"), condition);
        }
        Ok(table.to_toml())
    }
}

/// `filter` 변환 (조건이 참인 레코드만 통과)
pub struct Filter {
    pub id: String,
    pub inputs: Vec<String>,
    pub condition: String,
}

impl Element for Filter {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn component_id(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn render(&self, _ctx: &mut Context) -> Result<String, GeneratorError> {
        let mut table = Table::new(format!("transforms.{}", self.id));
        table
            .string("type", "filter")
            .array("inputs", &self.inputs)
            .string("condition", &self.condition);
        Ok(table.to_toml())
    }
}

/// `throttle` 변환
pub struct Throttle {
    pub id: String,
    pub inputs: Vec<String>,
    pub window_secs: u64,
    pub threshold: u64,
}

impl Element for Throttle {
    fn name(&self) -> &'static str {
        "throttle"
    }

    fn component_id(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn render(&self, _ctx: &mut Context) -> Result<String, GeneratorError> {
        let window = i64::try_from(self.window_secs)
            .map_err(|_| GeneratorError::render(self.name(), "window out of range"))?;
        let threshold = i64::try_from(self.threshold)
            .map_err(|_| GeneratorError::render(self.name(), "threshold out of range"))?;
        let mut table = Table::new(format!("transforms.{}", self.id));
        table
            .string("type", "throttle")
            .array("inputs", &self.inputs)
            .int("window_secs", window)
            .int("threshold", threshold);
        Ok(table.to_toml())
    }
}

/// 멀티라인 예외 감지 변환
pub struct DetectExceptions {
    pub id: String,
    pub inputs: Vec<String>,
}

impl Element for DetectExceptions {
    fn name(&self) -> &'static str {
        "detect_exceptions"
    }

    fn component_id(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn render(&self, _ctx: &mut Context) -> Result<String, GeneratorError> {
        let mut table = Table::new(format!("transforms.{}", self.id));
        table
            .string("type", "detect_exceptions")
            .array("inputs", &self.inputs)
            .array("languages", &["All"])
            .array(
                "group_by",
                &[
                    "kubernetes.namespace_name",
                    "kubernetes.pod_name",
                    "kubernetes.container_name",
                ],
            )
            .int("expire_after_secs", 2)
            .int("multiline_flush_interval_secs", 1);
        Ok(table.to_toml())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(element: &dyn Element) -> String {
        Context::new().render(element).unwrap()
    }

    #[test]
    fn toml_values_are_escaped() {
        assert_eq!(toml_string("plain"), r#""plain""#);
        assert_eq!(toml_array(&["a", "b"]), r#"["a", "b"]"#);
        assert_eq!(toml_key("plain_key-1"), "plain_key-1");
        assert_eq!(toml_key("a b"), r#""a b""#);
        let parsed: toml::Value = toml::from_str(&format!("k = {}", toml_string("a\"b"))).unwrap();
        assert_eq!(parsed["k"].as_str(), Some("a\"b"));
    }

    #[test]
    fn empty_sub_tables_are_skipped() {
        let mut sink = Component::sink("out", "http", &["in"]);
        sink.main().string("uri", "http://x");
        sink.table("tls");
        let text = render(&sink);
        assert!(text.starts_with("[sinks.out]\ntype = \"http\"\ninputs = [\"in\"]\n"));
        assert!(!text.contains("[sinks.out.tls]"));
    }

    #[test]
    fn sub_tables_follow_main_table() {
        let mut sink = Component::sink("es", "elasticsearch", &["p"]);
        sink.table("buffer").string("type", "disk");
        sink.table("tls").string("ca_file", "/ca");
        sink.table("buffer").string("when_full", "block");
        let text = render(&sink);
        let value: toml::Value = toml::from_str(&text).unwrap();
        assert_eq!(value["sinks"]["es"]["buffer"]["when_full"].as_str(), Some("block"));
        assert!(text.find("[sinks.es.buffer]").unwrap() < text.find("[sinks.es.tls]").unwrap());
    }

    #[test]
    fn remap_body_is_indented_triple_quoted() {
        let remap = Remap::new("r", vec!["a".to_owned()], ".x = 1\n.y = 2");
        assert_eq!(
            render(&remap),
            "[transforms.r]\ntype = \"remap\"\ninputs = [\"a\"]\nsource = '''\n  .x = 1\n  .y = 2\n'''\n"
        );
    }

    #[test]
    fn empty_remap_body_is_pass_through() {
        let remap = Remap::new("r", vec!["a".to_owned()], "  ");
        assert!(render(&remap).contains("source = '''\n  .\n'''"));
    }

    #[test]
    fn route_parses_as_toml() {
        let route = Route {
            id: "route_x".to_owned(),
            inputs: vec!["in".to_owned()],
            routes: vec![(
                "app".to_owned(),
                r#"starts_with!(.kubernetes.namespace_name,"kube-")"#.to_owned(),
            )],
        };
        let value: toml::Value = toml::from_str(&render(&route)).unwrap();
        assert_eq!(
            value["transforms"]["route_x"]["route"]["app"].as_str(),
            Some(r#"starts_with!(.kubernetes.namespace_name,"kube-")"#)
        );
    }

    #[test]
    fn route_without_routes_fails() {
        let route = Route {
            id: "r".to_owned(),
            inputs: Vec::new(),
            routes: Vec::new(),
        };
        assert!(Context::new().render(&route).is_err());
    }

    #[test]
    fn throttle_renders_window_and_threshold() {
        let throttle = Throttle {
            id: "t".to_owned(),
            inputs: vec!["p".to_owned()],
            window_secs: 1,
            threshold: 100,
        };
        let text = render(&throttle);
        assert!(text.contains("window_secs = 1\n"));
        assert!(text.contains("threshold = 100\n"));
    }
}
