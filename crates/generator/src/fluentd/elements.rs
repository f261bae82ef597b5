//! Fluentd 엘리먼트 라이브러리
//!
//! 모든 설정 조각은 `<directive arg>` ... `</directive>` 블록입니다.
//! 파라미터 값은 그대로 출력되므로 따옴표가 필요한 값은 [`quoted`] 같은
//! 도우미로 감싸서 넘깁니다. [`Label`]은 블록 묶음이며, 블록 안의
//! `@label` 파라미터가 레이블 사이의 간선이 됩니다.

use std::fmt::Write as _;

use crate::engine::{Context, Element, indent};
use crate::error::GeneratorError;

/// 모든 태그
pub const ANY: &str = "**";

/// Ruby 작은따옴표 문자열 (`'` 와 `\` 이스케이프)
pub fn quoted(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// 환경 변수 값, 없으면 기본값 (`"#{ENV['X'] || 'default'}"`)
pub fn from_env(var: &str, default: &str) -> String {
    format!("\"#{{ENV['{var}'] || '{default}'}}\"")
}

/// 파일 내용 (`"#{File.read('path') rescue nil}"`)
pub fn file_contents(path: &str) -> String {
    format!("\"#{{File.read('{path}') rescue nil}}\"")
}

/// 점 경로의 레코드 조회 식 (`kubernetes.pod_name` → `record.dig("kubernetes","pod_name")`)
pub fn dig(path: &str) -> String {
    let segments: Vec<String> = path.split('.').map(|s| format!("\"{s}\"")).collect();
    format!("record.dig({})", segments.join(","))
}

/// 블록 안의 한 줄
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// `key value`
    Param(String, String),
    /// `# text`
    Comment(String),
    /// 가공 없이 출력할 줄 (`@include ...`)
    Line(String),
    /// 중첩 블록
    Block(Block),
}

/// `<directive arg>` 블록
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    directive: &'static str,
    arg: Option<String>,
    desc: Vec<String>,
    entries: Vec<Entry>,
}

impl Block {
    pub fn new(directive: &'static str) -> Self {
        Self {
            directive,
            arg: None,
            desc: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn source() -> Self {
        Self::new("source")
    }

    /// `<filter tags>`
    pub fn filter(tags: impl Into<String>) -> Self {
        Self::new("filter").arg(tags)
    }

    /// `<match tags>`
    pub fn matching(tags: impl Into<String>) -> Self {
        Self::new("match").arg(tags)
    }

    /// `@type` 파라미터를 가진 블록
    pub fn typed(directive: &'static str, plugin: &str) -> Self {
        Self::new(directive).param("@type", plugin)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arg = Some(arg.into());
        self
    }

    /// 블록 앞에 붙는 `# ...` 주석 한 줄
    pub fn desc(mut self, line: impl Into<String>) -> Self {
        self.desc.push(line.into());
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.push_param(key, value);
        self
    }

    /// 값이 있을 때만 파라미터를 추가합니다.
    pub fn opt_param<V: Into<String>>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.push_param(key, v);
        }
        self
    }

    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.entries.push(Entry::Comment(text.into()));
        self
    }

    pub fn line(mut self, text: impl Into<String>) -> Self {
        self.entries.push(Entry::Line(text.into()));
        self
    }

    pub fn child(mut self, block: Block) -> Self {
        self.entries.push(Entry::Block(block));
        self
    }

    /// 여러 엔트리를 순서대로 붙입니다.
    pub fn extend(mut self, entries: impl IntoIterator<Item = Entry>) -> Self {
        self.entries.extend(entries);
        self
    }

    pub fn push_param(&mut self, key: &str, value: impl Into<String>) {
        self.entries.push(Entry::Param(key.to_owned(), value.into()));
    }

    pub fn push_child(&mut self, block: Block) {
        self.entries.push(Entry::Block(block));
    }

    pub fn directive(&self) -> &'static str {
        self.directive
    }

    pub fn argument(&self) -> Option<&str> {
        self.arg.as_deref()
    }

    /// 첫 번째로 일치하는 파라미터 값
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find_map(|e| match e {
            Entry::Param(k, v) if k == key => Some(v.as_str()),
            _ => None,
        })
    }

    pub fn children(&self) -> impl Iterator<Item = &Block> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Block(b) => Some(b),
            _ => None,
        })
    }

    /// 이 블록(과 자식)이 레코드를 넘기는 레이블
    ///
    /// `rewrite_tag_filter`는 태그를 바꿔 같은 레이블로 다시 넣으므로 간선으로
    /// 세지 않습니다.
    pub fn target_labels(&self, out: &mut Vec<String>) {
        if self.get("@type") == Some("rewrite_tag_filter") {
            return;
        }
        for entry in &self.entries {
            match entry {
                Entry::Param(k, v) if k == "@label" => out.push(v.clone()),
                Entry::Block(b) => b.target_labels(out),
                _ => {}
            }
        }
    }

    /// 설정 텍스트 (끝 개행 없음)
    pub fn to_conf(&self) -> String {
        let mut out = String::new();
        for line in &self.desc {
            let _ = writeln!(out, "# {line}");
        }
        match &self.arg {
            Some(arg) => {
                let _ = writeln!(out, "<{} {arg}>", self.directive);
            }
            None => {
                let _ = writeln!(out, "<{}>", self.directive);
            }
        }
        for entry in &self.entries {
            let text = match entry {
                Entry::Param(k, v) if v.is_empty() => k.clone(),
                Entry::Param(k, v) => format!("{k} {v}"),
                Entry::Comment(c) => format!("# {c}"),
                Entry::Line(l) => l.clone(),
                Entry::Block(b) => b.to_conf(),
            };
            let _ = writeln!(out, "{}", indent(1, &text));
        }
        let _ = write!(out, "</{}>", self.directive);
        out
    }
}

impl Element for Block {
    fn name(&self) -> &'static str {
        self.directive
    }

    fn render(&self, _ctx: &mut Context) -> Result<String, GeneratorError> {
        Ok(self.to_conf())
    }
}

/// `<label @NAME>` 블록 묶음
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    name: String,
    desc: Vec<String>,
    blocks: Vec<Block>,
}

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            desc: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn desc(mut self, line: impl Into<String>) -> Self {
        self.desc.push(line.into());
        self
    }

    pub fn block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// 이 레이블이 레코드를 넘기는 레이블 (정렬, 중복 없음)
    pub fn targets(&self) -> Vec<String> {
        let mut out = Vec::new();
        for block in &self.blocks {
            block.target_labels(&mut out);
        }
        out.sort();
        out.dedup();
        out
    }
}

impl Element for Label {
    fn name(&self) -> &'static str {
        "label"
    }

    fn component_id(&self) -> Option<String> {
        Some(self.name.clone())
    }

    fn render(&self, _ctx: &mut Context) -> Result<String, GeneratorError> {
        let mut out = String::new();
        for line in &self.desc {
            let _ = writeln!(out, "# {line}");
        }
        let _ = writeln!(out, "<label {}>", self.name);
        let body = self
            .blocks
            .iter()
            .map(Block::to_conf)
            .collect::<Vec<_>>()
            .join("\n\n");
        if !body.is_empty() {
            let _ = writeln!(out, "{}", indent(1, &body));
        }
        out.push_str("</label>");
        Ok(out)
    }
}

/// 레코드를 다른 레이블로 넘깁니다.
pub fn relabel(tags: &str, target: &str) -> Block {
    Block::matching(tags)
        .param("@type", "relabel")
        .param("@label", target)
}

/// 여러 레이블로 복제합니다. 대상이 하나면 [`relabel`]과 같습니다.
///
/// `deep`이면 저장소마다 레코드를 깊은 복사합니다.
pub fn copy<S: AsRef<str>>(tags: &str, targets: &[S], deep: bool) -> Block {
    if let [only] = targets {
        return relabel(tags, only.as_ref());
    }
    let mut block = Block::matching(tags).param("@type", "copy");
    if deep {
        block.push_param("copy_mode", "deep");
    }
    for target in targets {
        block.push_child(store(target.as_ref()));
    }
    block
}

/// `<store>` 안의 relabel
pub fn store(target: &str) -> Block {
    Block::new("store")
        .param("@type", "relabel")
        .param("@label", target)
}

/// 일치하는 레코드를 버립니다.
pub fn discard(tags: &str) -> Block {
    Block::matching(tags).param("@type", "null")
}

/// `record_modifier` 필터
pub fn record_modifier<K: AsRef<str>, V: AsRef<str>>(tags: &str, records: &[(K, V)]) -> Block {
    let mut record = Block::new("record");
    for (k, v) in records {
        record.push_param(k.as_ref(), v.as_ref());
    }
    Block::filter(tags)
        .param("@type", "record_modifier")
        .child(record)
}
