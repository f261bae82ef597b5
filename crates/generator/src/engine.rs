//! 템플릿 엔진
//!
//! 각 엘리먼트가 [`Element::render`]로 자기 텍스트를 만들고, 렌더 컨텍스트가
//! 합성(`compose`), 들여쓰기(`indent`), 키-값(`kv`) 같은 공통 도우미를 제공합니다.
//! 엘리먼트 이름(템플릿)은 컴파일마다 새 [`Context`]에 처음 렌더링될 때 등록되며,
//! 전역 상태는 없습니다.
//!
//! # 규칙
//!
//! - [`Nil`] 엘리먼트와 빈 문자열로 렌더링된 엘리먼트는 공백 없이 건너뜁니다.
//! - 하나의 설정 안에서 컴포넌트 ID는 유일해야 합니다.
//!   중복은 [`GeneratorError::RenderFailure`]입니다.
//! - 어떤 엘리먼트든 실패하면 전체 렌더링이 실패합니다.

use std::collections::{BTreeSet, HashSet};

use tracing::trace;

use crate::error::GeneratorError;

/// 렌더링 가능한 설정 조각
pub trait Element {
    /// 템플릿 이름
    fn name(&self) -> &'static str;

    /// 설정 안에서 유일해야 하는 컴포넌트 ID
    fn component_id(&self) -> Option<String> {
        None
    }

    /// 텍스트로 렌더링합니다.
    fn render(&self, ctx: &mut Context) -> Result<String, GeneratorError>;

    /// 렌더링 없이 건너뛰어야 하는 엘리먼트인지 여부
    fn is_nil(&self) -> bool {
        false
    }
}

/// 힙에 올린 엘리먼트
pub type BoxedElement = Box<dyn Element>;

/// 아무것도 출력하지 않는 엘리먼트
#[derive(Debug, Clone, Copy, Default)]
pub struct Nil;

impl Element for Nil {
    fn name(&self) -> &'static str {
        "nil"
    }

    fn render(&self, _ctx: &mut Context) -> Result<String, GeneratorError> {
        Ok(String::new())
    }

    fn is_nil(&self) -> bool {
        true
    }
}

/// 고정 텍스트 엘리먼트
#[derive(Debug, Clone)]
pub struct Raw {
    pub name: &'static str,
    pub text: String,
}

impl Raw {
    pub fn new(name: &'static str, text: impl Into<String>) -> Self {
        Self {
            name,
            text: text.into(),
        }
    }
}

impl Element for Raw {
    fn name(&self) -> &'static str {
        self.name
    }

    fn render(&self, _ctx: &mut Context) -> Result<String, GeneratorError> {
        Ok(self.text.clone())
    }
}

/// 주석이 붙은 엘리먼트 묶음
pub struct Section {
    pub comment: String,
    pub elements: Vec<BoxedElement>,
}

impl Section {
    pub fn new(comment: impl Into<String>, elements: Vec<BoxedElement>) -> Self {
        Self {
            comment: comment.into(),
            elements,
        }
    }
}

/// 컴파일 한 번 동안 유지되는 렌더 컨텍스트
#[derive(Debug, Default)]
pub struct Context {
    templates: BTreeSet<&'static str>,
    ids: HashSet<String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// 엘리먼트 하나를 렌더링합니다.
    ///
    /// 템플릿 이름을 등록하고 컴포넌트 ID 중복을 검사합니다.
    pub fn render(&mut self, element: &dyn Element) -> Result<String, GeneratorError> {
        if element.is_nil() {
            return Ok(String::new());
        }
        self.templates.insert(element.name());
        if let Some(id) = element.component_id() {
            if !self.ids.insert(id.clone()) {
                return Err(GeneratorError::render(
                    element.name(),
                    format!("duplicate component id '{id}'"),
                ));
            }
        }
        element.render(self)
    }

    /// 자식 엘리먼트를 빈 줄 하나로 구분해 이어 붙입니다.
    ///
    /// 끝의 개행은 제거됩니다.
    pub fn compose(&mut self, elements: &[BoxedElement]) -> Result<String, GeneratorError> {
        let mut parts = Vec::with_capacity(elements.len());
        for element in elements {
            let rendered = self.render(element.as_ref())?;
            let trimmed = rendered.trim_end_matches('\n');
            if trimmed.trim().is_empty() {
                continue;
            }
            parts.push(trimmed.to_owned());
        }
        Ok(parts.join("\n\n"))
    }

    /// `compose([element])`와 같습니다.
    pub fn compose_one(&mut self, element: &dyn Element) -> Result<String, GeneratorError> {
        let rendered = self.render(element)?;
        let trimmed = rendered.trim_end_matches('\n');
        if trimmed.trim().is_empty() {
            return Ok(String::new());
        }
        Ok(trimmed.to_owned())
    }

    /// 렌더링 결과가 비어 있으면 빈 문자열, 아니면 개행을 붙여 반환합니다.
    pub fn kv(&mut self, element: &dyn Element) -> Result<String, GeneratorError> {
        let rendered = self.render(element)?;
        if rendered.trim().is_empty() {
            return Ok(String::new());
        }
        Ok(format!("{}\n", rendered.trim_end_matches('\n')))
    }

    /// 섹션 목록을 순서대로 렌더링합니다.
    pub fn render_sections(&mut self, sections: &[Section]) -> Result<String, GeneratorError> {
        let mut parts = Vec::with_capacity(sections.len());
        for section in sections {
            trace!(section = %section.comment, elements = section.elements.len(), "rendering section");
            let rendered = self.compose(&section.elements)?;
            if !rendered.is_empty() {
                parts.push(rendered);
            }
        }
        Ok(parts.join("\n\n"))
    }

    /// 이번 컴파일에서 사용된 템플릿 이름 (정렬됨)
    pub fn templates(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.templates.iter().copied()
    }

    /// 등록된 컴포넌트 ID인지 확인합니다.
    pub fn has_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }
}

/// 비어 있지 않은 모든 줄 앞에 공백 `2 * n`개를 붙입니다.
pub fn indent(n: usize, s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    let pad = " ".repeat(2 * n);
    s.split('\n')
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `", "`로 이어 붙입니다.
pub fn comma_separated<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ")
}
