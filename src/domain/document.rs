// ============================================================
// Layer 3 — Document Domain Types
// ============================================================
// A parsed document arrives as JSON with an ordered `main-text`
// array of tagged elements and side arrays (e.g. `tables`) that
// elements point into via `$ref`. Loading resolves those
// references once so the chunker only ever sees DocumentElement.

use serde::{Deserialize, Serialize};

use crate::domain::error::PipelineError;

/// A whole plain-text (markdown) document loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// File name, kept as the document title downstream
    pub source: String,

    /// Full markdown text
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text:   text.into(),
        }
    }
}

// ─── Element kinds ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    Paragraph,
    Title,
    #[serde(rename = "subtitle-level-1")]
    Subtitle,
    Table,
    Footnote,
    PageHeader,
    PageFooter,
    Figure,
    Picture,
    Reference,
    MetaData,
    Equation,
    #[serde(other)]
    Unknown,
}

impl ElementKind {
    /// Kinds that never contribute text to a chunk.
    pub fn is_decorative(self) -> bool {
        matches!(
            self,
            ElementKind::PageFooter
                | ElementKind::Picture
                | ElementKind::Reference
                | ElementKind::MetaData
                | ElementKind::Figure
                | ElementKind::Unknown
        )
    }
}

/// A table as a grid of cell texts, first row being the header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub caption: Option<String>,
    pub rows:    Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementContent {
    Text(String),
    Table(Table),
}

/// One structural unit of a parsed document.
///
/// `page` is `None` when no provenance could be found; the chunker
/// treats that as an unknown page and never as a continuation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentElement {
    pub kind:    ElementKind,
    pub content: ElementContent,
    pub page:    Option<u32>,
}

impl DocumentElement {
    pub fn new(kind: ElementKind, text: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            kind,
            content: ElementContent::Text(text.into()),
            page,
        }
    }

    #[cfg(test)]
    pub fn paragraph(text: impl Into<String>, page: u32) -> Self {
        Self::new(ElementKind::Paragraph, text, Some(page))
    }

    pub fn table(table: Table, page: Option<u32>) -> Self {
        Self {
            kind:    ElementKind::Table,
            content: ElementContent::Table(table),
            page,
        }
    }
}

// ─── Parsed-document JSON ─────────────────────────────────────────────────────
#[derive(Debug, Clone, Deserialize)]
pub struct ParsedDocument {
    #[serde(rename = "main-text", default)]
    pub main_text: Vec<RawElement>,

    #[serde(default)]
    pub tables: Vec<RawTable>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawElement {
    #[serde(rename = "type")]
    pub kind: ElementKind,

    #[serde(default)]
    pub text: Option<String>,

    #[serde(rename = "$ref", default)]
    pub reference: Option<String>,

    #[serde(default)]
    pub prov: Vec<Provenance>,
}

impl RawElement {
    fn page(&self) -> Option<u32> {
        self.prov.first().map(|p| p.page)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Provenance {
    pub page: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTable {
    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub data: Vec<Vec<RawCell>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCell {
    #[serde(default)]
    pub text: String,
}

impl ParsedDocument {
    /// Resolve table references and page numbers into typed elements,
    /// preserving document order.
    pub fn into_elements(self) -> Result<Vec<DocumentElement>, PipelineError> {
        let mut elements = Vec::with_capacity(self.main_text.len());

        for (idx, raw) in self.main_text.iter().enumerate() {
            if raw.kind == ElementKind::Table {
                let table = self.resolve_table(raw)?;
                elements.push(DocumentElement::table(table, self.table_page(idx)));
            } else {
                elements.push(DocumentElement::new(
                    raw.kind,
                    raw.text.clone().unwrap_or_default(),
                    raw.page(),
                ));
            }
        }

        Ok(elements)
    }

    fn resolve_table(&self, raw: &RawElement) -> Result<Table, PipelineError> {
        let reference = raw.reference.as_deref().unwrap_or_default();
        let unresolved = || PipelineError::UnresolvedTable {
            reference: reference.to_string(),
        };

        // "#/tables/3" → ["#", "tables", "3"]
        let parts: Vec<&str> = reference.split('/').collect();
        if parts.len() != 3 || parts[1] != "tables" {
            return Err(unresolved());
        }
        let index: usize = parts[2].parse().map_err(|_| unresolved())?;
        let item = self.tables.get(index).ok_or_else(unresolved)?;

        Ok(Table {
            caption: item.text.clone().filter(|c| !c.is_empty()),
            rows:    item
                .data
                .iter()
                .map(|row| row.iter().map(|cell| cell.text.clone()).collect())
                .collect(),
        })
    }

    /// Tables carry no provenance of their own, so borrow the page of
    /// the nearest neighbours: agreeing neighbours win, otherwise the
    /// following page, otherwise whichever side exists.
    fn table_page(&self, idx: usize) -> Option<u32> {
        let prev = self.main_text[..idx].iter().rev().find_map(RawElement::page);
        let next = self.main_text[idx..].iter().find_map(RawElement::page);

        match (prev, next) {
            (Some(p), Some(n)) if p == n => Some(p),
            (_, Some(n))                 => Some(n),
            (Some(p), None)              => Some(p),
            (None, None)                 => None,
        }
    }
}
