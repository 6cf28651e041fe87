// ============================================================
// Layer 4 — Chunk Accumulator
// ============================================================
// Walks the elements of a parsed document in order and groups
// their rendered text into token-bounded chunks.
//
// A new chunk starts, in priority order, when:
//   1. the custom break rule matches the element's text
//   2. pages must stay together and the page just changed
//   3. the buffer has reached `max_tokens` and holds more than
//      one element — everything but the last element is emitted,
//      and the last element is emitted alone if it is itself over
//      budget, otherwise it seeds the next buffer
//
// A "References" or "Acknowledgements" heading ends the document;
// nothing after it is chunked.
//
// Example with max_tokens = 500 (heuristic counter):
//   [50 words, 600 words, 50 words] → ["50w", "600w", "50w"]

use anyhow::Result;

use crate::data::preprocessor::{format_heading, render_table};
use crate::domain::document::{DocumentElement, ElementContent, ElementKind};
use crate::domain::traits::{ChunkBreak, TokenCounter};

/// Default token budget per chunk.
pub const DEFAULT_MAX_TOKENS_PER_CHUNK: usize = 500;

const TERMINAL_HEADINGS: &[&str] = &[
    "## References",
    "## **References**",
    "## Acknowledgements",
    "## **Acknowledgements**",
];

const JOINER: &str = "\n\n";

pub struct ChunkAccumulator<'a> {
    counter:            &'a dyn TokenCounter,
    max_tokens:         usize,
    same_page_together: bool,
    break_rule:         Option<&'a dyn ChunkBreak>,
}

impl<'a> ChunkAccumulator<'a> {
    pub fn new(counter: &'a dyn TokenCounter, max_tokens: usize) -> Self {
        Self {
            counter,
            max_tokens,
            same_page_together: false,
            break_rule: None,
        }
    }

    pub fn same_page_together(mut self, enabled: bool) -> Self {
        self.same_page_together = enabled;
        self
    }

    pub fn with_break_rule(mut self, rule: &'a dyn ChunkBreak) -> Self {
        self.break_rule = Some(rule);
        self
    }

    pub fn chunk(&self, elements: &[DocumentElement]) -> Result<Vec<String>> {
        let _span = tracing::debug_span!("chunker", max_tokens = self.max_tokens).entered();

        let mut chunks: Vec<String> = Vec::new();
        let mut buffer: Vec<String> = Vec::new();
        let mut title_seen          = false;
        // Outer None: no element seen yet. Inner None: unknown page.
        let mut last_page: Option<Option<u32>> = None;

        for element in elements {
            if element.kind.is_decorative() {
                continue;
            }
            // Footnotes only advance the page.
            if element.kind == ElementKind::Footnote {
                last_page = Some(element.page);
                continue;
            }

            let rendered = render(element, &mut title_seen);
            let break_text = match element.content {
                ElementContent::Text(ref raw) => raw.as_str(),
                ElementContent::Table(_)      => rendered.as_str(),
            };

            if self.break_rule.is_some_and(|rule| rule.should_break(break_text)) {
                self.flush(&mut chunks, &mut buffer)?;
            } else if self.same_page_together && page_changed(last_page, element.page) {
                self.flush(&mut chunks, &mut buffer)?;
            } else {
                self.split_over_budget(&mut chunks, &mut buffer)?;
            }

            if TERMINAL_HEADINGS.iter().any(|h| rendered.contains(h)) {
                tracing::debug!("Stopping at closing section: {}", rendered.trim());
                break;
            }

            if !rendered.is_empty() {
                buffer.push(rendered);
            }
            last_page = Some(element.page);
        }

        let emitted = chunks.len();
        self.split_over_budget(&mut chunks, &mut buffer)?;
        if !buffer.is_empty() {
            let tail = buffer.join(JOINER);
            // A tail left over by the split is new content even when it
            // repeats the chunk just emitted.
            if chunks.len() > emitted || chunks.last() != Some(&tail) {
                chunks.push(tail);
            }
        }

        tracing::debug!("Built {} chunks from {} elements", chunks.len(), elements.len());
        Ok(chunks)
    }

    /// Emit the whole buffer as one chunk (after enforcing the budget).
    fn flush(&self, chunks: &mut Vec<String>, buffer: &mut Vec<String>) -> Result<()> {
        self.split_over_budget(chunks, buffer)?;
        if !buffer.is_empty() {
            chunks.push(buffer.join(JOINER));
            buffer.clear();
        }
        Ok(())
    }

    fn split_over_budget(&self, chunks: &mut Vec<String>, buffer: &mut Vec<String>) -> Result<()> {
        if buffer.len() <= 1 || self.counter.count_tokens(&buffer.join(JOINER))? < self.max_tokens {
            return Ok(());
        }
        let Some(last) = buffer.pop() else {
            return Ok(());
        };

        chunks.push(buffer.join(JOINER));
        buffer.clear();

        if self.counter.count_tokens(&last)? >= self.max_tokens {
            chunks.push(last);
        } else {
            buffer.push(last);
        }
        Ok(())
    }
}

/// An unknown page on either side never counts as a continuation.
fn page_changed(last: Option<Option<u32>>, current: Option<u32>) -> bool {
    match last {
        None          => false,
        Some(None)    => true,
        Some(Some(p)) => current != Some(p),
    }
}

fn render(element: &DocumentElement, title_seen: &mut bool) -> String {
    match (&element.kind, &element.content) {
        (_, ElementContent::Table(table)) => render_table(table),
        (ElementKind::Subtitle, ElementContent::Text(t)) => {
            if *title_seen {
                format!("## **{t}**")
            } else {
                *title_seen = true;
                format!("# Title: **{t}**")
            }
        }
        (ElementKind::Title, ElementContent::Text(t))      => format!("# **{t}**"),
        (ElementKind::PageHeader, ElementContent::Text(t)) => format!("Page Header: **{t}**\n\n"),
        (ElementKind::Paragraph, ElementContent::Text(t))  => format_heading(t),
        (_, ElementContent::Text(t))                       => t.clone(),
    }
}
