// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Renders document elements into markdown-flavoured text and
// tidies markdown tables before recursive splitting.
//
//   format_heading  — bold a short leading sentence fragment
//   render_table    — grid of cells → pipe table (+ caption)
//   Preprocessor    — collapse padded table separators

use anyhow::Result;
use comfy_table::{presets::ASCII_MARKDOWN, Table as TextTable};
use regex::Regex;

use crate::domain::document::Table;

pub struct Preprocessor {
    /// `-----|` → `-|`
    dash_run: Regex,
    /// `text    |` → `text |`
    space_run: Regex,
}

impl Preprocessor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dash_run:  Regex::new(r"-{2,}\|")?,
            space_run: Regex::new(r"  +\|")?,
        })
    }

    /// Shrink the padding inside markdown tables so separator rows
    /// do not eat the character budget of the splitter.
    pub fn tidy_tables(&self, text: &str) -> String {
        let text = self.dash_run.replace_all(text, "-|");
        self.space_run.replace_all(&text, " |").into_owned()
    }
}

/// Bold the first sentence fragment of a paragraph when it is short
/// (fewer than three words), e.g. `Results. We found` → `**Results** We found`.
pub fn format_heading(text: &str) -> String {
    let pieces: Vec<&str> = text.split('.').collect();
    if pieces.len() > 1 && pieces[0].split(' ').count() < 3 {
        format!("**{}**{}", pieces[0], pieces[1..].join("."))
    } else {
        text.to_string()
    }
}

/// Render a table grid as a GitHub-style pipe table. Tables with at
/// most one row or at most one column render as an empty string.
pub fn render_table(table: &Table) -> String {
    let rows = &table.rows;
    if rows.len() <= 1 || rows[0].len() <= 1 {
        return String::new();
    }

    let cells = |row: &[String]| -> Vec<String> {
        row.iter().map(|c| c.replace('\n', " ").trim().to_string()).collect()
    };

    let mut grid = TextTable::new();
    grid.load_preset(ASCII_MARKDOWN);
    grid.set_header(cells(&rows[0]));
    for row in &rows[1..] {
        grid.add_row(cells(row));
    }

    let mut text = grid.to_string();
    if let Some(caption) = &table.caption {
        text.push_str(&format!("\nCaption: {caption}\n"));
    }
    text
}
