// ============================================================
// Layer 4 — JSONL Datasets
// ============================================================
// Every intermediate and final artifact of the pipeline is a
// newline-delimited JSON file: one serde record per line.
//
// Writes are idempotent: an existing file at the target path is
// removed first, so a re-run never mixes old and new records.
// Appends go through a BufWriter that is flushed before the
// handle is dropped.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// An in-memory dataset of JSONL records, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonlDataset<T> {
    records: Vec<T>,
}

impl<T> JsonlDataset<T> {
    pub fn new(records: Vec<T>) -> Self { Self { records } }

    pub fn len(&self) -> usize { self.records.len() }

    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    pub fn into_records(self) -> Vec<T> {
        self.records
    }
}

impl<T: DeserializeOwned> JsonlDataset<T> {
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::new(read_jsonl(path)?))
    }
}

impl<T: Serialize> JsonlDataset<T> {
    pub fn save(&self, path: &Path) -> Result<()> {
        write_jsonl(path, &self.records)
    }
}

/// Read every non-blank line of `path` as one record.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))?;

    let mut records = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid JSON record", path.display(), n + 1))?;
        records.push(record);
    }

    tracing::debug!("Read {} records from '{}'", records.len(), path.display());
    Ok(records)
}

/// Replace `path` with exactly `records`.
pub fn write_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    remove_stale(path)?;
    append_jsonl(path, records)?;
    tracing::debug!("Wrote {} records to '{}'", records.len(), path.display());
    Ok(())
}

/// Append `records` to `path`, creating it when absent.
pub fn append_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Cannot open '{}' for writing", path.display()))?;

    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Delete `path` if it exists. Returns whether something was removed.
pub fn remove_stale(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(path)
        .with_context(|| format!("Cannot remove stale '{}'", path.display()))?;
    tracing::info!("Removed stale output '{}'", path.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        name:  String,
        count: u32,
    }

    fn row(name: &str, count: u32) -> Row {
        Row { name: name.to_string(), count }
    }

    #[test]
    fn test_write_replaces_previous_contents() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.jsonl");

        write_jsonl(&path, &[row("old", 1), row("older", 2)]).unwrap();
        write_jsonl(&path, &[row("new", 3)]).unwrap();

        let rows: Vec<Row> = read_jsonl(&path).unwrap();
        assert_eq!(rows, vec![row("new", 3)]);
    }

    #[test]
    fn test_append_keeps_existing_lines() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rows.jsonl");

        append_jsonl(&path, &[row("a", 1)]).unwrap();
        append_jsonl(&path, &[row("b", 2)]).unwrap();

        let dataset: JsonlDataset<Row> = JsonlDataset::load(&path).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.into_records()[1], row("b", 2));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.jsonl");
        fs::write(&path, "{\"name\":\"a\",\"count\":1}\n\n   \n{\"name\":\"b\",\"count\":2}\n").unwrap();

        let rows: Vec<Row> = read_jsonl(&path).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_invalid_line_reports_position() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.jsonl");
        fs::write(&path, "{\"name\":\"a\",\"count\":1}\nnot json\n").unwrap();

        let err = read_jsonl::<Row>(&path).unwrap_err();
        assert!(format!("{err:#}").contains(":2: invalid JSON record"));
    }

    #[test]
    fn test_remove_stale_reports_presence() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.jsonl");
        assert!(!remove_stale(&path).unwrap());
        fs::write(&path, "x").unwrap();
        assert!(remove_stale(&path).unwrap());
        assert!(!path.exists());
    }
}
