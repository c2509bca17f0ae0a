// ============================================================
// Layer 4 — Dataset Sources
// ============================================================
// Concrete DatasetSource implementations for the export step.
//
//   <dir>/<split>.jsonl   one JSON object per line, keys in order
//   <dir>/<split>.csv     header row, one example per row; cells are
//                         kept as written since CSV carries no types
//
// Split discovery is a directory listing sorted by name so the
// export order is the same on every run.

use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use crate::domain::record::{FieldValue, Record};
use crate::domain::traits::DatasetSource;

/// Pick the source type from the files present in `dir`.
pub fn open_source(dir: impl AsRef<Path>) -> Result<Box<dyn DatasetSource>> {
    let dir = dir.as_ref();
    if !list_splits(dir, "jsonl")?.is_empty() {
        return Ok(Box::new(JsonLinesSource::new(dir)));
    }
    if !list_splits(dir, "csv")?.is_empty() {
        return Ok(Box::new(CsvSource::new(dir)));
    }
    anyhow::bail!("'{}' holds no <split>.jsonl or <split>.csv files", dir.display())
}

fn list_splits(dir: &Path, extension: &str) -> Result<Vec<String>> {
    let mut splits = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Cannot read dataset directory '{}'", dir.display()))?
    {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some(extension) {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                splits.push(stem.to_string());
            }
        }
    }
    splits.sort();
    Ok(splits)
}

// ─── JSON Lines ───────────────────────────────────────────────────────────────

pub struct JsonLinesSource {
    dir:  PathBuf,
    name: String,
}

impl JsonLinesSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir  = dir.into();
        let name = dir.display().to_string();
        Self { dir, name }
    }

    fn split_path(&self, split: &str) -> PathBuf {
        self.dir.join(format!("{split}.jsonl"))
    }
}

impl DatasetSource for JsonLinesSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn splits(&self) -> Result<Vec<String>> {
        list_splits(&self.dir, "jsonl")
    }

    fn records(&self, split: &str) -> Result<Box<dyn Iterator<Item = Result<Record>> + '_>> {
        let path = self.split_path(split);
        let file = File::open(&path)
            .with_context(|| format!("Cannot open '{}'", path.display()))?;

        let iter = BufReader::new(file)
            .lines()
            .enumerate()
            .filter(|(_, line)| line.as_ref().map(|l| !l.trim().is_empty()).unwrap_or(true))
            .map(move |(i, line)| -> Result<Record> {
                let line = line.with_context(|| format!("Cannot read '{}'", path.display()))?;
                let value: serde_json::Value = serde_json::from_str(&line)
                    .with_context(|| format!("{}:{}: invalid JSON", path.display(), i + 1))?;
                match value {
                    serde_json::Value::Object(map) => Ok(map
                        .into_iter()
                        .map(|(k, v)| (k, json_to_field(v)))
                        .collect()),
                    _ => anyhow::bail!("{}:{}: expected a JSON object", path.display(), i + 1),
                }
            });
        Ok(Box::new(iter))
    }
}

fn json_to_field(value: serde_json::Value) -> FieldValue {
    use serde_json::Value;
    match value {
        Value::Null      => FieldValue::Missing,
        Value::Bool(b)   => FieldValue::Bool(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => FieldValue::Int(i),
            None    => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => FieldValue::Text(s),
        Value::Array(items) => FieldValue::Array(items.into_iter().map(json_to_field).collect()),
        Value::Object(_) => FieldValue::Nested,
    }
}

// ─── CSV ──────────────────────────────────────────────────────────────────────

pub struct CsvSource {
    dir:  PathBuf,
    name: String,
}

impl CsvSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir  = dir.into();
        let name = dir.display().to_string();
        Self { dir, name }
    }
}

impl DatasetSource for CsvSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn splits(&self) -> Result<Vec<String>> {
        list_splits(&self.dir, "csv")
    }

    fn records(&self, split: &str) -> Result<Box<dyn Iterator<Item = Result<Record>> + '_>> {
        let path   = self.dir.join(format!("{split}.csv"));
        let mut rd = csv::Reader::from_path(&path)
            .with_context(|| format!("Cannot open '{}'", path.display()))?;
        let headers: Vec<String> = rd
            .headers()
            .with_context(|| format!("Cannot read header of '{}'", path.display()))?
            .iter()
            .map(str::to_string)
            .collect();

        let iter = rd.into_records().map(move |row| -> Result<Record> {
            let row = row.with_context(|| format!("Cannot read row of '{}'", path.display()))?;
            Ok(headers
                .iter()
                .zip(row.iter())
                .map(|(h, cell)| (h.clone(), FieldValue::Text(cell.to_string())))
                .collect())
        });
        Ok(Box::new(iter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(source: &dyn DatasetSource, split: &str) -> Vec<Record> {
        source
            .records(split)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_jsonl_source_reads_records_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("train.jsonl"),
            "{\"SMILES\": \"C\", \"G\": -40.5, \"num_atoms\": 5}\n\n{\"SMILES\": \"CC\", \"G\": -79.8, \"num_atoms\": 8}\n",
        )
        .unwrap();
        fs::write(dir.path().join("test.jsonl"), "{\"SMILES\": \"O\"}\n").unwrap();

        let source = open_source(dir.path()).unwrap();
        assert_eq!(source.splits().unwrap(), vec!["test", "train"]);

        let records = collect(source.as_ref(), "train");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].field_names(), vec!["SMILES", "G", "num_atoms"]);
        assert_eq!(records[1].get("SMILES"), &FieldValue::Text("CC".into()));
        assert_eq!(records[1].get("num_atoms"), &FieldValue::Int(8));
    }

    #[test]
    fn test_jsonl_source_rejects_non_objects() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("train.jsonl"), "[1, 2]\n").unwrap();
        let source = JsonLinesSource::new(dir.path());
        let first  = source.records("train").unwrap().next().unwrap();
        assert!(first.is_err());
    }

    #[test]
    fn test_csv_cells_keep_their_source_text() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("validation.csv"), "SMILES,tag,G\nCO,007,0.10\nCC,,1E-3\n").unwrap();

        let source  = open_source(dir.path()).unwrap();
        let records = collect(source.as_ref(), "validation");
        assert_eq!(records[0].get("tag"), &FieldValue::Text("007".into()));
        assert_eq!(records[0].get("G"), &FieldValue::Text("0.10".into()));
        assert_eq!(records[1].get("tag"), &FieldValue::Text(String::new()));
        assert_eq!(records[1].get("G"), &FieldValue::Text("1E-3".into()));
        assert_eq!(records[1].get("tag").render().unwrap(), "");
    }

    #[test]
    fn test_empty_directory_has_no_source() {
        let dir = tempfile::tempdir().unwrap();
        assert!(open_source(dir.path()).is_err());
    }
}
