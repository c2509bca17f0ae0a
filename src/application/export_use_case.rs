// ============================================================
// Layer 2 — ExportUseCase
// ============================================================
// Dumps every field of every split to its own text file:
//
//   data/<split>-<field>.txt   one rendered value per example
//
// The fields of a split are the fields of its first record. Each
// split is read in one pass with one writer per field. Files are
// written under a temporary name and renamed only once the whole
// split rendered, so an unrenderable value fails the export
// without leaving a half-written file behind.

use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::domain::{error::PipelineError, traits::DatasetSource};

#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFile {
    pub split: String,
    pub field: String,
    pub path:  PathBuf,
    pub lines: usize,
}

#[derive(Debug, Default)]
pub struct ExportReport {
    pub files: Vec<ExportedFile>,
}

pub struct ExportUseCase {
    source:   Box<dyn DatasetSource>,
    data_dir: PathBuf,
}

impl ExportUseCase {
    pub fn new(source: Box<dyn DatasetSource>, data_dir: impl AsRef<Path>) -> Self {
        Self { source, data_dir: data_dir.as_ref().to_path_buf() }
    }

    pub fn execute(&self) -> Result<ExportReport> {
        fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("Cannot create '{}'", self.data_dir.display()))?;
        tracing::info!("Exporting '{}' into '{}'", self.source.name(), self.data_dir.display());

        let mut report = ExportReport::default();
        for split in self.source.splits()? {
            let files = self.export_split(&split)?;
            tracing::info!("Split '{}': {} fields written", split, files.len());
            report.files.extend(files);
        }
        Ok(report)
    }

    fn export_split(&self, split: &str) -> Result<Vec<ExportedFile>> {
        let mut records = self.source.records(split)?.peekable();

        let fields = match records.peek() {
            Some(Ok(first)) => first.field_names(),
            Some(Err(_)) => {
                // surface the read error itself
                return Err(records.next().and_then(Result::err).unwrap_or_else(|| {
                    anyhow::anyhow!("Cannot read first record of split '{split}'")
                }));
            }
            None => {
                tracing::warn!("Split '{}' has no records; nothing exported", split);
                return Ok(Vec::new());
            }
        };

        let mut writers = Vec::with_capacity(fields.len());
        for field in &fields {
            writers.push(PendingFile::create(&self.data_dir, split, field)?);
        }

        let result = (|| -> Result<usize> {
            let mut count = 0usize;
            for (index, record) in records.enumerate() {
                let record = record?;
                for (field, writer) in fields.iter().zip(writers.iter_mut()) {
                    let text = record.get(field).render().ok_or_else(|| PipelineError::UnrenderableValue {
                        split: split.to_string(),
                        field: field.clone(),
                        index,
                    })?;
                    writer.write_line(&text)?;
                }
                count += 1;
            }
            Ok(count)
        })();

        match result {
            Ok(lines) => writers
                .into_iter()
                .zip(fields)
                .map(|(writer, field)| -> Result<ExportedFile> {
                    let path = writer.commit()?;
                    tracing::debug!("Wrote {} lines to '{}'", lines, path.display());
                    Ok(ExportedFile { split: split.to_string(), field, path, lines })
                })
                .collect(),
            Err(e) => {
                for writer in writers {
                    writer.discard();
                }
                Err(e)
            }
        }
    }
}

/// A field file being written under a temporary name.
struct PendingFile {
    tmp_path:   PathBuf,
    final_path: PathBuf,
    out:        BufWriter<File>,
}

impl PendingFile {
    fn create(dir: &Path, split: &str, field: &str) -> Result<Self> {
        let final_path = dir.join(format!("{split}-{field}.txt"));
        let tmp_path   = dir.join(format!(".{split}-{field}.txt.partial"));
        let file = File::create(&tmp_path)
            .with_context(|| format!("Cannot create '{}'", tmp_path.display()))?;
        Ok(Self { tmp_path, final_path, out: BufWriter::new(file) })
    }

    fn write_line(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{text}")
            .with_context(|| format!("Cannot write '{}'", self.tmp_path.display()))
    }

    fn commit(mut self) -> Result<PathBuf> {
        self.out.flush()?;
        fs::rename(&self.tmp_path, &self.final_path)
            .with_context(|| format!("Cannot move into '{}'", self.final_path.display()))?;
        Ok(self.final_path)
    }

    fn discard(self) {
        drop(self.out);
        fs::remove_file(&self.tmp_path).ok();
    }
}
