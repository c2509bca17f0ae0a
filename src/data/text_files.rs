// ============================================================
// Layer 4 — Line-Oriented Text Files
// ============================================================
// The per-split, per-field `.txt` files are the only transport
// between export and training: one example per line, no header.
// Line order IS the example order, so nothing here reorders,
// deduplicates, or drops blank lines.

use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use crate::domain::error::PipelineError;

/// Read every line, without its `\n` / `\r\n` terminator.
pub fn read_lines(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Cannot open '{}'", path.display()))?;

    BufReader::new(file)
        .lines()
        .map(|line| {
            line.map(|mut l| {
                if l.ends_with('\r') {
                    l.pop();
                }
                l
            })
            .with_context(|| format!("Cannot read '{}'", path.display()))
        })
        .collect()
}

/// Number of lines, counting a final line without a terminator.
pub fn count_lines(path: impl AsRef<Path>) -> Result<usize> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Cannot open '{}'", path.display()))?;

    let mut reader = BufReader::new(file);
    let mut buf    = Vec::new();
    let mut count  = 0usize;
    while reader
        .read_until(b'\n', &mut buf)
        .with_context(|| format!("Cannot read '{}'", path.display()))?
        > 0
    {
        count += 1;
        buf.clear();
    }
    Ok(count)
}

/// Parse one f32 target per line. Errors name the file and the
/// 1-based line of the first bad value.
pub fn read_targets(path: impl AsRef<Path>) -> Result<Vec<f32>> {
    let path = path.as_ref();
    read_lines(path)?
        .iter()
        .enumerate()
        .map(|(i, line)| {
            line.trim().parse::<f32>().map_err(|_| {
                anyhow::Error::from(PipelineError::InvalidTarget {
                    path:  path.to_path_buf(),
                    line:  i + 1,
                    value: line.clone(),
                })
            })
        })
        .collect()
}

/// Write one item per line, replacing any previous content.
pub fn write_lines<I, T>(path: impl AsRef<Path>, lines: I) -> Result<usize>
where
    I: IntoIterator<Item = T>,
    T: std::fmt::Display,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path).with_context(|| format!("Cannot create '{}'", path.display()))?;
    let mut out   = BufWriter::new(file);
    let mut count = 0usize;
    for line in lines {
        writeln!(out, "{line}")?;
        count += 1;
    }
    out.flush().with_context(|| format!("Cannot write '{}'", path.display()))?;
    Ok(count)
}
