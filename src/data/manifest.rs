// ============================================================
// Layer 4 — Split Manifest
// ============================================================
// The text files carry no schema: the SMILES file and the target
// file of a split are only related by line position. The manifest
// records, per split, which two files are paired and how many
// lines each holds, and refuses to train when they disagree.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::text_files::count_lines;
use crate::domain::error::PipelineError;
use crate::domain::split::Split;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitEntry {
    pub split:        Split,
    pub smiles_path:  PathBuf,
    pub smiles_lines: usize,
    pub target_path:  PathBuf,
    pub target_lines: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub feature:      String,
    pub smiles_field: String,
    pub splits:       Vec<SplitEntry>,
}

impl Manifest {
    /// Count the lines of every `<split>-<smiles_field>.txt` and
    /// `<split>-<feature>.txt` under `data_dir`.
    pub fn build(data_dir: impl AsRef<Path>, smiles_field: &str, feature: &str) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let mut splits = Vec::with_capacity(Split::ALL.len());

        for split in Split::ALL {
            let smiles_path = data_dir.join(split.file_name(smiles_field));
            let target_path = data_dir.join(split.file_name(feature));
            let smiles_lines = count_lines(&smiles_path)?;
            let target_lines = count_lines(&target_path)?;
            splits.push(SplitEntry { split, smiles_path, smiles_lines, target_path, target_lines });
        }

        Ok(Self {
            feature:      feature.to_string(),
            smiles_field: smiles_field.to_string(),
            splits,
        })
    }

    /// Every file non-empty and every SMILES/target pair the same length.
    pub fn validate(&self) -> Result<(), PipelineError> {
        for entry in &self.splits {
            if entry.smiles_lines == 0 {
                return Err(PipelineError::EmptySplit(entry.smiles_path.clone()));
            }
            if entry.target_lines == 0 {
                return Err(PipelineError::EmptySplit(entry.target_path.clone()));
            }
            if entry.smiles_lines != entry.target_lines {
                return Err(PipelineError::MisalignedSplit {
                    split:        entry.split.to_string(),
                    smiles_path:  entry.smiles_path.clone(),
                    smiles_lines: entry.smiles_lines,
                    target_path:  entry.target_path.clone(),
                    target_lines: entry.target_lines,
                });
            }
        }
        Ok(())
    }

    pub fn entry(&self, split: Split) -> Option<&SplitEntry> {
        self.splits.iter().find(|e| e.split == split)
    }
}
