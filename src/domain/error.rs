// ============================================================
// Layer 3 — Pipeline Errors
// ============================================================
// Failures that the application layer inspects or reports per
// feature. Everything else travels as anyhow::Error with context.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("split '{split}' is misaligned: {smiles_path} has {smiles_lines} lines but {target_path} has {target_lines}")]
    MisalignedSplit {
        split:        String,
        smiles_path:  PathBuf,
        smiles_lines: usize,
        target_path:  PathBuf,
        target_lines: usize,
    },

    #[error("input file {0} is empty")]
    EmptySplit(PathBuf),

    #[error(
        "vocabulary of {vocab_size} symbols gives embedding width {embedding} and recurrent width \
         {recurrent}; pass --min-layer-width to clamp"
    )]
    DegenerateVocabulary {
        vocab_size: usize,
        embedding:  usize,
        recurrent:  usize,
    },

    #[error("{path}:{line}: '{value}' is not a number")]
    InvalidTarget {
        path:  PathBuf,
        line:  usize,
        value: String,
    },

    #[error("split '{split}', field '{field}', record {index}: value cannot be written as text")]
    UnrenderableValue {
        split: String,
        field: String,
        index: usize,
    },

    #[error("feature '{0}' is not in the feature table")]
    UnknownFeature(String),

    #[error("feature '{name}' is declared {declared}, only float32 features are regression targets")]
    NotRegressionTarget { name: String, declared: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
