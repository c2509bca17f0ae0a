// ============================================================
// Layer 3 — Dataset Splits
// ============================================================
// Every per-split text file is named `<split>-<field>.txt`, so the
// string form of a split is part of the on-disk contract.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::domain::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Test,
    Validation,
}

impl Split {
    /// All regression splits in the order artifacts are produced.
    pub const ALL: [Split; 3] = [Split::Train, Split::Test, Split::Validation];

    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train      => "train",
            Split::Test       => "test",
            Split::Validation => "validation",
        }
    }

    /// `<split>-<field>.txt`
    pub fn file_name(&self, field: &str) -> String {
        format!("{}-{}.txt", self.as_str(), field)
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train"                => Ok(Split::Train),
            "test"                 => Ok(Split::Test),
            "validation" | "valid" => Ok(Split::Validation),
            other => Err(PipelineError::InvalidConfig(format!("unknown split '{other}'"))),
        }
    }
}
