// ============================================================
// Layer 3 — Feature Table
// ============================================================
// Field name → declared element type. Built once at startup and
// never mutated; only `float32` entries are regression targets.

use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::Path, str::FromStr};

use crate::domain::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    Float32,
    Float64,
    Int64,
    String,
    Tensor,
}

impl FeatureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::Float32 => "float32",
            FeatureType::Float64 => "float64",
            FeatureType::Int64   => "int64",
            FeatureType::String  => "string",
            FeatureType::Tensor  => "tensor",
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "float32" => Ok(FeatureType::Float32),
            "float64" => Ok(FeatureType::Float64),
            "int64"   => Ok(FeatureType::Int64),
            "string"  => Ok(FeatureType::String),
            "tensor"  => Ok(FeatureType::Tensor),
            other => Err(PipelineError::InvalidConfig(format!("unknown feature type '{other}'"))),
        }
    }
}

/// QM9 (DimeNet split) as published by TensorFlow Datasets.
const QM9: &[(&str, FeatureType)] = &[
    ("A",              FeatureType::Float32),
    ("B",              FeatureType::Float32),
    ("C",              FeatureType::Float32),
    ("Cv",             FeatureType::Float32),
    ("G",              FeatureType::Float32),
    ("G_atomization",  FeatureType::Float32),
    ("H",              FeatureType::Float32),
    ("H_atomization",  FeatureType::Float32),
    ("InChI",          FeatureType::String),
    ("InChI_relaxed",  FeatureType::String),
    ("SMILES",         FeatureType::String),
    ("SMILES_relaxed", FeatureType::String),
    ("U",              FeatureType::Float32),
    ("U0",             FeatureType::Float32),
    ("U0_atomization", FeatureType::Float32),
    ("U_atomization",  FeatureType::Float32),
    ("alpha",          FeatureType::Float32),
    ("charges",        FeatureType::Tensor),
    ("frequencies",    FeatureType::Tensor),
    ("gap",            FeatureType::Float32),
    ("homo",           FeatureType::Float32),
    ("index",          FeatureType::Int64),
    ("lumo",           FeatureType::Float32),
    ("mu",             FeatureType::Float32),
    ("num_atoms",      FeatureType::Int64),
    ("positions",      FeatureType::Tensor),
    ("r2",             FeatureType::Float32),
    ("tag",            FeatureType::String),
    ("zpve",           FeatureType::Float32),
];

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    entries: Vec<(String, FeatureType)>,
}

impl FeatureTable {
    pub fn new(entries: Vec<(String, FeatureType)>) -> Result<Self, PipelineError> {
        for (i, (name, _)) in entries.iter().enumerate() {
            if entries[..i].iter().any(|(n, _)| n == name) {
                return Err(PipelineError::InvalidConfig(format!(
                    "feature '{name}' is declared twice"
                )));
            }
        }
        Ok(Self { entries })
    }

    pub fn qm9() -> Self {
        Self {
            entries: QM9.iter().map(|(n, t)| (n.to_string(), *t)).collect(),
        }
    }

    /// Parse `{"<name>": "<type>", ...}`; declaration order is kept.
    pub fn from_json_str(json: &str) -> Result<Self, PipelineError> {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)
            .map_err(|e| PipelineError::InvalidConfig(format!("feature table: {e}")))?;

        let mut entries = Vec::with_capacity(map.len());
        for (name, ty) in map {
            let ty = ty.as_str().ok_or_else(|| {
                PipelineError::InvalidConfig(format!("feature '{name}': type must be a string"))
            })?;
            entries.push((name, ty.parse()?));
        }
        Self::new(entries)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            PipelineError::InvalidConfig(format!("cannot read feature table '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    pub fn get(&self, name: &str) -> Option<FeatureType> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, t)| *t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FeatureType)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), *t))
    }

    /// Every `float32` feature, in table order.
    pub fn regression_targets(&self) -> Vec<String> {
        self.iter()
            .filter(|(_, t)| *t == FeatureType::Float32)
            .map(|(n, _)| n.to_string())
            .collect()
    }

    /// Check that `name` can be trained on.
    pub fn require_target(&self, name: &str) -> Result<(), PipelineError> {
        match self.get(name) {
            Some(FeatureType::Float32) => Ok(()),
            Some(other) => Err(PipelineError::NotRegressionTarget {
                name:     name.to_string(),
                declared: other.to_string(),
            }),
            None => Err(PipelineError::UnknownFeature(name.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qm9_targets_exclude_non_float_fields() {
        let table   = FeatureTable::qm9();
        let targets = table.regression_targets();
        assert!(targets.contains(&"G".to_string()));
        assert!(targets.contains(&"zpve".to_string()));
        assert!(!targets.contains(&"SMILES".to_string()));
        assert!(!targets.contains(&"positions".to_string()));
        assert!(!targets.contains(&"index".to_string()));
        assert_eq!(targets.first().map(String::as_str), Some("A"));
    }

    #[test]
    fn test_json_table_keeps_declaration_order() {
        let table = FeatureTable::from_json_str(
            r#"{"zeta": "float32", "SMILES": "string", "alpha": "float32"}"#,
        )
        .unwrap();
        assert_eq!(table.regression_targets(), vec!["zeta", "alpha"]);
        assert_eq!(table.get("SMILES"), Some(FeatureType::String));
    }

    #[test]
    fn test_json_table_rejects_unknown_type() {
        let err = FeatureTable::from_json_str(r#"{"G": "complex128"}"#).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn test_table_file_is_read_and_missing_file_reported() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.json");
        std::fs::write(&path, r#"{"SMILES": "string", "gap": "float32"}"#).unwrap();

        let table = FeatureTable::from_json_file(&path).unwrap();
        assert_eq!(table.regression_targets(), vec!["gap"]);
        assert!(FeatureTable::from_json_file(dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let entries = vec![
            ("G".to_string(), FeatureType::Float32),
            ("G".to_string(), FeatureType::Int64),
        ];
        assert!(FeatureTable::new(entries).is_err());
    }

    #[test]
    fn test_require_target() {
        let table = FeatureTable::qm9();
        assert!(table.require_target("homo").is_ok());
        assert!(matches!(
            table.require_target("SMILES"),
            Err(PipelineError::NotRegressionTarget { .. })
        ));
        assert!(matches!(
            table.require_target("nope"),
            Err(PipelineError::UnknownFeature(_))
        ));
    }
}
