// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Reloads the artifacts a training run left for one feature and
// scores a file of SMILES strings, one prediction per input line.

use anyhow::Result;
use std::path::PathBuf;

use crate::data::text_files::{read_lines, write_lines};
use crate::infra::artifacts::ArtifactStore;
use crate::ml::inferencer::Predictor;

#[derive(Debug, Clone)]
pub struct PredictConfig {
    pub model_dir: PathBuf,
    pub feature:   String,
    pub input:     PathBuf,
    pub output:    PathBuf,
}

pub struct PredictUseCase {
    config: PredictConfig,
}

impl PredictUseCase {
    pub fn new(config: PredictConfig) -> Self {
        Self { config }
    }

    /// Returns the number of predictions written.
    pub fn execute(&self) -> Result<usize> {
        let cfg = &self.config;
        let store     = ArtifactStore::new(&cfg.model_dir)?;
        let predictor = Predictor::from_artifacts(&store, &cfg.feature)?;

        let smiles = read_lines(&cfg.input)?;
        let preds  = predictor.predict_strings(&smiles)?;
        let written = write_lines(&cfg.output, &preds)?;
        tracing::info!("Wrote {} '{}' predictions to '{}'", written, cfg.feature, cfg.output.display());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{RegressionConfig, TrainUseCase};
    use crate::domain::{feature_table::{FeatureTable, FeatureType}, split::Split};
    use crate::ml::trainer::FitOptions;
    use std::fs;

    #[test]
    fn test_reloaded_model_reproduces_training_predictions() {
        let dir  = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir_all(&data).unwrap();
        for split in Split::ALL {
            fs::write(data.join(split.file_name("SMILES")), "C\nCC\nCCC\n").unwrap();
            fs::write(data.join(split.file_name("G")), "1\n2\n3\n").unwrap();
        }
        let table = FeatureTable::new(vec![("G".to_string(), FeatureType::Float32)]).unwrap();
        let train = RegressionConfig {
            data_dir:        data.clone(),
            model_dir:       dir.path().join("model"),
            min_layer_width: Some(1),
            fit:             FitOptions { max_epochs: 2, ..FitOptions::default() },
            ..RegressionConfig::default()
        };
        let report = TrainUseCase::new(train, table).execute().unwrap();
        assert!(report.failed().is_empty());

        let output = dir.path().join("out/G.txt");
        let written = PredictUseCase::new(PredictConfig {
            model_dir: dir.path().join("model"),
            feature:   "G".into(),
            input:     data.join("test-SMILES.txt"),
            output:    output.clone(),
        })
        .execute()
        .unwrap();
        assert_eq!(written, 3);

        let reloaded: Vec<f32> = read_lines(&output).unwrap().iter().map(|l| l.parse().unwrap()).collect();
        let trained: Vec<f32> = read_lines(dir.path().join("model/test-G.txt"))
            .unwrap()
            .iter()
            .map(|l| l.parse().unwrap())
            .collect();
        for (a, b) in reloaded.iter().zip(&trained) {
            assert!((a - b).abs() < 1e-2, "{a} vs {b}");
        }
    }

    #[test]
    fn test_missing_artifacts_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = PredictUseCase::new(PredictConfig {
            model_dir: dir.path().to_path_buf(),
            feature:   "G".into(),
            input:     dir.path().join("in.txt"),
            output:    dir.path().join("out.txt"),
        })
        .execute()
        .unwrap_err();
        assert!(format!("{err:#}").contains("config-G.json"));
    }
}
