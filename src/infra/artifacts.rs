// ============================================================
// Layer 6 — Artifact Store
// ============================================================
// Everything a training run leaves behind, keyed by feature name:
//
//   model/
//     <metric>-<F>.png        loss, mae, mape, mse, msle curves
//     <split>-<F>.txt         predictions, one per input line
//     summary-<F>.txt         layer table + "Number of Epochs: N"
//     model-<F>.mpk           weights (Burn CompactRecorder)
//     config-<F>.json         architecture + training options
//     tokenizer-<F>.json      character vocabulary
//     manifest-<F>.json       input files and line counts
//     history-<F>.csv         per-epoch metrics
//     report.txt              per-feature outcome of the last run
//
// Every write replaces the previous file of the same name, so a
// re-run for a feature never leaves stale content behind.

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::CompactRecorder,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::{manifest::Manifest, text_files::write_lines};
use crate::domain::split::Split;
use crate::infra::{metrics::Metric, tokenizer_store::TokenizerStore};
use crate::ml::model::{LayerWidths, SmilesRegressor, SmilesRegressorConfig};
use crate::ml::trainer::FitOptions;

/// Architecture and training settings needed to rebuild a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModelConfig {
    pub feature:      String,
    pub smiles_field: String,
    pub vocab_size:   usize,
    pub seq_len:      usize,
    pub widths:       LayerWidths,
    pub dropout:      f64,
    pub training:     FitOptions,
    pub epochs_run:   usize,
    pub best_epoch:   usize,
}

impl TrainedModelConfig {
    pub fn model_config(&self) -> SmilesRegressorConfig {
        SmilesRegressorConfig::new(self.vocab_size, self.widths.embedding, self.widths.recurrent)
            .with_dropout(self.dropout)
    }
}

pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Create the store, creating `dir` if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn tokenizers(&self) -> TokenizerStore {
        TokenizerStore::new(&self.dir)
    }

    // ── Paths ─────────────────────────────────────────────────────────────────

    pub fn plot_path(&self, metric: Metric, feature: &str) -> PathBuf {
        self.dir.join(format!("{}-{feature}.png", metric.name()))
    }

    pub fn prediction_path(&self, split: Split, feature: &str) -> PathBuf {
        self.dir.join(split.file_name(feature))
    }

    pub fn summary_path(&self, feature: &str) -> PathBuf {
        self.dir.join(format!("summary-{feature}.txt"))
    }

    /// Without extension; the recorder appends `.mpk`.
    fn model_stem(&self, feature: &str) -> PathBuf {
        self.dir.join(format!("model-{feature}"))
    }

    pub fn model_path(&self, feature: &str) -> PathBuf {
        self.dir.join(format!("model-{feature}.mpk"))
    }

    pub fn config_path(&self, feature: &str) -> PathBuf {
        self.dir.join(format!("config-{feature}.json"))
    }

    pub fn manifest_path(&self, feature: &str) -> PathBuf {
        self.dir.join(format!("manifest-{feature}.json"))
    }

    pub fn history_path(&self, feature: &str) -> PathBuf {
        self.dir.join(format!("history-{feature}.csv"))
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.join("report.txt")
    }

    // ── Writers ───────────────────────────────────────────────────────────────

    pub fn save_predictions(&self, split: Split, feature: &str, values: &[f32]) -> Result<PathBuf> {
        let path = self.prediction_path(split, feature);
        write_lines(&path, values)?;
        tracing::debug!("Wrote {} {} predictions to '{}'", values.len(), split, path.display());
        Ok(path)
    }

    /// Layer summary followed by the number of epochs actually run.
    pub fn save_summary(&self, feature: &str, summary: &str, epochs_run: usize) -> Result<PathBuf> {
        let path = self.summary_path(feature);
        let mut text = summary.trim_end().to_string();
        text.push_str(&format!("\nNumber of Epochs: {epochs_run}\n"));
        fs::write(&path, text).with_context(|| format!("Cannot write summary '{}'", path.display()))?;
        Ok(path)
    }

    pub fn save_model<B: Backend>(&self, feature: &str, model: &SmilesRegressor<B>) -> Result<PathBuf> {
        let stem = self.model_stem(feature);
        model
            .clone()
            .save_file(stem.clone(), &CompactRecorder::new())
            .map_err(|e| anyhow::anyhow!("Failed to save model to '{}': {}", stem.display(), e))?;
        tracing::debug!("Saved model weights to '{}'", self.model_path(feature).display());
        Ok(self.model_path(feature))
    }

    /// Load the saved weights of `feature` into `model`, whose
    /// architecture must match the one that was saved.
    pub fn load_model<B: Backend>(
        &self,
        feature: &str,
        model:   SmilesRegressor<B>,
        device:  &B::Device,
    ) -> Result<SmilesRegressor<B>> {
        let stem = self.model_stem(feature);
        model
            .load_file(stem.clone(), &CompactRecorder::new(), device)
            .map_err(|e| {
                anyhow::anyhow!(
                    "Cannot load model '{}'. Has '{}' been trained? ({})",
                    self.model_path(feature).display(),
                    feature,
                    e
                )
            })
    }

    pub fn save_config(&self, cfg: &TrainedModelConfig) -> Result<PathBuf> {
        let path = self.config_path(&cfg.feature);
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        Ok(path)
    }

    pub fn load_config(&self, feature: &str) -> Result<TrainedModelConfig> {
        let path = self.config_path(feature);
        let json = fs::read_to_string(&path).with_context(|| {
            format!("Cannot read config from '{}'. Make sure '{}' was trained.", path.display(), feature)
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save_manifest(&self, manifest: &Manifest) -> Result<PathBuf> {
        let path = self.manifest_path(&manifest.feature);
        fs::write(&path, serde_json::to_string_pretty(manifest)?)
            .with_context(|| format!("Cannot write manifest to '{}'", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::backend::{default_device, InnerBackend};

    fn config() -> TrainedModelConfig {
        TrainedModelConfig {
            feature:      "G".into(),
            smiles_field: "SMILES".into(),
            vocab_size:   6,
            seq_len:      4,
            widths:       LayerWidths { embedding: 3, recurrent: 2, clamped: true },
            dropout:      0.7,
            training:     FitOptions::default(),
            epochs_run:   3,
            best_epoch:   2,
        }
    }

    #[test]
    fn test_paths_follow_naming_convention() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("model")).unwrap();
        assert!(store.plot_path(Metric::Msle, "G").ends_with("msle-G.png"));
        assert!(store.prediction_path(Split::Validation, "G").ends_with("validation-G.txt"));
        assert!(store.summary_path("G").ends_with("summary-G.txt"));
        assert!(store.model_path("G").ends_with("model-G.mpk"));
    }

    #[test]
    fn test_summary_ends_with_epoch_count() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let path  = store.save_summary("G", "Model: \"x\"\n\n", 17).unwrap();
        let text  = fs::read_to_string(path).unwrap();
        assert_eq!(text.lines().last(), Some("Number of Epochs: 17"));
    }

    #[test]
    fn test_config_round_trip() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        store.save_config(&config()).unwrap();
        assert_eq!(store.load_config("G").unwrap(), config());
    }

    #[test]
    fn test_saved_weights_reload_into_same_architecture() {
        let dir    = tempfile::tempdir().unwrap();
        let store  = ArtifactStore::new(dir.path()).unwrap();
        let device = default_device();
        let model_cfg = config().model_config();

        let trained: SmilesRegressor<InnerBackend> = model_cfg.init(&device);
        let path = store.save_model("G", &trained).unwrap();
        assert!(path.exists());

        let fresh: SmilesRegressor<InnerBackend> = model_cfg.init(&device);
        let loaded = store.load_model("G", fresh, &device).unwrap();

        let row: &[u32] = &[0, 3, 4, 5];
        let ids = crate::data::batcher::ids_tensor::<InnerBackend>(&[row], &device);
        let a = crate::ml::inferencer::tensor_values(trained.forward(ids.clone())).unwrap();
        let b = crate::ml::inferencer::tensor_values(loaded.forward(ids)).unwrap();
        // weights are stored at half precision
        assert!((a[0] - b[0]).abs() < 1e-2);
    }

    #[test]
    fn test_missing_model_has_helpful_error() {
        let dir    = tempfile::tempdir().unwrap();
        let store  = ArtifactStore::new(dir.path()).unwrap();
        let device = default_device();
        let fresh: SmilesRegressor<InnerBackend> = config().model_config().init(&device);
        let err = store.load_model("G", fresh, &device).unwrap_err();
        assert!(err.to_string().contains("model-G.mpk"));
    }
}
