// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Trains one SMILES → property regressor per float32 feature.
// For each feature, in order:
//
//   Step 1: Build and validate the split manifest   (Layer 4 - data)
//   Step 2: Load SMILES and target lines            (Layer 4 - data)
//   Step 3: Build the character tokenizer (train)   (Layer 6 - infra)
//   Step 4: Size the layers from the vocabulary     (Layer 5 - ml)
//   Step 5: Encode splits into Burn datasets        (Layer 4 - data)
//   Step 6: Run the training loop                   (Layer 5 - ml)
//   Step 7: Plot the five metric curves             (Layer 6 - infra)
//   Step 8: Predict train / test / validation       (Layer 5 - ml)
//   Step 9: Save summary, weights, config, history  (Layer 6 - infra)
//
// A feature that fails is logged and recorded; the remaining
// features still run. The outcome of every feature is written to
// model/report.txt.

use anyhow::{Context, Result};
use burn::module::AutodiffModule;
use std::{
    fmt, fs,
    path::PathBuf,
};

use crate::data::{
    dataset::SmilesDataset,
    manifest::{Manifest, SplitEntry},
    text_files::{read_lines, read_targets},
};
use crate::domain::{feature_table::FeatureTable, split::Split};
use crate::infra::{
    artifacts::{ArtifactStore, TrainedModelConfig},
    metrics::{Metric, MetricsLogger},
    plots::plot_metric,
    tokenizer_store::longest,
};
use crate::ml::{
    backend::{default_device, Device, TrainBackend},
    inferencer::predict_rows,
    model::{LayerWidths, SmilesRegressorConfig},
    trainer::{fit_regressor, FitOptions},
};

// ─── Training Configuration ──────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct RegressionConfig {
    pub data_dir:          PathBuf,
    pub model_dir:         PathBuf,
    pub smiles_field:      String,
    /// Features to train; empty means every regression target.
    pub features:          Vec<String>,
    pub embedding_divisor: usize,
    pub recurrent_divisor: usize,
    pub dropout:           f64,
    /// Lower bound for both layer widths. Unset means a vocabulary
    /// too small for the divisors is an error.
    pub min_layer_width:   Option<usize>,
    pub fit:               FitOptions,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            data_dir:          PathBuf::from("data"),
            model_dir:         PathBuf::from("model"),
            smiles_field:      "SMILES".to_string(),
            features:          Vec::new(),
            embedding_divisor: 10,
            recurrent_divisor: 100,
            dropout:           0.7,
            min_layer_width:   None,
            fit:               FitOptions::default(),
        }
    }
}

// ─── Run report ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureOutcome {
    Trained {
        feature:    String,
        epochs_run: usize,
        best_epoch: usize,
        valid_loss: f64,
    },
    Failed {
        feature: String,
        error:   String,
    },
}

impl FeatureOutcome {
    pub fn feature(&self) -> &str {
        match self {
            FeatureOutcome::Trained { feature, .. } | FeatureOutcome::Failed { feature, .. } => feature,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FeatureOutcome::Failed { .. })
    }
}

impl fmt::Display for FeatureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureOutcome::Trained { feature, epochs_run, best_epoch, valid_loss } => write!(
                f,
                "{feature}\ttrained\tepochs={epochs_run}\tbest_epoch={best_epoch}\tval_loss={valid_loss}"
            ),
            FeatureOutcome::Failed { feature, error } => write!(f, "{feature}\tfailed\t{error}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct TrainReport {
    pub outcomes: Vec<FeatureOutcome>,
}

impl TrainReport {
    pub fn failed(&self) -> Vec<&str> {
        self.outcomes.iter().filter(|o| o.is_failed()).map(FeatureOutcome::feature).collect()
    }

    pub fn render(&self) -> String {
        self.outcomes.iter().map(|o| format!("{o}\n")).collect()
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: RegressionConfig,
    table:  FeatureTable,
}

impl TrainUseCase {
    pub fn new(config: RegressionConfig, table: FeatureTable) -> Self {
        Self { config, table }
    }

    /// Features this run trains, in feature table order unless an
    /// explicit subset was given.
    pub fn features(&self) -> Result<Vec<String>> {
        if self.config.features.is_empty() {
            let targets = self.table.regression_targets();
            anyhow::ensure!(!targets.is_empty(), "the feature table declares no float32 features");
            return Ok(targets);
        }
        for name in &self.config.features {
            self.table.require_target(name)?;
        }
        Ok(self.config.features.clone())
    }

    /// Train every selected feature. Per-feature failures are part
    /// of the returned report, not an `Err`.
    pub fn execute(&self) -> Result<TrainReport> {
        let features = self.features()?;
        let store    = ArtifactStore::new(&self.config.model_dir)?;
        let device   = default_device();
        tracing::info!("Training {} feature(s) into '{}'", features.len(), store.dir().display());

        let mut report = TrainReport::default();
        for feature in &features {
            tracing::info!("── Feature '{}' ──", feature);
            let outcome = match self.run_feature(feature, &store, &device) {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!("Feature '{}' failed: {:#}", feature, e);
                    FeatureOutcome::Failed { feature: feature.clone(), error: format!("{e:#}") }
                }
            };
            report.outcomes.push(outcome);
        }

        let path = store.report_path();
        fs::write(&path, report.render())
            .with_context(|| format!("Cannot write report '{}'", path.display()))?;
        Ok(report)
    }

    fn run_feature(&self, feature: &str, store: &ArtifactStore, device: &Device) -> Result<FeatureOutcome> {
        let cfg = &self.config;

        // ── Step 1: Manifest ─────────────────────────────────────────────────
        // Refuse to train on splits whose SMILES and target files
        // disagree on length.
        let manifest = Manifest::build(&cfg.data_dir, &cfg.smiles_field, feature)?;
        manifest.validate()?;
        store.save_manifest(&manifest)?;

        // ── Step 2: Load lines ───────────────────────────────────────────────
        let train = SplitInputs::load(&manifest, Split::Train)?;
        let test  = SplitInputs::load(&manifest, Split::Test)?;
        let valid = SplitInputs::load(&manifest, Split::Validation)?;
        tracing::info!(
            "Loaded {} train, {} test, {} validation examples",
            train.smiles.len(),
            test.smiles.len(),
            valid.smiles.len()
        );

        // ── Step 3: Tokenizer ────────────────────────────────────────────────
        // Vocabulary and sequence length come from the training split only.
        let tokenizer = store.tokenizers().build_and_save(feature, &train.smiles, false)?;
        let vocab_size = tokenizer.vocab_size();
        let seq_len    = longest(&train.smiles);

        // ── Step 4: Layer widths ─────────────────────────────────────────────
        let widths = LayerWidths::from_vocab(
            vocab_size,
            cfg.embedding_divisor,
            cfg.recurrent_divisor,
            cfg.min_layer_width,
        )?;
        if widths.clamped {
            tracing::warn!(
                "Vocabulary of {} symbols is small; layer widths clamped to {}/{}",
                vocab_size,
                widths.embedding,
                widths.recurrent
            );
        }
        tracing::info!(
            vocab_size,
            seq_len,
            embedding = widths.embedding,
            recurrent = widths.recurrent,
            "Model sized"
        );

        // ── Step 5: Datasets ─────────────────────────────────────────────────
        let train_ids = tokenizer.encode_all(&train.smiles, seq_len)?;
        let test_ids  = tokenizer.encode_all(&test.smiles, seq_len)?;
        let valid_ids = tokenizer.encode_all(&valid.smiles, seq_len)?;
        let train_ds  = SmilesDataset::from_parts(train_ids.clone(), &train.targets);
        let valid_ds  = SmilesDataset::from_parts(valid_ids.clone(), &valid.targets);

        // ── Step 6: Train ────────────────────────────────────────────────────
        let model = SmilesRegressorConfig::new(vocab_size, widths.embedding, widths.recurrent)
            .with_dropout(cfg.dropout)
            .init::<TrainBackend>(device);
        let outcome = fit_regressor(model, train_ds, valid_ds, &cfg.fit, device)?;
        let history = outcome.history;
        let model   = outcome.model.valid();

        // ── Step 7: Plots ────────────────────────────────────────────────────
        for metric in Metric::ALL {
            let (train_series, valid_series) = history.series(metric);
            plot_metric(&store.plot_path(metric, feature), feature, metric, &train_series, &valid_series)?;
        }

        // ── Step 8: Predictions ──────────────────────────────────────────────
        for (split, ids) in [(Split::Train, &train_ids), (Split::Test, &test_ids), (Split::Validation, &valid_ids)] {
            let preds = predict_rows(&model, ids, cfg.fit.batch_size, device)?;
            store.save_predictions(split, feature, &preds)?;
        }

        // ── Step 9: Summary, weights, config, history ────────────────────────
        let epochs_run = history.epochs_run();
        store.save_summary(feature, &model.summary(&format!("regressor-{feature}"), seq_len), epochs_run)?;
        store.save_model(feature, &model)?;
        store.save_config(&TrainedModelConfig {
            feature:      feature.to_string(),
            smiles_field: cfg.smiles_field.clone(),
            vocab_size,
            seq_len,
            widths,
            dropout:      cfg.dropout,
            training:     cfg.fit.clone(),
            epochs_run,
            best_epoch:   outcome.best_epoch,
        })?;
        MetricsLogger::new(store.history_path(feature)).write(&history)?;

        let valid_loss = history.valid.last().map_or(f64::NAN, |m| m.loss);
        tracing::info!(
            feature,
            epochs_run,
            best_epoch = outcome.best_epoch,
            stopped_early = outcome.stopped_early,
            valid_loss,
            "Feature trained"
        );

        Ok(FeatureOutcome::Trained {
            feature: feature.to_string(),
            epochs_run,
            best_epoch: outcome.best_epoch,
            valid_loss,
        })
    }
}

/// SMILES lines and parsed targets of one split.
struct SplitInputs {
    smiles:  Vec<String>,
    targets: Vec<f32>,
}

impl SplitInputs {
    fn load(manifest: &Manifest, split: Split) -> Result<Self> {
        let SplitEntry { smiles_path, target_path, .. } = manifest
            .entry(split)
            .with_context(|| format!("manifest has no '{split}' split"))?;
        Ok(Self {
            smiles:  read_lines(smiles_path)?,
            targets: read_targets(target_path)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{error::PipelineError, feature_table::FeatureType};

    fn table() -> FeatureTable {
        FeatureTable::new(vec![
            ("SMILES".to_string(), FeatureType::String),
            ("G".to_string(), FeatureType::Float32),
        ])
        .unwrap()
    }

    fn write_data(dir: &std::path::Path) {
        fs::create_dir_all(dir).unwrap();
        for split in Split::ALL {
            fs::write(dir.join(split.file_name("SMILES")), "C\nCC\nCCC\n").unwrap();
            fs::write(dir.join(split.file_name("G")), "1\n2\n3\n").unwrap();
        }
    }

    fn config(root: &std::path::Path, min_layer_width: Option<usize>) -> RegressionConfig {
        RegressionConfig {
            data_dir:  root.join("data"),
            model_dir: root.join("model"),
            min_layer_width,
            fit: FitOptions { max_epochs: 3, ..FitOptions::default() },
            ..RegressionConfig::default()
        }
    }

    #[test]
    fn test_end_to_end_writes_every_artifact_and_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        write_data(&dir.path().join("data"));
        let use_case = TrainUseCase::new(config(dir.path(), Some(1)), table());

        for _ in 0..2 {
            let report = use_case.execute().unwrap();
            assert!(report.failed().is_empty(), "{}", report.render());

            let model_dir = dir.path().join("model");
            for metric in ["loss", "mae", "mape", "mse", "msle"] {
                assert!(model_dir.join(format!("{metric}-G.png")).is_file());
            }
            for split in Split::ALL {
                let preds = read_lines(model_dir.join(split.file_name("G"))).unwrap();
                assert_eq!(preds.len(), 3);
                assert!(preds.iter().all(|p| p.parse::<f32>().is_ok()));
            }

            let FeatureOutcome::Trained { epochs_run, .. } = report.outcomes[0] else {
                panic!("feature not trained");
            };
            assert!((1..=3).contains(&epochs_run));
            let summary = fs::read_to_string(model_dir.join("summary-G.txt")).unwrap();
            assert!(summary.contains(&format!("Number of Epochs: {epochs_run}")));

            let history = read_lines(model_dir.join("history-G.csv")).unwrap();
            assert_eq!(history.len(), epochs_run + 1);
            assert!(model_dir.join("model-G.mpk").is_file());
            assert!(model_dir.join("tokenizer-G.json").is_file());
            assert!(fs::read_to_string(model_dir.join("report.txt")).unwrap().starts_with("G\ttrained"));
        }
    }

    #[test]
    fn test_written_config_records_what_the_run_resolved() {
        let dir = tempfile::tempdir().unwrap();
        write_data(&dir.path().join("data"));
        let cfg = config(dir.path(), Some(1));
        let report = TrainUseCase::new(cfg.clone(), table()).execute().unwrap();
        let FeatureOutcome::Trained { epochs_run, best_epoch, .. } = report.outcomes[0] else {
            panic!("feature not trained");
        };

        let saved = ArtifactStore::new(&cfg.model_dir).unwrap().load_config("G").unwrap();
        assert_eq!(saved.feature, "G");
        assert_eq!(saved.smiles_field, cfg.smiles_field);
        assert_eq!(saved.training, cfg.fit);
        assert_eq!((saved.epochs_run, saved.best_epoch), (epochs_run, best_epoch));
        assert!(saved.widths.clamped);
        assert!(saved.vocab_size > 0 && saved.seq_len >= 3);
        assert_eq!(saved.model_config().dropout, cfg.dropout);
    }

    #[test]
    fn test_tiny_vocabulary_fails_the_feature_without_clamp() {
        let dir = tempfile::tempdir().unwrap();
        write_data(&dir.path().join("data"));

        let report = TrainUseCase::new(config(dir.path(), None), table()).execute().unwrap();
        assert_eq!(report.failed(), vec!["G"]);
        assert!(!dir.path().join("model/model-G.mpk").exists());
        let text = fs::read_to_string(dir.path().join("model/report.txt")).unwrap();
        assert!(text.contains("G\tfailed"));
    }

    #[test]
    fn test_misaligned_split_fails_only_that_feature() {
        let dir  = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        write_data(&data);
        fs::write(data.join("validation-G.txt"), "1\n2\n").unwrap();

        let report = TrainUseCase::new(config(dir.path(), Some(1)), table()).execute().unwrap();
        match &report.outcomes[0] {
            FeatureOutcome::Failed { error, .. } => assert!(error.contains("misaligned")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_feature_subset_must_be_regression_targets() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path(), Some(1));

        cfg.features = vec!["SMILES".into()];
        let err = TrainUseCase::new(cfg.clone(), table()).execute().unwrap_err();
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::NotRegressionTarget { .. })));

        cfg.features = vec!["mu".into()];
        let err = TrainUseCase::new(cfg, table()).execute().unwrap_err();
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::UnknownFeature(_))));
    }
}
