// ============================================================
// Layer 5 — Training Loops
// ============================================================
// Manual epoch loops over Burn data loaders:
//
//   regression   Huber loss, Adam, early stopping on validation loss
//   generation   cross-entropy over the next symbol, Adam
//
// Training runs on the autodiff backend; validation runs on
// model.valid() (inner backend, dropout disabled).

use anyhow::Result;
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    module::AutodiffModule,
    nn::loss::{HuberLossConfig, Reduction},
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::{NextSymbolBatcher, SmilesBatcher},
    dataset::{NextSymbolDataset, SmilesDataset},
};
use crate::infra::metrics::{EpochMetrics, MetricHistory};
use crate::ml::inferencer::tensor_values;
use crate::ml::model::{SmilesGenerator, SmilesRegressor};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    pub batch_size:           usize,
    pub max_epochs:           usize,
    pub learning_rate:        f64,
    pub huber_delta:          f64,
    /// Epochs without improvement tolerated before stopping.
    pub patience:             usize,
    /// Minimum decrease of validation loss that counts as improvement.
    pub min_delta:            f64,
    pub restore_best_weights: bool,
    /// Seed of the training loader's per-epoch shuffle.
    pub seed:                 u64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            batch_size:           1000,
            max_epochs:           10_000,
            learning_rate:        1e-3,
            huber_delta:          1.0,
            patience:             0,
            min_delta:            0.0,
            restore_best_weights: false,
            seed:                 42,
        }
    }
}

pub struct FitOutcome<B: AutodiffBackend> {
    pub model:      SmilesRegressor<B>,
    pub history:    MetricHistory,
    /// 1-based epoch with the lowest validation loss, or 0 when no
    /// epoch ever improved (a NaN validation loss from the start).
    pub best_epoch: usize,
    pub stopped_early: bool,
}

/// Early stopping state update.
/// Returns (should_stop, new_epochs_without_improvement, new_best_loss).
/// A NaN validation loss never counts as an improvement.
pub fn update_early_stopping_state(
    best_valid_loss:            f64,
    current_valid_loss:         f64,
    epochs_without_improvement: usize,
    patience:                   usize,
    min_delta:                  f64,
) -> (bool, usize, f64) {
    if current_valid_loss < best_valid_loss - min_delta {
        (false, 0, current_valid_loss)
    } else {
        let count = epochs_without_improvement + 1;
        (count > patience, count, best_valid_loss)
    }
}

/// Train `model` until `max_epochs` or until validation loss stops
/// improving for more than `patience` epochs.
pub fn fit_regressor<B: AutodiffBackend>(
    mut model: SmilesRegressor<B>,
    train:     SmilesDataset,
    valid:     SmilesDataset,
    opts:      &FitOptions,
    device:    &B::Device,
) -> Result<FitOutcome<B>> {
    anyhow::ensure!(opts.batch_size > 0, "batch size must be positive");
    anyhow::ensure!(!train.is_empty() && !valid.is_empty(), "training and validation sets must be non-empty");
    let (train_len, valid_len) = (train.len(), valid.len());

    let mut optim = AdamConfig::new().init();
    let huber     = HuberLossConfig::new(opts.huber_delta as f32).init();

    // ── Training data loader (AutodiffBackend, reshuffled every epoch) ────────
    let train_loader = DataLoaderBuilder::new(SmilesBatcher::<B>::new())
        .batch_size(opts.batch_size)
        .shuffle(opts.seed)
        .num_workers(1)
        .set_device(device.clone())
        .build(train);

    // ── Validation data loader (InnerBackend, fixed order) ────────────────────
    let valid_loader = DataLoaderBuilder::new(SmilesBatcher::<B::InnerBackend>::new())
        .batch_size(opts.batch_size)
        .num_workers(1)
        .set_device(device.clone())
        .build(valid);

    let mut history    = MetricHistory::default();
    let mut best_loss  = f64::INFINITY;
    let mut best_epoch = 0usize;
    let mut best_model = None;
    let mut waiting    = 0usize;
    let mut stopped_early = false;

    for epoch in 1..=opts.max_epochs {
        // ── Training phase ────────────────────────────────────────────────────
        let mut epoch_preds   = Vec::with_capacity(train_len);
        let mut epoch_targets = Vec::with_capacity(train_len);

        for batch in train_loader.iter() {
            epoch_targets.extend(tensor_values(batch.targets.clone())?);

            let output = model.forward(batch.token_ids);
            let loss   = huber.forward(output.clone(), batch.targets, Reduction::Mean);
            epoch_preds.extend(tensor_values(output.detach())?);

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(opts.learning_rate, model, grads);
        }
        let train_metrics = EpochMetrics::compute(&epoch_preds, &epoch_targets, opts.huber_delta);

        // ── Validation phase ──────────────────────────────────────────────────
        // model.valid() drops autodiff and disables dropout
        let model_valid = model.valid();
        let mut valid_preds   = Vec::with_capacity(valid_len);
        let mut valid_targets = Vec::with_capacity(valid_len);

        for batch in valid_loader.iter() {
            valid_targets.extend(tensor_values(batch.targets)?);
            valid_preds.extend(tensor_values(model_valid.forward(batch.token_ids))?);
        }
        let valid_metrics = EpochMetrics::compute(&valid_preds, &valid_targets, opts.huber_delta);
        history.push(train_metrics, valid_metrics);

        let (should_stop, new_waiting, new_best) = update_early_stopping_state(
            best_loss,
            valid_metrics.loss,
            waiting,
            opts.patience,
            opts.min_delta,
        );
        if new_waiting == 0 {
            best_epoch = epoch;
            if opts.restore_best_weights {
                best_model = Some(model.clone());
            }
        }
        waiting   = new_waiting;
        best_loss = new_best;

        tracing::info!(
            epoch,
            max_epochs = opts.max_epochs,
            train_loss = train_metrics.loss,
            valid_loss = valid_metrics.loss,
            best_valid_loss = best_loss,
            "Epoch completed",
        );

        if should_stop {
            tracing::info!(epoch, best_epoch, "Early stopping triggered");
            stopped_early = true;
            break;
        }
    }

    if let Some(best) = best_model {
        tracing::info!(best_epoch, "Restoring weights of the best epoch");
        model = best;
    }

    Ok(FitOutcome { model, history, best_epoch, stopped_early })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorFitOptions {
    pub batch_size:    usize,
    pub epochs:        usize,
    pub learning_rate: f64,
    pub seed:          u64,
}

impl Default for GeneratorFitOptions {
    fn default() -> Self {
        Self { batch_size: 64, epochs: 1, learning_rate: 1e-3, seed: 42 }
    }
}

/// Train the next-symbol model; returns it with the per-epoch
/// (mean loss, accuracy) pairs.
pub fn fit_generator<B: AutodiffBackend>(
    mut model: SmilesGenerator<B>,
    dataset:   NextSymbolDataset,
    opts:      &GeneratorFitOptions,
    device:    &B::Device,
) -> Result<(SmilesGenerator<B>, Vec<(f64, f64)>)> {
    anyhow::ensure!(opts.batch_size > 0, "batch size must be positive");
    anyhow::ensure!(!dataset.is_empty(), "no training sequences");

    let mut optim = AdamConfig::new().init();
    let loader    = DataLoaderBuilder::new(NextSymbolBatcher::<B>::new())
        .batch_size(opts.batch_size)
        .shuffle(opts.seed)
        .num_workers(1)
        .set_device(device.clone())
        .build(dataset);
    let mut curve = Vec::with_capacity(opts.epochs);

    for epoch in 1..=opts.epochs {
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        let mut correct  = 0usize;
        let mut seen     = 0usize;

        for batch in loader.iter() {
            seen += batch.next.dims()[0];
            let (loss, logits) = model.forward_loss(batch.context, batch.next.clone());
            loss_sum += loss.clone().into_scalar().elem::<f64>();
            batches  += 1;

            let predicted = logits.argmax(1).flatten::<1>(0, 1);
            correct += predicted
                .equal(batch.next)
                .int()
                .sum()
                .into_scalar()
                .elem::<i64>() as usize;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(opts.learning_rate, model, grads);
        }

        let mean_loss = loss_sum / batches.max(1) as f64;
        let accuracy  = correct as f64 / seen.max(1) as f64;
        tracing::info!(epoch, epochs = opts.epochs, loss = mean_loss, accuracy, "Generator epoch completed");
        curve.push((mean_loss, accuracy));
    }

    Ok((model, curve))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::backend::{default_device, TrainBackend};
    use crate::infra::metrics::huber;
    use crate::ml::inferencer::predict_rows;
    use crate::ml::model::{SmilesGeneratorConfig, SmilesRegressorConfig};

    #[test]
    fn test_improvement_resets_counter() {
        assert_eq!(update_early_stopping_state(1.0, 0.5, 3, 0, 0.0), (false, 0, 0.5));
    }

    #[test]
    fn test_zero_patience_stops_on_first_plateau() {
        assert_eq!(update_early_stopping_state(0.5, 0.5, 0, 0, 0.0), (true, 1, 0.5));
        assert_eq!(update_early_stopping_state(0.5, 0.7, 0, 2, 0.0), (false, 1, 0.5));
        assert_eq!(update_early_stopping_state(0.5, 0.7, 2, 2, 0.0), (true, 3, 0.5));
    }

    #[test]
    fn test_min_delta_and_nan_do_not_count_as_improvement() {
        assert!(update_early_stopping_state(1.0, 0.95, 0, 0, 0.1).0);
        assert!(update_early_stopping_state(1.0, f64::NAN, 0, 0, 0.0).0);
    }

    fn tiny_rows() -> Vec<Vec<u32>> {
        vec![vec![0, 0, 2], vec![0, 2, 2], vec![2, 2, 2]]
    }

    fn tiny_dataset() -> SmilesDataset {
        SmilesDataset::from_parts(tiny_rows(), &[1.0, 2.0, 3.0])
    }

    #[test]
    fn test_history_length_matches_epochs_run() {
        let device = default_device();
        let model: SmilesRegressor<TrainBackend> =
            SmilesRegressorConfig::new(3, 2, 2).init(&device);
        let opts = FitOptions { max_epochs: 4, patience: 10, ..FitOptions::default() };

        let outcome = fit_regressor(model, tiny_dataset(), tiny_dataset(), &opts, &device).unwrap();
        assert_eq!(outcome.history.epochs_run(), 4);
        assert_eq!(outcome.history.train.len(), 4);
        assert!(!outcome.stopped_early);
        assert!(outcome.best_epoch >= 1 && outcome.best_epoch <= 4);
    }

    #[test]
    fn test_early_stopping_truncates_history() {
        let device = default_device();
        let model: SmilesRegressor<TrainBackend> =
            SmilesRegressorConfig::new(3, 2, 2).init(&device);
        // a learning rate of zero can never improve on the first epoch
        let opts = FitOptions { max_epochs: 50, learning_rate: 0.0, ..FitOptions::default() };

        let outcome = fit_regressor(model, tiny_dataset(), tiny_dataset(), &opts, &device).unwrap();
        assert!(outcome.stopped_early);
        assert_eq!(outcome.history.epochs_run(), 2);
        assert_eq!(outcome.best_epoch, 1);
    }

    fn valid_loss(model: &SmilesRegressor<TrainBackend>) -> f64 {
        let preds = predict_rows(&model.valid(), &tiny_rows(), 1000, &default_device()).unwrap();
        huber(&preds, &[1.0, 2.0, 3.0], 1.0)
    }

    #[test]
    fn test_restored_model_is_the_best_epoch_snapshot() {
        let device = default_device();
        let model: SmilesRegressor<TrainBackend> =
            SmilesRegressorConfig::new(3, 2, 2).init(&device);
        // a large step overshoots, so the last epoch is rarely the best
        let opts = FitOptions {
            max_epochs: 8,
            patience: 100,
            learning_rate: 0.5,
            restore_best_weights: true,
            ..FitOptions::default()
        };

        let outcome = fit_regressor(model, tiny_dataset(), tiny_dataset(), &opts, &device).unwrap();
        let losses: Vec<f64> = outcome.history.valid.iter().map(|m| m.loss).collect();
        let best = losses.iter().copied().fold(f64::INFINITY, f64::min);
        assert_eq!(losses[outcome.best_epoch - 1], best);
        assert!((valid_loss(&outcome.model) - best).abs() < 1e-5);
    }

    #[test]
    fn test_final_weights_are_kept_by_default() {
        let device = default_device();
        let model: SmilesRegressor<TrainBackend> =
            SmilesRegressorConfig::new(3, 2, 2).init(&device);
        let opts = FitOptions { max_epochs: 5, patience: 100, learning_rate: 0.5, ..FitOptions::default() };

        let outcome = fit_regressor(model, tiny_dataset(), tiny_dataset(), &opts, &device).unwrap();
        let last = outcome.history.valid.last().unwrap().loss;
        assert!((valid_loss(&outcome.model) - last).abs() < 1e-5);
    }

    #[test]
    fn test_nan_validation_loss_leaves_no_best_epoch() {
        let device = default_device();
        let model: SmilesRegressor<TrainBackend> =
            SmilesRegressorConfig::new(3, 2, 2).init(&device);
        let valid = SmilesDataset::from_parts(vec![vec![0, 0, 2]], &[f32::NAN]);

        let outcome =
            fit_regressor(model, tiny_dataset(), valid, &FitOptions::default(), &device).unwrap();
        assert!(outcome.stopped_early);
        assert_eq!(outcome.history.epochs_run(), 1);
        assert_eq!(outcome.best_epoch, 0);
    }

    #[test]
    fn test_generator_trains_one_epoch() {
        let device  = default_device();
        let model: SmilesGenerator<TrainBackend> =
            SmilesGeneratorConfig::new(4).with_embedding_dim(3).with_hidden_size(2).init(&device);
        let dataset = NextSymbolDataset::from_sequences(&[vec![3, 3, 2], vec![3, 2]], 2);
        let opts    = GeneratorFitOptions { batch_size: 2, ..GeneratorFitOptions::default() };

        let (_, curve) = fit_generator(model, dataset, &opts, &device).unwrap();
        assert_eq!(curve.len(), 1);
        assert!(curve[0].0.is_finite());
        assert!((0.0..=1.0).contains(&curve[0].1));
    }
}
