// ============================================================
// Layer 6 — Regression Metrics
// ============================================================
// Per-epoch loss and error metrics for the training and
// validation splits, plus a CSV log of the whole history.
//
// Formulas (y = target, p = prediction, n = samples):
//   loss  Huber, δ:  ½(y-p)² if |y-p| ≤ δ, else δ(|y-p| - ½δ)
//   mae   Σ|y-p| / n
//   mape  100 · Σ(|y-p| / max(|y|, ε)) / n
//   mse   Σ(y-p)² / n
//   msle  Σ(ln(1+max(p,ε)) - ln(1+max(y,ε)))² / n
// with ε = 1e-7.
//
// Output file: model/history-<feature>.csv
//   epoch,loss,mae,mape,mse,msle,val_loss,val_mae,val_mape,val_mse,val_msle

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

const EPSILON: f64 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    Loss,
    Mae,
    Mape,
    Mse,
    Msle,
}

impl Metric {
    pub const ALL: [Metric; 5] = [Metric::Loss, Metric::Mae, Metric::Mape, Metric::Mse, Metric::Msle];

    /// Short name used in file names and CSV headers.
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Loss => "loss",
            Metric::Mae  => "mae",
            Metric::Mape => "mape",
            Metric::Mse  => "mse",
            Metric::Msle => "msle",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Metric::Loss => "Huber loss",
            Metric::Mae  => "Mean absolute error",
            Metric::Mape => "Mean absolute percentage error",
            Metric::Mse  => "Mean squared error",
            Metric::Msle => "Mean squared logarithmic error",
        }
    }
}

fn mean_of<F: Fn(f64, f64) -> f64>(predictions: &[f32], targets: &[f32], f: F) -> f64 {
    let n = predictions.len().min(targets.len());
    if n == 0 {
        return f64::NAN;
    }
    let sum: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(&p, &y)| f(p as f64, y as f64))
        .sum();
    sum / n as f64
}

pub fn huber(predictions: &[f32], targets: &[f32], delta: f64) -> f64 {
    mean_of(predictions, targets, |p, y| {
        let err = (y - p).abs();
        if err <= delta {
            0.5 * err * err
        } else {
            delta * (err - 0.5 * delta)
        }
    })
}

pub fn mae(predictions: &[f32], targets: &[f32]) -> f64 {
    mean_of(predictions, targets, |p, y| (y - p).abs())
}

pub fn mape(predictions: &[f32], targets: &[f32]) -> f64 {
    100.0 * mean_of(predictions, targets, |p, y| (y - p).abs() / y.abs().max(EPSILON))
}

pub fn mse(predictions: &[f32], targets: &[f32]) -> f64 {
    mean_of(predictions, targets, |p, y| (y - p).powi(2))
}

pub fn msle(predictions: &[f32], targets: &[f32]) -> f64 {
    mean_of(predictions, targets, |p, y| {
        ((p.max(EPSILON) + 1.0).ln() - (y.max(EPSILON) + 1.0).ln()).powi(2)
    })
}

/// All five metrics for one split after one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub loss: f64,
    pub mae:  f64,
    pub mape: f64,
    pub mse:  f64,
    pub msle: f64,
}

impl EpochMetrics {
    pub fn compute(predictions: &[f32], targets: &[f32], huber_delta: f64) -> Self {
        Self {
            loss: huber(predictions, targets, huber_delta),
            mae:  mae(predictions, targets),
            mape: mape(predictions, targets),
            mse:  mse(predictions, targets),
            msle: msle(predictions, targets),
        }
    }

    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Loss => self.loss,
            Metric::Mae  => self.mae,
            Metric::Mape => self.mape,
            Metric::Mse  => self.mse,
            Metric::Msle => self.msle,
        }
    }
}

/// Training and validation metrics, one entry per completed epoch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricHistory {
    pub train: Vec<EpochMetrics>,
    pub valid: Vec<EpochMetrics>,
}

impl MetricHistory {
    pub fn push(&mut self, train: EpochMetrics, valid: EpochMetrics) {
        self.train.push(train);
        self.valid.push(valid);
    }

    /// Epochs actually run, read from the validation-loss history so
    /// an early stop shows up here.
    pub fn epochs_run(&self) -> usize {
        self.valid.len()
    }

    pub fn series(&self, metric: Metric) -> (Vec<f64>, Vec<f64>) {
        (
            self.train.iter().map(|m| m.get(metric)).collect(),
            self.valid.iter().map(|m| m.get(metric)).collect(),
        )
    }
}

/// Writes a metric history as CSV.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    pub fn new(csv_path: impl AsRef<Path>) -> Self {
        Self { csv_path: csv_path.as_ref().to_path_buf() }
    }

    /// Replace the CSV with the full history of this run.
    pub fn write(&self, history: &MetricHistory) -> Result<()> {
        if let Some(parent) = self.csv_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.csv_path)
            .with_context(|| format!("Cannot create '{}'", self.csv_path.display()))?;
        let mut f = BufWriter::new(file);

        let names: Vec<&str> = Metric::ALL.iter().map(|m| m.name()).collect();
        let valid: Vec<String> = names.iter().map(|n| format!("val_{n}")).collect();
        writeln!(f, "epoch,{},{}", names.join(","), valid.join(","))?;

        for (i, (t, v)) in history.train.iter().zip(&history.valid).enumerate() {
            writeln!(
                f,
                "{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
                i + 1,
                t.loss, t.mae, t.mape, t.mse, t.msle,
                v.loss, v.mae, v.mape, v.mse, v.msle,
            )?;
        }
        f.flush()?;

        tracing::debug!("Wrote {} epochs to '{}'", history.epochs_run(), self.csv_path.display());
        Ok(())
    }
}
