// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the four subcommands and their flags. Defaults mirror
// the constants of the training pipeline, so `train` with no
// flags reproduces the reference run.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::{
    generate_use_case::GeneratorConfig,
    predict_use_case::PredictConfig,
    train_use_case::RegressionConfig,
};
use crate::ml::trainer::{FitOptions, GeneratorFitOptions};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dump every field of every split to data/<split>-<field>.txt
    Export(ExportArgs),

    /// Train one SMILES → property regressor per float32 feature
    Train(TrainArgs),

    /// Score a file of SMILES with a trained regressor
    Predict(PredictArgs),

    /// Train the character-level generator and sample one SMILES
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Directory holding <split>.jsonl or <split>.csv files
    #[arg(long)]
    pub source: PathBuf,

    /// Where the per-field text files are written
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    #[arg(long, default_value = "model")]
    pub model_dir: PathBuf,

    /// Train only this feature (repeatable). Default: every float32 feature
    #[arg(long = "feature")]
    pub features: Vec<String>,

    /// JSON object of feature name → type, replacing the built-in QM9 table
    #[arg(long)]
    pub feature_table: Option<PathBuf>,

    /// Field holding the SMILES strings
    #[arg(long, default_value = "SMILES")]
    pub smiles_field: String,

    #[arg(long, default_value_t = 1000)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 10_000)]
    pub max_epochs: usize,

    /// Epochs without validation improvement before stopping
    #[arg(long, default_value_t = 0)]
    pub patience: usize,

    #[arg(long, default_value_t = 0.0)]
    pub min_delta: f64,

    #[arg(long, default_value_t = 1e-3)]
    pub learning_rate: f64,

    #[arg(long, default_value_t = 1.0)]
    pub huber_delta: f64,

    #[arg(long, default_value_t = 0.7)]
    pub dropout: f64,

    /// Embedding width = vocabulary size / this
    #[arg(long, default_value_t = 10)]
    pub embedding_divisor: usize,

    /// Recurrent width = vocabulary size / this
    #[arg(long, default_value_t = 100)]
    pub recurrent_divisor: usize,

    /// Clamp both layer widths to at least this value instead of
    /// refusing small vocabularies
    #[arg(long)]
    pub min_layer_width: Option<usize>,

    /// Keep the weights of the epoch with the lowest validation loss
    #[arg(long)]
    pub restore_best_weights: bool,

    /// Seed for the per-epoch shuffle
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for RegressionConfig {
    fn from(a: TrainArgs) -> Self {
        RegressionConfig {
            data_dir:          a.data_dir,
            model_dir:         a.model_dir,
            smiles_field:      a.smiles_field,
            features:          a.features,
            embedding_divisor: a.embedding_divisor,
            recurrent_divisor: a.recurrent_divisor,
            dropout:           a.dropout,
            min_layer_width:   a.min_layer_width,
            fit: FitOptions {
                batch_size:           a.batch_size,
                max_epochs:           a.max_epochs,
                learning_rate:        a.learning_rate,
                huber_delta:          a.huber_delta,
                patience:             a.patience,
                min_delta:            a.min_delta,
                restore_best_weights: a.restore_best_weights,
                seed:                 a.seed,
            },
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Feature whose trained model is used
    #[arg(long)]
    pub feature: String,

    /// One SMILES per line
    #[arg(long)]
    pub input: PathBuf,

    /// One prediction per line, in input order
    #[arg(long)]
    pub output: PathBuf,

    #[arg(long, default_value = "model")]
    pub model_dir: PathBuf,
}

impl From<PredictArgs> for PredictConfig {
    fn from(a: PredictArgs) -> Self {
        PredictConfig {
            model_dir: a.model_dir,
            feature:   a.feature,
            input:     a.input,
            output:    a.output,
        }
    }
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    #[arg(long, default_value = "model")]
    pub model_dir: PathBuf,

    #[arg(long, default_value = "SMILES")]
    pub smiles_field: String,

    /// Text the generated molecule starts with
    #[arg(long, default_value = "C")]
    pub seed_text: String,

    /// Maximum number of symbols appended to the seed.
    /// Default: length of the longest training SMILES
    #[arg(long)]
    pub max_length: Option<usize>,

    #[arg(long, default_value_t = 1)]
    pub epochs: usize,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub learning_rate: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<GenerateArgs> for GeneratorConfig {
    fn from(a: GenerateArgs) -> Self {
        GeneratorConfig {
            data_dir:     a.data_dir,
            model_dir:    a.model_dir,
            smiles_field: a.smiles_field,
            seed_text:    a.seed_text,
            max_length:   a.max_length,
            fit: GeneratorFitOptions {
                batch_size:    a.batch_size,
                epochs:        a.epochs,
                learning_rate: a.learning_rate,
                seed:          a.seed,
            },
            ..GeneratorConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults_match_pipeline_constants() {
        let cli = Cli::try_parse_from(["smiles-regress", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("not train") };
        let cfg: RegressionConfig = args.into();

        let defaults = RegressionConfig::default();
        assert_eq!(cfg.fit, defaults.fit);
        assert_eq!(cfg.dropout, 0.7);
        assert_eq!((cfg.embedding_divisor, cfg.recurrent_divisor), (10, 100));
        assert_eq!(cfg.min_layer_width, None);
        assert!(cfg.features.is_empty());
    }

    #[test]
    fn test_repeated_feature_flags_form_a_subset() {
        let cli = Cli::try_parse_from([
            "smiles-regress", "train", "--feature", "G", "--feature", "mu", "--min-layer-width", "2",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("not train") };
        assert_eq!(args.features, vec!["G", "mu"]);
        assert_eq!(args.min_layer_width, Some(2));
    }

    #[test]
    fn test_export_requires_source() {
        assert!(Cli::try_parse_from(["smiles-regress", "export"]).is_err());
    }
}
