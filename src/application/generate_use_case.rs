// ============================================================
// Layer 2 — GenerateUseCase
// ============================================================
// Character-level SMILES generation:
//
//   Step 1: Load training SMILES                  (Layer 4 - data)
//   Step 2: Vocabulary with an end-of-molecule id (Layer 6 - infra)
//   Step 3: Every prefix → next symbol samples    (Layer 4 - data)
//   Step 4: Train the next-symbol model           (Layer 5 - ml)
//   Step 5: Greedy decoding from the seed         (Layer 5 - ml)
//   Step 6: Write model/output.txt                (Layer 6 - infra)

use anyhow::{Context, Result};
use burn::{data::dataset::Dataset, module::AutodiffModule};
use std::{fs, path::PathBuf};

use crate::data::{dataset::NextSymbolDataset, text_files::read_lines};
use crate::domain::split::Split;
use crate::infra::{artifacts::ArtifactStore, tokenizer_store::longest};
use crate::ml::{
    backend::{default_device, TrainBackend},
    inferencer::generate,
    model::SmilesGeneratorConfig,
    trainer::{fit_generator, GeneratorFitOptions},
};

const TOKENIZER_NAME: &str = "generator";

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub data_dir:      PathBuf,
    pub model_dir:     PathBuf,
    pub smiles_field:  String,
    pub seed_text:     String,
    /// New symbols to emit at most; `None` means the longest
    /// training SMILES.
    pub max_length:    Option<usize>,
    pub embedding_dim: usize,
    pub hidden_size:   usize,
    pub fit:           GeneratorFitOptions,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            data_dir:      PathBuf::from("data"),
            model_dir:     PathBuf::from("model"),
            smiles_field:  "SMILES".to_string(),
            seed_text:     "C".to_string(),
            max_length:    None,
            embedding_dim: 50,
            hidden_size:   10,
            fit:           GeneratorFitOptions::default(),
        }
    }
}

pub struct GenerateUseCase {
    config: GeneratorConfig,
}

impl GenerateUseCase {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<String> {
        let cfg    = &self.config;
        let store  = ArtifactStore::new(&cfg.model_dir)?;
        let device = default_device();

        // ── Step 1: Training SMILES ──────────────────────────────────────────
        let smiles_path = cfg.data_dir.join(Split::Train.file_name(&cfg.smiles_field));
        let smiles = read_lines(&smiles_path)?;
        anyhow::ensure!(!smiles.is_empty(), "no training SMILES in '{}'", smiles_path.display());

        // ── Step 2: Vocabulary ───────────────────────────────────────────────
        let tokenizer = store.tokenizers().build_and_save(TOKENIZER_NAME, &smiles, true)?;
        let eos = tokenizer.eos_id().context("generator vocabulary has no end-of-molecule symbol")?;
        let context_len = longest(&smiles);

        // ── Step 3: Samples ──────────────────────────────────────────────────
        let sequences = smiles
            .iter()
            .map(|s| {
                let mut ids = tokenizer.encode(s)?;
                ids.push(eos);
                Ok(ids)
            })
            .collect::<Result<Vec<_>>>()?;
        let dataset = NextSymbolDataset::from_sequences(&sequences, context_len);
        tracing::info!(
            "{} next-symbol samples, vocabulary of {}, context of {}",
            dataset.len(),
            tokenizer.vocab_size(),
            context_len
        );

        // ── Step 4: Train ────────────────────────────────────────────────────
        let model = SmilesGeneratorConfig::new(tokenizer.vocab_size())
            .with_embedding_dim(cfg.embedding_dim)
            .with_hidden_size(cfg.hidden_size)
            .init::<TrainBackend>(&device);
        let (model, _curve) = fit_generator(model, dataset, &cfg.fit, &device)?;

        // ── Step 5: Decode ───────────────────────────────────────────────────
        let max_length = cfg.max_length.unwrap_or(context_len);
        let text = generate(&model.valid(), &tokenizer, &cfg.seed_text, context_len, max_length, &device)?;

        // ── Step 6: Output ───────────────────────────────────────────────────
        let path = store.dir().join("output.txt");
        fs::write(&path, &text).with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::info!("Generated '{}' → '{}'", text, path.display());
        Ok(text)
    }
}
