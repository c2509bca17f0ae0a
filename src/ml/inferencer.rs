// ============================================================
// Layer 5 — Inference
// ============================================================
use anyhow::{Context, Result};
use burn::prelude::*;

use crate::data::batcher::ids_tensor;
use crate::infra::artifacts::ArtifactStore;
use crate::infra::tokenizer_store::CharTokenizer;
use crate::ml::backend::{default_device, Device, InnerBackend};
use crate::ml::model::{SmilesGenerator, SmilesRegressor};

/// Copy a tensor's values to the host as f32.
pub fn tensor_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("Cannot read tensor data: {e:?}"))
}

/// One prediction per row of `rows`, in row order.
pub fn predict_rows<B: Backend>(
    model:      &SmilesRegressor<B>,
    rows:       &[Vec<u32>],
    batch_size: usize,
    device:     &B::Device,
) -> Result<Vec<f32>> {
    let mut out = Vec::with_capacity(rows.len());
    for chunk in rows.chunks(batch_size.max(1)) {
        let refs: Vec<&[u32]> = chunk.iter().map(Vec::as_slice).collect();
        let output = model.forward(ids_tensor::<B>(&refs, device));
        out.extend(tensor_values(output)?);
    }
    Ok(out)
}

/// Greedy decoding: append the most likely next symbol until the
/// end-of-molecule id or `max_length` new symbols.
pub fn generate<B: Backend>(
    model:       &SmilesGenerator<B>,
    tokenizer:   &CharTokenizer,
    seed:        &str,
    context_len: usize,
    max_length:  usize,
    device:      &B::Device,
) -> Result<String> {
    let eos = tokenizer.eos_id().context("generator vocabulary has no end-of-molecule symbol")?;
    let mut text = seed.to_string();

    for _ in 0..max_length {
        let ids    = tokenizer.encode_padded(&text, context_len)?;
        let logits = model.forward(ids_tensor::<B>(&[ids.as_slice()], device));
        let next   = logits.argmax(1).into_scalar().elem::<i64>() as u32;
        if next == eos {
            break;
        }
        match tokenizer.id_to_token(next) {
            Some(symbol) if next > eos => text.push_str(&symbol),
            // padding / unknown carry no character
            _ => break,
        }
    }

    tracing::debug!("Generated '{}' from seed '{}'", text, seed);
    Ok(text)
}

/// A trained regressor reloaded from its artifacts.
pub struct Predictor {
    model:      SmilesRegressor<InnerBackend>,
    tokenizer:  CharTokenizer,
    seq_len:    usize,
    batch_size: usize,
    device:     Device,
}

impl Predictor {
    pub fn from_artifacts(store: &ArtifactStore, feature: &str) -> Result<Self> {
        let device = default_device();
        let cfg    = store.load_config(feature)?;
        let model  = cfg.model_config().init::<InnerBackend>(&device);
        let model  = store.load_model(feature, model, &device)?;
        let tokenizer = store.tokenizers().load(feature)?;
        tracing::info!("Model for '{}' loaded ({} epochs trained)", feature, cfg.epochs_run);

        Ok(Self {
            model,
            tokenizer,
            seq_len:    cfg.seq_len,
            batch_size: cfg.training.batch_size,
            device,
        })
    }

    pub fn predict_strings(&self, smiles: &[String]) -> Result<Vec<f32>> {
        let rows = self.tokenizer.encode_all(smiles, self.seq_len)?;
        predict_rows(&self.model, &rows, self.batch_size, &self.device)
    }
}
