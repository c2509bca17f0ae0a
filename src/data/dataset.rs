use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One encoded molecule and its regression target.
/// `token_ids` is already left-padded to the model's sequence length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmilesSample {
    pub token_ids: Vec<u32>,
    pub target:    f32,
}

pub struct SmilesDataset {
    samples: Vec<SmilesSample>,
}

impl SmilesDataset {
    /// Pair encoded sequences with targets line by line.
    pub fn from_parts(token_ids: Vec<Vec<u32>>, targets: &[f32]) -> Self {
        let samples = token_ids
            .into_iter()
            .zip(targets.iter().copied())
            .map(|(token_ids, target)| SmilesSample { token_ids, target })
            .collect();
        Self { samples }
    }
}

impl Dataset<SmilesSample> for SmilesDataset {
    fn get(&self, index: usize) -> Option<SmilesSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// A SMILES prefix and the id of the symbol that follows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextSymbolSample {
    pub context: Vec<u32>,
    pub next:    u32,
}

pub struct NextSymbolDataset {
    samples: Vec<NextSymbolSample>,
}

impl NextSymbolDataset {
    /// Every prefix of every sequence, left-padded with 0 to
    /// `context_len`. Each sequence should already end with the
    /// end-of-molecule id so the model learns where to stop.
    pub fn from_sequences(sequences: &[Vec<u32>], context_len: usize) -> Self {
        let mut samples = Vec::new();
        for seq in sequences {
            for i in 1..seq.len() {
                samples.push(NextSymbolSample {
                    context: left_pad(&seq[..i], context_len),
                    next:    seq[i],
                });
            }
        }
        Self { samples }
    }
}

impl Dataset<NextSymbolSample> for NextSymbolDataset {
    fn get(&self, index: usize) -> Option<NextSymbolSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Keep the last `len` ids, padding on the left with 0.
pub fn left_pad(ids: &[u32], len: usize) -> Vec<u32> {
    let keep = &ids[ids.len().saturating_sub(len)..];
    let mut out = vec![0u32; len - keep.len()];
    out.extend_from_slice(keep);
    out
}
