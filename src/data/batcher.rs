// ============================================================
// Layer 4 — Batchers
// ============================================================
// Stack individual samples into tensors for one forward pass.
// Sequences are pre-padded to a common length, so batching is a
// flatten + reshape:
//
//   [s1_t1, ..., s1_tS, s2_t1, ..., sN_tS] → [N, S]

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::{NextSymbolSample, SmilesSample};

/// Token id rows → `[rows, seq_len]` Int tensor.
pub fn ids_tensor<B: Backend>(rows: &[&[u32]], device: &B::Device) -> Tensor<B, 2, Int> {
    let batch_size = rows.len();
    let seq_len    = rows.first().map(|r| r.len()).unwrap_or(0);

    let flat: Vec<i32> = rows
        .iter()
        .flat_map(|r| r.iter().map(|&x| x as i32))
        .collect();

    Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device).reshape([batch_size, seq_len])
}

// ─── Regression ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SmilesBatch<B: Backend> {
    /// [batch_size, seq_len]
    pub token_ids: Tensor<B, 2, Int>,
    /// [batch_size, 1]
    pub targets:   Tensor<B, 2>,
}

#[derive(Clone, Debug)]
pub struct SmilesBatcher<B: Backend> {
    _phantom: core::marker::PhantomData<B>,
}

impl<B: Backend> SmilesBatcher<B> {
    pub fn new() -> Self {
        Self { _phantom: core::marker::PhantomData }
    }
}

impl<B: Backend> Default for SmilesBatcher<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> Batcher<B, SmilesSample, SmilesBatch<B>> for SmilesBatcher<B> {
    fn batch(&self, items: Vec<SmilesSample>, device: &B::Device) -> SmilesBatch<B> {
        let batch_size = items.len();
        assert!(batch_size > 0, "Cannot create a batch from an empty Vec");

        let rows: Vec<&[u32]> = items.iter().map(|s| s.token_ids.as_slice()).collect();
        let token_ids = ids_tensor::<B>(&rows, device);

        let targets: Vec<f32> = items.iter().map(|s| s.target).collect();
        let targets = Tensor::<B, 1>::from_floats(targets.as_slice(), device)
            .reshape([batch_size, 1]);

        SmilesBatch { token_ids, targets }
    }
}

// ─── Next-symbol generation ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct NextSymbolBatch<B: Backend> {
    /// [batch_size, context_len]
    pub context: Tensor<B, 2, Int>,
    /// [batch_size]
    pub next:    Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct NextSymbolBatcher<B: Backend> {
    _phantom: core::marker::PhantomData<B>,
}

impl<B: Backend> NextSymbolBatcher<B> {
    pub fn new() -> Self {
        Self { _phantom: core::marker::PhantomData }
    }
}

impl<B: Backend> Default for NextSymbolBatcher<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> Batcher<B, NextSymbolSample, NextSymbolBatch<B>> for NextSymbolBatcher<B> {
    fn batch(&self, items: Vec<NextSymbolSample>, device: &B::Device) -> NextSymbolBatch<B> {
        assert!(!items.is_empty(), "Cannot create a batch from an empty Vec");

        let rows: Vec<&[u32]> = items.iter().map(|s| s.context.as_slice()).collect();
        let context = ids_tensor::<B>(&rows, device);

        let next: Vec<i32> = items.iter().map(|s| s.next as i32).collect();
        let next = Tensor::<B, 1, Int>::from_ints(next.as_slice(), device);

        NextSymbolBatch { context, next }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::backend::{default_device, InnerBackend};

    #[test]
    fn test_smiles_batch_shapes() {
        let device  = default_device();
        let batcher = SmilesBatcher::<InnerBackend>::new();
        let items = vec![
            SmilesSample { token_ids: vec![0, 0, 3], target: 1.0 },
            SmilesSample { token_ids: vec![0, 3, 3], target: 2.0 },
        ];
        let batch = batcher.batch(items, &device);
        assert_eq!(batch.token_ids.dims(), [2, 3]);
        assert_eq!(batch.targets.dims(), [2, 1]);

        let targets = batch.targets.into_data().to_vec::<f32>().unwrap();
        assert_eq!(targets, vec![1.0, 2.0]);
    }

    #[test]
    fn test_next_symbol_batch_shapes() {
        let device  = default_device();
        let batcher = NextSymbolBatcher::<InnerBackend>::new();
        let items = vec![
            NextSymbolSample { context: vec![0, 3], next: 3 },
            NextSymbolSample { context: vec![3, 3], next: 2 },
        ];
        let batch = batcher.batch(items, &device);
        assert_eq!(batch.context.dims(), [2, 2]);
        assert_eq!(batch.next.dims(), [2]);
    }
}
