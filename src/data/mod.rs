// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Dataset export side:
//
//   DatasetSource (jsonl / csv)  →  data/<split>-<field>.txt
//
// Training side:
//
//   data/<split>-SMILES.txt ─┐
//                            ├─ Manifest (line counts agree?)
//   data/<split>-<F>.txt ────┘
//       │
//       ▼
//   text_files  → Vec<String>, Vec<f32>
//       │
//       ▼
//   SmilesDataset → SmilesBatcher → [batch, seq_len] tensors

/// JSON Lines and CSV dataset sources
pub mod source;

/// One-value-per-line text files
pub mod text_files;

/// Per-split file pairing and line-count validation
pub mod manifest;

/// Burn Dataset implementations
pub mod dataset;

/// Burn Batcher implementations
pub mod batcher;
