// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
//   tokenizer_store.rs  character vocabulary, saved per feature
//   artifacts.rs        every file under model/, by feature
//   metrics.rs          regression metrics, history, CSV log
//   plots.rs            PNG training curves

/// Character vocabulary building, saving, and loading
pub mod tokenizer_store;

/// Output directory layout and writers
pub mod artifacts;

/// Huber / MAE / MAPE / MSE / MSLE and per-epoch history
pub mod metrics;

/// Training-curve figures
pub mod plots;
