// ============================================================
// Layer 3 — Core Traits
// ============================================================

use anyhow::Result;

use crate::domain::record::Record;

/// Anything that can hand out dataset splits as ordered records.
///
/// Implementations:
///   - JsonLinesSource → `<split>.jsonl` files
///   - CsvSource       → `<split>.csv` files with a header row
pub trait DatasetSource {
    /// Human-readable identifier used in logs.
    fn name(&self) -> &str;

    /// Split names in a stable order.
    fn splits(&self) -> Result<Vec<String>>;

    /// Records of `split` in source order. Each call starts a fresh
    /// pass and yields the same order.
    fn records(&self, split: &str) -> Result<Box<dyn Iterator<Item = Result<Record>> + '_>>;
}
