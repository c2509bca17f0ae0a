// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe the molecular dataset and the
// regression targets. Nothing in here touches Burn, the file
// system layout, or the CLI.
//
//   split.rs          train / test / validation partitions
//   record.rs         one dataset example as ordered named fields
//   feature_table.rs  field name → declared element type
//   traits.rs         DatasetSource, the export collaborator
//   error.rs          failures callers branch on

pub mod split;

pub mod record;

pub mod feature_table;

pub mod traits;

pub mod error;
