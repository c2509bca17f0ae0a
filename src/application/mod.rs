// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// One use case per subcommand. Each owns its config, calls into
// the data, ml and infra layers, and returns a report for the CLI
// to print.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination

// Dataset fields → data/<split>-<field>.txt
pub mod export_use_case;

// One regressor per float32 feature
pub mod train_use_case;

// Reload a trained regressor and score new SMILES
pub mod predict_use_case;

// Next-symbol SMILES generator
pub mod generate_use_case;
