// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model code lives here.
//
//   backend.rs     compile-time backend choice (ndarray / wgpu)
//   model.rs       SMILES regressor and SMILES generator, layer sizing
//   trainer.rs     epoch loops, early stopping
//   inferencer.rs  ordered batch prediction, greedy generation,
//                   reloading a trained regressor

pub mod backend;

pub mod model;

pub mod trainer;

pub mod inferencer;
