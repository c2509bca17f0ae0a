use burn::{
    nn::{
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
        Lstm, LstmConfig,
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::domain::error::PipelineError;

// ─── Layer sizing ─────────────────────────────────────────────────────────────

/// Embedding and recurrent widths derived from the vocabulary size:
/// `⌊V / embedding_divisor⌋` and `⌊V / recurrent_divisor⌋`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerWidths {
    pub embedding: usize,
    pub recurrent: usize,
    /// True when `min_width` raised at least one width.
    pub clamped:   bool,
}

impl LayerWidths {
    /// A zero width is refused unless the caller opted into a minimum.
    pub fn from_vocab(
        vocab_size:        usize,
        embedding_divisor: usize,
        recurrent_divisor: usize,
        min_width:         Option<usize>,
    ) -> Result<Self, PipelineError> {
        if embedding_divisor == 0 || recurrent_divisor == 0 {
            return Err(PipelineError::InvalidConfig("layer width divisors must be positive".into()));
        }
        let embedding = vocab_size / embedding_divisor;
        let recurrent = vocab_size / recurrent_divisor;

        match min_width {
            Some(0) => Err(PipelineError::InvalidConfig("--min-layer-width must be at least 1".into())),
            Some(min) => Ok(Self {
                embedding: embedding.max(min),
                recurrent: recurrent.max(min),
                clamped:   embedding < min || recurrent < min,
            }),
            None if embedding == 0 || recurrent == 0 => {
                Err(PipelineError::DegenerateVocabulary { vocab_size, embedding, recurrent })
            }
            None => Ok(Self { embedding, recurrent, clamped: false }),
        }
    }
}

// ─── SMILES → property regressor ──────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct SmilesRegressorConfig {
    pub vocab_size:    usize,
    pub embedding_dim: usize,
    pub hidden_size:   usize,
    #[config(default = 0.7)]
    pub dropout:       f64,
}

impl SmilesRegressorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SmilesRegressor<B> {
        SmilesRegressor {
            embedding: EmbeddingConfig::new(self.vocab_size, self.embedding_dim).init(device),
            lstm:      LstmConfig::new(self.embedding_dim, self.hidden_size, true).init(device),
            dropout:   DropoutConfig::new(self.dropout).init(),
            output:    LinearConfig::new(self.hidden_size, 1).init(device),
        }
    }
}

/// Embedding → LSTM (last step) → Dropout → Linear(1)
#[derive(Module, Debug)]
pub struct SmilesRegressor<B: Backend> {
    pub embedding: Embedding<B>,
    pub lstm:      Lstm<B>,
    pub dropout:   Dropout,
    pub output:    Linear<B>,
}

impl<B: Backend> SmilesRegressor<B> {
    /// token_ids: [batch, seq_len] → [batch, 1]
    pub fn forward(&self, token_ids: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let x = self.embedding.forward(token_ids);
        let (hidden, _state) = self.lstm.forward(x, None);
        let last = last_step(hidden);
        self.output.forward(self.dropout.forward(last))
    }

    /// Layer table in the familiar Keras layout.
    pub fn summary(&self, name: &str, seq_len: usize) -> String {
        let embedding_dim = self.embedding.weight.dims()[1];
        let hidden_size   = self.output.weight.dims()[0];

        let rows = [
            ("embedding (Embedding)", format!("(None, {seq_len}, {embedding_dim})"), self.embedding.num_params()),
            ("lstm (Lstm)",           format!("(None, {hidden_size})"),              self.lstm.num_params()),
            ("dropout (Dropout)",     format!("(None, {hidden_size})"),              <Dropout as Module<B>>::num_params(&self.dropout)),
            ("dense (Linear)",        "(None, 1)".to_string(),                       self.output.num_params()),
        ];
        render_summary(name, &rows, self.num_params())
    }
}

// ─── SMILES generator (next-symbol model) ─────────────────────────────────────

#[derive(Config, Debug)]
pub struct SmilesGeneratorConfig {
    pub vocab_size:    usize,
    #[config(default = 50)]
    pub embedding_dim: usize,
    #[config(default = 10)]
    pub hidden_size:   usize,
}

impl SmilesGeneratorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SmilesGenerator<B> {
        SmilesGenerator {
            embedding: EmbeddingConfig::new(self.vocab_size, self.embedding_dim).init(device),
            lstm_seq:  LstmConfig::new(self.embedding_dim, self.hidden_size, true).init(device),
            lstm_last: LstmConfig::new(self.hidden_size, self.hidden_size, true).init(device),
            output:    LinearConfig::new(self.hidden_size, self.vocab_size).init(device),
        }
    }
}

/// Embedding → LSTM (sequence) → LSTM (last step) → Linear(V)
#[derive(Module, Debug)]
pub struct SmilesGenerator<B: Backend> {
    pub embedding: Embedding<B>,
    pub lstm_seq:  Lstm<B>,
    pub lstm_last: Lstm<B>,
    pub output:    Linear<B>,
}

impl<B: Backend> SmilesGenerator<B> {
    /// context: [batch, context_len] → logits [batch, vocab]
    pub fn forward(&self, context: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let x = self.embedding.forward(context);
        let (x, _) = self.lstm_seq.forward(x, None);
        let (x, _) = self.lstm_last.forward(x, None);
        self.output.forward(last_step(x))
    }

    pub fn forward_loss(&self, context: Tensor<B, 2, Int>, next: Tensor<B, 1, Int>) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(context);
        let ce = CrossEntropyLossConfig::new().init(&logits.device());
        (ce.forward(logits.clone(), next), logits)
    }
}

/// [batch, seq, hidden] → [batch, hidden] at the final time step.
fn last_step<B: Backend>(x: Tensor<B, 3>) -> Tensor<B, 2> {
    let [batch, seq_len, hidden] = x.dims();
    x.slice([0..batch, seq_len - 1..seq_len, 0..hidden])
        .reshape([batch, hidden])
}

fn render_summary(name: &str, rows: &[(&str, String, usize)], total: usize) -> String {
    let rule  = "_".repeat(65);
    let thick = "=".repeat(65);
    let mut out = String::new();
    out.push_str(&format!("Model: \"{name}\"\n{rule}\n"));
    out.push_str(&format!("{:<28}{:<26}{:>11}\n{thick}\n", "Layer (type)", "Output Shape", "Param #"));
    for (i, (layer, shape, params)) in rows.iter().enumerate() {
        out.push_str(&format!("{:<28}{:<26}{:>11}\n", layer, shape, params));
        if i + 1 < rows.len() {
            out.push('\n');
        }
    }
    out.push_str(&format!("{thick}\nTotal params: {total}\nTrainable params: {total}\nNon-trainable params: 0\n{rule}\n"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::backend::{default_device, InnerBackend};

    #[test]
    fn test_widths_floor_divide_vocab() {
        let w = LayerWidths::from_vocab(523, 10, 100, None).unwrap();
        assert_eq!((w.embedding, w.recurrent, w.clamped), (52, 5, false));
    }

    #[test]
    fn test_small_vocab_is_rejected_without_minimum() {
        match LayerWidths::from_vocab(34, 10, 100, None) {
            Err(PipelineError::DegenerateVocabulary { vocab_size, embedding, recurrent }) => {
                assert_eq!((vocab_size, embedding, recurrent), (34, 3, 0));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_minimum_width_clamps_explicitly() {
        let w = LayerWidths::from_vocab(5, 10, 100, Some(4)).unwrap();
        assert_eq!((w.embedding, w.recurrent, w.clamped), (4, 4, true));
        assert!(LayerWidths::from_vocab(5, 10, 100, Some(0)).is_err());
    }

    #[test]
    fn test_regressor_output_shape() {
        let device = default_device();
        let model: SmilesRegressor<InnerBackend> =
            SmilesRegressorConfig::new(12, 4, 3).init(&device);
        let ids = Tensor::<InnerBackend, 1, Int>::from_ints([0, 0, 3, 4, 0, 5, 6, 7], &device)
            .reshape([2, 4]);
        assert_eq!(model.forward(ids).dims(), [2, 1]);
    }

    #[test]
    fn test_summary_lists_layers_and_totals() {
        let device = default_device();
        let model: SmilesRegressor<InnerBackend> =
            SmilesRegressorConfig::new(12, 4, 3).init(&device);
        let summary = model.summary("smiles_regressor_G", 7);

        assert!(summary.contains("embedding (Embedding)"));
        assert!(summary.contains("(None, 7, 4)"));
        assert!(summary.contains("lstm (Lstm)"));
        assert!(summary.contains("dense (Linear)"));
        let dropout_row = summary.lines().find(|l| l.starts_with("dropout (Dropout)")).unwrap();
        assert!(dropout_row.trim_end().ends_with(" 0"));
        // embedding 12·4 and dense 3·1 + 1 are fixed; lstm depends on gate layout
        assert!(summary.contains(&format!("Total params: {}", model.num_params())));
        assert!(model.num_params() > 48 + 4);
    }

    #[test]
    fn test_generator_logits_cover_vocab() {
        let device = default_device();
        let model: SmilesGenerator<InnerBackend> =
            SmilesGeneratorConfig::new(9).with_embedding_dim(6).init(&device);
        let ids = Tensor::<InnerBackend, 1, Int>::from_ints([0, 3, 4, 5, 6, 2], &device)
            .reshape([2, 3]);
        assert_eq!(model.forward(ids).dims(), [2, 9]);
    }
}
