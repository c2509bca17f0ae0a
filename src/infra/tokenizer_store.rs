// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Character-level vocabulary for SMILES strings, persisted in the
// HuggingFace tokenizer JSON format so a saved model can be paired
// with exactly the vocabulary it was trained on.
//
// The vocabulary is built from the TRAIN split only. Ids:
//   0  [PAD]
//   1  [UNK]   any character never seen in training
//   2  [EOS]   only when an end-of-molecule symbol is requested
//   …  characters by descending frequency, ties by first appearance
//
// Case is kept: in SMILES `c` (aromatic) and `C` are different atoms.

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use tokenizers::Tokenizer;

use crate::data::dataset::left_pad;

pub const PAD_ID: u32 = 0;
pub const UNK_ID: u32 = 1;
pub const EOS_ID: u32 = 2;

const PAD: &str = "[PAD]";
const UNK: &str = "[UNK]";
const EOS: &str = "[EOS]";

/// A character vocabulary backed by a `tokenizers::Tokenizer`.
pub struct CharTokenizer {
    inner:   Tokenizer,
    has_eos: bool,
}

impl CharTokenizer {
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(false)
    }

    pub fn eos_id(&self) -> Option<u32> {
        self.has_eos.then_some(EOS_ID)
    }

    /// One id per character, unknown characters → `[UNK]`.
    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let enc = self
            .inner
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;
        Ok(enc.get_ids().to_vec())
    }

    /// Exactly `seq_len` ids: the last `seq_len` characters,
    /// left-padded with `[PAD]`.
    pub fn encode_padded(&self, text: &str, seq_len: usize) -> Result<Vec<u32>> {
        Ok(left_pad(&self.encode(text)?, seq_len))
    }

    pub fn encode_all(&self, texts: &[String], seq_len: usize) -> Result<Vec<Vec<u32>>> {
        texts.iter().map(|t| self.encode_padded(t, seq_len)).collect()
    }

    pub fn id_to_token(&self, id: u32) -> Option<String> {
        self.inner.id_to_token(id)
    }
}

/// Characters of `texts` by descending count, ties by first appearance.
pub fn char_frequencies(texts: &[String]) -> Vec<(char, usize)> {
    let mut freq: HashMap<char, (usize, usize)> = HashMap::new();
    let mut seen = 0usize;
    for text in texts {
        for c in text.chars() {
            let entry = freq.entry(c).or_insert_with(|| {
                seen += 1;
                (0, seen)
            });
            entry.0 += 1;
        }
    }

    let mut chars: Vec<(char, (usize, usize))> = freq.into_iter().collect();
    chars.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    chars.into_iter().map(|(c, (n, _))| (c, n)).collect()
}

/// Longest text measured in characters, at least 1.
pub fn longest(texts: &[String]) -> usize {
    texts.iter().map(|t| t.chars().count()).max().unwrap_or(0).max(1)
}

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("tokenizer-{name}.json"))
    }

    /// Build a vocabulary from `texts`, write it as
    /// `tokenizer-<name>.json`, and load it back. Any previous file
    /// with that name is replaced.
    pub fn build_and_save(&self, name: &str, texts: &[String], with_eos: bool) -> Result<CharTokenizer> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let mut vocab = serde_json::Map::new();
        let mut added = vec![special_token(PAD_ID, PAD), special_token(UNK_ID, UNK)];
        vocab.insert(PAD.to_string(), serde_json::json!(PAD_ID));
        vocab.insert(UNK.to_string(), serde_json::json!(UNK_ID));
        if with_eos {
            vocab.insert(EOS.to_string(), serde_json::json!(EOS_ID));
            added.push(special_token(EOS_ID, EOS));
        }

        let mut next_id = vocab.len() as u32;
        for (c, _) in char_frequencies(texts) {
            vocab.insert(c.to_string(), serde_json::json!(next_id));
            next_id += 1;
        }

        // Each character is its own pre-token; WordLevel then maps
        // single characters to ids.
        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added,
            "normalizer": null,
            "pre_tokenizer": {
                "type": "Split",
                "pattern": { "Regex": "." },
                "behavior": "Isolated",
                "invert": false
            },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": UNK
            }
        });

        let path = self.path(name);
        std::fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write tokenizer '{}'", path.display()))?;

        tracing::debug!("Tokenizer with {} symbols saved to '{}'", next_id, path.display());
        self.load(name)
    }

    pub fn load(&self, name: &str) -> Result<CharTokenizer> {
        let path  = self.path(name);
        let inner = Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))?;
        let has_eos = inner.token_to_id(EOS) == Some(EOS_ID);
        Ok(CharTokenizer { inner, has_eos })
    }
}

fn special_token(id: u32, content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "content": content,
        "single_word": false,
        "lstrip": false,
        "rstrip": false,
        "normalized": false,
        "special": true
    })
}
