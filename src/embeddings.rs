//! Embedding backend for the semantic index.
//!
//! Primary backend is fastembed's all-MiniLM-L6-v2 (384 dims). When the ONNX
//! model cannot be initialized (offline machines, test runs), a deterministic
//! hashed-bag-of-words embedding with the same dimension keeps the index
//! functional. The active model tag is stored with every vector so a mixed
//! index can be detected and reindexed.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use parking_lot::Mutex;

const DIMENSION: usize = 384;

pub const MODEL_TAG: &str = "all-MiniLM-L6-v2";
pub const FALLBACK_TAG: &str = "hashed-v1";

enum Backend {
    Model(Mutex<TextEmbedding>),
    Hashed,
}

pub struct Embedder {
    backend: Backend,
}

impl Embedder {
    /// Initialize the fastembed model, falling back to hashed embeddings when
    /// the model can't be loaded.
    pub fn initialize() -> Self {
        match TextEmbedding::try_new(InitOptions::new(EmbeddingModel::AllMiniLML6V2)) {
            Ok(model) => {
                log::info!("Embedding model ready: {}", MODEL_TAG);
                Self {
                    backend: Backend::Model(Mutex::new(model)),
                }
            }
            Err(e) => {
                log::warn!(
                    "Embedding model unavailable ({}); using deterministic hashed embeddings",
                    e
                );
                Self {
                    backend: Backend::Hashed,
                }
            }
        }
    }

    /// Deterministic hashed backend only. Used in tests and offline setups.
    pub fn hashed() -> Self {
        Self {
            backend: Backend::Hashed,
        }
    }

    pub fn model_tag(&self) -> &'static str {
        match self.backend {
            Backend::Model(_) => MODEL_TAG,
            Backend::Hashed => FALLBACK_TAG,
        }
    }

    pub fn dimension(&self) -> usize {
        DIMENSION
    }

    pub fn embed(&self, text: &str) -> Result<Vec<f32>, String> {
        let mut vectors = self.embed_batch(std::slice::from_ref(&text.to_string()))?;
        vectors
            .pop()
            .ok_or_else(|| "embedding backend returned no vector".to_string())
    }

    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, String> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        match &self.backend {
            Backend::Model(model) => {
                let mut guard = model.lock();
                guard
                    .embed(texts.to_vec(), None)
                    .map_err(|e| format!("Embedding failed: {}", e))
            }
            Backend::Hashed => Ok(texts.iter().map(|t| hash_embed(t, DIMENSION)).collect()),
        }
    }
}

fn hash_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut vec = vec![0.0_f32; dimension];
    let mut seen = 0usize;

    for token in text.split_whitespace() {
        let token = token.trim().to_lowercase();
        if token.is_empty() {
            continue;
        }
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let hash = hasher.finish();
        let idx = (hash as usize) % dimension;
        let sign = if (hash & 1) == 0 { 1.0 } else { -1.0 };
        vec[idx] += sign;
        seen += 1;
    }

    if seen == 0 {
        return vec;
    }

    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vec {
            *value /= norm;
        }
    }

    vec
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;

    for (va, vb) in a.iter().zip(b.iter()) {
        dot += va * vb;
        norm_a += va * va;
        norm_b += vb * vb;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

pub fn f32_vec_to_blob(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 4);
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

pub fn blob_to_f32_vec(blob: &[u8]) -> Result<Vec<f32>, String> {
    if blob.len() % 4 != 0 {
        return Err("invalid embedding blob length".to_string());
    }

    let mut values = Vec::with_capacity(blob.len() / 4);
    for chunk in blob.chunks_exact(4) {
        values.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_blob_roundtrip() {
        let original = vec![0.1_f32, -0.5_f32, 1.25_f32, 0.0_f32];
        let blob = f32_vec_to_blob(&original);
        let restored = blob_to_f32_vec(&blob).expect("valid blob");
        assert_eq!(original.len(), restored.len());
        for (a, b) in original.iter().zip(restored.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_blob_length_validation() {
        assert!(blob_to_f32_vec(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_cosine_similarity_ranking() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.9, 0.1, 0.0];
        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b) > cosine_similarity(&a, &c));
    }

    #[test]
    fn test_hashed_embed_is_deterministic() {
        let embedder = Embedder::hashed();
        let a = embedder.embed("invoice from acme packaging").expect("embed");
        let b = embedder.embed("invoice from acme packaging").expect("embed");
        assert_eq!(a, b);
        assert_eq!(a.len(), DIMENSION);
    }

    #[test]
    fn test_hashed_embed_ranks_own_text_highest() {
        let embedder = Embedder::hashed();
        let doc = "quarterly production schedule for label rolls";
        let other = "unrelated text about gardening tools";
        let query = embedder.embed(doc).expect("embed");
        let own = embedder.embed(doc).expect("embed");
        let far = embedder.embed(other).expect("embed");
        assert!(cosine_similarity(&query, &own) > cosine_similarity(&query, &far));
    }
}
