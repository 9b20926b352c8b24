use crate::index::{idf, Index, TermFreqs};
use crate::tokenizer::Tokenizer;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_TOP_K: usize = 6;

/// Token -> tf-idf weight.
pub type WeightedVector = HashMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub score: f64,
    pub document_id: String,
    pub label: String,
    pub text: String,
}

/// Weight raw counts with the smoothed idf of the given corpus.
pub fn weigh(tf: &TermFreqs, index: &Index) -> WeightedVector {
    tf.iter()
        .map(|(term, &count)| (term.clone(), count as f64 * idf(index.num_docs, index.df(term))))
        .collect()
}

fn norm(v: &WeightedVector) -> f64 {
    v.values().map(|w| w * w).sum::<f64>().sqrt()
}

fn dot(a: &WeightedVector, b: &WeightedVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(term, w)| large.get(term).map(|x| w * x))
        .sum()
}

/// Cosine similarity; 0 when either vector has zero norm.
pub fn cosine(a: &WeightedVector, b: &WeightedVector) -> f64 {
    cosine_with_norms(a, norm(a), b, norm(b))
}

fn cosine_with_norms(a: &WeightedVector, norm_a: f64, b: &WeightedVector, norm_b: f64) -> f64 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    // Rounding can push a self-match a hair above 1.
    (dot(a, b) / (norm_a * norm_b)).clamp(0.0, 1.0)
}

fn query_vector(tokenizer: &Tokenizer, query: &str, index: &Index) -> WeightedVector {
    let mut tf = TermFreqs::new();
    for token in tokenizer.tokenize(query) {
        *tf.entry(token).or_insert(0) += 1;
    }
    weigh(&tf, index)
}

/// Stable sort by score, drop non-positive scores, keep at most `top_k`.
fn rank(index: &Index, scores: Vec<f64>, top_k: usize) -> Vec<Hit> {
    let mut scored: Vec<(usize, f64)> = scores.into_iter().enumerate().collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
        .into_iter()
        .filter(|(_, score)| *score > 0.0)
        .take(top_k.max(1))
        .map(|(i, score)| {
            let doc = &index.documents[i];
            Hit {
                score,
                document_id: doc.id.clone(),
                label: doc.label.clone(),
                text: doc.text.clone(),
            }
        })
        .collect()
}

/// Score every document against `query` and return the best `top_k` with a positive score.
///
/// Document vectors are derived from the stored counts on every call. Use
/// [`QueryEngine`] to serve many queries against one index.
pub fn retrieve(query: &str, index: &Index, top_k: usize) -> Vec<Hit> {
    let q = query_vector(&index.tokenizer(), query, index);
    let q_norm = norm(&q);
    let scores = index
        .documents
        .iter()
        .map(|doc| {
            let d = weigh(&doc.tf, index);
            cosine_with_norms(&q, q_norm, &d, norm(&d))
        })
        .collect();
    rank(index, scores, top_k)
}

/// Read-only query engine over one loaded index, with document vectors computed once.
pub struct QueryEngine {
    index: Arc<Index>,
    tokenizer: Cow<'static, Tokenizer>,
    vectors: Vec<(WeightedVector, f64)>,
}

impl QueryEngine {
    pub fn new(index: Arc<Index>) -> Self {
        let tokenizer = index.tokenizer();
        let vectors = index
            .documents
            .iter()
            .map(|doc| {
                let v = weigh(&doc.tf, &index);
                let n = norm(&v);
                (v, n)
            })
            .collect();
        Self { index, tokenizer, vectors }
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn retrieve(&self, query: &str, top_k: usize) -> Vec<Hit> {
        let q = query_vector(&self.tokenizer, query, &self.index);
        let q_norm = norm(&q);
        let scores = self
            .vectors
            .iter()
            .map(|(d, d_norm)| cosine_with_norms(&q, q_norm, d, *d_norm))
            .collect();
        rank(&self.index, scores, top_k)
    }
}
