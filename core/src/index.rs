use crate::tokenizer::{Tokenizer, TokenizerConfig};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

/// Snapshot layout version written by [`build`].
pub const INDEX_VERSION: u32 = 1;

pub const SEED_ID: &str = "seed";
pub const SEED_LABEL: &str = "Ukoresheje amagambo asobanutse mu Kinyarwanda";
pub const SEED_TEXT: &str = "Ibi ni ibirimo bituma dushyiraho KB itangirika.";

/// Token -> raw occurrence count within one document.
pub type TermFreqs = BTreeMap<String, u32>;

/// A raw document handed to the indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDoc {
    pub id: String,
    /// Provenance label, e.g. derived from the file name.
    pub label: String,
    pub body: String,
}

impl SourceDoc {
    pub fn new(id: impl Into<String>, label: impl Into<String>, body: impl Into<String>) -> Self {
        Self { id: id.into(), label: label.into(), body: body.into() }
    }

    fn seed() -> Self {
        Self::new(SEED_ID, SEED_LABEL, SEED_TEXT)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub label: String,
    pub text: String,
    pub tf: TermFreqs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub version: u32,
    /// RFC 3339, UTC.
    pub built_at: String,
    pub num_docs: u32,
    #[serde(default)]
    pub tokenizer: TokenizerConfig,
    pub documents: Vec<Document>,
    /// Token -> number of documents containing it.
    pub df: BTreeMap<String, u32>,
}

impl Index {
    /// Document frequency, zero for tokens never seen in the corpus.
    pub fn df(&self, token: &str) -> u32 {
        self.df.get(token).copied().unwrap_or(0)
    }

    /// Smoothed idf: `ln((1 + N) / (1 + df)) + 1`. Always positive and finite.
    pub fn idf(&self, token: &str) -> f64 {
        idf(self.num_docs, self.df(token))
    }

    pub fn tokenizer(&self) -> Cow<'static, Tokenizer> {
        Tokenizer::for_config(&self.tokenizer)
    }

    /// Check the structural invariants. Returns a description of the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if self.documents.is_empty() {
            return Err("index has no documents".into());
        }
        if self.num_docs as usize != self.documents.len() {
            return Err(format!(
                "num_docs is {} but {} documents are stored",
                self.num_docs,
                self.documents.len()
            ));
        }
        let mut ids: HashSet<&str> = HashSet::new();
        for doc in &self.documents {
            if !ids.insert(doc.id.as_str()) {
                return Err(format!("duplicate document id {:?}", doc.id));
            }
            if let Some((term, _)) = doc.tf.iter().find(|&(_, &count)| count == 0) {
                return Err(format!("document {:?} has a zero count for {:?}", doc.id, term));
            }
        }
        let expected = document_frequencies(&self.documents);
        if expected != self.df {
            return Err("document frequency table does not match term frequencies".into());
        }
        Ok(())
    }
}

pub(crate) fn idf(num_docs: u32, df: u32) -> f64 {
    ((1.0 + num_docs as f64) / (1.0 + df as f64)).ln() + 1.0
}

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub tokenizer: TokenizerConfig,
    /// Tokenize the provenance label together with the body.
    pub label_in_terms: bool,
}

/// Build a fresh index. An empty collection is replaced by a single seed document.
pub fn build<I>(sources: I, options: &BuildOptions) -> Index
where
    I: IntoIterator<Item = SourceDoc>,
{
    let tokenizer = Tokenizer::for_config(&options.tokenizer);
    let mut seen: HashSet<String> = HashSet::new();
    let mut documents: Vec<Document> = Vec::new();

    for src in sources {
        if !seen.insert(src.id.clone()) {
            tracing::warn!(id = %src.id, "duplicate document id, skipping");
            continue;
        }
        let tf = if options.label_in_terms {
            term_frequencies(&tokenizer, &format!("{} {}", src.label, src.body))
        } else {
            term_frequencies(&tokenizer, &src.body)
        };
        documents.push(Document { id: src.id, label: src.label, text: src.body, tf });
    }

    if documents.is_empty() {
        tracing::info!("no source documents, using seed document");
        let seed = SourceDoc::seed();
        let tf = term_frequencies(&tokenizer, &format!("{} {}", seed.label, seed.body));
        documents.push(Document { id: seed.id, label: seed.label, text: seed.body, tf });
    }

    let df = document_frequencies(&documents);
    let num_docs = documents.len() as u32;
    tracing::debug!(num_docs, num_terms = df.len(), "index built");

    Index {
        version: INDEX_VERSION,
        built_at: now_rfc3339(),
        num_docs,
        tokenizer: options.tokenizer.clone(),
        documents,
        df,
    }
}

pub fn term_frequencies(tokenizer: &Tokenizer, text: &str) -> TermFreqs {
    let mut tf = TermFreqs::new();
    for token in tokenizer.tokenize(text) {
        *tf.entry(token).or_insert(0) += 1;
    }
    tf
}

fn document_frequencies(documents: &[Document]) -> BTreeMap<String, u32> {
    let mut df: BTreeMap<String, u32> = BTreeMap::new();
    for doc in documents {
        for (term, &count) in &doc.tf {
            if count > 0 {
                *df.entry(term.clone()).or_insert(0) += 1;
            }
        }
    }
    df
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
