use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

lazy_static! {
    static ref DEFAULT: Tokenizer = Tokenizer::new(&TokenizerConfig::default());
}

/// Tokenizer settings. Stored in the index snapshot so queries are split
/// exactly like the documents were.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// Characters kept inside tokens in addition to letters and digits, e.g. `'`.
    #[serde(default)]
    pub extra_chars: String,
}

impl TokenizerConfig {
    pub fn with_extra_chars(extra_chars: impl Into<String>) -> Self {
        Self { extra_chars: extra_chars.into() }
    }
}

/// Script-agnostic surface tokenizer: lowercase, punctuation to spaces, split on whitespace.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    strip: Regex,
}

impl Tokenizer {
    pub fn new(config: &TokenizerConfig) -> Self {
        let mut extra = String::new();
        for c in config.extra_chars.chars().filter(|c| !c.is_whitespace()) {
            extra.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4])));
        }
        let pattern = format!(r"[^\p{{L}}\p{{N}}\s{extra}]");
        // Every char in the class is either a property or escaped.
        let strip = Regex::new(&pattern).expect("valid tokenizer regex");
        Self { strip }
    }

    /// The shared default tokenizer for the default config, a freshly compiled one otherwise.
    pub fn for_config(config: &TokenizerConfig) -> Cow<'static, Tokenizer> {
        if *config == TokenizerConfig::default() {
            Cow::Borrowed(&*DEFAULT)
        } else {
            Cow::Owned(Tokenizer::new(config))
        }
    }

    /// Tokenize text into lowercase terms, left to right.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.strip
            .replace_all(&lowered, " ")
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

/// Tokenize with the default configuration (letters and digits only).
pub fn tokenize(text: &str) -> Vec<String> {
    DEFAULT.tokenize(text)
}
