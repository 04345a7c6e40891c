//! Query normalization on top of tantivy's analyzer pipeline.
//!
//! Raw forms come from `SimpleTokenizer` → `LowerCaser` → `StopWordFilter`;
//! stemmed forms from a single-token snowball (English) stemmer. Words mixing
//! letters and digits split into their alphabetic runs; runs shorter than
//! `min_token_len` are dropped.

use std::collections::BTreeSet;
use std::sync::Arc;

use tantivy::tokenizer::{Language, LowerCaser, RawTokenizer, SimpleTokenizer, Stemmer, StopWordFilter, TextAnalyzer, TokenStream};

use qgate_core::config::NormalizerConfig;
use qgate_core::types::Token;

use crate::stopwords::StopwordBundle;

#[derive(Clone)]
pub struct Normalizer {
    words: TextAnalyzer,
    stemmer: TextAnalyzer,
    stopwords: Arc<BTreeSet<String>>,
    min_token_len: usize,
    max_tokens: usize,
}

impl Normalizer {
    pub fn new(stopwords: &StopwordBundle, config: &NormalizerConfig) -> Self {
        let stopwords = Arc::new(stopwords.effective());
        let words = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .filter(StopWordFilter::remove(stopwords.iter().cloned()))
            .build();
        let stemmer = TextAnalyzer::builder(RawTokenizer::default())
            .filter(Stemmer::new(Language::English))
            .build();
        Self { words, stemmer, stopwords, min_token_len: config.min_token_len, max_tokens: config.max_tokens }
    }

    /// Built-in English stopwords with default limits.
    pub fn english() -> Self {
        Self::new(&StopwordBundle::english_fallback(), &NormalizerConfig::default())
    }

    /// Tokens of a query, in order, capped at `max_tokens`. Degenerate input
    /// yields an empty vector.
    pub fn normalize(&self, text: &str) -> Vec<Token> {
        self.collect(text, self.max_tokens)
    }

    /// Every token of a document, without the query cap. Used when building
    /// vocabularies.
    pub fn normalize_all(&self, text: &str) -> Vec<Token> {
        self.collect(text, usize::MAX)
    }

    fn collect(&self, text: &str, limit: usize) -> Vec<Token> {
        let mut words = self.words.clone();
        let mut stemmer = self.stemmer.clone();
        let mut tokens = Vec::new();
        let mut stream = words.token_stream(text);
        while tokens.len() < limit && stream.advance() {
            let word = &stream.token().text;
            if word.chars().all(char::is_alphabetic) {
                if self.long_enough(word) {
                    tokens.push(Token::new(word.clone(), stem(&mut stemmer, word)));
                }
                continue;
            }
            // "soil2" -> "soil"; pieces get the stopword check the whole word already had
            for piece in word.split(|c: char| !c.is_alphabetic()) {
                if tokens.len() >= limit {
                    break;
                }
                if self.long_enough(piece) && !self.stopwords.contains(piece) {
                    tokens.push(Token::new(piece, stem(&mut stemmer, piece)));
                }
            }
        }
        tokens
    }

    fn long_enough(&self, word: &str) -> bool {
        !word.is_empty() && word.chars().count() >= self.min_token_len
    }
}

fn stem(stemmer: &mut TextAnalyzer, word: &str) -> String {
    let mut stream = stemmer.token_stream(word);
    if stream.advance() { stream.token().text.clone() } else { word.to_string() }
}
