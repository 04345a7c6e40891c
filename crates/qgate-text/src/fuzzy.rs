use qgate_core::config::FuzzyConfig;
use qgate_core::traits::NearMissScorer;
use qgate_core::types::Token;

use crate::vocab::Vocabulary;

/// Typo tolerance against the rarest (most discriminative) vocabulary terms.
///
/// A Bloom filter cannot be enumerated, so candidates come from the
/// document-frequency table.
#[derive(Debug, Clone)]
pub struct RareTermMatcher {
    candidates: Vec<String>,
    min_similarity: f64,
    min_token_len: usize,
}

impl RareTermMatcher {
    pub fn new(candidates: Vec<String>, min_similarity: f64, min_token_len: usize) -> Self {
        Self { candidates, min_similarity, min_token_len }
    }

    pub fn from_vocabulary(vocab: &Vocabulary, config: &FuzzyConfig) -> Self {
        let candidates = vocab.rarest_terms(config.candidate_pool).into_iter().map(str::to_string).collect();
        Self::new(candidates, config.min_similarity, config.min_token_len)
    }
}

impl NearMissScorer for RareTermMatcher {
    fn is_near_miss(&self, token: &Token) -> bool {
        if token.raw.chars().count() < self.min_token_len {
            return false;
        }
        self.candidates
            .iter()
            .any(|c| strsim::normalized_levenshtein(&token.raw, c) >= self.min_similarity)
    }
}
