use crate::types::{Namespace, Token};

/// Read-only view over the controlled vocabulary.
pub trait VocabularyOracle: Send + Sync {
    fn contains(&self, term: &str, namespace: Namespace) -> bool;
    /// Documents containing the raw form `term`.
    fn doc_frequency(&self, term: &str) -> u64;
    /// Documents containing any word that stems to `stem`.
    fn stem_frequency(&self, stem: &str) -> u64;
    fn total_docs(&self) -> u64;

    /// A token is known when either of its forms is a member of its namespace.
    fn is_known(&self, token: &Token) -> bool {
        self.contains(&token.raw, Namespace::Raw) || self.contains(&token.stemmed, Namespace::Stemmed)
    }

    /// Rarity basis for a token: the larger of its raw and stemmed document
    /// frequencies. Zero means no recorded occurrence at all.
    fn token_frequency(&self, token: &Token) -> u64 {
        self.doc_frequency(&token.raw).max(self.stem_frequency(&token.stemmed))
    }
}

/// Probability that a raw query is in-domain. Implementations must be
/// deterministic and return a value in `[0, 1]`.
pub trait IntentEstimator: Send + Sync {
    fn predict(&self, query: &str) -> f64;
}

/// Decides whether a token that missed the vocabulary is close enough to a
/// vocabulary entry to earn fuzzy credit.
pub trait NearMissScorer: Send + Sync {
    fn is_near_miss(&self, token: &Token) -> bool;
}
