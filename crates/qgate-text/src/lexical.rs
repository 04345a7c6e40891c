//! Lexical evidence for a normalized query: hits, coverage, IDF and the gated
//! fuzzy bonus.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use qgate_core::config::{FuzzyConfig, IdfAggregation, LexicalConfig};
use qgate_core::traits::{NearMissScorer, VocabularyOracle};
use qgate_core::types::{LexicalScore, Namespace, Token};

#[derive(Clone)]
pub struct LexicalScorer {
    aggregation: IdfAggregation,
    fuzzy: FuzzyConfig,
    near_miss: Option<Arc<dyn NearMissScorer>>,
}

impl LexicalScorer {
    pub fn new(lexical: &LexicalConfig, fuzzy: &FuzzyConfig) -> Self {
        Self { aggregation: lexical.idf_aggregation, fuzzy: fuzzy.clone(), near_miss: None }
    }

    pub fn with_near_miss(mut self, scorer: Arc<dyn NearMissScorer>) -> Self {
        self.near_miss = Some(scorer);
        self
    }

    pub fn score(&self, tokens: &[Token], vocab: &dyn VocabularyOracle) -> LexicalScore {
        if tokens.is_empty() {
            return LexicalScore::empty();
        }
        let total_docs = vocab.total_docs().max(1) as f64;
        let mut idfs = Vec::new();
        let mut misses = Vec::new();
        for token in tokens {
            if vocab.is_known(token) {
                idfs.push(token_idf(total_docs, vocab.token_frequency(token)));
            } else {
                misses.push(token);
            }
        }

        let n = tokens.len();
        let genuine_hits = idfs.len();
        let idf = aggregate(self.aggregation, &idfs);
        let genuine_coverage = ratio(genuine_hits, n);
        let bonus = self.fuzzy_credit(genuine_hits, n, genuine_coverage, idf, &misses);
        let hits = genuine_hits + bonus;

        LexicalScore { hits, genuine_hits, coverage: ratio(hits, n), idf, fuzzy_applied: bonus > 0 }
    }

    /// Near-miss credit only tops up queries that already stand on genuine
    /// lexical evidence; it can never lift a zero-hit query.
    fn fuzzy_credit(&self, genuine_hits: usize, n: usize, coverage: f64, idf: f64, misses: &[&Token]) -> usize {
        let Some(scorer) = self.near_miss.as_ref() else { return 0 };
        if !self.fuzzy.enabled
            || genuine_hits == 0
            || n < self.fuzzy.min_tokens
            || coverage < self.fuzzy.min_coverage
            || idf < self.fuzzy.min_idf
        {
            return 0;
        }
        misses.iter().filter(|t| scorer.is_near_miss(t)).take(self.fuzzy.max_bonus).count()
    }
}

/// A membership hit with no recorded document frequency (a Bloom false
/// positive) adds no rarity.
fn token_idf(total_docs: f64, df: u64) -> f64 {
    if df == 0 {
        return 0.0;
    }
    (total_docs / df as f64).ln().max(0.0)
}

fn ratio(hits: usize, n: usize) -> f64 {
    (hits as f64 / n.max(1) as f64).clamp(0.0, 1.0)
}

fn aggregate(aggregation: IdfAggregation, idfs: &[f64]) -> f64 {
    if idfs.is_empty() {
        return 0.0;
    }
    match aggregation {
        IdfAggregation::Sum => idfs.iter().sum(),
        IdfAggregation::Mean => idfs.iter().sum::<f64>() / idfs.len() as f64,
        IdfAggregation::Max => idfs.iter().copied().fold(0.0, f64::max),
    }
}

/// Per-token membership breakdown, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenExplanation {
    pub raw: String,
    pub stemmed: String,
    pub raw_hit: bool,
    pub stemmed_hit: bool,
    pub doc_frequency: u64,
}

pub fn explain(tokens: &[Token], vocab: &dyn VocabularyOracle) -> Vec<TokenExplanation> {
    tokens
        .iter()
        .map(|t| TokenExplanation {
            raw: t.raw.clone(),
            stemmed: t.stemmed.clone(),
            raw_hit: vocab.contains(&t.raw, Namespace::Raw),
            stemmed_hit: vocab.contains(&t.stemmed, Namespace::Stemmed),
            doc_frequency: vocab.token_frequency(t),
        })
        .collect()
}
