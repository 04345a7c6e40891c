//! An immutable bundle of everything one routing decision needs.

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use qgate_core::config::RouterConfig;
use qgate_core::traits::{IntentEstimator, VocabularyOracle};
use qgate_core::types::{DecisionNotes, DecisionRecord, Namespace};
use qgate_core::Result;
use qgate_intent::{IntentModel, IntentModelMeta};
use qgate_text::{explain, LexicalScorer, Normalizer, RareTermMatcher, StopwordBundle, TokenExplanation, Vocabulary, VocabularyMeta};

use crate::gate::{evaluate, GateInput};

pub struct RouterSnapshot {
    config: RouterConfig,
    normalizer: Normalizer,
    vocabulary: Arc<Vocabulary>,
    scorer: LexicalScorer,
    intent: Arc<dyn IntentEstimator>,
    intent_meta: Option<IntentModelMeta>,
}

/// Provenance of the artifacts behind a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotInfo {
    pub vocabulary: VocabularyMeta,
    pub docs_seen: u64,
    /// Fraction of set bits per namespace.
    pub raw_fill_ratio: f64,
    pub stemmed_fill_ratio: f64,
    pub intent_model: Option<IntentModelMeta>,
    pub fuzzy_enabled: bool,
}

impl RouterSnapshot {
    /// Load every artifact named by `config`, resolving relative paths
    /// against `base_dir`. Any missing or corrupt artifact fails the load.
    pub fn load(config: &RouterConfig, base_dir: &Path) -> Result<Self> {
        config.validate()?;
        let locations = config.artifacts.resolve(base_dir);
        let stopwords = StopwordBundle::load_or_fallback(locations.stopwords.as_deref())?;
        let normalizer = Normalizer::new(&stopwords, &config.normalizer);
        let vocabulary = Vocabulary::load(&locations.vocabulary)?;
        let model = IntentModel::load(&locations.intent_model)?;
        let meta = model.meta().clone();
        let mut snapshot = Self::from_parts(config.clone(), normalizer, vocabulary, Arc::new(model));
        snapshot.intent_meta = Some(meta);
        info!(
            vocabulary = %locations.vocabulary.display(),
            intent_model = %locations.intent_model.display(),
            "router snapshot ready"
        );
        Ok(snapshot)
    }

    /// Assemble a snapshot from in-memory parts.
    pub fn from_parts(
        config: RouterConfig,
        normalizer: Normalizer,
        vocabulary: Vocabulary,
        intent: Arc<dyn IntentEstimator>,
    ) -> Self {
        let mut scorer = LexicalScorer::new(&config.lexical, &config.fuzzy);
        if config.fuzzy.enabled {
            scorer = scorer.with_near_miss(Arc::new(RareTermMatcher::from_vocabulary(&vocabulary, &config.fuzzy)));
        }
        Self { config, normalizer, vocabulary: Arc::new(vocabulary), scorer, intent, intent_meta: None }
    }

    pub fn route(&self, query: &str) -> DecisionRecord {
        let tokens = self.normalizer.normalize(query);
        let token_count = tokens.len();
        let score = self.scorer.score(&tokens, self.vocabulary.as_ref());
        let p_intent = if token_count == 0 { 0.0 } else { probability(self.intent.predict(query)) };

        let input = GateInput { hits: score.hits, coverage: score.coverage, idf: score.idf, p_intent, token_count };
        let verdict = evaluate(&input, &self.config.gate);
        debug!(
            tokens = token_count,
            hits = score.hits,
            genuine_hits = score.genuine_hits,
            coverage = score.coverage,
            idf = score.idf,
            p_intent,
            fuzzy = score.fuzzy_applied,
            path = %verdict.path,
            rejected_by = verdict.rejected_by.unwrap_or("-"),
            "routed query"
        );

        let scored = token_count > 0;
        DecisionRecord {
            path: verdict.path,
            hits: score.hits,
            p_intent,
            tokens: token_count,
            notes: DecisionNotes {
                short: verdict.short,
                coverage: scored.then(|| round3(score.coverage)),
                idf: scored.then(|| round3(score.idf)),
                nonsense: verdict.nonsense.then_some(true),
                fuzzy: score.fuzzy_applied.then_some(true),
                strong_idf: verdict.strong_idf.then_some(true),
                rejected_by: verdict.rejected_by.map(str::to_string),
            },
        }
    }

    /// Per-token vocabulary membership for `query`.
    pub fn explain(&self, query: &str) -> Vec<TokenExplanation> {
        explain(&self.normalizer.normalize(query), self.vocabulary.as_ref())
    }

    pub fn info(&self) -> SnapshotInfo {
        SnapshotInfo {
            vocabulary: self.vocabulary.meta().clone(),
            docs_seen: self.vocabulary.total_docs(),
            raw_fill_ratio: self.vocabulary.bloom(Namespace::Raw).fill_ratio(),
            stemmed_fill_ratio: self.vocabulary.bloom(Namespace::Stemmed).fill_ratio(),
            intent_model: self.intent_meta.clone(),
            fuzzy_enabled: self.config.fuzzy.enabled,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }
}

fn probability(p: f64) -> f64 {
    if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 }
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
