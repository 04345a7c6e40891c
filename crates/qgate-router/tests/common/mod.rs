#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use qgate_core::config::RouterConfig;
use qgate_core::traits::IntentEstimator;
use qgate_intent::{CalibratedMember, Calibration, IntentModel, NgramVectorizer};
use qgate_router::RouterSnapshot;
use qgate_text::{Normalizer, StopwordBundle, Vocabulary, VocabularyBuilder};

/// 59 agronomy notes plus one document that alone mentions mycorrhiza, so
/// `ln(60 / 1)` clears the strong-IDF threshold.
pub fn corpus() -> Vec<String> {
    let topics = ["irrigation schedule", "soil nutrient", "pest scouting", "harvest timing"];
    let mut docs: Vec<String> = (0..59)
        .map(|i| format!("Farm crop notes on {} for field {}", topics[i % topics.len()], i))
        .collect();
    docs.push("Mycorrhiza fungi colonise roots".to_string());
    docs
}

pub fn vocabulary() -> Vocabulary {
    let mut builder = VocabularyBuilder::new(Normalizer::english(), 200_000, 7);
    for doc in corpus() {
        builder.add_document(&doc);
    }
    builder.build()
}

/// Returns the scripted probability for known queries and `default` otherwise.
pub struct Scripted {
    pub answers: Vec<(&'static str, f64)>,
    pub default: f64,
}

impl IntentEstimator for Scripted {
    fn predict(&self, query: &str) -> f64 {
        self.answers.iter().find(|(q, _)| *q == query).map(|(_, p)| *p).unwrap_or(self.default)
    }
}

pub fn scripted_snapshot(answers: Vec<(&'static str, f64)>, default: f64) -> RouterSnapshot {
    RouterSnapshot::from_parts(
        RouterConfig::default(),
        Normalizer::english(),
        vocabulary(),
        Arc::new(Scripted { answers, default }),
    )
}

pub fn intent_model() -> IntentModel {
    let grams = ["farm", "crop", "soil", "good", "morning"];
    let vocabulary: BTreeMap<String, usize> = grams.iter().enumerate().map(|(i, g)| (g.to_string(), i)).collect();
    let vectorizer = NgramVectorizer {
        ngram_min: 1,
        ngram_max: 1,
        lowercase: true,
        strip_accents: true,
        sublinear_tf: true,
        l2_normalize: true,
        vocabulary,
        idf: vec![1.0; grams.len()],
    };
    let member = CalibratedMember { coef: vec![3.0, 3.0, 2.0, -3.0, -3.0], intercept: 0.0, calibration: Calibration::Logistic };
    IntentModel::new(vectorizer, vec![member], "fixture").unwrap()
}

/// Writes all three artifacts under `dir/artifacts`, matching the default
/// artifact paths.
pub fn write_artifacts(dir: &Path) {
    let artifacts = dir.join("artifacts");
    vocabulary().save(&artifacts.join("vocab.json")).unwrap();
    intent_model().save(&artifacts.join("intent_model.json")).unwrap();
    StopwordBundle::english_fallback().save(&artifacts.join("stopwords.json")).unwrap();
}
