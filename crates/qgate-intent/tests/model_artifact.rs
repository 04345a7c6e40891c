use std::collections::BTreeMap;
use std::fs;

use proptest::prelude::*;
use tempfile::TempDir;

use qgate_core::traits::IntentEstimator;
use qgate_core::Error;
use qgate_intent::{CalibratedMember, Calibration, IntentModel, NgramVectorizer};

fn model() -> IntentModel {
    let grams = ["farm", "crop", "soil", "farm crop", "good", "morning"];
    let vocabulary: BTreeMap<String, usize> = grams.iter().enumerate().map(|(i, g)| (g.to_string(), i)).collect();
    let vectorizer = NgramVectorizer {
        ngram_min: 1,
        ngram_max: 2,
        lowercase: true,
        strip_accents: true,
        sublinear_tf: true,
        l2_normalize: true,
        vocabulary,
        idf: vec![1.2, 1.5, 1.8, 2.5, 1.1, 1.1],
    };
    let members = vec![
        CalibratedMember {
            coef: vec![2.5, 2.0, 1.5, 3.0, -2.0, -2.5],
            intercept: -0.8,
            calibration: Calibration::Sigmoid { a: -3.0, b: 0.2 },
        },
        CalibratedMember {
            coef: vec![2.0, 2.2, 1.0, 2.5, -1.5, -2.0],
            intercept: -0.6,
            calibration: Calibration::Logistic,
        },
    ];
    IntentModel::new(vectorizer, members, "agronomy-intent").unwrap()
}

#[test]
fn save_load_round_trip_predicts_identically() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("artifacts/intent_model.json");
    let original = model();
    original.save(&path).expect("save");

    let loaded = IntentModel::load(&path).expect("load");
    assert_eq!(loaded.meta(), original.meta());
    for q in ["farm crop", "good morning", "", "Soil FARMING crops"] {
        assert_eq!(loaded.predict(q), original.predict(q), "prediction drifted for {q:?}");
    }
}

#[test]
fn domain_queries_outscore_small_talk() {
    let m = model();
    assert!(m.predict("farm crop") > 0.7);
    assert!(m.predict("good morning") < 0.3);
}

#[test]
fn missing_and_tampered_models_fail_closed() {
    let tmp = TempDir::new().unwrap();
    let missing = IntentModel::load(&tmp.path().join("nope.json")).unwrap_err();
    assert!(matches!(missing, Error::ArtifactMissing { .. }));

    let path = tmp.path().join("tampered.json");
    let mut json = serde_json::to_value(model()).unwrap();
    json["members"][0]["intercept"] = serde_json::json!(5.0);
    fs::write(&path, serde_json::to_vec(&json).unwrap()).unwrap();
    let err = IntentModel::load(&path).unwrap_err();
    assert!(matches!(err, Error::ArtifactCorrupt { .. }), "{err}");

    let path = tmp.path().join("truncated.json");
    let mut json = serde_json::to_value(model()).unwrap();
    json["vectorizer"]["idf"] = serde_json::json!([1.0]);
    fs::write(&path, serde_json::to_vec(&json).unwrap()).unwrap();
    assert!(matches!(IntentModel::load(&path), Err(Error::ArtifactCorrupt { .. })));
}

proptest! {
    #[test]
    fn prop_probability_in_unit_interval_and_deterministic(query in "\\PC{0,60}") {
        let m = model();
        let p = m.predict(&query);
        prop_assert!((0.0..=1.0).contains(&p));
        prop_assert_eq!(p, m.predict(&query));
    }
}
