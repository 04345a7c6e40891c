//! Sparse word n-gram TF-IDF features, matching the vectorizer the classifier
//! was fitted with.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fitted vectorizer state. Column `i` of the feature space is the n-gram
/// mapped to `i` in `vocabulary` and weighted by `idf[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NgramVectorizer {
    pub ngram_min: usize,
    pub ngram_max: usize,
    pub lowercase: bool,
    pub strip_accents: bool,
    pub sublinear_tf: bool,
    pub l2_normalize: bool,
    pub vocabulary: BTreeMap<String, usize>,
    pub idf: Vec<f32>,
}

impl NgramVectorizer {
    pub fn n_features(&self) -> usize {
        self.idf.len()
    }

    /// All n-grams of `text` in document order, out-of-vocabulary ones included.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let text = preprocess(text, self.lowercase, self.strip_accents);
        let words = words(&text);
        let mut grams = Vec::new();
        for n in self.ngram_min..=self.ngram_max {
            if n == 0 || n > words.len() {
                continue;
            }
            grams.extend(words.windows(n).map(|w| w.join(" ")));
        }
        grams
    }

    /// Weighted feature vector as `(column, value)` pairs sorted by column.
    /// Sorting keeps floating-point accumulation order, and therefore the
    /// prediction, identical between runs.
    pub fn transform(&self, text: &str) -> Vec<(usize, f64)> {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for gram in self.analyze(text) {
            if let Some(&col) = self.vocabulary.get(&gram) {
                *counts.entry(col).or_insert(0.0) += 1.0;
            }
        }
        let mut features: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(col, tf)| {
                let tf = if self.sublinear_tf { 1.0 + tf.ln() } else { tf };
                (col, tf * self.idf.get(col).map_or(0.0, |&w| f64::from(w)))
            })
            .collect();
        if self.l2_normalize {
            let norm = features.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                for (_, v) in &mut features {
                    *v /= norm;
                }
            }
        }
        features
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.ngram_min == 0 || self.ngram_min > self.ngram_max {
            return Err(format!("invalid ngram range ({}, {})", self.ngram_min, self.ngram_max));
        }
        let n = self.n_features();
        if let Some((gram, col)) = self.vocabulary.iter().find(|(_, col)| **col >= n) {
            return Err(format!("vocabulary entry '{gram}' maps to column {col}, but only {n} features exist"));
        }
        if self.idf.iter().any(|v| !v.is_finite()) {
            return Err("idf contains non-finite values".to_string());
        }
        Ok(())
    }
}

fn preprocess(text: &str, lowercase: bool, strip_accents: bool) -> String {
    let text = if lowercase { text.to_lowercase() } else { text.to_string() };
    if strip_accents {
        text.nfkd().filter(|c| !is_combining_mark(*c)).collect()
    } else {
        text
    }
}

/// Runs of two or more word characters (alphanumeric or `_`).
fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| w.chars().count() >= 2)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vectorizer() -> NgramVectorizer {
        let vocabulary: BTreeMap<String, usize> =
            [("farm", 0), ("crop", 1), ("farm crop", 2), ("cafe", 3)].into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        NgramVectorizer {
            ngram_min: 1,
            ngram_max: 2,
            lowercase: true,
            strip_accents: true,
            sublinear_tf: true,
            l2_normalize: true,
            vocabulary,
            idf: vec![1.0, 2.0, 3.0, 1.5],
        }
    }

    #[test]
    fn analyzer_matches_training_tokenization() {
        let grams = vectorizer().analyze("Café au-lait, FARM_crop 42 a!");
        assert_eq!(
            grams,
            vec!["cafe", "au", "lait", "farm_crop", "42", "cafe au", "au lait", "lait farm_crop", "farm_crop 42"]
        );
    }

    #[test]
    fn transform_is_sublinear_weighted_and_unit_length() {
        let v = vectorizer();
        let features = v.transform("farm farm crop");
        let farm = (1.0 + 2.0f64.ln()) * 1.0;
        let crop = 2.0;
        let bigram = 3.0;
        let norm = (farm * farm + crop * crop + bigram * bigram).sqrt();
        let expected = [(0, farm / norm), (1, crop / norm), (2, bigram / norm)];
        assert_eq!(features.len(), 3);
        for ((col, val), (ecol, eval)) in features.iter().zip(expected) {
            assert_eq!(*col, ecol);
            assert!((val - eval).abs() < 1e-12, "col {col}: {val} vs {eval}");
        }
    }

    #[test]
    fn out_of_vocabulary_text_has_no_features() {
        assert!(vectorizer().transform("weather in london").is_empty());
        assert!(vectorizer().transform("").is_empty());
    }

    #[test]
    fn validate_catches_bad_columns() {
        let mut v = vectorizer();
        v.vocabulary.insert("tractor".to_string(), 9);
        assert!(v.validate().is_err());
        let mut v = vectorizer();
        v.ngram_min = 3;
        assert!(v.validate().is_err());
    }
}
