//! Stopword bundle produced by the offline stopword job.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

use qgate_core::{Error, Result};

/// Negations carry meaning in queries and are never treated as stopwords.
const KEEP: [&str; 3] = ["no", "not", "nor"];

const ENGLISH_FALLBACK: &[&str] = &[
    "a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
];

/// Per-language stopword sets plus their multilingual union.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopwordBundle {
    #[serde(default)]
    pub languages: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub all_union: Vec<String>,
}

impl StopwordBundle {
    pub fn english_fallback() -> Self {
        let words: Vec<String> = ENGLISH_FALLBACK.iter().map(|w| w.to_string()).collect();
        let mut languages = BTreeMap::new();
        languages.insert("en".to_string(), words.clone());
        Self { languages, all_union: words }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::ArtifactMissing { path: path.to_path_buf() })
            }
            Err(e) => return Err(e.into()),
        };
        let bundle: Self = serde_json::from_slice(&bytes).map_err(|e| Error::corrupt(path, e.to_string()))?;
        info!(path = %path.display(), languages = bundle.languages.len(), union = bundle.all_union.len(), "loaded stopword bundle");
        Ok(bundle)
    }

    /// Load the configured bundle. A missing file (or no path at all) falls
    /// back to the built-in English list; an unreadable file is an error.
    pub fn load_or_fallback(path: Option<&Path>) -> Result<Self> {
        match path {
            None => Ok(Self::english_fallback()),
            Some(p) => match Self::load(p) {
                Err(Error::ArtifactMissing { path }) => {
                    warn!(path = %path.display(), "stopword bundle missing; using built-in English list");
                    Ok(Self::english_fallback())
                }
                other => other,
            },
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec(self)?)?;
        Ok(())
    }

    /// Lower-cased stopwords actually applied by the normalizer. Uses
    /// `all_union` when present, else the union of every language set.
    pub fn effective(&self) -> BTreeSet<String> {
        let source: Box<dyn Iterator<Item = &String>> = if self.all_union.is_empty() {
            Box::new(self.languages.values().flatten())
        } else {
            Box::new(self.all_union.iter())
        };
        source
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty() && !KEEP.contains(&w.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negations_are_kept_out_of_the_effective_set() {
        let set = StopwordBundle::english_fallback().effective();
        assert!(set.contains("the"));
        assert!(!set.contains("not"));
    }

    #[test]
    fn union_of_languages_when_all_union_is_empty() {
        let mut languages = BTreeMap::new();
        languages.insert("de".to_string(), vec!["Und".to_string()]);
        languages.insert("fr".to_string(), vec!["et".to_string(), "nor".to_string()]);
        let bundle = StopwordBundle { languages, all_union: vec![] };
        let set = bundle.effective();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec!["et".to_string(), "und".to_string()]);
    }

    #[test]
    fn missing_bundle_falls_back() {
        let tmp = tempfile::TempDir::new().unwrap();
        let bundle = StopwordBundle::load_or_fallback(Some(&tmp.path().join("nope.json"))).expect("fallback");
        assert_eq!(bundle, StopwordBundle::english_fallback());
    }

    #[test]
    fn corrupt_bundle_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("stopwords.json");
        fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(StopwordBundle::load_or_fallback(Some(&path)), Err(Error::ArtifactCorrupt { .. })));
    }
}
