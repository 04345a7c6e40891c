//! Vocabulary artifact: raw + stemmed Bloom namespaces, document frequencies
//! and provenance metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

use qgate_core::traits::VocabularyOracle;
use qgate_core::types::Namespace;
use qgate_core::{Error, Result};

use crate::bloom::{BloomFilter, HASH_SCHEME};
use crate::normalize::Normalizer;

pub const FORMAT_VERSION: u32 = 1;

/// Provenance only. Nothing in the decision path reads these fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyMeta {
    pub built_at: DateTime<Utc>,
    pub corpus_fingerprint: String,
    pub m_bits: u64,
    pub hashes: u32,
    pub hash_scheme: String,
    pub raw_terms: usize,
    pub stemmed_terms: usize,
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    format_version: u32,
    meta: VocabularyMeta,
    raw: BloomFilter,
    stemmed: BloomFilter,
    df: BTreeMap<String, u64>,
    stemmed_df: BTreeMap<String, u64>,
    docs_seen: u64,
}

impl Vocabulary {
    /// Read and verify an artifact. Missing files and failed integrity checks
    /// are both fatal for the caller.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::ArtifactMissing { path: path.to_path_buf() })
            }
            Err(e) => return Err(e.into()),
        };
        let vocab: Self = serde_json::from_slice(&bytes).map_err(|e| Error::corrupt(path, e.to_string()))?;
        vocab.verify().map_err(|reason| Error::corrupt(path, reason))?;
        info!(
            path = %path.display(),
            docs_seen = vocab.docs_seen,
            raw_terms = vocab.meta.raw_terms,
            stemmed_terms = vocab.meta.stemmed_terms,
            built_at = %vocab.meta.built_at,
            fingerprint = %vocab.meta.corpus_fingerprint,
            "loaded vocabulary artifact"
        );
        Ok(vocab)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec(self)?)?;
        Ok(())
    }

    pub fn meta(&self) -> &VocabularyMeta {
        &self.meta
    }

    pub fn bloom(&self, namespace: Namespace) -> &BloomFilter {
        match namespace {
            Namespace::Raw => &self.raw,
            Namespace::Stemmed => &self.stemmed,
        }
    }

    /// The `n` terms with the lowest document frequency, ties broken by term.
    pub fn rarest_terms(&self, n: usize) -> Vec<&str> {
        let mut entries: Vec<(&String, &u64)> = self.df.iter().collect();
        entries.sort_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)));
        entries.into_iter().take(n).map(|(term, _)| term.as_str()).collect()
    }

    fn verify(&self) -> std::result::Result<(), String> {
        if self.format_version != FORMAT_VERSION {
            return Err(format!("unsupported format_version {}", self.format_version));
        }
        if self.meta.hash_scheme != HASH_SCHEME {
            return Err(format!("hash scheme '{}' is not '{}'; rebuild the artifact", self.meta.hash_scheme, HASH_SCHEME));
        }
        self.raw.validate()?;
        self.stemmed.validate()?;
        for (name, bloom) in [("raw", &self.raw), ("stemmed", &self.stemmed)] {
            if bloom.m_bits() != self.meta.m_bits || bloom.hashes() != self.meta.hashes {
                return Err(format!("{name} namespace parameters disagree with metadata"));
            }
        }
        if self.docs_seen == 0 {
            return Err("docs_seen is 0".to_string());
        }
        let actual = checksum(&self.raw, &self.stemmed, &self.df, &self.stemmed_df, self.docs_seen);
        if actual != self.meta.checksum {
            return Err(format!("checksum mismatch: stored {}, computed {}", self.meta.checksum, actual));
        }
        Ok(())
    }
}

impl VocabularyOracle for Vocabulary {
    fn contains(&self, term: &str, namespace: Namespace) -> bool {
        self.bloom(namespace).contains(term)
    }

    fn doc_frequency(&self, term: &str) -> u64 {
        self.df.get(term).copied().unwrap_or(0)
    }

    fn stem_frequency(&self, stem: &str) -> u64 {
        self.stemmed_df.get(stem).copied().unwrap_or(0)
    }

    fn total_docs(&self) -> u64 {
        self.docs_seen
    }
}

fn checksum(
    raw: &BloomFilter,
    stemmed: &BloomFilter,
    df: &BTreeMap<String, u64>,
    stemmed_df: &BTreeMap<String, u64>,
    docs_seen: u64,
) -> String {
    let mut hasher = blake3::Hasher::new();
    for word in raw.words().iter().chain(stemmed.words()) {
        hasher.update(&word.to_le_bytes());
    }
    hasher.update(&docs_seen.to_le_bytes());
    for table in [df, stemmed_df] {
        for (term, count) in table {
            hasher.update(term.as_bytes());
            hasher.update(&[0]);
            hasher.update(&count.to_le_bytes());
        }
        hasher.update(&[0xff]);
    }
    hasher.finalize().to_hex().to_string()
}

/// Builds a vocabulary artifact from document texts using the same
/// normalizer the router applies to queries.
pub struct VocabularyBuilder {
    normalizer: Normalizer,
    raw: BloomFilter,
    stemmed: BloomFilter,
    raw_terms: BTreeSet<String>,
    stemmed_terms: BTreeSet<String>,
    df: BTreeMap<String, u64>,
    stemmed_df: BTreeMap<String, u64>,
    docs_seen: u64,
    fingerprint: blake3::Hasher,
}

impl VocabularyBuilder {
    pub fn new(normalizer: Normalizer, m_bits: u64, hashes: u32) -> Self {
        Self {
            normalizer,
            raw: BloomFilter::new(m_bits, hashes),
            stemmed: BloomFilter::new(m_bits, hashes),
            raw_terms: BTreeSet::new(),
            stemmed_terms: BTreeSet::new(),
            df: BTreeMap::new(),
            stemmed_df: BTreeMap::new(),
            docs_seen: 0,
            fingerprint: blake3::Hasher::new(),
        }
    }

    /// Index one document. Each raw term and each stem counts once per
    /// document towards its document frequency.
    pub fn add_document(&mut self, text: &str) -> &mut Self {
        self.docs_seen += 1;
        self.fingerprint.update(text.as_bytes());
        self.fingerprint.update(&[0]);
        let mut seen = BTreeSet::new();
        let mut seen_stems = BTreeSet::new();
        for token in self.normalizer.normalize_all(text) {
            if self.raw_terms.insert(token.raw.clone()) {
                self.raw.insert(&token.raw);
            }
            if self.stemmed_terms.insert(token.stemmed.clone()) {
                self.stemmed.insert(&token.stemmed);
            }
            seen.insert(token.raw);
            seen_stems.insert(token.stemmed);
        }
        for term in seen {
            *self.df.entry(term).or_insert(0) += 1;
        }
        for stem in seen_stems {
            *self.stemmed_df.entry(stem).or_insert(0) += 1;
        }
        self
    }

    pub fn build(self) -> Vocabulary {
        let checksum = checksum(&self.raw, &self.stemmed, &self.df, &self.stemmed_df, self.docs_seen);
        let meta = VocabularyMeta {
            built_at: Utc::now(),
            corpus_fingerprint: self.fingerprint.finalize().to_hex().to_string(),
            m_bits: self.raw.m_bits(),
            hashes: self.raw.hashes(),
            hash_scheme: HASH_SCHEME.to_string(),
            raw_terms: self.raw_terms.len(),
            stemmed_terms: self.stemmed_terms.len(),
            checksum,
        };
        Vocabulary {
            format_version: FORMAT_VERSION,
            meta,
            raw: self.raw,
            stemmed: self.stemmed,
            df: self.df,
            stemmed_df: self.stemmed_df,
            docs_seen: self.docs_seen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qgate_core::types::Token;

    fn sample() -> Vocabulary {
        let mut builder = VocabularyBuilder::new(Normalizer::english(), 50_000, 7);
        builder
            .add_document("Crop rotation keeps farm soil healthy")
            .add_document("Irrigation schedules for crops in dry seasons")
            .add_document("Farm machinery maintenance");
        builder.build()
    }

    #[test]
    fn document_frequency_counts_documents_not_occurrences() {
        let mut builder = VocabularyBuilder::new(Normalizer::english(), 10_000, 5);
        builder.add_document("farm farm farm").add_document("farm crop");
        let vocab = builder.build();
        assert_eq!(vocab.doc_frequency("farm"), 2);
        assert_eq!(vocab.doc_frequency("crop"), 1);
        assert_eq!(vocab.doc_frequency("tractor"), 0);
        assert_eq!(vocab.total_docs(), 2);
    }

    #[test]
    fn stem_frequency_pools_inflected_forms() {
        let mut builder = VocabularyBuilder::new(Normalizer::english(), 10_000, 5);
        builder.add_document("crops and cropping").add_document("crops").add_document("crop yields");
        let vocab = builder.build();
        assert_eq!(vocab.doc_frequency("crop"), 1);
        assert_eq!(vocab.stem_frequency("crop"), 3);
        assert_eq!(vocab.token_frequency(&Token::new("crop", "crop")), 3);
    }

    #[test]
    fn stemmed_namespace_must_match_metadata() {
        let mut vocab = sample();
        vocab.stemmed = BloomFilter::new(64, 7);
        assert!(vocab.verify().unwrap_err().contains("stemmed namespace"));
    }

    #[test]
    fn raw_and_stemmed_namespaces_are_separate() {
        let vocab = sample();
        assert!(vocab.contains("crops", Namespace::Raw));
        assert!(vocab.contains("crop", Namespace::Stemmed));
        assert!(vocab.contains("irrig", Namespace::Stemmed));
        assert!(!vocab.contains("irrig", Namespace::Raw));
    }

    #[test]
    fn rarest_terms_are_sorted_by_frequency_then_term() {
        let mut builder = VocabularyBuilder::new(Normalizer::english(), 10_000, 5);
        builder.add_document("farm crop barley").add_document("farm crop").add_document("farm");
        let vocab = builder.build();
        assert_eq!(vocab.rarest_terms(2), vec!["barley", "crop"]);
    }

    #[test]
    fn metadata_reflects_build() {
        let vocab = sample();
        assert_eq!(vocab.meta().hash_scheme, HASH_SCHEME);
        assert_eq!(vocab.meta().m_bits, 50_000);
        assert_eq!(vocab.meta().hashes, 7);
        assert_eq!(vocab.meta().corpus_fingerprint.len(), 64);
        assert!(vocab.verify().is_ok());
    }

    #[test]
    fn tampering_breaks_the_checksum() {
        let mut vocab = sample();
        vocab.df.insert("injected".to_string(), 1);
        assert!(vocab.verify().unwrap_err().contains("checksum"));

        let mut vocab = sample();
        vocab.stemmed_df.insert("crop".to_string(), 1);
        assert!(vocab.verify().unwrap_err().contains("checksum"));
    }

    #[test]
    fn unknown_hash_scheme_is_refused() {
        let mut vocab = sample();
        vocab.meta.hash_scheme = "python-hash".to_string();
        assert!(vocab.verify().is_err());
    }
}
