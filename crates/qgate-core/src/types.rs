//! Domain types shared by the normalizer, scorers and the gate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One normalized query word.
///
/// - `raw`: lower-cased surface form, looked up in the raw namespace
/// - `stemmed`: deterministic stem of `raw`, looked up in the stemmed namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub raw: String,
    pub stemmed: String,
}

impl Token {
    pub fn new(raw: impl Into<String>, stemmed: impl Into<String>) -> Self {
        Self { raw: raw.into(), stemmed: stemmed.into() }
    }
}

/// The two Bloom namespaces of a vocabulary artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Raw,
    Stemmed,
}

/// Downstream processing path chosen for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoutePath {
    #[serde(rename = "RAG")]
    Rag,
    #[serde(rename = "LLM_ONLY")]
    LlmOnly,
}

impl RoutePath {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutePath::Rag => "RAG",
            RoutePath::LlmOnly => "LLM_ONLY",
        }
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the lexical scorer for one token sequence.
///
/// `hits` includes any fuzzy credit; `genuine_hits` does not. `idf` is
/// always derived from genuine hits only and is exactly `0.0` without them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LexicalScore {
    pub hits: usize,
    pub genuine_hits: usize,
    pub coverage: f64,
    pub idf: f64,
    pub fuzzy_applied: bool,
}

impl LexicalScore {
    pub fn empty() -> Self {
        Self { hits: 0, genuine_hits: 0, coverage: 0.0, idf: 0.0, fuzzy_applied: false }
    }
}

/// Diagnostic notes attached to every decision.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecisionNotes {
    pub short: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idf: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonsense: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzzy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strong_idf: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<String>,
}

/// The per-request routing result. Created fresh for every query and never
/// mutated after it is returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub path: RoutePath,
    pub hits: usize,
    pub p_intent: f64,
    pub tokens: usize,
    pub notes: DecisionNotes,
}
