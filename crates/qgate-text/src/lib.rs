//! qgate-text
//!
//! Lexical side of the router: stopwords, query normalization, the Bloom
//! vocabulary artifact, the lexical scorer and near-miss matching.

pub mod bloom;
pub mod fuzzy;
pub mod lexical;
pub mod normalize;
pub mod stopwords;
pub mod vocab;

pub use bloom::BloomFilter;
pub use fuzzy::RareTermMatcher;
pub use lexical::{explain, LexicalScorer, TokenExplanation};
pub use normalize::Normalizer;
pub use stopwords::StopwordBundle;
pub use vocab::{Vocabulary, VocabularyBuilder, VocabularyMeta};
