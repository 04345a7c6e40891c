//! Fixed-size Bloom filter with pinned, seed-stable hashing.
//!
//! Bit positions use double hashing over two xxh64 digests with fixed seeds,
//! so the same term maps to the same bits in every process and on every run.

use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use twox_hash::XxHash64;

/// Name stored in vocabulary artifacts; loading refuses any other scheme.
pub const HASH_SCHEME: &str = "xxh64-double/v1";

const SEED_PRIMARY: u64 = 0;
const SEED_SECONDARY: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloomFilter {
    m_bits: u64,
    hashes: u32,
    words: Vec<u64>,
}

impl BloomFilter {
    pub fn new(m_bits: u64, hashes: u32) -> Self {
        let m_bits = m_bits.max(1);
        let hashes = hashes.max(1);
        Self { m_bits, hashes, words: vec![0; word_count(m_bits)] }
    }

    pub fn insert(&mut self, term: &str) {
        for pos in positions(term, self.m_bits, self.hashes) {
            self.words[(pos / 64) as usize] |= 1u64 << (pos % 64);
        }
    }

    /// True only if every derived bit is set. Never false for an inserted term.
    pub fn contains(&self, term: &str) -> bool {
        positions(term, self.m_bits, self.hashes).all(|pos| self.words[(pos / 64) as usize] & (1u64 << (pos % 64)) != 0)
    }

    pub fn m_bits(&self) -> u64 { self.m_bits }
    pub fn hashes(&self) -> u32 { self.hashes }
    pub fn words(&self) -> &[u64] { &self.words }

    /// Fraction of set bits; a rough saturation indicator for diagnostics.
    pub fn fill_ratio(&self) -> f64 {
        let set: u64 = self.words.iter().map(|w| u64::from(w.count_ones())).sum();
        set as f64 / self.m_bits as f64
    }

    /// Shape checks for filters read from disk.
    pub fn validate(&self) -> Result<(), String> {
        if self.m_bits == 0 {
            return Err("bloom m_bits is 0".to_string());
        }
        if self.hashes == 0 {
            return Err("bloom hash count is 0".to_string());
        }
        let expected = word_count(self.m_bits);
        if self.words.len() != expected {
            return Err(format!("bloom has {} words, expected {} for {} bits", self.words.len(), expected, self.m_bits));
        }
        Ok(())
    }
}

fn word_count(m_bits: u64) -> usize {
    m_bits.div_ceil(64) as usize
}

fn digest(term: &str, seed: u64) -> u64 {
    let mut hasher = XxHash64::with_seed(seed);
    hasher.write(term.as_bytes());
    hasher.finish()
}

fn positions(term: &str, m_bits: u64, hashes: u32) -> impl Iterator<Item = u64> {
    let h1 = digest(term, SEED_PRIMARY);
    let h2 = digest(term, SEED_SECONDARY);
    (0..u64::from(hashes)).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % m_bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_terms_are_members() {
        let mut bloom = BloomFilter::new(10_000, 7);
        for t in ["farm", "crop", "irrigation", "düngung"] { bloom.insert(t); }
        for t in ["farm", "crop", "irrigation", "düngung"] { assert!(bloom.contains(t), "{t} must be found"); }
        assert!(!bloom.contains("spaceship"));
    }

    #[test]
    fn positions_are_stable_across_instances() {
        let a: Vec<u64> = positions("harvest", 4_000_000, 7).collect();
        let b: Vec<u64> = positions("harvest", 4_000_000, 7).collect();
        assert_eq!(a, b);
        assert!(a.iter().all(|p| *p < 4_000_000));
    }

    #[test]
    fn pinned_digest_values() {
        // Published xxh64 vectors.
        assert_eq!(digest("", 0), 0xEF46_DB37_51D8_E999);
        assert_eq!(digest("a", 0), 0xD24E_C4F1_A98C_6E5B);
        assert_eq!(digest("abc", 0), 0x44BC_2CF5_AD77_0999);
        // Both seeds as used by `xxh64-double/v1`.
        assert_eq!(digest("harvest", SEED_PRIMARY), 0x3C7D_E252_8423_1E61);
        assert_eq!(digest("harvest", SEED_SECONDARY), 0x454D_2AA6_4639_D456);
    }

    #[test]
    fn pinned_bit_positions() {
        // Existing artifacts become unreadable if these ever change.
        let pos: Vec<u64> = positions("harvest", 4_000_000, 7).collect();
        assert_eq!(pos, vec![597_857, 3_478_711, 2_359_565, 3_688_803, 2_569_657, 1_450_511, 331_365]);
    }

    #[test]
    fn validate_rejects_truncated_bit_arrays() {
        let mut bloom = BloomFilter::new(1_000, 3);
        assert!(bloom.validate().is_ok());
        bloom.words.pop();
        assert!(bloom.validate().is_err());
    }

    #[test]
    fn empty_filter_contains_nothing() {
        let bloom = BloomFilter::new(512, 4);
        assert!(!bloom.contains("farm"));
        assert_eq!(bloom.fill_ratio(), 0.0);
    }

    #[test]
    fn fill_ratio_counts_set_bits() {
        let mut bloom = BloomFilter::new(1_024, 3);
        bloom.insert("harvest");
        let set = positions("harvest", 1_024, 3).collect::<std::collections::BTreeSet<_>>().len();
        assert_eq!(bloom.fill_ratio(), set as f64 / 1_024.0);
    }
}
