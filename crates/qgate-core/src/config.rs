//! Layered configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g.
//! `APP_ROUTER__GATE__MIN_HITS=2`). Router settings live under the `router`
//! key and are extracted as a typed [`RouterConfig`].
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_in(Path::new("."), None)
    }

    /// Load `config.toml` and the env-specific overlay from `dir`. `env_name`
    /// falls back to `RUST_ENV`, then `dev`.
    pub fn load_in(dir: &Path, env_name: Option<&str>) -> anyhow::Result<Self> {
        let env_name = env_name
            .map(str::to_string)
            .unwrap_or_else(|| env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string()));

        let mut figment = Figment::new()
            .merge(Serialized::default("router", RouterConfig::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, base_dir: dir.to_path_buf() };
        config.router()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed, validated router settings.
    pub fn router(&self) -> anyhow::Result<RouterConfig> {
        let router: RouterConfig = self.get("router")?;
        router.validate()?;
        Ok(router)
    }

    /// Directory relative artifact paths are resolved against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub artifacts: ArtifactPaths,
    pub normalizer: NormalizerConfig,
    pub lexical: LexicalConfig,
    pub fuzzy: FuzzyConfig,
    pub gate: GateThresholds,
}

impl RouterConfig {
    pub fn validate(&self) -> Result<()> {
        self.normalizer.validate()?;
        self.fuzzy.validate()?;
        self.gate.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactPaths {
    pub vocabulary: String,
    pub intent_model: String,
    pub stopwords: Option<String>,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            vocabulary: "artifacts/vocab.json".to_string(),
            intent_model: "artifacts/intent_model.json".to_string(),
            stopwords: Some("artifacts/stopwords.json".to_string()),
        }
    }
}

/// Artifact paths after `~`/`${VAR}` expansion and base-dir resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocations {
    pub vocabulary: PathBuf,
    pub intent_model: PathBuf,
    pub stopwords: Option<PathBuf>,
}

impl ArtifactPaths {
    pub fn resolve(&self, base: &Path) -> ArtifactLocations {
        ArtifactLocations {
            vocabulary: resolve_with_base(base, &self.vocabulary),
            intent_model: resolve_with_base(base, &self.intent_model),
            stopwords: self.stopwords.as_ref().map(|p| resolve_with_base(base, p)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Tokens shorter than this many characters are dropped.
    pub min_token_len: usize,
    pub max_tokens: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self { min_token_len: 3, max_tokens: 32 }
    }
}

impl NormalizerConfig {
    fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(Error::InvalidConfig("normalizer.max_tokens must be > 0".to_string()));
        }
        Ok(())
    }
}

/// How per-token IDF values of the hit tokens are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdfAggregation {
    #[default]
    Sum,
    Mean,
    Max,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalConfig {
    pub idf_aggregation: IdfAggregation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzyConfig {
    pub enabled: bool,
    /// Number of rarest vocabulary terms near misses are compared against.
    pub candidate_pool: usize,
    pub min_similarity: f64,
    pub min_token_len: usize,
    /// Fuzzy credit needs at least this many query tokens.
    pub min_tokens: usize,
    /// Genuine coverage required before any credit is considered.
    pub min_coverage: f64,
    /// Genuine IDF required before any credit is considered.
    pub min_idf: f64,
    pub max_bonus: usize,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            candidate_pool: 50,
            min_similarity: 0.85,
            min_token_len: 4,
            min_tokens: 3,
            min_coverage: 0.20,
            min_idf: 0.5,
            max_bonus: 1,
        }
    }
}

impl FuzzyConfig {
    fn validate(&self) -> Result<()> {
        check_unit("fuzzy.min_similarity", self.min_similarity)?;
        check_unit("fuzzy.min_coverage", self.min_coverage)?;
        check_non_negative("fuzzy.min_idf", self.min_idf)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateThresholds {
    pub min_hits: usize,
    pub min_intent_prob: f64,
    pub short_min_prob: f64,
    pub short_token_limit: usize,
    pub very_short_token_limit: usize,
    pub coverage_min: f64,
    pub coverage_min_very_short: f64,
    pub idf_min: f64,
    pub idf_strong: f64,
    /// How far below the required probability a strong-IDF query may sit.
    pub strong_idf_prob_margin: f64,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            min_hits: 1,
            min_intent_prob: 0.65,
            short_min_prob: 0.70,
            short_token_limit: 3,
            very_short_token_limit: 2,
            coverage_min: 0.30,
            coverage_min_very_short: 0.20,
            idf_min: 2.0,
            idf_strong: 4.0,
            strong_idf_prob_margin: 0.15,
        }
    }
}

impl GateThresholds {
    pub fn is_short(&self, token_count: usize) -> bool {
        token_count <= self.short_token_limit
    }

    pub fn required_probability(&self, short: bool) -> f64 {
        if short { self.short_min_prob } else { self.min_intent_prob }
    }

    /// Coverage floor for a query of `token_count` tokens. Non-decreasing in
    /// `token_count`.
    pub fn coverage_floor(&self, token_count: usize) -> f64 {
        if token_count <= self.very_short_token_limit {
            self.coverage_min_very_short
        } else {
            self.coverage_min
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_hits == 0 {
            return Err(Error::InvalidConfig("gate.min_hits must be >= 1; lexical grounding cannot be waived".to_string()));
        }
        check_unit("gate.min_intent_prob", self.min_intent_prob)?;
        check_unit("gate.short_min_prob", self.short_min_prob)?;
        check_unit("gate.coverage_min", self.coverage_min)?;
        check_unit("gate.coverage_min_very_short", self.coverage_min_very_short)?;
        check_unit("gate.strong_idf_prob_margin", self.strong_idf_prob_margin)?;
        check_non_negative("gate.idf_min", self.idf_min)?;
        check_non_negative("gate.idf_strong", self.idf_strong)?;
        if self.very_short_token_limit > self.short_token_limit {
            return Err(Error::InvalidConfig(format!(
                "gate.very_short_token_limit ({}) exceeds gate.short_token_limit ({})",
                self.very_short_token_limit, self.short_token_limit
            )));
        }
        if self.coverage_min_very_short > self.coverage_min {
            return Err(Error::InvalidConfig(format!(
                "gate.coverage_min_very_short ({}) exceeds gate.coverage_min ({})",
                self.coverage_min_very_short, self.coverage_min
            )));
        }
        Ok(())
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::InvalidConfig(format!("{name} must be within [0, 1], got {value}")));
    }
    Ok(())
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::InvalidConfig(format!("{name} must be a finite value >= 0, got {value}")));
    }
    Ok(())
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
