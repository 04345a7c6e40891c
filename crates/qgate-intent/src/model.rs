//! Classifier artifact: a fitted vectorizer and an ensemble of calibrated
//! linear members whose probabilities are averaged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

use qgate_core::traits::IntentEstimator;
use qgate_core::{Error, Result};

use crate::features::NgramVectorizer;

pub const FORMAT_VERSION: u32 = 1;

/// Maps a raw decision score to a probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Calibration {
    /// Platt scaling: `1 / (1 + exp(a·s + b))`.
    Sigmoid { a: f64, b: f64 },
    /// Plain logistic link: `1 / (1 + exp(-s))`.
    Logistic,
}

impl Calibration {
    pub fn apply(&self, score: f64) -> f64 {
        match *self {
            Calibration::Sigmoid { a, b } => sigmoid(-(a * score + b)),
            Calibration::Logistic => sigmoid(score),
        }
    }

    fn is_finite(&self) -> bool {
        match *self {
            Calibration::Sigmoid { a, b } => a.is_finite() && b.is_finite(),
            Calibration::Logistic => true,
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedMember {
    pub coef: Vec<f32>,
    pub intercept: f64,
    pub calibration: Calibration,
}

impl CalibratedMember {
    pub fn decision(&self, features: &[(usize, f64)]) -> f64 {
        features
            .iter()
            .map(|&(col, v)| self.coef.get(col).map_or(0.0, |&c| f64::from(c)) * v)
            .sum::<f64>()
            + self.intercept
    }

    pub fn probability(&self, features: &[(usize, f64)]) -> f64 {
        self.calibration.apply(self.decision(features))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentModelMeta {
    pub trained_at: DateTime<Utc>,
    pub label: String,
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentModel {
    format_version: u32,
    meta: IntentModelMeta,
    vectorizer: NgramVectorizer,
    members: Vec<CalibratedMember>,
}

impl IntentModel {
    /// Assemble a model from fitted parts, stamping it with a checksum.
    pub fn new(vectorizer: NgramVectorizer, members: Vec<CalibratedMember>, label: impl Into<String>) -> Result<Self> {
        let checksum = checksum(&vectorizer, &members)?;
        Ok(Self {
            format_version: FORMAT_VERSION,
            meta: IntentModelMeta { trained_at: Utc::now(), label: label.into(), checksum },
            vectorizer,
            members,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::ArtifactMissing { path: path.to_path_buf() })
            }
            Err(e) => return Err(e.into()),
        };
        let model: Self = serde_json::from_slice(&bytes).map_err(|e| Error::corrupt(path, e.to_string()))?;
        model.validate().map_err(|reason| Error::corrupt(path, reason))?;
        let actual = checksum(&model.vectorizer, &model.members)?;
        if actual != model.meta.checksum {
            return Err(Error::corrupt(
                path,
                format!("checksum mismatch: stored {}, computed {}", model.meta.checksum, actual),
            ));
        }
        info!(
            path = %path.display(),
            label = %model.meta.label,
            trained_at = %model.meta.trained_at,
            features = model.vectorizer.n_features(),
            members = model.members.len(),
            "loaded intent model"
        );
        Ok(model)
    }

    /// Refuses to write a model that `load` would reject.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate().map_err(|reason| Error::corrupt(path, reason))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec(self)?)?;
        Ok(())
    }

    pub fn meta(&self) -> &IntentModelMeta {
        &self.meta
    }

    pub fn vectorizer(&self) -> &NgramVectorizer {
        &self.vectorizer
    }

    pub fn members(&self) -> &[CalibratedMember] {
        &self.members
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.format_version != FORMAT_VERSION {
            return Err(format!("unsupported format_version {}", self.format_version));
        }
        self.vectorizer.validate()?;
        if self.members.is_empty() {
            return Err("model has no members".to_string());
        }
        let n = self.vectorizer.n_features();
        for (i, m) in self.members.iter().enumerate() {
            if m.coef.len() != n {
                return Err(format!("member {i} has {} coefficients, expected {n}", m.coef.len()));
            }
            if !m.intercept.is_finite() || !m.calibration.is_finite() || m.coef.iter().any(|c| !c.is_finite()) {
                return Err(format!("member {i} contains non-finite parameters"));
            }
        }
        Ok(())
    }
}

impl IntentEstimator for IntentModel {
    fn predict(&self, query: &str) -> f64 {
        let features = self.vectorizer.transform(query);
        let total: f64 = self.members.iter().map(|m| m.probability(&features)).sum();
        let p = total / self.members.len().max(1) as f64;
        if p.is_finite() {
            p.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

fn checksum(vectorizer: &NgramVectorizer, members: &[CalibratedMember]) -> Result<String> {
    let canonical = serde_json::to_vec(&(vectorizer, members))?;
    Ok(blake3::hash(&canonical).to_hex().to_string())
}
