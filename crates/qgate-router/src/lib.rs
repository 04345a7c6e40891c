//! qgate-router
//!
//! Combines lexical evidence and intent probability into a RAG / LLM_ONLY
//! decision, served from an atomically swappable artifact snapshot.

pub mod gate;
pub mod snapshot;
pub mod store;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use qgate_core::config::{Config, RouterConfig};
use qgate_core::types::DecisionRecord;
use qgate_core::Result;
use qgate_text::TokenExplanation;

pub use gate::{evaluate, GateInput, Verdict, GATES};
pub use snapshot::{RouterSnapshot, SnapshotInfo};
pub use store::ArtifactStore;

/// Query router bound to an artifact source. `Send + Sync`; share it by
/// reference or behind an `Arc`.
pub struct Router {
    store: ArtifactStore,
    config: RouterConfig,
    base_dir: PathBuf,
}

impl Router {
    /// Load all artifacts up front; fails closed when any is missing or corrupt.
    pub fn open(config: RouterConfig, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        let snapshot = RouterSnapshot::load(&config, &base_dir)?;
        Ok(Self { store: ArtifactStore::new(snapshot), config, base_dir })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::open(config.router()?, config.base_dir())?)
    }

    pub fn route(&self, query: &str) -> DecisionRecord {
        self.store.snapshot().route(query)
    }

    pub fn explain(&self, query: &str) -> Vec<TokenExplanation> {
        self.store.snapshot().explain(query)
    }

    pub fn snapshot(&self) -> Arc<RouterSnapshot> {
        self.store.snapshot()
    }

    /// Re-read the artifacts from the configured locations.
    pub fn reload(&self) -> Result<()> {
        self.store.reload(&self.config, &self.base_dir)
    }

    pub fn swap(&self, next: RouterSnapshot) -> Arc<RouterSnapshot> {
        self.store.swap(next)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}
