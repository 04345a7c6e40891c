use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

use qgate_core::config::RouterConfig;
use qgate_core::Result;

use crate::snapshot::RouterSnapshot;

/// Holds the current snapshot. The lock only guards the `Arc` itself; a
/// decision runs on its own clone and never blocks a swap.
pub struct ArtifactStore {
    current: RwLock<Arc<RouterSnapshot>>,
}

impl ArtifactStore {
    pub fn new(snapshot: RouterSnapshot) -> Self {
        Self { current: RwLock::new(Arc::new(snapshot)) }
    }

    pub fn snapshot(&self) -> Arc<RouterSnapshot> {
        let guard = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Install `next` and return the snapshot it replaced. Requests that
    /// already hold the old snapshot finish on it.
    pub fn swap(&self, next: RouterSnapshot) -> Arc<RouterSnapshot> {
        let mut guard = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, Arc::new(next))
    }

    /// Load fresh artifacts and swap them in. On failure the current
    /// snapshot keeps serving.
    pub fn reload(&self, config: &RouterConfig, base_dir: &Path) -> Result<()> {
        match RouterSnapshot::load(config, base_dir) {
            Ok(next) => {
                let fingerprint = next.vocabulary().meta().corpus_fingerprint.clone();
                self.swap(next);
                info!(%fingerprint, "swapped in reloaded artifacts");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "artifact reload failed; keeping the current snapshot");
                Err(e)
            }
        }
    }
}
