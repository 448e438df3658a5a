use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use hookflow_core::{Flow, HookflowError, Result};

/// Source of flow definitions, addressed by tenant and endpoint slug.
pub trait FlowStore: Send + Sync {
    fn fetch(&self, tenant: &str, slug: &str) -> Result<Option<Arc<Flow>>>;
}

/// Reads `<root>/<tenant>/<slug>.json`.
pub struct DirectoryFlowStore {
    root: PathBuf,
}

impl DirectoryFlowStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl FlowStore for DirectoryFlowStore {
    fn fetch(&self, tenant: &str, slug: &str) -> Result<Option<Arc<Flow>>> {
        if !is_safe_segment(tenant) || !is_safe_segment(slug) {
            return Ok(None);
        }

        let path = self.root.join(tenant).join(format!("{}.json", slug));
        let source = match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(HookflowError::IoError {
                    path: path.to_string_lossy().to_string(),
                    message: e.to_string(),
                })
            }
        };

        let flow = Flow::parse(&source).map_err(|e| HookflowError::FlowError {
            message: format!("{}: {}", path.display(), e),
        })?;
        tracing::debug!(tenant, slug, path = %path.display(), "loaded flow");
        Ok(Some(Arc::new(flow)))
    }
}

/// Keeps fetched flows for `ttl`; misses are never cached so a newly
/// published flow is picked up on the next request.
pub struct CachedFlowStore<S> {
    inner: S,
    ttl: Duration,
    entries: RwLock<HashMap<(String, String), (Instant, Arc<Flow>)>>,
}

impl<S: FlowStore> CachedFlowStore<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn cached(&self, key: &(String, String)) -> Option<Arc<Flow>> {
        let entries = self.entries.read().ok()?;
        entries
            .get(key)
            .filter(|(loaded_at, _)| loaded_at.elapsed() < self.ttl)
            .map(|(_, flow)| flow.clone())
    }
}

impl<S: FlowStore> FlowStore for CachedFlowStore<S> {
    fn fetch(&self, tenant: &str, slug: &str) -> Result<Option<Arc<Flow>>> {
        let key = (tenant.to_string(), slug.to_string());
        if let Some(flow) = self.cached(&key) {
            return Ok(Some(flow));
        }

        let fetched = self.inner.fetch(tenant, slug)?;
        if let Ok(mut entries) = self.entries.write() {
            match &fetched {
                Some(flow) if !self.ttl.is_zero() => {
                    entries.insert(key, (Instant::now(), flow.clone()));
                }
                _ => {
                    entries.remove(&key);
                }
            }
        }
        Ok(fetched)
    }
}
