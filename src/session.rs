// trace session: one store, one config, the most recently loaded snapshot
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::TracerConfig;
use crate::core::catalog::{ElementSummary, Occupancy, StartOption};
use crate::core::snapshot::NetworkSnapshot;
use crate::core::step::{Highlight, PathStep};
use crate::core::trace::{TraceError, TraceRequest, trace_path};
use crate::core::types::ElementKind;
use crate::store::InventoryStore;
use crate::store::loader::{LoadError, load_snapshot};

/// Loads snapshots from `S` and answers trace requests against the latest one.
///
/// A failed reload keeps the previously loaded snapshot; traces keep working
/// against it until a later reload succeeds.
pub struct NetworkTracer<S> {
    store: S,
    config: TracerConfig,
    snapshot: Option<Arc<NetworkSnapshot>>,
}

impl<S: InventoryStore> NetworkTracer<S> {
    pub fn new(store: S, config: TracerConfig) -> Self {
        Self { store, config, snapshot: None }
    }

    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn snapshot(&self) -> Option<Arc<NetworkSnapshot>> {
        self.snapshot.clone()
    }

    pub async fn reload(&mut self) -> Result<Arc<NetworkSnapshot>, LoadError> {
        match load_snapshot(&self.store, &self.config).await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                info!(elements = snapshot.element_count(), "snapshot replaced");
                self.snapshot = Some(snapshot.clone());
                Ok(snapshot)
            }
            Err(e) => {
                warn!(error = %e, kept_previous = self.snapshot.is_some(), "snapshot reload failed");
                Err(e)
            }
        }
    }

    fn loaded(&self) -> Result<&NetworkSnapshot, TraceError> {
        self.snapshot.as_deref().ok_or(TraceError::SnapshotNotLoaded)
    }

    pub fn trace(&self, request: &TraceRequest) -> Result<Vec<PathStep>, TraceError> {
        trace_path(self.loaded()?, request, &self.config)
    }

    /// Trace plus the ids a map view should light up.
    pub fn trace_highlighted(&self, request: &TraceRequest) -> Result<(Vec<PathStep>, Highlight), TraceError> {
        let steps = self.trace(request)?;
        let highlight = Highlight::from_steps(&request.start_element_id, &steps);
        Ok((steps, highlight))
    }

    pub fn elements(&self, kind: ElementKind) -> Result<Vec<ElementSummary>, TraceError> {
        Ok(self.loaded()?.elements(kind))
    }

    pub fn start_options(&self, kind: ElementKind, element_id: &str) -> Result<Vec<StartOption>, TraceError> {
        self.loaded()?
            .start_options(kind, element_id)
            .ok_or_else(|| TraceError::ElementNotFound { kind, id: element_id.to_string() })
    }

    pub fn occupancy(&self, kind: ElementKind, element_id: &str) -> Result<Occupancy, TraceError> {
        self.loaded()?
            .occupancy(kind, element_id)
            .ok_or_else(|| TraceError::ElementNotFound { kind, id: element_id.to_string() })
    }
}
