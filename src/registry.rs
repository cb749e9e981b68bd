use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::EngineError;
use crate::gvk;
use crate::object::KindId;
use crate::visitors::{IngressVisitor, KindVisitor, PodVisitor, ServiceAccountVisitor, ServiceVisitor, WorkloadVisitor};

/// Mapping `KindId → per-kind visitor`. Filled at initialization, frozen
/// during a traversal (the engine only ever calls `lookup`).
#[derive(Default)]
pub struct Registry {
    visitors: HashMap<KindId, Arc<dyn KindVisitor>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: KindId, visitor: Arc<dyn KindVisitor>) -> Result<(), EngineError> {
        if self.visitors.contains_key(&kind) {
            return Err(EngineError::AlreadyRegistered(kind));
        }
        debug!(%kind, "registering kind visitor");
        self.visitors.insert(kind, visitor);
        Ok(())
    }

    pub fn lookup(&self, kind: &KindId) -> Result<Arc<dyn KindVisitor>, EngineError> {
        self.visitors
            .get(kind)
            .cloned()
            .ok_or_else(|| EngineError::NotRegistered(kind.clone()))
    }
}

/// Wires up the registry with the nine standard kinds the engine knows how
/// to traverse. Application code can extend a fresh `Registry` with further
/// kinds before constructing the `Engine`.
pub fn default_registry() -> Result<Registry, EngineError> {
    let mut registry = Registry::new();

    let workload: Arc<dyn KindVisitor> = Arc::new(WorkloadVisitor);
    registry.register(gvk::deployment(), workload.clone())?;
    registry.register(gvk::replica_set(), workload.clone())?;
    registry.register(gvk::replication_controller(), workload.clone())?;
    registry.register(gvk::stateful_set(), workload.clone())?;
    registry.register(gvk::daemon_set(), workload)?;

    registry.register(gvk::pod(), Arc::new(PodVisitor))?;
    registry.register(gvk::service(), Arc::new(ServiceVisitor))?;
    registry.register(gvk::ingress(), Arc::new(IngressVisitor))?;
    registry.register(gvk::service_account(), Arc::new(ServiceAccountVisitor))?;

    Ok(registry)
}
