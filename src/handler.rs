use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::EngineError;
use crate::object::{ClusterObject, ClusterObjectExt, KindId};

/// Per-object sink the engine calls back into during a traversal.
///
/// `process` is called once per visited `VisitKey`; `add_child` records a
/// parent→children edge. Both may be invoked from multiple concurrent
/// tasks — implementations own their own internal serialization, since the
/// engine holds no lock across handler invocations.
#[async_trait]
pub trait ObjectHandler: Send + Sync {
    async fn process(&self, obj: &ClusterObject) -> Result<(), EngineError>;
    async fn add_child(&self, parent: &ClusterObject, children: &[ClusterObject]) -> Result<(), EngineError>;
}

/// Produces the handler used for an entire traversal. The engine calls this
/// exactly once per `visit`, at the start, and reuses the returned handler
/// for every subsequent callback.
pub trait HandlerFactory: Send + Sync {
    fn create(&self, seed: &ClusterObject) -> Result<Arc<dyn ObjectHandler>, EngineError>;
}

/// A `HandlerFactory` that always hands back the same, pre-built handler
/// regardless of seed. This is how a caller recovers the per-visit graph
/// after `visit` returns and its internal per-visit state is discarded: the
/// caller keeps its own `Arc` to the same handler the engine was given.
pub struct FixedHandlerFactory(Arc<dyn ObjectHandler>);

impl FixedHandlerFactory {
    pub fn new(handler: Arc<dyn ObjectHandler>) -> Self {
        Self(handler)
    }
}

impl HandlerFactory for FixedHandlerFactory {
    fn create(&self, _seed: &ClusterObject) -> Result<Arc<dyn ObjectHandler>, EngineError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub uid: String,
    pub kind: KindId,
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub parent_uid: String,
    pub child_uid: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ResourceGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Default)]
struct GraphInner {
    nodes: HashMap<String, GraphNode>,
    children: HashMap<String, Vec<String>>,
}

/// Reference in-memory `ObjectHandler`: accumulates a node table and an
/// adjacency list behind a mutex, mirroring the teacher's `Graph` type in
/// shape (nodes map + parent→children map) but scoped to a single traversal
/// rather than kept alive across reconciler events.
#[derive(Default)]
pub struct GraphHandler {
    inner: Mutex<GraphInner>,
}

impl GraphHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> ResourceGraph {
        let inner = self.inner.lock().await;
        let nodes = inner.nodes.values().cloned().collect();
        let edges = inner
            .children
            .iter()
            .flat_map(|(parent_uid, kids)| {
                kids.iter().map(move |child_uid| GraphEdge {
                    parent_uid: parent_uid.clone(),
                    child_uid: child_uid.clone(),
                })
            })
            .collect();
        ResourceGraph { nodes, edges }
    }
}

#[async_trait]
impl ObjectHandler for GraphHandler {
    async fn process(&self, obj: &ClusterObject) -> Result<(), EngineError> {
        let key = obj.visit_key()?;
        let node = GraphNode {
            uid: key.uid.clone(),
            kind: key.kind,
            namespace: obj.namespace_str().to_string(),
            name: obj.name_str().to_string(),
        };
        let mut inner = self.inner.lock().await;
        inner.nodes.insert(key.uid, node);
        Ok(())
    }

    async fn add_child(&self, parent: &ClusterObject, children: &[ClusterObject]) -> Result<(), EngineError> {
        let parent_uid = parent.uid()?;
        let mut inner = self.inner.lock().await;
        let entry = inner.children.entry(parent_uid).or_default();
        for child in children {
            let child_uid = child.uid()?;
            if !entry.contains(&child_uid) {
                entry.push(child_uid);
            }
        }
        Ok(())
    }
}
