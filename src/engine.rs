use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::error::EngineError;
use crate::handler::{HandlerFactory, ObjectHandler};
use crate::object::{ClusterObject, ClusterObjectExt, VisitKey};
use crate::queryer::{Queryer, check_cancelled};
use crate::registry::Registry;

/// Hard bound on recursion depth. A soft cutoff, not an error: once reached,
/// `dispatch` simply stops exploring further rather than failing the visit.
pub const MAX_DEPTH: u32 = 10;

struct EngineInner {
    queryer: Arc<dyn Queryer>,
    registry: Registry,
    max_depth: u32,
}

/// Per-visit state, scoped to one `Engine::visit` call: the dedup set and
/// the single handler shared across every dispatched call. Discarded when
/// `visit` returns.
pub(crate) struct VisitState {
    seen: AsyncMutex<HashSet<VisitKey>>,
    pub(crate) handler: Arc<dyn ObjectHandler>,
    pub(crate) cancel: CancellationToken,
}

/// Bundles read-only access to the queryer and the cancellation signal for
/// a per-kind visitor function — everything it needs besides the handler
/// and `recurse`, which are passed alongside it.
pub struct EngineCtx<'a> {
    pub queryer: &'a dyn Queryer,
    pub cancel: &'a CancellationToken,
}

/// A bound reference back into the engine's dispatch loop, carrying forward
/// the per-visit state (seen set, handler) and the current depth. Per-kind
/// visitor functions call `spawn` once per discovered neighbor and join the
/// resulting handles before returning.
#[derive(Clone)]
pub struct Recurse {
    engine: Arc<EngineInner>,
    state: Arc<VisitState>,
    depth: u32,
}

impl Recurse {
    pub fn spawn(&self, obj: ClusterObject) -> JoinHandle<Result<(), EngineError>> {
        let engine = self.engine.clone();
        let state = self.state.clone();
        let depth = self.depth + 1;
        tokio::spawn(async move { dispatch(engine, obj, state, depth).await })
    }
}

/// Waits for every spawned task to complete and returns the first error
/// found while walking the results in spawn order — remaining errors are
/// not silently dropped, just not preferred over an earlier one.
pub async fn join_first_error(tasks: Vec<JoinHandle<Result<(), EngineError>>>) -> Result<(), EngineError> {
    for result in join_all(tasks).await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(join_err) => return Err(EngineError::from(join_err)),
        }
    }
    Ok(())
}

/// The reentrant driver: resolves kind, dedups, bounds depth, fans out
/// concurrently, joins errors, and records edges via the handler.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    pub fn new(queryer: Arc<dyn Queryer>, registry: Registry) -> Self {
        Self::with_max_depth(queryer, registry, MAX_DEPTH)
    }

    pub fn with_max_depth(queryer: Arc<dyn Queryer>, registry: Registry, max_depth: u32) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                queryer,
                registry,
                max_depth,
            }),
        }
    }

    /// Resolves the seed's kind, calls the factory to obtain a handler for
    /// this traversal, constructs per-visit state, and dispatches the seed.
    /// `handler_factory` is invoked exactly once, here — a fresh factory per
    /// call (e.g. one producing a new `GraphHandler`) gives each `visit` its
    /// own isolated result; a `FixedHandlerFactory` shared across calls lets
    /// a caller keep accumulating into the same handler instead. Returns the
    /// first error of any dispatched call after all outstanding work has
    /// settled, or `Ok(())`.
    #[instrument(skip_all, fields(seed = %seed.name_str()))]
    pub async fn visit(
        &self,
        seed: ClusterObject,
        cancel: CancellationToken,
        handler_factory: &dyn HandlerFactory,
    ) -> Result<(), EngineError> {
        let handler = handler_factory.create(&seed)?;
        let state = Arc::new(VisitState {
            seen: AsyncMutex::new(HashSet::new()),
            handler,
            cancel,
        });
        dispatch(self.inner.clone(), seed, state, 0).await
    }
}

pub(crate) async fn dispatch(
    engine: Arc<EngineInner>,
    obj: ClusterObject,
    state: Arc<VisitState>,
    depth: u32,
) -> Result<(), EngineError> {
    check_cancelled(&state.cancel).await?;

    let key = obj.visit_key()?;
    {
        let mut seen = state.seen.lock().await;
        if !seen.insert(key.clone()) {
            return Ok(());
        }
    }

    if depth > engine.max_depth {
        debug!(kind = %key.kind, uid = %key.uid, depth, "depth cutoff reached, not exploring further");
        return Ok(());
    }

    let visitor = engine.registry.lookup(&key.kind)?;
    state.handler.process(&obj).await?;

    let ctx = EngineCtx {
        queryer: engine.queryer.as_ref(),
        cancel: &state.cancel,
    };
    let recurse = Recurse {
        engine: engine.clone(),
        state: state.clone(),
        depth,
    };

    visitor.visit(&ctx, &obj, &state.handler, &recurse).await
}
