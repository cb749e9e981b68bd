use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::{EngineCtx, Recurse, join_first_error};
use crate::error::EngineError;
use crate::handler::ObjectHandler;
use crate::object::{ClusterObject, ClusterObjectExt};

/// Encodes which neighbors a given kind explores. Looked up by `KindId` from
/// the registry rather than dispatched as a method on the object, so new
/// kinds can register new behavior without any class hierarchy.
#[async_trait]
pub trait KindVisitor: Send + Sync {
    async fn visit(
        &self,
        ctx: &EngineCtx<'_>,
        obj: &ClusterObject,
        handler: &Arc<dyn ObjectHandler>,
        recurse: &Recurse,
    ) -> Result<(), EngineError>;
}

/// Pods are leaves in the ownership direction — no `Children` call. Three
/// independent relationship kinds are explored: the services that select
/// this pod, its service account, and the chain of owner references.
pub struct PodVisitor;

#[async_trait]
impl KindVisitor for PodVisitor {
    async fn visit(
        &self,
        ctx: &EngineCtx<'_>,
        obj: &ClusterObject,
        handler: &Arc<dyn ObjectHandler>,
        recurse: &Recurse,
    ) -> Result<(), EngineError> {
        let pod = obj.clone();
        let mut tasks = Vec::new();

        for service in ctx.queryer.services_for_pod(ctx.cancel, &pod).await? {
            let recurse = recurse.clone();
            let handler = handler.clone();
            let pod = pod.clone();
            tasks.push(tokio::spawn(async move {
                recurse.spawn(service.clone()).await??;
                handler.add_child(&service, &[pod]).await
            }));
        }

        if let Some(sa) = ctx.queryer.service_account_for_pod(ctx.cancel, &pod).await? {
            let recurse = recurse.clone();
            let handler = handler.clone();
            let pod = pod.clone();
            tasks.push(tokio::spawn(async move {
                recurse.spawn(sa.clone()).await??;
                handler.add_child(&pod, &[sa]).await
            }));
        }

        for owner_ref in pod.owner_refs().to_vec() {
            let owner = ctx
                .queryer
                .owner_reference(ctx.cancel, pod.namespace_str(), &owner_ref)
                .await?;
            let recurse = recurse.clone();
            let handler = handler.clone();
            let pod = pod.clone();
            tasks.push(tokio::spawn(async move {
                recurse.spawn(owner.clone()).await??;
                handler.add_child(&owner, &[pod]).await
            }));
        }

        join_first_error(tasks).await
    }
}

/// Shared by ReplicaSet, ReplicationController, StatefulSet, DaemonSet and
/// Deployment: `Children` enumerates direct children, and any populated
/// owner references are resolved and recursed into. Whether owner
/// references are actually present is a property of the object, not the
/// kind, so one implementation covers all five.
pub struct WorkloadVisitor;

#[async_trait]
impl KindVisitor for WorkloadVisitor {
    async fn visit(
        &self,
        ctx: &EngineCtx<'_>,
        obj: &ClusterObject,
        handler: &Arc<dyn ObjectHandler>,
        recurse: &Recurse,
    ) -> Result<(), EngineError> {
        let this = obj.clone();
        let mut tasks = Vec::new();

        for child in ctx.queryer.children(ctx.cancel, &this).await? {
            let recurse = recurse.clone();
            let handler = handler.clone();
            let this = this.clone();
            tasks.push(tokio::spawn(async move {
                recurse.spawn(child.clone()).await??;
                handler.add_child(&this, &[child]).await
            }));
        }

        for owner_ref in this.owner_refs().to_vec() {
            let owner = ctx
                .queryer
                .owner_reference(ctx.cancel, this.namespace_str(), &owner_ref)
                .await?;
            let recurse = recurse.clone();
            let handler = handler.clone();
            let this = this.clone();
            tasks.push(tokio::spawn(async move {
                recurse.spawn(owner.clone()).await??;
                handler.add_child(&owner, &[this]).await
            }));
        }

        join_first_error(tasks).await
    }
}

/// Explores the pods it selects and the ingresses that reference it. Note
/// the edge direction for the ingress relationship: the ingress is the
/// parent even though the service is the one issuing the query.
pub struct ServiceVisitor;

#[async_trait]
impl KindVisitor for ServiceVisitor {
    async fn visit(
        &self,
        ctx: &EngineCtx<'_>,
        obj: &ClusterObject,
        handler: &Arc<dyn ObjectHandler>,
        recurse: &Recurse,
    ) -> Result<(), EngineError> {
        let svc = obj.clone();
        let mut tasks = Vec::new();

        for pod in ctx.queryer.pods_for_service(ctx.cancel, &svc).await? {
            let recurse = recurse.clone();
            let handler = handler.clone();
            let svc = svc.clone();
            tasks.push(tokio::spawn(async move {
                recurse.spawn(pod.clone()).await??;
                handler.add_child(&svc, &[pod]).await
            }));
        }

        for ingress in ctx.queryer.ingresses_for_service(ctx.cancel, &svc).await? {
            let recurse = recurse.clone();
            let handler = handler.clone();
            let svc = svc.clone();
            tasks.push(tokio::spawn(async move {
                recurse.spawn(ingress.clone()).await??;
                handler.add_child(&ingress, &[svc]).await
            }));
        }

        join_first_error(tasks).await
    }
}

/// Explores the services it routes to; the ingress is always the parent of
/// the service it references.
pub struct IngressVisitor;

#[async_trait]
impl KindVisitor for IngressVisitor {
    async fn visit(
        &self,
        ctx: &EngineCtx<'_>,
        obj: &ClusterObject,
        handler: &Arc<dyn ObjectHandler>,
        recurse: &Recurse,
    ) -> Result<(), EngineError> {
        let ing = obj.clone();
        let mut tasks = Vec::new();

        for service in ctx.queryer.services_for_ingress(ctx.cancel, &ing).await? {
            let recurse = recurse.clone();
            let handler = handler.clone();
            let ing = ing.clone();
            tasks.push(tokio::spawn(async move {
                recurse.spawn(service.clone()).await??;
                handler.add_child(&ing, &[service]).await
            }));
        }

        join_first_error(tasks).await
    }
}

/// Terminal: only `Process`, invoked by `dispatch` before this runs, is
/// needed. No neighbors are explored.
pub struct ServiceAccountVisitor;

#[async_trait]
impl KindVisitor for ServiceAccountVisitor {
    async fn visit(
        &self,
        _ctx: &EngineCtx<'_>,
        _obj: &ClusterObject,
        _handler: &Arc<dyn ObjectHandler>,
        _recurse: &Recurse,
    ) -> Result<(), EngineError> {
        Ok(())
    }
}
