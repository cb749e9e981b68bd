use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::core::v1::{Pod, ReplicationController, Service, ServiceAccount};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{Api, DynamicObject, ListParams, ObjectMeta, TypeMeta};
use kube::{Client, ResourceExt};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::EngineError;
use crate::object::{ClusterObject, ClusterObjectExt};

/// Relationship questions the engine needs answered about one object.
///
/// Every method returns an empty collection rather than an error when
/// nothing matches; only transport/lookup failures are errors. `cancel` is
/// checked at the next suspension point inside each implementation.
#[async_trait]
pub trait Queryer: Send + Sync {
    async fn children(
        &self,
        cancel: &CancellationToken,
        obj: &ClusterObject,
    ) -> Result<Vec<ClusterObject>, EngineError>;

    async fn owner_reference(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        owner_ref: &OwnerReference,
    ) -> Result<ClusterObject, EngineError>;

    async fn pods_for_service(
        &self,
        cancel: &CancellationToken,
        svc: &ClusterObject,
    ) -> Result<Vec<ClusterObject>, EngineError>;

    async fn services_for_pod(
        &self,
        cancel: &CancellationToken,
        pod: &ClusterObject,
    ) -> Result<Vec<ClusterObject>, EngineError>;

    async fn services_for_ingress(
        &self,
        cancel: &CancellationToken,
        ing: &ClusterObject,
    ) -> Result<Vec<ClusterObject>, EngineError>;

    async fn ingresses_for_service(
        &self,
        cancel: &CancellationToken,
        svc: &ClusterObject,
    ) -> Result<Vec<ClusterObject>, EngineError>;

    async fn service_account_for_pod(
        &self,
        cancel: &CancellationToken,
        pod: &ClusterObject,
    ) -> Result<Option<ClusterObject>, EngineError>;
}

pub(crate) async fn check_cancelled(cancel: &CancellationToken) -> Result<(), EngineError> {
    if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }
    Ok(())
}

/// Production `Queryer` backed by a live Kubernetes API server via `kube`.
///
/// Label-selector and owner-reference matching follow the same style the
/// teacher's reconcilers used: subset-match a service's selector against a
/// pod's labels, compare `(kind, name)` for owner references.
#[derive(Clone)]
pub struct KubeQueryer {
    client: Client,
}

impl KubeQueryer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Resolves an arbitrary kind/namespace/name into a `ClusterObject`, for
    /// bootstrapping a seed from an HTTP request. Not part of the `Queryer`
    /// contract the engine depends on — purely an operational convenience
    /// for the thin trigger surface.
    pub async fn get_object(
        &self,
        cancel: &CancellationToken,
        kind: &str,
        namespace: &str,
        name: &str,
    ) -> Result<ClusterObject, EngineError> {
        check_cancelled(cancel).await?;
        match kind {
            "Pod" => self.get_typed::<Pod>(namespace, name).await,
            "Service" => self.get_typed::<Service>(namespace, name).await,
            "Ingress" => self.get_typed::<Ingress>(namespace, name).await,
            "Deployment" => self.get_typed::<Deployment>(namespace, name).await,
            "ReplicaSet" => self.get_typed::<ReplicaSet>(namespace, name).await,
            "ReplicationController" => {
                self.get_typed::<ReplicationController>(namespace, name).await
            }
            "StatefulSet" => self.get_typed::<StatefulSet>(namespace, name).await,
            "DaemonSet" => self.get_typed::<DaemonSet>(namespace, name).await,
            "ServiceAccount" => self.get_typed::<ServiceAccount>(namespace, name).await,
            other => Err(EngineError::MissingMetadata(format!(
                "unsupported seed kind {other}"
            ))),
        }
    }

    async fn get_typed<K>(&self, namespace: &str, name: &str) -> Result<ClusterObject, EngineError>
    where
        K: kube::Resource<DynamicType = ()>
            + Clone
            + std::fmt::Debug
            + serde::de::DeserializeOwned
            + serde::Serialize,
    {
        let api: Api<K> = if namespace.is_empty() {
            Api::all(self.client.clone())
        } else {
            Api::namespaced(self.client.clone(), namespace)
        };
        let obj = api.get(name).await.map_err(EngineError::query)?;
        to_dynamic(&obj)
    }

    async fn list_typed<K>(&self, namespace: &str) -> Result<Vec<K>, EngineError>
    where
        K: kube::Resource<DynamicType = ()>
            + Clone
            + std::fmt::Debug
            + serde::de::DeserializeOwned,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(EngineError::query)?;
        Ok(list.items)
    }
}

/// Converts a statically typed k8s-openapi object into the dynamic
/// representation the engine traverses, by round-tripping through
/// `serde_json`. This is the inverse of `ClusterObjectExt::spec_as`.
fn to_dynamic<K>(obj: &K) -> Result<ClusterObject, EngineError>
where
    K: kube::Resource<DynamicType = ()> + serde::Serialize,
{
    let mut value = serde_json::to_value(obj).map_err(EngineError::query)?;
    let metadata: ObjectMeta = serde_json::from_value(value["metadata"].take())
        .map_err(EngineError::query)?;
    let api_version = value["apiVersion"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    let kind = value["kind"].as_str().unwrap_or_default().to_string();
    if let Some(map) = value.as_object_mut() {
        map.remove("apiVersion");
        map.remove("kind");
        map.remove("metadata");
    }
    Ok(DynamicObject {
        types: Some(TypeMeta { api_version, kind }),
        metadata,
        data: value,
    })
}

fn selector_matches(selector: &BTreeMap<String, String>, labels: &BTreeMap<String, String>) -> bool {
    !selector.is_empty() && selector.iter().all(|(k, v)| labels.get(k) == Some(v))
}

#[async_trait]
impl Queryer for KubeQueryer {
    async fn children(
        &self,
        cancel: &CancellationToken,
        obj: &ClusterObject,
    ) -> Result<Vec<ClusterObject>, EngineError> {
        check_cancelled(cancel).await?;
        let kind = obj.kind_id()?;
        let ns = obj.namespace_str();
        let uid = obj.uid()?;

        let is_owned_by_obj = |refs: &[OwnerReference]| refs.iter().any(|r| r.uid == uid);

        let children: Vec<ClusterObject> = match kind.kind.as_str() {
            "Deployment" => self
                .list_typed::<ReplicaSet>(ns)
                .await?
                .into_iter()
                .filter(|rs| is_owned_by_obj(rs.owner_references()))
                .map(|rs| to_dynamic(&rs))
                .collect::<Result<_, _>>()?,
            "ReplicaSet" | "ReplicationController" | "StatefulSet" | "DaemonSet" => self
                .list_typed::<Pod>(ns)
                .await?
                .into_iter()
                .filter(|pod| is_owned_by_obj(pod.owner_references()))
                .map(|pod| to_dynamic(&pod))
                .collect::<Result<_, _>>()?,
            _ => Vec::new(),
        };

        debug!(kind = %kind, ns, uid, count = children.len(), "resolved children");
        Ok(children)
    }

    async fn owner_reference(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        owner_ref: &OwnerReference,
    ) -> Result<ClusterObject, EngineError> {
        check_cancelled(cancel).await?;
        self.get_object(cancel, &owner_ref.kind, namespace, &owner_ref.name)
            .await
    }

    async fn pods_for_service(
        &self,
        cancel: &CancellationToken,
        svc: &ClusterObject,
    ) -> Result<Vec<ClusterObject>, EngineError> {
        check_cancelled(cancel).await?;
        let ns = svc.namespace_str();
        let selector = service_selector(svc).unwrap_or_default();
        if selector.is_empty() {
            return Ok(Vec::new());
        }

        let pods = self
            .list_typed::<Pod>(ns)
            .await?
            .into_iter()
            .filter(|pod| {
                let labels = pod.metadata.labels.clone().unwrap_or_default();
                selector_matches(&selector, &labels)
            })
            .map(|pod| to_dynamic(&pod))
            .collect::<Result<_, _>>()?;

        Ok(pods)
    }

    async fn services_for_pod(
        &self,
        cancel: &CancellationToken,
        pod: &ClusterObject,
    ) -> Result<Vec<ClusterObject>, EngineError> {
        check_cancelled(cancel).await?;
        let ns = pod.namespace_str();
        let pod_labels = pod.metadata.labels.clone().unwrap_or_default();

        let services = self
            .list_typed::<Service>(ns)
            .await?
            .into_iter()
            .filter(|svc| {
                let selector = svc
                    .spec
                    .as_ref()
                    .and_then(|s| s.selector.clone())
                    .unwrap_or_default();
                selector_matches(&selector, &pod_labels)
            })
            .map(|svc| to_dynamic(&svc))
            .collect::<Result<_, _>>()?;

        Ok(services)
    }

    async fn services_for_ingress(
        &self,
        cancel: &CancellationToken,
        ing: &ClusterObject,
    ) -> Result<Vec<ClusterObject>, EngineError> {
        check_cancelled(cancel).await?;
        let ns = ing.namespace_str();
        let names = ingress_backend_service_names(ing);
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let services = self
            .list_typed::<Service>(ns)
            .await?
            .into_iter()
            .filter(|svc| svc.metadata.name.as_deref().is_some_and(|n| names.contains(n)))
            .map(|svc| to_dynamic(&svc))
            .collect::<Result<_, _>>()?;

        Ok(services)
    }

    async fn ingresses_for_service(
        &self,
        cancel: &CancellationToken,
        svc: &ClusterObject,
    ) -> Result<Vec<ClusterObject>, EngineError> {
        check_cancelled(cancel).await?;
        let ns = svc.namespace_str();
        let svc_name = svc.name_str();

        let ingresses = self
            .list_typed::<Ingress>(ns)
            .await?
            .into_iter()
            .filter(|ing| {
                let dyn_ing = to_dynamic(ing).ok();
                dyn_ing
                    .map(|d| ingress_backend_service_names(&d).contains(svc_name))
                    .unwrap_or(false)
            })
            .map(|ing| to_dynamic(&ing))
            .collect::<Result<_, _>>()?;

        Ok(ingresses)
    }

    async fn service_account_for_pod(
        &self,
        cancel: &CancellationToken,
        pod: &ClusterObject,
    ) -> Result<Option<ClusterObject>, EngineError> {
        check_cancelled(cancel).await?;
        let ns = pod.namespace_str();
        let Some(sa_name) = pod
            .spec_as::<k8s_openapi::api::core::v1::PodSpec>()
            .and_then(|spec| spec.service_account_name.or(spec.service_account))
        else {
            return Ok(None);
        };

        if sa_name.is_empty() {
            return Ok(None);
        }

        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), ns);
        match api.get(&sa_name).await {
            Ok(sa) => Ok(Some(to_dynamic(&sa)?)),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(None),
            Err(e) => Err(EngineError::query(e)),
        }
    }
}

fn service_selector(svc: &ClusterObject) -> Option<BTreeMap<String, String>> {
    svc.spec_as::<k8s_openapi::api::core::v1::ServiceSpec>()
        .and_then(|s| s.selector)
}

fn ingress_backend_service_names(ing: &ClusterObject) -> std::collections::HashSet<String> {
    let Some(spec) = ing.spec_as::<k8s_openapi::api::networking::v1::IngressSpec>() else {
        return Default::default();
    };

    let mut names = std::collections::HashSet::new();
    if let Some(backend) = spec.default_backend.and_then(|b| b.service) {
        names.insert(backend.name);
    }
    for rule in spec.rules.unwrap_or_default() {
        let Some(http) = rule.http else { continue };
        for path in http.paths {
            if let Some(service) = path.backend.service {
                names.insert(service.name);
            }
        }
    }
    names
}
