use std::fmt;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::DynamicObject;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::EngineError;

/// The traversal unit. The engine never needs a concrete, per-kind Rust
/// struct — only per-kind visitor functions and the Kubernetes-backed
/// queryer deserialize the payload into something typed, on demand. A
/// Kubernetes dynamic object (type metadata + object metadata + the rest of
/// the document as JSON) already has exactly this shape, so it's reused
/// directly rather than wrapped.
pub type ClusterObject = DynamicObject;

/// The `(group, version, kind)` triple that classifies a `ClusterObject` for
/// dispatch. Equality is component-wise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct KindId {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl KindId {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Parses the `group/version` (or bare `version` for the core group)
    /// form Kubernetes uses in `apiVersion` fields.
    pub fn from_api_version_kind(api_version: &str, kind: &str) -> Self {
        match api_version.split_once('/') {
            Some((group, version)) => KindId::new(group, version, kind),
            None => KindId::new("", api_version, kind),
        }
    }
}

impl fmt::Display for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}, Kind={}", self.version, self.kind)
        } else {
            write!(f, "{}/{}, Kind={}", self.group, self.version, self.kind)
        }
    }
}

/// `(KindId, UID)`. The dedup identity of a node during one traversal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VisitKey {
    pub kind: KindId,
    pub uid: String,
}

/// Helpers for reading the semantic attributes `ClusterObject` is specified
/// to carry, without forcing callers to know the concrete `DynamicObject`
/// layout.
pub trait ClusterObjectExt {
    fn kind_id(&self) -> Result<KindId, EngineError>;
    fn uid(&self) -> Result<String, EngineError>;
    fn name_str(&self) -> &str;
    fn namespace_str(&self) -> &str;
    fn owner_refs(&self) -> &[OwnerReference];
    fn visit_key(&self) -> Result<VisitKey, EngineError>;
    fn spec_as<T: DeserializeOwned>(&self) -> Option<T>;
}

impl ClusterObjectExt for ClusterObject {
    fn kind_id(&self) -> Result<KindId, EngineError> {
        let types = self.types.as_ref().ok_or_else(|| {
            EngineError::MissingMetadata(format!(
                "object {} has no type metadata",
                self.name_str()
            ))
        })?;
        Ok(KindId::from_api_version_kind(&types.api_version, &types.kind))
    }

    fn uid(&self) -> Result<String, EngineError> {
        self.metadata.uid.clone().ok_or_else(|| {
            EngineError::MissingMetadata(format!("object {} has no uid", self.name_str()))
        })
    }

    fn name_str(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or("")
    }

    fn namespace_str(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or("")
    }

    fn owner_refs(&self) -> &[OwnerReference] {
        self.metadata
            .owner_references
            .as_deref()
            .unwrap_or_default()
    }

    fn visit_key(&self) -> Result<VisitKey, EngineError> {
        Ok(VisitKey {
            kind: self.kind_id()?,
            uid: self.uid()?,
        })
    }

    fn spec_as<T: DeserializeOwned>(&self) -> Option<T> {
        self.data
            .get("spec")
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
    }
}
