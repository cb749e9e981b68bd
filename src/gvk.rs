//! Well-known `KindId`s for the kinds the default registry understands.

use crate::object::KindId;

pub fn pod() -> KindId {
    KindId::new("", "v1", "Pod")
}

pub fn service() -> KindId {
    KindId::new("", "v1", "Service")
}

pub fn service_account() -> KindId {
    KindId::new("", "v1", "ServiceAccount")
}

pub fn replication_controller() -> KindId {
    KindId::new("", "v1", "ReplicationController")
}

pub fn ingress() -> KindId {
    KindId::new("networking.k8s.io", "v1", "Ingress")
}

pub fn deployment() -> KindId {
    KindId::new("apps", "v1", "Deployment")
}

pub fn replica_set() -> KindId {
    KindId::new("apps", "v1", "ReplicaSet")
}

pub fn stateful_set() -> KindId {
    KindId::new("apps", "v1", "StatefulSet")
}

pub fn daemon_set() -> KindId {
    KindId::new("apps", "v1", "DaemonSet")
}
