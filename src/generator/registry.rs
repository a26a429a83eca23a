//! Static namespace -> service -> producer registry
//!
//! Every registered service is started once per declared cluster. A cluster
//! contributes the `cluster` and `env` labels and a `pod` metadata entry.

use super::Producer;
use crate::core::{
    labels::{CLUSTER_LABEL, ENV_LABEL, NAMESPACE_LABEL, SERVICE_NAME_LABEL},
    LabelSet, Metadata,
};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub const POD_METADATA: &str = "pod";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cluster {
    pub name: String,
    pub env: String,
}

impl Cluster {
    pub fn new(name: impl Into<String>, env: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            env: env.into(),
        }
    }
}

/// Clusters the generator fans out to unless told otherwise
pub fn default_clusters() -> Vec<Cluster> {
    vec![
        Cluster::new("us-east-1", "prod"),
        Cluster::new("eu-west-1", "prod"),
        Cluster::new("us-west-2", "dev"),
    ]
}

pub struct ServiceEntry {
    pub namespace: String,
    pub service: String,
    pub producer: Producer,
}

impl std::fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceEntry")
            .field("namespace", &self.namespace)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct Registry {
    entries: Vec<ServiceEntry>,
    clusters: Vec<Cluster>,
}

impl Registry {
    pub fn new(clusters: Vec<Cluster>) -> Self {
        Self {
            entries: Vec::new(),
            clusters,
        }
    }

    /// Register a producer; an existing (namespace, service) entry is replaced
    pub fn register(
        &mut self,
        namespace: impl Into<String>,
        service: impl Into<String>,
        producer: Producer,
    ) {
        let namespace = namespace.into();
        let service = service.into();

        match self
            .entries
            .iter_mut()
            .find(|entry| entry.namespace == namespace && entry.service == service)
        {
            Some(entry) => entry.producer = producer,
            None => self.entries.push(ServiceEntry {
                namespace,
                service,
                producer,
            }),
        }
    }

    #[must_use]
    pub fn with_service(
        mut self,
        namespace: impl Into<String>,
        service: impl Into<String>,
        producer: Producer,
    ) -> Self {
        self.register(namespace, service, producer);
        self
    }

    pub fn entries(&self) -> &[ServiceEntry] {
        &self.entries
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Number of producer tasks a full dispatch starts
    pub fn task_count(&self) -> usize {
        self.entries.len() * self.clusters.len()
    }

    /// Call `f` with the labels and metadata of `service` in every cluster
    pub fn for_all_clusters<F>(&self, namespace: &str, service: &str, mut f: F)
    where
        F: FnMut(&Cluster, LabelSet, Metadata),
    {
        for cluster in &self.clusters {
            let labels = stream_labels(namespace, service, cluster);
            let metadata = Metadata::new().with_entry(POD_METADATA, pod_name(service, cluster));
            f(cluster, labels, metadata);
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(default_clusters())
    }
}

/// Base labels of one service instance
pub fn stream_labels(namespace: &str, service: &str, cluster: &Cluster) -> LabelSet {
    LabelSet::from([
        (NAMESPACE_LABEL, namespace),
        (SERVICE_NAME_LABEL, service),
        (CLUSTER_LABEL, cluster.name.as_str()),
        (ENV_LABEL, cluster.env.as_str()),
    ])
}

/// Stable pod name for `service` in `cluster`
pub fn pod_name(service: &str, cluster: &Cluster) -> String {
    let mut hasher = DefaultHasher::new();
    cluster.name.hash(&mut hasher);
    service.hash(&mut hasher);
    format!("{}-{:05x}", service, hasher.finish() & 0xf_ffff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::producer;

    fn noop() -> Producer {
        producer(|_ctx| async {})
    }

    #[test]
    fn test_for_all_clusters_fans_out() {
        let registry = Registry::default().with_service("gateway", "nginx", noop());
        let mut seen = Vec::new();

        registry.for_all_clusters("gateway", "nginx", |cluster, labels, metadata| {
            seen.push((cluster.name.clone(), labels, metadata));
        });

        assert_eq!(seen.len(), 3);
        let (cluster, labels, metadata) = &seen[0];
        assert_eq!(cluster, "us-east-1");
        assert_eq!(labels.get("cluster"), Some("us-east-1"));
        assert_eq!(labels.get("env"), Some("prod"));
        assert_eq!(labels.get("namespace"), Some("gateway"));
        assert_eq!(labels.get("service_name"), Some("nginx"));
        assert!(metadata.first("pod").unwrap().starts_with("nginx-"));
    }

    #[test]
    fn test_register_replaces_duplicates() {
        let mut registry = Registry::new(vec![Cluster::new("c1", "dev")]);
        registry.register("shop", "web-api", noop());
        registry.register("shop", "web-api", noop());
        registry.register("data", "web-api", noop());

        assert_eq!(registry.entries().len(), 2);
        assert_eq!(registry.task_count(), 2);
    }

    #[test]
    fn test_pod_name_is_stable_per_cluster() {
        let east = Cluster::new("us-east-1", "prod");
        let west = Cluster::new("us-west-2", "dev");

        assert_eq!(pod_name("db", &east), pod_name("db", &east));
        assert_ne!(pod_name("db", &east), pod_name("db", &west));
    }
}
