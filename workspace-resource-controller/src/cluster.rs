//! Logical cluster addressing
//!
//! kcp serves every logical cluster from the same API server under a path prefix
//! `/clusters/<name>`. Objects observed through a wildcard watch carry the name of
//! their logical cluster in the [`CLUSTER_ANNOTATION`] annotation.
use std::fmt;

use kube::{Client, Config, Resource, ResourceExt};
use thiserror::Error;

/// Annotation naming the logical cluster an object was read from
pub const CLUSTER_ANNOTATION: &str = "kcp.dev/cluster";

const WILDCARD: &str = "*";

/// Errors building a client for a logical cluster
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Writes need a concrete cluster
    #[error("object does not name its logical cluster")]
    MissingCluster,

    /// The scoped server url could not be formed
    #[error("invalid url for logical cluster {cluster}: {source}")]
    InvalidUrl {
        /// Cluster being addressed
        cluster: LogicalCluster,
        /// Parse failure
        #[source]
        source: http::uri::InvalidUri,
    },

    /// The client could not be constructed
    #[error("failed to create client for logical cluster {cluster}: {source}")]
    Client {
        /// Cluster being addressed
        cluster: LogicalCluster,
        /// Client construction failure
        #[source]
        source: kube::Error,
    },
}

/// Name of a kcp logical cluster, e.g. `root:org:workspace`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LogicalCluster(String);

impl LogicalCluster {
    /// Name a logical cluster
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The pseudo cluster spanning all logical clusters
    pub fn wildcard() -> Self {
        Self(WILDCARD.into())
    }

    /// Whether this is the wildcard cluster
    pub fn is_wildcard(&self) -> bool {
        self.0 == WILDCARD
    }

    /// The cluster name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read the logical cluster an object was observed in
    pub fn from_resource<K: Resource>(obj: &K) -> Option<Self> {
        obj.annotations()
            .get(CLUSTER_ANNOTATION)
            .filter(|name| !name.is_empty())
            .map(|name| Self::new(name.as_str()))
    }

    /// Path prefix addressing this cluster
    pub fn path(&self) -> String {
        format!("/clusters/{}", self.0)
    }

    /// Point `base` at this cluster, replacing any cluster already in the url
    pub fn scope_url(&self, base: &http::Uri) -> Result<http::Uri, ClusterError> {
        let base = base.to_string();
        let root = match base.find("/clusters/") {
            Some(idx) => &base[..idx],
            None => base.trim_end_matches('/'),
        };
        format!("{root}{}", self.path())
            .parse()
            .map_err(|source| ClusterError::InvalidUrl {
                cluster: self.clone(),
                source,
            })
    }
}

impl fmt::Display for LogicalCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How requests are routed to logical clusters
#[derive(Clone)]
pub enum ClusterScope {
    /// kcp: one server, a path prefix per logical cluster
    Logical(Config),
    /// A plain cluster: every logical cluster maps to the same client
    Single(Client),
}

impl ClusterScope {
    /// A client addressing `cluster`
    ///
    /// Each call constructs a new client; nothing is shared between reconciliations.
    pub fn client_for(&self, cluster: &LogicalCluster) -> Result<Client, ClusterError> {
        match self {
            Self::Single(client) => Ok(client.clone()),
            Self::Logical(config) => {
                let mut config = config.clone();
                config.cluster_url = cluster.scope_url(&config.cluster_url)?;
                Client::try_from(config).map_err(|source| ClusterError::Client {
                    cluster: cluster.clone(),
                    source,
                })
            }
        }
    }

    /// A client spanning all logical clusters, used for watches and listing
    pub fn wildcard_client(&self) -> Result<Client, ClusterError> {
        self.client_for(&LogicalCluster::wildcard())
    }

    /// Whether writes require a named logical cluster
    pub fn is_logical(&self) -> bool {
        matches!(self, Self::Logical(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ConfigMap;
    use kube::api::ObjectMeta;

    #[test]
    fn scopes_plain_server_urls() {
        let base: http::Uri = "https://kcp.example.com:6443".parse().unwrap();
        let url = LogicalCluster::new("root:org:ws").scope_url(&base).unwrap();
        assert_eq!(url.to_string(), "https://kcp.example.com:6443/clusters/root:org:ws");
    }

    #[test]
    fn replaces_existing_cluster_in_url() {
        let base: http::Uri = "https://kcp.example.com:6443/clusters/root".parse().unwrap();
        let url = LogicalCluster::wildcard().scope_url(&base).unwrap();
        assert_eq!(url.to_string(), "https://kcp.example.com:6443/clusters/*");
    }

    #[test]
    fn reads_cluster_from_annotation() {
        let mut cm = ConfigMap {
            metadata: ObjectMeta {
                name: Some("a".into()),
                ..ObjectMeta::default()
            },
            ..ConfigMap::default()
        };
        assert_eq!(LogicalCluster::from_resource(&cm), None);

        cm.annotations_mut()
            .insert(CLUSTER_ANNOTATION.into(), "root:users:alice".into());
        let cluster = LogicalCluster::from_resource(&cm).unwrap();
        assert_eq!(cluster.as_str(), "root:users:alice");
        assert_eq!(cluster.path(), "/clusters/root:users:alice");
        assert!(!cluster.is_wildcard());
        assert!(LogicalCluster::wildcard().is_wildcard());
    }
}
