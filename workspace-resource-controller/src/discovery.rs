//! Resolution of kinds to API resource locations
use std::{collections::HashMap, future::Future};

use kube::{
    core::GroupVersionKind,
    discovery::{self, ApiResource, Scope},
    error::DiscoveryError,
    Client,
};
use thiserror::Error;

/// Failure to locate the API serving a kind
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The target cluster does not serve the kind
    #[error("no resource for {} {} in the target cluster", .0.api_version(), .0.kind)]
    UnknownKind(GroupVersionKind),

    /// Discovery itself failed
    #[error("discovery failed: {0}")]
    Discovery(#[source] kube::Error),
}

/// Where instances of a kind are addressed
#[derive(Clone, Debug)]
pub struct ResourceLocation {
    /// Group, version and plural used to build request paths
    pub resource: ApiResource,
    /// Whether instances live inside a namespace
    pub scope: Scope,
}

impl ResourceLocation {
    /// Location of a namespaced kind
    pub fn namespaced(resource: ApiResource) -> Self {
        Self {
            resource,
            scope: Scope::Namespaced,
        }
    }

    /// Location of a cluster scoped kind
    pub fn cluster(resource: ApiResource) -> Self {
        Self {
            resource,
            scope: Scope::Cluster,
        }
    }
}

/// Maps kind/version identifiers to resource locations
pub trait Resolver {
    /// Find the location serving `gvk`
    fn resolve(
        &self,
        gvk: &GroupVersionKind,
    ) -> impl Future<Output = Result<ResourceLocation, ResolveError>> + Send;
}

/// Resolves kinds by querying the API server for the kind's group version
///
/// Each lookup is a fresh request; nothing is cached between calls.
#[derive(Clone)]
pub struct DiscoveryResolver {
    client: Client,
}

impl DiscoveryResolver {
    /// Resolve against the cluster behind `client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Resolver for DiscoveryResolver {
    async fn resolve(&self, gvk: &GroupVersionKind) -> Result<ResourceLocation, ResolveError> {
        match discovery::pinned_kind(&self.client, gvk).await {
            Ok((resource, caps)) => Ok(ResourceLocation {
                resource,
                scope: caps.scope,
            }),
            Err(kube::Error::Discovery(DiscoveryError::MissingKind(_))) => {
                Err(ResolveError::UnknownKind(gvk.clone()))
            }
            // group version not served at all
            Err(kube::Error::Api(ae)) if ae.code == 404 => Err(ResolveError::UnknownKind(gvk.clone())),
            Err(e) => Err(ResolveError::Discovery(e)),
        }
    }
}

/// Resolves kinds from a fixed table
#[derive(Clone, Debug, Default)]
pub struct StaticResolver {
    locations: HashMap<GroupVersionKind, ResourceLocation>,
}

impl StaticResolver {
    /// Register a location under the kind it serves
    #[must_use]
    pub fn with(mut self, location: ResourceLocation) -> Self {
        let ar = &location.resource;
        let gvk = GroupVersionKind::gvk(&ar.group, &ar.version, &ar.kind);
        self.locations.insert(gvk, location);
        self
    }
}

impl Resolver for StaticResolver {
    async fn resolve(&self, gvk: &GroupVersionKind) -> Result<ResourceLocation, ResolveError> {
        self.locations
            .get(gvk)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownKind(gvk.clone()))
    }
}
