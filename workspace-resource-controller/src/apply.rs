//! Creation of rendered documents through the dynamic api
//!
//! A rendered document set is split into its documents, each document is decoded into a
//! [`DecodedObject`], its kind is resolved to a [`ResourceLocation`], and the object is
//! created there. Documents are handled strictly in order and the first failure ends the
//! batch. Objects created before the failure stay in place.
use kube::{
    api::{Api, DynamicObject, PostParams},
    discovery::Scope,
    Client, ResourceExt,
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    discovery::{DiscoveryResolver, Resolver},
    error::{Error, Result},
    object::{DecodeError, DecodedObject},
};

/// One non-empty document of a rendered document set
#[derive(Clone, Debug, PartialEq)]
pub struct RawDocument {
    /// Position among the non-empty documents, starting at 1
    pub index: usize,
    /// The parsed document
    pub value: serde_json::Value,
}

/// Split a YAML or JSON stream into its non-empty documents
///
/// Invalid input fails the whole set before any document is returned.
pub fn split_documents(rendered: &[u8]) -> Result<Vec<RawDocument>> {
    let mut docs = Vec::new();
    for de in serde_yaml::Deserializer::from_slice(rendered) {
        let index = docs.len() + 1;
        let value = decode_document(de).map_err(|e| Error::Decode {
            index,
            reason: DecodeError::Syntax(e),
        })?;
        if value.is_null() {
            continue;
        }
        docs.push(RawDocument { index, value });
    }
    Ok(docs)
}

/// Parse one document, expanding `<<` merge keys
fn decode_document(de: serde_yaml::Deserializer<'_>) -> Result<serde_json::Value, serde_yaml::Error> {
    let mut value = serde_yaml::Value::deserialize(de)?;
    value.apply_merge()?;
    serde_yaml::from_value(value)
}

/// Creates every object of a rendered document set
pub struct Applier<R = DiscoveryResolver> {
    client: Client,
    resolver: R,
    namespace: String,
}

impl Applier {
    /// Apply against `client`, resolving kinds through discovery on the same client
    pub fn new(client: Client) -> Self {
        let resolver = DiscoveryResolver::new(client.clone());
        Self::with_resolver(client, resolver)
    }
}

impl<R: Resolver> Applier<R> {
    /// Apply against `client`, resolving kinds with `resolver`
    pub fn with_resolver(client: Client, resolver: R) -> Self {
        let namespace = client.default_namespace().to_string();
        Self {
            client,
            resolver,
            namespace,
        }
    }

    /// Namespace for namespaced objects that do not set one
    #[must_use]
    pub fn default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Create the objects of `rendered` in document order
    ///
    /// Returns the objects as stored by the API server.
    pub async fn apply(&self, rendered: &[u8]) -> Result<Vec<DynamicObject>> {
        let docs = split_documents(rendered)?;
        debug!(count = docs.len(), "decoded documents");
        let mut created = Vec::with_capacity(docs.len());
        for doc in docs {
            created.push(self.create(doc).await?);
        }
        Ok(created)
    }

    async fn create(&self, doc: RawDocument) -> Result<DynamicObject> {
        let index = doc.index;
        let decoded = DecodedObject::decode(doc.value).map_err(|reason| Error::Decode { index, reason })?;
        let location = self
            .resolver
            .resolve(&decoded.gvk)
            .await
            .map_err(|source| Error::Resolution {
                index,
                gvk: decoded.gvk.clone(),
                source,
            })?;

        let mut obj = decoded.into_dynamic();
        let api = match location.scope {
            Scope::Cluster => Api::all_with(self.client.clone(), &location.resource),
            Scope::Namespaced => {
                let ns = obj.namespace().unwrap_or_else(|| self.namespace.clone());
                obj.metadata.namespace = Some(ns.clone());
                Api::namespaced_with(self.client.clone(), &ns, &location.resource)
            }
        };
        info!(
            kind = %location.resource.kind,
            name = %obj.name_any(),
            namespace = %obj.namespace().unwrap_or_default(),
            "Creating object"
        );
        match api.create(&PostParams::default(), &obj).await {
            Ok(stored) => Ok(stored),
            Err(source) => Err(Error::Apply {
                index,
                object: Box::new(obj),
                source,
            }),
        }
    }
}
