//! Generic objects decoded from rendered documents
use kube::{
    api::{DynamicObject, TypeMeta},
    core::{GroupVersion, GroupVersionKind},
    Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Reasons a document could not be turned into a [`DecodedObject`]
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The document is not valid YAML or JSON
    #[error("invalid document: {0}")]
    Syntax(#[source] serde_yaml::Error),

    /// The document body is not a mapping
    #[error("document is not an object")]
    NotAnObject,

    /// `apiVersion` or `kind` is absent
    #[error("document has no apiVersion or kind")]
    MissingTypeMeta,

    /// `apiVersion` is not a valid group/version
    #[error("invalid apiVersion {0:?}")]
    InvalidApiVersion(String),

    /// The document does not fit the object shape
    #[error("malformed object: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// A resource record tagged with its kind/version identifier
///
/// The payload is fully generic; typed views are produced on demand with
/// [`DecodedObject::try_into_resource`].
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedObject {
    /// Kind/version identifier taken from the embedded type information
    pub gvk: GroupVersionKind,
    /// Metadata and remaining fields of the object
    pub object: DynamicObject,
}

impl DecodedObject {
    /// Decode a structured document, inferring the kind from `apiVersion` and `kind`
    pub fn decode(value: serde_json::Value) -> Result<Self, DecodeError> {
        let map = value.as_object().ok_or(DecodeError::NotAnObject)?;
        let field = |key: &str| map.get(key).and_then(|v| v.as_str()).unwrap_or_default().to_string();
        let types = TypeMeta {
            api_version: field("apiVersion"),
            kind: field("kind"),
        };
        let gvk = parse_type_meta(&types)?;
        let object: DynamicObject = serde_json::from_value(value).map_err(DecodeError::Malformed)?;
        Ok(Self { gvk, object })
    }

    /// Lift a typed resource into the generic representation
    pub fn from_resource<K>(resource: &K) -> Result<Self, DecodeError>
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        let mut value = serde_json::to_value(resource).map_err(DecodeError::Malformed)?;
        // typed structs do not always serialize their TypeMeta
        if let Some(map) = value.as_object_mut() {
            map.insert("apiVersion".into(), K::api_version(&()).into());
            map.insert("kind".into(), K::kind(&()).into());
        }
        Self::decode(value)
    }

    /// Convert into a strongly typed resource
    pub fn try_into_resource<K: DeserializeOwned>(self) -> Result<K, DecodeError> {
        let value = serde_json::to_value(&self.object).map_err(DecodeError::Malformed)?;
        serde_json::from_value(value).map_err(DecodeError::Malformed)
    }

    /// Name of the object, empty when unset
    pub fn name(&self) -> String {
        self.object.name_any()
    }

    /// Namespace of the object, if any
    pub fn namespace(&self) -> Option<String> {
        self.object.namespace()
    }

    /// The generic representation handed to the API transport
    pub fn into_dynamic(self) -> DynamicObject {
        self.object
    }
}

fn parse_type_meta(types: &TypeMeta) -> Result<GroupVersionKind, DecodeError> {
    if types.api_version.is_empty() || types.kind.is_empty() {
        return Err(DecodeError::MissingTypeMeta);
    }
    let gv: GroupVersion = types
        .api_version
        .parse()
        .map_err(|_| DecodeError::InvalidApiVersion(types.api_version.clone()))?;
    if gv.version.is_empty() || gv.version.contains('/') {
        return Err(DecodeError::InvalidApiVersion(types.api_version.clone()));
    }
    Ok(GroupVersionKind::gvk(&gv.group, &gv.version, &types.kind))
}
