//! Custom resources watched by the controllers
use kube::{CustomResource, CustomResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Group of the resources owned by this project
pub const APPSTUDIO_GROUP: &str = "appstudio.redhat.com";

/// Desired state of a SampleSvc
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "appstudio.redhat.com",
    version = "v1alpha1",
    kind = "SampleSvc",
    plural = "samplesvcs",
    namespaced,
    status = "SampleSvcStatus"
)]
pub struct SampleSvcSpec {
    /// Example field, free form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foo: Option<String>,
}

/// Observed state of a SampleSvc
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct SampleSvcStatus {}

/// Desired state of a WorkspaceManifest
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "appstudio.redhat.com",
    version = "v1alpha1",
    kind = "WorkspaceManifest",
    plural = "workspacemanifests",
    namespaced,
    status = "WorkspaceManifestStatus"
)]
pub struct WorkspaceManifestSpec {
    /// Example field, free form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foo: Option<String>,
}

/// Observed state of a WorkspaceManifest
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct WorkspaceManifestStatus {}

/// Binding of a workspace to an exported API
///
/// The CRD is owned by kcp; only the fields read here are modelled.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[kube(
    group = "apis.kcp.dev",
    version = "v1alpha1",
    kind = "APIBinding",
    plural = "apibindings",
    status = "APIBindingStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct APIBindingSpec {
    /// The export being bound
    #[serde(default)]
    pub reference: ExportReference,
}

/// Reference to an APIExport
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportReference {
    /// Export living in a workspace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<WorkspaceExportReference>,
}

/// An APIExport by workspace path and name
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceExportReference {
    /// Workspace path, defaults to the binding's own workspace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Name of the APIExport
    #[serde(default)]
    pub export_name: String,
}

/// Observed state of an APIBinding
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct APIBindingStatus {
    /// Binding phase, e.g. `Binding` or `Bound`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

/// CRDs this project installs, as a multi-document YAML stream
pub fn crds_yaml() -> Result<String, serde_yaml::Error> {
    let mut out = String::new();
    for crd in [SampleSvc::crd(), WorkspaceManifest::crd()] {
        out.push_str("---\n");
        out.push_str(&serde_yaml::to_string(&crd)?);
    }
    Ok(out)
}
