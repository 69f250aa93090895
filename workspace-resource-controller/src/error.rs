//! Error handling in the controllers
use kube::{api::DynamicObject, core::GroupVersionKind};
use thiserror::Error;

use crate::{cluster::ClusterError, discovery::ResolveError, object::DecodeError, template::TemplateError};

/// Possible errors from a reconciliation
///
/// Documents are numbered from 1 in the order they appear in the rendered output.
#[derive(Error, Debug)]
pub enum Error {
    /// The resource template could not be rendered
    #[error("failed to render resources: {0}")]
    Template(#[from] TemplateError),

    /// A rendered document could not be decoded
    #[error("failed to decode document {index}: {reason}")]
    Decode {
        /// Position of the failing document
        index: usize,
        /// What was wrong with it
        #[source]
        reason: DecodeError,
    },

    /// The kind of a document is unknown to the target cluster
    #[error("failed to resolve {} {} for document {index}: {source}", .gvk.api_version(), .gvk.kind)]
    Resolution {
        /// Position of the failing document
        index: usize,
        /// Kind that could not be resolved
        gvk: GroupVersionKind,
        /// Resolution failure
        #[source]
        source: ResolveError,
    },

    /// The API server rejected a create
    #[error("problem creating document {index} {object:?}: {source}")]
    Apply {
        /// Position of the failing document
        index: usize,
        /// The object that was sent
        object: Box<DynamicObject>,
        /// Create failure
        #[source]
        source: kube::Error,
    },

    /// Listing the watched resources failed
    #[error("failed to list {kind}: {source}")]
    List {
        /// Kind being listed
        kind: String,
        /// List failure
        #[source]
        source: kube::Error,
    },

    /// No client could be produced for the logical cluster
    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

/// Convenient alias for `Result<T, Error>`
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// The document a batch failed on, if the failure is tied to one
    pub fn document(&self) -> Option<usize> {
        match self {
            Self::Decode { index, .. } | Self::Resolution { index, .. } | Self::Apply { index, .. } => {
                Some(*index)
            }
            _ => None,
        }
    }

    /// Whether the API server reported that the object already exists
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::Apply { source: kube::Error::Api(ae), .. } if ae.code == 409)
    }
}
