//! Command line and environment configuration
use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::template::{TemplateData, TemplateError, DEFAULT_RESOURCES};

/// Errors loading the configured template
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configured file could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// File being read
        path: PathBuf,
        /// Read failure
        #[source]
        source: std::io::Error,
    },

    /// The arguments file is not valid YAML or JSON
    #[error("failed to parse template arguments in {}: {source}", .path.display())]
    ParseArgs {
        /// Arguments file
        path: PathBuf,
        /// Parse failure
        #[source]
        source: serde_yaml::Error,
    },

    /// The arguments could not be attached to the template
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Reconcilers that can be enabled
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum ControllerKind {
    /// Lists SampleSvc objects
    Samplesvc,
    /// Lists WorkspaceManifest objects
    Workspacemanifest,
    /// Lists APIBindings and creates the templated resources
    Resource,
}

impl ControllerKind {
    /// Every controller, in start order
    pub fn all() -> Vec<Self> {
        vec![Self::Samplesvc, Self::Workspacemanifest, Self::Resource]
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Samplesvc => "samplesvc",
            Self::Workspacemanifest => "workspacemanifest",
            Self::Resource => "resource",
        };
        f.write_str(name)
    }
}

/// Arguments of the default template
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateArgs {
    /// Namespace of the created ConfigMap
    pub namespace: String,
    /// Value stored under `video_game`
    pub video_game: String,
}

/// Controller settings
#[derive(Parser, Debug, Clone)]
#[command(name = "workspace-resource-controller", version)]
#[command(about = "Reconciles kcp workspaces and creates templated resources in them", long_about = None)]
pub struct Settings {
    /// Template rendered for every APIBinding reconciliation
    #[arg(long, env = "WRC_TEMPLATE")]
    pub template: Option<PathBuf>,

    /// YAML or JSON file holding the template arguments
    #[arg(long, env = "WRC_TEMPLATE_ARGS")]
    pub template_args: Option<PathBuf>,

    /// Controllers to run
    #[arg(
        long,
        env = "WRC_CONTROLLERS",
        value_enum,
        value_delimiter = ',',
        default_values_t = ControllerKind::all()
    )]
    pub controllers: Vec<ControllerKind>,

    /// Talk to a plain cluster instead of kcp logical clusters
    #[arg(long, env = "WRC_SINGLE_CLUSTER")]
    pub single_cluster: bool,

    /// Namespace for namespaced objects that do not name one
    #[arg(long, env = "WRC_DEFAULT_NAMESPACE", default_value = "default")]
    pub default_namespace: String,

    /// Seconds to wait before retrying a failed reconciliation
    #[arg(long, env = "WRC_REQUEUE_AFTER_ERROR", default_value_t = 5)]
    pub requeue_after_error: u64,

    /// Concurrent reconciliations per controller, 0 for unbounded
    #[arg(long, env = "WRC_CONCURRENCY", default_value_t = 0)]
    pub concurrency: u16,
}

impl Settings {
    /// Delay before a failed reconciliation is retried
    pub fn error_requeue(&self) -> Duration {
        Duration::from_secs(self.requeue_after_error)
    }

    /// Whether `kind` should be started
    pub fn enabled(&self, kind: ControllerKind) -> bool {
        self.controllers.contains(&kind)
    }

    /// Enabled controllers in start order, each once
    pub fn enabled_controllers(&self) -> Vec<ControllerKind> {
        ControllerKind::all()
            .into_iter()
            .filter(|kind| self.enabled(*kind))
            .collect()
    }

    /// Load the configured template, falling back to the embedded default
    pub fn template_data(&self) -> Result<TemplateData, ConfigError> {
        let content = match &self.template {
            Some(path) => read(path)?,
            None => DEFAULT_RESOURCES.as_bytes().to_vec(),
        };
        let args: serde_json::Value = match &self.template_args {
            Some(path) => serde_yaml::from_slice(&read(path)?).map_err(|source| ConfigError::ParseArgs {
                path: path.clone(),
                source,
            })?,
            None => serde_json::to_value(self.default_args()).map_err(TemplateError::Arguments)?,
        };
        Ok(TemplateData::new(content, &args)?)
    }

    fn default_args(&self) -> TemplateArgs {
        TemplateArgs {
            namespace: self.default_namespace.clone(),
            video_game: "mario".into(),
        }
    }
}

fn read(path: &Path) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}
