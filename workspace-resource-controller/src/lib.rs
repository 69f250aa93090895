//! Controllers that watch kcp workspaces and create templated resources in them.
//!
//! # Overview
//!
//! Three reconcilers run on top of [`kube::runtime::Controller`]:
//!
//! - [`controllers::samplesvc`] and [`controllers::workspace_manifest`] list their kinds across all
//!   logical clusters and log the count
//! - [`controllers::resource`] does the same for kcp `APIBinding`s, then renders a
//!   [`template`] and creates every object in it through the dynamic api with an [`apply::Applier`]
//!
//! The applier is usable on its own:
//!
//! ```no_run
//! use kube::Client;
//! use workspace_resource_controller::{apply::Applier, template::render_resources};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::try_default().await?;
//!     let rendered = render_resources(
//!         b"apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: {{.Name}}\n",
//!         &serde_json::json!({ "Name": "example" }),
//!     )?;
//!     for obj in Applier::new(client).apply(&rendered).await? {
//!         println!("created {:?}", obj.metadata.name);
//!     }
//!     Ok(())
//! }
//! ```
pub mod apply;
pub mod cluster;
pub mod config;
pub mod controllers;
pub mod crd;
pub mod discovery;
pub mod error;
pub mod object;
pub mod template;

pub use error::{Error, Result};
