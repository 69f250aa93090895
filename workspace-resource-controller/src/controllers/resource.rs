//! Creates the templated resources in the workspace of every APIBinding
//!
//! Creation is not idempotent: reconciling the same binding again attempts to create the
//! same objects and fails with an already exists error, which is left to the error policy.
use std::sync::Arc;

use kube::{runtime::controller::Action, ResourceExt};
use tracing::{info, instrument};

use super::Context;
use crate::{apply::Applier, crd::APIBinding, error::Result};

/// Render the configured template and create its objects in the binding's logical cluster
#[instrument(skip(obj, ctx), fields(name = %obj.name_any()))]
pub async fn reconcile(obj: Arc<APIBinding>, ctx: Arc<Context>) -> Result<Action> {
    let cluster = ctx.cluster_of(obj.as_ref())?;
    let count = ctx.count_all::<APIBinding>().await?;
    info!(%cluster, count, "Resource controller listed all APIBindings across all workspaces");

    let rendered = ctx.template.render()?;
    let client = ctx.scope.client_for(&cluster)?;
    let created = Applier::new(client)
        .default_namespace(ctx.default_namespace.as_str())
        .apply(&rendered)
        .await?;
    info!(%cluster, created = created.len(), "created resources from template");
    Ok(Action::await_change())
}
