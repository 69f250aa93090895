//! Observes SampleSvc objects
use std::sync::Arc;

use kube::{runtime::controller::Action, ResourceExt};
use tracing::{info, instrument};

use super::Context;
use crate::{crd::SampleSvc, error::Result};

/// Log how many SampleSvc objects exist across all workspaces
#[instrument(skip(obj, ctx), fields(name = %obj.name_any()))]
pub async fn reconcile(obj: Arc<SampleSvc>, ctx: Arc<Context>) -> Result<Action> {
    let cluster = ctx.cluster_of(obj.as_ref())?;
    let count = ctx.count_all::<SampleSvc>().await?;
    info!(%cluster, count, "Listed all samplesvcs across all workspaces");
    Ok(Action::await_change())
}
