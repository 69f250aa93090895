//! Reconcilers and their wiring into [`kube::runtime::Controller`]
//!
//! Every controller watches its kind across all logical clusters through a wildcard client.
//! Reconciliations never feed anything back into the watched objects; errors are handed to
//! the runtime which requeues them after a fixed delay.
use std::{fmt::Debug, sync::Arc, time::Duration};

use futures::{future::BoxFuture, FutureExt, StreamExt};
use kube::{
    api::{Api, ListParams},
    runtime::{
        controller::{self, Action},
        watcher, Controller,
    },
    Resource, ResourceExt,
};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::{
    cluster::{ClusterError, ClusterScope, LogicalCluster},
    config::{ControllerKind, Settings},
    error::{Error, Result},
    template::TemplateData,
};

pub mod resource;
pub mod samplesvc;
pub mod workspace_manifest;

/// State shared by all reconciliations
pub struct Context {
    /// Routing of requests to logical clusters
    pub scope: ClusterScope,
    /// Template rendered by the resource controller
    pub template: TemplateData,
    /// Namespace for namespaced objects that do not name one
    pub default_namespace: String,
    /// Delay before a failed reconciliation is retried
    pub error_requeue: Duration,
}

impl Context {
    /// Build the context from parsed settings
    pub fn new(scope: ClusterScope, template: TemplateData, settings: &Settings) -> Self {
        Self {
            scope,
            template,
            default_namespace: settings.default_namespace.clone(),
            error_requeue: settings.error_requeue(),
        }
    }

    /// The logical cluster `obj` was observed in
    ///
    /// Without kcp every object lives in the one cluster and the wildcard stands in for it.
    pub fn cluster_of<K: Resource>(&self, obj: &K) -> Result<LogicalCluster> {
        match LogicalCluster::from_resource(obj) {
            Some(cluster) => Ok(cluster),
            None if self.scope.is_logical() => Err(ClusterError::MissingCluster.into()),
            None => Ok(LogicalCluster::wildcard()),
        }
    }

    /// Count instances of `K` across all logical clusters
    pub async fn count_all<K>(&self) -> Result<usize>
    where
        K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug,
    {
        let api: Api<K> = Api::all(self.scope.wildcard_client()?);
        let list = api.list(&ListParams::default()).await.map_err(|source| Error::List {
            kind: K::kind(&()).to_string(),
            source,
        })?;
        Ok(list.items.len())
    }
}

/// Requeue every failure after the configured delay
pub fn error_policy<K: Resource>(obj: Arc<K>, error: &Error, ctx: Arc<Context>) -> Action {
    warn!(name = %obj.name_any(), document = ?error.document(), %error, "reconcile failed");
    Action::requeue(ctx.error_requeue)
}

/// Run the enabled controllers until shutdown is signalled
pub async fn run(ctx: Arc<Context>, settings: &Settings) -> Result<()> {
    let client = ctx.scope.wildcard_client()?;
    let config = controller::Config::default().concurrency(settings.concurrency);

    let mut controllers: Vec<BoxFuture<'static, ()>> = Vec::new();
    for kind in settings.enabled_controllers() {
        info!(controller = %kind, "starting controller");
        let fut = match kind {
            ControllerKind::Samplesvc => drive(
                Controller::new(Api::all(client.clone()), watcher::Config::default()),
                samplesvc::reconcile,
                config.clone(),
                ctx.clone(),
            ),
            ControllerKind::Workspacemanifest => drive(
                Controller::new(Api::all(client.clone()), watcher::Config::default()),
                workspace_manifest::reconcile,
                config.clone(),
                ctx.clone(),
            ),
            ControllerKind::Resource => drive(
                Controller::new(Api::all(client.clone()), watcher::Config::default()),
                resource::reconcile,
                config.clone(),
                ctx.clone(),
            ),
        };
        controllers.push(fut);
    }
    futures::future::join_all(controllers).await;
    info!("controllers shut down");
    Ok(())
}

fn drive<K, F, Fut>(
    controller: Controller<K>,
    reconcile: F,
    config: controller::Config,
    ctx: Arc<Context>,
) -> BoxFuture<'static, ()>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    F: FnMut(Arc<K>, Arc<Context>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<Action>> + Send + 'static,
{
    controller
        .with_config(config)
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => info!(object = %obj, "reconciled"),
                Err(error) => warn!(%error, "reconcile failed"),
            }
        })
        .boxed()
}
