//! Runs the workspace controllers against kcp or a single cluster
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use kube::{Client, Config};
use tracing::info;
use tracing_subscriber::EnvFilter;
use workspace_resource_controller::{
    cluster::ClusterScope,
    config::Settings,
    controllers::{self, Context},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let settings = Settings::parse();

    let template = settings.template_data().context("loading resource template")?;
    let config = Config::infer().await.context("inferring kube config")?;
    info!(server = %config.cluster_url, single_cluster = settings.single_cluster, "starting");

    let scope = if settings.single_cluster {
        ClusterScope::Single(Client::try_from(config)?)
    } else {
        ClusterScope::Logical(config)
    };
    let ctx = Arc::new(Context::new(scope, template, &settings));
    controllers::run(ctx, &settings).await?;
    Ok(())
}
