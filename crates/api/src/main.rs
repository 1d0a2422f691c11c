use std::sync::Arc;

use anyhow::Context;

use farmgate_infra::AccessConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    farmgate_observability::init();

    let config = AccessConfig::from_env().context("invalid configuration")?;
    let services = farmgate_api::app::services::build_services(&config)
        .await
        .context("failed to initialize access control")?;

    let app = farmgate_api::app::build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
