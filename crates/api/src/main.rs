use anyhow::Context;

use agriportal_api::config::GatewayConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    agriportal_observability::init();

    let config = GatewayConfig::from_env().context("invalid gateway configuration")?;
    let app = agriportal_api::app::build_app(&config);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        login_path = %config.login_path,
        "gateway listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
