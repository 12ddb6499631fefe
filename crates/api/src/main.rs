use devtrack_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    devtrack_observability::init();

    let config = ApiConfig::from_env()?;
    tracing::info!(?config, "starting devtrack api");

    let app = devtrack_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
