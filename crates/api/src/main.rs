use anyhow::Context;

use deckgen_infra::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    deckgen_observability::init();

    let settings = Settings::from_env().context("invalid configuration")?;
    let state = deckgen_api::app::services::build_services(&settings).await?;
    let app = deckgen_api::app::build_app(state);

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
