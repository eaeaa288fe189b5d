use anyhow::Context;
use farcal::{config::ServiceConfig, model::Predictor, server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = ServiceConfig::from_env()?;

    // No model, no service.
    let predictor = Predictor::load(&cfg.bundle_path)
        .with_context(|| format!("failed to load model bundle {}", cfg.bundle_path.display()))?;

    let warm = predictor.warmup().context("warmup forward failed")?;
    tracing::info!("warmup forward ok ({warm:.1})");
    tracing::info!(
        "loaded {} model {:?}; features[{}]: {:?}",
        predictor.model_kind(),
        predictor.name().unwrap_or("unnamed"),
        predictor.features().len(),
        predictor.features()
    );

    let app = server::router(server::AppState::new(predictor, cfg.log_pred));

    let addr = cfg.socket_addr();
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
