use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autopunch::{config::Config, router::router, scheduler, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    if config.credentials.email.is_empty() || config.credentials.password.is_empty() {
        tracing::warn!("⚠️ RI_EMAIL or RI_PASSWORD is not set, logins will fail");
    }

    let state = AppState::new(&config)?;
    tracing::info!(
        "📍 Office at ({}, {}), radius {}m, location required for cron check-in: {}",
        config.office.lat,
        config.office.lng,
        config.office.radius_meters,
        config.features.require_location
    );

    if let Err(e) = state.orchestrator.login().await {
        tracing::warn!("⚠️ Initial login failed, the next attempt will retry: {}", e);
    }

    let _scheduler = scheduler::start(state.orchestrator.clone(), &config.schedule).await?;
    tracing::info!("✅ Daily attendance jobs started");

    let app = router(state)?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("🚀 Server listening on http://{}", config.bind_addr);
    tracing::info!("✅ All systems operational");

    axum::serve(listener, app).await?;

    Ok(())
}
