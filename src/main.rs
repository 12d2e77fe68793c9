/// Main application entry point
use breath::clients::ForecastClient;
use breath::config::AppConfig;
use breath::handlers::AppState;
use breath::notify::TokioNotifier;
use breath::routes::build_router;
use breath::services::{DashboardService, Selection, ViewOptions};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Load configuration
    let config = AppConfig::from_env()?;
    info!(upstream = %config.client.base_url, "Configuration loaded successfully");

    let client = ForecastClient::new(config.client.clone())?;

    let defaults = &config.view;
    let initial = Selection {
        state: defaults.state.clone(),
        lat: defaults.lat,
        lon: defaults.lon,
        options: ViewOptions {
            use_satellite: defaults.use_satellite,
            mode: defaults.mode,
            timeout: defaults.timeout,
            ..ViewOptions::default()
        },
    };

    let dashboard = Arc::new(DashboardService::new(
        client,
        initial,
        Arc::new(TokioNotifier::new()),
    ));

    // Build router
    let app = build_router(AppState { dashboard });

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("breath dashboard listening on {}", config.listen_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
