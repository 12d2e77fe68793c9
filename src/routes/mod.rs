/// Application routes configuration
use crate::handlers::{
    export_forecast, export_weather, get_dashboard, health, overlay, states_search,
    states_summary, view_dismiss, view_get, view_refresh, view_select, AppState,
};
use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the application router with all routes
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

    Router::new()
        // Health check
        .route("/health", get(health))
        // Stateless dashboard
        .route("/dashboard", get(get_dashboard))
        // Shared view session
        .route("/view", get(view_get))
        .route("/view/select", post(view_select))
        .route("/view/refresh", post(view_refresh))
        .route("/view/dismiss", post(view_dismiss))
        // Exports of the current view
        .route("/export/forecast.csv", get(export_forecast))
        .route("/export/weather.csv", get(export_weather))
        // States
        .route("/states/summary", get(states_summary))
        .route("/states/search", get(states_search))
        .route("/overlay.png", get(overlay))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
