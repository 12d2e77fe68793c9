/// HTTP request handlers
use crate::domain::{BoundingBox, ExecutionMode, OverlayRequest};
use crate::errors::{ApiError, ApiResult};
use crate::services::export::{forecast_csv, weather_csv, FORECAST_CSV_NAME, WEATHER_CSV_NAME};
use crate::services::{DashboardService, DashboardView, Selection, ViewOptions, ViewSnapshot};
use crate::states;
use crate::utils::parse_utc;
use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<DashboardService>,
}

/// Successful response wrapper
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub ok: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self { ok: true, data }
    }
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub now: DateTime<Utc>,
    pub upstream: String,
}

/// Location and options, shared by `GET /dashboard` and `POST /view/select`
#[derive(Debug, Default, Deserialize)]
pub struct SelectionQuery {
    pub state: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub use_satellite: bool,
    #[serde(default)]
    pub require_satellite: bool,
    pub mode: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl SelectionQuery {
    /// A known state name wins over raw coordinates
    pub fn into_selection(self) -> ApiResult<Selection> {
        let base = match (&self.state, self.lat, self.lon) {
            (Some(name), _, _) => {
                let st = states::find(name)
                    .ok_or_else(|| ApiError::NotFound(format!("unknown state '{}'", name)))?;
                Selection::named(st.name, st.lat, st.lon)
            }
            (None, Some(lat), Some(lon)) => Selection::point(lat, lon),
            _ => {
                return Err(ApiError::InvalidInput(
                    "either state or lat and lon are required".to_string(),
                ))
            }
        };

        let mut options = ViewOptions {
            use_satellite: self.use_satellite,
            require_satellite: self.require_satellite,
            ..ViewOptions::default()
        };
        if let Some(mode) = self.mode.as_deref() {
            options.mode = mode.parse::<ExecutionMode>()?;
        }
        options.start = parse_time("start", self.start.as_deref())?;
        options.end = parse_time("end", self.end.as_deref())?;
        if let Some(ms) = self.timeout_ms {
            options.timeout = Duration::from_millis(ms);
        }

        let selection = base.with_options(options);
        // reject bad input before it reaches the shared view
        selection.to_request()?;
        Ok(selection)
    }
}

fn parse_time(field: &str, raw: Option<&str>) -> ApiResult<Option<DateTime<Utc>>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_utc(s)
            .map(Some)
            .ok_or_else(|| ApiError::InvalidInput(format!("{} '{}' is not a UTC timestamp", field, s))),
    }
}

/// Health check handler
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        now: Utc::now(),
        upstream: state.dashboard.upstream().to_string(),
    })
}

/// One-shot dashboard for an arbitrary location
pub async fn get_dashboard(
    Query(query): Query<SelectionQuery>,
    State(state): State<AppState>,
) -> ApiResult<Json<SuccessResponse<DashboardView>>> {
    let selection = query.into_selection()?;
    let view = state.dashboard.load(&selection).await?;
    Ok(Json(SuccessResponse::new(view)))
}

/// Current state of the shared view
pub async fn view_get(State(state): State<AppState>) -> Json<SuccessResponse<ViewSnapshot>> {
    Json(SuccessResponse::new(state.dashboard.snapshot()))
}

pub async fn view_select(
    State(state): State<AppState>,
    Json(body): Json<SelectionQuery>,
) -> ApiResult<Json<SuccessResponse<ViewSnapshot>>> {
    let selection = body.into_selection()?;
    Ok(Json(SuccessResponse::new(state.dashboard.select(selection))))
}

/// Refresh the shared view; failures land in the snapshot's error banner
pub async fn view_refresh(State(state): State<AppState>) -> Json<SuccessResponse<ViewSnapshot>> {
    Json(SuccessResponse::new(state.dashboard.refresh().await))
}

pub async fn view_dismiss(State(state): State<AppState>) -> Json<SuccessResponse<ViewSnapshot>> {
    Json(SuccessResponse::new(state.dashboard.dismiss_error()))
}

pub async fn export_forecast(State(state): State<AppState>) -> ApiResult<Response> {
    let payload = state
        .dashboard
        .current_payload()
        .ok_or_else(|| ApiError::NotFound("no forecast loaded".to_string()))?;
    let csv = forecast_csv(&payload.forecast)
        .ok_or_else(|| ApiError::NotFound("forecast series is empty".to_string()))?;
    Ok(csv_response(FORECAST_CSV_NAME, csv))
}

pub async fn export_weather(State(state): State<AppState>) -> ApiResult<Response> {
    let payload = state
        .dashboard
        .current_payload()
        .ok_or_else(|| ApiError::NotFound("no forecast loaded".to_string()))?;
    let csv = weather_csv(&payload.weather)
        .ok_or_else(|| ApiError::NotFound("weather series is empty".to_string()))?;
    Ok(csv_response(WEATHER_CSV_NAME, csv))
}

fn csv_response(filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    #[serde(default)]
    pub use_satellite: bool,
}

/// Per-state risk for the choropleth
pub async fn states_summary(
    Query(query): Query<SummaryQuery>,
    State(state): State<AppState>,
) -> ApiResult<Json<Value>> {
    let summary = state.dashboard.states_summary(query.use_satellite).await?;
    Ok(Json(serde_json::json!(SuccessResponse::new(summary))))
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

pub async fn states_search(Query(query): Query<SearchQuery>) -> Json<Value> {
    let items = states::search(query.q.as_deref().unwrap_or(""));
    Json(serde_json::json!(SuccessResponse::new(serde_json::json!({
        "items": items
    }))))
}

#[derive(Debug, Default, Deserialize)]
pub struct OverlayQuery {
    pub bbox: Option<String>,
    #[serde(default)]
    pub prefer_l3: bool,
    pub hours: Option<u32>,
}

/// Satellite overlay passthrough. Without a bbox the current selection's area is used.
pub async fn overlay(
    Query(query): Query<OverlayQuery>,
    State(state): State<AppState>,
) -> ApiResult<Response> {
    let bbox = match query.bbox.as_deref() {
        Some(raw) => raw.parse::<BoundingBox>()?,
        None => state.dashboard.selection().bbox()?,
    };
    let request = OverlayRequest {
        bbox: Some(bbox),
        prefer_l3: query.prefer_l3,
        hours: query.hours,
    };

    let image = state.dashboard.overlay(&request).await?;
    let content_type = image
        .content_type
        .unwrap_or_else(|| "image/png".to_string());
    Ok(([(header::CONTENT_TYPE, content_type)], image.data).into_response())
}
