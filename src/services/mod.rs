/// Business logic services layer
pub mod dashboard;
pub mod export;
pub mod risk;
pub mod series;
pub mod view;

pub use dashboard::{bbox_for_point, DashboardView, Selection, ViewOptions};
pub use risk::{
    bucket_from_index, compute_pollution_index, select_display_risk, select_display_risk_at,
    worst_of,
};
pub use series::merge_series_by_timestamp;
pub use view::{ForecastView, RefreshOutcome, ViewSnapshot};

use crate::clients::ForecastClient;
use crate::domain::{ForecastPayload, Overlay, OverlayRequest, StatesSummary};
use crate::errors::ClientResult;
use crate::notify::Notifier;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// Dashboard service: stateless lookups plus one shared stateful view
pub struct DashboardService {
    client: ForecastClient,
    view: Mutex<ForecastView>,
}

impl DashboardService {
    pub fn new(client: ForecastClient, initial: Selection, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            client,
            view: Mutex::new(ForecastView::new(initial, notifier)),
        }
    }

    /// Never held across an await point
    fn view(&self) -> MutexGuard<'_, ForecastView> {
        self.view.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn upstream(&self) -> &str {
        self.client.base_url()
    }

    pub fn selection(&self) -> Selection {
        self.view().selection().clone()
    }

    /// Fetch and render a dashboard for an arbitrary selection
    pub async fn load(&self, selection: &Selection) -> ClientResult<DashboardView> {
        let request = selection.to_request()?;
        let payload = self.client.fetch_forecast(&request).await?;
        Ok(DashboardView::build(selection, &payload, Utc::now()))
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.view().snapshot(Utc::now())
    }

    pub fn select(&self, selection: Selection) -> ViewSnapshot {
        let mut view = self.view();
        view.select(selection);
        view.snapshot(Utc::now())
    }

    pub fn dismiss_error(&self) -> ViewSnapshot {
        let mut view = self.view();
        view.dismiss_error();
        view.snapshot(Utc::now())
    }

    /// Refresh the shared view. Concurrent refreshes are allowed; only the
    /// latest one is applied.
    pub async fn refresh(&self) -> ViewSnapshot {
        let (ticket, request) = {
            let mut view = self.view();
            let request = view.selection().to_request();
            (view.begin_refresh(), request)
        };

        let result = match request {
            Ok(request) => self.client.fetch_forecast(&request).await,
            Err(e) => Err(e),
        };

        let mut view = self.view();
        if view.complete(ticket, result, Utc::now()) == RefreshOutcome::Stale {
            info!("refresh superseded by a newer request");
        }
        view.snapshot(Utc::now())
    }

    pub fn current_payload(&self) -> Option<Arc<ForecastPayload>> {
        self.view().payload()
    }

    pub async fn states_summary(&self, use_satellite: bool) -> ClientResult<StatesSummary> {
        self.client.fetch_states_summary(!use_satellite).await
    }

    pub async fn overlay(&self, request: &OverlayRequest) -> ClientResult<Overlay> {
        self.client.fetch_latest_overlay(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::domain::RiskBucket;
    use crate::notify::NoopNotifier;
    use axum::{extract::Query, routing::get, Json, Router};
    use serde_json::Value;
    use std::collections::HashMap;
    use std::time::Duration;

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router.into_make_service())
                .await
                .unwrap();
        });
        format!("http://{}", addr)
    }

    /// Upstream that answers slowly for Utah and immediately elsewhere
    async fn upstream() -> String {
        spawn(Router::new().route(
            "/forecast",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let lat: f64 = q["lat"].parse().unwrap();
                if lat < 39.5 {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                }
                let risk = if lat < 39.5 { "high" } else { "low" };
                Json::<Value>(serde_json::json!({
                    "lat": lat,
                    "lon": q["lon"].parse::<f64>().unwrap(),
                    "risk": risk,
                    "forecast": [{"datetime_utc": "2030-01-01T00:00:00Z", "no2_forecast": 1.0e14}]
                }))
            }),
        ))
        .await
    }

    fn service(base: &str) -> DashboardService {
        let client = ForecastClient::new(ClientConfig::new(base).with_timeout(Duration::from_secs(5)))
            .unwrap();
        DashboardService::new(
            client,
            Selection::named("Colorado", 39.7392, -104.9903),
            Arc::new(NoopNotifier),
        )
    }

    #[tokio::test]
    async fn test_load_stateless() {
        let svc = service(&upstream().await);
        let view = svc
            .load(&Selection::named("Colorado", 39.7392, -104.9903))
            .await
            .unwrap();
        assert_eq!(view.model_risk, RiskBucket::Low);
        assert_eq!(view.display_risk, RiskBucket::Low);
        assert!(svc.current_payload().is_none());
    }

    #[tokio::test]
    async fn test_refresh_updates_shared_view() {
        let svc = service(&upstream().await);
        let snap = svc.refresh().await;
        assert!(!snap.loading);
        assert!(snap.error.is_none());
        assert_eq!(snap.dashboard.unwrap().model_risk, RiskBucket::Low);
        assert!(svc.current_payload().is_some());
    }

    #[tokio::test]
    async fn test_stale_slow_refresh_is_discarded() {
        let svc = Arc::new(service(&upstream().await));

        svc.select(Selection::named("Utah", 39.3, -111.7));
        let slow = {
            let svc = svc.clone();
            tokio::spawn(async move { svc.refresh().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        svc.select(Selection::named("Colorado", 39.7392, -104.9903));
        let fast = svc.refresh().await;
        assert_eq!(fast.dashboard.unwrap().state.as_deref(), Some("Colorado"));

        let after_slow = slow.await.unwrap();
        let shown = after_slow.dashboard.unwrap();
        assert_eq!(shown.state.as_deref(), Some("Colorado"));
        assert_eq!(shown.model_risk, RiskBucket::Low);
    }

    #[tokio::test]
    async fn test_refresh_failure_sets_error() {
        let svc = service("http://127.0.0.1:9");
        svc.select(Selection::point(39.0, -105.0));
        let snap = svc.refresh().await;
        assert!(snap.dashboard.is_none());
        assert!(snap.error.is_some());
        let snap = svc.dismiss_error();
        assert!(snap.error.is_none());
    }
}
