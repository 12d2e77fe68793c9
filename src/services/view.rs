/// Stateful dashboard view with last-request-wins refresh semantics.
// The client never cancels an outstanding request when a new one starts.
// Each refresh takes a ticket; a result is applied only if its ticket is still
// the latest, otherwise it is dropped.

use crate::domain::ForecastPayload;
use crate::errors::{ClientError, ClientResult};
use crate::notify::{alert_message, plan_critical_alert, NotificationHandle, Notifier};
use crate::services::dashboard::{DashboardView, Selection};
use crate::services::risk::next_critical_hour_local;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    Stale,
}

/// Dismissible error banner
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewError {
    pub code: &'static str,
    pub message: String,
}

impl From<&ClientError> for ViewError {
    fn from(err: &ClientError) -> Self {
        Self {
            code: err.code(),
            message: err.user_message(),
        }
    }
}

/// Serializable state of the view at one instant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSnapshot {
    pub selection: Selection,
    pub loading: bool,
    pub error: Option<ViewError>,
    pub dashboard: Option<DashboardView>,
    pub alert_scheduled: bool,
}

pub struct ForecastView {
    selection: Selection,
    payload: Option<Arc<ForecastPayload>>,
    error: Option<ViewError>,
    loading: bool,
    generation: u64,
    alert: Option<NotificationHandle>,
    notifier: Arc<dyn Notifier>,
}

impl ForecastView {
    pub fn new(selection: Selection, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            selection,
            payload: None,
            error: None,
            loading: false,
            generation: 0,
            alert: None,
            notifier,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn payload(&self) -> Option<Arc<ForecastPayload>> {
        self.payload.clone()
    }

    pub fn error(&self) -> Option<&ViewError> {
        self.error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Switch location or options. Outstanding refreshes become stale and the
    /// previous payload, which belongs to the old selection, is dropped along
    /// with its alert.
    pub fn select(&mut self, selection: Selection) {
        debug!(state = ?selection.state, lat = selection.lat, lon = selection.lon, "selection changed");
        self.selection = selection;
        self.generation += 1;
        self.loading = false;
        self.payload = None;
        self.alert = None;
    }

    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.generation += 1;
        self.loading = true;
        self.error = None;
        RefreshTicket(self.generation)
    }

    pub fn is_current(&self, ticket: RefreshTicket) -> bool {
        ticket.0 == self.generation
    }

    /// Apply the result of the refresh identified by `ticket`.
    ///
    /// Success replaces the payload wholesale; failure clears it and raises a
    /// dismissible error.
    pub fn complete(
        &mut self,
        ticket: RefreshTicket,
        result: ClientResult<ForecastPayload>,
        now: DateTime<Utc>,
    ) -> RefreshOutcome {
        if !self.is_current(ticket) {
            debug!(ticket = ticket.0, current = self.generation, "discarding stale result");
            return RefreshOutcome::Stale;
        }
        self.loading = false;

        match result {
            Ok(payload) => {
                info!(risk = %payload.risk, points = payload.forecast.len(), "forecast refreshed");
                self.error = None;
                self.replan_alert(&payload, now);
                self.payload = Some(Arc::new(payload));
            }
            Err(e) => {
                warn!(error = %e, "forecast refresh failed");
                self.payload = None;
                self.alert = None;
                self.error = Some(ViewError::from(&e));
            }
        }
        RefreshOutcome::Applied
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    fn replan_alert(&mut self, payload: &ForecastPayload, now: DateTime<Utc>) {
        let critical = payload
            .next_critical_hour()
            .or_else(|| next_critical_hour_local(payload, now));

        // replacing the handle cancels the previous alert
        self.alert = match (critical, plan_critical_alert(critical, now)) {
            (Some(critical), Some(fire_at)) => {
                Some(self.notifier.schedule(fire_at, alert_message(critical)))
            }
            _ => None,
        };
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> ViewSnapshot {
        ViewSnapshot {
            selection: self.selection.clone(),
            loading: self.loading,
            error: self.error.clone(),
            dashboard: self
                .payload
                .as_ref()
                .map(|p| DashboardView::build(&self.selection, p, now)),
            alert_scheduled: self.alert.as_ref().map(|a| a.is_pending()).unwrap_or(false),
        }
    }
}
