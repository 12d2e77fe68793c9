/// Dashboard view model: everything a renderer needs for one location.
use crate::domain::{
    BoundingBox, ExecutionMode, ForecastPayload, ForecastRequest, RiskBucket,
};
use crate::errors::ClientResult;
use crate::services::risk::{
    assess_at, bucket_from_aqi, next_critical_hour_local, select_display_risk_at,
};
use crate::utils::{chart_label, exponential, iso_utc, or_placeholder, PLACEHOLDER};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;

/// Padding of the satellite bbox around the selected point, degrees
pub const BBOX_PAD_LON: f64 = 1.5;
pub const BBOX_PAD_LAT: f64 = 1.2;

pub fn bbox_for_point(lat: f64, lon: f64) -> ClientResult<BoundingBox> {
    BoundingBox::around(lat, lon, BBOX_PAD_LON, BBOX_PAD_LAT)
}

/// Knobs of the single parameterized dashboard view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewOptions {
    pub use_satellite: bool,
    /// Missing satellite coverage is an error instead of a silent fallback
    pub require_satellite: bool,
    pub mode: ExecutionMode,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub timeout: Duration,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            use_satellite: false,
            require_satellite: false,
            mode: ExecutionMode::Fast,
            start: None,
            end: None,
            timeout: Duration::from_millis(15_000),
        }
    }
}

/// Location plus options currently shown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub options: ViewOptions,
}

impl Selection {
    pub fn point(lat: f64, lon: f64) -> Self {
        Self {
            state: None,
            lat,
            lon,
            options: ViewOptions::default(),
        }
    }

    pub fn named(state: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            state: Some(state.into()),
            ..Self::point(lat, lon)
        }
    }

    pub fn with_options(mut self, options: ViewOptions) -> Self {
        self.options = options;
        self
    }

    pub fn bbox(&self) -> ClientResult<BoundingBox> {
        bbox_for_point(self.lat, self.lon)
    }

    pub fn to_request(&self) -> ClientResult<ForecastRequest> {
        let opts = &self.options;
        let satellite = opts.use_satellite || opts.require_satellite;
        let mut req = ForecastRequest::new(self.lat, self.lon)
            .mode(opts.mode)
            .bbox(self.bbox()?)
            .timeout(opts.timeout)
            .skip_satellite_source(!satellite)
            .require_satellite_source(opts.require_satellite);
        req.start = opts.start;
        req.end = opts.end;
        req.validate()?;
        Ok(req)
    }

    pub fn coordinates_label(&self) -> String {
        format!("lon/lat: {:.4}, {:.4}", self.lon, self.lat)
    }
}

pub fn recommendations(risk: RiskBucket) -> &'static [&'static str] {
    match risk {
        RiskBucket::High => &[
            "Avoid strenuous outdoor activity; prefer indoor environments.",
            "Sensitive groups: wear a PFF2/N95 mask when going out.",
            "Keep windows closed; prefer filtered ventilation.",
        ],
        RiskBucket::Moderate => &[
            "Reduce outdoor exercise if you have respiratory symptoms.",
            "Prefer times and routes with less traffic.",
        ],
        RiskBucket::Low => &["Conditions are favorable for outdoor activities."],
        RiskBucket::Unknown => &[],
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartView {
    pub labels: Vec<String>,
    pub series: Vec<ChartSeries>,
}

/// Where the displayed next critical hour came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSource {
    Server,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertView {
    pub next_critical_hour: Option<String>,
    pub source: Option<AlertSource>,
    /// Whether the server's hour matches the locally derived one; `None` when
    /// the server sent none
    pub server_matches_local: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitationView {
    pub collection: String,
    pub temporal: String,
    pub bbox: String,
    pub granules: String,
    pub mode_timeout: String,
    pub fallback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundView {
    pub aqi: String,
    pub time_local: Option<String>,
    pub station: Option<String>,
    pub ground_risk: String,
    pub model_risk: String,
    pub concordance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub coordinates: String,
    pub display_risk: RiskBucket,
    pub model_risk: RiskBucket,
    pub pollution_index: Option<u8>,
    pub index_at: Option<String>,
    pub index_risk: RiskBucket,
    pub no2_seed: String,
    pub fallback_used: bool,
    pub alert: AlertView,
    pub recommendations: Vec<&'static str>,
    pub chart: ChartView,
    pub citation: Option<CitationView>,
    pub ground: GroundView,
}

impl DashboardView {
    pub fn build(selection: &Selection, payload: &ForecastPayload, now: DateTime<Utc>) -> Self {
        let display_risk = select_display_risk_at(payload, now);
        let local = assess_at(payload, now);

        Self {
            state: selection.state.clone(),
            lat: selection.lat,
            lon: selection.lon,
            coordinates: selection.coordinates_label(),
            display_risk,
            model_risk: payload.risk,
            pollution_index: local.map(|a| a.index),
            index_at: local.map(|a| iso_utc(&a.at)),
            index_risk: local.map(|a| a.bucket).unwrap_or_default(),
            no2_seed: or_placeholder(payload.no2_seed.map(exponential)),
            fallback_used: payload.fallback_used(),
            alert: alert_view(payload, now),
            recommendations: recommendations(display_risk).to_vec(),
            chart: chart_view(payload),
            citation: payload.tempo.as_ref().map(|tempo| CitationView {
                collection: or_placeholder(tempo.collection_id.as_deref()),
                temporal: format!(
                    "{} → {}",
                    or_placeholder(tempo.temporal_used.as_ref().and_then(|t| t.start.as_deref())),
                    or_placeholder(tempo.temporal_used.as_ref().and_then(|t| t.end.as_deref()))
                ),
                bbox: or_placeholder(tempo.bbox_used),
                granules: if tempo.granules.is_empty() {
                    PLACEHOLDER.to_string()
                } else {
                    tempo.granules.join(", ")
                },
                mode_timeout: format!(
                    "{} / {}s",
                    or_placeholder(tempo.mode.as_deref()),
                    or_placeholder(tempo.timeout_s)
                ),
                fallback: if tempo.fallback_used { "yes" } else { "no" }.to_string(),
            }),
            ground: ground_view(payload),
        }
    }
}

fn alert_view(payload: &ForecastPayload, now: DateTime<Utc>) -> AlertView {
    let server = payload.next_critical_hour();
    let local = next_critical_hour_local(payload, now);
    let (hour, source) = match (server, local) {
        (Some(s), _) => (Some(s), Some(AlertSource::Server)),
        (None, Some(l)) => (Some(l), Some(AlertSource::Local)),
        (None, None) => (None, None),
    };
    AlertView {
        next_critical_hour: hour.map(|h| iso_utc(&h)),
        source,
        server_matches_local: server.map(|s| Some(s) == local),
    }
}

fn chart_view(payload: &ForecastPayload) -> ChartView {
    let names: BTreeSet<&str> = payload
        .forecast
        .iter()
        .flat_map(|p| p.series_names())
        .collect();

    ChartView {
        labels: payload
            .forecast
            .iter()
            .map(|p| chart_label(&p.datetime_utc))
            .collect(),
        series: names
            .into_iter()
            .map(|name| ChartSeries {
                name: name.to_string(),
                values: payload.forecast.iter().map(|p| p.value(name)).collect(),
            })
            .collect(),
    }
}

fn ground_view(payload: &ForecastPayload) -> GroundView {
    let ground = payload.ground.as_ref();
    let validation = payload.validation.as_ref();

    let ground_bucket = validation
        .map(|v| v.ground_bucket)
        .filter(RiskBucket::is_known)
        .or_else(|| ground.and_then(|g| g.aqi).map(bucket_from_aqi))
        .unwrap_or_default();
    let model_bucket = validation
        .map(|v| v.model_bucket)
        .filter(RiskBucket::is_known)
        .unwrap_or(payload.risk);

    let concordance = match validation.and_then(|v| v.concordance.clone()) {
        Some(c) => c,
        None if ground_bucket.is_known() && model_bucket.is_known() => {
            let verdict = if ground_bucket == model_bucket { "agree" } else { "disagree" };
            verdict.to_string()
        }
        None => RiskBucket::Unknown.to_string(),
    };

    GroundView {
        aqi: or_placeholder(ground.and_then(|g| g.aqi)),
        time_local: ground.and_then(|g| g.time_local.clone()),
        station: ground.and_then(|g| g.station.clone()),
        ground_risk: ground_bucket.as_str().to_uppercase(),
        model_risk: model_bucket.as_str().to_uppercase(),
        concordance: concordance.to_uppercase(),
    }
}
