/// Domain models for the forecast service payloads
mod request;

pub use request::{BoundingBox, ExecutionMode, ForecastRequest, OverlayRequest};

use crate::utils::{n_pick, num};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Coarse severity classification.
///
/// `Unknown` orders below `Low`, so combining it with any other bucket yields
/// the other bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBucket {
    #[default]
    Unknown,
    Low,
    Moderate,
    High,
}

impl RiskBucket {
    /// Parse a bucket name; anything unrecognised is `Unknown`
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => RiskBucket::Low,
            "moderate" => RiskBucket::Moderate,
            "high" => RiskBucket::High,
            _ => RiskBucket::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBucket::Unknown => "unknown",
            RiskBucket::Low => "low",
            RiskBucket::Moderate => "moderate",
            RiskBucket::High => "high",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != RiskBucket::Unknown
    }
}

impl fmt::Display for RiskBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RiskBucket {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .map(RiskBucket::parse_lenient)
            .unwrap_or_default())
    }
}

/// `null` reads as the type's default, same as an absent field
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Timestamp (de)serialization in the service's `YYYY-MM-DDTHH:MM:SSZ` shape
mod wire_time {
    use crate::utils::{iso_utc, parse_utc};
    use chrono::{DateTime, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&iso_utc(t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse_utc(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    /// Optional timestamps: absent, null or unparseable all mean unknown
    pub mod lenient {
        use crate::utils::{iso_utc, parse_utc};
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(t: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
            match t {
                Some(t) => s.serialize_str(&iso_utc(t)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw = Option::<String>::deserialize(d)?;
            Ok(raw.as_deref().and_then(parse_utc))
        }
    }
}

/// One forecast step: a UTC timestamp plus named pollutant series values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    #[serde(with = "wire_time")]
    pub datetime_utc: DateTime<Utc>,
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

impl ForecastPoint {
    pub fn new(datetime_utc: DateTime<Utc>) -> Self {
        Self {
            datetime_utc,
            values: Map::new(),
        }
    }

    pub fn with(mut self, series: &str, value: f64) -> Self {
        self.values.insert(series.to_string(), Value::from(value));
        self
    }

    /// Numeric value of a series, if present and numeric
    pub fn value(&self, series: &str) -> Option<f64> {
        self.values.get(series).and_then(num)
    }

    /// First numeric value among several series aliases
    pub fn pick(&self, aliases: &[&str]) -> Option<f64> {
        n_pick(&self.values, aliases)
    }

    /// Names of the series carried by this point
    pub fn series_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// Hourly weather sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherPoint {
    #[serde(with = "wire_time")]
    pub datetime_utc: DateTime<Utc>,
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub wind_deg: Option<f64>,
    #[serde(default)]
    pub clouds: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub rain_1h_est: Option<f64>,
    #[serde(default)]
    pub snow_1h_est: Option<f64>,
}

impl WeatherPoint {
    fn fields(&self) -> [(&'static str, Option<f64>); 8] {
        [
            ("temp", self.temp),
            ("humidity", self.humidity),
            ("wind_speed", self.wind_speed),
            ("wind_deg", self.wind_deg),
            ("clouds", self.clouds),
            ("pressure", self.pressure),
            ("rain_1h_est", self.rain_1h_est),
            ("snow_1h_est", self.snow_1h_est),
        ]
    }

    /// Present fields as a series point, for merging with forecast points
    pub fn to_series_point(&self) -> ForecastPoint {
        let mut point = ForecastPoint::new(self.datetime_utc);
        for (name, value) in self.fields() {
            if let Some(v) = value {
                point.values.insert(name.to_string(), Value::from(v));
            }
        }
        point
    }

    /// Fill this sample with every field `other` defines
    fn overlay(&mut self, other: &WeatherPoint) {
        self.temp = other.temp.or(self.temp);
        self.humidity = other.humidity.or(self.humidity);
        self.wind_speed = other.wind_speed.or(self.wind_speed);
        self.wind_deg = other.wind_deg.or(self.wind_deg);
        self.clouds = other.clouds.or(self.clouds);
        self.pressure = other.pressure.or(self.pressure);
        self.rain_1h_est = other.rain_1h_est.or(self.rain_1h_est);
        self.snow_1h_est = other.snow_1h_est.or(self.snow_1h_est);
    }
}

/// Time window the satellite retrieval actually used
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporalUsed {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

/// Satellite-source provenance (`tempo` block)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SatelliteProvenance {
    #[serde(default)]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub temporal_used: Option<TemporalUsed>,
    #[serde(default)]
    pub bbox_used: Option<BoundingBox>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub granules: Vec<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub timeout_s: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fallback_used: bool,
}

/// Ground-station validation sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundSample {
    #[serde(default)]
    pub aqi: Option<f64>,
    #[serde(default)]
    pub no2: Option<f64>,
    #[serde(default)]
    pub o3: Option<f64>,
    #[serde(default)]
    pub pm25: Option<f64>,
    #[serde(default)]
    pub pm10: Option<f64>,
    #[serde(default)]
    pub time_local: Option<String>,
    #[serde(default)]
    pub station: Option<String>,
    #[serde(default)]
    pub station_geo: Option<Vec<f64>>,
    #[serde(default)]
    pub attribution: Option<String>,
    #[serde(default)]
    pub fetched_utc: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alerts {
    /// First upcoming hour at which the model expects `high` risk
    #[serde(default, with = "wire_time::lenient")]
    pub next_critical_hour: Option<DateTime<Utc>>,
}

/// Server-side comparison between ground and model buckets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    #[serde(default)]
    pub ground_bucket: RiskBucket,
    #[serde(default)]
    pub model_bucket: RiskBucket,
    #[serde(default)]
    pub concordance: Option<String>,
}

/// Full `/forecast` response for one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPayload {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub no2_seed: Option<f64>,
    #[serde(default)]
    pub risk: RiskBucket,
    #[serde(default)]
    pub ratio_peak_over_seed: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub forecast: Vec<ForecastPoint>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub weather: Vec<WeatherPoint>,
    #[serde(default)]
    pub tempo: Option<SatelliteProvenance>,
    #[serde(default)]
    pub ground: Option<GroundSample>,
    #[serde(default)]
    pub alerts: Option<Alerts>,
    #[serde(default)]
    pub validation: Option<Validation>,
}

impl ForecastPayload {
    /// Sort both series ascending and fold duplicate timestamps together
    pub fn normalized(mut self) -> Self {
        self.forecast = crate::services::merge_series_by_timestamp(&self.forecast, &[]);

        self.weather.sort_by_key(|w| w.datetime_utc);
        self.weather.dedup_by(|later, earlier| {
            if later.datetime_utc == earlier.datetime_utc {
                earlier.overlay(later);
                true
            } else {
                false
            }
        });
        self
    }

    pub fn next_critical_hour(&self) -> Option<DateTime<Utc>> {
        self.alerts.as_ref().and_then(|a| a.next_critical_hour)
    }

    pub fn fallback_used(&self) -> bool {
        self.tempo.as_ref().map(|t| t.fallback_used).unwrap_or(false)
    }
}

/// One entry of `/states/summary`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSummaryItem {
    pub state: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub risk: RiskBucket,
    #[serde(default)]
    pub no2_seed: Option<f64>,
    #[serde(default)]
    pub updated_utc: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatesSummary {
    #[serde(default)]
    pub items: Vec<StateSummaryItem>,
}

impl StatesSummary {
    pub fn risk_of(&self, state: &str) -> RiskBucket {
        self.items
            .iter()
            .find(|i| i.state.eq_ignore_ascii_case(state))
            .map(|i| i.risk)
            .unwrap_or_default()
    }
}

/// Raster overlay image, passed through unparsed
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_utc;

    fn sample_payload() -> Value {
        serde_json::json!({
            "lat": 39.7392,
            "lon": -104.9903,
            "no2_seed": 3.2e15,
            "risk": "moderate",
            "ratio_peak_over_seed": 1.08,
            "forecast": [
                {"datetime_utc": "2025-04-06T22:00:00Z", "no2_forecast": 3.4e15},
                {"datetime_utc": "2025-04-06T21:00:00Z", "no2_forecast": 3.3e15, "o3": 41.0}
            ],
            "weather": [
                {"datetime_utc": "2025-04-06T21:00:00Z", "temp": 12.5, "humidity": null}
            ],
            "tempo": {
                "collection_id": "C2930763263-LARC_CLOUD",
                "temporal_used": {"start": "2025-04-06T18:00:00Z", "end": "2025-04-06T21:00:00Z"},
                "bbox_used": {"minLon": -106.0, "minLat": 38.0, "maxLon": -104.0, "maxLat": 41.0},
                "granules": ["TEMPO_NO2_L2_V03_20250406T215103Z_S012G07.nc"],
                "mode": "fast",
                "timeout_s": 12,
                "fallback_used": false
            },
            "alerts": {"next_critical_hour": "2025-04-06T23:00:00Z"}
        })
    }

    #[test]
    fn test_risk_bucket_lenient() {
        assert_eq!(RiskBucket::parse_lenient("HIGH"), RiskBucket::High);
        assert_eq!(RiskBucket::parse_lenient(" moderate "), RiskBucket::Moderate);
        assert_eq!(RiskBucket::parse_lenient("severe"), RiskBucket::Unknown);
    }

    #[test]
    fn test_risk_bucket_deserialize_null_and_unknown() {
        let null: RiskBucket = serde_json::from_value(Value::Null).unwrap();
        assert_eq!(null, RiskBucket::Unknown);
        let other: RiskBucket = serde_json::from_value(serde_json::json!("n/a")).unwrap();
        assert_eq!(other, RiskBucket::Unknown);
        assert_eq!(serde_json::to_value(RiskBucket::High).unwrap(), "high");
    }

    #[test]
    fn test_payload_deserialize() {
        let payload: ForecastPayload = serde_json::from_value(sample_payload()).unwrap();
        assert_eq!(payload.risk, RiskBucket::Moderate);
        assert_eq!(payload.forecast.len(), 2);
        assert_eq!(payload.forecast[1].value("o3"), Some(41.0));
        assert_eq!(payload.weather[0].humidity, None);
        let tempo = payload.tempo.as_ref().unwrap();
        assert_eq!(tempo.bbox_used.unwrap().min_lon, -106.0);
        assert_eq!(tempo.granules.len(), 1);
        assert!(payload.ground.is_none());
        assert_eq!(
            payload.next_critical_hour(),
            parse_utc("2025-04-06T23:00:00Z")
        );
    }

    #[test]
    fn test_payload_minimal_fields_default() {
        let payload: ForecastPayload =
            serde_json::from_value(serde_json::json!({"lat": 1.0, "lon": 2.0})).unwrap();
        assert_eq!(payload.risk, RiskBucket::Unknown);
        assert!(payload.forecast.is_empty());
        assert!(!payload.fallback_used());
        assert!(payload.next_critical_hour().is_none());
    }

    #[test]
    fn test_payload_null_blocks_are_unknown() {
        let payload: ForecastPayload = serde_json::from_value(serde_json::json!({
            "lat": 1.0, "lon": 2.0, "risk": null, "forecast": null, "weather": null,
            "tempo": {"granules": null, "fallback_used": null},
            "ground": null, "alerts": null, "validation": null
        }))
        .unwrap();
        assert!(payload.forecast.is_empty());
        assert!(!payload.fallback_used());
        assert!(payload.tempo.unwrap().granules.is_empty());
    }

    #[test]
    fn test_payload_rejects_bad_timestamp() {
        let bad = serde_json::json!({
            "lat": 1.0, "lon": 2.0,
            "forecast": [{"datetime_utc": "soon", "no2_forecast": 1.0}]
        });
        assert!(serde_json::from_value::<ForecastPayload>(bad).is_err());
    }

    #[test]
    fn test_unparseable_alert_hour_is_unknown() {
        let alerts: Alerts =
            serde_json::from_value(serde_json::json!({"next_critical_hour": "tbd"})).unwrap();
        assert!(alerts.next_critical_hour.is_none());
    }

    #[test]
    fn test_normalized_sorts_and_dedups() {
        let mut value = sample_payload();
        value["weather"] = serde_json::json!([
            {"datetime_utc": "2025-04-06T22:00:00Z", "temp": 11.0},
            {"datetime_utc": "2025-04-06T21:00:00Z", "temp": 12.5},
            {"datetime_utc": "2025-04-06T21:00:00Z", "humidity": 40.0}
        ]);
        let payload: ForecastPayload = serde_json::from_value(value).unwrap();
        let payload = payload.normalized();

        assert!(payload.forecast[0].datetime_utc < payload.forecast[1].datetime_utc);
        assert_eq!(payload.weather.len(), 2);
        assert_eq!(payload.weather[0].temp, Some(12.5));
        assert_eq!(payload.weather[0].humidity, Some(40.0));
    }

    #[test]
    fn test_forecast_point_serializes_flat() {
        let t = parse_utc("2025-04-06T21:00:00Z").unwrap();
        let point = ForecastPoint::new(t).with("no2_forecast", 2.0);
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"datetime_utc": "2025-04-06T21:00:00Z", "no2_forecast": 2.0})
        );
    }

    #[test]
    fn test_weather_to_series_point_skips_absent() {
        let t = parse_utc("2025-04-06T21:00:00Z").unwrap();
        let w = WeatherPoint {
            datetime_utc: t,
            temp: Some(10.0),
            humidity: None,
            wind_speed: Some(3.0),
            wind_deg: None,
            clouds: None,
            pressure: None,
            rain_1h_est: None,
            snow_1h_est: None,
        };
        let p = w.to_series_point();
        assert_eq!(p.values.len(), 2);
        assert_eq!(p.value("wind_speed"), Some(3.0));
    }

    #[test]
    fn test_states_summary_risk_of() {
        let summary: StatesSummary = serde_json::from_value(serde_json::json!({
            "items": [
                {"state": "Colorado", "lat": 39.0, "lon": -105.5, "risk": "high", "updated_utc": "2025-04-06T21:00:00Z"},
                {"state": "Utah", "lat": 39.3, "lon": -111.7, "risk": null}
            ]
        }))
        .unwrap();
        assert_eq!(summary.risk_of("colorado"), RiskBucket::High);
        assert_eq!(summary.risk_of("Utah"), RiskBucket::Unknown);
        assert_eq!(summary.risk_of("Texas"), RiskBucket::Unknown);
    }
}
