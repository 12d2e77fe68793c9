//! Outgoing request parameters for the forecast service.

use crate::errors::{ClientError, ClientResult};
use crate::utils::iso_utc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How the service should trade latency against completeness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Favor low latency over completeness
    Fast,
    /// Let the server choose
    Auto,
    /// Permit server-cached results
    Cache,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Fast => "fast",
            ExecutionMode::Auto => "auto",
            ExecutionMode::Cache => "cache",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(ExecutionMode::Fast),
            "auto" => Ok(ExecutionMode::Auto),
            "cache" => Ok(ExecutionMode::Cache),
            other => Err(ClientError::InvalidRequest(format!(
                "unknown mode '{}', expected fast|auto|cache",
                other
            ))),
        }
    }
}

/// Geographic bounding box in degrees.
///
/// Serializes as `{minLon, minLat, maxLon, maxLat}` (the provenance shape) and
/// formats as `minLon,minLat,maxLon,maxLat` (the query shape).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> ClientResult<Self> {
        let bbox = Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Box padded around a point, clamped to valid coordinates
    pub fn around(lat: f64, lon: f64, pad_lon: f64, pad_lat: f64) -> ClientResult<Self> {
        Self::new(
            (lon - pad_lon).max(-180.0),
            (lat - pad_lat).max(-90.0),
            (lon + pad_lon).min(180.0),
            (lat + pad_lat).min(90.0),
        )
    }

    pub fn validate(&self) -> ClientResult<()> {
        let coords = [self.min_lon, self.min_lat, self.max_lon, self.max_lat];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(ClientError::InvalidRequest(
                "bbox coordinates must be finite".to_string(),
            ));
        }
        check_lon(self.min_lon)?;
        check_lon(self.max_lon)?;
        check_lat(self.min_lat)?;
        check_lat(self.max_lat)?;
        if self.min_lon >= self.max_lon || self.min_lat >= self.max_lat {
            return Err(ClientError::InvalidRequest(format!(
                "bbox must have min < max on both axes, got {}",
                self
            )));
        }
        Ok(())
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

impl FromStr for BoundingBox {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ClientError::InvalidRequest(format!("bbox '{}': {}", s, e)))?;

        match parts.as_slice() {
            [min_lon, min_lat, max_lon, max_lat] => {
                Self::new(*min_lon, *min_lat, *max_lon, *max_lat)
            }
            _ => Err(ClientError::InvalidRequest(format!(
                "bbox '{}' must have four comma-separated values",
                s
            ))),
        }
    }
}

/// Parameters of `GET /forecast`
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    pub lat: f64,
    pub lon: f64,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub bbox: Option<BoundingBox>,
    pub mode: Option<ExecutionMode>,
    /// Request deadline; the client default applies when unset
    pub timeout: Option<Duration>,
    pub skip_satellite_source: bool,
    pub require_satellite_source: bool,
}

impl ForecastRequest {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            start: None,
            end: None,
            bbox: None,
            mode: None,
            timeout: None,
            skip_satellite_source: false,
            require_satellite_source: false,
        }
    }

    pub fn window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn skip_satellite_source(mut self, skip: bool) -> Self {
        self.skip_satellite_source = skip;
        self
    }

    pub fn require_satellite_source(mut self, require: bool) -> Self {
        self.require_satellite_source = require;
        self
    }

    /// Check coordinate ranges and option consistency
    pub fn validate(&self) -> ClientResult<()> {
        if !self.lat.is_finite() || !self.lon.is_finite() {
            return Err(ClientError::InvalidRequest(
                "lat/lon must be finite".to_string(),
            ));
        }
        check_lat(self.lat)?;
        check_lon(self.lon)?;
        if let Some(bbox) = &self.bbox {
            bbox.validate()?;
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start >= end {
                return Err(ClientError::InvalidRequest(format!(
                    "time window start {} must precede end {}",
                    iso_utc(&start),
                    iso_utc(&end)
                )));
            }
        }
        if self.skip_satellite_source && self.require_satellite_source {
            return Err(ClientError::InvalidRequest(
                "cannot both skip and require the satellite source".to_string(),
            ));
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(ClientError::InvalidRequest(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Query string pairs, in wire order. Flags are sent only when set.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut q = vec![("lat", self.lat.to_string()), ("lon", self.lon.to_string())];
        if let Some(mode) = self.mode {
            q.push(("mode", mode.as_str().to_string()));
        }
        if let Some(start) = &self.start {
            q.push(("start", iso_utc(start)));
        }
        if let Some(end) = &self.end {
            q.push(("end", iso_utc(end)));
        }
        if let Some(bbox) = &self.bbox {
            q.push(("bbox", bbox.to_string()));
        }
        if self.skip_satellite_source {
            q.push(("skip_nasa", "true".to_string()));
        }
        if self.require_satellite_source {
            q.push(("require_nasa", "true".to_string()));
        }
        q
    }
}

/// Parameters of `GET /tempo/latest_overlay.png`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayRequest {
    pub bbox: Option<BoundingBox>,
    pub prefer_l3: bool,
    pub hours: Option<u32>,
}

impl OverlayRequest {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut q = Vec::new();
        if let Some(bbox) = &self.bbox {
            q.push(("bbox", bbox.to_string()));
        }
        q.push(("prefer_l3", self.prefer_l3.to_string()));
        if let Some(hours) = self.hours {
            q.push(("hours", hours.to_string()));
        }
        q
    }
}

fn check_lat(lat: f64) -> ClientResult<()> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        Err(ClientError::InvalidRequest(format!(
            "latitude {} outside [-90, 90]",
            lat
        )))
    }
}

fn check_lon(lon: f64) -> ClientResult<()> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        Err(ClientError::InvalidRequest(format!(
            "longitude {} outside [-180, 180]",
            lon
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_utc;

    #[test]
    fn test_bbox_parse_and_display() {
        let bbox: BoundingBox = "-106,38,-104,41".parse().unwrap();
        assert_eq!(bbox.min_lon, -106.0);
        assert_eq!(bbox.min_lat, 38.0);
        assert_eq!(bbox.max_lon, -104.0);
        assert_eq!(bbox.max_lat, 41.0);
        assert_eq!(bbox.to_string(), "-106,38,-104,41");
    }

    #[test]
    fn test_bbox_fractional_values_survive_display() {
        let bbox: BoundingBox = "-106.4905,38.5392,-103.4903,40.9392".parse().unwrap();
        let again: BoundingBox = bbox.to_string().parse().unwrap();
        assert_eq!(bbox, again);
    }

    #[test]
    fn test_bbox_rejects_inverted_and_short() {
        assert!("-104,38,-106,41".parse::<BoundingBox>().is_err());
        assert!("-106,41,-104,38".parse::<BoundingBox>().is_err());
        assert!("-106,38,-104".parse::<BoundingBox>().is_err());
        assert!("a,b,c,d".parse::<BoundingBox>().is_err());
        assert!("-106,38,-106,41".parse::<BoundingBox>().is_err());
    }

    #[test]
    fn test_bbox_around_clamps() {
        let bbox = BoundingBox::around(89.5, 179.0, 1.5, 1.2).unwrap();
        assert_eq!(bbox.max_lat, 90.0);
        assert_eq!(bbox.max_lon, 180.0);
        assert_eq!(bbox.min_lon, 177.5);
    }

    #[test]
    fn test_bbox_serializes_camel_case() {
        let bbox = BoundingBox::new(-106.0, 38.0, -104.0, 41.0).unwrap();
        let json = serde_json::to_value(bbox).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"minLon": -106.0, "minLat": 38.0, "maxLon": -104.0, "maxLat": 41.0})
        );
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("FAST".parse::<ExecutionMode>().unwrap(), ExecutionMode::Fast);
        assert_eq!("cache".parse::<ExecutionMode>().unwrap(), ExecutionMode::Cache);
        assert!("slow".parse::<ExecutionMode>().is_err());
    }

    #[test]
    fn test_request_validation() {
        assert!(ForecastRequest::new(39.7, -104.9).validate().is_ok());
        assert!(ForecastRequest::new(90.1, 0.0).validate().is_err());
        assert!(ForecastRequest::new(0.0, -180.5).validate().is_err());
        assert!(ForecastRequest::new(f64::NAN, 0.0).validate().is_err());
        assert!(ForecastRequest::new(0.0, 0.0)
            .skip_satellite_source(true)
            .require_satellite_source(true)
            .validate()
            .is_err());
        assert!(ForecastRequest::new(0.0, 0.0)
            .timeout(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_request_rejects_inverted_window() {
        let start = parse_utc("2025-04-06T21:00:00Z").unwrap();
        let end = parse_utc("2025-04-06T20:00:00Z").unwrap();
        let err = ForecastRequest::new(0.0, 0.0)
            .window(start, end)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
    }

    #[test]
    fn test_query_pairs_minimal() {
        let q = ForecastRequest::new(39.7392, -104.9903).query_pairs();
        assert_eq!(
            q,
            vec![("lat", "39.7392".to_string()), ("lon", "-104.9903".to_string())]
        );
    }

    #[test]
    fn test_query_pairs_full() {
        let start = parse_utc("2025-04-06T18:00:00Z").unwrap();
        let end = parse_utc("2025-04-06T21:00:00Z").unwrap();
        let q = ForecastRequest::new(39.0, -105.0)
            .mode(ExecutionMode::Auto)
            .window(start, end)
            .bbox("-106,38,-104,41".parse().unwrap())
            .require_satellite_source(true)
            .query_pairs();

        let keys: Vec<&str> = q.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec!["lat", "lon", "mode", "start", "end", "bbox", "require_nasa"]
        );
        assert_eq!(q[3].1, "2025-04-06T18:00:00Z");
        assert_eq!(q[5].1, "-106,38,-104,41");
    }

    #[test]
    fn test_overlay_query_pairs() {
        let req = OverlayRequest {
            bbox: Some("-106,38,-104,41".parse().unwrap()),
            prefer_l3: true,
            hours: Some(3),
        };
        assert_eq!(
            req.query_pairs(),
            vec![
                ("bbox", "-106,38,-104,41".to_string()),
                ("prefer_l3", "true".to_string()),
                ("hours", "3".to_string())
            ]
        );
    }
}
