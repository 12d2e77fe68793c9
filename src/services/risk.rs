/// Client-side pollution index and risk reconciliation.
// The upstream model risk and a locally recomputed multi-pollutant index can
// disagree; the displayed risk is always the more severe of the two.

use crate::domain::{ForecastPayload, ForecastPoint, RiskBucket};
use chrono::{DateTime, Utc};

/// A pollutant contributing to the index
#[derive(Debug, Clone, Copy)]
pub struct PollutantScale {
    /// Series names, first present wins
    pub aliases: &'static [&'static str],
    /// Value that maps to an index of 100
    pub ceiling: f64,
    pub weight: f64,
}

/// Reference ceilings and weights. Weights sum to 1.0.
pub const POLLUTANTS: [PollutantScale; 4] = [
    // tropospheric NO2 column, molecules/cm^2
    PollutantScale {
        aliases: &["no2_forecast", "no2"],
        ceiling: 1.0e16,
        weight: 0.40,
    },
    // ozone, ppb
    PollutantScale {
        aliases: &["o3_ppb", "o3"],
        ceiling: 120.0,
        weight: 0.25,
    },
    // PM2.5, ug/m^3
    PollutantScale {
        aliases: &["pm25", "pm2_5"],
        ceiling: 55.4,
        weight: 0.25,
    },
    // UV aerosol index
    PollutantScale {
        aliases: &["aerosol_index", "uvai", "ai"],
        ceiling: 5.0,
        weight: 0.10,
    },
];

pub const HIGH_THRESHOLD: u8 = 70;
pub const MODERATE_THRESHOLD: u8 = 40;

/// Scale a raw value to [0, 100] against `ceiling`, saturating
fn sub_index(value: f64, ceiling: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    (value / ceiling * 100.0).clamp(0.0, 100.0)
}

/// Weighted 0..=100 index of one forecast point. Absent pollutants count as 0.
pub fn compute_pollution_index(point: &ForecastPoint) -> u8 {
    let score: f64 = POLLUTANTS
        .iter()
        .map(|p| p.weight * sub_index(point.pick(p.aliases).unwrap_or(0.0), p.ceiling))
        .sum();
    score.round().clamp(0.0, 100.0) as u8
}

/// Bucket a score; boundary values belong to the higher bucket
pub fn bucket_from_index(score: u8) -> RiskBucket {
    if score >= HIGH_THRESHOLD {
        RiskBucket::High
    } else if score >= MODERATE_THRESHOLD {
        RiskBucket::Moderate
    } else {
        RiskBucket::Low
    }
}

/// The more severe of two buckets
pub fn worst_of(a: RiskBucket, b: RiskBucket) -> RiskBucket {
    a.max(b)
}

/// Earliest point at or after `now`, else the first point
pub fn select_point_at(forecast: &[ForecastPoint], now: DateTime<Utc>) -> Option<&ForecastPoint> {
    forecast
        .iter()
        .filter(|p| p.datetime_utc >= now)
        .min_by_key(|p| p.datetime_utc)
        .or_else(|| forecast.first())
}

/// Local assessment of the point that represents "now"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalAssessment {
    pub at: DateTime<Utc>,
    pub index: u8,
    pub bucket: RiskBucket,
}

pub fn assess_at(payload: &ForecastPayload, now: DateTime<Utc>) -> Option<LocalAssessment> {
    select_point_at(&payload.forecast, now).map(|p| {
        let index = compute_pollution_index(p);
        LocalAssessment {
            at: p.datetime_utc,
            index,
            bucket: bucket_from_index(index),
        }
    })
}

/// Display risk as of `now`: worst of the model bucket and the local index
/// bucket. An empty series and an unknown model bucket give `Low`.
pub fn select_display_risk_at(payload: &ForecastPayload, now: DateTime<Utc>) -> RiskBucket {
    let local = assess_at(payload, now)
        .map(|a| a.bucket)
        .unwrap_or(RiskBucket::Unknown);
    match worst_of(payload.risk, local) {
        RiskBucket::Unknown => RiskBucket::Low,
        bucket => bucket,
    }
}

pub fn select_display_risk(payload: &ForecastPayload) -> RiskBucket {
    select_display_risk_at(payload, Utc::now())
}

/// Bucket of an observed US AQI: Good is low, Moderate is moderate, anything
/// from "Unhealthy for Sensitive Groups" up is high
pub fn bucket_from_aqi(aqi: f64) -> RiskBucket {
    if aqi.is_nan() || aqi < 0.0 {
        RiskBucket::Unknown
    } else if aqi <= 50.0 {
        RiskBucket::Low
    } else if aqi <= 100.0 {
        RiskBucket::Moderate
    } else {
        RiskBucket::High
    }
}

/// First upcoming point whose local index is `high`
pub fn next_critical_hour_local(
    payload: &ForecastPayload,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    payload
        .forecast
        .iter()
        .filter(|p| p.datetime_utc >= now)
        .filter(|p| bucket_from_index(compute_pollution_index(p)) == RiskBucket::High)
        .map(|p| p.datetime_utc)
        .min()
}
