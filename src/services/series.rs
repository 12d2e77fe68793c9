/// Timestamp-keyed merging of point series.
use crate::domain::ForecastPoint;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Merge two series into one point per distinct timestamp, ascending.
///
/// Neither input needs to be sorted. Fields from `b` overwrite same-named
/// fields from `a`; within one input, later points overwrite earlier ones.
pub fn merge_series_by_timestamp(a: &[ForecastPoint], b: &[ForecastPoint]) -> Vec<ForecastPoint> {
    let mut merged: BTreeMap<DateTime<Utc>, ForecastPoint> = BTreeMap::new();

    for point in a.iter().chain(b) {
        merged
            .entry(point.datetime_utc)
            .and_modify(|existing| {
                for (k, v) in &point.values {
                    existing.values.insert(k.clone(), v.clone());
                }
            })
            .or_insert_with(|| point.clone());
    }

    merged.into_values().collect()
}

/// Merge any number of series, left to right
pub fn merge_all<'a, I>(series: I) -> Vec<ForecastPoint>
where
    I: IntoIterator<Item = &'a [ForecastPoint]>,
{
    series
        .into_iter()
        .fold(Vec::new(), |acc, s| merge_series_by_timestamp(&acc, s))
}
