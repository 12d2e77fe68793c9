/// CSV export of payload series.
// Header is `datetime_utc` followed by the union of the other row keys in
// sorted order. Cells are JSON-encoded, so strings are quoted and escaped while
// numbers are bare; missing or null cells are `""`.

use crate::domain::{ForecastPoint, WeatherPoint};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

const TIME_COLUMN: &str = "datetime_utc";

pub const FORECAST_CSV_NAME: &str = "forecast_no2.csv";
pub const WEATHER_CSV_NAME: &str = "weather_hourly.csv";

pub fn forecast_csv(points: &[ForecastPoint]) -> Option<String> {
    rows_to_csv(points)
}

pub fn weather_csv(points: &[WeatherPoint]) -> Option<String> {
    rows_to_csv(points)
}

/// `None` when there are no rows
pub fn rows_to_csv<T: Serialize>(rows: &[T]) -> Option<String> {
    let rows: Vec<Map<String, Value>> = rows
        .iter()
        .filter_map(|r| match serde_json::to_value(r) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })
        .collect();
    if rows.is_empty() {
        return None;
    }

    let columns: BTreeSet<&str> = rows
        .iter()
        .flat_map(|r| r.keys().map(String::as_str))
        .filter(|k| *k != TIME_COLUMN)
        .collect();
    let mut headers: Vec<&str> = Vec::with_capacity(columns.len() + 1);
    if rows.iter().any(|r| r.contains_key(TIME_COLUMN)) {
        headers.push(TIME_COLUMN);
    }
    headers.extend(columns);

    let mut out = headers.join(",");
    for row in &rows {
        out.push('\n');
        let line: Vec<String> = headers
            .iter()
            .map(|h| match row.get(*h) {
                None | Some(Value::Null) => "\"\"".to_string(),
                Some(v) => v.to_string(),
            })
            .collect();
        out.push_str(&line.join(","));
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_utc;

    #[test]
    fn test_empty_rows_produce_nothing() {
        assert_eq!(forecast_csv(&[]), None);
        assert_eq!(weather_csv(&[]), None);
    }

    #[test]
    fn test_forecast_csv_union_of_columns() {
        let points = vec![
            ForecastPoint::new(parse_utc("2025-04-06T21:00:00Z").unwrap())
                .with("no2_forecast", 1.5),
            ForecastPoint::new(parse_utc("2025-04-06T22:00:00Z").unwrap())
                .with("no2_forecast", 2.0)
                .with("o3", 40.0),
        ];
        let csv = forecast_csv(&points).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "datetime_utc,no2_forecast,o3");
        assert_eq!(lines[1], "\"2025-04-06T21:00:00Z\",1.5,\"\"");
        assert_eq!(lines[2], "\"2025-04-06T22:00:00Z\",2.0,40.0");
    }

    #[test]
    fn test_header_is_sorted_regardless_of_row_order() {
        let points = vec![
            ForecastPoint::new(parse_utc("2025-04-06T21:00:00Z").unwrap()).with("o3", 35.0),
            ForecastPoint::new(parse_utc("2025-04-06T22:00:00Z").unwrap())
                .with("no2_forecast", 2.0),
        ];
        let csv = forecast_csv(&points).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "datetime_utc,no2_forecast,o3");
        assert_eq!(lines[1], "\"2025-04-06T21:00:00Z\",\"\",35.0");
        assert_eq!(lines[2], "\"2025-04-06T22:00:00Z\",2.0,\"\"");
    }

    #[test]
    fn test_weather_csv_nulls_are_empty_strings() {
        let points = vec![WeatherPoint {
            datetime_utc: parse_utc("2025-04-06T21:00:00Z").unwrap(),
            temp: Some(12.5),
            humidity: None,
            wind_speed: None,
            wind_deg: None,
            clouds: None,
            pressure: None,
            rain_1h_est: None,
            snow_1h_est: None,
        }];
        let csv = weather_csv(&points).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "datetime_utc,clouds,humidity,pressure,rain_1h_est,snow_1h_est,temp,wind_deg,wind_speed"
        );
        assert_eq!(
            lines[1],
            "\"2025-04-06T21:00:00Z\",\"\",\"\",\"\",\"\",\"\",12.5,\"\",\"\""
        );
    }

    #[test]
    fn test_strings_are_escaped() {
        let rows = vec![serde_json::json!({"datetime_utc": "x", "note": "a,\"b\""})];
        let csv = rows_to_csv(&rows).unwrap();
        assert_eq!(csv.lines().nth(1).unwrap(), r#""x","a,\"b\"""#);
    }
}
