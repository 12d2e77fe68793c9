/// US state catalogue used for search and state selection.
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UsState {
    pub name: &'static str,
    pub code: &'static str,
    pub lat: f64,
    pub lon: f64,
}

/// The 50 states and DC with representative interior coordinates
pub const US_STATES: [UsState; 51] = [
    UsState { name: "Alabama", code: "AL", lat: 32.806671, lon: -86.791130 },
    UsState { name: "Alaska", code: "AK", lat: 61.370716, lon: -152.404419 },
    UsState { name: "Arizona", code: "AZ", lat: 33.729759, lon: -111.431221 },
    UsState { name: "Arkansas", code: "AR", lat: 34.969704, lon: -92.373123 },
    UsState { name: "California", code: "CA", lat: 36.116203, lon: -119.681564 },
    UsState { name: "Colorado", code: "CO", lat: 39.7392, lon: -104.9903 },
    UsState { name: "Connecticut", code: "CT", lat: 41.597782, lon: -72.755371 },
    UsState { name: "Delaware", code: "DE", lat: 39.318523, lon: -75.507141 },
    UsState { name: "District of Columbia", code: "DC", lat: 38.897438, lon: -77.026817 },
    UsState { name: "Florida", code: "FL", lat: 27.766279, lon: -81.686783 },
    UsState { name: "Georgia", code: "GA", lat: 33.040619, lon: -83.643074 },
    UsState { name: "Hawaii", code: "HI", lat: 21.094318, lon: -157.498337 },
    UsState { name: "Idaho", code: "ID", lat: 44.240459, lon: -114.478828 },
    UsState { name: "Illinois", code: "IL", lat: 40.349457, lon: -88.986137 },
    UsState { name: "Indiana", code: "IN", lat: 39.849426, lon: -86.258278 },
    UsState { name: "Iowa", code: "IA", lat: 42.011539, lon: -93.210526 },
    UsState { name: "Kansas", code: "KS", lat: 38.526600, lon: -96.726486 },
    UsState { name: "Kentucky", code: "KY", lat: 37.668140, lon: -84.670067 },
    UsState { name: "Louisiana", code: "LA", lat: 31.169546, lon: -91.867805 },
    UsState { name: "Maine", code: "ME", lat: 44.693947, lon: -69.381927 },
    UsState { name: "Maryland", code: "MD", lat: 39.063946, lon: -76.802101 },
    UsState { name: "Massachusetts", code: "MA", lat: 42.230171, lon: -71.530106 },
    UsState { name: "Michigan", code: "MI", lat: 43.326618, lon: -84.536095 },
    UsState { name: "Minnesota", code: "MN", lat: 45.694454, lon: -93.900192 },
    UsState { name: "Mississippi", code: "MS", lat: 32.741646, lon: -89.678696 },
    UsState { name: "Missouri", code: "MO", lat: 38.456085, lon: -92.288368 },
    UsState { name: "Montana", code: "MT", lat: 46.921925, lon: -110.454353 },
    UsState { name: "Nebraska", code: "NE", lat: 41.125370, lon: -98.268082 },
    UsState { name: "Nevada", code: "NV", lat: 38.313515, lon: -117.055374 },
    UsState { name: "New Hampshire", code: "NH", lat: 43.452492, lon: -71.563896 },
    UsState { name: "New Jersey", code: "NJ", lat: 40.298904, lon: -74.521011 },
    UsState { name: "New Mexico", code: "NM", lat: 34.840515, lon: -106.248482 },
    UsState { name: "New York", code: "NY", lat: 42.165726, lon: -74.948051 },
    UsState { name: "North Carolina", code: "NC", lat: 35.630066, lon: -79.806419 },
    UsState { name: "North Dakota", code: "ND", lat: 47.528912, lon: -99.784012 },
    UsState { name: "Ohio", code: "OH", lat: 40.388783, lon: -82.764915 },
    UsState { name: "Oklahoma", code: "OK", lat: 35.565342, lon: -96.928917 },
    UsState { name: "Oregon", code: "OR", lat: 44.572021, lon: -122.070938 },
    UsState { name: "Pennsylvania", code: "PA", lat: 40.590752, lon: -77.209755 },
    UsState { name: "Rhode Island", code: "RI", lat: 41.680893, lon: -71.511780 },
    UsState { name: "South Carolina", code: "SC", lat: 33.856892, lon: -80.945007 },
    UsState { name: "South Dakota", code: "SD", lat: 44.299782, lon: -99.438828 },
    UsState { name: "Tennessee", code: "TN", lat: 35.747845, lon: -86.692345 },
    UsState { name: "Texas", code: "TX", lat: 31.054487, lon: -97.563461 },
    UsState { name: "Utah", code: "UT", lat: 40.150032, lon: -111.862434 },
    UsState { name: "Vermont", code: "VT", lat: 44.045876, lon: -72.710686 },
    UsState { name: "Virginia", code: "VA", lat: 37.769337, lon: -78.169968 },
    UsState { name: "Washington", code: "WA", lat: 47.400902, lon: -121.490494 },
    UsState { name: "West Virginia", code: "WV", lat: 38.491226, lon: -80.954453 },
    UsState { name: "Wisconsin", code: "WI", lat: 44.268543, lon: -89.616508 },
    UsState { name: "Wyoming", code: "WY", lat: 42.755966, lon: -107.302490 },
];

/// Exact lookup by name or two-letter code, case-insensitive
pub fn find(name: &str) -> Option<&'static UsState> {
    let name = name.trim();
    US_STATES
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name) || s.code.eq_ignore_ascii_case(name))
}

/// Case-insensitive substring search on names; an empty query matches nothing
pub fn search(query: &str) -> Vec<&'static UsState> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    US_STATES
        .iter()
        .filter(|s| s.name.to_lowercase().contains(&query))
        .collect()
}
