// Shared fixtures for integration tests: NWIS IV JSON bodies built from
// (site, variable, value) tuples.

#![allow(dead_code)]

pub fn iv_entry(
    site: &str,
    lat: f64,
    lng: f64,
    variable: &str,
    value: &str,
    at: &str,
) -> String {
    format!(
        r#"{{
          "sourceInfo": {{
            "siteName": "{site}",
            "geoLocation": {{ "geogLocation": {{ "latitude": {lat}, "longitude": {lng} }} }}
          }},
          "variable": {{ "variableName": "{variable}" }},
          "values": [ {{ "value": [ {{ "dateTime": "{at}", "value": "{value}" }} ] }} ]
        }}"#
    )
}

pub fn iv_body(entries: &[String]) -> String {
    format!(r#"{{ "value": {{ "timeSeries": [ {} ] }} }}"#, entries.join(","))
}

pub fn empty_iv_body() -> String {
    r#"{ "value": { "timeSeries": [] } }"#.to_string()
}

/// A body with two complete sites that both pass the quality gate.
pub fn two_site_body() -> String {
    iv_body(&[
        iv_entry(
            "Clear Creek at Golden",
            39.75,
            -105.23,
            "Streamflow, ft3/s",
            "850",
            "2024-05-01T12:00:00.000-06:00",
        ),
        iv_entry(
            "Clear Creek at Golden",
            39.75,
            -105.23,
            "Gage height, ft",
            "3.4",
            "2024-05-01T12:00:00.000-06:00",
        ),
        iv_entry(
            "South Platte at Denver",
            39.76,
            -104.99,
            "Streamflow, ft3/s",
            "2300",
            "2024-05-01T12:00:00.000-06:00",
        ),
        iv_entry(
            "South Platte at Denver",
            39.76,
            -104.99,
            "Gage height, ft",
            "6.8",
            "2024-05-01T12:00:00.000-06:00",
        ),
    ])
}
