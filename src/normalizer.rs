use std::collections::BTreeMap;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// USGS NWIS Instantaneous Values (IV) response, WaterML rendered as JSON.
/// Every container level is defaulted so that a structurally empty body
/// (`{}` or a missing `value.timeSeries`) still deserializes; `normalize`
/// treats that case as "no data", not as a hard failure.
#[derive(Debug, Default, Deserialize)]
pub struct IvPayload {
    #[serde(default)]
    pub value: Option<TimeSeriesContainer>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimeSeriesContainer {
    #[serde(rename = "timeSeries", default)]
    pub time_series: Vec<TimeSeriesEntry>,
}

/// One (site, variable) pair with its observation run.
#[derive(Debug, Deserialize)]
pub struct TimeSeriesEntry {
    #[serde(rename = "sourceInfo")]
    pub source_info: SourceInfo,
    pub variable: Variable,
    #[serde(default)]
    pub values: Vec<ValuesBlock>,
}

#[derive(Debug, Deserialize)]
pub struct SourceInfo {
    #[serde(rename = "siteName")]
    pub site_name: String,
    #[serde(rename = "geoLocation")]
    pub geo_location: GeoLocation,
}

#[derive(Debug, Deserialize)]
pub struct GeoLocation {
    #[serde(rename = "geogLocation")]
    pub geog_location: GeogLocation,
}

#[derive(Debug, Deserialize)]
pub struct GeogLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct Variable {
    #[serde(rename = "variableName")]
    pub variable_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ValuesBlock {
    #[serde(default)]
    pub value: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
pub struct Observation {
    #[serde(rename = "dateTime")]
    pub date_time: String,
    pub value: String, // USGS returns numeric values as strings
}

/// A gauge site flattened to one row: identity, first-seen timestamp, and
/// a map from normalized variable key (e.g. "streamflow", "gageheight")
/// to the last value observed for that key.
#[derive(Debug, Clone, Serialize)]
pub struct SiteRecord {
    pub site_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub date_time: String,
    pub values: BTreeMap<String, f64>,
}

impl SiteRecord {
    pub fn streamflow(&self) -> Option<f64> {
        self.values.get("streamflow").copied()
    }

    pub fn gage_height(&self) -> Option<f64> {
        self.values.get("gageheight").copied()
    }

    pub fn flow_category(&self) -> FlowCategory {
        FlowCategory::for_flow(self.streamflow().unwrap_or(0.0))
    }

    pub fn height_category(&self) -> HeightCategory {
        HeightCategory::for_height(self.gage_height().unwrap_or(0.0))
    }
}

/// Visual-indicator bucket for streamflow, in cfs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowCategory {
    Low,
    Medium,
    High,
}

impl FlowCategory {
    pub fn for_flow(flow: f64) -> Self {
        if flow > 5000.0 {
            FlowCategory::High
        } else if flow > 1000.0 {
            FlowCategory::Medium
        } else {
            FlowCategory::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FlowCategory::Low => "low",
            FlowCategory::Medium => "medium",
            FlowCategory::High => "high",
        }
    }
}

/// Visual-indicator bucket for gage height, in feet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeightCategory {
    Low,
    Medium,
    High,
}

impl HeightCategory {
    pub fn for_height(height: f64) -> Self {
        if height > 10.0 {
            HeightCategory::High
        } else if height > 5.0 {
            HeightCategory::Medium
        } else {
            HeightCategory::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HeightCategory::Low => "low",
            HeightCategory::Medium => "medium",
            HeightCategory::High => "high",
        }
    }
}

// Per-site accumulator; entries keep observation order so that the flatten
// step's last-write-wins matches the order the upstream sent them.
struct SiteAccumulator {
    site_name: String,
    latitude: f64,
    longitude: f64,
    first_date_time: String,
    entries: Vec<(String, String)>, // (variableName, raw value)
}

/// Flattens an IV payload into one `SiteRecord` per site.
///
/// Sites accumulate across timeSeries entries: a site appearing under both
/// the discharge and the gage-height variable yields a single record with
/// both keys. After accumulation, records that lack a `gageheight` value or
/// whose `streamflow` is not strictly positive are dropped (quality gate,
/// applied once over the whole set).
pub fn normalize(payload: IvPayload) -> Vec<SiteRecord> {
    let container = match payload.value {
        Some(container) => container,
        None => {
            warn!("payload is missing the value.timeSeries container; treating as no data");
            return Vec::new();
        }
    };

    let mut sites: Vec<SiteAccumulator> = Vec::new();

    for entry in container.time_series {
        let site_name = entry.source_info.site_name;
        let geog = entry.source_info.geo_location.geog_location;
        let variable_name = entry.variable.variable_name;

        let observations = match entry.values.into_iter().next() {
            Some(block) => block.value,
            None => continue,
        };

        for obs in observations {
            match sites.iter_mut().find(|s| s.site_name == site_name) {
                Some(site) => {
                    site.entries.push((variable_name.clone(), obs.value));
                }
                None => {
                    sites.push(SiteAccumulator {
                        site_name: site_name.clone(),
                        latitude: geog.latitude,
                        longitude: geog.longitude,
                        first_date_time: obs.date_time,
                        entries: vec![(variable_name.clone(), obs.value)],
                    });
                }
            }
        }
    }

    let records: Vec<SiteRecord> = sites
        .into_iter()
        .map(|site| {
            let mut values = BTreeMap::new();
            for (variable_name, raw) in &site.entries {
                let key = variable_key(variable_name);
                match raw.parse::<f64>() {
                    Ok(value) => {
                        // Insert overwrites: collisions after key
                        // normalization are last-write-wins.
                        values.insert(key, value);
                    }
                    Err(_) => {
                        warn!(
                            site_name = %site.site_name,
                            variable = %variable_name,
                            raw = %raw,
                            "skipping non-numeric observation value"
                        );
                    }
                }
            }
            SiteRecord {
                site_name: site.site_name,
                latitude: site.latitude,
                longitude: site.longitude,
                date_time: format_date_time(&site.first_date_time),
                values,
            }
        })
        .filter(|record| {
            record.gage_height().is_some() && record.streamflow().map_or(false, |f| f > 0.0)
        })
        .collect();

    debug!("normalized payload into {} site records", records.len());
    records
}

/// Derives the flattened map key from a variable display name: the text
/// before the first comma, lower-cased, spaces removed.
/// "Streamflow, ft3/s" -> "streamflow"; "Gage height, ft" -> "gageheight".
pub fn variable_key(variable_name: &str) -> String {
    variable_name
        .split(',')
        .next()
        .unwrap_or("")
        .to_lowercase()
        .replace(' ', "")
}

/// Renders an RFC 3339 timestamp as `M/D/YYYY, h:MM:SS AM/PM` in the
/// timestamp's own UTC offset. Falls back to the raw string when the
/// upstream sends something unparseable.
pub fn format_date_time(date_time: &str) -> String {
    match DateTime::parse_from_rfc3339(date_time) {
        Ok(dt) => dt.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string(),
        Err(e) => {
            warn!("unparseable observation timestamp '{}': {}", date_time, e);
            date_time.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_from(json: &str) -> IvPayload {
        serde_json::from_str(json).expect("test payload should deserialize")
    }

    fn site_entry(site: &str, lat: f64, lng: f64, variable: &str, value: &str, at: &str) -> String {
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

    fn payload_with_entries(entries: &[String]) -> IvPayload {
        payload_from(&format!(
            r#"{{ "value": {{ "timeSeries": [ {} ] }} }}"#,
            entries.join(",")
        ))
    }

    #[test]
    fn test_variable_key_takes_first_comma_segment() {
        assert_eq!(variable_key("Streamflow, ft3/s"), "streamflow");
        assert_eq!(variable_key("Gage height, ft"), "gageheight");
        assert_eq!(variable_key("Temperature"), "temperature");
    }

    #[test]
    fn test_format_date_time_us_style() {
        assert_eq!(
            format_date_time("2024-05-01T12:15:00.000-05:00"),
            "5/1/2024, 12:15:00 PM"
        );
        assert_eq!(
            format_date_time("2024-11-09T06:05:30.000-07:00"),
            "11/9/2024, 6:05:30 AM"
        );
    }

    #[test]
    fn test_format_date_time_falls_back_to_raw() {
        assert_eq!(format_date_time("not a timestamp"), "not a timestamp");
    }

    #[test]
    fn test_missing_container_yields_empty() {
        assert!(normalize(payload_from("{}")).is_empty());
        assert!(normalize(payload_from(r#"{ "name": "other shape" }"#)).is_empty());
    }

    #[test]
    fn test_empty_time_series_yields_empty() {
        let payload = payload_from(r#"{ "value": { "timeSeries": [] } }"#);
        assert!(normalize(payload).is_empty());
    }

    #[test]
    fn test_single_site_both_variables() {
        let payload = payload_with_entries(&[
            site_entry(
                "Gauge A",
                40.0,
                -105.0,
                "Streamflow, ft3/s",
                "1500",
                "2024-05-01T12:00:00.000-05:00",
            ),
            site_entry(
                "Gauge A",
                40.0,
                -105.0,
                "Gage height, ft",
                "6.2",
                "2024-05-01T12:00:00.000-05:00",
            ),
        ]);

        let records = normalize(payload);
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.site_name, "Gauge A");
        assert_eq!(record.latitude, 40.0);
        assert_eq!(record.longitude, -105.0);
        assert_eq!(record.date_time, "5/1/2024, 12:00:00 PM");
        assert_eq!(record.streamflow(), Some(1500.0));
        assert_eq!(record.gage_height(), Some(6.2));
    }

    #[test]
    fn test_same_site_accumulates_into_one_record() {
        let payload = payload_with_entries(&[
            site_entry(
                "Cherry Creek",
                39.7,
                -104.9,
                "Streamflow, ft3/s",
                "320",
                "2024-06-10T08:00:00.000-06:00",
            ),
            site_entry(
                "Cherry Creek",
                39.7,
                -104.9,
                "Gage height, ft",
                "3.1",
                "2024-06-10T08:00:00.000-06:00",
            ),
            site_entry(
                "South Platte",
                39.8,
                -105.0,
                "Streamflow, ft3/s",
                "2100",
                "2024-06-10T08:00:00.000-06:00",
            ),
            site_entry(
                "South Platte",
                39.8,
                -105.0,
                "Gage height, ft",
                "7.4",
                "2024-06-10T08:00:00.000-06:00",
            ),
        ]);

        let records = normalize(payload);
        assert_eq!(records.len(), 2, "two sites should yield exactly two records");
        assert_eq!(records[0].site_name, "Cherry Creek");
        assert_eq!(records[1].site_name, "South Platte");
    }

    #[test]
    fn test_quality_gate_drops_zero_streamflow() {
        let payload = payload_with_entries(&[
            site_entry(
                "Dry Gulch",
                38.0,
                -106.0,
                "Streamflow, ft3/s",
                "0",
                "2024-07-01T00:00:00.000-06:00",
            ),
            site_entry(
                "Dry Gulch",
                38.0,
                -106.0,
                "Gage height, ft",
                "1.2",
                "2024-07-01T00:00:00.000-06:00",
            ),
        ]);

        assert!(normalize(payload).is_empty());
    }

    #[test]
    fn test_quality_gate_drops_missing_gage_height() {
        let payload = payload_with_entries(&[site_entry(
            "Flow Only",
            38.0,
            -106.0,
            "Streamflow, ft3/s",
            "450",
            "2024-07-01T00:00:00.000-06:00",
        )]);

        assert!(normalize(payload).is_empty());
    }

    #[test]
    fn test_all_sites_without_gage_height_yield_empty() {
        let payload = payload_with_entries(&[
            site_entry(
                "Site One",
                38.0,
                -106.0,
                "Streamflow, ft3/s",
                "450",
                "2024-07-01T00:00:00.000-06:00",
            ),
            site_entry(
                "Site Two",
                38.5,
                -106.5,
                "Streamflow, ft3/s",
                "900",
                "2024-07-01T00:00:00.000-06:00",
            ),
        ]);

        assert!(normalize(payload).is_empty());
    }

    #[test]
    fn test_output_always_satisfies_quality_gate() {
        let payload = payload_with_entries(&[
            site_entry(
                "Keeper",
                40.0,
                -105.0,
                "Streamflow, ft3/s",
                "12",
                "2024-07-01T00:00:00.000-06:00",
            ),
            site_entry(
                "Keeper",
                40.0,
                -105.0,
                "Gage height, ft",
                "0.8",
                "2024-07-01T00:00:00.000-06:00",
            ),
            site_entry(
                "Backwater",
                40.1,
                -105.1,
                "Streamflow, ft3/s",
                "-5",
                "2024-07-01T00:00:00.000-06:00",
            ),
            site_entry(
                "Backwater",
                40.1,
                -105.1,
                "Gage height, ft",
                "2.0",
                "2024-07-01T00:00:00.000-06:00",
            ),
        ]);

        let records = normalize(payload);
        assert_eq!(records.len(), 1);
        for record in &records {
            assert!(record.streamflow().unwrap() > 0.0);
            assert!(record.gage_height().is_some());
        }
    }

    #[test]
    fn test_colliding_keys_are_last_write_wins() {
        // Two observations of the same variable for one site: the later one
        // in accumulation order replaces the earlier value under the key.
        let payload = payload_with_entries(&[
            site_entry(
                "Busy Gauge",
                40.0,
                -105.0,
                "Streamflow, ft3/s",
                "100",
                "2024-07-01T00:00:00.000-06:00",
            ),
            site_entry(
                "Busy Gauge",
                40.0,
                -105.0,
                "Streamflow, ft3/s",
                "250",
                "2024-07-01T00:15:00.000-06:00",
            ),
            site_entry(
                "Busy Gauge",
                40.0,
                -105.0,
                "Gage height, ft",
                "4.0",
                "2024-07-01T00:00:00.000-06:00",
            ),
        ]);

        let records = normalize(payload);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].streamflow(), Some(250.0));
        // Display timestamp stays the first observation seen for the site.
        assert_eq!(records[0].date_time, "7/1/2024, 12:00:00 AM");
    }

    #[test]
    fn test_non_numeric_value_is_skipped() {
        let payload = payload_with_entries(&[
            site_entry(
                "Noisy Gauge",
                40.0,
                -105.0,
                "Streamflow, ft3/s",
                "Ice",
                "2024-01-15T00:00:00.000-06:00",
            ),
            site_entry(
                "Noisy Gauge",
                40.0,
                -105.0,
                "Gage height, ft",
                "4.0",
                "2024-01-15T00:00:00.000-06:00",
            ),
        ]);

        // The unparseable streamflow leaves the key unset, so the gate drops
        // the record rather than letting garbage through.
        assert!(normalize(payload).is_empty());
    }

    #[test]
    fn test_entry_without_values_block_is_skipped() {
        let payload = payload_from(
            r#"{
              "value": {
                "timeSeries": [{
                  "sourceInfo": {
                    "siteName": "No Values",
                    "geoLocation": { "geogLocation": { "latitude": 40.0, "longitude": -105.0 } }
                  },
                  "variable": { "variableName": "Streamflow, ft3/s" },
                  "values": []
                }]
              }
            }"#,
        );

        assert!(normalize(payload).is_empty());
    }

    #[test]
    fn test_flow_category_thresholds() {
        assert_eq!(FlowCategory::for_flow(500.0), FlowCategory::Low);
        assert_eq!(FlowCategory::for_flow(1000.0), FlowCategory::Low);
        assert_eq!(FlowCategory::for_flow(1001.0), FlowCategory::Medium);
        assert_eq!(FlowCategory::for_flow(5000.0), FlowCategory::Medium);
        assert_eq!(FlowCategory::for_flow(5001.0), FlowCategory::High);
    }

    #[test]
    fn test_height_category_thresholds() {
        assert_eq!(HeightCategory::for_height(2.0), HeightCategory::Low);
        assert_eq!(HeightCategory::for_height(5.0), HeightCategory::Low);
        assert_eq!(HeightCategory::for_height(7.5), HeightCategory::Medium);
        assert_eq!(HeightCategory::for_height(10.0), HeightCategory::Medium);
        assert_eq!(HeightCategory::for_height(12.0), HeightCategory::High);
    }
}
