use tracing::{debug, instrument, warn};

use crate::fetch_error::FetchError;
use crate::normalizer::{self, IvPayload, SiteRecord};

/// USGS NWIS Instantaneous Values endpoint.
pub const DEFAULT_IV_URL: &str = "https://waterservices.usgs.gov/nwis/iv/";

/// NWIS parameter codes: discharge (streamflow) and gage height.
pub const PARAM_DISCHARGE: &str = "00060";
pub const PARAM_GAGE_HEIGHT: &str = "00065";

/// Default catch-area half-width in degrees. A flat lat/lon delta, not
/// geodesically corrected, so the physical box size varies with latitude.
pub const DEFAULT_RADIUS_DEGREES: f64 = 0.5;

/// Square query region around a center point, expressed as the
/// west/south/east/north bounds NWIS expects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn around(center_lat: f64, center_lng: f64, radius_degrees: f64) -> Self {
        Self {
            west: center_lng - radius_degrees,
            south: center_lat - radius_degrees,
            east: center_lng + radius_degrees,
            north: center_lat + radius_degrees,
        }
    }

    /// Renders the `bBox` query value, each bound to 6 decimal places.
    pub fn query_value(&self) -> String {
        format!(
            "{:.6},{:.6},{:.6},{:.6}",
            self.west, self.south, self.east, self.north
        )
    }
}

/// Single-shot client for the NWIS IV endpoint. One query covers both the
/// discharge and gage-height parameters for stream-type sites of all
/// statuses inside the bounding box.
#[derive(Clone)]
pub struct GaugeDataFetcher {
    client: reqwest::Client,
    base_url: String,
    radius_degrees: f64,
}

impl GaugeDataFetcher {
    pub fn new(radius_degrees: f64) -> Self {
        Self::with_base_url(DEFAULT_IV_URL.to_string(), radius_degrees)
    }

    /// Custom base URL, for pointing tests at a mock server.
    pub fn with_base_url(base_url: String, radius_degrees: f64) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            radius_degrees,
        }
    }

    pub fn request_url(&self, center_lat: f64, center_lng: f64) -> String {
        let bbox = BoundingBox::around(center_lat, center_lng, self.radius_degrees);
        format!(
            "{}?format=json&bBox={}&parameterCd={},{}&siteType=ST&siteStatus=all",
            self.base_url,
            bbox.query_value(),
            PARAM_DISCHARGE,
            PARAM_GAGE_HEIGHT,
        )
    }

    /// Fetches and normalizes gauge data around a center point.
    ///
    /// Transport failures and non-success statuses propagate as
    /// `FetchError`; a body that is not the expected JSON shape is
    /// recovered as an empty result so callers treat "no data" and
    /// "unparseable data" uniformly.
    #[instrument(skip(self), fields(lat = %center_lat, lng = %center_lng))]
    pub async fn fetch(
        &self,
        center_lat: f64,
        center_lng: f64,
    ) -> Result<Vec<SiteRecord>, FetchError> {
        let url = self.request_url(center_lat, center_lng);
        debug!("Sending NWIS IV request: {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        debug!("Received HTTP response with status: {}", status);

        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.text().await?;
        debug!("Retrieved response body, size: {} bytes", body.len());

        let payload: IvPayload = match serde_json::from_str(&body) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("response body is not valid IV JSON ({}); treating as no data", e);
                return Ok(Vec::new());
            }
        };

        Ok(normalizer::normalize(payload))
    }
}
