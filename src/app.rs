use tracing::{info, instrument, warn};

use crate::fetcher::GaugeDataFetcher;
use crate::presentation::{self, GeolocationProvider, MapWidget, Notice, TableWidget};
use crate::view_state::ViewState;

/// Continental-US centroid, used when geolocation is unavailable.
pub const DEFAULT_CENTER: (f64, f64) = (39.8283, -98.5795);

pub const DEFAULT_ZOOM: u8 = 12;

/// Zoom applied when a table row recenters the map on its site.
pub const ROW_FOCUS_ZOOM: u8 = 14;

/// A chosen location, regardless of which widget it came from. All
/// variants flow through the same handler; the fetch pipeline never
/// learns which widget originated the event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationEvent {
    GeolocationFix { lat: f64, lng: f64 },
    MapClick { lat: f64, lng: f64 },
    SearchSelection { lat: f64, lng: f64 },
}

impl LocationEvent {
    pub fn coordinate(&self) -> (f64, f64) {
        match *self {
            LocationEvent::GeolocationFix { lat, lng }
            | LocationEvent::MapClick { lat, lng }
            | LocationEvent::SearchSelection { lat, lng } => (lat, lng),
        }
    }
}

/// Terminal state of one query cycle. The cycle itself is
/// Idle -> Loading -> {Populated | Empty | Failed} -> Idle; the viewer is
/// back at Idle by the time the outcome is returned, so the next location
/// event simply starts a new cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Populated(usize),
    Empty,
    Failed(String),
}

/// Resolves the starting position: the provider's fix, or the default
/// center when geolocation is denied or unsupported. Never an error.
pub fn initial_position<G: GeolocationProvider>(provider: &G) -> (f64, f64) {
    match provider.current_position() {
        Some((lat, lng)) => {
            info!("geolocation fix at {}, {}", lat, lng);
            (lat, lng)
        }
        None => {
            info!(
                "geolocation unavailable, defaulting to {}, {}",
                DEFAULT_CENTER.0, DEFAULT_CENTER.1
            );
            DEFAULT_CENTER
        }
    }
}

/// Orchestrates fetch-and-sync cycles over a map widget and a table
/// widget. Owns the only mutable session state; every failure path ends
/// in a re-renderable notice, never a crash.
pub struct RiverViewer<M, T> {
    fetcher: GaugeDataFetcher,
    state: ViewState,
    map: M,
    table: T,
    last_outcome: Option<QueryOutcome>,
}

impl<M: MapWidget, T: TableWidget> RiverViewer<M, T> {
    pub fn new(fetcher: GaugeDataFetcher, map: M, table: T) -> Self {
        Self {
            fetcher,
            state: ViewState::new(),
            map,
            table,
            last_outcome: None,
        }
    }

    /// Routes a location event: recenter the map, then run one query
    /// cycle at that coordinate.
    pub async fn handle(&mut self, event: LocationEvent) -> QueryOutcome {
        let (lat, lng) = event.coordinate();
        info!(?event, "location chosen");
        self.map.set_center(lat, lng);
        self.on_location_chosen(lat, lng).await
    }

    /// One full query cycle: fetch, replace the dataset, fan out to map
    /// and table. All fetch failures are absorbed here into the Failed
    /// notice; nothing escapes.
    #[instrument(skip(self))]
    pub async fn on_location_chosen(&mut self, lat: f64, lng: f64) -> QueryOutcome {
        self.table.show_notice(&Notice::Loading);

        let outcome = match self.fetcher.fetch(lat, lng).await {
            Ok(records) => {
                let count = records.len();
                presentation::sync(&mut self.state, &mut self.map, &mut self.table, records);
                if count == 0 {
                    info!("no river data found at {}, {}", lat, lng);
                    QueryOutcome::Empty
                } else {
                    info!("found {} river data points", count);
                    QueryOutcome::Populated(count)
                }
            }
            Err(e) => {
                warn!("fetch failed: {}", e);
                let message = e.to_string();
                presentation::show_failure(
                    &mut self.state,
                    &mut self.map,
                    &mut self.table,
                    message.clone(),
                );
                QueryOutcome::Failed(message)
            }
        };

        self.last_outcome = Some(outcome.clone());
        outcome
    }

    /// Table-row selection: center the map on the row's site, zoom in,
    /// and open the matching marker's popup. Row position and marker
    /// position agree by construction. Returns false for a stale index.
    pub fn on_row_selected(&mut self, index: usize) -> bool {
        let coordinate = self
            .state
            .current()
            .get(index)
            .map(|record| (record.latitude, record.longitude));
        match (coordinate, self.state.marker_at(index)) {
            (Some((lat, lng)), Some(marker)) => {
                self.map.set_center(lat, lng);
                self.map.set_zoom(ROW_FOCUS_ZOOM);
                self.map.open_popup(marker);
                true
            }
            _ => {
                warn!("row selection for unknown index {}", index);
                false
            }
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn last_outcome(&self) -> Option<&QueryOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    pub fn map(&self) -> &M {
        &self.map
    }
}
