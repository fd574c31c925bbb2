use tracing::debug;

use crate::normalizer::SiteRecord;
use crate::view_state::ViewState;

/// Opaque handle to a marker owned by the map widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerHandle(pub u64);

/// Opaque handle to the active table view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableHandle(pub u64);

/// Everything a marker needs to render its popup: identity, timestamp,
/// both measurements, and the coordinate pair (also used for the
/// directions link).
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub site_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub date_time: String,
    pub streamflow: f64,
    pub gage_height: f64,
}

impl MarkerSpec {
    pub fn for_record(record: &SiteRecord) -> Self {
        Self {
            site_name: record.site_name.clone(),
            latitude: record.latitude,
            longitude: record.longitude,
            date_time: record.date_time.clone(),
            // The quality gate guarantees both values on any record that
            // reaches presentation.
            streamflow: record.streamflow().unwrap_or(0.0),
            gage_height: record.gage_height().unwrap_or(0.0),
        }
    }

    pub fn directions_coordinate(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

/// User-visible state of the table area when there are no rows to show.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Loading,
    NoData,
    Error(String),
}

/// Map widget operations the viewer depends on. The core never assumes a
/// rendering technology, only these operations.
pub trait MapWidget {
    fn set_center(&mut self, lat: f64, lng: f64);
    fn set_zoom(&mut self, zoom: u8);
    fn add_marker(&mut self, spec: MarkerSpec) -> MarkerHandle;
    fn remove_marker(&mut self, handle: MarkerHandle);
    fn open_popup(&mut self, handle: MarkerHandle);
}

/// Table/grid widget operations. The widget renders all given rows and
/// default-sorts by streamflow descending; row clicks report the row's
/// position in the order the rows were given, not the displayed order.
pub trait TableWidget {
    fn render(&mut self, records: &[SiteRecord]) -> TableHandle;
    fn destroy(&mut self, handle: TableHandle);
    fn set_count(&mut self, count: usize);
    fn show_notice(&mut self, notice: &Notice);
}

/// Supplies the user's position, or nothing when geolocation is denied or
/// unsupported.
pub trait GeolocationProvider {
    fn current_position(&self) -> Option<(f64, f64)>;
}

/// Rebuilds markers and table so both reflect exactly `records`.
///
/// Ordering within one pass: every old marker is removed before any new
/// marker is created, new markers exist before the table is rebuilt, and
/// the count indicator updates last. Markers are created in record order,
/// so a table row at position `i` maps to `state.marker_at(i)`.
///
/// Idempotent: syncing the same records twice leaves exactly one marker
/// per record.
pub fn sync<M: MapWidget, T: TableWidget>(
    state: &mut ViewState,
    map: &mut M,
    table: &mut T,
    records: Vec<SiteRecord>,
) {
    teardown(state, map, table);
    state.replace(records);

    let markers: Vec<MarkerHandle> = state
        .current()
        .iter()
        .map(|record| map.add_marker(MarkerSpec::for_record(record)))
        .collect();
    debug!("created {} markers", markers.len());
    state.set_markers(markers);

    if state.current().is_empty() {
        table.show_notice(&Notice::NoData);
    } else {
        let handle = table.render(state.current());
        state.set_table(handle);
    }

    table.set_count(state.current().len());
}

/// Failed terminal state: tear everything down and show the error notice
/// in place of the table.
pub fn show_failure<M: MapWidget, T: TableWidget>(
    state: &mut ViewState,
    map: &mut M,
    table: &mut T,
    message: String,
) {
    teardown(state, map, table);
    state.clear();
    table.show_notice(&Notice::Error(message));
    table.set_count(0);
}

fn teardown<M: MapWidget, T: TableWidget>(state: &mut ViewState, map: &mut M, table: &mut T) {
    let old_markers = state.take_markers();
    if !old_markers.is_empty() {
        debug!("removing {} stale markers", old_markers.len());
    }
    for handle in old_markers {
        map.remove_marker(handle);
    }
    if let Some(handle) = state.take_table() {
        table.destroy(handle);
    }
}
