use crate::normalizer::SiteRecord;
use crate::presentation::{MarkerHandle, TableHandle};

/// The single mutable slot behind the viewer: the current dataset plus the
/// presentation handles derived from it. Replaced wholesale on every
/// successful query; nothing survives a new location query except by being
/// re-derived from the new payload.
///
/// Marker and table handles are only ever swapped through the presentation
/// sync pass, so the dataset and what is on screen cannot drift apart.
#[derive(Debug, Default)]
pub struct ViewState {
    records: Vec<SiteRecord>,
    markers: Vec<MarkerHandle>,
    table: Option<TableHandle>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swaps in a new dataset. Presentation handles are untouched here;
    /// the sync pass tears them down before this is called.
    pub fn replace(&mut self, records: Vec<SiteRecord>) {
        self.records = records;
    }

    pub fn current(&self) -> &[SiteRecord] {
        &self.records
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.markers.clear();
        self.table = None;
    }

    /// Takes ownership of the active marker handles for teardown.
    pub fn take_markers(&mut self) -> Vec<MarkerHandle> {
        std::mem::take(&mut self.markers)
    }

    pub fn set_markers(&mut self, markers: Vec<MarkerHandle>) {
        self.markers = markers;
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Marker handle for the record at `index`; markers are indexed in the
    /// same order as `current()`, so positional lookup is valid.
    pub fn marker_at(&self, index: usize) -> Option<MarkerHandle> {
        self.markers.get(index).copied()
    }

    pub fn take_table(&mut self) -> Option<TableHandle> {
        self.table.take()
    }

    pub fn set_table(&mut self, table: TableHandle) {
        self.table = Some(table);
    }
}
