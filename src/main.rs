use std::collections::HashMap;

use clap::Parser;
use tracing::{info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use river_gauge_viewer::app::{self, LocationEvent, QueryOutcome, RiverViewer};
use river_gauge_viewer::config::Config;
use river_gauge_viewer::fetcher::GaugeDataFetcher;
use river_gauge_viewer::normalizer::SiteRecord;
use river_gauge_viewer::presentation::{
    GeolocationProvider, MapWidget, MarkerHandle, MarkerSpec, Notice, TableHandle, TableWidget,
};

/// Locate nearby river gauges and print their latest streamflow and gage
/// height readings.
#[derive(Parser, Debug)]
#[command(name = "river-gauge-viewer")]
struct Args {
    /// Center latitude; omit to fall back to the default location
    #[arg(long)]
    lat: Option<f64>,

    /// Center longitude; omit to fall back to the default location
    #[arg(long)]
    lng: Option<f64>,

    /// Search radius in degrees
    #[arg(long, env = "SEARCH_RADIUS_DEGREES")]
    radius: Option<f64>,
}

/// "Geolocation" for a terminal session: the coordinate the user passed on
/// the command line, if any.
struct CliGeolocation {
    fix: Option<(f64, f64)>,
}

impl GeolocationProvider for CliGeolocation {
    fn current_position(&self) -> Option<(f64, f64)> {
        self.fix
    }
}

/// Map rendition for a terminal: keeps the marker set and prints popups
/// as text blocks.
#[derive(Default)]
struct TerminalMap {
    next_id: u64,
    markers: HashMap<u64, MarkerSpec>,
}

impl MapWidget for TerminalMap {
    fn set_center(&mut self, lat: f64, lng: f64) {
        info!("map centered at {:.6}, {:.6}", lat, lng);
    }

    fn set_zoom(&mut self, zoom: u8) {
        info!("map zoom set to {}", zoom);
    }

    fn add_marker(&mut self, spec: MarkerSpec) -> MarkerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.markers.insert(id, spec);
        MarkerHandle(id)
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        self.markers.remove(&handle.0);
    }

    fn open_popup(&mut self, handle: MarkerHandle) {
        if let Some(spec) = self.markers.get(&handle.0) {
            let (lat, lng) = spec.directions_coordinate();
            println!();
            println!("{}", spec.site_name);
            println!("  Date/Time:   {}", spec.date_time);
            println!("  Location:    {:.6}, {:.6}", lat, lng);
            println!("  Streamflow:  {} cfs", spec.streamflow);
            println!("  Gage height: {} ft", spec.gage_height);
        }
    }
}

/// Plain-text table, default-sorted by streamflow descending like the
/// grid widget contract asks for.
#[derive(Default)]
struct TerminalTable {
    next_id: u64,
}

impl TableWidget for TerminalTable {
    fn render(&mut self, records: &[SiteRecord]) -> TableHandle {
        let mut order: Vec<&SiteRecord> = records.iter().collect();
        order.sort_by(|a, b| {
            b.streamflow()
                .unwrap_or(0.0)
                .total_cmp(&a.streamflow().unwrap_or(0.0))
        });

        println!(
            "{:<52} {:<24} {:>16} {:>8} {:>17} {:>8}",
            "Site Name", "Date/Time", "Streamflow (cfs)", "", "Gage Height (ft)", ""
        );
        for record in order {
            println!(
                "{:<52} {:<24} {:>16} {:>8} {:>17} {:>8}",
                record.site_name,
                record.date_time,
                record.streamflow().unwrap_or(0.0),
                record.flow_category().label(),
                record.gage_height().unwrap_or(0.0),
                record.height_category().label(),
            );
        }

        let id = self.next_id;
        self.next_id += 1;
        TableHandle(id)
    }

    fn destroy(&mut self, _handle: TableHandle) {}

    fn set_count(&mut self, count: usize) {
        println!("\n{} river data points", count);
    }

    fn show_notice(&mut self, notice: &Notice) {
        match notice {
            Notice::Loading => println!("Loading river data..."),
            Notice::NoData => println!(
                "No river data found for this location. Try another area with rivers or streams."
            ),
            Notice::Error(message) => println!("Error fetching river data: {}", message),
        }
    }
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,river_gauge_viewer=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(radius) = args.radius {
        config.radius_degrees = radius;
    }
    info!("Starting river gauge viewer with config: {:?}", config);

    let provider = CliGeolocation {
        fix: match (args.lat, args.lng) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        },
    };
    let (lat, lng) = app::initial_position(&provider);

    let fetcher = GaugeDataFetcher::with_base_url(config.iv_url.clone(), config.radius_degrees);
    let mut viewer = RiverViewer::new(fetcher, TerminalMap::default(), TerminalTable::default());

    let outcome = viewer.handle(LocationEvent::GeolocationFix { lat, lng }).await;
    if let QueryOutcome::Failed(message) = outcome {
        return Err(message.into());
    }

    Ok(())
}
