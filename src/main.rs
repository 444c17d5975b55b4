use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use rusty_sorbent::data::loader::load_file;
use rusty_sorbent::isotherm::decode::JsonIsothermDecoder;
use rusty_sorbent::isotherm::CurvePanel;
use rusty_sorbent::overlay::{ErrorMarker, MetricFamily};
use rusty_sorbent::{AdsorbateSlot, CombinedMaterialRow, IsothermType, Session, SessionConfig};

/// Screen adsorbents for a two-gas separation from a table of isotherm measurements.
#[derive(Debug, Parser)]
#[command(name = "rusty-sorbent", version)]
struct Cli {
    /// Measurement table (.parquet, .json or .csv).
    dataset: PathBuf,

    /// JSON session configuration; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of isotherm documents (defaults to `isotherms/` next to the dataset).
    #[arg(long)]
    isotherms: Option<PathBuf>,

    #[arg(long)]
    adsorbate_1: Option<String>,

    #[arg(long)]
    adsorbate_2: Option<String>,

    /// Only keep `experimental` or `simulated` measurements.
    #[arg(long)]
    kind: Option<IsothermType>,

    /// Target temperature (K).
    #[arg(long)]
    temperature: Option<f64>,

    /// Temperature tolerance (K).
    #[arg(long)]
    tolerance: Option<f64>,

    /// Pressure (bar) for the uptake comparison.
    #[arg(long)]
    uptake: Option<f64>,

    /// Working capacity range (bar).
    #[arg(long, num_args = 2, value_names = ["LOW", "HIGH"])]
    working_capacity: Option<Vec<f64>>,

    /// Number of materials to report.
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Load the isotherms of this material.
    #[arg(long)]
    select: Option<String>,

    /// Seconds to wait for isotherms of the selected material.
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Print a JSON report instead of a table.
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn session_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::from_path(path)?,
            None => SessionConfig::default(),
        };
        let filter = &mut config.filter;
        if let Some(a) = &self.adsorbate_1 {
            filter.adsorbate_1 = a.clone();
        }
        if let Some(a) = &self.adsorbate_2 {
            filter.adsorbate_2 = a.clone();
        }
        if self.kind.is_some() {
            filter.kind = self.kind;
        }
        if let Some(t) = self.temperature {
            filter.temperature_target = t;
        }
        if let Some(t) = self.tolerance {
            filter.temperature_tolerance = t;
        }
        if let Some(p) = self.uptake {
            config.query.uptake_pressure = p;
        }
        if let Some(range) = &self.working_capacity {
            config.query.working_capacity_low = range[0];
            config.query.working_capacity_high = range[1];
        }
        Ok(config)
    }
}

#[derive(Serialize)]
struct Report<'a> {
    adsorbate_1: &'a str,
    adsorbate_2: &'a str,
    materials: usize,
    top: Vec<&'a CombinedMaterialRow>,
    selected: Option<SelectedReport<'a>>,
}

#[derive(Serialize)]
struct SelectedReport<'a> {
    material: String,
    henry: &'a [ErrorMarker],
    uptake: &'a [ErrorMarker],
    working_capacity: &'a [ErrorMarker],
    isotherms_1: &'a CurvePanel,
    isotherms_2: &'a CurvePanel,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = cli.session_config()?;

    let dataset = load_file(&cli.dataset, config.grid)
        .with_context(|| format!("loading {}", cli.dataset.display()))?;
    log::info!(
        "{} measurements of {} materials, adsorbates {:?}",
        dataset.len(),
        dataset.material_count(),
        dataset.adsorbates
    );

    let isotherm_dir = cli.isotherms.clone().unwrap_or_else(|| {
        cli.dataset
            .parent()
            .map(|p| p.join("isotherms"))
            .unwrap_or_else(|| PathBuf::from("isotherms"))
    });
    let decoder = Arc::new(JsonIsothermDecoder::new(isotherm_dir));
    let mut session = Session::new(Arc::new(dataset), decoder, &config)?;

    let selected = match &cli.select {
        Some(material) => {
            let index = session
                .store()
                .material_index(material)
                .with_context(|| format!("'{material}' is not in the screened set"))?;
            session.set_selection(&[index])?;
            if !session.wait_for_curves(Duration::from_secs(cli.timeout)) {
                log::warn!("timed out waiting for isotherms of {material}");
            }
            Some(material.clone())
        }
        None => None,
    };

    let store = session.store();
    let criteria = store.criteria();
    let report = Report {
        adsorbate_1: &criteria.adsorbate_1,
        adsorbate_2: &criteria.adsorbate_2,
        materials: store.len(),
        top: store
            .ranked(cli.top)
            .into_iter()
            .filter_map(|i| store.row(i))
            .collect(),
        selected: selected.map(|material| SelectedReport {
            material,
            henry: session.overlay().family(MetricFamily::Henry),
            uptake: session.overlay().family(MetricFamily::Uptake),
            working_capacity: session.overlay().family(MetricFamily::WorkingCapacity),
            isotherms_1: session.curves(AdsorbateSlot::First),
            isotherms_2: session.curves(AdsorbateSlot::Second),
        }),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_table(&report);
    }
    Ok(())
}

fn print_table(report: &Report<'_>) {
    println!(
        "{} materials screened for {} / {}",
        report.materials, report.adsorbate_1, report.adsorbate_2
    );
    if report.materials == 0 {
        println!("no material has data for both adsorbates");
        return;
    }
    println!(
        "{:<32} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "material", "KH2/KH1", "score", "uptake 1", "uptake 2", "WC 1", "WC 2"
    );
    for row in &report.top {
        println!(
            "{:<32} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>10.3}",
            row.material,
            row.selectivity,
            row.screening,
            row.uptake.x,
            row.uptake.y,
            row.working_capacity.x,
            row.working_capacity.y
        );
    }

    if let Some(selected) = &report.selected {
        println!();
        println!("isotherms of {}", selected.material);
        for (adsorbate, panel) in [
            (report.adsorbate_1, selected.isotherms_1),
            (report.adsorbate_2, selected.isotherms_2),
        ] {
            println!("  {adsorbate}: {} curves", panel.curves.len());
            for curve in &panel.curves {
                println!(
                    "    {:<40} {} points  {}  {}",
                    curve.label,
                    curve.pressure.len(),
                    curve.color,
                    curve.citation
                );
            }
        }
    }
}
