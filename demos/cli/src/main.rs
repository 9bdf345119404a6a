use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use directory_core::{Coordinates, DirectoryConfig, SearchCriteria};
use directory_engine::{facilities_for_page, rank_by_status, DirectoryPage, DirectoryService};
use log::info;

#[derive(Parser, Debug)]
#[command(
    name = "directory-cli",
    about = "Normalize a treatment facility dataset and search it."
)]
struct Args {
    /// Path to the facility JSON file (raw or already normalized).
    #[arg(short, long)]
    input: PathBuf,

    /// Optional JSON file with configuration overrides.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Free-text search; any word may match.
    #[arg(short, long, default_value = "")]
    search: String,

    /// Radius in miles around --lat/--lng. 999 means unlimited.
    #[arg(short, long)]
    radius: Option<String>,

    #[arg(long, default_value = "")]
    age_group: String,

    #[arg(long, default_value = "")]
    gender: String,

    #[arg(long, default_value = "")]
    treatment: String,

    #[arg(long, default_value = "")]
    facility_type: String,

    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    lat: Option<f64>,

    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lng: Option<f64>,

    /// Directory page: all, treatment-center, halfway-house, outpatient, detox.
    #[arg(short, long, default_value = "all")]
    page: DirectoryPage,

    /// Print the render-safe projection instead of canonical facilities.
    #[arg(long)]
    render: bool,

    /// Order results by availability status.
    #[arg(long)]
    rank: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => DirectoryConfig::default(),
    };
    let service = DirectoryService::new(config);

    let data = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Could not read file {:?}", args.input))?;
    let facilities = service
        .load_dataset_str(&data)
        .with_context(|| format!("Could not load facilities from {:?}", args.input))?;
    info!("Loaded {} facilities", facilities.len());

    let location = args.lat.zip(args.lng).map(|(lat, lng)| Coordinates { lat, lng });
    let criteria = criteria_from_args(&args, service.config(), location.is_some());

    let on_page = facilities_for_page(&facilities, args.page);
    let outcome = service.search_with_fallback(&on_page, &criteria, location);
    let unlimited = service.config().unlimited_radius;

    if outcome.broadened {
        info!(
            "Nothing within {} miles; showing results at any distance",
            criteria.radius_miles(unlimited)
        );
    }
    let summary = outcome.criteria.summary(unlimited);
    if !summary.is_empty() {
        info!("Filters: {}", summary.join(", "));
    }

    let mut results = outcome.facilities;
    if args.rank {
        rank_by_status(&mut results);
    }

    println!(
        "Page: {}\nMatching facilities: {} of {}",
        args.page,
        results.len(),
        on_page.len()
    );

    let output = if args.render {
        let safe: Vec<_> = results
            .iter()
            .map(|facility| service.sanitize_for_render(facility))
            .collect();
        serde_json::to_string_pretty(&safe)?
    } else {
        serde_json::to_string_pretty(&results)?
    };
    println!("{output}");

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<DirectoryConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read config file {path:?}"))?;
    let config: DirectoryConfig = serde_json::from_str(&text)
        .with_context(|| format!("Could not parse config file {path:?}"))?;
    config.validate()?;
    Ok(config)
}

/// A location without an explicit radius searches the configured default
/// radius.
fn criteria_from_args(args: &Args, config: &DirectoryConfig, located: bool) -> SearchCriteria {
    let radius = match (&args.radius, located) {
        (Some(radius), _) => radius.clone(),
        (None, true) => config.default_search_radius.to_string(),
        (None, false) => String::new(),
    };

    SearchCriteria {
        search_term: args.search.clone(),
        radius,
        age_group: args.age_group.clone(),
        gender_served: args.gender.clone(),
        treatment_type: args.treatment.clone(),
        facility_type: args.facility_type.clone(),
    }
}
