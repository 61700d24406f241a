mod error;
mod fuel_entry;
mod metrics;
mod normalizer;
mod price;
mod store;
mod validator;
mod window;

use crate::error::LoadError;
use crate::fuel_entry::{FuelEntry, FuelLog, FuelType};
use crate::metrics::{Metrics, compute_metrics};
use crate::price::{FallbackPrices, PriceCatalog, resolve_price};
use crate::store::{CsvStore, load_price_catalog};
use crate::validator::{EntrySubmission, ValidationWarning, validate};
use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use clap::{Args, Parser, Subcommand};
use jiff::Zoned;
use jiff::civil::Date;
use std::fmt::Display;
use std::io;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Fuel log dashboard.
/// Keeps a CSV log of fill-ups and derives distance, fuel economy and cost figures from it.
#[derive(Parser, Debug)]
#[command(version, long_about)]
struct Fuelstats {
    /// CSV file holding the fuel log (Date, Odometer, Liters, Price_Per_L, ...).
    #[arg(long, global = true, default_value = "fuel_log.csv")]
    log: PathBuf,
    /// Optional CSV price list with Fuel_Type and Price columns.
    /// Used to prefill prices of new entries; built-in prices apply when it is absent.
    #[arg(long, global = true)]
    prices: Option<PathBuf>,
    /// Log debug output.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(flatten)]
    fallback_prices: FallbackPriceArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print fuel economy and cost statistics for the log.
    Stats(StatsArgs),
    /// Record a new fill-up and print the updated statistics.
    Add(AddArgs),
}

#[derive(Args, Debug)]
struct StatsArgs {
    #[command(flatten)]
    view: ViewArgs,
}

#[derive(Args, Debug)]
struct ViewArgs {
    /// Length of the trailing cost window, in days.
    #[arg(long, default_value_t = 30)]
    window_days: u32,
    /// Reference date for the cost window. Defaults to today.
    #[arg(long, value_parser = parse_date_arg)]
    as_of: Option<Date>,
    /// Number of most recent entries to list.
    #[arg(long, default_value_t = 10)]
    tail: usize,
}

#[derive(Args, Debug)]
struct AddArgs {
    /// Date of the fill-up. Defaults to today.
    #[arg(long)]
    date: Option<String>,
    /// Odometer reading at the fill-up.
    #[arg(long)]
    odometer: u64,
    /// Liters added.
    #[arg(long, allow_negative_numbers = true)]
    liters: BigDecimal,
    /// Price per liter. Looked up from the price list or built-in prices when omitted.
    #[arg(long, allow_negative_numbers = true)]
    price: Option<BigDecimal>,
    #[arg(long, value_enum)]
    fuel_type: Option<FuelType>,
    /// Whether the tank was filled up completely.
    #[arg(long)]
    full_tank: Option<bool>,
    /// Tank capacity in liters; larger fill-ups are accepted with a warning.
    #[arg(long)]
    tank_capacity: Option<BigDecimal>,
    #[command(flatten)]
    view: ViewArgs,
}

#[derive(Args, Debug)]
struct FallbackPriceArgs {
    #[arg(long, global = true, long_help = fallback_price_help("Petrol 92"))]
    petrol_92_price: Option<BigDecimal>,
    #[arg(long, global = true, long_help = fallback_price_help("Petrol 95"))]
    petrol_95_price: Option<BigDecimal>,
    #[arg(long, global = true, long_help = fallback_price_help("Diesel"))]
    diesel_price: Option<BigDecimal>,
    #[arg(long, global = true, long_help = fallback_price_help("Super Diesel"))]
    super_diesel_price: Option<BigDecimal>,
}

fn fallback_price_help(fuel: &str) -> String {
    format!(
        "Built-in {} price per liter. \
         Only used when an entry has no price and the price list has none for this fuel. \
         The program ships with recent pump prices; override them here when they change.",
        fuel
    )
}

impl FallbackPrices {
    fn from_args(args: &FallbackPriceArgs) -> Self {
        let defaults = Self::default();
        Self {
            petrol_92: args.petrol_92_price.clone().unwrap_or(defaults.petrol_92),
            petrol_95: args.petrol_95_price.clone().unwrap_or(defaults.petrol_95),
            diesel: args.diesel_price.clone().unwrap_or(defaults.diesel),
            super_diesel: args
                .super_diesel_price
                .clone()
                .unwrap_or(defaults.super_diesel),
        }
    }
}

fn parse_date_arg(text: &str) -> std::result::Result<Date, String> {
    normalizer::parse_date(text).ok_or_else(|| format!("not a valid date: {text:?}"))
}

fn main() -> Result<()> {
    let args = Fuelstats::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .ok();

    let store = CsvStore::new(&args.log);
    let fallback = FallbackPrices::from_args(&args.fallback_prices);
    let catalog = load_catalog(args.prices.as_ref());
    let today = Zoned::now().date();

    match &args.command {
        Command::Stats(stats) => {
            let log = load_log(&store);
            print_dashboard(&log, &stats.view, today, &catalog, &fallback);
            Ok(())
        }
        Command::Add(add) => handle_add(add, &store, today, &catalog, &fallback),
    }
}

fn load_log(store: &CsvStore) -> FuelLog {
    store.load_log().unwrap_or_else(|err| {
        warn!(path = %store.path().display(), "could not load fuel log, starting empty: {err}");
        FuelLog::default()
    })
}

/// The log an append builds on. Only a log that does not exist yet may start
/// empty; any other load failure aborts, since the save replaces the file.
fn load_log_for_append(store: &CsvStore) -> Result<FuelLog> {
    match store.load_log() {
        Ok(log) => Ok(log),
        Err(LoadError::NotFound(path)) => {
            info!(path = %path.display(), "no fuel log yet, starting a new one");
            Ok(FuelLog::default())
        }
        Err(err) => Err(err).with_context(|| {
            format!(
                "could not read {}; refusing to overwrite it, the fill-up was not recorded",
                store.path().display()
            )
        }),
    }
}

fn load_catalog(path: Option<&PathBuf>) -> PriceCatalog {
    let Some(path) = path else {
        return PriceCatalog::default();
    };
    match load_price_catalog(path) {
        Ok(catalog) => {
            info!(path = %path.display(), prices = catalog.len(), "loaded price list");
            catalog
        }
        Err(err) => {
            warn!(path = %path.display(), "could not load price list, using built-in prices: {err}");
            PriceCatalog::default()
        }
    }
}

fn handle_add(
    args: &AddArgs,
    store: &CsvStore,
    today: Date,
    catalog: &PriceCatalog,
    fallback: &FallbackPrices,
) -> Result<()> {
    let log = load_log_for_append(store)?;
    let price = resolve_price(args.fuel_type, args.price.as_ref(), catalog, fallback);
    let submission = EntrySubmission {
        date: args.date.clone().unwrap_or_else(|| today.to_string()),
        odometer: args.odometer,
        liters: args.liters.clone(),
        price_per_liter: Some(price),
        fuel_type: args.fuel_type,
        full_tank: args.full_tank,
    };

    let accepted = validate(&submission, &log, args.tank_capacity.as_ref())
        .context("fill-up rejected, log left unchanged")?;
    for warning in &accepted.warnings {
        match warning {
            ValidationWarning::ExceedsTankCapacity { liters, capacity } => {
                warn!("{liters} L is more than the {capacity} L tank capacity; saving anyway")
            }
        }
    }

    store
        .write_log(&log.appended(accepted.entry))
        .context("could not save the fuel log, the fill-up was not recorded")?;
    info!(odometer = args.odometer, "fill-up recorded");

    // Whatever the store holds now is the truth, not our in-memory copy.
    let log = load_log(store);
    print_dashboard(&log, &args.view, today, catalog, fallback);
    Ok(())
}

fn print_dashboard(
    log: &FuelLog,
    view: &ViewArgs,
    today: Date,
    catalog: &PriceCatalog,
    fallback: &FallbackPrices,
) {
    let as_of = view.as_of.unwrap_or(today);
    let metrics = compute_metrics(log, view.window_days, as_of, catalog, fallback);
    print_metrics(&metrics, view.window_days, as_of);
    print_recent(log, view.tail);
}

fn print_metrics(metrics: &Metrics, window_days: u32, as_of: Date) {
    println!("Entries:               {}", metrics.entry_count);
    println!("Total distance:        {} km", metrics.total_distance);
    println!("Total fuel:            {:.2} L", metrics.total_liters);
    println!("Total cost:            {:.2}", metrics.total_cost);
    println!(
        "Cost, last {} days:    {:.2} (as of {})",
        window_days, metrics.windowed_cost, as_of
    );
    println!(
        "Last trip:             {}",
        or_na(metrics.last_trip_distance.map(|d| format!("{d} km")))
    );
    println!(
        "Last fill efficiency:  {}",
        or_na(metrics.last_fill_efficiency.as_ref().map(|e| format!("{e:.2} km/L")))
    );
    println!(
        "Average efficiency:    {}",
        or_na(metrics.average_efficiency.as_ref().map(|e| format!("{e:.2} km/L")))
    );
    println!(
        "Average consumption:   {}",
        or_na(metrics.liters_per_100.as_ref().map(|l| format!("{l:.2} L/100km")))
    );
    println!(
        "Current price:         {}",
        or_na(metrics.current_price.as_ref().map(|p| format!("{p:.2}/L")))
    );
    println!(
        "Cost per km:           {}",
        or_na(metrics.cost_per_distance.as_ref().map(|c| format!("{c:.2}")))
    );
}

fn print_recent(log: &FuelLog, tail: usize) {
    if log.is_empty() || tail == 0 {
        return;
    }
    println!();
    println!(
        "{:<10}  {:>9}  {:>8}  {:>8}  {:<12}  {}",
        "Date", "Odometer", "Liters", "Price/L", "Fuel", "Full"
    );
    let skip = log.len().saturating_sub(tail);
    for entry in &log.entries()[skip..] {
        print_entry(entry);
    }
}

fn print_entry(entry: &FuelEntry) {
    println!(
        "{:<10}  {:>9}  {:>8}  {:>8}  {:<12}  {}",
        entry.date.to_string(),
        entry.odometer,
        format!("{:.2}", entry.liters),
        or_na(entry.price_per_liter.as_ref().map(|p| format!("{p:.2}"))),
        or_na(entry.fuel_type.map(FuelType::label)),
        or_na(entry.full_tank.map(|full| if full { "yes" } else { "no" })),
    );
}

fn or_na(value: Option<impl Display>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn add_args(odometer: u64) -> AddArgs {
        AddArgs {
            date: Some("2024-03-01".to_string()),
            odometer,
            liters: BigDecimal::from(20),
            price: None,
            fuel_type: None,
            full_tank: None,
            tank_capacity: None,
            view: ViewArgs {
                window_days: 30,
                as_of: None,
                tail: 0,
            },
        }
    }

    fn add(store: &CsvStore, odometer: u64) -> Result<()> {
        handle_add(
            &add_args(odometer),
            store,
            jiff::civil::date(2024, 3, 1),
            &PriceCatalog::default(),
            &FallbackPrices::default(),
        )
    }

    #[test]
    fn add_starts_a_missing_log() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path().join("log.csv"));
        add(&store, 1000).unwrap();
        assert_eq!(store.load_log().unwrap().max_odometer(), Some(1000));
    }

    #[test]
    fn add_appends_to_existing_log() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path().join("log.csv"));
        add(&store, 1000).unwrap();
        add(&store, 1400).unwrap();
        assert!(add(&store, 900).is_err());
        let odometers: Vec<u64> = store
            .load_log()
            .unwrap()
            .entries()
            .iter()
            .map(|e| e.odometer)
            .collect();
        assert_eq!(odometers, vec![1000, 1400]);
    }

    #[test]
    fn add_leaves_unreadable_log_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        let contents = "Date,Kilometers,Fuel\n2024-01-02,1000,35\n2024-02-10,1400,32\n";
        fs::write(&path, contents).unwrap();
        let store = CsvStore::new(&path);

        assert!(add(&store, 50).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), contents);
    }
}
