use crate::fuel_entry::{FuelEntry, FuelLog};
use crate::price::{FallbackPrices, PriceCatalog, resolve_price};
use crate::window::windowed;
use bigdecimal::{BigDecimal, Zero};
use jiff::civil::Date;

/// Dashboard statistics for one log. `None` means the figure is undefined for
/// this log (too few entries, or a zero denominator).
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub entry_count: usize,
    pub total_distance: u64,
    pub total_liters: BigDecimal,
    pub total_cost: BigDecimal,
    pub windowed_cost: BigDecimal,
    pub last_trip_distance: Option<u64>,
    pub last_fill_efficiency: Option<BigDecimal>,
    pub average_efficiency: Option<BigDecimal>,
    pub liters_per_100: Option<BigDecimal>,
    pub current_price: Option<BigDecimal>,
    pub cost_per_distance: Option<BigDecimal>,
}

/// Derives every statistic from `log`. Pure: the caller supplies `as_of`.
pub fn compute_metrics(
    log: &FuelLog,
    window_days: u32,
    as_of: Date,
    catalog: &PriceCatalog,
    fallback: &FallbackPrices,
) -> Metrics {
    let total_distance = match (log.first(), log.last()) {
        (Some(first), Some(last)) => last.odometer - first.odometer,
        _ => 0,
    };
    let consumed: BigDecimal = log.after_baseline().iter().map(|e| &e.liters).sum();

    let last_trip_distance = match log.entries() {
        [.., previous, last] => Some(last.odometer - previous.odometer),
        _ => None,
    };
    let last_fill_efficiency = last_trip_distance
        .zip(log.last())
        .and_then(|(trip, last)| ratio(&BigDecimal::from(trip), &last.liters));

    let average_efficiency = (log.len() >= 2)
        .then(|| ratio(&BigDecimal::from(total_distance), &consumed))
        .flatten();
    let liters_per_100 = (log.len() >= 2)
        .then(|| ratio(&(&consumed * BigDecimal::from(100)), &BigDecimal::from(total_distance)))
        .flatten();

    let current_price = log
        .last()
        .map(|last| resolve_price(last.fuel_type, None, catalog, fallback));
    let cost_per_distance = current_price
        .as_ref()
        .zip(average_efficiency.as_ref())
        .and_then(|(price, efficiency)| ratio(price, efficiency));

    Metrics {
        entry_count: log.len(),
        total_distance,
        total_liters: log.entries().iter().map(|e| &e.liters).sum(),
        total_cost: priced_cost(log.entries()),
        windowed_cost: priced_cost(windowed(log, window_days, as_of).entries()),
        last_trip_distance,
        last_fill_efficiency,
        average_efficiency,
        liters_per_100,
        current_price,
        cost_per_distance,
    }
}

/// Cost over entries that carry a price. Unpriced entries are left out, not
/// counted as free.
fn priced_cost(entries: &[FuelEntry]) -> BigDecimal {
    entries.iter().filter_map(FuelEntry::cost).sum()
}

fn ratio(numerator: &BigDecimal, denominator: &BigDecimal) -> Option<BigDecimal> {
    (*denominator > BigDecimal::zero()).then(|| numerator / denominator)
}
