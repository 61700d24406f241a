use crate::fuel_entry::{FuelEntry, FuelLog, FuelType};
use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use jiff::civil::{Date, DateTime};
use std::str::FromStr;
use tracing::debug;

/// A storage row before coercion. Any field may be missing or hold junk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub date: Option<String>,
    pub odometer: Option<String>,
    pub liters: Option<String>,
    pub price_per_liter: Option<String>,
    pub fuel_type: Option<String>,
    pub full_tank: Option<String>,
}

const DATE_FORMATS: [&str; 3] = ["%Y/%m/%d", "%d.%m.%Y", "%m/%d/%Y"];

/// Largest decimal exponent, either way, a stored number may carry. Anything
/// past it is junk, and rescaling it would build an enormous integer.
const MAX_EXPONENT: i64 = 32;

/// Coerces raw rows into a canonical log.
///
/// Rows without a usable date, odometer or liters value are dropped; a bad
/// price, fuel type or full-tank flag only unsets that field. Never fails: junk
/// in, empty log out.
pub fn normalize(rows: &[RawRow]) -> FuelLog {
    let entries: Vec<FuelEntry> = rows
        .iter()
        .enumerate()
        .filter_map(|(index, row)| {
            let entry = normalize_row(row);
            if entry.is_none() {
                debug!(index, ?row, "dropping row without date, odometer or liters");
            }
            entry
        })
        .collect();
    let log = FuelLog::from_entries(entries);
    debug!(rows = rows.len(), kept = log.len(), "normalized fuel log");
    log
}

fn normalize_row(row: &RawRow) -> Option<FuelEntry> {
    let date = parse_date(row.date.as_deref()?)?;
    let odometer = parse_odometer(row.odometer.as_deref()?)?;
    let liters = parse_number(row.liters.as_deref()?).filter(|l| *l > BigDecimal::zero())?;
    let price_per_liter = row
        .price_per_liter
        .as_deref()
        .and_then(parse_number)
        .filter(|p| *p >= BigDecimal::zero());
    let fuel_type = row
        .fuel_type
        .as_deref()
        .and_then(|label| label.trim().parse::<FuelType>().ok());
    let full_tank = row.full_tank.as_deref().and_then(parse_flag);
    Some(FuelEntry {
        date,
        odometer,
        liters,
        price_per_liter,
        fuel_type,
        full_tank,
    })
}

pub fn parse_date(text: &str) -> Option<Date> {
    let text = text.trim();
    if let Ok(date) = Date::from_str(text) {
        return Some(date);
    }
    if let Ok(datetime) = DateTime::from_str(text) {
        return Some(datetime.date());
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| Date::strptime(format, text).ok())
}

fn parse_number(text: &str) -> Option<BigDecimal> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    BigDecimal::from_str(&cleaned)
        .ok()
        .filter(within_range)
}

/// Whether `value` is small enough to rescale, print and divide cheaply.
pub fn within_range(value: &BigDecimal) -> bool {
    let (_, scale) = value.as_bigint_and_exponent();
    (-MAX_EXPONENT..=MAX_EXPONENT).contains(&scale)
        && value.digits() <= 2 * MAX_EXPONENT as u64
}

fn parse_odometer(text: &str) -> Option<u64> {
    let value = parse_number(text)?;
    let whole = value.with_scale(0);
    // "1400.0" is fine, "1400.5" is not a reading.
    if whole != value {
        return None;
    }
    whole.to_u64()
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}
