use crate::fuel_entry::FuelLog;
use jiff::Span;
use jiff::civil::Date;

/// Entries dated on or after `as_of - window_days`. Both ends are inclusive,
/// and entries dated after `as_of` are kept.
pub fn windowed(log: &FuelLog, window_days: u32, as_of: Date) -> FuelLog {
    let cutoff = Span::new()
        .try_days(i64::from(window_days))
        .and_then(|span| as_of.checked_sub(span))
        // A window reaching past the calendar's start covers everything.
        .unwrap_or(Date::MIN);
    log.filtered(|entry| entry.date >= cutoff)
}
