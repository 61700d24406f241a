use crate::normalizer::RawRow;
use bigdecimal::BigDecimal;
use clap::ValueEnum;
use jiff::civil::Date;
use std::fmt;
use std::str::FromStr;

#[derive(ValueEnum, Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
pub enum FuelType {
    #[default]
    Petrol92,
    Petrol95,
    Diesel,
    SuperDiesel,
}

impl FuelType {
    pub fn label(self) -> &'static str {
        match self {
            FuelType::Petrol92 => "Petrol 92",
            FuelType::Petrol95 => "Petrol 95",
            FuelType::Diesel => "Diesel",
            FuelType::SuperDiesel => "Super Diesel",
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown fuel type: {0:?}")]
pub struct UnknownFuelType(pub String);

impl FromStr for FuelType {
    type Err = UnknownFuelType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Sheets in the wild say "Petrol 92", "petrol_92", "Octane 92" or just "92".
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "92" | "petrol92" | "octane92" => Ok(FuelType::Petrol92),
            "95" | "petrol95" | "octane95" => Ok(FuelType::Petrol95),
            "diesel" | "autodiesel" => Ok(FuelType::Diesel),
            "superdiesel" => Ok(FuelType::SuperDiesel),
            _ => Err(UnknownFuelType(s.to_string())),
        }
    }
}

/// One fill-up.
#[derive(Debug, Clone, PartialEq)]
pub struct FuelEntry {
    pub date: Date,
    pub odometer: u64,
    pub liters: BigDecimal,
    pub price_per_liter: Option<BigDecimal>,
    pub fuel_type: Option<FuelType>,
    /// Informational only; no metric reads it.
    pub full_tank: Option<bool>,
}

impl FuelEntry {
    /// `liters × price`, or `None` when the entry carries no price.
    pub fn cost(&self) -> Option<BigDecimal> {
        self.price_per_liter
            .as_ref()
            .map(|price| &self.liters * price)
    }
}

/// Fill-ups in ascending odometer order, one entry per odometer reading.
///
/// The only way to build a log is through [`FuelLog::from_entries`] (which sorts
/// and drops repeated readings) or [`FuelLog::appended`], so every `FuelLog`
/// value is canonical. The first entry is the baseline: the distance that
/// produced its fuel was never observed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FuelLog {
    entries: Vec<FuelEntry>,
}

impl FuelLog {
    pub fn from_entries(mut entries: Vec<FuelEntry>) -> Self {
        // Stable sort, so the first row for a repeated reading wins.
        entries.sort_by_key(|entry| entry.odometer);
        entries.dedup_by_key(|entry| entry.odometer);
        Self { entries }
    }

    pub fn entries(&self) -> &[FuelEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first(&self) -> Option<&FuelEntry> {
        self.entries.first()
    }

    pub fn last(&self) -> Option<&FuelEntry> {
        self.entries.last()
    }

    pub fn max_odometer(&self) -> Option<u64> {
        self.last().map(|entry| entry.odometer)
    }

    /// Entries after the baseline; their fuel is what the observed distance burned.
    pub fn after_baseline(&self) -> &[FuelEntry] {
        self.entries.get(1..).unwrap_or_default()
    }

    /// A new log with `entry` added. `self` is left as it was.
    pub fn appended(&self, entry: FuelEntry) -> FuelLog {
        let mut entries = self.entries.clone();
        entries.push(entry);
        FuelLog::from_entries(entries)
    }

    /// Subsequence of entries matching `keep`, order preserved.
    pub fn filtered(&self, keep: impl Fn(&FuelEntry) -> bool) -> FuelLog {
        FuelLog {
            entries: self.entries.iter().filter(|e| keep(e)).cloned().collect(),
        }
    }

    /// The log as storage rows, in the canonical column format.
    pub fn to_rows(&self) -> Vec<RawRow> {
        self.entries
            .iter()
            .map(|entry| RawRow {
                date: Some(entry.date.to_string()),
                odometer: Some(entry.odometer.to_string()),
                liters: Some(entry.liters.to_string()),
                price_per_liter: entry.price_per_liter.as_ref().map(|p| p.to_string()),
                fuel_type: entry.fuel_type.map(|t| t.label().to_string()),
                full_tank: entry
                    .full_tank
                    .map(|full| if full { "TRUE" } else { "FALSE" }.to_string()),
            })
            .collect()
    }
}
