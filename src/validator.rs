use crate::fuel_entry::{FuelEntry, FuelLog, FuelType};
use crate::normalizer::{parse_date, within_range};
use bigdecimal::{BigDecimal, Zero};
use thiserror::Error;

/// A fill-up as submitted, before it is allowed into the log.
#[derive(Debug, Clone)]
pub struct EntrySubmission {
    pub date: String,
    pub odometer: u64,
    pub liters: BigDecimal,
    pub price_per_liter: Option<BigDecimal>,
    pub fuel_type: Option<FuelType>,
    pub full_tank: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("liters must be greater than zero, got {0}")]
    NonPositiveLiters(BigDecimal),
    #[error("odometer {odometer} is not past the last recorded reading of {max}")]
    OdometerRegression { odometer: u64, max: u64 },
    #[error("not a valid calendar date: {0:?}")]
    InvalidDate(String),
    #[error("price per liter cannot be negative, got {0}")]
    NegativePrice(BigDecimal),
    #[error("{0} is too large or too precise to record")]
    OutOfRange(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationWarning {
    /// More fuel than the tank holds; kept, since tank sizes vary.
    ExceedsTankCapacity {
        liters: BigDecimal,
        capacity: BigDecimal,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Accepted {
    pub entry: FuelEntry,
    pub warnings: Vec<ValidationWarning>,
}

/// Checks a submission against the current log. Rules run in a fixed order and
/// the first failure is returned. Nothing is mutated.
pub fn validate(
    candidate: &EntrySubmission,
    current_log: &FuelLog,
    tank_capacity: Option<&BigDecimal>,
) -> Result<Accepted, ValidationError> {
    if !within_range(&candidate.liters) {
        return Err(ValidationError::OutOfRange("liters"));
    }
    if candidate
        .price_per_liter
        .as_ref()
        .is_some_and(|price| !within_range(price))
    {
        return Err(ValidationError::OutOfRange("price per liter"));
    }
    if candidate.liters <= BigDecimal::zero() {
        return Err(ValidationError::NonPositiveLiters(candidate.liters.clone()));
    }
    if let Some(max) = current_log.max_odometer() {
        if candidate.odometer <= max {
            return Err(ValidationError::OdometerRegression {
                odometer: candidate.odometer,
                max,
            });
        }
    }
    let date = parse_date(&candidate.date)
        .ok_or_else(|| ValidationError::InvalidDate(candidate.date.clone()))?;
    if let Some(price) = &candidate.price_per_liter {
        if *price < BigDecimal::zero() {
            return Err(ValidationError::NegativePrice(price.clone()));
        }
    }

    let warnings = tank_capacity
        .filter(|capacity| candidate.liters > **capacity)
        .map(|capacity| ValidationWarning::ExceedsTankCapacity {
            liters: candidate.liters.clone(),
            capacity: capacity.clone(),
        })
        .into_iter()
        .collect();

    Ok(Accepted {
        entry: FuelEntry {
            date,
            odometer: candidate.odometer,
            liters: candidate.liters.clone(),
            price_per_liter: candidate.price_per_liter.clone(),
            fuel_type: candidate.fuel_type,
            full_tank: candidate.full_tank,
        },
        warnings,
    })
}
