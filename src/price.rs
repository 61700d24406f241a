use crate::fuel_entry::FuelType;
use bigdecimal::BigDecimal;
use std::collections::HashMap;

/// Built-in per-litre prices, used when neither the entry nor the catalog has one.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackPrices {
    pub petrol_92: BigDecimal,
    pub petrol_95: BigDecimal,
    pub diesel: BigDecimal,
    pub super_diesel: BigDecimal,
}

impl Default for FallbackPrices {
    fn default() -> Self {
        Self {
            petrol_92: BigDecimal::from(294),
            petrol_95: BigDecimal::from(335),
            diesel: BigDecimal::from(277),
            super_diesel: BigDecimal::from(318),
        }
    }
}

impl FallbackPrices {
    pub fn for_type(&self, fuel_type: FuelType) -> &BigDecimal {
        match fuel_type {
            FuelType::Petrol92 => &self.petrol_92,
            FuelType::Petrol95 => &self.petrol_95,
            FuelType::Diesel => &self.diesel,
            FuelType::SuperDiesel => &self.super_diesel,
        }
    }
}

/// Current prices by fuel type, read from the optional `Fuel_Type,Price` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceCatalog {
    prices: HashMap<FuelType, BigDecimal>,
}

impl PriceCatalog {
    pub fn new(prices: HashMap<FuelType, BigDecimal>) -> Self {
        Self { prices }
    }

    pub fn get(&self, fuel_type: FuelType) -> Option<&BigDecimal> {
        self.prices.get(&fuel_type)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }
}

/// Picks the price for a new entry: explicit price, then catalog, then fallback.
///
/// Only for building new entries. Prices already stored on past entries are the
/// record of what was paid and never go through here.
pub fn resolve_price(
    fuel_type: Option<FuelType>,
    explicit_price: Option<&BigDecimal>,
    catalog: &PriceCatalog,
    fallback: &FallbackPrices,
) -> BigDecimal {
    let fuel_type = fuel_type.unwrap_or_default();
    explicit_price
        .or_else(|| catalog.get(fuel_type))
        .unwrap_or_else(|| fallback.for_type(fuel_type))
        .clone()
}
