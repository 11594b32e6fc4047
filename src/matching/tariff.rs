//! Per-kilometer pricing and emission savings by vehicle class.

use thiserror::Error;

use crate::models::VehicleClass;

/// Errors raised by the tariff calculator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TariffError {
    #[error("Unknown vehicle class: {0}")]
    UnknownVehicleClass(String),
}

/// Rates for a single vehicle class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tariff {
    /// Currency units per kilometer
    pub cost_per_km: f64,
    /// Kilograms of CO2 saved per kilometer shared
    pub co2_kg_per_km: f64,
}

/// Cost and emission figures for one trip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FareQuote {
    pub cost: f64,
    pub co2_kg: f64,
}

impl VehicleClass {
    pub const fn tariff(self) -> Tariff {
        match self {
            VehicleClass::Bike => Tariff { cost_per_km: 2.0, co2_kg_per_km: 0.08 },
            VehicleClass::Car => Tariff { cost_per_km: 5.0, co2_kg_per_km: 0.12 },
            VehicleClass::Sedan => Tariff { cost_per_km: 8.0, co2_kg_per_km: 0.18 },
        }
    }
}

/// Cost of a trip of `distance_km` in the named vehicle class
pub fn calculate_cost(distance_km: f64, vehicle_type: &str) -> Result<f64, TariffError> {
    let vehicle: VehicleClass = vehicle_type.parse()?;
    Ok(distance_km * vehicle.tariff().cost_per_km)
}

/// CO2 saved, in kilograms, by sharing a trip of `distance_km`
pub fn calculate_co2_emission_reduced(distance_km: f64, vehicle_type: &str) -> Result<f64, TariffError> {
    let vehicle: VehicleClass = vehicle_type.parse()?;
    Ok(distance_km * vehicle.tariff().co2_kg_per_km)
}

/// Both figures for an already-parsed vehicle class
#[inline]
pub fn quote(distance_km: f64, vehicle: VehicleClass) -> FareQuote {
    let tariff = vehicle.tariff();
    FareQuote {
        cost: distance_km * tariff.cost_per_km,
        co2_kg: distance_km * tariff.co2_kg_per_km,
    }
}
