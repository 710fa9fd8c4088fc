//! Technologies are the units the model builds: power plants, fuel imports and connections.
use crate::id::{CommodityID, TechID};
use crate::input::connection::Connection;
use crate::input::fuel::Fuel;
use crate::input::power_plant::PowerPlantTables;
use crate::input::{ExistingCapacityRow, get_row};
use crate::model::DUMMY_COMMODITY;
use crate::schedule::BuildPolicy;
use crate::value::OptionalValue;
use anyhow::Result;
use indexmap::IndexMap;
use strum::{Display, IntoStaticStr};

/// Heat rate in BTU/kWh of a plant which is 100% efficient
pub const HEAT_RATE_AT_FULL_EFFICIENCY: f64 = 3412.0;

/// Prefix for the names of fuel import technologies
const FUEL_IMPORT_PREFIX: &str = "IMP";

/// MW per GW
const MW_PER_GW: f64 = 1000.0;

/// The part of the energy system a technology belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Sector {
    /// Power plants
    Electric,
    /// Fuel imports
    Supply,
    /// Connections
    Transport,
}

/// A block of capacity which already exists at the start of the model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExistingUnit {
    /// Year of installation
    pub year: u32,
    /// Capacity in GW
    pub capacity: f64,
}

/// A technology, ready to be turned into model rows.
///
/// Built fresh from the input tables for every model. Numeric fields are in model units (GW and
/// fractions) rather than input units (MW and percentages).
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Technology {
    /// Name of the technology in the model
    pub name: TechID,
    /// Input commodity
    pub input: CommodityID,
    /// Output commodity
    pub output: CommodityID,
    /// Part of the energy system
    pub sector: Sector,
    /// Whether output must be constant within each season
    pub baseload: bool,
    /// Whether capacity counts towards the reserve margin
    pub reserve: bool,
    /// Whether the technology stores its output
    pub storage: bool,
    /// Whether new capacity may be built
    pub new_builds: bool,
    /// Whether output counts towards the renewable portfolio standard
    pub renewable: bool,
    /// Whether a capacity-to-activity conversion is needed
    pub capacity_to_activity: bool,
    /// Fraction of capacity counting towards the reserve margin
    pub capacity_credit: Option<f64>,
    /// Hours of storage
    pub storage_duration: Option<f64>,
    /// Efficiency as a fraction
    pub efficiency: Option<f64>,
    /// Lifetime in years
    pub lifetime: Option<f64>,
    /// Emissions in kt per PJ of output
    pub emission_activity: Option<f64>,
    /// Capacity factor as a fraction
    pub capacity_factor: Option<f64>,
    /// Investment cost
    pub cost_invest: Option<f64>,
    /// Fixed operating cost
    pub cost_fixed: Option<f64>,
    /// Variable operating cost
    pub cost_variable: Option<f64>,
    /// Yearly change in investment cost, in percent
    pub cost_invest_incr: Option<f64>,
    /// Yearly change in fixed cost, in percent
    pub cost_fixed_incr: Option<f64>,
    /// Yearly change in variable cost, in percent
    pub cost_variable_incr: Option<f64>,
    /// Technology-specific discount rate
    pub discount_rate: Option<f64>,
    /// Source of the discount rate
    pub ref_discount_rate: Option<String>,
    /// Maximum capacity in GW
    pub max_capacity: Option<f64>,
    /// Maximum activity
    pub max_activity: Option<f64>,
    /// Ramp rate as a fraction of capacity per hour
    pub ramp_rate: Option<f64>,
    /// Year from which activity must be zero
    pub retirement: Option<f64>,
    /// First year in which new capacity may be built
    pub first_build: Option<f64>,
    /// Last year in which new capacity may be built
    pub last_build: Option<f64>,
    /// Capacity which already exists
    pub existing: Vec<ExistingUnit>,
}

/// Collect the existing capacity belonging to the named entity, converting MW to GW
fn existing_units(existing: &[ExistingCapacityRow], name: &str) -> Vec<ExistingUnit> {
    existing
        .iter()
        .filter(|row| row.name == name)
        .map(|row| ExistingUnit {
            year: row.year_installed,
            capacity: row.capacity / MW_PER_GW,
        })
        .collect()
}

/// Efficiency as a fraction, preferring the efficiency percentage over the heat rate.
///
/// A heat rate which is not positive is treated as missing.
fn plant_efficiency(efficiency: Option<f64>, heat_rate: Option<f64>) -> Option<f64> {
    efficiency
        .present()
        .map(|eff| eff / 100.0)
        .or_else(|| {
            heat_rate
                .present()
                .filter(|&hr| hr > 0.0)
                .map(|hr| HEAT_RATE_AT_FULL_EFFICIENCY / hr)
        })
}

impl Technology {
    /// Create a technology for the named power plant
    pub fn power_plant(name: &TechID, tables: &PowerPlantTables) -> Result<Self> {
        let plant = get_row(&tables.plants, name.as_str(), "PowerPlants")?;
        let performance = get_row(&tables.performance, name.as_str(), "PowerPlantsPerformance")?;
        let costs = get_row(&tables.costs, name.as_str(), "PowerPlantsCosts")?;
        let constraints = get_row(&tables.constraints, name.as_str(), "PowerPlantsConstraints")?;

        Ok(Self {
            name: name.clone(),
            input: plant.fuel.as_str().into(),
            output: plant.output.as_str().into(),
            sector: Sector::Electric,
            baseload: plant.baseload,
            reserve: plant.reserve,
            storage: plant.storage,
            new_builds: plant.new_builds,
            renewable: plant.renewable,
            capacity_to_activity: true,
            capacity_credit: plant.capacity_credit,
            storage_duration: plant.storage_duration,
            efficiency: plant_efficiency(performance.efficiency, performance.heat_rate),
            lifetime: performance.expected_lifetime,
            emission_activity: None,
            capacity_factor: performance.capacity_factor.map(|cf| cf / 100.0),
            cost_invest: costs.cost_invest,
            cost_fixed: costs.cost_fixed,
            cost_variable: costs.cost_variable,
            cost_invest_incr: costs.cost_invest_incr,
            cost_fixed_incr: costs.cost_fixed_incr,
            cost_variable_incr: costs.cost_variable_incr,
            discount_rate: costs.discount_rate,
            ref_discount_rate: costs.ref_discount_rate.clone(),
            max_capacity: constraints.max_capacity.map(|cap| cap / MW_PER_GW),
            max_activity: constraints.max_activity,
            ramp_rate: constraints.ramp_rate,
            retirement: None,
            first_build: constraints.first_build,
            last_build: constraints.last_build,
            existing: existing_units(&tables.existing, name.as_str()),
        })
    }

    /// Create the import technology for the named fuel
    pub fn fuel(
        name: &TechID,
        fuels: &IndexMap<TechID, Fuel>,
        existing: &[ExistingCapacityRow],
    ) -> Result<Self> {
        let fuel = get_row(fuels, name.as_str(), "Fuels")?;

        Ok(Self {
            name: format!("{FUEL_IMPORT_PREFIX}{name}").into(),
            input: DUMMY_COMMODITY.into(),
            output: name.as_str().into(),
            sector: Sector::Supply,
            baseload: false,
            reserve: false,
            storage: false,
            new_builds: true,
            renewable: false,
            capacity_to_activity: true,
            capacity_credit: None,
            storage_duration: None,
            efficiency: Some(1.0),
            lifetime: fuel.lifetime,
            emission_activity: fuel.emission_activity,
            capacity_factor: None,
            cost_invest: fuel.cost_invest,
            cost_fixed: None,
            cost_variable: fuel.cost_variable,
            cost_invest_incr: fuel.cost_invest_incr,
            cost_fixed_incr: None,
            cost_variable_incr: fuel.cost_variable_incr,
            discount_rate: None,
            ref_discount_rate: None,
            max_capacity: None,
            max_activity: fuel.max_activity,
            ramp_rate: None,
            retirement: fuel.retirement,
            first_build: fuel.first_build,
            last_build: fuel.last_build,
            existing: existing_units(existing, name.as_str()),
        })
    }

    /// Create a technology for the named connection
    pub fn connection(
        name: &TechID,
        connections: &IndexMap<TechID, Connection>,
        existing: &[ExistingCapacityRow],
    ) -> Result<Self> {
        let connection = get_row(connections, name.as_str(), "Connections")?;

        Ok(Self {
            name: name.clone(),
            input: connection.input.as_str().into(),
            output: connection.output.as_str().into(),
            sector: Sector::Transport,
            baseload: false,
            reserve: false,
            storage: false,
            new_builds: true,
            renewable: false,
            capacity_to_activity: true,
            capacity_credit: None,
            storage_duration: None,
            efficiency: connection.loss.map(|loss| 1.0 - loss / 100.0),
            lifetime: connection.lifetime,
            emission_activity: connection.emission_activity,
            capacity_factor: None,
            cost_invest: connection.cost_invest,
            cost_fixed: None,
            cost_variable: connection.cost_variable,
            cost_invest_incr: connection.cost_invest_incr,
            cost_fixed_incr: None,
            cost_variable_incr: connection.cost_variable_incr,
            discount_rate: None,
            ref_discount_rate: None,
            max_capacity: None,
            max_activity: None,
            ramp_rate: None,
            retirement: None,
            first_build: connection.first_build,
            last_build: connection.last_build,
            existing: existing_units(existing, name.as_str()),
        })
    }

    /// The parts of this technology which determine when it can be built
    pub fn build_policy(&self) -> BuildPolicy {
        BuildPolicy {
            new_builds: self.new_builds,
            lifetime: self.lifetime.present(),
            first_build: self.first_build.present(),
            last_build: self.last_build.present(),
        }
    }

    /// Installation years of existing capacity
    pub fn existing_years(&self) -> Vec<u32> {
        self.existing.iter().map(|unit| unit.year).collect()
    }
}
