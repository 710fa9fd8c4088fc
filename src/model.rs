//! Assembly of a model from its input tables.
//!
//! The model is built in stages: system-wide data first, then power plants, fuels and
//! connections. Each technology is turned into rows by the shared emitter in [`emitter`].
use crate::id::{CommodityID, TechID};
use crate::input::InputTables;
use crate::relation::{Cell, Relation, RelationSet, Row, row};
use crate::scenario::ScenarioContext;
use crate::technology::Technology;
use anyhow::{Context, Result, ensure};
use indexmap::IndexSet;
use log::warn;

pub mod emitter;
pub mod system;

/// The dummy commodity consumed by fuel import technologies
pub const DUMMY_COMMODITY: &str = "ethos";

/// The commodity in which electricity demand is expressed
pub const DEMAND_COMMODITY: &str = "ELC_DMD";

/// The emission commodity tracked by the model
pub const EMISSION_COMMODITY: &str = "CO2";

/// Conversion from one GW of capacity to PJ of activity over a year
pub const CAPACITY_TO_ACTIVITY: f64 = 31.54;

/// Placeholder written into note columns
const NOTE: &str = " ";

/// Commodity flag for physical commodities
const PHYSICAL_FLAG: &str = "p";

/// Time period flag for periods of the model horizon
const FUTURE_PERIOD_FLAG: &str = "f";

/// Time period flag for vintages of existing capacity
const EXISTING_PERIOD_FLAG: &str = "e";

/// The periods of the model horizon
#[derive(Debug, Clone, PartialEq)]
pub struct Periods {
    /// Every demand year, in ascending order
    pub future: Vec<u32>,
    /// Every demand year except the last, which only marks the end of the horizon
    pub active_future: Vec<u32>,
}

impl Periods {
    /// Work out the periods from the demand years
    fn from_demand_years(years: Vec<u32>) -> Result<Self> {
        ensure!(
            years.len() >= 2,
            "At least two demand years are required (the last year ends the model horizon)"
        );
        let active_future = years[..years.len() - 1].to_vec();

        Ok(Self {
            future: years,
            active_future,
        })
    }

    /// The first period open for investment
    pub fn start_year(&self) -> u32 {
        self.active_future[0]
    }
}

/// Assembles the relations of a model for one scenario.
///
/// The builder owns the relations while they are being assembled. Input tables and the scenario
/// context are only read.
pub struct ModelBuilder<'a> {
    inputs: &'a InputTables,
    scenario: &'a ScenarioContext,
    periods: Periods,
    all_time_periods: IndexSet<u32>,
    commodities: IndexSet<CommodityID>,
    relations: RelationSet,
}

impl<'a> ModelBuilder<'a> {
    /// Create a builder for the given inputs and scenario
    pub fn new(inputs: &'a InputTables, scenario: &'a ScenarioContext) -> Result<Self> {
        let years = inputs.system.demand.iter().map(|row| row.year).collect();
        let periods = Periods::from_demand_years(years)?;
        let all_time_periods = periods.future.iter().copied().collect();

        Ok(Self {
            inputs,
            scenario,
            periods,
            all_time_periods,
            commodities: IndexSet::new(),
            relations: RelationSet::new(),
        })
    }

    /// The periods of the model horizon
    pub fn periods(&self) -> &Periods {
        &self.periods
    }

    /// Every period in the model, including vintages of existing capacity found so far
    pub fn all_time_periods(&self) -> &IndexSet<u32> {
        &self.all_time_periods
    }

    /// Commodities registered so far, in order of registration
    pub fn commodities(&self) -> &IndexSet<CommodityID> {
        &self.commodities
    }

    /// Rows assembled so far
    pub fn relations(&self) -> &RelationSet {
        &self.relations
    }

    /// Append a row to one of the relations
    fn push(&mut self, relation: Relation, row: Row) -> Result<()> {
        self.relations.push(relation, row)
    }

    /// Register a commodity, unless it is already registered.
    ///
    /// Returns whether the commodity was newly added.
    pub fn register_commodity(&mut self, id: &str, flag: &str, description: &str) -> Result<bool> {
        if self.commodities.contains(id) {
            return Ok(false);
        }

        self.commodities.insert(id.into());
        self.push(Relation::Commodities, row![id, flag, description])?;

        Ok(true)
    }

    /// Register vintages of existing capacity as model periods
    fn add_legacy_periods(&mut self, years: &[u32]) -> Result<()> {
        for &year in years {
            if self.all_time_periods.insert(year) {
                self.push(Relation::TimePeriods, row![year, EXISTING_PERIOD_FLAG])?;
            }
        }

        Ok(())
    }

    /// Add rows for every power plant in the scenario
    pub fn process_power_plants(&mut self) -> Result<()> {
        let (inputs, scenario) = (self.inputs, self.scenario);
        for name in &scenario.plants {
            let tech = Technology::power_plant(name, &inputs.power_plants)?;
            self.add_technology(&tech)
                .with_context(|| format!("Failed to add power plant {name}"))?;
        }

        Ok(())
    }

    /// Add rows for every fuel in the scenario and register the fuels as commodities
    pub fn process_fuels(&mut self) -> Result<()> {
        let (inputs, scenario) = (self.inputs, self.scenario);
        for name in &scenario.fuels {
            let tech = Technology::fuel(name, &inputs.fuels, &inputs.fuels_existing)?;
            self.add_technology(&tech)
                .with_context(|| format!("Failed to add fuel {name}"))?;
            self.register_commodity(name.as_str(), PHYSICAL_FLAG, name.as_str())?;
        }

        Ok(())
    }

    /// Add rows for every connection in the scenario and register the commodities it links
    pub fn process_connections(&mut self) -> Result<()> {
        let (inputs, scenario) = (self.inputs, self.scenario);
        for name in &scenario.connections {
            let tech =
                Technology::connection(name, &inputs.connections, &inputs.connections_existing)?;
            self.add_technology(&tech)
                .with_context(|| format!("Failed to add connection {name}"))?;
            for commodity in [&tech.input, &tech.output] {
                self.register_commodity(commodity.as_str(), PHYSICAL_FLAG, commodity.as_str())?;
            }
        }

        Ok(())
    }

    /// Finish assembly and hand over the relations.
    ///
    /// Flows referring to commodities which were never registered are reported.
    pub fn finish(self) -> RelationSet {
        let unregistered: IndexSet<&str> = self
            .relations
            .rows(Relation::Efficiency)
            .iter()
            .flat_map(|row| [&row[0], &row[3]])
            .filter_map(|cell| match cell {
                Cell::Text(id) if !self.commodities.contains(id.as_str()) => {
                    Some(id.as_str())
                }
                _ => None,
            })
            .collect();
        for id in unregistered {
            warn!("Commodity {id} is used by a technology but is not defined in the model");
        }

        self.relations
    }
}

/// Assemble every relation of the model for a scenario.
///
/// The input tables must already have had any perturbations applied.
pub fn assemble_model(inputs: &InputTables, scenario: &ScenarioContext) -> Result<RelationSet> {
    let mut builder = ModelBuilder::new(inputs, scenario)?;
    builder.process_system()?;
    builder.process_power_plants()?;
    builder.process_fuels()?;
    builder.process_connections()?;

    Ok(builder.finish())
}

/// The names of technologies with rows in the given relation, in order of first appearance
pub fn technologies_in(relations: &RelationSet, relation: Relation) -> IndexSet<TechID> {
    let column = relation
        .columns()
        .iter()
        .position(|&column| column == "tech");
    let Some(column) = column else {
        return IndexSet::new();
    };

    relations
        .rows(relation)
        .iter()
        .filter_map(|row| match &row[column] {
            Cell::Text(name) => Some(TechID::new(name)),
            _ => None,
        })
        .collect()
}
