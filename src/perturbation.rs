//! Perturbations change single input values before a model is assembled.
//!
//! A sensitivity perturbation scales a value by a percentage, while a Monte Carlo perturbation
//! replaces it with an exact value. Absent values are never perturbed.
use crate::id::TechID;
use crate::input::{
    InputTables, NumericColumns, deserialise_value, get_row_mut, input_err_msg, read_csv_optional,
};
use crate::scenario::ScenarioContext;
use crate::technology::HEAT_RATE_AT_FULL_EFFICIENCY;
use crate::value::OptionalValue;
use anyhow::{Context, Result, bail};
use derive_more::Display;
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The family of inputs a perturbation applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Deserialize, Serialize)]
pub enum EntityFamily {
    /// The unperturbed model
    Baseline,
    /// Global parameters
    Globals,
    /// Columns of the power plant tables
    PowerPlants,
    /// Columns of the fuel table
    Fuels,
    /// Columns of the connection table
    Connections,
}

/// How a perturbation changes a value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Magnitude {
    /// Scale the value by this percentage, e.g. `10.0` gives 110% of the original value
    Multiplier(f64),
    /// Replace the value
    Value(f64),
}

impl Magnitude {
    /// The perturbed value
    pub fn apply(self, current: f64) -> f64 {
        match self {
            Self::Multiplier(percent) => current * (1.0 + percent / 100.0),
            Self::Value(value) => value,
        }
    }
}

/// A change to a single input value
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// Which family of inputs is changed
    pub family: EntityFamily,
    /// Name of the column (or global parameter) to change
    pub variable: String,
    /// Name of the entity to change, or `global`
    pub tech: String,
    /// How the value is changed
    pub magnitude: Magnitude,
}

impl Directive {
    /// The directive which leaves the model unchanged
    pub fn baseline() -> Self {
        Self {
            family: EntityFamily::Baseline,
            variable: "Baseline".into(),
            tech: "Baseline".into(),
            magnitude: Magnitude::Multiplier(0.0),
        }
    }
}

/// A directive as it appears in a CSV file
#[derive(Debug, Deserialize)]
struct DirectiveRow {
    #[serde(rename = "type")]
    family: EntityFamily,
    variable: String,
    tech: String,
    #[serde(default, deserialize_with = "deserialise_value")]
    multiplier: Option<f64>,
    #[serde(default, deserialize_with = "deserialise_value")]
    value: Option<f64>,
}

impl TryFrom<DirectiveRow> for Directive {
    type Error = anyhow::Error;

    fn try_from(row: DirectiveRow) -> Result<Self> {
        let magnitude = match (row.multiplier, row.value) {
            (Some(multiplier), None) => Magnitude::Multiplier(multiplier),
            (None, Some(value)) => Magnitude::Value(value),
            (None, None) if row.family == EntityFamily::Baseline => Magnitude::Multiplier(0.0),
            (Some(_), Some(_)) => bail!(
                "Directive for {} of {} gives both a multiplier and a value",
                row.variable,
                row.tech
            ),
            (None, None) => bail!(
                "Directive for {} of {} gives neither a multiplier nor a value",
                row.variable,
                row.tech
            ),
        };

        Ok(Self {
            family: row.family,
            variable: row.variable,
            tech: row.tech,
            magnitude,
        })
    }
}

/// Read perturbation directives from a CSV file.
///
/// The file has columns `type`, `variable` and `tech`, plus either `multiplier` (in percent) or
/// `value`.
pub fn read_directives(file_path: &Path) -> Result<Vec<Directive>> {
    let rows: Vec<DirectiveRow> = read_csv_optional(file_path)?;
    rows.into_iter()
        .map(Directive::try_from)
        .collect::<Result<_>>()
        .with_context(|| input_err_msg(file_path))
}

/// The power plant table holding a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlantTable {
    Identity,
    Performance,
    Costs,
    Constraints,
}

impl PlantTable {
    fn for_variable(variable: &str) -> Option<Self> {
        match variable {
            "Efficiency" | "ExpectedLifetime" | "CapacityFactor" | "HeatRate" => {
                Some(Self::Performance)
            }
            "CostInvest" | "CostInvestIncr" | "CostFixed" | "CostFixedIncr" | "CostVariable"
            | "CostVariableIncr" | "DiscountRate" => Some(Self::Costs),
            "RampRate" | "MaxCapacity" | "MaxActivity" | "FirstBuild" | "LastBuild" => {
                Some(Self::Constraints)
            }
            "CapacityCredit" | "StorageDuration" => Some(Self::Identity),
            _ => None,
        }
    }
}

/// Keep a perturbed value within its valid range.
///
/// Efficiency and capacity factor are percentages, so cannot exceed 100, losses cannot be
/// negative and lifetimes are whole years.
pub fn clamp_value(variable: &str, value: f64, tech: &str) -> f64 {
    let (clamped, out_of_range) = match variable {
        "Efficiency" | "CapacityFactor" if value > 100.0 => (100.0, true),
        "Loss" if value < 0.0 => (0.0, true),
        // Truncating lifetimes is expected, so don't warn about it
        "ExpectedLifetime" => (value.trunc(), false),
        _ => (value, false),
    };

    if out_of_range {
        warn!("{variable} of {tech} out of range ({value}), set to {clamped}");
    }

    clamped
}

/// Perturb a single cell, returning the new value.
///
/// Absent values are left alone and give [`None`].
fn perturb_cell(
    cell: &mut Option<f64>,
    variable: &str,
    tech: &str,
    magnitude: Magnitude,
) -> Option<f64> {
    let current = (*cell).present()?;
    let new = clamp_value(variable, magnitude.apply(current), tech);
    debug!("Changing {variable} of {tech} from {current} to {new}");
    *cell = Some(new);

    Some(new)
}

/// Perturb the cell at (`tech`, `variable`) in an indexed table
fn perturb_table<T: NumericColumns>(
    map: &mut IndexMap<TechID, T>,
    table: &str,
    directive: &Directive,
) -> Result<Option<f64>> {
    let row = get_row_mut(map, &directive.tech, table)?;
    let cell = row
        .value_mut(&directive.variable)
        .with_context(|| format!("Table {table} has no column {}", directive.variable))?;

    Ok(perturb_cell(
        cell,
        &directive.variable,
        &directive.tech,
        directive.magnitude,
    ))
}

/// Perturb one of the global parameters
fn perturb_global(
    inputs: &mut InputTables,
    scenario: &mut ScenarioContext,
    directive: &Directive,
) -> Result<()> {
    let system = &mut inputs.system;
    let mut empty = None;
    let cell = match directive.variable.as_str() {
        "DiscountRate" => system
            .discount_rate_global
            .first_mut()
            .map_or(&mut empty, |row| &mut row.discount_rate),
        "ReserveMargin" => system
            .reserve_margin
            .first_mut()
            .map_or(&mut empty, |row| &mut row.reserve_margin),
        "MaxGrowthRate" => &mut scenario.max_growth_rate,
        "MinGrowthSeed" => &mut scenario.min_growth_seed,
        variable => bail!("Unknown global variable {variable}"),
    };
    perturb_cell(cell, &directive.variable, "global", directive.magnitude);

    Ok(())
}

/// Efficiency (percent) corresponding to a heat rate (BTU/kWh)
fn efficiency_from_heat_rate(heat_rate: f64) -> f64 {
    (HEAT_RATE_AT_FULL_EFFICIENCY * 100.0 / heat_rate).min(100.0)
}

/// Heat rate (BTU/kWh) corresponding to an efficiency (percent)
fn heat_rate_from_efficiency(efficiency: f64) -> f64 {
    (HEAT_RATE_AT_FULL_EFFICIENCY * 100.0 / efficiency).max(HEAT_RATE_AT_FULL_EFFICIENCY)
}

/// Perturb a power plant value, keeping efficiency and heat rate consistent
fn perturb_power_plant(inputs: &mut InputTables, directive: &Directive) -> Result<()> {
    let tables = &mut inputs.power_plants;
    let Some(table) = PlantTable::for_variable(&directive.variable) else {
        bail!("Unknown power plant variable {}", directive.variable);
    };

    let new = match table {
        PlantTable::Identity => perturb_table(&mut tables.plants, "PowerPlants", directive)?,
        PlantTable::Performance => perturb_table(
            &mut tables.performance,
            "PowerPlantsPerformance",
            directive,
        )?,
        PlantTable::Costs => perturb_table(&mut tables.costs, "PowerPlantsCosts", directive)?,
        PlantTable::Constraints => perturb_table(
            &mut tables.constraints,
            "PowerPlantsConstraints",
            directive,
        )?,
    };
    let Some(new) = new else {
        return Ok(());
    };

    let performance = get_row_mut(
        &mut tables.performance,
        &directive.tech,
        "PowerPlantsPerformance",
    )?;
    match directive.variable.as_str() {
        "Efficiency" if performance.heat_rate.present().is_some() => {
            if new > 0.0 {
                performance.heat_rate = Some(heat_rate_from_efficiency(new));
            } else {
                warn!(
                    "Efficiency of {} is not positive, heat rate left unchanged",
                    directive.tech
                );
            }
        }
        "HeatRate" if performance.efficiency.present().is_some() => {
            if new > 0.0 {
                performance.efficiency = Some(efficiency_from_heat_rate(new));
            } else {
                warn!(
                    "Heat rate of {} is not positive, efficiency left unchanged",
                    directive.tech
                );
            }
        }
        _ => {}
    }

    Ok(())
}

/// Apply a single directive to the input tables and scenario context.
///
/// Unknown entities and variables are errors. Absent values are left unchanged.
pub fn apply_directive(
    inputs: &mut InputTables,
    scenario: &mut ScenarioContext,
    directive: &Directive,
) -> Result<()> {
    match directive.family {
        EntityFamily::Baseline => Ok(()),
        EntityFamily::Globals => perturb_global(inputs, scenario, directive),
        EntityFamily::PowerPlants => perturb_power_plant(inputs, directive),
        EntityFamily::Fuels => {
            perturb_table(&mut inputs.fuels, "Fuels", directive).map(|_| ())
        }
        EntityFamily::Connections => {
            perturb_table(&mut inputs.connections, "Connections", directive).map(|_| ())
        }
    }
}

/// Apply directives in order
pub fn apply_directives(
    inputs: &mut InputTables,
    scenario: &mut ScenarioContext,
    directives: &[Directive],
) -> Result<()> {
    for directive in directives {
        apply_directive(inputs, scenario, directive).with_context(|| {
            format!(
                "Failed to apply {} directive for {} of {}",
                directive.family, directive.variable, directive.tech
            )
        })?;
    }

    Ok(())
}
