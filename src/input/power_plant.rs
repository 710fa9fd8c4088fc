//! Code for reading the power plant tables.
use super::{
    ExistingCapacityRow, HasName, check_existing_names, define_name_getter,
    define_numeric_columns, deserialise_flag, deserialise_text, deserialise_value, index_by_name,
    input_err_msg, read_csv, read_csv_optional,
};
use crate::id::TechID;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::Path;

const POWER_PLANTS_FILE_NAME: &str = "PowerPlants.csv";
const PERFORMANCE_FILE_NAME: &str = "PowerPlantsPerformance.csv";
const COSTS_FILE_NAME: &str = "PowerPlantsCosts.csv";
const CONSTRAINTS_FILE_NAME: &str = "PowerPlantsConstraints.csv";
const EXISTING_FILE_NAME: &str = "PowerPlantsExisting.csv";

/// The identity of a power plant: its fuel, output and classification flags
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct PowerPlant {
    /// Name of the plant
    #[serde(rename = "powerplant")]
    pub name: String,
    /// Input commodity
    pub fuel: String,
    /// Output commodity
    pub output: String,
    /// Whether output must be constant within each season
    #[serde(deserialize_with = "deserialise_flag")]
    pub baseload: bool,
    /// Whether capacity counts towards the reserve margin
    #[serde(deserialize_with = "deserialise_flag")]
    pub reserve: bool,
    /// Whether new capacity may be built
    #[serde(deserialize_with = "deserialise_flag")]
    pub new_builds: bool,
    /// Whether output counts towards the renewable portfolio standard
    #[serde(deserialize_with = "deserialise_flag")]
    pub renewable: bool,
    /// Whether the plant stores electricity
    #[serde(deserialize_with = "deserialise_flag")]
    pub storage: bool,
    /// Fraction of capacity counting towards the reserve margin
    #[serde(rename = "CapacityCredit", default, deserialize_with = "deserialise_value")]
    pub capacity_credit: Option<f64>,
    /// Hours of storage at full output
    #[serde(rename = "StorageDuration", default, deserialize_with = "deserialise_value")]
    pub storage_duration: Option<f64>,
}
define_name_getter! {PowerPlant}
define_numeric_columns! {PowerPlant, {
    "CapacityCredit" => capacity_credit,
    "StorageDuration" => storage_duration,
}}

/// Performance characteristics of a power plant
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Performance {
    /// Name of the plant
    #[serde(rename = "powerplant")]
    pub name: String,
    /// Efficiency in percent
    #[serde(default, deserialize_with = "deserialise_value")]
    pub efficiency: Option<f64>,
    /// Heat rate in BTU/kWh
    #[serde(default, deserialize_with = "deserialise_value")]
    pub heat_rate: Option<f64>,
    /// Lifetime in years
    #[serde(default, deserialize_with = "deserialise_value")]
    pub expected_lifetime: Option<f64>,
    /// Capacity factor in percent
    #[serde(default, deserialize_with = "deserialise_value")]
    pub capacity_factor: Option<f64>,
}
define_name_getter! {Performance}
define_numeric_columns! {Performance, {
    "Efficiency" => efficiency,
    "HeatRate" => heat_rate,
    "ExpectedLifetime" => expected_lifetime,
    "CapacityFactor" => capacity_factor,
}}

/// Costs of a power plant, with optional yearly percentage escalators
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Costs {
    /// Name of the plant
    #[serde(rename = "powerplant")]
    pub name: String,
    /// Investment cost
    #[serde(default, deserialize_with = "deserialise_value")]
    pub cost_invest: Option<f64>,
    /// Fixed operating cost
    #[serde(default, deserialize_with = "deserialise_value")]
    pub cost_fixed: Option<f64>,
    /// Variable operating cost
    #[serde(default, deserialize_with = "deserialise_value")]
    pub cost_variable: Option<f64>,
    /// Yearly change in investment cost, in percent
    #[serde(default, deserialize_with = "deserialise_value")]
    pub cost_invest_incr: Option<f64>,
    /// Yearly change in fixed cost, in percent
    #[serde(default, deserialize_with = "deserialise_value")]
    pub cost_fixed_incr: Option<f64>,
    /// Yearly change in variable cost, in percent
    #[serde(default, deserialize_with = "deserialise_value")]
    pub cost_variable_incr: Option<f64>,
    /// Plant-specific discount rate
    #[serde(default, deserialize_with = "deserialise_value")]
    pub discount_rate: Option<f64>,
    /// Source of the discount rate, copied into the note column
    #[serde(rename = "Ref_DiscountRate", default, deserialize_with = "deserialise_text")]
    pub ref_discount_rate: Option<String>,
}
define_name_getter! {Costs}
define_numeric_columns! {Costs, {
    "CostInvest" => cost_invest,
    "CostFixed" => cost_fixed,
    "CostVariable" => cost_variable,
    "CostInvestIncr" => cost_invest_incr,
    "CostFixedIncr" => cost_fixed_incr,
    "CostVariableIncr" => cost_variable_incr,
    "DiscountRate" => discount_rate,
}}

/// Operating and build constraints for a power plant
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Constraints {
    /// Name of the plant
    #[serde(rename = "powerplant")]
    pub name: String,
    /// Maximum capacity in MW
    #[serde(default, deserialize_with = "deserialise_value")]
    pub max_capacity: Option<f64>,
    /// Maximum activity
    #[serde(default, deserialize_with = "deserialise_value")]
    pub max_activity: Option<f64>,
    /// Ramp rate as a fraction of capacity per hour
    #[serde(default, deserialize_with = "deserialise_value")]
    pub ramp_rate: Option<f64>,
    /// First year in which new capacity may be built
    #[serde(default, deserialize_with = "deserialise_value")]
    pub first_build: Option<f64>,
    /// Last year in which new capacity may be built
    #[serde(default, deserialize_with = "deserialise_value")]
    pub last_build: Option<f64>,
}
define_name_getter! {Constraints}
define_numeric_columns! {Constraints, {
    "MaxCapacity" => max_capacity,
    "MaxActivity" => max_activity,
    "RampRate" => ramp_rate,
    "FirstBuild" => first_build,
    "LastBuild" => last_build,
}}

/// All power plant tables, keyed by plant name
#[derive(Debug, Clone, PartialEq)]
pub struct PowerPlantTables {
    /// Plant identities
    pub plants: IndexMap<TechID, PowerPlant>,
    /// Plant performance
    pub performance: IndexMap<TechID, Performance>,
    /// Plant costs
    pub costs: IndexMap<TechID, Costs>,
    /// Plant constraints
    pub constraints: IndexMap<TechID, Constraints>,
    /// Existing plant capacity
    pub existing: Vec<ExistingCapacityRow>,
}

/// Read a table of power plant rows and index it by plant name
fn read_indexed<T>(inputs_dir: &Path, file_name: &str) -> Result<IndexMap<TechID, T>>
where
    T: DeserializeOwned + HasName,
{
    let file_path = inputs_dir.join(file_name);
    let rows = read_csv(&file_path)?;
    index_by_name(rows, file_name.trim_end_matches(".csv"))
        .with_context(|| input_err_msg(&file_path))
}

/// Read the power plant tables from the inputs directory.
///
/// # Arguments
///
/// * `inputs_dir` - Folder containing the input CSV files
pub fn read_power_plants(inputs_dir: &Path) -> Result<PowerPlantTables> {
    let plants = read_indexed(inputs_dir, POWER_PLANTS_FILE_NAME)?;
    let existing_path = inputs_dir.join(EXISTING_FILE_NAME);
    let existing = read_csv_optional(&existing_path)?;
    check_existing_names(&existing, &plants, &existing_path)?;

    Ok(PowerPlantTables {
        plants,
        performance: read_indexed(inputs_dir, PERFORMANCE_FILE_NAME)?,
        costs: read_indexed(inputs_dir, COSTS_FILE_NAME)?,
        constraints: read_indexed(inputs_dir, CONSTRAINTS_FILE_NAME)?,
        existing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::demo_inputs_dir;
    use crate::input::{NumericColumns, get_row};
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[rstest::rstest]
    fn test_read_power_plants(demo_inputs_dir: PathBuf) {
        let tables = read_power_plants(&demo_inputs_dir).unwrap();
        let coal = get_row(&tables.plants, "COAL_PP", "PowerPlants").unwrap();
        assert_eq!(coal.fuel, "COAL");
        assert!(coal.baseload);
        assert!(!coal.renewable);
        assert!(tables.performance.contains_key("SOLAR_PP"));
        assert!(tables.existing.iter().any(|row| row.name == "COAL_PP"));
    }

    #[test]
    fn test_performance_columns() {
        let mut row = Performance {
            name: "plant".into(),
            efficiency: Some(40.0),
            heat_rate: None,
            expected_lifetime: Some(30.0),
            capacity_factor: Some(85.0),
        };
        *row.value_mut("Efficiency").unwrap() = Some(44.0);
        assert_eq!(row.efficiency, Some(44.0));
        assert_eq!(row.value_mut("HeatRate").copied(), Some(None));
        assert!(row.value_mut("CostInvest").is_none());
    }

    #[test]
    fn test_read_power_plants_unknown_existing() {
        let dir = tempdir().unwrap();
        let files = [
            (
                POWER_PLANTS_FILE_NAME,
                "powerplant,fuel,output,baseload,reserve,newBuilds,renewable,storage,CapacityCredit,StorageDuration\n\
                 GAS_PP,NATGAS,ELC,N,Y,Y,N,N,0.9,\n",
            ),
            (
                PERFORMANCE_FILE_NAME,
                "powerplant,Efficiency,HeatRate,ExpectedLifetime,CapacityFactor\nGAS_PP,50,,30,60\n",
            ),
            (
                COSTS_FILE_NAME,
                "powerplant,CostInvest,CostFixed,CostVariable,CostInvestIncr,CostFixedIncr,CostVariableIncr,DiscountRate,Ref_DiscountRate\n\
                 GAS_PP,1000,10,2,,,,,\n",
            ),
            (
                CONSTRAINTS_FILE_NAME,
                "powerplant,MaxCapacity,MaxActivity,RampRate,FirstBuild,LastBuild\nGAS_PP,,,,,\n",
            ),
            (
                EXISTING_FILE_NAME,
                "powerplant,YearInstalled,Capacity\nOIL_PP,1990,100\n",
            ),
        ];
        for (name, contents) in files {
            std::fs::write(dir.path().join(name), contents).unwrap();
        }

        let err = read_power_plants(dir.path()).unwrap_err();
        assert!(err.to_string().contains("unknown entity OIL_PP"));
    }
}
