//! Code for reading the fuel supply tables.
use super::{
    ExistingCapacityRow, check_existing_names, define_name_getter, define_numeric_columns,
    deserialise_value, index_by_name, input_err_msg, read_csv, read_csv_optional,
};
use crate::id::TechID;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

const FUELS_FILE_NAME: &str = "Fuels.csv";
const FUELS_EXISTING_FILE_NAME: &str = "FuelsExisting.csv";

/// A fuel which is imported into the model
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Fuel {
    /// Name of the fuel
    #[serde(rename = "fuel")]
    pub name: String,
    /// Lifetime of import capacity in years
    #[serde(default, deserialize_with = "deserialise_value")]
    pub lifetime: Option<f64>,
    /// Emissions in kt per PJ of output
    #[serde(default, deserialize_with = "deserialise_value")]
    pub emission_activity: Option<f64>,
    /// Investment cost
    #[serde(default, deserialize_with = "deserialise_value")]
    pub cost_invest: Option<f64>,
    /// Variable cost
    #[serde(default, deserialize_with = "deserialise_value")]
    pub cost_variable: Option<f64>,
    /// Yearly change in investment cost, in percent
    #[serde(default, deserialize_with = "deserialise_value")]
    pub cost_invest_incr: Option<f64>,
    /// Yearly change in variable cost, in percent
    #[serde(default, deserialize_with = "deserialise_value")]
    pub cost_variable_incr: Option<f64>,
    /// Maximum activity
    #[serde(default, deserialize_with = "deserialise_value")]
    pub max_activity: Option<f64>,
    /// Year from which the fuel can no longer be supplied
    #[serde(default, deserialize_with = "deserialise_value")]
    pub retirement: Option<f64>,
    /// First year in which new capacity may be built
    #[serde(default, deserialize_with = "deserialise_value")]
    pub first_build: Option<f64>,
    /// Last year in which new capacity may be built
    #[serde(default, deserialize_with = "deserialise_value")]
    pub last_build: Option<f64>,
}
define_name_getter! {Fuel}
define_numeric_columns! {Fuel, {
    "Lifetime" => lifetime,
    "EmissionActivity" => emission_activity,
    "CostInvest" => cost_invest,
    "CostVariable" => cost_variable,
    "CostInvestIncr" => cost_invest_incr,
    "CostVariableIncr" => cost_variable_incr,
    "MaxActivity" => max_activity,
    "Retirement" => retirement,
    "FirstBuild" => first_build,
    "LastBuild" => last_build,
}}

/// Read fuels and their existing capacity from the inputs directory
pub fn read_fuels(
    inputs_dir: &Path,
) -> Result<(IndexMap<TechID, Fuel>, Vec<ExistingCapacityRow>)> {
    let file_path = inputs_dir.join(FUELS_FILE_NAME);
    let fuels = index_by_name(read_csv(&file_path)?, "Fuels")
        .with_context(|| input_err_msg(&file_path))?;

    let existing_path = inputs_dir.join(FUELS_EXISTING_FILE_NAME);
    let existing = read_csv_optional(&existing_path)?;
    check_existing_names(&existing, &fuels, &existing_path)?;

    Ok((fuels, existing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::demo_inputs_dir;
    use crate::input::{NumericColumns, get_row};
    use std::path::PathBuf;

    #[rstest::rstest]
    fn test_read_fuels(demo_inputs_dir: PathBuf) {
        let (fuels, existing) = read_fuels(&demo_inputs_dir).unwrap();
        let coal = get_row(&fuels, "COAL", "Fuels").unwrap();
        assert!(coal.emission_activity.is_some());
        assert!(coal.cost_variable.is_some());
        assert!(existing.iter().all(|row| fuels.contains_key(row.name.as_str())));
    }

    #[test]
    fn test_fuel_columns() {
        let mut fuel = Fuel {
            name: "COAL".into(),
            lifetime: Some(40.0),
            emission_activity: None,
            cost_invest: None,
            cost_variable: Some(3.0),
            cost_invest_incr: None,
            cost_variable_incr: None,
            max_activity: None,
            retirement: None,
            first_build: None,
            last_build: None,
        };
        *fuel.value_mut("CostVariable").unwrap() = Some(3.3);
        assert_eq!(fuel.cost_variable, Some(3.3));
        assert!(fuel.value_mut("Efficiency").is_none());
    }
}
