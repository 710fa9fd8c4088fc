//! Code for reading transport connections between commodities.
use super::{
    ExistingCapacityRow, check_existing_names, define_name_getter, define_numeric_columns,
    deserialise_value, index_by_name, input_err_msg, read_csv_optional,
};
use crate::id::TechID;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

const CONNECTIONS_FILE_NAME: &str = "Connections.csv";
const CONNECTIONS_EXISTING_FILE_NAME: &str = "ConnectionsExisting.csv";

/// A connection carrying one commodity to another, e.g. a transmission line or pipeline
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Connection {
    /// Name of the connection
    #[serde(rename = "connection")]
    pub name: String,
    /// Commodity carried into the connection
    #[serde(rename = "input")]
    pub input: String,
    /// Commodity delivered by the connection
    #[serde(rename = "output")]
    pub output: String,
    /// Transport loss in percent
    #[serde(default, deserialize_with = "deserialise_value")]
    pub loss: Option<f64>,
    /// Lifetime in years
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
    /// First year in which new capacity may be built
    #[serde(default, deserialize_with = "deserialise_value")]
    pub first_build: Option<f64>,
    /// Last year in which new capacity may be built
    #[serde(default, deserialize_with = "deserialise_value")]
    pub last_build: Option<f64>,
}
define_name_getter! {Connection}
define_numeric_columns! {Connection, {
    "Loss" => loss,
    "Lifetime" => lifetime,
    "EmissionActivity" => emission_activity,
    "CostInvest" => cost_invest,
    "CostVariable" => cost_variable,
    "CostInvestIncr" => cost_invest_incr,
    "CostVariableIncr" => cost_variable_incr,
    "FirstBuild" => first_build,
    "LastBuild" => last_build,
}}

/// Read connections and their existing capacity from the inputs directory
pub fn read_connections(
    inputs_dir: &Path,
) -> Result<(IndexMap<TechID, Connection>, Vec<ExistingCapacityRow>)> {
    let file_path = inputs_dir.join(CONNECTIONS_FILE_NAME);
    let connections = index_by_name(read_csv_optional(&file_path)?, "Connections")
        .with_context(|| input_err_msg(&file_path))?;

    let existing_path = inputs_dir.join(CONNECTIONS_EXISTING_FILE_NAME);
    let existing = read_csv_optional(&existing_path)?;
    check_existing_names(&existing, &connections, &existing_path)?;

    Ok((connections, existing))
}
