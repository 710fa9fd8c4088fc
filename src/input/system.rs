//! Code for reading system-wide input tables: time slices, demand, discount rates and limits.
use super::{
    RawTable, deserialise_value, input_err_msg, is_sorted_and_unique, read_csv,
    read_csv_optional, read_raw_table,
};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::Deserialize;
use std::path::Path;

const REPRESENTATIVE_DAYS_FILE_NAME: &str = "representativeDays.csv";
const TIMES_OF_DAY_FILE_NAME: &str = "timesOfDay.csv";
const DEMAND_FILE_NAME: &str = "Demand.csv";
const DEMAND_TOD_FILE_NAME: &str = "DemandTOD.csv";
const DISCOUNT_RATE_GLOBAL_FILE_NAME: &str = "DiscountRateGlobal.csv";
const DISCOUNT_RATE_TECH_FILE_NAME: &str = "DiscountRateTech.csv";
const EMISSION_FILE_NAME: &str = "Emission.csv";
const RESERVE_MARGIN_FILE_NAME: &str = "ReserveMargin.csv";
const CAPACITY_FACTOR_TOD_FILE_NAME: &str = "capacityFactorTOD.csv";
const MIN_CAPACITY_FILE_NAME: &str = "MinCapacity.csv";
const REF_FILE_NAME: &str = "ref.csv";

/// A representative day (season) with its share of the year and of demand
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepresentativeDay {
    /// Name of the day
    pub representative_day: String,
    /// Fraction of the year represented by this day
    pub time_frac: f64,
    /// Fraction of demand falling on this day
    pub dmd_frac: f64,
}

/// A time of day with its share of a day
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOfDay {
    /// Name of the time of day
    pub time_of_day: String,
    /// Fraction of the day
    pub time_frac: f64,
}

/// Yearly electricity demand
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DemandRow {
    /// Year of the row
    #[serde(rename = "Year")]
    pub year: u32,
    /// Demand in PJ
    #[serde(rename = "Demand")]
    pub demand: f64,
    /// Renewable portfolio standard (fraction of generation)
    #[serde(rename = "RPS", default, deserialize_with = "deserialise_value")]
    pub rps: Option<f64>,
}

/// Share of a day's demand falling in a time of day
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandTimeOfDay {
    /// Name of the representative day
    pub representative_day: String,
    /// Name of the time of day
    pub time_of_day: String,
    /// Fraction of the day's demand
    pub dmd_frac: f64,
}

/// The global discount rate
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GlobalDiscountRate {
    /// Discount rate as a fraction
    #[serde(rename = "DiscountRate", deserialize_with = "deserialise_value")]
    pub discount_rate: Option<f64>,
}

/// A limit on emissions in a period
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmissionLimitRow {
    /// Period the limit applies to
    pub periods: u32,
    /// Emission commodity
    pub emis_comm: String,
    /// Upper limit on emissions
    pub emis_limit: f64,
    /// Units of the limit
    #[serde(default)]
    pub emis_limit_units: String,
    /// Free-text notes
    #[serde(default)]
    pub emis_limit_notes: String,
}

/// The planning reserve margin
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReserveMarginRow {
    /// Reserve margin as a fraction of peak demand
    #[serde(rename = "ReserveMargin", deserialize_with = "deserialise_value")]
    pub reserve_margin: Option<f64>,
}

/// Capacity factor multiplier for technologies using a fuel, varying by time slice
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityFactorTimeOfDay {
    /// Fuel whose technologies are affected
    pub fuel: String,
    /// Name of the representative day
    pub representative_day: String,
    /// Name of the time of day
    pub time_of_day: String,
    /// Capacity factor as a fraction
    pub capacity_factor: f64,
}

/// A minimum capacity requirement for a technology in a year
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MinCapacityRow {
    /// Name of the technology
    #[serde(rename = "Technology")]
    pub technology: String,
    /// Year of the row
    #[serde(rename = "Year")]
    pub year: u32,
    /// Minimum capacity in MW
    #[serde(rename = "MinCapacity")]
    pub min_capacity: f64,
}

/// System-wide input tables
#[derive(Debug, Clone, PartialEq)]
pub struct SystemTables {
    /// Representative days
    pub representative_days: Vec<RepresentativeDay>,
    /// Times of day
    pub times_of_day: Vec<TimeOfDay>,
    /// Yearly demand
    pub demand: Vec<DemandRow>,
    /// Distribution of demand within each day
    pub demand_tod: Vec<DemandTimeOfDay>,
    /// Global discount rate
    pub discount_rate_global: Vec<GlobalDiscountRate>,
    /// Technology-specific discount rates, kept for reference
    pub discount_rate_tech: RawTable,
    /// Emission limits
    pub emission: Vec<EmissionLimitRow>,
    /// Reserve margin as a fraction of peak demand
    pub reserve_margin: Vec<ReserveMarginRow>,
    /// Time-varying capacity factors
    pub capacity_factor_tod: Vec<CapacityFactorTimeOfDay>,
    /// Minimum capacities
    pub min_capacity: Vec<MinCapacityRow>,
    /// Sources of input data
    pub reference: RawTable,
}

impl SystemTables {
    /// The global discount rate, if present
    pub fn global_discount_rate(&self) -> Option<f64> {
        self.discount_rate_global
            .first()
            .and_then(|row| row.discount_rate)
    }

    /// The reserve margin, if present
    pub fn reserve_margin(&self) -> Option<f64> {
        self.reserve_margin.first().and_then(|row| row.reserve_margin)
    }

    /// Whether the fuel has a time-varying capacity factor
    pub fn has_capacity_factor_profile(&self, fuel: &str) -> bool {
        self.capacity_factor_tod.iter().any(|row| row.fuel == fuel)
    }
}

/// Check that demand years are given in order and that there are enough of them.
///
/// The final year only marks the end of the horizon, so at least two are needed.
fn check_demand_years(demand: &[DemandRow]) -> Result<()> {
    let years = demand.iter().map(|row| row.year).collect_vec();
    ensure!(
        is_sorted_and_unique(&years),
        "Demand years must be unique and in ascending order"
    );
    ensure!(
        years.len() >= 2,
        "At least two demand years are required (the last year ends the model horizon)"
    );

    Ok(())
}

/// Read the system-wide tables from the inputs directory.
///
/// # Arguments
///
/// * `inputs_dir` - Folder containing the input CSV files
pub fn read_system_tables(inputs_dir: &Path) -> Result<SystemTables> {
    let demand_path = inputs_dir.join(DEMAND_FILE_NAME);
    let demand = read_csv(&demand_path)?;
    check_demand_years(&demand).with_context(|| input_err_msg(&demand_path))?;

    Ok(SystemTables {
        representative_days: read_csv(&inputs_dir.join(REPRESENTATIVE_DAYS_FILE_NAME))?,
        times_of_day: read_csv(&inputs_dir.join(TIMES_OF_DAY_FILE_NAME))?,
        demand,
        demand_tod: read_csv(&inputs_dir.join(DEMAND_TOD_FILE_NAME))?,
        discount_rate_global: read_csv(&inputs_dir.join(DISCOUNT_RATE_GLOBAL_FILE_NAME))?,
        discount_rate_tech: read_raw_table(&inputs_dir.join(DISCOUNT_RATE_TECH_FILE_NAME))?,
        emission: read_csv_optional(&inputs_dir.join(EMISSION_FILE_NAME))?,
        reserve_margin: read_csv_optional(&inputs_dir.join(RESERVE_MARGIN_FILE_NAME))?,
        capacity_factor_tod: read_csv_optional(&inputs_dir.join(CAPACITY_FACTOR_TOD_FILE_NAME))?,
        min_capacity: read_csv_optional(&inputs_dir.join(MIN_CAPACITY_FILE_NAME))?,
        reference: read_raw_table(&inputs_dir.join(REF_FILE_NAME))?,
    })
}
