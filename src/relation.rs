//! The relations making up a model database and the collection that rows are assembled into.
use crate::id::{CommodityID, TechID};
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use rusqlite::ToSql;
use rusqlite::types::{Null, ToSqlOutput};
use std::fmt;
use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};

// Headers of the wider relations
const CAPACITY_FACTOR_TECH_COLUMNS: &[&str] = &[
    "season_name",
    "time_of_day_name",
    "tech",
    "cf_tech",
    "cf_tech_notes",
];

const COST_FIXED_COLUMNS: &[&str] = &[
    "periods",
    "tech",
    "vintage",
    "cost_fixed",
    "cost_fixed_units",
    "cost_fixed_notes",
];

const COST_INVEST_COLUMNS: &[&str] = &[
    "tech",
    "vintage",
    "cost_invest",
    "cost_invest_units",
    "cost_invest_notes",
];

const COST_VARIABLE_COLUMNS: &[&str] = &[
    "periods",
    "tech",
    "vintage",
    "cost_variable",
    "cost_variable_units",
    "cost_variable_notes",
];

const DEMAND_COLUMNS: &[&str] = &[
    "periods",
    "demand_comm",
    "demand",
    "demand_units",
    "demand_notes",
];

const DEMAND_SPECIFIC_DISTRIBUTION_COLUMNS: &[&str] = &[
    "season_name",
    "time_of_day_name",
    "demand_name",
    "dds",
    "dds_notes",
];

const EFFICIENCY_COLUMNS: &[&str] = &[
    "input_comm",
    "tech",
    "vintage",
    "output_comm",
    "efficiency",
    "eff_notes",
];

const EMISSION_ACTIVITY_COLUMNS: &[&str] = &[
    "emis_comm",
    "input_comm",
    "tech",
    "vintage",
    "output_comm",
    "emis_act",
    "emis_act_units",
    "emis_act_notes",
];

const EMISSION_LIMIT_COLUMNS: &[&str] = &[
    "periods",
    "emis_comm",
    "emis_limit",
    "emis_limit_units",
    "emis_limit_notes",
];

const EXISTING_CAPACITY_COLUMNS: &[&str] = &[
    "tech",
    "vintage",
    "exist_cap",
    "exist_cap_units",
    "exist_cap_notes",
];

const GROWTH_RATE_SEED_COLUMNS: &[&str] = &[
    "tech",
    "growthrate_seed",
    "growthrate_seed_units",
    "growthrate_seed_notes",
];

/// A relation (table) of the model database.
///
/// Variants are listed in the order in which tables are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
pub enum Relation {
    /// Every commodity with its flag
    #[strum(serialize = "commodities")]
    Commodities,
    /// Every technology with its sector
    #[strum(serialize = "technologies")]
    Technologies,
    /// Technologies which must run at a constant level
    #[strum(serialize = "tech_baseload")]
    TechBaseload,
    /// Technologies counting towards the reserve margin
    #[strum(serialize = "tech_reserve")]
    TechReserve,
    /// Technologies with limited ramp rates
    #[strum(serialize = "tech_ramping")]
    TechRamping,
    /// Times of day
    #[strum(serialize = "time_of_day")]
    TimeOfDay,
    /// Periods and vintages
    #[strum(serialize = "time_periods")]
    TimePeriods,
    /// Representative days
    #[strum(serialize = "time_season")]
    TimeSeason,
    /// Capacity factors by time slice
    CapacityFactorTech,
    /// Conversion from capacity to activity
    CapacityToActivity,
    /// Fixed costs by period and vintage
    CostFixed,
    /// Investment costs by vintage
    CostInvest,
    /// Variable costs by period and vintage
    CostVariable,
    /// Demand by period
    Demand,
    /// Share of demand in each time slice
    DemandSpecificDistribution,
    /// Technology-specific discount rates
    DiscountRate,
    /// Conversion from input to output commodity
    Efficiency,
    /// Emissions per unit of output
    EmissionActivity,
    /// Upper limits on emissions
    EmissionLimit,
    /// Capacity built before the model horizon
    ExistingCapacity,
    /// Loan lifetimes
    LifetimeLoanTech,
    /// Technology lifetimes
    LifetimeTech,
    /// Upper limits on capacity
    MaxCapacity,
    /// Upper limits on activity
    MaxActivity,
    /// Lower limits on capacity
    MinCapacity,
    /// The global discount rate
    GlobalDiscountRate,
    /// Maximum growth rate of capacity
    GrowthRateMax,
    /// Growth seed for new capacity
    GrowthRateSeed,
    /// Upward ramp rates
    RampUp,
    /// Downward ramp rates
    RampDown,
    /// The reserve margin
    ReserveMargin,
    /// Share of the year in each time slice
    SegFrac,
    /// Hours of storage
    StorageDuration,
    /// Minimum generation share of a technology group by period
    #[strum(serialize = "MinGenGroupOfTechnologies_Data")]
    MinGenGroupOfTechnologiesData,
    /// Members of each technology group
    MinGenGroupOfTechnologies,
    /// Capacity credits
    CapacityCredit,
}

impl Relation {
    /// The table name in the model database
    pub fn table_name(self) -> &'static str {
        self.into()
    }

    /// Column names, in positional order
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Commodities => &["comm_name", "flag", "comm_desc"],
            Self::Technologies => &["tech", "flag", "sector", "tech_desc", "tech_category"],
            Self::TechBaseload | Self::TechReserve | Self::TechRamping => &["tech"],
            Self::TimeOfDay => &["t_day"],
            Self::TimePeriods => &["t_periods", "flag"],
            Self::TimeSeason => &["t_season"],
            Self::CapacityFactorTech => CAPACITY_FACTOR_TECH_COLUMNS,
            Self::CapacityToActivity => &["tech", "c2a", "c2a_notes"],
            Self::CostFixed => COST_FIXED_COLUMNS,
            Self::CostInvest => COST_INVEST_COLUMNS,
            Self::CostVariable => COST_VARIABLE_COLUMNS,
            Self::Demand => DEMAND_COLUMNS,
            Self::DemandSpecificDistribution => DEMAND_SPECIFIC_DISTRIBUTION_COLUMNS,
            Self::DiscountRate => &["tech", "vintage", "tech_rate", "tech_rate_notes"],
            Self::Efficiency => EFFICIENCY_COLUMNS,
            Self::EmissionActivity => EMISSION_ACTIVITY_COLUMNS,
            Self::EmissionLimit => EMISSION_LIMIT_COLUMNS,
            Self::ExistingCapacity => EXISTING_CAPACITY_COLUMNS,
            Self::LifetimeLoanTech => &["tech", "life_loan", "life_loan_notes"],
            Self::LifetimeTech => &["tech", "life", "life_notes"],
            Self::MaxCapacity => &["periods", "tech", "maxcap", "maxcap_units", "maxcap_notes"],
            Self::MaxActivity => &["periods", "tech", "maxact", "maxact_units", "maxact_notes"],
            Self::MinCapacity => &["periods", "tech", "mincap", "mincap_units", "mincap_notes"],
            Self::GlobalDiscountRate => &["rate"],
            Self::GrowthRateMax => &["tech", "growthrate_max", "growthrate_max_notes"],
            Self::GrowthRateSeed => GROWTH_RATE_SEED_COLUMNS,
            Self::RampUp => &["tech", "ramp_up"],
            Self::RampDown => &["tech", "ramp_down"],
            Self::ReserveMargin => &["demand_comm", "reserve_margin"],
            Self::SegFrac => &["season_name", "time_of_day_name", "segfrac", "segfrac_notes"],
            Self::StorageDuration => &["tech", "duration", "duration_notes"],
            Self::MinGenGroupOfTechnologiesData => &["periods", "group_name", "min_act_g"],
            Self::MinGenGroupOfTechnologies => &["tech", "group_name", "weight", "notes"],
            Self::CapacityCredit => &["tech", "cf_tech"],
        }
    }

    /// Number of columns
    pub fn arity(self) -> usize {
        self.columns().len()
    }
}

/// A single value in a relation row
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// A missing value
    Null,
    /// A whole number, such as a year
    Integer(i64),
    /// A real number
    Real(f64),
    /// A string
    Text(String),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Real(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
        }
    }
}

impl From<u32> for Cell {
    fn from(value: u32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Null, Self::Real)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&TechID> for Cell {
    fn from(value: &TechID) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<&CommodityID> for Cell {
    fn from(value: &CommodityID) -> Self {
        Self::Text(value.to_string())
    }
}

impl ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::from(Null),
            Self::Integer(value) => ToSqlOutput::from(*value),
            Self::Real(value) => ToSqlOutput::from(*value),
            Self::Text(value) => ToSqlOutput::from(value.as_str()),
        })
    }
}

/// A row of a relation
pub type Row = Vec<Cell>;

/// Build a [`Row`] from a list of values convertible into [`Cell`]s
macro_rules! row {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::relation::Cell::from($value)),*]
    };
}
pub(crate) use row;

/// The rows of every relation, in catalogue order
#[derive(Debug, Clone, PartialEq)]
pub struct RelationSet(IndexMap<Relation, Vec<Row>>);

impl Default for RelationSet {
    fn default() -> Self {
        Self(Relation::iter().map(|relation| (relation, Vec::new())).collect())
    }
}

impl RelationSet {
    /// Create an empty set of relations
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row to a relation.
    ///
    /// The row must have exactly as many values as the relation has columns.
    pub fn push(&mut self, relation: Relation, row: Row) -> Result<()> {
        ensure!(
            row.len() == relation.arity(),
            "Relation {relation} has {} columns but a row with {} values was given",
            relation.arity(),
            row.len()
        );
        self.0.entry(relation).or_default().push(row);

        Ok(())
    }

    /// The rows of a relation
    pub fn rows(&self, relation: Relation) -> &[Row] {
        self.0.get(&relation).map_or(&[], Vec::as_slice)
    }

    /// Iterate over relations and their rows, in catalogue order
    pub fn tables(&self) -> impl Iterator<Item = (Relation, &[Row])> {
        self.0.iter().map(|(relation, rows)| (*relation, rows.as_slice()))
    }

    /// Total number of rows across all relations
    pub fn total_rows(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;

    #[test]
    fn test_catalogue() {
        assert_eq!(Relation::iter().count(), 36);
        let total_columns: usize = Relation::iter().map(Relation::arity).sum();
        assert_eq!(total_columns, 129);
        assert_eq!(
            Relation::MinGenGroupOfTechnologiesData.table_name(),
            "MinGenGroupOfTechnologies_Data"
        );
        assert_eq!(Relation::TimePeriods.to_string(), "time_periods");
    }

    #[rstest]
    #[case(Relation::Commodities, 3)]
    #[case(Relation::Technologies, 5)]
    #[case(Relation::CostFixed, 6)]
    #[case(Relation::EmissionActivity, 8)]
    #[case(Relation::GlobalDiscountRate, 1)]
    #[case(Relation::GrowthRateSeed, 4)]
    #[case(Relation::MinGenGroupOfTechnologies, 4)]
    fn test_arity(#[case] relation: Relation, #[case] arity: usize) {
        assert_eq!(relation.arity(), arity);
    }

    #[rstest]
    #[case(Relation::CapacityFactorTech, "season_name", "cf_tech_notes")]
    #[case(Relation::CostVariable, "periods", "cost_variable_notes")]
    #[case(Relation::Efficiency, "input_comm", "eff_notes")]
    #[case(Relation::ExistingCapacity, "tech", "exist_cap_notes")]
    #[case(Relation::LifetimeTech, "tech", "life_notes")]
    fn test_column_order(#[case] relation: Relation, #[case] first: &str, #[case] last: &str) {
        let columns = relation.columns();
        assert_eq!(columns.first(), Some(&first));
        assert_eq!(columns.last(), Some(&last));
    }

    #[test]
    fn test_push() {
        let mut relations = RelationSet::new();
        relations
            .push(Relation::TimePeriods, row![2020u32, "f"])
            .unwrap();
        assert_eq!(
            relations.rows(Relation::TimePeriods),
            [vec![Cell::Integer(2020), Cell::Text("f".into())]]
        );
        assert_eq!(relations.total_rows(), 1);
    }

    #[test]
    fn test_push_bad_arity() {
        let mut relations = RelationSet::new();
        assert_error!(
            relations.push(Relation::TimePeriods, row![2020u32]),
            "Relation time_periods has 2 columns but a row with 1 values was given"
        );
        assert!(relations.rows(Relation::TimePeriods).is_empty());
    }

    #[test]
    fn test_iter_order() {
        let relations = RelationSet::new();
        let order: Vec<Relation> = relations.tables().map(|(relation, _)| relation).collect();
        assert_eq!(order, Relation::iter().collect::<Vec<_>>());
    }
}
