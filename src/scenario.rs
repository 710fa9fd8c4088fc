//! Code for selecting a scenario: which entities take part and which optional constraints apply.
use crate::id::TechID;
use crate::input::{RawTable, input_err_msg, is_yes, parse_value, read_raw_table};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use std::path::Path;

const POWER_PLANTS_FILE_NAME: &str = "PowerPlants.csv";
const FUELS_FILE_NAME: &str = "Fuels.csv";
const CONNECTIONS_FILE_NAME: &str = "Connections.csv";
const SOLVER_SETTINGS_FILE_NAME: &str = "SolverSettings.csv";

/// Header of the column holding entity or setting names
const KEY_COLUMN: &str = "Scenario";

/// Optional constraint families which can be switched on or off per scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Toggles {
    /// Baseload plants must run at a constant level within each season
    pub baseload: bool,
    /// Reserve capacity must cover peak demand
    pub reserve_margin: bool,
    /// Ramp rates are limited
    pub ramping: bool,
    /// Growth of new capacity is limited
    pub growth_limit: bool,
    /// A renewable portfolio standard applies
    pub rps: bool,
    /// Emissions are capped
    pub emission_limit: bool,
    /// Minimum capacities are enforced
    pub min_capacity_limit: bool,
}

/// Everything about a scenario needed to assemble a model
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioContext {
    /// Name of the scenario
    pub name: String,
    /// Which optional constraints are included
    pub toggles: Toggles,
    /// Maximum growth rate of new capacity, in percent
    pub max_growth_rate: Option<f64>,
    /// Minimum growth seed, in MW
    pub min_growth_seed: Option<f64>,
    /// Upper limit on loan lifetimes, in years
    pub max_loan_years: Option<f64>,
    /// Power plants taking part, in file order
    pub plants: Vec<TechID>,
    /// Fuels taking part, in file order
    pub fuels: Vec<TechID>,
    /// Connections taking part, in file order
    pub connections: Vec<TechID>,
}

/// Find the column for the given scenario
fn scenario_column(table: &RawTable, scenario: &str) -> Result<usize> {
    ensure!(
        table.headers.first().is_some_and(|h| h == KEY_COLUMN),
        "First column must be named {KEY_COLUMN}"
    );
    table
        .headers
        .iter()
        .position(|h| h == scenario)
        .filter(|&idx| idx > 0)
        .with_context(|| format!("Scenario {scenario} not found"))
}

/// Entities marked for inclusion in the given scenario
fn read_included(file_path: &Path, scenario: &str) -> Result<Vec<TechID>> {
    let table = read_raw_table(file_path)?;
    let column = scenario_column(&table, scenario).with_context(|| input_err_msg(file_path))?;

    Ok(table
        .rows
        .iter()
        .filter(|row| row.get(column).is_some_and(|cell| is_yes(cell)))
        .map(|row| TechID::new(&row[0]))
        .collect())
}

/// Solver settings for one scenario, keyed by setting name
struct Settings {
    values: IndexMap<String, String>,
}

impl Settings {
    fn read(file_path: &Path, scenario: &str) -> Result<Self> {
        let table = read_raw_table(file_path)?;
        let column =
            scenario_column(&table, scenario).with_context(|| input_err_msg(file_path))?;
        let values = table
            .rows
            .into_iter()
            .map(|mut row| {
                let value = row.get_mut(column).map(std::mem::take).unwrap_or_default();
                (std::mem::take(&mut row[0]), value)
            })
            .collect();

        Ok(Self { values })
    }

    fn get(&self, setting: &str) -> Result<&str> {
        self.values
            .get(setting)
            .map(String::as_str)
            .with_context(|| format!("Missing solver setting {setting}"))
    }

    fn flag(&self, setting: &str) -> Result<bool> {
        Ok(is_yes(self.get(setting)?))
    }

    fn value(&self, setting: &str) -> Result<Option<f64>> {
        parse_value(self.get(setting)?).with_context(|| format!("Bad value for setting {setting}"))
    }
}

/// Read the scenario definition for the named scenario.
///
/// # Arguments
///
/// * `scenario_dir` - Folder containing the scenario definition CSV files
/// * `scenario` - Name of the scenario column to select
pub fn read_scenario(scenario_dir: &Path, scenario: &str) -> Result<ScenarioContext> {
    let plants = read_included(&scenario_dir.join(POWER_PLANTS_FILE_NAME), scenario)?;
    let fuels = read_included(&scenario_dir.join(FUELS_FILE_NAME), scenario)?;
    let connections = read_included(&scenario_dir.join(CONNECTIONS_FILE_NAME), scenario)?;

    let settings_path = scenario_dir.join(SOLVER_SETTINGS_FILE_NAME);
    let settings = Settings::read(&settings_path, scenario)?;
    let read_settings = || -> Result<(Toggles, [Option<f64>; 3])> {
        let toggles = Toggles {
            baseload: settings.flag("include_baseload")?,
            reserve_margin: settings.flag("include_reserve_margin")?,
            ramping: settings.flag("include_ramping")?,
            growth_limit: settings.flag("include_growth_limit")?,
            rps: settings.flag("include_RPS")?,
            emission_limit: settings.flag("include_emission_limit")?,
            min_capacity_limit: settings.flag("include_min_capacity_limit")?,
        };
        let values = [
            settings.value("MaxGrowthRate")?,
            settings.value("MinGrowthSeed")?,
            settings.value("MaxLoan_yrs")?,
        ];
        Ok((toggles, values))
    };
    let (toggles, [max_growth_rate, min_growth_seed, max_loan_years]) =
        read_settings().with_context(|| input_err_msg(&settings_path))?;

    Ok(ScenarioContext {
        name: scenario.to_string(),
        toggles,
        max_growth_rate,
        min_growth_seed,
        max_loan_years,
        plants,
        fuels,
        connections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, demo_scenario_dir};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[rstest::rstest]
    fn test_read_scenario(demo_scenario_dir: PathBuf) {
        let scenario = read_scenario(&demo_scenario_dir, "A").unwrap();
        assert_eq!(scenario.name, "A");
        assert!(scenario.plants.contains(&"COAL_PP".into()));
        assert!(!scenario.fuels.is_empty());
        assert_eq!(scenario.max_loan_years, Some(20.0));
    }

    #[rstest::rstest]
    fn test_read_scenario_missing_column(demo_scenario_dir: PathBuf) {
        assert!(read_scenario(&demo_scenario_dir, "NoSuchScenario").is_err());
    }

    #[test]
    fn test_read_included() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("PowerPlants.csv");
        fs::write(&file_path, "Scenario,A,B\nCOAL,Y,N\nGAS,N,Y\nWIND,Y,Y\n").unwrap();

        let included = read_included(&file_path, "A").unwrap();
        assert_eq!(included, [TechID::new("COAL"), TechID::new("WIND")]);
        let included = read_included(&file_path, "B").unwrap();
        assert_eq!(included, [TechID::new("GAS"), TechID::new("WIND")]);
        assert_error!(read_included(&file_path, "C"), input_err_msg(&file_path));
    }

    #[test]
    fn test_settings_missing_row() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("SolverSettings.csv");
        fs::write(&file_path, "Scenario,A\ninclude_baseload,Y\nMaxLoan_yrs,\n").unwrap();

        let settings = Settings::read(&file_path, "A").unwrap();
        assert!(settings.flag("include_baseload").unwrap());
        assert_eq!(settings.value("MaxLoan_yrs").unwrap(), None);
        assert_error!(
            settings.flag("include_ramping"),
            "Missing solver setting include_ramping"
        );
    }
}
