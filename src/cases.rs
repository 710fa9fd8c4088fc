//! Generation of sensitivity and Monte Carlo cases.
//!
//! A case is a list of perturbation directives. Sensitivity cases vary one value at a time by a
//! fixed percentage, while Monte Carlo cases vary every selected value at once by random draws.
use crate::id::TechID;
use crate::input::{deserialise_flag, input_err_msg, parse_value, read_csv};
use crate::perturbation::{Directive, EntityFamily, Magnitude};
use crate::scenario::ScenarioContext;
use anyhow::{Context, Result, bail, ensure};
use clap::ValueEnum;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;

const GLOBALS_FILE_NAME: &str = "Globals.csv";
const POWER_PLANTS_FILE_NAME: &str = "PowerPlants.csv";
const FUELS_FILE_NAME: &str = "Fuels.csv";
const CONNECTIONS_FILE_NAME: &str = "Connections.csv";

/// Entity name used for directives on global parameters
pub const GLOBAL_TECH: &str = "global";

/// Which variables of each entity family are varied
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariableSelection {
    /// Global variables to vary
    pub globals: Vec<String>,
    /// Power plant variables to vary
    pub power_plants: Vec<String>,
    /// Fuel variables to vary
    pub fuels: Vec<String>,
    /// Connection variables to vary
    pub connections: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct VariableRow {
    variable: String,
    #[serde(deserialize_with = "deserialise_flag")]
    include: bool,
}

/// Read the included variables from one selection file
fn read_included_variables(file_path: &Path) -> Result<Vec<String>> {
    let rows: Vec<VariableRow> = read_csv(file_path)?;
    Ok(rows
        .into_iter()
        .filter(|row| row.include)
        .map(|row| row.variable)
        .collect())
}

/// Read which variables to vary from the given directory.
///
/// Each entity family has its own file with columns `variable` and `include`.
pub fn read_variable_selection(selection_dir: &Path) -> Result<VariableSelection> {
    Ok(VariableSelection {
        globals: read_included_variables(&selection_dir.join(GLOBALS_FILE_NAME))?,
        power_plants: read_included_variables(&selection_dir.join(POWER_PLANTS_FILE_NAME))?,
        fuels: read_included_variables(&selection_dir.join(FUELS_FILE_NAME))?,
        connections: read_included_variables(&selection_dir.join(CONNECTIONS_FILE_NAME))?,
    })
}

/// Every (family, variable, entity) combination to vary, in a fixed order
fn targets<'a>(
    scenario: &'a ScenarioContext,
    selection: &'a VariableSelection,
) -> impl Iterator<Item = (EntityFamily, &'a str, &'a str)> {
    let per_entity = |family, variables: &'a [String], entities: &'a [TechID]| {
        variables.iter().flat_map(move |variable| {
            entities
                .iter()
                .map(move |entity| (family, variable.as_str(), entity.as_str()))
        })
    };

    selection
        .globals
        .iter()
        .map(|variable| (EntityFamily::Globals, variable.as_str(), GLOBAL_TECH))
        .chain(per_entity(
            EntityFamily::PowerPlants,
            selection.power_plants.as_slice(),
            scenario.plants.as_slice(),
        ))
        .chain(per_entity(
            EntityFamily::Fuels,
            selection.fuels.as_slice(),
            scenario.fuels.as_slice(),
        ))
        .chain(per_entity(
            EntityFamily::Connections,
            selection.connections.as_slice(),
            scenario.connections.as_slice(),
        ))
}

/// Create sensitivity cases: the baseline, then a decrease and an increase by `multiplier`
/// percent for every selected variable of every included entity.
pub fn sensitivity_cases(
    scenario: &ScenarioContext,
    selection: &VariableSelection,
    multiplier: f64,
) -> Vec<Directive> {
    let mut directives = vec![Directive::baseline()];
    for (family, variable, tech) in targets(scenario, selection) {
        for percent in [-multiplier, multiplier] {
            directives.push(Directive {
                family,
                variable: variable.to_string(),
                tech: tech.to_string(),
                magnitude: Magnitude::Multiplier(percent),
            });
        }
    }

    directives
}

/// How Monte Carlo draws are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum McMode {
    /// Draws are percentage changes to the original values
    #[default]
    Perturbations,
    /// Draws replace the original values
    Values,
}

/// Random draws for one (family, variable, entity) combination
#[derive(Debug, Clone, PartialEq)]
pub struct MonteCarloRow {
    /// Which family of entities the variable belongs to
    pub family: EntityFamily,
    /// Name of the varied column
    pub variable: String,
    /// Entity the variable belongs to
    pub tech: String,
    /// One draw per case
    pub draws: Vec<f64>,
}

/// Draw from the triangular distribution over [`low`, `high`] with peak at `mode`
pub fn sample_triangular<R: Rng>(rng: &mut R, low: f64, mode: f64, high: f64) -> f64 {
    let width = high - low;
    if width <= 0.0 {
        return mode;
    }

    let u = rng.gen_range(0.0..1.0);
    let split = (mode - low) / width;
    if u < split {
        low + (u * width * (mode - low)).sqrt()
    } else {
        high - ((1.0 - u) * width * (high - mode)).sqrt()
    }
}

/// Create Monte Carlo cases.
///
/// Every selected variable of every included entity gets `n_cases` draws from the triangular
/// distribution over [-`multiplier`, 0, `multiplier`]. If `seed` is given, the draws are
/// reproducible.
pub fn monte_carlo_cases(
    scenario: &ScenarioContext,
    selection: &VariableSelection,
    multiplier: f64,
    n_cases: usize,
    seed: Option<u64>,
) -> Vec<MonteCarloRow> {
    let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    targets(scenario, selection)
        .map(|(family, variable, tech)| MonteCarloRow {
            family,
            variable: variable.to_string(),
            tech: tech.to_string(),
            draws: (0..n_cases)
                .map(|_| sample_triangular(&mut rng, -multiplier, 0.0, multiplier))
                .collect(),
        })
        .collect()
}

/// Number of cases in a Monte Carlo table
pub fn case_count(rows: &[MonteCarloRow]) -> usize {
    rows.first().map_or(0, |row| row.draws.len())
}

/// The directives for a single Monte Carlo case
pub fn case_directives(
    rows: &[MonteCarloRow],
    case: usize,
    mode: McMode,
) -> Result<Vec<Directive>> {
    let n_cases = case_count(rows);
    if let Some(row) = rows.iter().find(|row| row.draws.len() != n_cases) {
        bail!(
            "Monte Carlo row for {} {} has {} draws but expected {n_cases}",
            row.tech,
            row.variable,
            row.draws.len()
        );
    }
    ensure!(
        case < n_cases,
        "Case {case} requested but only {n_cases} cases are defined"
    );

    Ok(rows
        .iter()
        .map(|row| {
            let draw = row.draws[case];
            Directive {
                family: row.family,
                variable: row.variable.clone(),
                tech: row.tech.clone(),
                magnitude: match mode {
                    McMode::Perturbations => Magnitude::Multiplier(draw),
                    McMode::Values => Magnitude::Value(draw),
                },
            }
        })
        .collect())
}

/// A sensitivity directive as written to a CSV file
#[derive(Debug, Serialize)]
struct SensitivityRecord<'a> {
    #[serde(rename = "type")]
    family: EntityFamily,
    variable: &'a str,
    tech: &'a str,
    multiplier: f64,
}

/// Write sensitivity cases to a CSV file which can be read back with
/// [`crate::perturbation::read_directives`]
pub fn write_sensitivity_cases(file_path: &Path, directives: &[Directive]) -> Result<()> {
    let mut writer = csv::Writer::from_path(file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    for directive in directives {
        let Magnitude::Multiplier(multiplier) = directive.magnitude else {
            bail!(
                "Sensitivity directive for {} of {} must give a multiplier",
                directive.variable,
                directive.tech
            );
        };
        writer.serialize(SensitivityRecord {
            family: directive.family,
            variable: &directive.variable,
            tech: &directive.tech,
            multiplier,
        })?;
    }
    writer.flush()?;
    info!(
        "Wrote {} sensitivity cases to {}",
        directives.len(),
        file_path.display()
    );

    Ok(())
}

/// Write Monte Carlo cases to a CSV file with one column per case
pub fn write_monte_carlo_cases(file_path: &Path, rows: &[MonteCarloRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    let n_cases = case_count(rows);
    let header = ["type".to_string(), "variable".into(), "tech".into()]
        .into_iter()
        .chain((0..n_cases).map(|case| case.to_string()));
    writer.write_record(header)?;

    for row in rows {
        let record = [
            row.family.to_string(),
            row.variable.clone(),
            row.tech.clone(),
        ]
        .into_iter()
        .chain(row.draws.iter().map(f64::to_string));
        writer.write_record(record)?;
    }
    writer.flush()?;
    info!(
        "Wrote {n_cases} Monte Carlo cases for {} variables to {}",
        rows.len(),
        file_path.display()
    );

    Ok(())
}

/// Parse the family column of a cases file
fn parse_family(s: &str) -> Result<EntityFamily> {
    Ok(match s {
        "Baseline" => EntityFamily::Baseline,
        "Globals" => EntityFamily::Globals,
        "PowerPlants" => EntityFamily::PowerPlants,
        "Fuels" => EntityFamily::Fuels,
        "Connections" => EntityFamily::Connections,
        _ => bail!("Unknown entity type {s}"),
    })
}

/// Read Monte Carlo cases written by [`write_monte_carlo_cases`]
pub fn read_monte_carlo_cases(file_path: &Path) -> Result<Vec<MonteCarloRow>> {
    let table = crate::input::read_raw_table(file_path)?;
    ensure!(
        table.headers.len() > 3 && table.headers[..3] == ["type", "variable", "tech"],
        "{}: expected columns type, variable, tech followed by one column per case",
        file_path.display()
    );

    table
        .rows
        .iter()
        .map(|record| {
            let draws = record[3..]
                .iter()
                .map(|cell| {
                    parse_value(cell)?.with_context(|| format!("Missing draw for {}", record[2]))
                })
                .collect::<Result<_>>()?;

            Ok(MonteCarloRow {
                family: parse_family(&record[0])?,
                variable: record[1].clone(),
                tech: record[2].clone(),
                draws,
            })
        })
        .collect::<Result<_>>()
        .with_context(|| input_err_msg(file_path))
}
