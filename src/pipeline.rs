//! A complete model build: load inputs, apply perturbations, assemble the model and write it.
use crate::database::{WriteWarning, database_path, write_model};
use crate::input::{InputTables, load_inputs};
use crate::model::assemble_model;
use crate::perturbation::{Directive, apply_directives};
use crate::scenario::{ScenarioContext, read_scenario};
use anyhow::{Context, Result, ensure};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything needed for one model build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildRequest {
    /// Folder containing the input tables
    pub inputs_dir: PathBuf,
    /// Folder containing the scenario definitions
    pub scenario_dir: PathBuf,
    /// Name of the scenario to build
    pub scenario: String,
    /// Name of the model, used for the database file name
    pub name: String,
    /// Folder in which to write the database
    pub output_dir: PathBuf,
    /// Perturbations to apply before assembly, in order
    pub directives: Vec<Directive>,
    /// Optional database to copy the schema from
    pub template: Option<PathBuf>,
    /// Whether an existing database of the same name may be replaced
    pub overwrite: bool,
}

impl BuildRequest {
    /// A request for an unperturbed build, named after the inputs folder and scenario
    pub fn new(inputs_dir: &Path, scenario_dir: &Path, scenario: &str, output_dir: &Path) -> Self {
        Self {
            inputs_dir: inputs_dir.to_path_buf(),
            scenario_dir: scenario_dir.to_path_buf(),
            scenario: scenario.to_string(),
            name: default_model_name(inputs_dir, scenario),
            output_dir: output_dir.to_path_buf(),
            directives: Vec::new(),
            template: None,
            overwrite: true,
        }
    }

    /// Path of the database this request writes
    pub fn database_path(&self) -> PathBuf {
        database_path(&self.output_dir, &self.name)
    }
}

/// The default model name: the name of the inputs folder followed by the scenario
pub fn default_model_name(inputs_dir: &Path, scenario: &str) -> String {
    match inputs_dir.file_name().and_then(|name| name.to_str()) {
        Some(prefix) => format!("{prefix}_{scenario}"),
        None => scenario.to_string(),
    }
}

/// The result of a successful build
#[derive(Debug)]
pub struct BuildOutcome {
    /// Path of the database written
    pub database: PathBuf,
    /// Input tables after perturbation
    pub inputs: InputTables,
    /// Scenario context after perturbation
    pub scenario: ScenarioContext,
    /// Total number of rows written
    pub row_count: usize,
    /// Tables which could not be written
    pub warnings: Vec<WriteWarning>,
}

/// Run a complete model build.
///
/// A failed build may leave a partially written database behind, which should be discarded.
pub fn build_model(request: &BuildRequest) -> Result<BuildOutcome> {
    let database = request.database_path();
    ensure!(
        request.overwrite || !database.exists(),
        "Database {} already exists",
        database.display()
    );

    let mut inputs = load_inputs(&request.inputs_dir).with_context(|| {
        format!(
            "Failed to load inputs from {}",
            request.inputs_dir.display()
        )
    })?;
    let mut scenario = read_scenario(&request.scenario_dir, &request.scenario)?;
    info!(
        "Building model {} for scenario {}",
        request.name, request.scenario
    );

    if !request.directives.is_empty() {
        apply_directives(&mut inputs, &mut scenario, &request.directives)?;
        info!("Applied {} perturbations", request.directives.len());
    }

    let relations = assemble_model(&inputs, &scenario)
        .with_context(|| format!("Failed to assemble model {}", request.name))?;

    fs::create_dir_all(&request.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            request.output_dir.display()
        )
    })?;
    let warnings = write_model(&database, &relations, request.template.as_deref())?;

    Ok(BuildOutcome {
        database,
        inputs,
        scenario,
        row_count: relations.total_rows(),
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, demo_inputs_dir, demo_scenario_dir};
    use crate::perturbation::{EntityFamily, Magnitude};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use tempfile::tempdir;

    #[test]
    fn test_default_model_name() {
        assert_eq!(default_model_name(Path::new("data/inputs"), "A"), "inputs_A");
        assert_eq!(default_model_name(Path::new("/"), "A"), "A");
    }

    #[rstest]
    fn test_build_model(demo_inputs_dir: PathBuf, demo_scenario_dir: PathBuf) {
        let dir = tempdir().unwrap();
        let request = BuildRequest::new(&demo_inputs_dir, &demo_scenario_dir, "A", dir.path());
        let outcome = build_model(&request).unwrap();
        assert!(outcome.database.is_file());
        assert!(outcome.row_count > 0);
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.scenario.name, "A");
    }

    #[rstest]
    fn test_build_model_perturbed(demo_inputs_dir: PathBuf, demo_scenario_dir: PathBuf) {
        let dir = tempdir().unwrap();
        let mut request = BuildRequest::new(&demo_inputs_dir, &demo_scenario_dir, "A", dir.path());
        request.directives.push(Directive {
            family: EntityFamily::Globals,
            variable: "MaxGrowthRate".into(),
            tech: "global".into(),
            magnitude: Magnitude::Value(7.5),
        });
        let outcome = build_model(&request).unwrap();
        assert_approx_eq!(f64, outcome.scenario.max_growth_rate.unwrap(), 7.5);
    }

    #[rstest]
    fn test_build_model_no_overwrite(demo_inputs_dir: PathBuf, demo_scenario_dir: PathBuf) {
        let dir = tempdir().unwrap();
        let mut request = BuildRequest::new(&demo_inputs_dir, &demo_scenario_dir, "A", dir.path());
        request.overwrite = false;
        fs::write(request.database_path(), "").unwrap();
        assert_error!(
            build_model(&request),
            format!("Database {} already exists", request.database_path().display())
        );
    }
}
