//! Running many independent model builds in parallel.
//!
//! Builds share no state, so each job loads its own copy of the inputs and writes its own
//! database. Job names must be unique, as they determine the database file names.
use crate::cases::{McMode, MonteCarloRow, case_count, case_directives};
use crate::database::WriteWarning;
use crate::perturbation::Directive;
use crate::pipeline::{BuildRequest, build_model};
use anyhow::{Context, Result, ensure};
use indexmap::IndexSet;
use log::{error, info, warn};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// The file name for the summary of a batch
const SUMMARY_FILE_NAME: &str = "batch_summary.csv";

/// The outcome of one job in a batch
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    /// Name of the model
    pub name: String,
    /// Scenario the model was built for
    pub scenario: String,
    /// Path of the database
    pub database: PathBuf,
    /// Number of rows written, if the build succeeded
    pub row_count: Option<usize>,
    /// Tables which could not be written
    pub warnings: Vec<WriteWarning>,
    /// Why the build failed, if it did
    pub error: Option<String>,
}

impl JobRecord {
    /// Whether the build succeeded
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Represents a row in the batch summary CSV file
#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    name: &'a str,
    scenario: &'a str,
    status: &'a str,
    rows: Option<usize>,
    warnings: usize,
    error: Option<&'a str>,
    database: String,
}

/// Summary of a batch
#[derive(Debug)]
pub struct BatchSummary {
    /// Number of successful builds
    pub success: usize,
    /// Number of failed builds
    pub failure: usize,
    /// Path of the summary CSV file
    pub summary_path: PathBuf,
    /// One record per job, in the order the jobs were given
    pub jobs: Vec<JobRecord>,
}

/// Check that no two jobs write the same database
fn check_unique_names(jobs: &[BuildRequest]) -> Result<()> {
    let mut seen = IndexSet::new();
    for job in jobs {
        ensure!(
            seen.insert(job.database_path()),
            "Duplicate model name {} in batch",
            job.name
        );
    }

    Ok(())
}

/// One unperturbed build per scenario
pub fn scenario_jobs(
    inputs_dir: &Path,
    scenario_dir: &Path,
    scenarios: &[String],
    output_dir: &Path,
) -> Vec<BuildRequest> {
    scenarios
        .iter()
        .map(|scenario| BuildRequest::new(inputs_dir, scenario_dir, scenario, output_dir))
        .collect()
}

/// One build per sensitivity directive, each applying only that directive
pub fn sensitivity_jobs(base: &BuildRequest, directives: &[Directive]) -> Vec<BuildRequest> {
    directives
        .iter()
        .enumerate()
        .map(|(i, directive)| BuildRequest {
            name: format!("{}_{i}", base.name),
            directives: vec![directive.clone()],
            ..base.clone()
        })
        .collect()
}

/// One build per Monte Carlo case
pub fn monte_carlo_jobs(
    base: &BuildRequest,
    rows: &[MonteCarloRow],
    mode: McMode,
) -> Result<Vec<BuildRequest>> {
    (0..case_count(rows))
        .map(|case| {
            Ok(BuildRequest {
                name: format!("{}_MC_{case}", base.name),
                directives: case_directives(rows, case, mode)?,
                ..base.clone()
            })
        })
        .collect()
}

/// Run a single job, recording failure instead of propagating it
fn run_job(job: &BuildRequest) -> JobRecord {
    let (row_count, warnings, error) = match build_model(job) {
        Ok(outcome) => (Some(outcome.row_count), outcome.warnings, None),
        Err(err) => {
            error!("Build of model {} failed: {err:?}", job.name);
            (None, Vec::new(), Some(format!("{err:#}")))
        }
    };

    JobRecord {
        name: job.name.clone(),
        scenario: job.scenario.clone(),
        database: job.database_path(),
        row_count,
        warnings,
        error,
    }
}

/// Write one row per job to the summary file
fn write_summary(file_path: &Path, jobs: &[JobRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    for job in jobs {
        writer.serialize(SummaryRow {
            name: &job.name,
            scenario: &job.scenario,
            status: if job.succeeded() { "ok" } else { "error" },
            rows: job.row_count,
            warnings: job.warnings.len(),
            error: job.error.as_deref(),
            database: job.database.display().to_string(),
        })?;
    }
    writer.flush()?;

    Ok(())
}

/// Run every job on a thread pool and summarise the results.
///
/// A failing job does not stop the others. The summary is written to `batch_summary.csv` in
/// `output_dir`.
///
/// # Arguments
///
/// * `jobs` - The builds to run
/// * `output_dir` - Folder for the summary file
/// * `threads` - Number of worker threads, or zero to use every core
pub fn run_batch(jobs: &[BuildRequest], output_dir: &Path, threads: usize) -> Result<BatchSummary> {
    check_unique_names(jobs)?;
    fs::create_dir_all(output_dir).with_context(|| {
        format!(
            "Failed to create batch output directory {}",
            output_dir.display()
        )
    })?;

    let pool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("Failed to build thread pool for batch")?;
    info!(
        "Running {} builds on {} threads",
        jobs.len(),
        pool.current_num_threads()
    );
    let records: Vec<JobRecord> = pool.install(|| jobs.par_iter().map(run_job).collect());

    let success = records.iter().filter(|record| record.succeeded()).count();
    let failure = records.len() - success;
    if failure > 0 {
        warn!("{failure} of {} builds failed", records.len());
    }

    let summary_path = output_dir.join(SUMMARY_FILE_NAME);
    write_summary(&summary_path, &records)?;
    info!("Batch summary written to {}", summary_path.display());

    Ok(BatchSummary {
        success,
        failure,
        summary_path,
        jobs: records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, demo_inputs_dir, demo_scenario_dir};
    use crate::perturbation::{EntityFamily, Magnitude};
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    fn test_check_unique_names(demo_inputs_dir: PathBuf, demo_scenario_dir: PathBuf) {
        let scenarios = ["A".to_string(), "A".to_string()];
        let jobs = scenario_jobs(
            &demo_inputs_dir,
            &demo_scenario_dir,
            &scenarios,
            Path::new("out"),
        );
        assert_error!(
            check_unique_names(&jobs),
            "Duplicate model name inputs_A in batch"
        );
        assert!(check_unique_names(&jobs[..1]).is_ok());
    }

    #[rstest]
    fn test_sensitivity_jobs(demo_inputs_dir: PathBuf, demo_scenario_dir: PathBuf) {
        let base = BuildRequest::new(&demo_inputs_dir, &demo_scenario_dir, "A", Path::new("out"));
        let directives = vec![
            Directive::baseline(),
            Directive {
                family: EntityFamily::Globals,
                variable: "DiscountRate".into(),
                tech: "global".into(),
                magnitude: Magnitude::Multiplier(10.0),
            },
        ];
        let jobs = sensitivity_jobs(&base, &directives);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].name, "inputs_A_1");
        assert_eq!(jobs[1].directives, directives[1..]);
        assert!(check_unique_names(&jobs).is_ok());
    }

    #[rstest]
    fn test_monte_carlo_jobs(demo_inputs_dir: PathBuf, demo_scenario_dir: PathBuf) {
        let base = BuildRequest::new(&demo_inputs_dir, &demo_scenario_dir, "A", Path::new("out"));
        let rows = vec![MonteCarloRow {
            family: EntityFamily::Globals,
            variable: "DiscountRate".into(),
            tech: "global".into(),
            draws: vec![1.0, -1.0, 0.5],
        }];
        let jobs = monte_carlo_jobs(&base, &rows, McMode::Perturbations).unwrap();
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[2].name, "inputs_A_MC_2");
        assert_eq!(jobs[2].directives[0].magnitude, Magnitude::Multiplier(0.5));
    }

    #[rstest]
    fn test_run_batch(demo_inputs_dir: PathBuf, demo_scenario_dir: PathBuf) {
        let dir = tempdir().unwrap();
        let mut jobs = scenario_jobs(
            &demo_inputs_dir,
            &demo_scenario_dir,
            &["A".to_string(), "B".to_string()],
            dir.path(),
        );
        jobs.push(BuildRequest::new(
            &demo_inputs_dir,
            &demo_scenario_dir,
            "missing",
            dir.path(),
        ));

        let summary = run_batch(&jobs, dir.path(), 2).unwrap();
        assert_eq!(summary.success, 2);
        assert_eq!(summary.failure, 1);
        assert!(summary.jobs[0].database.is_file());
        assert!(summary.jobs[2].error.is_some());
        assert!(summary.summary_path.is_file());
    }
}
