//! CLI commands for generating sensitivity and Monte Carlo cases.
use crate::cases::{
    monte_carlo_cases, read_variable_selection, sensitivity_cases, write_monte_carlo_cases,
    write_sensitivity_cases,
};
use crate::scenario::read_scenario;
use anyhow::{Result, ensure};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

/// Arguments shared by both kinds of case generation
#[derive(Args)]
pub struct CaseArgs {
    /// Path to the folder of scenario definitions.
    pub scenario_dir: PathBuf,
    /// Name of the scenario whose entities are varied.
    pub scenario: String,
    /// Path to the folder listing which variables to vary.
    pub variables_dir: PathBuf,
    /// Size of the variation, in percent.
    pub multiplier: f64,
    /// Path of the CSV file to write.
    pub output: PathBuf,
}

/// The kinds of cases which can be generated.
#[derive(Subcommand)]
pub enum CasesSubcommands {
    /// Vary one value at a time down and up by the multiplier.
    Sensitivity {
        /// Arguments shared by every kind of case.
        #[command(flatten)]
        args: CaseArgs,
    },
    /// Vary every value at once with random draws.
    MonteCarlo {
        /// Arguments shared by every kind of case.
        #[command(flatten)]
        args: CaseArgs,
        /// Number of cases to draw.
        #[arg(long, default_value_t = 100)]
        cases: usize,
        /// Seed for reproducible draws.
        #[arg(long)]
        seed: Option<u64>,
    },
}

impl CasesSubcommands {
    /// Execute the supplied cases subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::Sensitivity { args } => handle_sensitivity_command(&args),
            Self::MonteCarlo { args, cases, seed } => {
                handle_monte_carlo_command(&args, cases, seed)
            }
        }
    }
}

/// Check the output can be written and that the multiplier makes sense
fn check_case_args(args: &CaseArgs) -> Result<()> {
    ensure!(
        args.multiplier.is_finite() && args.multiplier >= 0.0,
        "Multiplier must be a non-negative number"
    );
    let parent = args.output.parent().unwrap_or(Path::new("."));
    ensure!(
        parent.as_os_str().is_empty() || parent.is_dir(),
        "Output folder {} does not exist",
        parent.display()
    );

    Ok(())
}

/// Handle the `cases sensitivity` command.
pub fn handle_sensitivity_command(args: &CaseArgs) -> Result<()> {
    check_case_args(args)?;
    let scenario = read_scenario(&args.scenario_dir, &args.scenario)?;
    let selection = read_variable_selection(&args.variables_dir)?;
    let directives = sensitivity_cases(&scenario, &selection, args.multiplier);
    write_sensitivity_cases(&args.output, &directives)?;
    println!(
        "Wrote {} sensitivity cases to {}",
        directives.len(),
        args.output.display()
    );

    Ok(())
}

/// Handle the `cases monte-carlo` command.
pub fn handle_monte_carlo_command(args: &CaseArgs, cases: usize, seed: Option<u64>) -> Result<()> {
    check_case_args(args)?;
    ensure!(cases > 0, "At least one case is required");
    let scenario = read_scenario(&args.scenario_dir, &args.scenario)?;
    let selection = read_variable_selection(&args.variables_dir)?;
    let rows = monte_carlo_cases(&scenario, &selection, args.multiplier, cases, seed);
    write_monte_carlo_cases(&args.output, &rows)?;
    println!(
        "Wrote {cases} Monte Carlo cases for {} variables to {}",
        rows.len(),
        args.output.display()
    );

    Ok(())
}
