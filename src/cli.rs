//! The command line interface for building models.
use crate::batch::{monte_carlo_jobs, run_batch, scenario_jobs, sensitivity_jobs};
use crate::cases::{McMode, case_directives, read_monte_carlo_cases};
use crate::log;
use crate::perturbation::read_directives;
use crate::pipeline::{BuildRequest, build_model};
use crate::settings::Settings;
use ::log::{info, warn};
use anyhow::{Context, Result, ensure};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

pub mod cases;
pub mod example;
use cases::CasesSubcommands;
use example::ExampleSubcommands;

/// The command line interface for building models.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Perturbations to apply to a build
#[derive(Args, Default)]
pub struct PerturbationOpts {
    /// CSV file of sensitivity directives
    #[arg(long, conflicts_with = "monte_carlo")]
    pub sensitivity: Option<PathBuf>,
    /// CSV file of Monte Carlo cases
    #[arg(long)]
    pub monte_carlo: Option<PathBuf>,
    /// How Monte Carlo draws are applied
    #[arg(long, value_enum, default_value_t)]
    pub mc_mode: McMode,
}

/// Options for the build command
#[derive(Args, Default)]
pub struct BuildOpts {
    /// Name of the model (defaults to the inputs folder name followed by the scenario)
    #[arg(short, long)]
    pub name: Option<String>,
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Database to copy the schema from
    #[arg(long)]
    pub template: Option<PathBuf>,
    /// The Monte Carlo case to build
    #[arg(long, default_value_t = 0)]
    pub case: usize,
    /// Perturbations to apply
    #[command(flatten)]
    pub perturbations: PerturbationOpts,
}

/// Options for the batch command
#[derive(Args, Default)]
pub struct BatchOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Number of worker threads (zero uses every core)
    #[arg(short, long)]
    pub threads: Option<usize>,
    /// Database to copy the schema from
    #[arg(long)]
    pub template: Option<PathBuf>,
    /// Perturbations to apply, one build per directive or case
    #[command(flatten)]
    pub perturbations: PerturbationOpts,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Build a model database for one scenario.
    Build {
        /// Path to the folder of input tables.
        inputs_dir: PathBuf,
        /// Path to the folder of scenario definitions.
        scenario_dir: PathBuf,
        /// Name of the scenario to build.
        scenario: String,
        /// Other build options
        #[command(flatten)]
        opts: BuildOpts,
    },
    /// Build model databases for several scenarios in parallel.
    Batch {
        /// Path to the folder of input tables.
        inputs_dir: PathBuf,
        /// Path to the folder of scenario definitions.
        scenario_dir: PathBuf,
        /// Names of the scenarios to build.
        #[arg(required = true)]
        scenarios: Vec<String>,
        /// Other batch options
        #[command(flatten)]
        opts: BatchOpts,
    },
    /// Generate sensitivity or Monte Carlo cases.
    Cases {
        /// The kind of cases to generate.
        #[command(subcommand)]
        subcommand: CasesSubcommands,
    },
    /// Manage example models.
    Example {
        /// The available subcommands for managing example models.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Build {
                inputs_dir,
                scenario_dir,
                scenario,
                opts,
            } => handle_build_command(&inputs_dir, &scenario_dir, &scenario, &opts, None),
            Self::Batch {
                inputs_dir,
                scenario_dir,
                scenarios,
                opts,
            } => handle_batch_command(&inputs_dir, &scenario_dir, &scenarios, &opts, None),
            Self::Cases { subcommand } => subcommand.execute(),
            Self::Example { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start temoatools
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ temoatools --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load settings, create the output folder and start the logger
fn prepare_output(
    output_dir: Option<&Path>,
    settings: Option<Settings>,
) -> Result<(Settings, PathBuf)> {
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    let output_dir = output_dir.map_or_else(|| settings.output_dir.clone(), Path::to_path_buf);
    fs::create_dir_all(&output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_dir.display()
        )
    })?;

    log::init(Some(&settings.log_level), Some(&output_dir))
        .context("Failed to initialise logging.")?;

    Ok((settings, output_dir))
}

/// Handle the `build` command.
pub fn handle_build_command(
    inputs_dir: &Path,
    scenario_dir: &Path,
    scenario: &str,
    opts: &BuildOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let (settings, output_dir) = prepare_output(opts.output_dir.as_deref(), settings)?;

    let mut request = BuildRequest::new(inputs_dir, scenario_dir, scenario, &output_dir);
    if let Some(name) = &opts.name {
        request.name.clone_from(name);
    }
    request.template.clone_from(&opts.template);
    request.overwrite = settings.overwrite;

    let perturbations = &opts.perturbations;
    if let Some(file_path) = &perturbations.sensitivity {
        request.directives = read_directives(file_path)?;
    } else if let Some(file_path) = &perturbations.monte_carlo {
        let rows = read_monte_carlo_cases(file_path)?;
        request.directives = case_directives(&rows, opts.case, perturbations.mc_mode)?;
    }

    let outcome = build_model(&request).context("Failed to build model.")?;
    if !outcome.warnings.is_empty() {
        warn!(
            "{} tables could not be written to {}",
            outcome.warnings.len(),
            outcome.database.display()
        );
    }
    info!(
        "Model written to {} ({} rows)",
        outcome.database.display(),
        outcome.row_count
    );

    Ok(())
}

/// Handle the `batch` command.
pub fn handle_batch_command(
    inputs_dir: &Path,
    scenario_dir: &Path,
    scenarios: &[String],
    opts: &BatchOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let (settings, output_dir) = prepare_output(opts.output_dir.as_deref(), settings)?;

    let perturbations = &opts.perturbations;
    let directives = perturbations
        .sensitivity
        .as_deref()
        .map(read_directives)
        .transpose()?;
    let cases = perturbations
        .monte_carlo
        .as_deref()
        .map(read_monte_carlo_cases)
        .transpose()?;

    let mut jobs = Vec::new();
    for mut base in scenario_jobs(inputs_dir, scenario_dir, scenarios, &output_dir) {
        base.template.clone_from(&opts.template);
        base.overwrite = settings.overwrite;

        if let Some(directives) = &directives {
            jobs.extend(sensitivity_jobs(&base, directives));
        } else if let Some(rows) = &cases {
            jobs.extend(monte_carlo_jobs(&base, rows, perturbations.mc_mode)?);
        } else {
            jobs.push(base);
        }
    }

    let threads = opts.threads.unwrap_or(settings.threads);
    let summary = run_batch(&jobs, &output_dir, threads)?;
    info!(
        "Batch complete: {} succeeded, {} failed",
        summary.success, summary.failure
    );
    ensure!(
        summary.failure == 0,
        "{} builds failed, see {}",
        summary.failure,
        summary.summary_path.display()
    );

    Ok(())
}
