//! Code related to the bundled demo models and the CLI commands for interacting with them.
use super::{BuildOpts, handle_build_command};
use crate::settings::Settings;
use anyhow::{Context, Result, ensure};
use clap::Subcommand;
use include_dir::{Dir, DirEntry, include_dir};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The directory containing the demo models.
const DEMOS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/demos");

/// Folder within a demo holding the input tables
const INPUTS_DIR_NAME: &str = "inputs";

/// Folder within a demo holding the scenario definitions
const SCENARIOS_DIR_NAME: &str = "scenarios";

/// The available subcommands for managing example models.
#[derive(Subcommand)]
pub enum ExampleSubcommands {
    /// List available examples.
    List,
    /// Provide information about the specified example.
    Info {
        /// The name of the example.
        name: String,
    },
    /// Extract an example model configuration to a new directory.
    Extract {
        /// The name of the example to extract.
        name: String,
        /// The destination folder for the example.
        new_path: Option<PathBuf>,
    },
    /// Build a database for one scenario of an example.
    Build {
        /// The name of the example to build.
        name: String,
        /// The scenario to build.
        #[arg(short, long, default_value = "A")]
        scenario: String,
        /// Directory for output files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

impl ExampleSubcommands {
    /// Execute the supplied example subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::List => handle_example_list_command(),
            Self::Info { name } => handle_example_info_command(&name)?,
            Self::Extract {
                name,
                new_path: dest,
            } => handle_example_extract_command(&name, dest.as_deref())?,
            Self::Build {
                name,
                scenario,
                output_dir,
            } => handle_example_build_command(&name, &scenario, output_dir, None)?,
        }

        Ok(())
    }
}

/// Handle the `example list` command.
fn handle_example_list_command() {
    for entry in DEMOS_DIR.dirs() {
        println!("{}", entry.path().display());
    }
}

/// Handle the `example info` command.
fn handle_example_info_command(name: &str) -> Result<()> {
    let path: PathBuf = [name, "README.txt"].iter().collect();
    let readme = DEMOS_DIR
        .get_file(path)
        .context("Example not found.")?
        .contents_utf8()
        .context("README.txt is not UTF-8 encoded")?;

    println!("{readme}");

    Ok(())
}

/// Handle the `example extract` command
fn handle_example_extract_command(name: &str, dest: Option<&Path>) -> Result<()> {
    let dest = dest.unwrap_or(Path::new(name));
    extract_example(name, dest)
}

/// Copy the contents of an embedded directory, including subdirectories, into `new_path`
fn copy_dir(dir: &Dir, root: &Path, new_path: &Path) -> Result<()> {
    for entry in dir.entries() {
        let relative = entry
            .path()
            .strip_prefix(root)
            .context("Embedded file outside example folder")?;
        let dest = new_path.join(relative);
        match entry {
            DirEntry::Dir(sub_dir) => {
                fs::create_dir(&dest)?;
                copy_dir(sub_dir, root, new_path)?;
            }
            DirEntry::File(f) => fs::write(&dest, f.contents())?,
        }
    }

    Ok(())
}

/// Extract the specified example to a new directory
pub fn extract_example(name: &str, new_path: &Path) -> Result<()> {
    // Find the subdirectory in DEMOS_DIR whose name matches `name`.
    let sub_dir = DEMOS_DIR.get_dir(name).context("Example not found.")?;

    ensure!(
        !new_path.exists(),
        "Destination directory {} already exists",
        new_path.display()
    );

    fs::create_dir(new_path)?;
    copy_dir(sub_dir, sub_dir.path(), new_path)
}

/// Handle the `example build` command.
pub fn handle_example_build_command(
    name: &str,
    scenario: &str,
    output_dir: Option<PathBuf>,
    settings: Option<Settings>,
) -> Result<()> {
    let temp_dir = TempDir::new().context("Failed to create temporary directory.")?;
    let model_path = temp_dir.path().join(name);
    extract_example(name, &model_path)?;

    let opts = BuildOpts {
        name: Some(format!("{name}_{scenario}")),
        output_dir,
        ..BuildOpts::default()
    };
    handle_build_command(
        &model_path.join(INPUTS_DIR_NAME),
        &model_path.join(SCENARIOS_DIR_NAME),
        scenario,
        &opts,
        settings,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use tempfile::tempdir;

    #[test]
    fn test_extract_example() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("simple");
        extract_example("simple", &dest).unwrap();
        assert!(dest.join("README.txt").is_file());
        assert!(dest.join(INPUTS_DIR_NAME).join("Demand.csv").is_file());
        assert!(dest.join(SCENARIOS_DIR_NAME).join("SolverSettings.csv").is_file());

        assert_error!(
            extract_example("simple", &dest),
            format!("Destination directory {} already exists", dest.display())
        );
    }

    #[test]
    fn test_extract_unknown_example() {
        let dir = tempdir().unwrap();
        assert_error!(
            extract_example("complicated", &dir.path().join("complicated")),
            "Example not found."
        );
    }
}
