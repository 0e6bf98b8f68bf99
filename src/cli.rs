//! The command line interface for the planner.
use crate::input::load_system;
use crate::log;
use crate::optimisation::assemble;
use crate::output::{create_output_directory, write_model_dump, write_results};
use crate::settings::Settings;
use ::log::info;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use include_dir::{include_dir, Dir};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The directory containing the bundled demo models.
pub const DEMOS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/demos");

/// The command line interface for the planner.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Commands,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run a planning model.
    Run {
        /// Path to the model directory (containing an `inputs` folder).
        model_dir: PathBuf,
        /// Whether to write a human-readable model dump alongside the results
        #[arg(long)]
        debug_model: bool,
    },
    /// Manage demo models.
    Demo {
        /// The available subcommands for managing demo models.
        #[command(subcommand)]
        subcommand: DemoSubcommands,
    },
}

/// The available subcommands for managing demo models.
#[derive(Subcommand)]
pub enum DemoSubcommands {
    /// List available demos.
    List,
    /// Run a demo.
    Run {
        /// The name of the demo to run.
        name: String,
    },
}

/// Parse CLI arguments and execute the selected command.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            model_dir,
            debug_model,
        } => handle_run_command(&model_dir, debug_model),
        Commands::Demo { subcommand } => match subcommand {
            DemoSubcommands::List => handle_demo_list_command(),
            DemoSubcommands::Run { name } => handle_demo_run_command(&name),
        },
    }
}

/// Handle the `run` command.
///
/// # Arguments
///
/// * `model_path` - Path to the model directory
/// * `debug_model` - Overrides the `debug_model` setting when true
pub fn handle_run_command(model_path: &Path, debug_model: bool) -> Result<()> {
    let mut settings = Settings::from_path(model_path).context("Failed to load settings.")?;

    // This setting can be overridden by command-line argument
    if debug_model {
        settings.global.debug_model = true;
    }

    // Initialise program logger
    log::init(settings.global.log_level.as_deref()).context("Failed to initialise logging.")?;

    let output_path =
        create_output_directory(model_path).context("Failed to create output directory.")?;

    // Load the system to plan for
    let system =
        load_system(model_path.join("inputs")).context("Failed to load system data.")?;
    info!("Loaded system from {}", model_path.display());
    info!("Output data will be written to {}", output_path.display());

    let plan = assemble(&system, &settings.formulation);
    info!(
        "Assembled problem with {} variables and {} constraints",
        plan.num_variables(),
        plan.num_constraints()
    );

    if settings.global.debug_model {
        write_model_dump(&plan, &output_path)?;
    }

    // A failed solve writes no result files; the termination status is surfaced as-is
    match plan.solve() {
        Ok(solution) => {
            let costs = solution.cost_breakdown();
            info!("Total cost: {}", costs.total);
            write_results(&solution, &output_path).context("Failed to write results.")?;
            Ok(())
        }
        Err(status) => bail!("Could not solve: {status:?}"),
    }
}

/// Handle the `demo run` command.
pub fn handle_demo_run_command(name: &str) -> Result<()> {
    // Find the subdirectory in DEMOS_DIR whose name matches `name`
    let sub_dir = DEMOS_DIR.get_dir(name).context("Demo not found.")?;

    // Extract the demo into a temporary directory so outputs don't land in the installation
    let temp_dir = TempDir::new().context("Failed to create temporary directory.")?;
    let temp_path = temp_dir.path().join(name);
    fs::create_dir(&temp_path)?;
    sub_dir
        .extract(temp_dir.path())
        .context("Failed to extract demo files.")?;

    handle_run_command(&temp_path, false)
}

/// Handle the `demo list` command.
pub fn handle_demo_list_command() -> Result<()> {
    for entry in DEMOS_DIR.dirs() {
        println!("{}", entry.path().display());
    }
    Ok(())
}
