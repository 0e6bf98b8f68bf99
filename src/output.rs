//! The module responsible for writing output data to disk.
//!
//! Result files are written only once the solver has reported success; a failed solve produces
//! no output CSVs.
use crate::optimisation::{AssembledPlan, PlanSolution};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// The subfolder of the model directory in which result files are written
const OUTPUT_DIRECTORY_NAME: &str = "outputs";

/// The file name for the optional human-readable model dump
pub const MODEL_DUMP_FILE_NAME: &str = "model.txt";

/// Create the output directory for the model specified at `model_dir`.
pub fn create_output_directory(model_dir: &Path) -> Result<PathBuf> {
    let path = model_dir.join(OUTPUT_DIRECTORY_NAME);
    fs::create_dir_all(&path)
        .with_context(|| format!("Could not create output directory {}", path.display()))?;

    Ok(path)
}

#[derive(Serialize)]
struct GenCapacityRow {
    gen_name: String,
    #[serde(rename = "GenCapacity")]
    capacity: f64,
}

#[derive(Serialize)]
struct GenDispatchRow {
    gen_name: String,
    timepoint: String,
    dispatch: f64,
}

#[derive(Serialize)]
struct VarGenCapacityRow {
    gen_name: String,
    scenario: String,
    #[serde(rename = "GenCapacity")]
    capacity: f64,
}

#[derive(Serialize)]
struct VarGenDispatchRow {
    gen_name: String,
    scenario: String,
    timepoint: String,
    dispatch: f64,
}

#[derive(Serialize)]
struct StorageCapacityRow {
    storage_name: String,
    #[serde(rename = "PowerCapacity")]
    power_capacity: f64,
    #[serde(rename = "EnergyCapacity")]
    energy_capacity: f64,
}

#[derive(Serialize)]
struct StorageDispatchRow {
    storage_name: String,
    scenario: String,
    timepoint: String,
    charge: f64,
    discharge: f64,
    state_of_energy: f64,
}

#[derive(Serialize)]
struct CostRow {
    component: String,
    cost: f64,
}

/// Serialise rows into a CSV file at the given path.
fn write_csv_rows<T: Serialize>(file_path: &Path, rows: impl Iterator<Item = T>) -> Result<()> {
    let mut writer = csv::Writer::from_path(file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Write all result CSVs for a solved plan.
///
/// # Arguments
///
/// * `solution` - The solved plan
/// * `output_path` - The directory result files are written into
pub fn write_results(solution: &PlanSolution, output_path: &Path) -> Result<()> {
    let system = solution.system();
    let scenario_names: Vec<String> = system.scenarios.keys().map(|s| s.to_string()).collect();
    let timepoint_names: Vec<String> =
        system.timepoints.iter().map(|t| t.name.to_string()).collect();
    // Shadow as shared references so the row-building closures can copy them freely
    let scenario_names = &scenario_names;
    let timepoint_names = &timepoint_names;

    write_csv_rows(
        &output_path.join("gen_cap.csv"),
        solution.iter_dispatchable_names().map(|name| GenCapacityRow {
            gen_name: name.to_string(),
            capacity: solution.generator_capacity(name),
        }),
    )?;

    write_csv_rows(
        &output_path.join("gen_dispatch.csv"),
        solution.iter_dispatchable_names().flat_map(|name| {
            timepoint_names
                .iter()
                .enumerate()
                .map(move |(t, timepoint)| GenDispatchRow {
                    gen_name: name.to_string(),
                    timepoint: timepoint.clone(),
                    dispatch: solution.generator_dispatch(name, t),
                })
        }),
    )?;

    write_csv_rows(
        &output_path.join("var_gen_cap.csv"),
        solution.iter_variable_names().flat_map(|name| {
            scenario_names
                .iter()
                .enumerate()
                .map(move |(s, scenario)| VarGenCapacityRow {
                    gen_name: name.to_string(),
                    scenario: scenario.clone(),
                    capacity: solution.scenario_capacity(name, s),
                })
        }),
    )?;

    write_csv_rows(
        &output_path.join("var_gen_dispatch.csv"),
        solution.iter_variable_names().flat_map(|name| {
            scenario_names.iter().enumerate().flat_map(move |(s, scenario)| {
                timepoint_names
                    .iter()
                    .enumerate()
                    .map(move |(t, timepoint)| VarGenDispatchRow {
                        gen_name: name.to_string(),
                        scenario: scenario.clone(),
                        timepoint: timepoint.clone(),
                        dispatch: solution.scenario_dispatch(name, s, t),
                    })
            })
        }),
    )?;

    write_csv_rows(
        &output_path.join("storage_cap.csv"),
        system.storage_units.iter().map(|(name, unit)| {
            let power_capacity = solution.storage_power_capacity(name);
            StorageCapacityRow {
                storage_name: name.to_string(),
                power_capacity,
                energy_capacity: unit.duration * power_capacity,
            }
        }),
    )?;

    write_csv_rows(
        &output_path.join("storage_dispatch.csv"),
        system.storage_units.keys().flat_map(|name| {
            scenario_names.iter().enumerate().flat_map(move |(s, scenario)| {
                timepoint_names
                    .iter()
                    .enumerate()
                    .map(move |(t, timepoint)| StorageDispatchRow {
                        storage_name: name.to_string(),
                        scenario: scenario.clone(),
                        timepoint: timepoint.clone(),
                        charge: solution.storage_charge(name, s, t),
                        discharge: solution.storage_discharge(name, s, t),
                        state_of_energy: solution.storage_state_of_energy(name, s, t),
                    })
            })
        }),
    )?;

    write_cost_rows(
        &output_path.join("costs_itemized.csv"),
        solution.cost_breakdown(),
    )?;
    write_cost_rows(
        &output_path.join("gen_costs_itemized.csv"),
        solution.generator_cost_breakdown(),
    )?;

    Ok(())
}

fn write_cost_rows(file_path: &Path, breakdown: crate::optimisation::CostBreakdown) -> Result<()> {
    write_csv_rows(
        file_path,
        [
            CostRow {
                component: "CostPerTimepoint".to_string(),
                cost: breakdown.per_timepoint,
            },
            CostRow {
                component: "CostPerPeriod".to_string(),
                cost: breakdown.per_period,
            },
            CostRow {
                component: "TotalCost".to_string(),
                cost: breakdown.total,
            },
        ]
        .into_iter(),
    )
}

/// Write a human-readable dump of the assembled model, for debugging.
pub fn write_model_dump(plan: &AssembledPlan, output_path: &Path) -> Result<()> {
    let file_path = output_path.join(MODEL_DUMP_FILE_NAME);
    let mut writer = BufWriter::new(
        File::create(&file_path)
            .with_context(|| format!("Could not create {}", file_path.display()))?,
    );
    plan.dump_model(&mut writer)?;

    Ok(())
}
