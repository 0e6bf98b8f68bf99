//! Code for reading capacity factor profiles from an input file.
//!
//! Presence in this file is what makes a generator a second-stage (variable) one, so coverage is
//! validated strictly: a generator with any entry must have one for every (scenario, timepoint)
//! combination.
use super::*;
use crate::system::{Generator, Scenario};
use anyhow::{ensure, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

const CAPACITY_FACTORS_FILE_NAME: &str = "capacity_factors.csv";

/// A capacity factor record retrieved from a CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct CapacityFactorRaw {
    generator_name: String,
    scenario_name: String,
    timepoint_name: String,
    #[serde(deserialize_with = "deserialise_proportion")]
    capacity_factor: f64,
}

/// Read capacity factors from the capacity factors CSV file.
///
/// The file may contain no data rows (a system without variable generators).
///
/// # Arguments
///
/// * `inputs_dir` - Folder containing the input CSV files
/// * `generators` - Generators for key resolution
/// * `scenarios` - Scenarios for key resolution
/// * `timepoint_index` - Timepoint name to index lookup
/// * `n_timepoints` - The number of timepoints
///
/// # Returns
///
/// For each generator with entries, a dense (scenario, timepoint) profile.
pub fn read_capacity_factors(
    inputs_dir: &Path,
    generators: &IndexMap<Rc<str>, Generator>,
    scenarios: &IndexMap<Rc<str>, Scenario>,
    timepoint_index: &HashMap<Rc<str>, usize>,
    n_timepoints: usize,
) -> Result<HashMap<Rc<str>, Vec<f64>>> {
    let file_path = inputs_dir.join(CAPACITY_FACTORS_FILE_NAME);
    let iter = read_csv_optional(&file_path)?;
    read_capacity_factors_from_iter(iter, generators, scenarios, timepoint_index, n_timepoints)
        .with_context(|| input_err_msg(file_path))
}

fn read_capacity_factors_from_iter<I>(
    iter: I,
    generators: &IndexMap<Rc<str>, Generator>,
    scenarios: &IndexMap<Rc<str>, Scenario>,
    timepoint_index: &HashMap<Rc<str>, usize>,
    n_timepoints: usize,
) -> Result<HashMap<Rc<str>, Vec<f64>>>
where
    I: Iterator<Item = CapacityFactorRaw>,
{
    let n_scenarios = scenarios.len();
    let mut partial: HashMap<Rc<str>, Vec<Option<f64>>> = HashMap::new();
    for raw in iter {
        let (name, _) = generators
            .get_key_value(raw.generator_name.as_str())
            .with_context(|| format!("Unknown generator {} found", raw.generator_name))?;
        let scenario = scenarios.index_of_id(&raw.scenario_name)?;
        let timepoint = *timepoint_index.get(raw.timepoint_name.as_str()).with_context(|| {
            format!("Unknown timepoint {} found", raw.timepoint_name)
        })?;

        let profile = partial
            .entry(Rc::clone(name))
            .or_insert_with(|| vec![None; n_scenarios * n_timepoints]);
        let slot = &mut profile[scenario * n_timepoints + timepoint];
        ensure!(
            slot.replace(raw.capacity_factor).is_none(),
            "Duplicate capacity factor entry for ({}, {}, {})",
            raw.generator_name,
            raw.scenario_name,
            raw.timepoint_name
        );
    }

    // A variable generator must cover every (scenario, timepoint) combination
    let mut profiles = HashMap::with_capacity(partial.len());
    for (name, profile) in partial {
        let complete: Option<Vec<f64>> = profile.into_iter().collect();
        let complete = complete.with_context(|| {
            format!(
                "Generator {name} has capacity factor entries but does not cover every \
                 (scenario, timepoint) combination"
            )
        })?;
        profiles.insert(name, complete);
    }

    Ok(profiles)
}
