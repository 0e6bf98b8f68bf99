//! Common routines for handling input data.
use crate::id::IDCollection;
use crate::system::{Stage, System};
use anyhow::{bail, Context, Result};
use float_cmp::approx_eq;
use itertools::Itertools;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

mod bus;
use bus::read_buses;
mod capacity_factor;
use capacity_factor::read_capacity_factors;
mod generator;
use generator::read_generators;
mod line;
use line::read_lines;
mod load;
use load::read_loads;
mod policy;
use policy::read_policy;
mod scenario;
use scenario::read_scenarios;
mod storage;
use storage::read_storage_units;
mod time;
use time::read_timescale;

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + std::fmt::Debug + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + std::fmt::Debug + 'a> {
    let vec = _read_csv_internal(file_path)?;
    if vec.is_empty() {
        bail!("CSV file {} cannot be empty", file_path.display());
    }
    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file, which may contain no data rows.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv_optional<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = _read_csv_internal(file_path)?;
    Ok(vec.into_iter())
}

fn _read_csv_internal<'a, T: DeserializeOwned + 'a>(file_path: &'a Path) -> Result<Vec<T>> {
    let vec = csv::Reader::from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Read a float, checking that it is between 0 and 1 inclusive
pub fn deserialise_proportion<'de, D>(deserialiser: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        Err(serde::de::Error::custom("Value must be between 0 and 1"))?
    }

    Ok(value)
}

/// Read a float, checking that it is greater than 0 and at most 1
pub fn deserialise_proportion_nonzero<'de, D>(deserialiser: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserialiser)?;
    if !(value > 0.0 && value <= 1.0) {
        Err(serde::de::Error::custom("Value must be > 0 and <= 1"))?
    }

    Ok(value)
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Check that values sum to (approximately) one
fn check_values_sum_to_one_approx<I>(values: I) -> Result<()>
where
    I: Iterator<Item = f64>,
{
    let sum = values.sum();
    anyhow::ensure!(
        approx_eq!(f64, sum, 1.0, epsilon = 1e-6),
        "Sum of values does not equal one (actual: {sum})"
    );

    Ok(())
}

/// Read a system from the specified inputs directory.
///
/// All input files must be present; validation failures abort before model construction.
///
/// # Arguments
///
/// * `inputs_dir` - Folder containing the input CSV files
///
/// # Returns
///
/// The static system data ([`System`]) or an error.
pub fn load_system<P: AsRef<Path>>(inputs_dir: P) -> Result<System> {
    let dir = inputs_dir.as_ref();

    let (buses, slack_bus) = read_buses(dir)?;
    let lines = read_lines(dir, &buses)?;
    let scenarios = read_scenarios(dir)?;
    let (timeseries, timepoints) = read_timescale(dir)?;

    // Timepoints are referenced by name in the load and capacity factor files
    let timepoint_index: HashMap<Rc<str>, usize> = timepoints
        .iter()
        .enumerate()
        .map(|(idx, timepoint)| (Rc::clone(&timepoint.name), idx))
        .collect();

    let mut generators = read_generators(dir, &buses)?;
    let storage_units = read_storage_units(dir, &buses)?;

    let capacity_factors = read_capacity_factors(
        dir,
        &generators,
        &scenarios,
        &timepoint_index,
        timepoints.len(),
    )?;

    // A generator is second-stage (variable) precisely when it has a capacity factor profile
    for (name, generator) in generators.iter_mut() {
        if capacity_factors.contains_key(name) {
            generator.stage = Stage::Variable;
        }
    }

    let loads = read_loads(dir, &buses, &scenarios, &timepoint_index, timepoints.len())?;
    let policy = read_policy(dir)?;

    Ok(System {
        buses,
        slack_bus,
        lines,
        generators,
        storage_units,
        scenarios,
        timeseries,
        timepoints,
        loads,
        capacity_factors,
        policy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Record {
        id: String,
        value: u32,
    }

    /// Create an example CSV file in dir_path
    fn create_csv_file(dir_path: &Path, contents: &str) -> PathBuf {
        let file_path = dir_path.join("test.csv");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
        file_path
    }

    /// Test a normal read
    #[test]
    fn test_read_csv() {
        let dir = tempdir().unwrap();
        let file_path = create_csv_file(dir.path(), "id,value\nhello,1\nworld,2\n");
        let records: Vec<Record> = read_csv(&file_path).unwrap().collect();
        assert_eq!(
            records,
            &[
                Record {
                    id: "hello".to_string(),
                    value: 1,
                },
                Record {
                    id: "world".to_string(),
                    value: 2,
                }
            ]
        );

        // File with no data (only column headers)
        let file_path = create_csv_file(dir.path(), "id,value\n");
        assert!(read_csv::<Record>(&file_path).is_err());
        assert!(read_csv_optional::<Record>(&file_path)
            .unwrap()
            .next()
            .is_none());

        // Missing file: the error must name it
        let missing = dir.path().join("nonexistent.csv");
        let err = read_csv::<Record>(&missing).unwrap_err();
        assert!(format!("{err}").contains("nonexistent.csv"));
    }

    #[test]
    fn test_check_values_sum_to_one_approx() {
        // Valid
        assert!(check_values_sum_to_one_approx([1.0].into_iter()).is_ok());
        assert!(check_values_sum_to_one_approx([0.4, 0.6].into_iter()).is_ok());

        // Invalid
        assert!(check_values_sum_to_one_approx([0.5].into_iter()).is_err());
        assert!(check_values_sum_to_one_approx([0.4, 0.3].into_iter()).is_err());

        // Edge cases
        assert!(check_values_sum_to_one_approx([f64::INFINITY].into_iter()).is_err());
        assert!(check_values_sum_to_one_approx([f64::NAN].into_iter()).is_err());
    }

    #[test]
    fn test_load_system() {
        let system = load_system(crate::fixture::demo_inputs_dir()).unwrap();
        assert_eq!(system.n_buses(), 2);
        assert_eq!(system.n_scenarios(), 2);
        assert_eq!(system.n_timepoints(), 4);
        assert_eq!(system.lines.len(), 1);
        assert_eq!(system.generators.len(), 2);
        assert_eq!(system.storage_units.len(), 1);
    }
}
