//! Code for reading scenarios from an input file.
use super::*;
use crate::system::Scenario;
use anyhow::{ensure, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

const SCENARIOS_FILE_NAME: &str = "scenarios.csv";

/// A scenario record retrieved from a CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct ScenarioRaw {
    name: String,
    #[serde(deserialize_with = "deserialise_proportion")]
    probability: f64,
}

/// Read scenarios from the scenarios CSV file.
///
/// # Arguments
///
/// * `inputs_dir` - Folder containing the input CSV files
///
/// # Returns
///
/// The scenarios keyed by name (iteration order gives the scenario index). Probabilities must
/// sum to one.
pub fn read_scenarios(inputs_dir: &Path) -> Result<IndexMap<Rc<str>, Scenario>> {
    let file_path = inputs_dir.join(SCENARIOS_FILE_NAME);
    let iter = read_csv(&file_path)?;
    read_scenarios_from_iter(iter).with_context(|| input_err_msg(file_path))
}

fn read_scenarios_from_iter<I>(iter: I) -> Result<IndexMap<Rc<str>, Scenario>>
where
    I: Iterator<Item = ScenarioRaw>,
{
    let mut scenarios = IndexMap::new();
    for raw in iter {
        let name: Rc<str> = Rc::from(raw.name.as_str());
        let scenario = Scenario {
            name: Rc::clone(&name),
            probability: raw.probability,
        };
        ensure!(
            scenarios.insert(name, scenario).is_none(),
            "Duplicate scenario name found: {}",
            raw.name
        );
    }

    check_values_sum_to_one_approx(scenarios.values().map(|s| s.probability))
        .context("Invalid scenario probabilities")?;

    Ok(scenarios)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn create_scenarios_file(dir_path: &Path, contents: &str) {
        let file_path = dir_path.join(SCENARIOS_FILE_NAME);
        let mut file = File::create(file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
    }

    #[test]
    fn test_read_scenarios() {
        let dir = tempdir().unwrap();
        create_scenarios_file(dir.path(), "name,probability\nlow,0.5\nhigh,0.5");

        let scenarios = read_scenarios(dir.path()).unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios["low"].probability, 0.5);
    }

    #[test]
    fn test_read_scenarios_bad_sum() {
        let dir = tempdir().unwrap();
        create_scenarios_file(dir.path(), "name,probability\nlow,0.5\nhigh,0.4");

        assert!(read_scenarios(dir.path()).is_err());
    }

    #[test]
    fn test_read_scenarios_bad_probability() {
        let dir = tempdir().unwrap();
        create_scenarios_file(dir.path(), "name,probability\nlow,1.5\nhigh,-0.5");

        assert!(read_scenarios(dir.path()).is_err());
    }
}
