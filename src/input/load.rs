//! Code for reading load data from an input file.
use super::*;
use crate::system::{Bus, Scenario};
use anyhow::{ensure, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::rc::Rc;

const LOADS_FILE_NAME: &str = "loads.csv";

/// A load record retrieved from a CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct LoadRaw {
    bus_name: String,
    scenario_name: String,
    timepoint_name: String,
    load_mw: f64,
}

/// Read loads from the loads CSV file into a dense (bus, scenario, timepoint) table.
///
/// The file may be sparse: combinations without an entry have zero load.
///
/// # Arguments
///
/// * `inputs_dir` - Folder containing the input CSV files
/// * `buses` - Buses for key resolution
/// * `scenarios` - Scenarios for key resolution
/// * `timepoint_index` - Timepoint name to index lookup
/// * `n_timepoints` - The number of timepoints
pub fn read_loads(
    inputs_dir: &Path,
    buses: &IndexMap<Rc<str>, Bus>,
    scenarios: &IndexMap<Rc<str>, Scenario>,
    timepoint_index: &HashMap<Rc<str>, usize>,
    n_timepoints: usize,
) -> Result<Vec<f64>> {
    let file_path = inputs_dir.join(LOADS_FILE_NAME);
    let iter = read_csv_optional(&file_path)?;
    read_loads_from_iter(iter, buses, scenarios, timepoint_index, n_timepoints)
        .with_context(|| input_err_msg(file_path))
}

fn read_loads_from_iter<I>(
    iter: I,
    buses: &IndexMap<Rc<str>, Bus>,
    scenarios: &IndexMap<Rc<str>, Scenario>,
    timepoint_index: &HashMap<Rc<str>, usize>,
    n_timepoints: usize,
) -> Result<Vec<f64>>
where
    I: Iterator<Item = LoadRaw>,
{
    let n_scenarios = scenarios.len();
    let mut loads = vec![0.0; buses.len() * n_scenarios * n_timepoints];
    let mut seen = HashSet::new();
    for raw in iter {
        let bus = buses.index_of_id(&raw.bus_name)?;
        let scenario = scenarios.index_of_id(&raw.scenario_name)?;
        let timepoint = *timepoint_index.get(raw.timepoint_name.as_str()).with_context(|| {
            format!("Unknown timepoint {} found", raw.timepoint_name)
        })?;

        let idx = (bus * n_scenarios + scenario) * n_timepoints + timepoint;
        ensure!(
            seen.insert(idx),
            "Duplicate load entry for ({}, {}, {})",
            raw.bus_name,
            raw.scenario_name,
            raw.timepoint_name
        );
        loads[idx] = raw.load_mw;
    }

    Ok(loads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{Bus, Scenario};
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn test_buses() -> IndexMap<Rc<str>, Bus> {
        ["north", "south"]
            .into_iter()
            .enumerate()
            .map(|(idx, name)| {
                let name: Rc<str> = name.into();
                (
                    Rc::clone(&name),
                    Bus {
                        name,
                        kv: 230.0,
                        bus_type: "transmission".to_string(),
                        lat: 0.0,
                        lon: 0.0,
                        slack: idx == 0,
                    },
                )
            })
            .collect()
    }

    fn test_scenarios() -> IndexMap<Rc<str>, Scenario> {
        let name: Rc<str> = "base".into();
        [(
            Rc::clone(&name),
            Scenario {
                name,
                probability: 1.0,
            },
        )]
        .into_iter()
        .collect()
    }

    fn test_timepoint_index() -> HashMap<Rc<str>, usize> {
        [("t0".into(), 0), ("t1".into(), 1)].into_iter().collect()
    }

    fn create_loads_file(dir_path: &Path, contents: &str) {
        let file_path = dir_path.join(LOADS_FILE_NAME);
        let mut file = File::create(file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
    }

    #[test]
    fn test_read_loads_sparse() {
        let dir = tempdir().unwrap();
        create_loads_file(
            dir.path(),
            "bus_name,scenario_name,timepoint_name,load_mw
south,base,t0,50",
        );

        let loads = read_loads(
            dir.path(),
            &test_buses(),
            &test_scenarios(),
            &test_timepoint_index(),
            2,
        )
        .unwrap();

        // Bus south is index 1; missing entries default to zero
        assert_eq!(loads, vec![0.0, 0.0, 50.0, 0.0]);
    }

    #[test]
    fn test_read_loads_duplicate() {
        let dir = tempdir().unwrap();
        create_loads_file(
            dir.path(),
            "bus_name,scenario_name,timepoint_name,load_mw
south,base,t0,50
south,base,t0,60",
        );

        assert!(read_loads(
            dir.path(),
            &test_buses(),
            &test_scenarios(),
            &test_timepoint_index(),
            2,
        )
        .is_err());
    }

    #[test]
    fn test_read_loads_unknown_key() {
        let dir = tempdir().unwrap();
        create_loads_file(
            dir.path(),
            "bus_name,scenario_name,timepoint_name,load_mw
east,base,t0,50",
        );

        assert!(read_loads(
            dir.path(),
            &test_buses(),
            &test_scenarios(),
            &test_timepoint_index(),
            2,
        )
        .is_err());
    }
}
