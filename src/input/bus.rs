//! Code for reading buses from an input file.
use super::*;
use crate::system::Bus;
use anyhow::{ensure, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

const BUSES_FILE_NAME: &str = "buses.csv";

/// A bus record retrieved from a CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct BusRaw {
    name: String,
    kv: f64,
    #[serde(rename = "type")]
    bus_type: String,
    lat: f64,
    lon: f64,
    slack: bool,
}

/// Read buses from the buses CSV file.
///
/// # Arguments
///
/// * `inputs_dir` - Folder containing the input CSV files
///
/// # Returns
///
/// The buses keyed by name (iteration order gives the bus index) and the index of the slack bus.
pub fn read_buses(inputs_dir: &Path) -> Result<(IndexMap<Rc<str>, Bus>, usize)> {
    let file_path = inputs_dir.join(BUSES_FILE_NAME);
    let iter = read_csv(&file_path)?;
    read_buses_from_iter(iter).with_context(|| input_err_msg(file_path))
}

fn read_buses_from_iter<I>(iter: I) -> Result<(IndexMap<Rc<str>, Bus>, usize)>
where
    I: Iterator<Item = BusRaw>,
{
    let mut buses = IndexMap::new();
    for raw in iter {
        let name: Rc<str> = Rc::from(raw.name.as_str());
        let bus = Bus {
            name: Rc::clone(&name),
            kv: raw.kv,
            bus_type: raw.bus_type,
            lat: raw.lat,
            lon: raw.lon,
            slack: raw.slack,
        };
        ensure!(
            buses.insert(name, bus).is_none(),
            "Duplicate bus name found: {}",
            raw.name
        );
    }

    // There must be exactly one angle reference
    let mut slack_buses = buses
        .values()
        .enumerate()
        .filter(|(_, bus)| bus.slack)
        .map(|(idx, _)| idx);
    let slack_bus = slack_buses
        .next()
        .context("No slack bus found; exactly one bus must have slack = true")?;
    ensure!(
        slack_buses.next().is_none(),
        "More than one slack bus found; exactly one bus must have slack = true"
    );

    Ok((buses, slack_bus))
}
