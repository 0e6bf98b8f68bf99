//! Code for reading generators from an input file.
use super::*;
use crate::system::{Bus, Generator, Stage};
use anyhow::{ensure, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

const GENERATORS_FILE_NAME: &str = "generators.csv";

/// A generator record retrieved from a CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct GeneratorRaw {
    name: String,
    tech: String,
    bus_name: String,
    c2: f64,
    c1: f64,
    c0: f64,
    invest_cost: f64,
    exist_cap: f64,
    cap_limit: f64,
    var_om_cost: f64,
}

/// Read generators from the generators CSV file.
///
/// Generators are read as first-stage (dispatchable); the loader promotes those with a capacity
/// factor profile to second-stage after the capacity factors have been read.
///
/// # Arguments
///
/// * `inputs_dir` - Folder containing the input CSV files
/// * `buses` - Buses for connection resolution
pub fn read_generators(
    inputs_dir: &Path,
    buses: &IndexMap<Rc<str>, Bus>,
) -> Result<IndexMap<Rc<str>, Generator>> {
    let file_path = inputs_dir.join(GENERATORS_FILE_NAME);
    let iter = read_csv(&file_path)?;
    read_generators_from_iter(iter, buses).with_context(|| input_err_msg(file_path))
}

fn read_generators_from_iter<I>(
    iter: I,
    buses: &IndexMap<Rc<str>, Bus>,
) -> Result<IndexMap<Rc<str>, Generator>>
where
    I: Iterator<Item = GeneratorRaw>,
{
    let mut generators = IndexMap::new();
    for raw in iter {
        ensure!(
            raw.c2 >= 0.0,
            "Generator {} must have c2 >= 0 (the cost must be convex)",
            raw.name
        );
        ensure!(
            raw.invest_cost >= 0.0,
            "Generator {} must have invest_cost >= 0",
            raw.name
        );
        ensure!(
            raw.exist_cap >= 0.0,
            "Generator {} must have exist_cap >= 0",
            raw.name
        );
        ensure!(
            raw.cap_limit >= raw.exist_cap,
            "Generator {} must have cap_limit >= exist_cap",
            raw.name
        );
        ensure!(
            raw.var_om_cost >= 0.0,
            "Generator {} must have var_om_cost >= 0",
            raw.name
        );

        let name: Rc<str> = Rc::from(raw.name.as_str());
        let generator = Generator {
            name: Rc::clone(&name),
            tech: raw.tech,
            bus: buses.index_of_id(&raw.bus_name)?,
            c2: raw.c2,
            c1: raw.c1,
            c0: raw.c0,
            invest_cost: raw.invest_cost,
            exist_cap: raw.exist_cap,
            cap_limit: raw.cap_limit,
            var_om_cost: raw.var_om_cost,
            stage: Stage::Dispatchable,
        };
        ensure!(
            generators.insert(name, generator).is_none(),
            "Duplicate generator name found: {}",
            raw.name
        );
    }

    Ok(generators)
}
