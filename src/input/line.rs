//! Code for reading transmission lines from an input file.
use super::*;
use crate::system::{Bus, Line};
use anyhow::{ensure, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

const LINES_FILE_NAME: &str = "lines.csv";

/// A line record retrieved from a CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct LineRaw {
    name: String,
    from_bus: String,
    to_bus: String,
    rate: f64,
    r: f64,
    x: f64,
    g: f64,
    b: f64,
}

/// Read lines from the lines CSV file.
///
/// The file may contain no data rows (an isolated single-bus system has no lines). Parallel
/// lines between the same pair of buses are permitted.
///
/// # Arguments
///
/// * `inputs_dir` - Folder containing the input CSV files
/// * `buses` - Buses for endpoint resolution
pub fn read_lines(inputs_dir: &Path, buses: &IndexMap<Rc<str>, Bus>) -> Result<Vec<Line>> {
    let file_path = inputs_dir.join(LINES_FILE_NAME);
    let iter = read_csv_optional(&file_path)?;
    read_lines_from_iter(iter, buses).with_context(|| input_err_msg(file_path))
}

fn read_lines_from_iter<I>(iter: I, buses: &IndexMap<Rc<str>, Bus>) -> Result<Vec<Line>>
where
    I: Iterator<Item = LineRaw>,
{
    let mut lines = Vec::new();
    let mut names = std::collections::HashSet::new();
    for raw in iter {
        ensure!(
            names.insert(raw.name.clone()),
            "Duplicate line name found: {}",
            raw.name
        );
        ensure!(raw.rate > 0.0, "Line {} must have rate > 0", raw.name);
        ensure!(raw.x > 0.0, "Line {} must have x > 0", raw.name);

        lines.push(Line {
            name: Rc::from(raw.name.as_str()),
            from_bus: buses.index_of_id(&raw.from_bus)?,
            to_bus: buses.index_of_id(&raw.to_bus)?,
            rate: raw.rate,
            r: raw.r,
            x: raw.x,
            g: raw.g,
            b: raw.b,
        });
    }

    Ok(lines)
}
