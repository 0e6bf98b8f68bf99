//! Code for reading policy parameters from input files.
use super::*;
use crate::system::Policy;
use anyhow::{ensure, Result};
use serde::Deserialize;
use std::path::Path;

const MAX_DIFFANGLE_FILE_NAME: &str = "max_diffangle.csv";

/// The angle limit record retrieved from a CSV file. The value is in degrees.
#[derive(Debug, Deserialize, PartialEq)]
struct MaxDiffangleRaw {
    max_diffangle: f64,
}

/// Read the policy parameters.
///
/// The angle limit file holds a single value in degrees; it is converted to radians here.
///
/// # Arguments
///
/// * `inputs_dir` - Folder containing the input CSV files
pub fn read_policy(inputs_dir: &Path) -> Result<Policy> {
    let file_path = inputs_dir.join(MAX_DIFFANGLE_FILE_NAME);
    let mut iter = read_csv::<MaxDiffangleRaw>(&file_path)?;

    let raw = iter.next().unwrap(); // read_csv rejects empty files
    ensure!(
        iter.next().is_none(),
        "{} must contain a single value",
        file_path.display()
    );
    ensure!(
        raw.max_diffangle > 0.0,
        "max_diffangle must be positive (got {})",
        raw.max_diffangle
    );

    Ok(Policy {
        max_diffangle: raw.max_diffangle.to_radians(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn create_max_diffangle_file(dir_path: &Path, contents: &str) {
        let file_path = dir_path.join(MAX_DIFFANGLE_FILE_NAME);
        let mut file = File::create(file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
    }

    #[test]
    fn test_read_policy() {
        let dir = tempdir().unwrap();
        create_max_diffangle_file(dir.path(), "max_diffangle\n30");

        let policy = read_policy(dir.path()).unwrap();
        assert!(approx_eq!(
            f64,
            policy.max_diffangle,
            30.0_f64.to_radians()
        ));
    }

    #[test]
    fn test_read_policy_multiple_rows() {
        let dir = tempdir().unwrap();
        create_max_diffangle_file(dir.path(), "max_diffangle\n30\n40");

        assert!(read_policy(dir.path()).is_err());
    }

    #[test]
    fn test_read_policy_missing_file() {
        let dir = tempdir().unwrap();
        let err = read_policy(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains(MAX_DIFFANGLE_FILE_NAME));
    }
}
