use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{CollectError, Result};

pub fn check_file_exists(path: &Path, name: &str) -> Result<()> {
    if !path.is_file() {
        return Err(CollectError::InvalidArgument(format!(
            "File {path:?} passed to {name} does not exist"
        )));
    }
    Ok(())
}

/// Fails on the first missing file, naming every missing one.
pub fn check_files_exist(paths: &[PathBuf], name: &str) -> Result<()> {
    let missing: Vec<String> = paths
        .iter()
        .filter(|p| !p.is_file())
        .map(|p| p.display().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(CollectError::InvalidArgument(format!(
            "{} required {name} file(s) missing: {}",
            missing.len(),
            missing.join(", ")
        )));
    }
    Ok(())
}

pub fn check_unique(values: &[String], name: &str) -> Result<()> {
    let mut seen = HashSet::with_capacity(values.len());
    for value in values {
        if !seen.insert(value.as_str()) {
            return Err(CollectError::InvalidArgument(format!(
                "{name} lists {value} more than once"
            )));
        }
    }
    Ok(())
}

pub fn check_non_empty(values: &[String], name: &str) -> Result<()> {
    if values.is_empty() {
        return Err(CollectError::InvalidArgument(format!(
            "{name} must name at least one entry"
        )));
    }
    Ok(())
}
