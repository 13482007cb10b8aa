//! Whole-file backups of the input databases
//!
//! Backups are taken before anything is written so that a discarded run can
//! always be recovered from.

use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Copy `db_path` into `backup_dir` as `{label}_{YYYYMMDD_HHMMSS}.db`
pub fn backup_database(db_path: &Path, label: &str, backup_dir: &Path) -> Result<PathBuf> {
    if !db_path.is_file() {
        return Err(Error::DatabaseError(format!(
            "Cannot back up {}: file does not exist",
            db_path.display()
        )));
    }

    fs::create_dir_all(backup_dir)?;

    let backup_path = backup_dir.join(backup_file_name(label));
    tracing::info!(
        source = %db_path.display(),
        backup = %backup_path.display(),
        "Creating backup of database"
    );
    fs::copy(db_path, &backup_path)?;

    Ok(backup_path)
}

/// Build a timestamped backup file name for `label`
fn backup_file_name(label: &str) -> String {
    let now = Local::now();
    format!("{}_{}.db", label, now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_carries_label_and_timestamp() {
        let name = backup_file_name("reference_original");

        let stamp = name
            .strip_prefix("reference_original_")
            .and_then(|rest| rest.strip_suffix(".db"))
            .unwrap();
        assert_eq!(stamp.len(), "YYYYMMDD_HHMMSS".len());
        assert_eq!(stamp.as_bytes()[8], b'_');
        assert!(stamp.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
    }
}
