//! Input file reading.
//!
//! The input is a CSV file with a header row naming at least `alias` and
//! `new_pin`. Rows with missing values still deserialize (the fields default
//! to empty strings) so the runner can ledger them as skipped instead of
//! aborting the whole batch on one bad row.

use std::path::Path;

use tracing::info;

use crate::errors::InputError;
use crate::models::InputRecord;

/// Read all input records from the CSV file at `path`, in file order.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<InputRecord>, InputError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(InputError::FileNotFound(path.display().to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: InputRecord = row?;
        records.push(record);
    }

    info!(path = %path.display(), count = records.len(), "read input records");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_input(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_read_records_in_order() {
        let (_dir, path) = write_input("alias,new_pin\njsmith,483920\nmlopez,112233\n");
        let records = read_records(&path).unwrap();
        assert_eq!(
            records,
            vec![
                InputRecord::new("jsmith", "483920"),
                InputRecord::new("mlopez", "112233"),
            ]
        );
    }

    #[test]
    fn test_missing_value_becomes_empty_field() {
        let (_dir, path) = write_input("alias,new_pin\njsmith,\n,1111\n");
        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert!(!records[0].is_complete());
        assert!(!records[1].is_complete());
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let (_dir, path) = write_input("alias,new_pin,department\njsmith,483920,sales\n");
        let records = read_records(&path).unwrap();
        assert_eq!(records[0], InputRecord::new("jsmith", "483920"));
    }

    #[test]
    fn test_missing_file() {
        let result = read_records("/nonexistent/users.csv");
        assert!(matches!(result, Err(InputError::FileNotFound(_))));
    }
}
