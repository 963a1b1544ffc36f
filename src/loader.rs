use crate::columns::RawRecord;
use crate::config::DataConfig;
use crate::error::{LoadError, Result};
use crate::store::Dataset;
use csv::ReaderBuilder;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub trial_rows: usize,
    pub resource_rows: usize,
    pub allocation_rows: usize,
    /// Tables that were missing or unreadable and were loaded as empty.
    pub failed_tables: Vec<String>,
}

/// Read one CSV table with a header row. Empty cells become `null`; every
/// other cell is kept as text for the typed layer to coerce.
pub fn read_table(path: &Path) -> Result<Vec<RawRecord>> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::CsvParse {
            path: path.to_path_buf(),
            source,
        })?;

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|source| LoadError::CsvParse {
            path: path.to_path_buf(),
            source,
        })?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|source| LoadError::CsvParse {
            path: path.to_path_buf(),
            source,
        })?;
        let mut row = RawRecord::new();
        for (idx, header) in headers.iter().enumerate() {
            if header.is_empty() || row.contains_key(header) {
                continue;
            }
            let value = match record.get(idx) {
                Some(cell) if !cell.is_empty() => Value::String(cell.to_string()),
                _ => Value::Null,
            };
            row.insert(header.clone(), value);
        }
        rows.push(row);
    }
    Ok(rows)
}

// A missing or unreadable table counts as zero rows.
fn read_or_empty(dir: &Path, file: &str, failed: &mut Vec<String>) -> Vec<RawRecord> {
    let path = dir.join(file);
    if !path.is_file() {
        tracing::warn!(path = %path.display(), "Table not found, treating as empty");
        failed.push(file.to_string());
        return Vec::new();
    }
    match read_table(&path) {
        Ok(rows) => {
            tracing::info!(path = %path.display(), rows = rows.len(), "Loaded table");
            rows
        }
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable table, treating as empty");
            failed.push(file.to_string());
            Vec::new()
        }
    }
}

/// Locate the data directory and read all three tables from it.
pub fn load_dataset(config: &DataConfig, base: &Path) -> Result<(Dataset, LoadReport)> {
    let dir = config.resolve_data_dir(base)?;
    let mut failed = Vec::new();
    let trials = read_or_empty(&dir, &config.trials_file, &mut failed);
    let resources = read_or_empty(&dir, &config.resources_file, &mut failed);
    let allocations = read_or_empty(&dir, &config.allocations_file, &mut failed);

    let report = LoadReport {
        trial_rows: trials.len(),
        resource_rows: resources.len(),
        allocation_rows: allocations.len(),
        failed_tables: failed,
    };
    let dataset = Dataset {
        trials,
        resources,
        allocations,
    };
    Ok((dataset, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).expect("write fixture");
    }

    #[test]
    fn reads_rows_in_column_order() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(
            tmp.path(),
            "Trial.csv",
            "\u{feff}id,Protocol ID,title\nT1, P1 ,Lung Study\nT2,,\n",
        );
        let rows = read_table(&tmp.path().join("Trial.csv")).expect("parsed");

        assert_eq!(rows.len(), 2);
        let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "Protocol ID", "title"]);
        assert_eq!(rows[0]["Protocol ID"], Value::String("P1".to_string()));
        assert_eq!(rows[1]["title"], Value::Null);
    }

    #[test]
    fn short_rows_fill_with_null() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(tmp.path(), "Resource.csv", "id,name,capacity\nR1,Ann\n");
        let rows = read_table(&tmp.path().join("Resource.csv")).expect("parsed");
        assert_eq!(rows[0]["capacity"], Value::Null);
    }

    #[test]
    fn missing_tables_load_as_empty() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let data = tmp.path().join("data");
        fs::create_dir_all(&data).expect("mkdir");
        write(&data, "Trial.csv", "id,title\nT1,Alpha\n");

        let (dataset, report) =
            load_dataset(&DataConfig::default(), tmp.path()).expect("loaded");
        assert_eq!(dataset.trials.len(), 1);
        assert!(dataset.resources.is_empty());
        assert_eq!(report.trial_rows, 1);
        assert_eq!(
            report.failed_tables,
            vec!["Resource.csv".to_string(), "Allocation.csv".to_string()]
        );
    }

    #[test]
    fn no_data_directory_is_reported() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let err = load_dataset(&DataConfig::default(), tmp.path()).unwrap_err();
        assert!(matches!(err, LoadError::NoDataDirectory { .. }));
    }
}
