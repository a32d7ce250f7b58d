use std::path::Path;

use dbrecon_recon::{DuplicateReport, MergedDataset, MergedRecord};

use crate::error::ReportError;

/// Write merged records with the flat report header: merged columns,
/// `presence`, `is_equal`, then one `<field>_match` flag per compared field.
pub fn write_merged<'a>(
    path: &Path,
    merged: &MergedDataset,
    records: impl Iterator<Item = &'a MergedRecord>,
    source1: &str,
    source2: &str,
) -> Result<(), ReportError> {
    let csv_err = |source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer.write_record(merged.header()).map_err(csv_err)?;

    for record in records {
        let mut row: Vec<String> = record.values.iter().map(ToString::to_string).collect();
        row.push(record.presence.label(source1, source2));
        row.push(record.is_equal.to_string());
        row.extend(record.field_matches.iter().map(ToString::to_string));
        writer.write_record(&row).map_err(csv_err)?;
    }

    writer.flush().map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Key columns plus a `records` count per duplicated key.
pub fn write_duplicates(path: &Path, report: &DuplicateReport) -> Result<(), ReportError> {
    let csv_err = |source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;

    let mut header: Vec<&str> = report.key_columns.iter().map(String::as_str).collect();
    header.push("records");
    writer.write_record(&header).map_err(csv_err)?;

    for dup in &report.duplicates {
        let mut row: Vec<String> = dup.key.iter().map(ToString::to_string).collect();
        row.push(dup.count.to_string());
        writer.write_record(&row).map_err(csv_err)?;
    }

    writer.flush().map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}
