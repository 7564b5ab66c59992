//! CSV file → header list + [`RawRow`]s.

use std::path::Path;

use anyhow::{Context, Result};

use leadsync_core::mapping::RawRow;

/// A parsed CSV upload.
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

pub fn read_csv_file(path: &Path) -> Result<CsvTable> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read CSV file: {}", path.display()))?;
    parse_csv(&data).with_context(|| format!("Failed to parse CSV file: {}", path.display()))
}

/// Parse CSV text with a header row.
///
/// Rows whose cells are all blank are skipped. Short rows are allowed; the
/// missing trailing cells are simply absent from the row.
pub fn parse_csv(data: &str) -> Result<CsvTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("missing header row")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        // +2: one for the header, one for 1-based line numbers.
        let record = record.with_context(|| format!("malformed CSV at row {}", i + 2))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .filter(|(h, _)| !h.is_empty())
            .map(|(h, cell)| (h.clone(), cell.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(CsvTable { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headers_and_rows() {
        let table = parse_csv("Email,First Name\na@x.com,Ann\nb@x.com,\"Bob, Jr\"\n").unwrap();
        assert_eq!(table.headers, ["Email", "First Name"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1]["First Name"], "Bob, Jr");
    }

    #[test]
    fn skips_blank_lines_and_tolerates_short_rows() {
        let table = parse_csv("Email,City\n\n,\na@x.com\n").unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0]["Email"], "a@x.com");
        assert!(!table.rows[0].contains_key("City"));
    }

    #[test]
    fn header_only_file_has_no_rows() {
        let table = parse_csv("Email,City\n").unwrap();
        assert!(table.rows.is_empty());
        assert_eq!(table.headers.len(), 2);
    }
}
