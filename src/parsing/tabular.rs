
use anyhow::Context;
use log::{trace, warn};
use std::path::Path;

/// A loosely-typed tab-separated table: one header row and string cells
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    /// Every row has exactly `headers.len()` cells
    rows: Vec<Vec<String>>
}

impl RawTable {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parses tab-separated text. The first non-blank line holds the headers.
/// Short rows are right-padded with empty cells. Non-empty cells past the header width are kept under
/// positional headers (`column_<n>`, 1-based) and every other row is padded to match.
/// # Errors
/// * if the underlying reader fails, which only happens on invalid UTF-8
pub fn parse_tsv(text: &str) -> anyhow::Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(text.as_bytes());

    let mut table = RawTable::default();
    let mut have_headers = false;
    for (line_index, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Error while parsing tab-separated line {}:", line_index + 1))?;
        let cells: Vec<String> = record.iter()
            .map(|c| c.trim_end_matches('\r').to_string())
            .collect();
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        if !have_headers {
            table.headers = cells.iter().map(|c| c.trim().to_string()).collect();
            have_headers = true;
            continue;
        }

        let width = table.headers.len();
        let mut cells = cells;
        // trailing empty cells past the header carry nothing
        while cells.len() > width && cells.last().is_some_and(|c| c.trim().is_empty()) {
            cells.pop();
        }
        if cells.len() < width {
            trace!("Padding short row {} from {} to {width} cells", line_index + 1, cells.len());
        } else if cells.len() > width {
            warn!("Row {} has {} cells but the header has {width}, keeping the extra cells as positional columns", line_index + 1, cells.len());
            for position in width..cells.len() {
                table.headers.push(positional_header(position));
            }
        }
        table.rows.push(cells);
    }

    let width = table.headers.len();
    for row in table.rows.iter_mut() {
        row.resize(width, String::new());
    }
    Ok(table)
}

/// Header given to a cell past the declared columns, `position` is 0-based
fn positional_header(position: usize) -> String {
    format!("column_{}", position + 1)
}

/// Loads a tab-separated file into a `RawTable`.
/// # Errors
/// * if the file cannot be read
/// * if parsing fails
pub fn read_tsv(filename: &Path) -> anyhow::Result<RawTable> {
    let text = std::fs::read_to_string(filename)
        .with_context(|| format!("Error while reading {filename:?}:"))?;
    parse_tsv(&text)
        .with_context(|| format!("Error while parsing {filename:?}:"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_rows_padded() {
        let table = parse_tsv("ID\tReferenceID\tscore\nseq1\tUDB1\t0.97\nseq2\tUDB2\n").unwrap();
        assert_eq!(table.headers(), &["ID", "ReferenceID", "score"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1], vec!["seq2", "UDB2", ""]);
    }

    #[test]
    fn test_long_rows_keep_extra_cells() {
        let table = parse_tsv("ID\tReferenceID\tBLAST sim\n\tseq1\tUDB01\t0.97\nseq2\tUDB02\t0.91\n").unwrap();
        assert_eq!(table.headers(), &["ID", "ReferenceID", "BLAST sim", "column_4"]);
        assert_eq!(table.rows()[0], vec!["", "seq1", "UDB01", "0.97"]);
        // earlier and later rows are padded to the widened header
        assert_eq!(table.rows()[1], vec!["seq2", "UDB02", "0.91", ""]);
    }

    #[test]
    fn test_trailing_empty_cells_dropped() {
        let table = parse_tsv("ID\tscore\nseq1\t0.5\t\t\n").unwrap();
        assert_eq!(table.headers(), &["ID", "score"]);
        assert_eq!(table.rows()[0], vec!["seq1", "0.5"]);
    }

    #[test]
    fn test_blank_lines_and_crlf() {
        let table = parse_tsv("\nID\tscore\r\n\nseq1\t0.5\r\n\n").unwrap();
        assert_eq!(table.headers(), &["ID", "score"]);
        assert_eq!(table.rows(), &[vec!["seq1".to_string(), "0.5".to_string()]]);
    }

    #[test]
    fn test_quotes_are_literal() {
        let table = parse_tsv("ID\tnote\nseq1\t\"quoted\ttext\n").unwrap();
        assert_eq!(table.rows()[0][1], "\"quoted");
        assert_eq!(table.rows()[0][2], "text");
    }

    #[test]
    fn test_empty_input() {
        let table = parse_tsv("").unwrap();
        assert!(table.headers().is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_read_missing_file() {
        assert!(read_tsv(Path::new("test_data/does_not_exist.tsv")).is_err());
    }
}
