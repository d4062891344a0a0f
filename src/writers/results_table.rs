
use itertools::Itertools;
use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::data_types::classification_record::{ClassificationRecord, DISPLAY_COLUMNS};
use crate::data_types::taxonomy::TaxonomyLevel;

/// One canonical row as written to the results file; `None` numbers become empty cells
#[derive(Serialize)]
struct ResultRow<'a> {
    #[serde(rename = "Sequence_ID")]
    sequence_id: &'a str,
    #[serde(rename = "ReferenceID")]
    reference_id: &'a str,
    kingdom: &'a str,
    phylum: &'a str,
    class: &'a str,
    order: &'a str,
    family: &'a str,
    genus: &'a str,
    species: &'a str,
    rank: &'a str,
    score: Option<f64>,
    cutoff: Option<f64>,
    confidence: Option<f64>
}

impl<'a> ResultRow<'a> {
    fn new(record: &'a ClassificationRecord) -> Self {
        let taxonomy = &record.taxonomy;
        Self {
            sequence_id: &record.sequence_id,
            reference_id: &record.reference_id,
            kingdom: taxonomy.get(TaxonomyLevel::Kingdom),
            phylum: taxonomy.get(TaxonomyLevel::Phylum),
            class: taxonomy.get(TaxonomyLevel::Class),
            order: taxonomy.get(TaxonomyLevel::Order),
            family: taxonomy.get(TaxonomyLevel::Family),
            genus: taxonomy.get(TaxonomyLevel::Genus),
            species: taxonomy.get(TaxonomyLevel::Species),
            rank: &record.rank,
            score: record.score,
            cutoff: record.cutoff,
            confidence: record.confidence
        }
    }
}

/// Writes canonical records to a results file
/// # Arguments
/// * `records` - the normalized records
/// * `filename` - the output path; `.csv` is comma-separated, anything else is tab-separated
pub fn write_classification_table(records: &[ClassificationRecord], filename: &Path) -> csv::Result<()> {
    // modify the delimiter to "," if it ends with .csv
    let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
    let delimiter: u8 = if is_csv { b',' } else { b'\t' };
    let mut csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(filename)?;

    for record in records.iter() {
        csv_writer.serialize(ResultRow::new(record))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Renders records as an aligned text table restricted to the display columns.
pub fn format_display_table(records: &[&ClassificationRecord]) -> String {
    let rows: Vec<Vec<String>> = records.iter()
        .map(|r| DISPLAY_COLUMNS.iter().map(|c| r.column_value(c).unwrap_or_default()).collect())
        .collect();
    let headers: Vec<String> = DISPLAY_COLUMNS.iter().map(|c| c.to_string()).collect();
    format_aligned(&headers, &rows)
}

/// Left-aligns every column to its widest cell, two spaces between columns.
pub fn format_aligned(headers: &[String], rows: &[Vec<String>]) -> String {
    let widths: Vec<usize> = headers.iter().enumerate()
        .map(|(i, h)| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(|c| c.chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_line = |cells: &[String]| -> String {
        cells.iter().zip(widths.iter())
            .map(|(c, &w)| format!("{c:<w$}"))
            .join("  ")
            .trim_end()
            .to_string()
    };

    std::iter::once(format_line(headers))
        .chain(rows.iter().map(|r| format_line(r.as_slice())))
        .join("\n")
}
