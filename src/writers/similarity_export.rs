
use std::fs::File;
use std::path::Path;

use crate::data_types::similarity::{FlatMatchRecord, LevelMatch, NO_MATCH_FOUND};
use crate::data_types::taxonomy::TaxonomyLevel;
use crate::writers::results_table::format_aligned;

/// Export header: `Sequence_ID, Rank`, then value / hit / similarity for every level
pub fn similarity_headers() -> Vec<String> {
    let mut headers = vec!["Sequence_ID".to_string(), "Rank".to_string()];
    for level in TaxonomyLevel::all() {
        let label = level.label();
        headers.push(label.to_string());
        headers.push(format!("{label}_Hit"));
        headers.push(format!("{label}_Similarity"));
    }
    headers
}

/// One export row; unfilled match positions carry the "No match found" marker
pub fn similarity_row(record: &FlatMatchRecord) -> Vec<String> {
    let mut row = vec![record.sequence_id.clone(), record.rank.to_string()];
    for level in TaxonomyLevel::all() {
        match record.level(level) {
            LevelMatch::Found { taxon, hit_id, similarity } => {
                row.push(taxon.clone());
                row.push(hit_id.clone());
                row.push(similarity.to_string());
            },
            LevelMatch::Unassigned => {
                row.extend([String::new(), String::new(), String::new()]);
            },
            LevelMatch::NoMatch => {
                row.extend([NO_MATCH_FOUND.to_string(), String::new(), String::new()]);
            }
        }
    }
    row
}

/// Writes flattened similarity matches to a file
/// # Arguments
/// * `records` - flattened matches, in sequence then position order
/// * `filename` - the output path; `.csv` is comma-separated, anything else is tab-separated
pub fn write_similarity_table(records: &[FlatMatchRecord], filename: &Path) -> csv::Result<()> {
    let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
    let delimiter: u8 = if is_csv { b',' } else { b'\t' };
    let mut csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(filename)?;

    csv_writer.write_record(similarity_headers())?;
    for record in records.iter() {
        csv_writer.write_record(similarity_row(record))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Renders the matches of one sequence as `Rank, Kingdom, ..., Species`.
pub fn format_similarity_table(records: &[&FlatMatchRecord]) -> String {
    let headers: Vec<String> = std::iter::once("Rank".to_string())
        .chain(TaxonomyLevel::all().map(|l| l.label().to_string()))
        .collect();
    let rows: Vec<Vec<String>> = records.iter()
        .map(|r| {
            std::iter::once(r.rank.to_string())
                .chain(TaxonomyLevel::all().map(|level| match r.level(level) {
                    LevelMatch::Found { taxon, .. } => taxon.clone(),
                    LevelMatch::Unassigned => String::new(),
                    LevelMatch::NoMatch => NO_MATCH_FOUND.to_string()
                }))
                .collect()
        })
        .collect();
    format_aligned(&headers, &rows)
}
