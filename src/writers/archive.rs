
use anyhow::Context;
use chrono::{DateTime, TimeZone};
use log::{debug, warn};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

use crate::backends::alignment::AlignmentOutcome;
use crate::data_types::classification_record::ClassificationRecord;
use crate::data_types::methods::Method;
use crate::writers::results_table::write_classification_table;

/// Archive member name for the classified results
pub const CLASSIFIED_MEMBER: &str = "classification_results.classified";
/// Archive member name for the visualization
pub const VISUALIZATION_MEMBER: &str = "taxonomic_visualization.html";

/// Timestamped export name, e.g. `dnabarcoder_results_20250101_120000.zip`
/// # Arguments
/// * `method` - the method that produced the results
/// * `extension` - file extension without the dot
/// * `timestamp` - usually `chrono::Local::now()`
pub fn export_file_name<Tz: TimeZone>(method: Method, extension: &str, timestamp: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display
{
    format!("{method}_results_{}.{extension}", timestamp.format("%Y%m%d_%H%M%S"))
}

/// The archive members for an alignment outcome, (member name, source path)
pub fn alignment_archive_entries(outcome: &AlignmentOutcome) -> Vec<(&'static str, PathBuf)> {
    let mut entries = vec![(CLASSIFIED_MEMBER, outcome.classified_path().to_path_buf())];
    if let Some(path) = outcome.visualization_path() {
        entries.push((VISUALIZATION_MEMBER, path.to_path_buf()));
    }
    entries
}

/// Bundles result files into a zip archive, skipping any whose path no longer exists.
/// Returns the member names actually written.
/// # Arguments
/// * `entries` - (member name, source path) pairs
/// * `filename` - the zip to create
/// # Errors
/// * if the archive cannot be created or written
/// * if an existing source file cannot be read
pub fn write_results_zip(entries: &[(&str, PathBuf)], filename: &Path) -> anyhow::Result<Vec<String>> {
    let file = File::create(filename)
        .with_context(|| format!("Error while creating {filename:?}:"))?;
    let mut zip_writer = zip::ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let mut written = vec![];
    for (member, source) in entries.iter() {
        if !source.exists() {
            warn!("Skipping {member}, {source:?} no longer exists");
            continue;
        }
        let mut reader = File::open(source)
            .with_context(|| format!("Error while opening {source:?}:"))?;
        zip_writer.start_file(*member, options)
            .with_context(|| format!("Error while adding {member} to {filename:?}:"))?;
        std::io::copy(&mut reader, &mut zip_writer)
            .with_context(|| format!("Error while writing {member} to {filename:?}:"))?;
        debug!("Added {source:?} as {member}");
        written.push(member.to_string());
    }

    zip_writer.finish()
        .with_context(|| format!("Error while finalizing {filename:?}:"))?;
    Ok(written)
}

/// Writes the results table and the result archive of an alignment request.
/// Takes ownership of the outcome so its working directory is removed when this returns, on success or failure.
/// Returns the archive members written.
/// # Arguments
/// * `outcome` - the finished request
/// * `records` - normalized records for the results table
/// * `table_filename` - results table path (CSV/TSV)
/// * `zip_filename` - archive path
/// # Errors
/// * if either output cannot be written
pub fn export_alignment_results(outcome: AlignmentOutcome, records: &[ClassificationRecord], table_filename: &Path, zip_filename: &Path) -> anyhow::Result<Vec<String>> {
    write_classification_table(records, table_filename)
        .with_context(|| format!("Error while saving results table to {table_filename:?}:"))?;
    write_results_zip(&alignment_archive_entries(&outcome), zip_filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    use crate::backends::alignment::{AlignmentClassifier, AlignmentConfigBuilder, ClassifyParams};
    use crate::normalize::alignment::parse_classification_result;
    use crate::parsing::validation::validate_fasta;

    fn mock_outcome() -> AlignmentOutcome {
        let config = AlignmentConfigBuilder::default()
            .interpreter("sh".to_string())
            .script(PathBuf::from("test_data/mock_dnabarcoder.sh"))
            .data_dir(PathBuf::from("test_data/datasets"))
            .build().unwrap();
        let classifier = AlignmentClassifier::new(config).unwrap();
        let input = validate_fasta(">seq1\nACGT\n").unwrap();
        classifier.run_classification(&input, "UNITE2024ITS1", &ClassifyParams::default()).unwrap()
    }

    #[test]
    fn test_export_alignment_results() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let outcome = mock_outcome();
        let work_dir = outcome.work_dir().to_path_buf();
        let records = parse_classification_result(outcome.classified_path()).unwrap();

        let table_fn = tmp_dir.path().join("results.tsv");
        let zip_fn = tmp_dir.path().join("results.zip");
        let written = export_alignment_results(outcome, &records, &table_fn, &zip_fn).unwrap();
        assert_eq!(written, vec![CLASSIFIED_MEMBER.to_string(), VISUALIZATION_MEMBER.to_string()]);
        assert!(table_fn.exists());
        assert!(zip_fn.exists());
        assert!(!work_dir.exists());
    }

    #[test]
    fn test_failed_export_removes_work_dir() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let outcome = mock_outcome();
        let work_dir = outcome.work_dir().to_path_buf();
        assert!(work_dir.exists());

        let missing_dir = tmp_dir.path().join("missing");
        let result = export_alignment_results(outcome, &[], &missing_dir.join("results.tsv"), &missing_dir.join("results.zip"));
        assert!(result.is_err());
        assert!(!work_dir.exists());
    }

    #[test]
    fn test_export_file_name() {
        let timestamp = chrono::Utc.with_ymd_and_hms(2025, 3, 7, 14, 5, 9).unwrap();
        assert_eq!(export_file_name(Method::Dnabarcoder, "zip", &timestamp), "dnabarcoder_results_20250307_140509.zip");
        assert_eq!(export_file_name(Method::Taxotagger, "csv", &timestamp), "taxotagger_results_20250307_140509.csv");
    }

    #[test]
    fn test_zip_skips_missing() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let zip_path = tmp_dir.path().join("results.zip");
        let entries = vec![
            (CLASSIFIED_MEMBER, PathBuf::from("test_data/results/sample.classified")),
            (VISUALIZATION_MEMBER, tmp_dir.path().join("gone.krona.html"))
        ];
        let written = write_results_zip(&entries, &zip_path).unwrap();
        assert_eq!(written, vec![CLASSIFIED_MEMBER.to_string()]);

        let mut archive = zip::ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
        let mut member = archive.by_name(CLASSIFIED_MEMBER).unwrap();
        let mut contents = String::new();
        member.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, std::fs::read_to_string("test_data/results/sample.classified").unwrap());
    }
}
