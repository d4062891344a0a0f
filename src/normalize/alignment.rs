
use log::{debug, trace};
use std::path::Path;

use crate::backends::BackendError;
use crate::data_types::classification_record::ClassificationRecord;
use crate::data_types::taxonomy::TaxonomyLevel;
use crate::parsing::tabular::{read_tsv, RawTable};

/// Column in the classified shape holding a `k__...;p__...` lineage
pub const FULL_CLASSIFICATION_COLUMN: &str = "Full classification";

/// The two layouts the alignment classifier writes
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum_macros::Display)]
pub enum AlignmentShape {
    /// `.classification` report: lowercase canonical-ish headers, one column per taxonomic level
    Report,
    /// `.classified` output: dnabarcoder headers and a full lineage string
    Classified
}

impl AlignmentShape {
    /// Picks the shape from the file extension; anything that is not `.classified` is read as a report.
    pub fn from_path(filename: &Path) -> Self {
        match filename.extension() {
            Some(ext) if ext == "classified" => AlignmentShape::Classified,
            _ => AlignmentShape::Report
        }
    }
}

/// Canonical fields a raw column can feed
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Field {
    SequenceId,
    ReferenceId,
    Level(TaxonomyLevel),
    Rank,
    Score,
    Cutoff,
    Confidence
}

/// Maps one raw header to a canonical field with a priority; higher priority wins when two columns feed one field.
fn report_field(header: &str) -> Option<(Field, u8)> {
    let lowered = header.trim().to_lowercase();
    let direct = match lowered.as_str() {
        "id" | "sequence_id" => Some(Field::SequenceId),
        "referenceid" => Some(Field::ReferenceId),
        "rank" => Some(Field::Rank),
        "score" => Some(Field::Score),
        "cutoff" => Some(Field::Cutoff),
        "confidence" => Some(Field::Confidence),
        other => other.parse::<TaxonomyLevel>().ok().map(Field::Level)
    };
    if let Some(field) = direct {
        return Some((field, 2));
    }

    // variants only fill a canonical column that is not already there
    let alias = match lowered.as_str() {
        "similarity" | "blast sim" => Some(Field::Score),
        "cut-off" => Some(Field::Cutoff),
        _ => None
    };
    alias.map(|field| (field, 1))
}

fn classified_field(header: &str) -> Option<(Field, u8)> {
    // the dnabarcoder names are copied over anything already present
    let copied = match header {
        "BLAST sim" => Some(Field::Score),
        "Rank" => Some(Field::Rank),
        "Cut-off" => Some(Field::Cutoff),
        "Confidence" => Some(Field::Confidence),
        _ => None
    };
    if let Some(field) = copied {
        return Some((field, 2));
    }

    let direct = match header {
        "Sequence_ID" => Some(Field::SequenceId),
        "ReferenceID" => Some(Field::ReferenceId),
        "rank" => Some(Field::Rank),
        "score" => Some(Field::Score),
        "cutoff" => Some(Field::Cutoff),
        "confidence" => Some(Field::Confidence),
        other => other.parse::<TaxonomyLevel>().ok().map(Field::Level)
    };
    direct.map(|field| (field, 1))
}

/// For every header, the field it feeds if it won the priority contest; losers and unknowns stay `None`.
fn assign_columns(headers: &[String], shape: AlignmentShape) -> Vec<Option<Field>> {
    let candidates: Vec<Option<(Field, u8)>> = headers.iter()
        .map(|h| match shape {
            AlignmentShape::Report => report_field(h),
            AlignmentShape::Classified => classified_field(h)
        })
        .collect();

    let mut assigned: Vec<Option<Field>> = vec![None; headers.len()];
    for (index, candidate) in candidates.iter().enumerate() {
        let Some((field, priority)) = candidate else {
            continue;
        };
        // first column with the highest priority for this field wins
        let beaten = candidates.iter().enumerate().any(|(other_index, other)| {
            matches!(other, Some((f, p)) if f == field && (*p > *priority || (*p == *priority && other_index < index)))
        });
        if beaten {
            trace!("Column {:?} is shadowed for {field:?}", headers[index]);
        } else {
            assigned[index] = Some(*field);
        }
    }
    assigned
}

/// Parses a numeric cell; anything unparsable or non-finite is missing.
pub fn parse_numeric(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            debug!("Unable to parse {trimmed:?} as a number, treating as missing");
            None
        }
    }
}

/// Converts one table of alignment classifier output into canonical records.
/// Every row becomes one record; missing columns become empty / `None`, never errors.
/// # Arguments
/// * `table` - the raw tab-separated rows, already padded to header width
/// * `shape` - which of the two output layouts the table uses
pub fn normalize_alignment_table(table: &RawTable, shape: AlignmentShape) -> Vec<ClassificationRecord> {
    let headers = table.headers();
    let assigned = assign_columns(headers, shape);
    let lineage_index = match shape {
        AlignmentShape::Classified => headers.iter().position(|h| h == FULL_CLASSIFICATION_COLUMN),
        AlignmentShape::Report => None
    };
    debug!("Normalizing {} {shape} rows with columns {headers:?}", table.len());

    table.rows().iter()
        .map(|row| {
            let mut record = ClassificationRecord::default();
            for ((header, value), field) in headers.iter().zip(row.iter()).zip(assigned.iter()) {
                match field {
                    Some(Field::SequenceId) => record.sequence_id = value.trim().to_string(),
                    Some(Field::ReferenceId) => record.reference_id = value.trim().to_string(),
                    Some(Field::Level(level)) => record.taxonomy.set(*level, value.trim().to_string()),
                    Some(Field::Rank) => record.rank = value.trim().to_string(),
                    Some(Field::Score) => record.score = parse_numeric(value),
                    Some(Field::Cutoff) => record.cutoff = parse_numeric(value),
                    Some(Field::Confidence) => record.confidence = parse_numeric(value),
                    None => {
                        record.extra.insert(header.clone(), value.clone());
                    }
                }
            }

            if let Some(index) = lineage_index {
                let lineage = &row[index];
                if lineage.contains(';') {
                    record.taxonomy.apply_lineage(lineage);
                }
            }
            record.taxonomy.clear_sentinels();
            record
        })
        .collect()
}

/// Reads and normalizes a classifier output file, picking the shape from its extension.
/// # Errors
/// * if the file cannot be read or parsed as tab-separated text
pub fn parse_classification_result(filename: &Path) -> Result<Vec<ClassificationRecord>, BackendError> {
    let table = read_tsv(filename)
        .map_err(|e| BackendError::ResultParse { path: filename.to_path_buf(), message: format!("{e:#}") })?;
    let shape = AlignmentShape::from_path(filename);
    Ok(normalize_alignment_table(&table, shape))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::tabular::parse_tsv;

    #[test]
    fn test_overflow_cells_kept_as_extra() {
        let table = parse_tsv("ID\tReferenceID\tBLAST sim\n\tseq1\tUDB01\t0.97\n").unwrap();
        let records = normalize_alignment_table(&table, AlignmentShape::Classified);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].extra.get("column_4").map(String::as_str), Some("0.97"));
        assert_eq!(records[0].score, None);
    }

    #[test]
    fn test_shape_decides_lineage_parsing() {
        let table = read_tsv(Path::new("test_data/results/sample.classified")).unwrap();
        let records = normalize_alignment_table(&table, AlignmentShape::Classified);
        assert_eq!(records[0].taxonomy.get(TaxonomyLevel::Genus), "Aspergillus");

        // the same table read as a report has no lineage parsing
        let records = normalize_alignment_table(&table, AlignmentShape::Report);
        assert!(records[0].taxonomy.is_empty());
        assert_eq!(records[0].sequence_id, "seq1");
    }

    #[test]
    fn test_shape_from_path() {
        assert_eq!(AlignmentShape::from_path(Path::new("out/a.classified")), AlignmentShape::Classified);
        assert_eq!(AlignmentShape::from_path(Path::new("out/a.classification")), AlignmentShape::Report);
        assert_eq!(AlignmentShape::from_path(Path::new("out/a.txt")), AlignmentShape::Report);
    }

    #[test]
    fn test_classified_full_classification() {
        let text = "ID\tReferenceID\tBLAST sim\tRank\tCut-off\tConfidence\tFull classification\n\
            seq1\tUDB01\t0.97\tphylum\t0.85\t0.9\tk__Fungi;p__Ascomycota;c__;o__;f__;g__;s__\n";
        let table = parse_tsv(text).unwrap();
        let records = normalize_alignment_table(&table, AlignmentShape::Classified);
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.taxonomy.get(TaxonomyLevel::Kingdom), "Fungi");
        assert_eq!(record.taxonomy.get(TaxonomyLevel::Phylum), "Ascomycota");
        for level in [TaxonomyLevel::Class, TaxonomyLevel::Order, TaxonomyLevel::Family, TaxonomyLevel::Genus, TaxonomyLevel::Species] {
            assert_eq!(record.taxonomy.get(level), "");
        }
        assert_eq!(record.reference_id, "UDB01");
        assert_eq!(record.rank, "phylum");
        assert_eq!(record.score, Some(0.97));
        assert_eq!(record.cutoff, Some(0.85));
        assert_eq!(record.confidence, Some(0.9));

        // the ID column is resolved during display preparation
        assert_eq!(record.sequence_id, "");
        assert_eq!(record.extra.get("ID").unwrap(), "seq1");
        assert!(record.extra.contains_key(FULL_CLASSIFICATION_COLUMN));
    }

    #[test]
    fn test_classified_copies_override_existing() {
        let text = "ID\tscore\tBLAST sim\tgenus\tFull classification\n\
            seq1\t0.5\t0.99\tunidentified\tk__Fungi\n";
        let table = parse_tsv(text).unwrap();
        let records = normalize_alignment_table(&table, AlignmentShape::Classified);
        assert_eq!(records[0].score, Some(0.99));

        // no ';' in the lineage, so it is not applied
        assert_eq!(records[0].taxonomy.get(TaxonomyLevel::Kingdom), "");
        assert_eq!(records[0].taxonomy.get(TaxonomyLevel::Genus), "");
    }

    #[test]
    fn test_report_renames() {
        let text = "id\tReferenceID\tKingdom\tGenus\tspecies\tRank\tSimilarity\tCut-off\tConfidence\tNotes\n\
            seq1\tUDB01\tFungi\tAspergillus\tN/A\tgenus\t0.97\tnot_a_number\t\tkeep me\n";
        let table = parse_tsv(text).unwrap();
        let records = normalize_alignment_table(&table, AlignmentShape::Report);
        let record = &records[0];
        assert_eq!(record.sequence_id, "seq1");
        assert_eq!(record.reference_id, "UDB01");
        assert_eq!(record.taxonomy.get(TaxonomyLevel::Kingdom), "Fungi");
        assert_eq!(record.taxonomy.get(TaxonomyLevel::Genus), "Aspergillus");
        assert_eq!(record.taxonomy.get(TaxonomyLevel::Species), "");
        assert_eq!(record.rank, "genus");
        assert_eq!(record.score, Some(0.97));
        assert_eq!(record.cutoff, None);
        assert_eq!(record.confidence, None);
        assert_eq!(record.extra.get("Notes").unwrap(), "keep me");
        assert_eq!(record.extra.len(), 1);
    }

    #[test]
    fn test_report_canonical_name_wins() {
        let text = "id\tBLAST sim\tscore\nseq1\t0.5\t0.75\n";
        let table = parse_tsv(text).unwrap();
        let records = normalize_alignment_table(&table, AlignmentShape::Report);
        assert_eq!(records[0].score, Some(0.75));
        assert_eq!(records[0].extra.get("BLAST sim").unwrap(), "0.5");
    }

    #[test]
    fn test_missing_columns_default() {
        let table = parse_tsv("id\nseq1\nseq2\n").unwrap();
        let records = normalize_alignment_table(&table, AlignmentShape::Report);
        assert_eq!(records.len(), 2);
        assert!(records[1].taxonomy.is_empty());
        assert_eq!(records[1].rank, "");
        assert_eq!(records[1].score, None);
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric("0.97"), Some(0.97));
        assert_eq!(parse_numeric(" 1 "), Some(1.0));
        assert_eq!(parse_numeric("not_a_number"), None);
        assert_eq!(parse_numeric("nan"), None);
        assert_eq!(parse_numeric(""), None);
    }

    #[test]
    fn test_parse_files() {
        let records = parse_classification_result(Path::new("test_data/results/sample.classified")).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].taxonomy.get(TaxonomyLevel::Species), "Aspergillus_niger");
        assert_eq!(records[1].taxonomy.get(TaxonomyLevel::Genus), "Penicillium");
        assert_eq!(records[1].taxonomy.get(TaxonomyLevel::Species), "");
        assert_eq!(records[2].score, None);

        let records = parse_classification_result(Path::new("test_data/results/sample.classification")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sequence_id, "seq1");
        assert_eq!(records[1].taxonomy.get(TaxonomyLevel::Family), "");

        let missing = parse_classification_result(Path::new("test_data/results/missing.classified"));
        assert!(matches!(missing, Err(BackendError::ResultParse { .. })));
    }
}
