
use indexmap::IndexMap;
use log::debug;

use crate::data_types::classification_record::ClassificationRecord;
use crate::data_types::taxonomy::Taxonomy;

/// Raw columns that may carry the query ID when the classifier did not name it `Sequence_ID`
pub const ALTERNATE_ID_COLUMNS: [&str; 6] = ["ID", "Query", "Query ID", "QueryID", "Name", "SequenceID"];

/// Canonical records prepared for display; every record has a non-empty `sequence_id`
#[derive(Clone, Debug, Default)]
pub struct DisplayTable {
    records: Vec<ClassificationRecord>,
    /// Distinct sequence IDs, first-seen order
    sequence_ids: Vec<String>
}

impl DisplayTable {
    pub fn records(&self) -> &[ClassificationRecord] {
        &self.records
    }

    pub fn sequence_ids(&self) -> &[String] {
        &self.sequence_ids
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True if rows belong to more than one query, i.e. a sequence selector is useful
    pub fn has_multiple_sequences(&self) -> bool {
        self.sequence_ids.len() > 1
    }

    /// Sequence ID -> the short ID shown to the user
    pub fn display_ids(&self) -> IndexMap<String, String> {
        self.sequence_ids.iter()
            .map(|id| (id.clone(), id.split('|').next().unwrap_or_default().to_string()))
            .collect()
    }

    /// Rows for one sequence. Filtering never produces an empty view: if nothing matches, all rows are returned.
    /// # Arguments
    /// * `sequence_id` - full or display ID of the sequence to keep
    pub fn filter_by_sequence(&self, sequence_id: &str) -> Vec<&ClassificationRecord> {
        let filtered: Vec<&ClassificationRecord> = self.records.iter()
            .filter(|r| r.sequence_id == sequence_id || r.display_id() == sequence_id)
            .collect();
        if filtered.is_empty() {
            debug!("No rows for sequence {sequence_id:?}, showing all rows");
            self.records.iter().collect()
        } else {
            filtered
        }
    }
}

/// Fills in sequence IDs when the classifier left them all empty.
/// Order: an alternate ID column, then the caller's IDs when the counts match, then `Sequence_<n>`.
fn resolve_sequence_ids(records: &mut [ClassificationRecord], input_ids: &[String]) {
    let backend_ids = records.iter().any(|r| !r.sequence_id.is_empty());
    let alternate_column = ALTERNATE_ID_COLUMNS.iter()
        .find(|c| records.iter().any(|r| r.extra.get(**c).is_some_and(|v| !v.trim().is_empty())));

    // with backend IDs present, only individual holes get filled
    if !backend_ids {
        if let Some(column) = alternate_column {
            debug!("Using {column:?} as the sequence ID column");
            for record in records.iter_mut() {
                if let Some(value) = record.extra.get(*column) {
                    record.sequence_id = value.trim().to_string();
                }
            }
        } else if !input_ids.is_empty() && input_ids.len() == records.len() {
            debug!("Using input sequence IDs for {} rows", records.len());
            for (record, id) in records.iter_mut().zip(input_ids.iter()) {
                record.sequence_id = id.clone();
            }
        }
    }

    for (index, record) in records.iter_mut().enumerate() {
        if record.sequence_id.is_empty() {
            record.sequence_id = format!("Sequence_{}", index + 1);
        }
    }
}

/// Recovers taxonomy from UNITE-style IDs (`ID|k__X;p__Y;...|...`) for rows without any taxonomy.
fn extract_taxonomy_from_id(record: &mut ClassificationRecord) {
    if !record.taxonomy.is_empty() {
        return;
    }
    if let Some(lineage) = record.sequence_id.split('|').nth(1) {
        if lineage.contains(';') {
            record.taxonomy = Taxonomy::from_lineage(lineage);
        }
    }
}

/// Second normalization pass, run before showing or exporting records.
/// # Arguments
/// * `records` - canonical records from the alignment normalizer
/// * `input_ids` - IDs of the submitted sequences, in input order; may be empty
pub fn prepare_for_display(mut records: Vec<ClassificationRecord>, input_ids: &[String]) -> DisplayTable {
    resolve_sequence_ids(&mut records, input_ids);
    for record in records.iter_mut() {
        extract_taxonomy_from_id(record);
        record.taxonomy.clear_sentinels();
    }

    let mut sequence_ids: Vec<String> = vec![];
    for record in records.iter() {
        if !sequence_ids.contains(&record.sequence_id) {
            sequence_ids.push(record.sequence_id.clone());
        }
    }

    DisplayTable {
        records,
        sequence_ids
    }
}
