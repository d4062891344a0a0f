
use log::{debug, info};
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

use crate::data_types::sequence_record::SequenceRecord;
use crate::parsing::fasta::{parse_fasta, sequence_id};

/// Maximum number of sequences accepted in one request
pub const MAX_SEQUENCES: usize = 100;

/// Reasons a FASTA input is rejected; the request stops at the first one
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum InputError {
    #[error("no FASTA records found, each record needs a '>' header line")]
    NoSequences,
    #[error("sequence data found before the first header ({lines} line(s)), each record needs a '>' header line")]
    SequenceBeforeHeader { lines: usize },
    #[error("invalid FASTA header(s) found, each header needs at least one non-empty character after '>'")]
    InvalidHeader,
    #[error("duplicate sequence ID found: `{id}`, all sequence IDs must be unique")]
    DuplicateId { id: String },
    #[error("empty sequence found for: `{header}`, all sequences must be non-empty")]
    EmptySequence { header: String },
    #[error("`{header}` and `{first_header}` have the same DNA sequence, all sequences must be unique")]
    DuplicateSequence { header: String, first_header: String },
    #[error("too many sequences ({count}), limit the input to {max} or fewer")]
    TooManySequences { count: usize, max: usize },
}

/// FASTA input that passed every check, ready for a backend
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedInput {
    /// Records in input order
    records: Vec<SequenceRecord>,
    /// The text exactly as provided; this is what gets handed to the engines
    fasta_text: String
}

impl ValidatedInput {
    pub fn records(&self) -> &[SequenceRecord] {
        &self.records
    }

    pub fn fasta_text(&self) -> &str {
        &self.fasta_text
    }

    /// Sequence IDs in input order
    pub fn ids(&self) -> Vec<String> {
        self.records.iter()
            .map(|r| r.id().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Validates FASTA text. Checks run in a fixed order and the first failure is returned:
/// 1. no stray sequence data before the first header, and at least one record
/// 2. every header is non-empty
/// 3. sequence IDs (first header token) are unique
/// 4. no sequence is empty
/// 5. no two records share a sequence
/// 6. at most `MAX_SEQUENCES` records
/// # Arguments
/// * `fasta_text` - the raw input text
/// # Errors
/// * the `InputError` for the first failed check
pub fn validate_fasta(fasta_text: &str) -> Result<ValidatedInput, InputError> {
    let parsed = parse_fasta(fasta_text);
    if parsed.leading_lines() > 0 {
        return Err(InputError::SequenceBeforeHeader { lines: parsed.leading_lines() });
    }
    if parsed.is_empty() {
        return Err(InputError::NoSequences);
    }
    let entries = parsed.into_entries();

    if entries.iter().any(|e| e.header.is_empty()) {
        return Err(InputError::InvalidHeader);
    }

    let mut seen_ids: HashSet<&str> = Default::default();
    for entry in entries.iter() {
        let id = sequence_id(&entry.header);
        if !seen_ids.insert(id) {
            return Err(InputError::DuplicateId { id: id.to_string() });
        }
    }

    if let Some(entry) = entries.iter().find(|e| e.sequence.is_empty()) {
        return Err(InputError::EmptySequence { header: entry.header.clone() });
    }

    let mut seen_sequences: HashMap<&str, &str> = Default::default();
    for entry in entries.iter() {
        if let Some(first_header) = seen_sequences.insert(&entry.sequence, &entry.header) {
            return Err(InputError::DuplicateSequence {
                header: entry.header.clone(),
                first_header: first_header.to_string()
            });
        }
    }

    if entries.len() > MAX_SEQUENCES {
        return Err(InputError::TooManySequences { count: entries.len(), max: MAX_SEQUENCES });
    }

    let records: Vec<SequenceRecord> = entries.into_iter()
        .map(|e| SequenceRecord::new(sequence_id(&e.header).to_string(), e.header, e.sequence))
        .collect();
    debug!("Validated IDs: {:?}", records.iter().map(|r| r.id()).collect::<Vec<_>>());
    info!("Input contains {} valid sequences (max: {MAX_SEQUENCES})", records.len());

    Ok(ValidatedInput {
        records,
        fasta_text: fasta_text.to_string()
    })
}

/// Joins the contents of several FASTA files, each followed by a newline.
pub fn combine_fasta_texts<I, S>(texts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>
{
    let mut combined = String::new();
    for text in texts {
        combined.push_str(text.as_ref());
        combined.push('\n');
    }
    combined
}
