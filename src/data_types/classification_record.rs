
use indexmap::IndexMap;

use crate::data_types::taxonomy::{Taxonomy, TaxonomyLevel};

/// Columns shown in the results table, in order
pub const DISPLAY_COLUMNS: [&str; 11] = [
    "kingdom", "phylum", "class", "order", "family", "genus", "species",
    "rank", "score", "cutoff", "confidence"
];

/// One normalized row: a (sequence, predicted taxon) pair from the alignment classifier.
/// Missing text is always the empty string, missing numbers are `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassificationRecord {
    /// Query identifier; may be empty until display preparation resolves it
    pub sequence_id: String,
    /// Identifier of the best-matching reference sequence
    pub reference_id: String,
    /// Kingdom through species
    pub taxonomy: Taxonomy,
    /// Deepest rank the classifier committed to
    pub rank: String,
    /// Similarity of the best match
    pub score: Option<f64>,
    /// Similarity cutoff applied at the assigned rank
    pub cutoff: Option<f64>,
    /// Confidence of the assignment at the applied cutoff
    pub confidence: Option<f64>,
    /// Any non-canonical columns from the raw output, by original header
    pub extra: IndexMap<String, String>
}

impl ClassificationRecord {
    /// Part of the sequence ID before the first `|`; UNITE-style IDs carry taxonomy after it.
    pub fn display_id(&self) -> &str {
        self.sequence_id.split('|').next().unwrap_or_default()
    }

    /// Returns the text of a canonical column, numbers rendered with up to 4 decimals.
    /// Unknown column names return None.
    pub fn column_value(&self, column: &str) -> Option<String> {
        let value = match column {
            "Sequence_ID" => self.sequence_id.clone(),
            "ReferenceID" => self.reference_id.clone(),
            "rank" => self.rank.clone(),
            "score" => format_optional(self.score),
            "cutoff" => format_optional(self.cutoff),
            "confidence" => format_optional(self.confidence),
            other => {
                let level: TaxonomyLevel = other.parse().ok()?;
                self.taxonomy.get(level).to_string()
            }
        };
        Some(value)
    }
}

/// Formats an optional number; missing values become an empty cell.
pub fn format_optional(value: Option<f64>) -> String {
    match value {
        Some(v) => {
            let formatted = format!("{v:.4}");
            // trim the padding so 0.97 stays "0.97"
            let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
            if trimmed.is_empty() || trimmed == "-" { "0".to_string() } else { trimmed.to_string() }
        },
        None => String::new()
    }
}
