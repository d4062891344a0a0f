
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::util::json_io::load_json;

/// Minimum alignment length for full-length ITS datasets
pub const DEFAULT_MIN_ALIGNMENT_LENGTH: usize = 400;
/// Minimum alignment length for single-region (ITS1 / ITS2) datasets
pub const SHORT_REGION_MIN_ALIGNMENT_LENGTH: usize = 50;

/// Returns the minimum alignment length the search phase should use for a dataset.
/// # Arguments
/// * `dataset_id` - the dataset identifier, e.g. "unite2024ITS1"
pub fn min_alignment_length(dataset_id: &str) -> usize {
    if dataset_id.contains("ITS1") || dataset_id.contains("ITS2") {
        SHORT_REGION_MIN_ALIGNMENT_LENGTH
    } else {
        DEFAULT_MIN_ALIGNMENT_LENGTH
    }
}

/// A named reference dataset and the three files that back it
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReferenceDataset {
    /// Directory name under the dataset root
    id: String,
    /// Human readable name
    display_name: String,
    /// Reference sequences (FASTA)
    reference_fasta: PathBuf,
    /// Reference ID -> taxonomy table (TSV)
    classification: PathBuf,
    /// Per-rank cutoff table (JSON)
    cutoffs: PathBuf
}

impl ReferenceDataset {
    pub fn new(id: String, reference_fasta: PathBuf, classification: PathBuf, cutoffs: PathBuf) -> Self {
        let display_name = display_name(&id);
        Self {
            id, display_name,
            reference_fasta, classification, cutoffs
        }
    }

    // getters
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn reference_fasta(&self) -> &Path {
        &self.reference_fasta
    }

    pub fn classification(&self) -> &Path {
        &self.classification
    }

    pub fn cutoffs(&self) -> &Path {
        &self.cutoffs
    }

    pub fn min_alignment_length(&self) -> usize {
        min_alignment_length(&self.id)
    }
}

/// Formats a dataset directory name for display.
pub fn display_name(id: &str) -> String {
    if let Some(region) = id.strip_prefix("UNITE2024") {
        format!("UNITE 2024 {region}")
    } else if id == "CBSITS" {
        "CBS ITS".to_string()
    } else {
        id.to_string()
    }
}

/// Contents of a dataset cutoff file; only the `cut-off` mapping is used
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct CutoffTable {
    /// Rank name -> similarity threshold
    #[serde(rename = "cut-off")]
    pub cut_off: IndexMap<String, f64>
}

impl CutoffTable {
    /// Loads a cutoff table from JSON.
    /// # Errors
    /// * if the file cannot be opened
    /// * if the top level has no `cut-off` mapping of rank -> number
    pub fn from_json(filename: &Path) -> anyhow::Result<Self> {
        load_json(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;

    #[test]
    fn test_min_alignment_length() {
        assert_eq!(min_alignment_length("unite2024ITS1"), 50);
        assert_eq!(min_alignment_length("UNITE2024ITS2"), 50);
        assert_eq!(min_alignment_length("unite2024ITS"), 400);
        assert_eq!(min_alignment_length("CBSITS"), 400);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(display_name("UNITE2024ITS1"), "UNITE 2024 ITS1");
        assert_eq!(display_name("CBSITS"), "CBS ITS");
        assert_eq!(display_name("custom"), "custom");
    }

    #[test]
    fn test_cutoff_table() {
        let table = CutoffTable::from_json(Path::new("test_data/datasets/dnabarcoder/UNITE2024ITS1/unite2024ITS1.unique.cutoffs.best.json")).unwrap();
        assert_eq!(table.cut_off.len(), 3);
        assert_approx_eq!(table.cut_off["species"], 0.985);
        assert_eq!(table.cut_off.keys().next().unwrap(), "species");
    }

    #[test]
    fn test_cutoff_table_missing_key() {
        let result = CutoffTable::from_json(Path::new("test_data/bad_cutoffs.json"));
        assert!(result.is_err());
    }
}
