
use log::{debug, warn};
use indexmap::IndexMap;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::backends::BackendError;
use crate::data_types::reference_dataset::{CutoffTable, ReferenceDataset};

/// Sub-folder of the data directory holding one folder per dataset
pub const DATASET_SUBDIR: &str = "dnabarcoder";
/// Reference FASTA files containing this are classification exports, not references
const CLASSIFICATION_FASTA_MARKER: &str = "_classification";
/// Classification header columns that are not taxonomic ranks
const NON_RANK_COLUMNS: [&str; 4] = ["strain number", "id", "strain", "notes"];
/// Used when the classification header cannot be read
const DEFAULT_RANKS: [&str; 6] = ["species", "genus", "family", "order", "class", "phylum"];

/// Summary of a dataset for the user
#[derive(Clone, Debug, Default, Serialize)]
pub struct DatasetInfo {
    pub name: String,
    pub display_name: String,
    /// Number of `>` lines in the reference FASTA
    pub sequence_count: usize,
    pub taxonomic_ranks: Vec<String>,
    /// Rank -> cutoff, empty if the cutoff file is unreadable
    pub cutoffs: IndexMap<String, f64>
}

/// Finds reference datasets under `<data dir>/dnabarcoder/`
#[derive(Clone, Debug)]
pub struct DatasetCatalog {
    root: PathBuf
}

impl DatasetCatalog {
    /// Creates a catalog rooted in the data directory.
    /// # Arguments
    /// * `data_dir` - the top level data directory; datasets live in its `dnabarcoder` sub-folder
    pub fn new(data_dir: &Path) -> Self {
        Self {
            root: data_dir.join(DATASET_SUBDIR)
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns every dataset whose folder holds a reference FASTA, a classification table, and a cutoff JSON.
    /// Results are sorted by display name; a missing root yields an empty list.
    pub fn available_datasets(&self) -> Vec<ReferenceDataset> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(e) => e,
            Err(e) => {
                debug!("Dataset root {:?} is not readable: {e}", self.root);
                return vec![];
            }
        };

        let mut datasets: Vec<ReferenceDataset> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                let id = entry.file_name().to_string_lossy().to_string();
                match self.get(&id) {
                    Ok(dataset) => Some(dataset),
                    Err(e) => {
                        debug!("Skipping dataset {id:?}: {e}");
                        None
                    }
                }
            })
            .collect();
        datasets.sort_by(|a, b| a.display_name().cmp(b.display_name()));
        datasets
    }

    /// Resolves a dataset by ID, locating all three of its files.
    /// # Errors
    /// * if the dataset folder does not exist
    /// * if any of the three files is missing
    pub fn get(&self, id: &str) -> Result<ReferenceDataset, BackendError> {
        let dir = self.root.join(id);
        if !dir.is_dir() {
            return Err(BackendError::DatasetNotFound { id: id.to_string(), path: dir });
        }

        let reference = find_dataset_file(&dir, "fasta", Some(CLASSIFICATION_FASTA_MARKER))?;
        let classification = find_dataset_file(&dir, "classification", None)?;
        let cutoffs = find_dataset_file(&dir, "json", None)?;
        Ok(ReferenceDataset::new(id.to_string(), reference, classification, cutoffs))
    }

    /// Collects the dataset details; unreadable parts are left at their defaults.
    /// # Errors
    /// * if the dataset cannot be resolved
    pub fn info(&self, id: &str) -> Result<DatasetInfo, BackendError> {
        let dataset = self.get(id)?;
        let sequence_count = count_fasta_records(dataset.reference_fasta())
            .unwrap_or_else(|e| {
                warn!("Unable to count sequences in {:?}: {e}", dataset.reference_fasta());
                0
            });
        let taxonomic_ranks = classification_ranks(dataset.classification());
        let cutoffs = match CutoffTable::from_json(dataset.cutoffs()) {
            Ok(table) => table.cut_off,
            Err(e) => {
                warn!("Unable to load cutoffs for {id:?}: {e:#}");
                IndexMap::new()
            }
        };

        Ok(DatasetInfo {
            name: dataset.id().to_string(),
            display_name: dataset.display_name().to_string(),
            sequence_count,
            taxonomic_ranks,
            cutoffs
        })
    }
}

/// Finds the first file (by name) in `dir` with the given extension.
/// If `exclude` is set, files containing it are skipped unless they are the only candidates.
fn find_dataset_file(dir: &Path, extension: &str, exclude: Option<&str>) -> Result<PathBuf, BackendError> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == extension))
        .collect();
    candidates.sort();

    if let Some(pattern) = exclude {
        let preferred = candidates.iter()
            .find(|p| !p.file_name().unwrap_or_default().to_string_lossy().contains(pattern));
        if let Some(path) = preferred {
            return Ok(path.clone());
        }
    }

    if candidates.len() > 1 {
        debug!("Multiple .{extension} files in {dir:?}, using {:?}", candidates[0]);
    }
    candidates.into_iter().next()
        .ok_or_else(|| BackendError::MissingDatasetFile { extension: format!(".{extension}"), dir: dir.to_path_buf() })
}

/// Counts FASTA records by header lines.
fn count_fasta_records(filename: &Path) -> std::io::Result<usize> {
    let reader = BufReader::new(File::open(filename)?);
    let mut count = 0;
    for line in reader.lines() {
        if line?.starts_with('>') {
            count += 1;
        }
    }
    Ok(count)
}

/// Reads the taxonomic rank names from a classification table header.
/// The first column is the reference ID and is skipped.
pub fn classification_ranks(filename: &Path) -> Vec<String> {
    let header = File::open(filename)
        .and_then(|f| {
            let mut line = String::new();
            BufReader::new(f).read_line(&mut line)?;
            Ok(line)
        });

    match header {
        Ok(line) if !line.trim().is_empty() => {
            line.trim_end_matches(&['\r', '\n'][..])
                .split('\t')
                .skip(1)
                .map(|c| c.to_lowercase())
                .filter(|c| !NON_RANK_COLUMNS.contains(&c.as_str()))
                .collect()
        },
        _ => {
            debug!("Unable to read ranks from {filename:?}, using defaults");
            DEFAULT_RANKS.iter().map(|r| r.to_string()).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_catalog() -> DatasetCatalog {
        DatasetCatalog::new(Path::new("test_data/datasets"))
    }

    #[test]
    fn test_available_datasets() {
        let catalog = test_catalog();
        let datasets = catalog.available_datasets();

        // "incomplete" has no cutoff file and is excluded
        let ids: Vec<&str> = datasets.iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["CBSITS", "UNITE2024ITS1"]);
        assert_eq!(datasets[1].display_name(), "UNITE 2024 ITS1");
    }

    #[test]
    fn test_reference_excludes_classification_fasta() {
        let dataset = test_catalog().get("CBSITS").unwrap();
        assert_eq!(dataset.reference_fasta().file_name().unwrap(), "CBSITS.fasta");
        assert_eq!(dataset.classification().file_name().unwrap(), "CBSITS.current.classification");
        assert_eq!(dataset.min_alignment_length(), 400);
    }

    #[test]
    fn test_missing_dataset() {
        let catalog = test_catalog();
        assert!(matches!(catalog.get("nothing_here"), Err(BackendError::DatasetNotFound { .. })));
        assert!(matches!(catalog.get("incomplete"), Err(BackendError::MissingDatasetFile { .. })));
    }

    #[test]
    fn test_missing_root() {
        let catalog = DatasetCatalog::new(Path::new("test_data/does_not_exist"));
        assert!(catalog.available_datasets().is_empty());
    }

    #[test]
    fn test_dataset_info() {
        let info = test_catalog().info("UNITE2024ITS1").unwrap();
        assert_eq!(info.sequence_count, 3);
        assert_eq!(info.taxonomic_ranks, vec!["kingdom", "phylum", "class", "order", "family", "genus", "species"]);
        assert_eq!(info.cutoffs.get("genus"), Some(&0.94));
    }

    #[test]
    fn test_ranks_skip_non_rank_columns() {
        let ranks = classification_ranks(Path::new("test_data/datasets/dnabarcoder/CBSITS/CBSITS.current.classification"));
        assert_eq!(ranks, vec!["phylum", "class", "order", "family", "genus", "species"]);

        let fallback = classification_ranks(Path::new("test_data/does_not_exist.classification"));
        assert_eq!(fallback.len(), 6);
        assert_eq!(fallback[0], "species");
    }
}
