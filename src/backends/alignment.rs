
use derive_builder::Builder;
use log::{debug, info, warn};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use crate::backends::BackendError;
use crate::backends::datasets::DatasetCatalog;
use crate::backends::process::run_command;
use crate::data_types::methods::CutoffMode;
use crate::data_types::reference_dataset::ReferenceDataset;
use crate::parsing::validation::ValidatedInput;

/// Lowest single cutoff a user may choose
pub const MIN_CUTOFF: f64 = 0.90;
/// Highest single cutoff a user may choose
pub const MAX_CUTOFF: f64 = 1.0;
/// Default single cutoff
pub const DEFAULT_CUTOFF: f64 = 0.97;
/// Default rank passed to the classify phase
pub const DEFAULT_RANK: &str = "species";

const BESTMATCH_SUFFIX: &str = ".bestmatch";
const CLASSIFIED_SUFFIX: &str = ".classified";
const VISUALIZATION_SUFFIX: &str = ".krona.html";

/// Where to find the classifier and its reference data
#[derive(Builder, Clone, Debug)]
#[builder(default)]
pub struct AlignmentConfig {
    /// Program used to run the classifier script
    interpreter: String,
    /// The classifier entry point
    script: PathBuf,
    /// Data directory; datasets live in its `dnabarcoder` sub-folder
    data_dir: PathBuf
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            interpreter: "python".to_string(),
            script: PathBuf::from("dnabarcoder/dnabarcoder.py"),
            data_dir: PathBuf::from("data")
        }
    }
}

/// User parameters for the classify phase
#[derive(Builder, Clone, Debug, PartialEq, Serialize)]
#[builder(default)]
pub struct ClassifyParams {
    /// Per-taxon cutoffs from the dataset, or one cutoff for everything
    cutoff_mode: CutoffMode,
    /// The single cutoff; required in single mode
    cutoff: Option<f64>,
    /// Rank to classify at
    rank: String,
    /// Optional confidence threshold
    confidence: Option<f64>
}

impl Default for ClassifyParams {
    fn default() -> Self {
        Self {
            cutoff_mode: CutoffMode::Local,
            cutoff: None,
            rank: DEFAULT_RANK.to_string(),
            confidence: None
        }
    }
}

impl ClassifyParams {
    pub fn cutoff_mode(&self) -> CutoffMode {
        self.cutoff_mode
    }

    pub fn cutoff(&self) -> Option<f64> {
        self.cutoff
    }

    pub fn rank(&self) -> &str {
        &self.rank
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    /// Rejects parameters the classifier must never be launched with.
    /// # Errors
    /// * in single mode, if the cutoff is missing or outside `[MIN_CUTOFF, MAX_CUTOFF]`
    pub fn check(&self) -> Result<(), BackendError> {
        if self.cutoff_mode == CutoffMode::Single {
            match self.cutoff {
                Some(c) if (MIN_CUTOFF..=MAX_CUTOFF).contains(&c) => {},
                value => return Err(BackendError::InvalidCutoff { value, min: MIN_CUTOFF, max: MAX_CUTOFF })
            }
        }
        Ok(())
    }

    /// One-line summary shown above the results, e.g. "Classification parameters: Method: Single, Similarity cutoff: 0.970"
    pub fn caption(&self) -> String {
        let mode = match self.cutoff_mode {
            CutoffMode::Local => "Local",
            CutoffMode::Single => "Single"
        };
        let mut parts = vec![format!("Method: {mode}")];
        if let Some(cutoff) = self.cutoff {
            parts.push(format!("Similarity cutoff: {cutoff:.3}"));
        }
        format!("Classification parameters: {}", parts.join(", "))
    }
}

/// Files produced by the classify phase
#[derive(Clone, Debug)]
struct ClassifyArtifacts {
    classified: PathBuf,
    visualization: Option<PathBuf>
}

/// Result of one alignment classification request.
/// Owns the working directory; the result files are deleted when this is dropped.
#[derive(Debug)]
pub struct AlignmentOutcome {
    work_dir: TempDir,
    classified_path: PathBuf,
    visualization_path: Option<PathBuf>,
    dataset: ReferenceDataset,
    params: ClassifyParams
}

impl AlignmentOutcome {
    pub fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    pub fn classified_path(&self) -> &Path {
        &self.classified_path
    }

    pub fn visualization_path(&self) -> Option<&Path> {
        self.visualization_path.as_deref()
    }

    pub fn dataset(&self) -> &ReferenceDataset {
        &self.dataset
    }

    pub fn params(&self) -> &ClassifyParams {
        &self.params
    }
}

/// Drives the alignment-based classifier through its `search` and `classify` phases
#[derive(Clone, Debug)]
pub struct AlignmentClassifier {
    config: AlignmentConfig,
    catalog: DatasetCatalog
}

impl AlignmentClassifier {
    /// Creates the classifier wrapper.
    /// # Errors
    /// * if the data directory does not exist
    pub fn new(config: AlignmentConfig) -> Result<Self, BackendError> {
        if !config.data_dir.is_dir() {
            return Err(BackendError::MissingDataDir(config.data_dir.clone()));
        }
        let catalog = DatasetCatalog::new(&config.data_dir);
        Ok(Self { config, catalog })
    }

    pub fn catalog(&self) -> &DatasetCatalog {
        &self.catalog
    }

    fn base_command(&self, subcommand: &str) -> Command {
        let mut cmd = Command::new(&self.config.interpreter);
        cmd.arg(&self.config.script).arg(subcommand);
        cmd
    }

    /// Search phase: finds the best reference match for every query.
    /// Returns the best-match file, preferring the name the classifier normally writes.
    /// # Arguments
    /// * `query` - query FASTA
    /// * `dataset` - reference dataset to search against
    /// * `work_dir` - output directory for the classifier
    /// # Errors
    /// * if the classifier cannot be launched
    /// * if it exits with a non-zero code, or writes no `.bestmatch` file
    pub fn search(&self, query: &Path, dataset: &ReferenceDataset, work_dir: &Path) -> Result<PathBuf, BackendError> {
        let min_length = dataset.min_alignment_length();
        info!("Searching against {} (minimum alignment length {min_length})...", dataset.display_name());

        let mut cmd = self.base_command("search");
        cmd.arg("-i").arg(query)
            .arg("-r").arg(dataset.reference_fasta())
            .arg("-ml").arg(min_length.to_string())
            .arg("-o").arg(work_dir);
        let output = run_command(&mut cmd, "Running alignment search...")?;
        if !output.success() {
            return Err(BackendError::SearchFailed(output.failure_message()));
        }

        let expected = work_dir.join(expected_bestmatch_name(query, dataset.reference_fasta()));
        if expected.exists() {
            return Ok(expected);
        }
        match find_by_suffix(work_dir, BESTMATCH_SUFFIX)? {
            Some(path) => {
                debug!("Expected {expected:?} not found, using {path:?}");
                Ok(path)
            },
            None => Err(BackendError::SearchFailed(format!("no {BESTMATCH_SUFFIX} file found in {work_dir:?}")))
        }
    }

    /// Classify phase: assigns taxonomy from the best matches.
    /// # Errors
    /// * if the classifier cannot be launched
    /// * if it exits with a non-zero code, or writes no `.classified` file
    fn classify(&self, bestmatch: &Path, dataset: &ReferenceDataset, params: &ClassifyParams, work_dir: &Path) -> Result<ClassifyArtifacts, BackendError> {
        info!("Classifying best matches ({})...", params.caption());

        let mut cmd = self.base_command("classify");
        cmd.arg("-i").arg(bestmatch)
            .arg("-c").arg(dataset.classification())
            .arg("-o").arg(work_dir);
        match (params.cutoff_mode, params.cutoff) {
            (CutoffMode::Single, Some(cutoff)) => {
                cmd.arg("-cutoff").arg(cutoff.to_string());
            },
            _ => {
                cmd.arg("-cutoffs").arg(dataset.cutoffs());
            }
        }
        if !params.rank.is_empty() {
            cmd.arg("-rank").arg(&params.rank);
        }
        if let Some(confidence) = params.confidence {
            cmd.arg("-confidence").arg(confidence.to_string());
        }

        let output = run_command(&mut cmd, "Running classification...")?;
        if !output.success() {
            return Err(BackendError::ClassifyFailed(output.failure_message()));
        }

        let classified = find_by_suffix(work_dir, CLASSIFIED_SUFFIX)?
            .ok_or_else(|| BackendError::ClassifyFailed(format!("no {CLASSIFIED_SUFFIX} file found in {work_dir:?}")))?;
        let visualization = find_by_suffix(work_dir, VISUALIZATION_SUFFIX)?;
        if visualization.is_none() {
            debug!("No visualization file was produced");
        }
        Ok(ClassifyArtifacts { classified, visualization })
    }

    /// Runs search and classify for one request in a fresh working directory.
    /// # Arguments
    /// * `input` - validated sequences
    /// * `dataset_id` - reference dataset ID
    /// * `params` - classify phase parameters
    /// # Errors
    /// * if the parameters are invalid; nothing is launched in that case
    /// * if the dataset cannot be resolved
    /// * if either phase fails
    pub fn run_classification(&self, input: &ValidatedInput, dataset_id: &str, params: &ClassifyParams) -> Result<AlignmentOutcome, BackendError> {
        params.check()?;
        let dataset = self.catalog.get(dataset_id)?;

        let work_dir = tempfile::Builder::new()
            .prefix("dnabarcoder_")
            .tempdir()?;
        debug!("Working directory: {:?}", work_dir.path());

        let bestmatch = {
            // the query file only needs to live through the search phase
            let mut query_file = tempfile::Builder::new()
                .prefix("mycoid_query_")
                .suffix(".fasta")
                .tempfile()?;
            query_file.write_all(input.fasta_text().as_bytes())?;
            query_file.flush()?;
            self.search(query_file.path(), &dataset, work_dir.path())?
        };

        let artifacts = self.classify(&bestmatch, &dataset, params, work_dir.path())?;
        info!("Classification written to {:?}", artifacts.classified);
        if let Some(path) = artifacts.visualization.as_ref() {
            info!("Visualization written to {path:?}");
        } else {
            warn!("The classifier did not produce a visualization");
        }

        Ok(AlignmentOutcome {
            work_dir,
            classified_path: artifacts.classified,
            visualization_path: artifacts.visualization,
            dataset,
            params: params.clone()
        })
    }
}

/// Name the search phase gives its output: `<query>.<reference without .fasta>_BLAST.bestmatch`
pub fn expected_bestmatch_name(query: &Path, reference: &Path) -> String {
    let query_name = query.file_name().unwrap_or_default().to_string_lossy();
    let reference_name = reference.file_name().unwrap_or_default().to_string_lossy();
    format!("{query_name}.{}_BLAST{BESTMATCH_SUFFIX}", reference_name.replace(".fasta", ""))
}

/// First file (by name) in `dir` whose name ends with `suffix`.
fn find_by_suffix(dir: &Path, suffix: &str) -> Result<Option<PathBuf>, BackendError> {
    let mut matches: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.file_name().is_some_and(|n| n.to_string_lossy().ends_with(suffix)))
        .collect();
    matches.sort();
    Ok(matches.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::parsing::validation::validate_fasta;

    fn mock_classifier() -> AlignmentClassifier {
        let config = AlignmentConfigBuilder::default()
            .interpreter("sh".to_string())
            .script(PathBuf::from("test_data/mock_dnabarcoder.sh"))
            .data_dir(PathBuf::from("test_data/datasets"))
            .build().unwrap();
        AlignmentClassifier::new(config).unwrap()
    }

    fn single(cutoff: Option<f64>) -> ClassifyParams {
        ClassifyParamsBuilder::default()
            .cutoff_mode(CutoffMode::Single)
            .cutoff(cutoff)
            .build().unwrap()
    }

    fn read_args(outcome: &AlignmentOutcome, phase: &str) -> String {
        std::fs::read_to_string(outcome.work_dir().join(format!("{phase}.args"))).unwrap()
    }

    #[test]
    fn test_local_mode_run() {
        let classifier = mock_classifier();
        let input = validate_fasta(">seq1 first\nACGT\n>seq2\nTTGA\n").unwrap();
        let outcome = classifier.run_classification(&input, "UNITE2024ITS1", &ClassifyParams::default()).unwrap();

        assert!(outcome.classified_path().exists());
        assert!(outcome.classified_path().to_string_lossy().ends_with("_BLAST.classified"));
        assert!(outcome.visualization_path().unwrap().exists());
        assert_eq!(outcome.dataset().id(), "UNITE2024ITS1");

        let search_args = read_args(&outcome, "search");
        assert!(search_args.contains("-ml 50"));
        assert!(search_args.contains("unite2024ITS1.fasta"));

        let classify_args = read_args(&outcome, "classify");
        assert!(classify_args.contains("-cutoffs test_data/datasets/dnabarcoder/UNITE2024ITS1/unite2024ITS1.unique.cutoffs.best.json"));
        assert!(classify_args.contains("-rank species"));
        assert!(!classify_args.contains("-confidence"));

        // the working directory goes away with the outcome
        let work_dir = outcome.work_dir().to_path_buf();
        drop(outcome);
        assert!(!work_dir.exists());
    }

    #[test]
    fn test_single_mode_run() {
        let classifier = mock_classifier();
        let input = validate_fasta(">seq1\nACGT\n").unwrap();
        let params = ClassifyParamsBuilder::default()
            .cutoff_mode(CutoffMode::Single)
            .cutoff(Some(0.97))
            .rank("genus".to_string())
            .confidence(Some(0.8))
            .build().unwrap();
        let outcome = classifier.run_classification(&input, "CBSITS", &params).unwrap();

        let classify_args = read_args(&outcome, "classify");
        assert!(classify_args.contains("-cutoff 0.97"));
        assert!(!classify_args.contains("-cutoffs"));
        assert!(classify_args.contains("-rank genus"));
        assert!(classify_args.contains("-confidence 0.8"));
        assert!(read_args(&outcome, "search").contains("-ml 400"));
        assert_eq!(outcome.params(), &params);
    }

    #[test]
    fn test_cutoff_validation() {
        assert!(matches!(single(Some(0.85)).check(), Err(BackendError::InvalidCutoff { .. })));
        assert!(matches!(single(Some(1.01)).check(), Err(BackendError::InvalidCutoff { .. })));
        assert!(matches!(single(None).check(), Err(BackendError::InvalidCutoff { value: None, .. })));
        assert!(single(Some(0.97)).check().is_ok());
        assert!(single(Some(0.90)).check().is_ok());

        // local mode ignores the single cutoff
        let local = ClassifyParamsBuilder::default().cutoff(Some(0.5)).build().unwrap();
        assert!(local.check().is_ok());
    }

    #[test]
    fn test_invalid_cutoff_not_launched() {
        // a missing script would fail at launch, so reaching InvalidCutoff proves nothing ran
        let config = AlignmentConfigBuilder::default()
            .interpreter("this-program-does-not-exist-mycoid".to_string())
            .data_dir(PathBuf::from("test_data/datasets"))
            .build().unwrap();
        let classifier = AlignmentClassifier::new(config).unwrap();
        let input = validate_fasta(">seq1\nACGT\n").unwrap();
        let result = classifier.run_classification(&input, "CBSITS", &single(Some(0.85)));
        assert!(matches!(result, Err(BackendError::InvalidCutoff { .. })));
    }

    #[test]
    fn test_search_failures() {
        let classifier = mock_classifier();
        let params = ClassifyParams::default();

        let input = validate_fasta(">FAIL_SEARCH\nACGT\n").unwrap();
        match classifier.run_classification(&input, "CBSITS", &params) {
            Err(BackendError::SearchFailed(message)) => assert!(message.contains("BLAST database could not be built")),
            other => panic!("unexpected result: {other:?}")
        }

        let input = validate_fasta(">NO_BESTMATCH\nACGT\n").unwrap();
        let result = classifier.run_classification(&input, "CBSITS", &params);
        assert!(matches!(result, Err(BackendError::SearchFailed(_))));

        // unexpected file names are still picked up
        let input = validate_fasta(">ODD_NAME\nACGT\n").unwrap();
        let outcome = classifier.run_classification(&input, "CBSITS", &params).unwrap();
        assert!(outcome.classified_path().ends_with("renamed.classified"));
    }

    #[test]
    fn test_classify_failures() {
        let classifier = mock_classifier();
        let params = ClassifyParams::default();

        let input = validate_fasta(">FAIL_CLASSIFY\nACGT\n").unwrap();
        match classifier.run_classification(&input, "CBSITS", &params) {
            Err(BackendError::ClassifyFailed(message)) => assert!(message.starts_with("exit code 3")),
            other => panic!("unexpected result: {other:?}")
        }

        let input = validate_fasta(">NO_CLASSIFIED\nACGT\n").unwrap();
        let result = classifier.run_classification(&input, "CBSITS", &params);
        assert!(matches!(result, Err(BackendError::ClassifyFailed(_))));

        // the visualization is optional
        let input = validate_fasta(">NO_KRONA\nACGT\n").unwrap();
        let outcome = classifier.run_classification(&input, "CBSITS", &params).unwrap();
        assert!(outcome.visualization_path().is_none());
    }

    #[test]
    fn test_dataset_errors() {
        let classifier = mock_classifier();
        let input = validate_fasta(">seq1\nACGT\n").unwrap();
        let result = classifier.run_classification(&input, "unknown", &ClassifyParams::default());
        assert!(matches!(result, Err(BackendError::DatasetNotFound { .. })));

        let config = AlignmentConfigBuilder::default()
            .data_dir(PathBuf::from("test_data/does_not_exist"))
            .build().unwrap();
        assert!(matches!(AlignmentClassifier::new(config), Err(BackendError::MissingDataDir(_))));
    }

    #[test]
    fn test_expected_bestmatch_name() {
        let name = expected_bestmatch_name(Path::new("/tmp/query_x.fasta"), Path::new("data/dnabarcoder/CBSITS/CBSITS.fasta"));
        assert_eq!(name, "query_x.fasta.CBSITS_BLAST.bestmatch");
    }

    #[test]
    fn test_caption() {
        assert_eq!(single(Some(0.97)).caption(), "Classification parameters: Method: Single, Similarity cutoff: 0.970");
        assert_eq!(ClassifyParams::default().caption(), "Classification parameters: Method: Local");
    }
}
