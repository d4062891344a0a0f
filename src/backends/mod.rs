/*!
# Backends module
Adapters around the two external classification engines and the reference datasets they use.
Every call returns the engine's raw artifact; normalization happens elsewhere.
*/
use std::path::PathBuf;

use crate::data_types::methods::Method;

/// The alignment-based classifier, driven as a two-phase external process
pub mod alignment;
/// Discovery and inspection of reference datasets on disk
pub mod datasets;
/// Synchronous external process execution
pub mod process;
/// The embedding similarity search engine
pub mod similarity;

/// Failures while invoking a backend; every one of these ends the request
#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("invalid cutoff value: {value:?}, must be between {min} and {max}")]
    InvalidCutoff { value: Option<f64>, min: f64, max: f64 },
    #[error("invalid top-N value: {value}, must be between {min} and {max}")]
    InvalidTopN { value: usize, min: usize, max: usize },
    #[error("the {0} method is not implemented yet")]
    MethodNotImplemented(Method),
    #[error("no backend configured for the {0} method")]
    BackendUnavailable(Method),
    #[error("data directory does not exist: {0:?}")]
    MissingDataDir(PathBuf),
    #[error("dataset {id:?} not found at {path:?}")]
    DatasetNotFound { id: String, path: PathBuf },
    #[error("no {extension} file found in {dir:?}")]
    MissingDatasetFile { extension: String, dir: PathBuf },
    #[error("failed to launch {program:?}: {source}")]
    CommandLaunch { program: String, source: std::io::Error },
    #[error("failed to prepare working files: {0}")]
    WorkingFiles(#[from] std::io::Error),
    #[error("search failed: {0}")]
    SearchFailed(String),
    #[error("classification failed: {0}")]
    ClassifyFailed(String),
    #[error("similarity engine failed: {0}")]
    EngineFailed(String),
    #[error("mismatch between number of input sequences ({expected}) and results ({found})")]
    ResultCountMismatch { expected: usize, found: usize },
    #[error("could not read result file {path:?}: {message}")]
    ResultParse { path: PathBuf, message: String },
}
