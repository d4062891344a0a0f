
use derive_builder::Builder;
use log::{debug, info};
use std::io::Write;
use std::path::Path;
use std::process::Command;

use crate::backends::BackendError;
use crate::backends::process::run_command;
use crate::data_types::methods::EmbeddingModel;
use crate::data_types::similarity::SimilarityResults;
use crate::parsing::validation::ValidatedInput;

/// Smallest number of matches a user may request per sequence
pub const MIN_TOP_N: usize = 1;
/// Largest number of matches a user may request per sequence
pub const MAX_TOP_N: usize = 5;
/// Default number of matches per sequence
pub const DEFAULT_TOP_N: usize = 2;

/// An embedding similarity engine: matches every sequence in a FASTA file against a reference embedding set
pub trait SimilaritySearch {
    /// Returns up to `limit` ranked matches per sequence and taxonomic level.
    /// # Arguments
    /// * `fasta` - path to the query FASTA file
    /// * `model` - the embedding model to search with
    /// * `limit` - maximum matches per sequence
    fn search(&self, fasta: &Path, model: EmbeddingModel, limit: usize) -> Result<SimilarityResults, BackendError>;
}

/// Configuration for the command line similarity engine
#[derive(Builder, Clone, Debug, Default)]
#[builder(default)]
pub struct SimilarityConfig {
    /// Program implementing `search <fasta> --model <id> --limit <n>`, printing JSON on stdout
    program: String,
    /// Extra arguments placed before the `search` subcommand
    base_args: Vec<String>
}

/// Runs the similarity engine as an external program
#[derive(Clone, Debug)]
pub struct CommandSimilaritySearch {
    config: SimilarityConfig
}

impl CommandSimilaritySearch {
    pub fn new(config: SimilarityConfig) -> Self {
        Self { config }
    }
}

impl SimilaritySearch for CommandSimilaritySearch {
    fn search(&self, fasta: &Path, model: EmbeddingModel, limit: usize) -> Result<SimilarityResults, BackendError> {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.base_args)
            .arg("search")
            .arg(fasta)
            .args(["--model", &model.to_string()])
            .args(["--limit", &limit.to_string()]);

        let output = run_command(&mut cmd, "Running similarity search...")?;
        if !output.success() {
            return Err(BackendError::EngineFailed(output.failure_message()));
        }

        serde_json::from_str(&output.stdout)
            .map_err(|e| BackendError::EngineFailed(format!("unparseable engine output: {e}")))
    }
}

/// Checks that a top-N value is in the supported range.
/// # Errors
/// * if `top_n` is outside `MIN_TOP_N..=MAX_TOP_N`
pub fn check_top_n(top_n: usize) -> Result<(), BackendError> {
    if (MIN_TOP_N..=MAX_TOP_N).contains(&top_n) {
        Ok(())
    } else {
        Err(BackendError::InvalidTopN { value: top_n, min: MIN_TOP_N, max: MAX_TOP_N })
    }
}

/// Runs one similarity search request against an engine.
/// The input is written to a temporary FASTA file that is removed on every exit path.
/// # Arguments
/// * `engine` - the similarity engine to call
/// * `input` - validated sequences
/// * `model` - embedding model
/// * `top_n` - matches per sequence, 1 to 5
/// # Errors
/// * if `top_n` is out of range
/// * if the temporary file cannot be written
/// * if the engine fails, or answers for a different number of sequences
pub fn run_similarity_search(engine: &dyn SimilaritySearch, input: &ValidatedInput, model: EmbeddingModel, top_n: usize) -> Result<SimilarityResults, BackendError> {
    check_top_n(top_n)?;

    let mut fasta_file = tempfile::Builder::new()
        .prefix("mycoid_query_")
        .suffix(".fasta")
        .tempfile()?;
    fasta_file.write_all(input.fasta_text().as_bytes())?;
    fasta_file.flush()?;
    debug!("Wrote query FASTA to {:?}", fasta_file.path());

    info!("Searching {} sequences with {model}, top {top_n} matches...", input.len());
    let results = engine.search(fasta_file.path(), model, top_n)?;

    let found = results.query_count();
    if found != input.len() {
        return Err(BackendError::ResultCountMismatch { expected: input.len(), found });
    }
    Ok(results)
}
