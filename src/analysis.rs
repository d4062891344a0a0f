/*!
# Analysis
One analysis request from validated input to normalized records.
All request state lives in an `AnalysisContext` that is threaded through validation, invocation, and normalization.
*/
use log::info;

use crate::backends::BackendError;
use crate::backends::alignment::{AlignmentClassifier, AlignmentOutcome, ClassifyParams};
use crate::backends::similarity::{run_similarity_search, SimilaritySearch};
use crate::data_types::methods::{EmbeddingModel, Method};
use crate::data_types::similarity::{FlatMatchRecord, SimilarityResults};
use crate::normalize::alignment::parse_classification_result;
use crate::normalize::display::{prepare_for_display, DisplayTable};
use crate::normalize::similarity::flatten_similarity_results;
use crate::parsing::validation::{validate_fasta, InputError, ValidatedInput};

/// Method-specific parameters of a request
#[derive(Clone, Debug, PartialEq)]
pub enum MethodParams {
    /// Embedding similarity search
    Similarity { model: EmbeddingModel, top_n: usize },
    /// Alignment classification against a reference dataset
    Alignment { dataset: String, params: ClassifyParams },
    /// A method that is offered but has no backend yet
    Unimplemented(Method)
}

impl MethodParams {
    pub fn method(&self) -> Method {
        match self {
            MethodParams::Similarity { .. } => Method::Taxotagger,
            MethodParams::Alignment { .. } => Method::Dnabarcoder,
            MethodParams::Unimplemented(method) => *method
        }
    }
}

/// Everything one request needs; only constructible from input that passed validation
#[derive(Clone, Debug)]
pub struct AnalysisContext {
    input: ValidatedInput,
    params: MethodParams
}

impl AnalysisContext {
    /// Validates the input and binds it to the method parameters.
    /// # Errors
    /// * the first `InputError` found in the FASTA text
    pub fn new(fasta_text: &str, params: MethodParams) -> Result<Self, InputError> {
        let input = validate_fasta(fasta_text)?;
        Ok(Self { input, params })
    }

    pub fn input(&self) -> &ValidatedInput {
        &self.input
    }

    pub fn params(&self) -> &MethodParams {
        &self.params
    }

    pub fn method(&self) -> Method {
        self.params.method()
    }
}

/// The backends available to this process; a request fails if its method's backend is missing
#[derive(Clone, Copy, Default)]
pub struct Backends<'a> {
    pub similarity: Option<&'a dyn SimilaritySearch>,
    pub alignment: Option<&'a AlignmentClassifier>
}

/// Normalized result of one request
#[derive(Debug)]
pub enum AnalysisResult {
    Similarity {
        /// Raw engine output, kept for the JSON export
        raw: SimilarityResults,
        /// One record per sequence and match position
        matches: Vec<FlatMatchRecord>
    },
    Alignment {
        /// Result files and their working directory
        outcome: AlignmentOutcome,
        /// Canonical records prepared for display
        table: DisplayTable
    }
}

impl AnalysisResult {
    pub fn method(&self) -> Method {
        match self {
            AnalysisResult::Similarity { .. } => Method::Taxotagger,
            AnalysisResult::Alignment { .. } => Method::Dnabarcoder
        }
    }
}

/// Runs the request's backend and normalizes what it returns.
/// # Arguments
/// * `context` - the validated request
/// * `backends` - engines that may be called
/// # Errors
/// * if the method is not implemented, or its backend is not configured
/// * if the backend fails or returns inconsistent results
pub fn run_analysis(context: &AnalysisContext, backends: &Backends) -> Result<AnalysisResult, BackendError> {
    let method = context.method();
    let sequence_ids = context.input().ids();

    match context.params() {
        MethodParams::Unimplemented(method) => {
            Err(BackendError::MethodNotImplemented(*method))
        },
        MethodParams::Similarity { model, top_n } => {
            let engine = backends.similarity.ok_or(BackendError::BackendUnavailable(method))?;
            let raw = run_similarity_search(engine, context.input(), *model, *top_n)?;
            let matches = flatten_similarity_results(&raw, &sequence_ids, *top_n)?;
            info!("Similarity search returned {} match records", matches.len());
            Ok(AnalysisResult::Similarity { raw, matches })
        },
        MethodParams::Alignment { dataset, params } => {
            let classifier = backends.alignment.ok_or(BackendError::BackendUnavailable(method))?;
            let outcome = classifier.run_classification(context.input(), dataset, params)?;

            let records = parse_classification_result(outcome.classified_path())?;
            let table = prepare_for_display(records, &sequence_ids);
            info!("Classification returned {} rows for {} sequences", table.records().len(), table.sequence_ids().len());
            Ok(AnalysisResult::Alignment { outcome, table })
        }
    }
}
