
use anyhow::{ensure, Context};
use clap::Args;
use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::analysis::MethodParams;
use crate::backends::alignment::ClassifyParamsBuilder;
use crate::backends::similarity::check_top_n;
use crate::cli::core::{check_required_filename, resolve_data_dir, AFTER_HELP, DATA_DIR_ENV, DEFAULT_DATA_DIR, FULL_VERSION};
use crate::data_types::methods::{CutoffMode, EmbeddingModel, Method};
use crate::parsing::validation::combine_fasta_texts;

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct ClassifySettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    mycoid_version: String,

    /// Input FASTA file(s), concatenated in the given order
    #[clap(short = 'i')]
    #[clap(long = "input")]
    #[clap(value_name = "FASTA")]
    #[clap(help_heading = Some("Input/Output"))]
    pub input_filenames: Vec<PathBuf>,

    /// FASTA text given directly instead of input files
    #[clap(long = "fasta-text")]
    #[clap(value_name = "TEXT")]
    #[clap(help_heading = Some("Input/Output"))]
    pub fasta_text: Option<String>,

    /// Output folder for the results tables and archives
    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-dir")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_folder: PathBuf,

    /// Data folder holding the reference datasets [default: $MYCOAI_HOME, then "data"]
    #[clap(long = "data-dir")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub data_dir: Option<PathBuf>,

    /// Only show the results of this sequence in the log output
    #[clap(long = "sequence")]
    #[clap(value_name = "ID")]
    #[clap(help_heading = Some("Input/Output"))]
    pub display_sequence: Option<String>,

    /// Identification method
    #[clap(short = 'm')]
    #[clap(long = "method")]
    #[clap(value_name = "METHOD")]
    #[clap(default_value = "taxotagger")]
    #[clap(help_heading = Some("Method"))]
    pub method: Method,

    /// Embedding model for the similarity search
    #[clap(long = "model")]
    #[clap(value_name = "MODEL")]
    #[clap(default_value = "MycoAI-CNN")]
    #[clap(help_heading = Some("Similarity search"))]
    pub model: EmbeddingModel,

    /// Number of top matches to report per sequence (1-5)
    #[clap(long = "top-n")]
    #[clap(value_name = "N")]
    #[clap(default_value = "2")]
    #[clap(help_heading = Some("Similarity search"))]
    pub top_n: usize,

    /// Program implementing the similarity search command line
    #[clap(long = "search-command")]
    #[clap(value_name = "PROGRAM")]
    #[clap(default_value = "taxotagger")]
    #[clap(help_heading = Some("Similarity search"))]
    pub search_command: String,

    /// Reference dataset ID, see the `datasets` subcommand
    #[clap(long = "dataset")]
    #[clap(value_name = "ID")]
    #[clap(help_heading = Some("Alignment"))]
    pub dataset: Option<String>,

    /// Use per-taxon cutoffs from the dataset, or a single cutoff for every taxon
    #[clap(long = "cutoff-mode")]
    #[clap(value_name = "MODE")]
    #[clap(default_value = "local")]
    #[clap(help_heading = Some("Alignment"))]
    pub cutoff_mode: CutoffMode,

    /// Similarity cutoff for single mode (0.90-1.0)
    #[clap(long = "cutoff")]
    #[clap(value_name = "FLOAT")]
    #[clap(default_value = "0.97")]
    #[clap(help_heading = Some("Alignment"))]
    pub cutoff: f64,

    /// Taxonomic rank to classify at
    #[clap(long = "rank")]
    #[clap(value_name = "RANK")]
    #[clap(default_value = "species")]
    #[clap(help_heading = Some("Alignment"))]
    pub rank: String,

    /// Optional confidence threshold
    #[clap(long = "confidence")]
    #[clap(value_name = "FLOAT")]
    #[clap(help_heading = Some("Alignment"))]
    pub confidence: Option<f64>,

    /// Path to the classifier script
    #[clap(long = "dnabarcoder")]
    #[clap(value_name = "PATH")]
    #[clap(default_value = "dnabarcoder/dnabarcoder.py")]
    #[clap(help_heading = Some("Alignment"))]
    pub dnabarcoder_script: PathBuf,

    /// Interpreter used to run the classifier script
    #[clap(long = "interpreter")]
    #[clap(value_name = "PROGRAM")]
    #[clap(default_value = "python")]
    #[clap(help_heading = Some("Alignment"))]
    pub interpreter: String,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl ClassifySettings {
    /// The data folder, resolved by `check_classify_settings`
    pub fn data_dir(&self) -> &Path {
        self.data_dir.as_deref().unwrap_or(Path::new(DEFAULT_DATA_DIR))
    }
}

pub fn check_classify_settings(mut settings: ClassifySettings) -> anyhow::Result<ClassifySettings> {
    // hard code the version in
    settings.mycoid_version = FULL_VERSION.clone();
    info!("MycoID version: {:?}", &settings.mycoid_version);
    info!("Sub-command: classify");
    info!("Inputs:");

    // exactly one source of sequences
    ensure!(
        settings.input_filenames.is_empty() || settings.fasta_text.is_none(),
        "--input and --fasta-text are mutually exclusive"
    );
    ensure!(
        !settings.input_filenames.is_empty() || settings.fasta_text.is_some(),
        "Either --input or --fasta-text must be provided"
    );
    for (i, input_fn) in settings.input_filenames.iter().enumerate() {
        check_required_filename(input_fn, format!("Input FASTA #{i}").as_str())?;
        info!("\tInput FASTA #{i}: {input_fn:?}");
    }
    if let Some(text) = settings.fasta_text.as_ref() {
        info!("\tFASTA text: {} characters", text.len());
    }

    settings.data_dir = Some(resolve_data_dir(settings.data_dir.take(), std::env::var(DATA_DIR_ENV).ok()));
    info!("\tData folder: {:?}", settings.data_dir());

    info!("Outputs:");
    info!("\tOutput folder: {:?}", settings.output_folder);
    if let Some(seq_id) = settings.display_sequence.as_deref() {
        info!("\tDisplayed sequence: {seq_id:?}");
    }

    info!("Method: {}", settings.method);
    if !settings.method.is_implemented() {
        warn!("\tThe {} method is not implemented yet", settings.method);
    }
    match settings.method {
        Method::Taxotagger => {
            check_top_n(settings.top_n)?;
            info!("\tEmbedding model: {}", settings.model);
            info!("\tTop matches: {}", settings.top_n);
            info!("\tSearch command: {:?}", settings.search_command);
        },
        Method::Dnabarcoder => {
            ensure!(settings.dataset.is_some(), "--dataset is required for the dnabarcoder method");
            check_required_filename(&settings.dnabarcoder_script, "Classifier script")?;
            if let MethodParams::Alignment { params, .. } = method_params(&settings)? {
                params.check()?;
            }
            info!("\tDataset: {:?}", settings.dataset.as_deref().unwrap_or_default());
            info!("\tCutoff mode: {}", settings.cutoff_mode);
            if settings.cutoff_mode == CutoffMode::Single {
                info!("\tCutoff: {}", settings.cutoff);
            }
            info!("\tRank: {}", settings.rank);
            if let Some(confidence) = settings.confidence {
                info!("\tConfidence: {confidence}");
            }
            info!("\tClassifier: {} {:?}", settings.interpreter, settings.dnabarcoder_script);
        },
        Method::MycoaiCnn |
        Method::MycoaiBert => {}
    }

    Ok(settings)
}

/// Builds the method-specific request parameters from the settings.
/// The single cutoff is only carried in single mode.
/// # Errors
/// * if the classify parameters cannot be built
pub fn method_params(settings: &ClassifySettings) -> anyhow::Result<MethodParams> {
    let params = match settings.method {
        Method::Taxotagger => MethodParams::Similarity {
            model: settings.model,
            top_n: settings.top_n
        },
        Method::Dnabarcoder => {
            let cutoff = match settings.cutoff_mode {
                CutoffMode::Single => Some(settings.cutoff),
                CutoffMode::Local => None
            };
            let params = ClassifyParamsBuilder::default()
                .cutoff_mode(settings.cutoff_mode)
                .cutoff(cutoff)
                .rank(settings.rank.clone())
                .confidence(settings.confidence)
                .build()
                .context("Error while building classify parameters:")?;
            MethodParams::Alignment {
                dataset: settings.dataset.clone().unwrap_or_default(),
                params
            }
        },
        Method::MycoaiCnn |
        Method::MycoaiBert => MethodParams::Unimplemented(settings.method)
    };
    Ok(params)
}

/// Loads the FASTA text of a request, either given directly or concatenated from the input files
/// # Errors
/// * if any input file cannot be read
pub fn load_fasta_text(settings: &ClassifySettings) -> anyhow::Result<String> {
    if let Some(text) = settings.fasta_text.as_ref() {
        return Ok(text.clone());
    }

    let texts: Vec<String> = settings.input_filenames.iter()
        .map(|filename| {
            std::fs::read_to_string(filename)
                .with_context(|| format!("Error while reading {filename:?}:"))
        })
        .collect::<anyhow::Result<_>>()?;
    Ok(combine_fasta_texts(texts))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::backends::alignment::ClassifyParams;

    fn alignment_settings(mode: CutoffMode, cutoff: f64) -> ClassifySettings {
        ClassifySettings {
            fasta_text: Some(">seq1\nACGT\n".to_string()),
            output_folder: PathBuf::from("out"),
            method: Method::Dnabarcoder,
            dataset: Some("UNITE2024ITS1".to_string()),
            cutoff_mode: mode,
            cutoff,
            rank: "species".to_string(),
            dnabarcoder_script: PathBuf::from("test_data/mock_dnabarcoder.sh"),
            data_dir: Some(PathBuf::from("test_data/datasets")),
            ..Default::default()
        }
    }

    #[test]
    fn test_method_params_cutoff_only_in_single_mode() {
        let MethodParams::Alignment { dataset, params } = method_params(&alignment_settings(CutoffMode::Local, 0.97)).unwrap() else {
            panic!("expected alignment parameters");
        };
        assert_eq!(dataset, "UNITE2024ITS1");
        assert_eq!(params, ClassifyParams::default());

        let MethodParams::Alignment { params, .. } = method_params(&alignment_settings(CutoffMode::Single, 0.95)).unwrap() else {
            panic!("expected alignment parameters");
        };
        assert_eq!(params.cutoff(), Some(0.95));
        assert_eq!(params.cutoff_mode(), CutoffMode::Single);
    }

    #[test]
    fn test_method_params_keep_user_values() {
        let mut settings = alignment_settings(CutoffMode::Single, 0.99);
        settings.rank = "genus".to_string();
        settings.confidence = Some(0.8);
        let MethodParams::Alignment { params, .. } = method_params(&settings).unwrap() else {
            panic!("expected alignment parameters");
        };
        assert_eq!(params.cutoff_mode(), CutoffMode::Single);
        assert_eq!(params.rank(), "genus");
        assert_eq!(params.confidence(), Some(0.8));
        assert_eq!(params.caption(), "Classification parameters: Method: Single, Similarity cutoff: 0.990");
    }

    #[test]
    fn test_method_params_other_methods() {
        let mut settings = alignment_settings(CutoffMode::Local, 0.97);
        settings.method = Method::Taxotagger;
        settings.top_n = 4;
        assert_eq!(method_params(&settings).unwrap(), MethodParams::Similarity { model: EmbeddingModel::MycoaiCnn, top_n: 4 });

        settings.method = Method::MycoaiBert;
        assert_eq!(method_params(&settings).unwrap(), MethodParams::Unimplemented(Method::MycoaiBert));
    }

    #[test]
    fn test_check_settings() {
        let settings = check_classify_settings(alignment_settings(CutoffMode::Single, 0.95)).unwrap();
        assert_eq!(settings.data_dir(), Path::new("test_data/datasets"));

        // cutoff out of range in single mode
        assert!(check_classify_settings(alignment_settings(CutoffMode::Single, 0.5)).is_err());
        // ignored in local mode
        assert!(check_classify_settings(alignment_settings(CutoffMode::Local, 0.5)).is_ok());

        let mut settings = alignment_settings(CutoffMode::Local, 0.97);
        settings.dataset = None;
        assert!(check_classify_settings(settings).is_err());

        let mut settings = alignment_settings(CutoffMode::Local, 0.97);
        settings.input_filenames = vec![PathBuf::from("test_data/results/sample.classified")];
        assert!(check_classify_settings(settings).is_err());

        let mut settings = alignment_settings(CutoffMode::Local, 0.97);
        settings.method = Method::Taxotagger;
        settings.top_n = 6;
        assert!(check_classify_settings(settings).is_err());
    }

    #[test]
    fn test_load_fasta_text() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let first = tmp_dir.path().join("first.fasta");
        let second = tmp_dir.path().join("second.fasta");
        std::fs::write(&first, ">seq1\nACGT").unwrap();
        std::fs::write(&second, ">seq2\nTTGA\n").unwrap();

        let settings = ClassifySettings {
            input_filenames: vec![first, second],
            ..Default::default()
        };
        assert_eq!(load_fasta_text(&settings).unwrap(), ">seq1\nACGT\n>seq2\nTTGA\n\n");

        let settings = ClassifySettings {
            input_filenames: vec![tmp_dir.path().join("missing.fasta")],
            ..Default::default()
        };
        assert!(load_fasta_text(&settings).is_err());
    }
}
