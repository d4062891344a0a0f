
use anyhow::Context;
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::core::{check_optional_filename, check_required_filename, AFTER_HELP, FULL_VERSION};
use crate::normalize::alignment::AlignmentShape;
use crate::parsing::fasta::{parse_fasta, sequence_id};

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct NormalizeSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    mycoid_version: String,

    /// Classifier output, either a .classified file or a .classification report
    #[clap(required = true)]
    #[clap(short = 'i')]
    #[clap(long = "input")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub input_filename: PathBuf,

    /// Optional FASTA the results were produced from, used to fill in missing sequence IDs
    #[clap(short = 'f')]
    #[clap(long = "fasta")]
    #[clap(value_name = "FASTA")]
    #[clap(help_heading = Some("Input/Output"))]
    pub fasta_filename: Option<PathBuf>,

    /// Output results table (CSV/TSV)
    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_filename: PathBuf,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl NormalizeSettings {
    /// The input layout, decided by its file extension
    pub fn shape(&self) -> AlignmentShape {
        AlignmentShape::from_path(&self.input_filename)
    }
}

pub fn check_normalize_settings(mut settings: NormalizeSettings) -> anyhow::Result<NormalizeSettings> {
    // hard code the version in
    settings.mycoid_version = FULL_VERSION.clone();
    info!("MycoID version: {:?}", &settings.mycoid_version);
    info!("Sub-command: normalize");
    info!("Inputs:");

    check_required_filename(&settings.input_filename, "Classifier output")?;
    info!("\tClassifier output: {:?} ({})", settings.input_filename, settings.shape());
    check_optional_filename(settings.fasta_filename.as_deref(), "Input FASTA")?;
    if let Some(fasta_fn) = settings.fasta_filename.as_deref() {
        info!("\tInput FASTA: {fasta_fn:?}");
    } else {
        info!("\tInput FASTA: None");
    }

    info!("Outputs:");
    info!("\tResults table: {:?}", settings.output_filename);

    Ok(settings)
}

/// Loads the sequence IDs of the optional FASTA, in file order; empty if none was given
/// # Errors
/// * if the FASTA cannot be read
pub fn load_sequence_ids(settings: &NormalizeSettings) -> anyhow::Result<Vec<String>> {
    let Some(fasta_fn) = settings.fasta_filename.as_deref() else {
        return Ok(vec![]);
    };
    let text = std::fs::read_to_string(fasta_fn)
        .with_context(|| format!("Error while reading {fasta_fn:?}:"))?;
    Ok(parse_fasta(&text).entries().iter()
        .map(|entry| sequence_id(&entry.header).to_string())
        .collect())
}
