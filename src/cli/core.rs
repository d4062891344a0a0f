
use anyhow::bail;
use clap::{Parser, Subcommand};
use chrono::Datelike;
use lazy_static::lazy_static;
use std::path::{Path, PathBuf};

use crate::cli::classify::ClassifySettings;
use crate::cli::datasets::DatasetsSettings;
use crate::cli::normalize::NormalizeSettings;

/// Environment variable that overrides the default data directory
pub const DATA_DIR_ENV: &str = "MYCOAI_HOME";
/// Data directory used when neither the option nor the environment variable is set
pub const DEFAULT_DATA_DIR: &str = "data";

lazy_static! {
    /// Stores the full version string we plan to use, which is generated in build.rs
    /// # Examples
    /// * `0.3.1-6bb9635-dirty` - while on a dirty branch
    /// * `0.3.1-6bb9635` - with a fresh commit
    pub static ref FULL_VERSION: String = format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("VERGEN_GIT_DESCRIBE"));

    /// Shared after help string containing the legalese.
    pub static ref AFTER_HELP: String = format!("Copyright (C) 2024-{}     MycoID contributors
This program comes with ABSOLUTELY NO WARRANTY; taxonomic assignments are
predictions and should be confirmed before use in any regulated setting.", chrono::Utc::now().year());
}

#[derive(Parser)]
#[clap(author,
    version = &**FULL_VERSION,
    about,
    after_help = &**AFTER_HELP)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands
}

/// MycoID, taxonomic identification of fungal DNA barcodes.
/// Select a subcommand to see more usage information:
#[derive(Subcommand)]
pub enum Commands {
    /// Classifies FASTA sequences with one of the identification methods
    Classify(Box<ClassifySettings>),
    /// Lists the reference datasets available to the alignment classifier
    Datasets(Box<DatasetsSettings>),
    /// Converts an existing classifier output file into the canonical results table
    Normalize(Box<NormalizeSettings>)
}

pub fn get_cli() -> Cli {
    Cli::parse()
}

/// Checks if a file exists and will otherwise exit
/// # Arguments
/// * `filename` - the file path to check for
/// * `label` - the label to use for error messages
pub fn check_required_filename(filename: &Path, label: &str) -> anyhow::Result<()> {
    if !filename.exists() {
        bail!("{} does not exist: \"{}\"", label, filename.display());
    }

    // file exists
    Ok(())
}

/// Checks if a file exists and will otherwise exit
/// # Arguments
/// * `filename` - the file path to check for
/// * `label` - the label to use for error messages
pub fn check_optional_filename(opt_filename: Option<&Path>, label: &str) -> anyhow::Result<()> {
    if let Some(filename) = opt_filename {
        if !filename.exists() {
            bail!("{} does not exist: \"{}\"", label, filename.display());
        }
    }

    // file either was not specified OR it exists
    Ok(())
}

/// Picks the data directory: explicit option, then `MYCOAI_HOME`, then `data`
/// # Arguments
/// * `data_dir` - the value given on the command line, if any
/// * `env_value` - the value of the environment variable, if set
pub fn resolve_data_dir(data_dir: Option<PathBuf>, env_value: Option<String>) -> PathBuf {
    data_dir
        .or_else(|| env_value.filter(|v| !v.is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_data_dir() {
        assert_eq!(resolve_data_dir(Some(PathBuf::from("custom")), Some("env".to_string())), PathBuf::from("custom"));
        assert_eq!(resolve_data_dir(None, Some("env".to_string())), PathBuf::from("env"));
        assert_eq!(resolve_data_dir(None, Some(String::new())), PathBuf::from("data"));
        assert_eq!(resolve_data_dir(None, None), PathBuf::from("data"));
    }

    #[test]
    fn test_filename_checks() {
        assert!(check_required_filename(Path::new("test_data/results/sample.classified"), "Input").is_ok());
        assert!(check_required_filename(Path::new("test_data/missing.fasta"), "Input").is_err());
        assert!(check_optional_filename(None, "Input").is_ok());
    }
}
