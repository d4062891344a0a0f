
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::cli::core::{resolve_data_dir, AFTER_HELP, DATA_DIR_ENV, DEFAULT_DATA_DIR, FULL_VERSION};

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct DatasetsSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    mycoid_version: String,

    /// Data folder holding the reference datasets [default: $MYCOAI_HOME, then "data"]
    #[clap(long = "data-dir")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub data_dir: Option<PathBuf>,

    /// Show the details of one dataset instead of the list
    #[clap(long = "info")]
    #[clap(value_name = "ID")]
    #[clap(help_heading = Some("Input/Output"))]
    pub info_dataset: Option<String>,

    /// Optional output JSON with the listed datasets or details
    #[clap(short = 'o')]
    #[clap(long = "output-json")]
    #[clap(value_name = "JSON")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_json: Option<PathBuf>,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl DatasetsSettings {
    /// The data folder, resolved by `check_datasets_settings`
    pub fn data_dir(&self) -> &Path {
        self.data_dir.as_deref().unwrap_or(Path::new(DEFAULT_DATA_DIR))
    }
}

pub fn check_datasets_settings(mut settings: DatasetsSettings) -> anyhow::Result<DatasetsSettings> {
    // hard code the version in
    settings.mycoid_version = FULL_VERSION.clone();
    info!("MycoID version: {:?}", &settings.mycoid_version);
    info!("Sub-command: datasets");
    info!("Inputs:");

    settings.data_dir = Some(resolve_data_dir(settings.data_dir.take(), std::env::var(DATA_DIR_ENV).ok()));
    info!("\tData folder: {:?}", settings.data_dir());
    if let Some(dataset_id) = settings.info_dataset.as_deref() {
        info!("\tDataset: {dataset_id:?}");
    }

    if let Some(output_fn) = settings.output_json.as_deref() {
        info!("Outputs:");
        info!("\tOutput JSON: {output_fn:?}");
    }

    Ok(settings)
}
