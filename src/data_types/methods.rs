
use serde::Serialize;
use strum_macros::EnumString;

/// The identification methods offered to the user
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, strum_macros::Display, EnumString, Serialize, clap::ValueEnum)]
pub enum Method {
    /// Embedding-based similarity search
    #[default]
    #[strum(ascii_case_insensitive, serialize = "taxotagger")]
    #[clap(name = "taxotagger")]
    Taxotagger,
    /// Alignment-based classification against a reference dataset
    #[strum(ascii_case_insensitive, serialize = "dnabarcoder")]
    #[clap(name = "dnabarcoder")]
    Dnabarcoder,
    /// Neural network classifier, not available yet
    #[strum(ascii_case_insensitive, serialize = "MycoAI-CNN")]
    #[clap(name = "mycoai-cnn")]
    MycoaiCnn,
    /// Language model classifier, not available yet
    #[strum(ascii_case_insensitive, serialize = "MycoAI-BERT")]
    #[clap(name = "mycoai-bert")]
    MycoaiBert,
}

impl Method {
    /// Returns true if this method has a backend behind it.
    pub fn is_implemented(&self) -> bool {
        match self {
            Method::Taxotagger |
            Method::Dnabarcoder => true,

            Method::MycoaiCnn |
            Method::MycoaiBert => false,
        }
    }
}

/// Pretrained embedding models the similarity engine accepts
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, strum_macros::Display, EnumString, Serialize, clap::ValueEnum)]
pub enum EmbeddingModel {
    #[default]
    #[strum(serialize = "MycoAI-CNN")]
    #[clap(name = "MycoAI-CNN")]
    MycoaiCnn,
    #[strum(serialize = "MycoAI-BERT")]
    #[clap(name = "MycoAI-BERT")]
    MycoaiBert,
}

/// How the alignment classifier picks its similarity cutoffs
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, strum_macros::Display, EnumString, Serialize, clap::ValueEnum)]
pub enum CutoffMode {
    /// Per-taxon cutoffs from the dataset's JSON cutoff table
    #[default]
    #[strum(ascii_case_insensitive, serialize = "local")]
    #[clap(name = "local")]
    Local,
    /// One user supplied cutoff for every taxon
    #[strum(ascii_case_insensitive, serialize = "single")]
    #[clap(name = "single")]
    Single,
}
