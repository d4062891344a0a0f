
/// The canonical classification row and its column contract
pub mod classification_record;
/// Enumerations for the user-selectable methods, models, and cutoff modes
pub mod methods;
/// Reference dataset descriptors and their cutoff tables
pub mod reference_dataset;
/// A validated input sequence
pub mod sequence_record;
/// Raw and flattened embedding similarity search results
pub mod similarity;
/// Taxonomic levels, lineages, and the missing-value sentinels
pub mod taxonomy;
