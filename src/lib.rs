/*!
# MycoID
Taxonomic identification of fungal DNA barcodes.
FASTA input is validated, handed to one of the classification engines, and the engine output is normalized into canonical records for display and export.
*/

/// One analysis request, from validated input to normalized records
pub mod analysis;
/// Adapters for the external classification engines
pub mod backends;
/// Command line interface functionality
pub mod cli;
/// Contains various shared data types
pub mod data_types;
/// Converts raw engine output into canonical records
pub mod normalize;
/// Tooling for parsing input files into meaningful structs / data
pub mod parsing;
/// Various utility functions that tend to be very generic
pub mod util;
/// All output writers
pub mod writers;
