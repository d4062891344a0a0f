/*!
# Parsing module
Contains the logic for parsing user input and engine output into meaningful structs.
*/
/// Permissive FASTA text parser
pub mod fasta;
/// Loosely-typed tab-separated tables as written by the alignment classifier
pub mod tabular;
/// Domain checks on parsed FASTA input
pub mod validation;
