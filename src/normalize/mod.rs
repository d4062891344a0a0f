/*!
# Normalize module
Converts the heterogeneous backend outputs into the canonical record shapes.
Each output shape has its own function: `similarity::flatten_similarity_results` for the embedding engine, and
`alignment::normalize_alignment_table` for the two alignment layouts, tagged by `alignment::AlignmentShape`.
Recoverable oddities (missing columns, bad numbers, short match lists) are defaulted here and never fail a request.
*/
/// Alignment classifier tables to canonical classification records
pub mod alignment;
/// Second pass before display: ID resolution, taxonomy from IDs, sequence selection
pub mod display;
/// Nested similarity matches to flat per-position records
pub mod similarity;
