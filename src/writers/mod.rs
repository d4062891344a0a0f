/*!
# Writers module
Contains the logic for writing result tables and archives.
*/
/// Zip archives of the alignment classifier's result files
pub mod archive;
/// The canonical classification results table and its text rendering
pub mod results_table;
/// Flattened similarity search matches
pub mod similarity_export;
