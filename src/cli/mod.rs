/*!
# CLI module
Command line interface functionality that is specific to MycoID.
*/

/// The main CLI module that contains the top-level CLI parser and help text
pub mod core;
/// The classify CLI subcommand
pub mod classify;
/// The datasets CLI subcommand
pub mod datasets;
/// The normalize CLI subcommand
pub mod normalize;
