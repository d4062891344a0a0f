
/// Helper functions for read/writing JSON via serde
pub mod json_io;
/// Busy indicator shown while external engines run
pub mod progress_bar;
