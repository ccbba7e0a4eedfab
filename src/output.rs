//! Filesystem helpers for writing paginated API output.

pub mod dirs;
pub mod filename;

pub use dirs::*;
pub use filename::*;
