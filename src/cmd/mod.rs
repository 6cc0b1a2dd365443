//! Command-line entry points.

pub mod search;

pub use search::SearchArgs;
