//! Null-aware reduction of alert query time series to a single scalar.

pub mod config;
pub mod reducer;
pub mod report;
pub mod series;

pub use reducer::{Reducer, ReducerKind, Reduction, reduce};
pub use series::{Sample, Series};
