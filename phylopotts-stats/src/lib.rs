//! Descriptive statistics used by the alignment summarizer.

pub mod descriptive;

pub use descriptive::{percentiles, quantile, SortedSample};
