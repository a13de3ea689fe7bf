//! Shared primitives for the phylopotts workspace.
//!
//! - **Error types**: [`PottsError`] and [`Result`] for structured error handling
//! - **Traits**: [`Summarizable`] for one-line summaries of domain values

pub mod error;
pub mod traits;

pub use error::{PottsError, Result};
pub use traits::*;
