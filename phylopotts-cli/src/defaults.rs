//! Default values shared by the command-line arguments.

pub const EQ_FLIPS: u64 = phylopotts_model::DEFAULT_EQUILIBRATION_STEPS as u64;
pub const PREFIX: &str = phylopotts_model::DEFAULT_PREFIX;

pub const ALPHABET: &str = "aa";

/// Log level when neither `-v`, `-q` nor `RUST_LOG` is given.
pub const LOG_LEVEL: &str = "info";
