//! Shared types

mod errors;

pub use errors::{CliError, Result};
