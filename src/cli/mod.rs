//! CLI module
//!
//! Command-line interface for running an export.
//!
//! Every configuration field can come from a YAML file (`--config`), a flag,
//! or an environment variable. Flags and environment win over the file.

mod commands;
mod runner;

pub use commands::{Cli, FormatArg, LogFormat, SourceArg};
pub use runner::Runner;
