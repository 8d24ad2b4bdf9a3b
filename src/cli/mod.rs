//! CLI module for aerodomain
//!
//! Provides command-line interface for:
//! - compile: Compile one domain to SQL
//! - normalize: Normalize one domain

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{compile, normalize_domain, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_error, write_response};
