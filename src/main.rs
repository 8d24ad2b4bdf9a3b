//! aerodomain CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`. Errors have already
//! been written to stdout as JSON; the process only reports and exits.

use aerodomain::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
