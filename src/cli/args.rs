//! CLI argument definitions using clap
//!
//! Commands:
//! - aerodomain compile --config <path>
//! - aerodomain normalize --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aerodomain - compile ORM domains to SQL
#[derive(Parser, Debug)]
#[command(name = "aerodomain")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile one domain read from stdin
    Compile {
        /// Path to configuration file
        #[arg(long, default_value = "./aerodomain.json")]
        config: PathBuf,
    },

    /// Normalize one domain read from stdin
    Normalize {
        /// Path to configuration file
        #[arg(long, default_value = "./aerodomain.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compile() {
        let cli = Cli::try_parse_from(["aerodomain", "compile", "--config", "/tmp/a.json"]).unwrap();
        match cli.command {
            Command::Compile { config } => assert_eq!(config, PathBuf::from("/tmp/a.json")),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_config_defaults() {
        let cli = Cli::try_parse_from(["aerodomain", "normalize"]).unwrap();
        match cli.command {
            Command::Normalize { config } => assert_eq!(config, PathBuf::from("./aerodomain.json")),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
