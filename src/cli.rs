//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for the backrooms server.

use clap::{Parser, Subcommand};

/// Backrooms Server - unattended AI persona conversation
///
/// Rotates through a fixed cast of personas, asks an OpenAI-compatible API
/// for their lines within a daily budget, and streams every line to viewers
/// over WebSocket.
#[derive(Parser, Debug)]
#[command(name = "backrooms-server")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve viewers and run the conversation
    Run {
        /// Path to configuration file
        #[arg(short, long, env = "BACKROOMS_CONFIG")]
        config: Option<String>,

        /// Port to listen on (overrides config and environment)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print today's generator usage from the ledger
    Usage {
        /// Path to configuration file
        #[arg(short, long, env = "BACKROOMS_CONFIG")]
        config: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display version and build information
    Version,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the effective configuration (API key masked)
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::parse_from(["backrooms-server", "run"]);
        match cli.command {
            Commands::Run { port, .. } => assert!(port.is_none()),
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_with_config_and_port() {
        let cli = Cli::parse_from([
            "backrooms-server",
            "run",
            "--config",
            "/path/to/backrooms.toml",
            "--port",
            "4000",
        ]);
        match cli.command {
            Commands::Run { config, port } => {
                assert_eq!(config, Some("/path/to/backrooms.toml".to_string()));
                assert_eq!(port, Some(4000));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_rejects_bad_port() {
        assert!(Cli::try_parse_from(["backrooms-server", "run", "--port", "99999"]).is_err());
    }

    #[test]
    fn test_usage_json() {
        let cli = Cli::parse_from(["backrooms-server", "usage", "--json"]);
        match cli.command {
            Commands::Usage { json, .. } => assert!(json),
            _ => panic!("Expected Usage command"),
        }
    }

    #[test]
    fn test_verbose_flags() {
        let cli = Cli::parse_from(["backrooms-server", "-vv", "version"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_quiet_flag() {
        let cli = Cli::parse_from(["backrooms-server", "--quiet", "version"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_config_show() {
        let cli = Cli::parse_from(["backrooms-server", "config", "show"]);
        match cli.command {
            Commands::Config {
                subcommand: ConfigSubcommand::Show { config },
            } => assert!(config.is_none()),
            _ => panic!("Expected Config Show command"),
        }
    }

    #[test]
    fn test_config_init() {
        let cli = Cli::parse_from(["backrooms-server", "config", "init", "--force"]);
        match cli.command {
            Commands::Config {
                subcommand: ConfigSubcommand::Init { path, force },
            } => {
                assert!(path.is_none());
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }
}
