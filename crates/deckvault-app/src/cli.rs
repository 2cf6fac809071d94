//! Command-line interface definitions.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Organizes uploaded presentations into an external drive hierarchy.
#[derive(Debug, Parser)]
#[command(name = "deckvault", version, about)]
pub struct Cli {
    /// Postgres connection string backing the queue and configuration.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Base URL of the external drive organization service.
    #[arg(long, env = "DECKVAULT_DRIVE_URL")]
    pub drive_url: String,

    /// Address the intake API listens on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Worker log file; defaults to the system temporary directory.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log level when `RUST_LOG` is not set.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the intake API and the organizer worker.
    Serve,
    /// Restart the pipeline against a new root folder, fire the initial
    /// scan, then keep serving.
    Bootstrap {
        /// Root folder id the initial scan starts from.
        root_folder_id: String,

        /// Seconds to wait for the queue to answer before firing the scan.
        #[arg(long, default_value_t = 5)]
        settle_secs: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_parses_positional_id_and_settle_flag() {
        let cli = Cli::parse_from([
            "deckvault",
            "--database-url",
            "postgres://localhost/deckvault",
            "--drive-url",
            "http://drive.local",
            "bootstrap",
            "F999",
            "--settle-secs",
            "2",
        ]);
        match cli.command {
            Command::Bootstrap {
                root_folder_id,
                settle_secs,
            } => {
                assert_eq!(root_folder_id, "F999");
                assert_eq!(settle_secs, 2);
            }
            Command::Serve => panic!("expected the bootstrap subcommand"),
        }
    }

    #[test]
    fn bootstrap_without_an_id_is_rejected_at_parse_time() {
        let result = Cli::try_parse_from([
            "deckvault",
            "--database-url",
            "postgres://localhost/deckvault",
            "--drive-url",
            "http://drive.local",
            "bootstrap",
        ]);
        assert!(result.is_err(), "a bootstrap with no folder id must not parse");
    }

    #[test]
    fn serve_uses_defaults() {
        let cli = Cli::parse_from([
            "deckvault",
            "--database-url",
            "postgres://localhost/deckvault",
            "--drive-url",
            "http://drive.local",
            "serve",
        ]);
        assert!(matches!(cli.command, Command::Serve));
        assert_eq!(cli.listen.port(), 8080);
        assert_eq!(cli.log_level, "info");
        assert!(cli.log_file.is_none());
    }
}
