//! Command-line argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use courier_common::{DEFAULT_RETENTION_DAYS, DEFAULT_SMTP_PORT, MAX_RETENTION_DAYS};

use courier_server::constants::{DEFAULT_BASE_URL, DEFAULT_LIST_LIMIT, DEFAULT_SWEEP_INTERVAL_HOURS};

/// Get default database path help text for current platform
fn default_database_help() -> String {
    #[cfg(target_os = "linux")]
    return "Database file path (default: ~/.local/share/courierd/courier.db)".to_string();

    #[cfg(target_os = "macos")]
    return "Database file path (default: ~/Library/Application Support/courierd/courier.db)"
        .to_string();

    #[cfg(target_os = "windows")]
    return "Database file path (default: %APPDATA%\\courierd\\courier.db)".to_string();

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    return "Database file path (overrides platform default)".to_string();
}

/// Get default storage root help text for current platform
fn default_storage_root_help() -> String {
    #[cfg(target_os = "linux")]
    return "Artifact storage directory (default: ~/.local/share/courierd/storage/)".to_string();

    #[cfg(target_os = "macos")]
    return "Artifact storage directory (default: ~/Library/Application Support/courierd/storage/)"
        .to_string();

    #[cfg(target_os = "windows")]
    return "Artifact storage directory (default: %APPDATA%\\courierd\\storage\\)".to_string();

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    return "Artifact storage directory (overrides platform default)".to_string();
}

/// Courier file handoff service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Database file path (overrides platform default)
    #[arg(short, long, global = true, help = default_database_help())]
    pub database: Option<PathBuf>,

    /// Artifact storage directory (overrides platform default)
    #[arg(short = 's', long = "storage-root", global = true, help = default_storage_root_help())]
    pub storage_root: Option<PathBuf>,

    /// Base URL of download links
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Days a transfer stays downloadable
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_RETENTION_DAYS,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_RETENTION_DAYS))
    )]
    pub retention_days: u32,

    /// Hours between sweeper runs (at most 12)
    #[arg(long, global = true, default_value_t = DEFAULT_SWEEP_INTERVAL_HOURS)]
    pub sweep_interval_hours: u64,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    /// Print status, list, and verify results as JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the expiration sweeper until interrupted
    Run,

    /// Send files or directories to a recipient
    Send {
        /// Recipient email address
        #[arg(long)]
        to: String,

        /// Sender email address
        #[arg(long)]
        from: String,

        /// Files and directories to send
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Show the state of a transfer
    Status {
        /// Transfer id
        id: String,
    },

    /// Download a transfer's artifact
    Fetch {
        /// Transfer id
        id: String,

        /// Output file (default: the artifact name in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Recompute an artifact's fingerprint and compare it to the record
    Verify {
        /// Transfer id
        id: String,
    },

    /// List recent transfers
    List {
        /// Maximum number of transfers to show
        #[arg(short, long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: u32,
    },

    /// Run one sweeper pass and exit
    Sweep,

    /// Show or change SMTP settings
    Smtp {
        #[command(subcommand)]
        command: SmtpCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum SmtpCommand {
    /// Print the stored SMTP settings (password hidden)
    Show,

    /// Validate and store SMTP settings
    Set {
        /// SMTP server host name
        #[arg(long)]
        server: String,

        /// SMTP port (465 uses implicit TLS, others STARTTLS)
        #[arg(long, default_value_t = DEFAULT_SMTP_PORT)]
        port: u16,

        /// SMTP user name (omit for unauthenticated relays)
        #[arg(long, default_value = "")]
        user: String,

        /// SMTP password
        #[arg(long, default_value = "")]
        password: String,

        /// Sender address of notifications
        #[arg(long)]
        sender: String,
    },
}
