//! CLI argument definitions for the `assist-session` binary.

use clap::{Parser, Subcommand};

/// Inspect or change the locally persisted portal session
#[derive(Parser, Debug)]
#[command(name = "assist-session")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Restore the persisted session and show it (default)
    Status,
    /// Authenticate and persist the new session
    Login {
        email: String,
        /// Read from ASSIST_PASSWORD when omitted
        #[arg(env = "ASSIST_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Drop the persisted session
    Logout,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Status)
    }
}
