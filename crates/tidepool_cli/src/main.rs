//! Tidepool CLI
//!
//! Command-line front end for the Tidepool document store and sync
//! engine.
//!
//! # Commands
//!
//! - `create` - Create an empty store file
//! - `list` - List documents in a store
//! - `status` - Show what a sync run would do, without doing it
//! - `sync` - Synchronize a directory with a store

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;
use tidepool_store::StoreError;
use tidepool_sync::{PreconditionError, SyncError};
use tracing_subscriber::EnvFilter;

/// Tidepool command-line tools.
#[derive(Parser)]
#[command(name = "tidepool")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty store file
    Create {
        /// Path of the store file to create (must end in .pool)
        store: PathBuf,

        /// Workspace the store belongs to, e.g. +notes.local
        #[arg(short, long)]
        workspace: String,
    },

    /// List documents in a store
    List {
        /// Path of the store file
        store: PathBuf,

        /// Include deleted paths (tombstones)
        #[arg(short, long)]
        tombstones: bool,
    },

    /// Show what a sync run would do, without doing it
    Status {
        /// One endpoint (directory or store file)
        left: PathBuf,

        /// The other endpoint
        right: PathBuf,

        /// Manifest state directory (default: .tidepool beside the store)
        #[arg(long)]
        state_dir: Option<PathBuf>,
    },

    /// Synchronize a directory with a store
    Sync {
        /// One endpoint (directory or store file)
        left: PathBuf,

        /// The other endpoint
        right: PathBuf,

        /// Author to attribute store writes to
        #[arg(short, long, default_value = "local")]
        author: String,

        /// Manifest state directory (default: .tidepool beside the store)
        #[arg(long)]
        state_dir: Option<PathBuf>,
    },
}

/// Any failure a command can surface.
#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<PreconditionError> for CliError {
    fn from(err: PreconditionError) -> Self {
        Self::Sync(SyncError::Precondition(err))
    }
}

/// Exit status for an error.
///
/// Every precondition violation has its own code, distinct from the
/// partial-failure exit (1) used when a run completes with failed paths.
fn exit_code(err: &CliError) -> ExitCode {
    let code = match err {
        CliError::Sync(SyncError::Precondition(precondition)) => match precondition {
            PreconditionError::NeitherDirectory { .. } => 2,
            PreconditionError::BothDirectories { .. } => 3,
            PreconditionError::StoreMissing { .. } => 4,
            PreconditionError::StoreExtension { .. } => 5,
            PreconditionError::StoreInsideTree { .. } => 6,
        },
        _ => 1,
    };
    ExitCode::from(code)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            exit_code(&err)
        }
    }
}

fn run(command: Commands) -> Result<ExitCode, CliError> {
    match command {
        Commands::Create { store, workspace } => {
            commands::create::run(&store, &workspace)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::List { store, tombstones } => {
            commands::list::run(&store, tombstones)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Status {
            left,
            right,
            state_dir,
        } => {
            commands::status::run(&left, &right, state_dir)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Sync {
            left,
            right,
            author,
            state_dir,
        } => {
            let clean = commands::sync::run(&left, &right, &author, state_dir)?;
            if clean {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(1))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn each_precondition_has_a_distinct_exit_code() {
        let path = Path::new("/x");
        let errors = [
            PreconditionError::NeitherDirectory {
                left: path.into(),
                right: path.into(),
            },
            PreconditionError::BothDirectories {
                left: path.into(),
                right: path.into(),
            },
            PreconditionError::StoreMissing { path: path.into() },
            PreconditionError::StoreExtension { path: path.into() },
            PreconditionError::StoreInsideTree {
                store: path.into(),
                dir: path.into(),
            },
        ];

        let mut codes: Vec<ExitCode> = errors
            .into_iter()
            .map(|err| exit_code(&CliError::from(err)))
            .collect();
        // None may collide with each other or with the partial-failure 1.
        codes.push(ExitCode::from(1));
        let rendered: std::collections::BTreeSet<String> =
            codes.iter().map(|c| format!("{c:?}")).collect();
        assert_eq!(rendered.len(), codes.len());
    }

    #[test]
    fn runtime_errors_exit_one() {
        let err = CliError::Store(StoreError::Locked);
        assert_eq!(
            format!("{:?}", exit_code(&err)),
            format!("{:?}", ExitCode::from(1))
        );
    }
}
