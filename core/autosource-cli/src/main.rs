//! autosource: directory-triggered environment activation for interactive
//! shells.
//!
//! One-shot binary invoked by the prompt hook that `autosource init`
//! installs. Stdout is eval'd by the shell, so it carries only shell
//! commands; prompts, refusals, and errors go to stderr.
//!
//! ## Subcommands
//!
//! - *(none)*: decide and print the activation/deactivation commands for
//!   the current directory
//! - `init`: print the shell bootstrap (bash and zsh)
//! - `deactivate`: print commands reversing the active environment
//! - `security-check`: refuse files writable by non-owners

mod emit;
mod init;
mod logging;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "autosource")]
#[command(about = "Directory-triggered environment activation for interactive shells")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the shell bootstrap; eval it from your shell rc
    Init,

    /// Print commands reversing the currently active environment
    Deactivate,

    /// Exit 1 with a message if a file (or an ancestor) is writable by
    /// someone other than its owner
    SecurityCheck {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    let outcome = match cli.command {
        None => emit::run(),
        Some(Commands::Init) => init::run(),
        Some(Commands::Deactivate) => emit::run_deactivate(),
        Some(Commands::SecurityCheck { path }) => emit::run_security_check(&path),
    };

    match outcome {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            tracing::error!(error = %err, "autosource failed");
            eprintln!("autosource: {err}");
            std::process::exit(1);
        }
    }
}
