//! Command-line interface for inquirydesk.
//!
//! This module provides the CLI structure for the `inquirydesk` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::Verbosity;

pub use commands::{
    parse_field_update, ConfigCommand, InquiryTypeArg, ListCommand, OutputFormat, SearchCommand,
    ShowCommand, StatusCommand, SubmitCommand,
};

/// inquirydesk - Contact inquiry intake
///
/// Validates contact-form inquiries, records them with a bounded wait,
/// and lets you browse what has been received.
#[derive(Debug, Parser)]
#[command(name = "inquirydesk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate and submit an inquiry
    Submit(SubmitCommand),

    /// List received inquiries
    List(ListCommand),

    /// Search received inquiries
    Search(SearchCommand),

    /// Show one inquiry
    Show(ShowCommand),

    /// Show storage status
    Status(StatusCommand),

    /// List inquiry types and where they are routed
    Types,

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
