//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::error::Result;
use crate::form::{FieldUpdate, InquiryType};

/// Submit command arguments.
///
/// Flags fill the form first; `--field` entries are applied afterwards in
/// the order given, so they win over the named flags.
#[derive(Debug, Default, Args)]
pub struct SubmitCommand {
    /// Sender's first name
    #[arg(long)]
    pub first_name: Option<String>,

    /// Sender's last name
    #[arg(long)]
    pub last_name: Option<String>,

    /// Reply email address
    #[arg(long)]
    pub email: Option<String>,

    /// Institution or organization
    #[arg(long)]
    pub institution: Option<String>,

    /// Inquiry type (see `inquirydesk types`)
    #[arg(short = 't', long)]
    pub inquiry_type: Option<String>,

    /// Message body
    #[arg(short, long)]
    pub message: Option<String>,

    /// Agree to the privacy policy
    #[arg(long)]
    pub consent: bool,

    /// Raw field input as NAME=VALUE (repeatable)
    #[arg(long = "field", value_name = "NAME=VALUE", value_parser = parse_field_update)]
    pub fields: Vec<FieldUpdate>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

impl SubmitCommand {
    /// The form edits this command describes, in application order.
    #[must_use]
    pub fn updates(&self) -> Vec<FieldUpdate> {
        let named = [
            self.first_name.clone().map(FieldUpdate::FirstName),
            self.last_name.clone().map(FieldUpdate::LastName),
            self.email.clone().map(FieldUpdate::Email),
            self.institution.clone().map(FieldUpdate::Institution),
            self.inquiry_type.clone().map(FieldUpdate::InquiryType),
            self.message.clone().map(FieldUpdate::Message),
            self.consent.then_some(FieldUpdate::Consent(true)),
        ];

        named
            .into_iter()
            .flatten()
            .chain(self.fields.iter().cloned())
            .collect()
    }
}

/// Parse a `NAME=VALUE` pair into a form edit.
///
/// # Errors
///
/// Returns an error if the `=` is missing, the name is unknown, or the value
/// does not fit the field.
pub fn parse_field_update(s: &str) -> std::result::Result<FieldUpdate, String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{s}`"))?;
    let update: Result<FieldUpdate> = FieldUpdate::parse(name.trim(), value);
    update.map_err(|e| e.to_string())
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Maximum number of inquiries
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Only show inquiries of this type
    #[arg(short = 't', long, value_enum)]
    pub inquiry_type: Option<InquiryTypeArg>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Search command arguments.
#[derive(Debug, Args)]
pub struct SearchCommand {
    /// Text to look for in names, email, institution and message
    pub query: String,

    /// Maximum number of results
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Inquiry ID
    pub id: i64,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Inquiry type argument for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InquiryTypeArg {
    /// Institutional Partnership
    Partnership,
    /// Commercial Inquiry
    Commercial,
    /// Technical Support
    Support,
    /// Media & Press
    Media,
    /// Academic Research
    Research,
    /// Other
    Other,
}

impl From<InquiryTypeArg> for InquiryType {
    fn from(arg: InquiryTypeArg) -> Self {
        match arg {
            InquiryTypeArg::Partnership => Self::InstitutionalPartnership,
            InquiryTypeArg::Commercial => Self::CommercialInquiry,
            InquiryTypeArg::Support => Self::TechnicalSupport,
            InquiryTypeArg::Media => Self::MediaAndPress,
            InquiryTypeArg::Research => Self::AcademicResearch,
            InquiryTypeArg::Other => Self::Other,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
