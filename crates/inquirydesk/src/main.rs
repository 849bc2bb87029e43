//! `inquirydesk` - CLI for the inquiry intake desk
//!
//! Submits contact inquiries through the submission controller and reads
//! back what the local store has received.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use inquirydesk::cli::{
    Cli, Command, ConfigCommand, ListCommand, OutputFormat, SearchCommand, ShowCommand,
    SubmitCommand,
};
use inquirydesk::controller::{InquiryController, SubmitOutcome};
use inquirydesk::form::{InquiryType, StoredInquiry};
use inquirydesk::store::SqliteRecordStore;
use inquirydesk::{init_logging, Config, Result, Storage};

/// Width of the message preview in table output.
const PREVIEW_CHARS: usize = 48;

#[tokio::main]
async fn main() -> std::result::Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    let code = match cli.command {
        Command::Submit(cmd) => handle_submit(&config, &cmd).await?,
        Command::List(cmd) => handle_list(&config, &cmd).map(|()| ExitCode::SUCCESS)?,
        Command::Search(cmd) => handle_search(&config, &cmd).map(|()| ExitCode::SUCCESS)?,
        Command::Show(cmd) => handle_show(&config, &cmd)?,
        Command::Status(cmd) => handle_status(&config, cmd.json).map(|()| ExitCode::SUCCESS)?,
        Command::Types => {
            handle_types();
            ExitCode::SUCCESS
        }
        Command::Config(cmd) => handle_config(&config, cmd)?,
    };
    Ok(code)
}

async fn handle_submit(config: &Config, cmd: &SubmitCommand) -> Result<ExitCode> {
    let store = SqliteRecordStore::open(config.database_path(), &config.submission.collection)?;
    let controller = InquiryController::new(Arc::new(store), config.submission_settings());

    for update in cmd.updates() {
        controller.update_field(update);
    }
    // The form is cleared on success; remember where it should go first.
    let routed_to = controller.form().selected_type();

    let outcome = controller.submit().await;
    let notification = controller.notification();
    controller.teardown();

    if cmd.json {
        let body = match &outcome {
            SubmitOutcome::Rejected(errors) => serde_json::json!({
                "outcome": "rejected",
                "errors": errors,
            }),
            SubmitOutcome::Succeeded(id) => serde_json::json!({
                "outcome": "succeeded",
                "id": id,
                "routed_to": routed_to.map(|t| t.routing_address()),
                "notification": notification,
            }),
            other => serde_json::json!({
                "outcome": outcome_label(other),
                "notification": notification,
            }),
        };
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        match &outcome {
            SubmitOutcome::Rejected(errors) => {
                eprintln!("Please correct the following:");
                for (field, message) in errors.iter() {
                    eprintln!("  {field}: {message}");
                }
            }
            SubmitOutcome::Succeeded(id) => {
                println!("{}", notification.message);
                println!("Inquiry ID:   {id}");
                if let Some(inquiry_type) = routed_to {
                    println!("Routed to:    {}", inquiry_type.routing_address());
                }
            }
            SubmitOutcome::Ignored | SubmitOutcome::Cancelled => {
                eprintln!("Submission did not complete.");
            }
            SubmitOutcome::TimedOut | SubmitOutcome::Failed => {
                eprintln!("{}", notification.message);
            }
        }
    }

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn outcome_label(outcome: &SubmitOutcome) -> &'static str {
    match outcome {
        SubmitOutcome::Rejected(_) => "rejected",
        SubmitOutcome::Ignored => "ignored",
        SubmitOutcome::Succeeded(_) => "succeeded",
        SubmitOutcome::TimedOut => "timed_out",
        SubmitOutcome::Failed => "failed",
        SubmitOutcome::Cancelled => "cancelled",
    }
}

fn handle_list(config: &Config, cmd: &ListCommand) -> Result<()> {
    let storage = Storage::open(config.database_path())?;
    let inquiries = match cmd.inquiry_type {
        Some(arg) => storage.list_by_inquiry_type(InquiryType::from(arg).as_str(), cmd.limit)?,
        None => storage.list_recent(cmd.limit)?,
    };
    print_inquiries(&inquiries, cmd.format)
}

fn handle_search(config: &Config, cmd: &SearchCommand) -> Result<()> {
    let storage = Storage::open(config.database_path())?;
    let inquiries = storage.search(&cmd.query, cmd.limit)?;
    if inquiries.is_empty() && cmd.format != OutputFormat::Json {
        println!("No inquiries match \"{}\".", cmd.query);
        return Ok(());
    }
    print_inquiries(&inquiries, cmd.format)
}

fn handle_show(config: &Config, cmd: &ShowCommand) -> Result<ExitCode> {
    let storage = Storage::open(config.database_path())?;
    let Some(inquiry) = storage.get(cmd.id)? else {
        eprintln!("No inquiry with ID {}", cmd.id);
        return Ok(ExitCode::FAILURE);
    };

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&inquiry)?);
        return Ok(ExitCode::SUCCESS);
    }

    let form = &inquiry.form;
    println!("Inquiry #{}", inquiry.id);
    println!("----------------");
    println!("From:         {} <{}>", inquiry.display_name(), form.email);
    if !form.institution.is_empty() {
        println!("Institution:  {}", form.institution);
    }
    println!("Type:         {}", form.inquiry_type);
    if let Some(inquiry_type) = form.selected_type() {
        println!("Route to:     {}", inquiry_type.routing_address());
    }
    println!("Received:     {}", inquiry.submitted_at.to_rfc3339());
    println!("Status:       {}", inquiry.status);
    println!("Consent:      {}", if form.consent { "yes" } else { "no" });
    println!();
    println!("{}", form.message);
    Ok(ExitCode::SUCCESS)
}

fn print_inquiries(inquiries: &[StoredInquiry], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(inquiries)?);
        }
        OutputFormat::Plain => {
            for inquiry in inquiries {
                println!(
                    "#{} {} {} <{}> [{}]",
                    inquiry.id,
                    inquiry.submitted_at.format("%Y-%m-%d %H:%M"),
                    inquiry.display_name(),
                    inquiry.form.email,
                    inquiry.form.inquiry_type
                );
                println!("{}", inquiry.form.message);
                println!();
            }
        }
        OutputFormat::Table => {
            println!(
                "{:>5}  {:<16}  {:<24}  {:<26}  MESSAGE",
                "ID", "RECEIVED", "FROM", "TYPE"
            );
            for inquiry in inquiries {
                println!(
                    "{:>5}  {:<16}  {:<24}  {:<26}  {}",
                    inquiry.id,
                    inquiry.submitted_at.format("%Y-%m-%d %H:%M"),
                    preview(&inquiry.display_name(), 24),
                    preview(&inquiry.form.inquiry_type, 26),
                    preview(&inquiry.form.message, PREVIEW_CHARS)
                );
            }
        }
    }
    Ok(())
}

/// First `width` characters of `text` on one line, with an ellipsis if cut.
fn preview(text: &str, width: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    if flat.chars().count() <= width {
        flat
    } else {
        let cut: String = flat.chars().take(width.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

fn handle_status(config: &Config, json: bool) -> Result<()> {
    let database_path = config.database_path();
    let storage = Storage::open(&database_path)?;
    let stats = storage.stats()?;

    if json {
        let by_type: serde_json::Map<String, serde_json::Value> = stats
            .by_type
            .iter()
            .map(|(name, count)| (name.clone(), serde_json::Value::from(*count)))
            .collect();
        let status = serde_json::json!({
            "database_path": database_path,
            "collection": config.submission.collection,
            "total_inquiries": stats.total_inquiries,
            "oldest_inquiry": stats.oldest_inquiry,
            "newest_inquiry": stats.newest_inquiry,
            "by_type": by_type,
            "db_size_bytes": stats.db_size_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("inquirydesk status");
        println!("------------------");
        println!("Database:      {}", database_path.display());
        println!("Collection:    {}", config.submission.collection);
        println!("Inquiries:     {}", stats.total_inquiries);
        if let Some(oldest) = stats.oldest_inquiry {
            println!("Oldest:        {}", oldest.to_rfc3339());
        }
        if let Some(newest) = stats.newest_inquiry {
            println!("Newest:        {}", newest.to_rfc3339());
        }
        println!("Size:          {} bytes", stats.db_size_bytes);
        if !stats.by_type.is_empty() {
            println!();
            for (name, count) in &stats.by_type {
                println!("  {name:<28} {count}");
            }
        }
    }
    Ok(())
}

fn handle_types() {
    for inquiry_type in InquiryType::ALL {
        println!("{:<28} {}", inquiry_type, inquiry_type.routing_address());
    }
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<ExitCode> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Submission]");
                println!("  Collection:         {}", config.submission.collection);
                println!("  Timeout:            {}s", config.submission.timeout_secs);
                println!(
                    "  Notification:       {}s",
                    config.submission.notification_secs
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let explicit = file.is_some();
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            let loaded = if explicit || path.exists() {
                Config::load_file(&path)
            } else {
                println!("No configuration file found; checking defaults.");
                Config::load_from(Some(path))
            };
            match loaded {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => {
                    eprintln!("Configuration error: {e}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_short_text_unchanged() {
        assert_eq!(preview("hello", 10), "hello");
    }

    #[test]
    fn test_preview_truncates_with_ellipsis() {
        let cut = preview("abcdefghijkl", 5);
        assert_eq!(cut, "abcd…");
        assert_eq!(cut.chars().count(), 5);
    }

    #[test]
    fn test_preview_flattens_newlines() {
        assert_eq!(preview("line one\nline two", 40), "line one line two");
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome_label(&SubmitOutcome::TimedOut), "timed_out");
        assert_eq!(outcome_label(&SubmitOutcome::Failed), "failed");
        assert_eq!(outcome_label(&SubmitOutcome::Cancelled), "cancelled");
    }
}
