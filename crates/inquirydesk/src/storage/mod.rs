//! Storage layer for inquirydesk.
//!
//! This module provides `SQLite`-based persistent storage for submitted
//! inquiries: the `contacts` collection plus read-side queries used by the
//! CLI.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::form::{InquiryForm, RecordStatus, SubmissionRecord, StoredInquiry};

/// Columns selected by every read query, in `row_to_inquiry` order.
const SELECT_COLUMNS: &str = "id, first_name, last_name, email, institution, inquiry_type, \
                              message, consent, submitted_at, status";

/// Storage engine for submitted inquiries.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist,
    /// and migrates the schema to the current version.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a submission record, assigning `now` as its submission time
    /// if the record still carries the server timestamp sentinel.
    ///
    /// Returns the assigned ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert(&self, record: &SubmissionRecord, now: DateTime<Utc>) -> Result<i64> {
        let form = record.form();
        // Fixed-width UTC text, so lexical order is chronological order.
        let submitted_at = record
            .submitted_at()
            .resolve(now)
            .to_rfc3339_opts(SecondsFormat::Micros, true);

        self.conn.execute(
            r"
            INSERT INTO contacts (
                first_name, last_name, email, institution, inquiry_type,
                message, consent, submitted_at, status
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
            params![
                form.first_name,
                form.last_name,
                form.email,
                form.institution,
                form.inquiry_type,
                form.message,
                form.consent,
                submitted_at,
                record.status().to_string(),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted inquiry with id {}", id);
        Ok(id)
    }

    /// Get an inquiry by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: i64) -> Result<Option<StoredInquiry>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM contacts WHERE id = ?1");
        let result = self
            .conn
            .query_row(&sql, [id], Self::row_to_inquiry)
            .optional()?;
        Ok(result)
    }

    /// Get the most recent inquiries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<StoredInquiry>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM contacts ORDER BY submitted_at DESC, id DESC LIMIT ?1"
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let inquiries = stmt
            .query_map([to_sql_limit(limit)], Self::row_to_inquiry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(inquiries)
    }

    /// Get the most recent inquiries of one type, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_by_inquiry_type(
        &self,
        inquiry_type: &str,
        limit: usize,
    ) -> Result<Vec<StoredInquiry>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM contacts WHERE inquiry_type = ?1 \
             ORDER BY submitted_at DESC, id DESC LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let inquiries = stmt
            .query_map(
                params![inquiry_type, to_sql_limit(limit)],
                Self::row_to_inquiry,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(inquiries)
    }

    /// Search inquiries by sender name, email, institution or message.
    ///
    /// Performs a case-insensitive substring search. `%` and `_` in the
    /// query match themselves.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<StoredInquiry>> {
        let pattern = format!("%{}%", escape_like(query));
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM contacts \
             WHERE first_name LIKE ?1 ESCAPE '\\' OR last_name LIKE ?1 ESCAPE '\\' \
                OR email LIKE ?1 ESCAPE '\\' OR institution LIKE ?1 ESCAPE '\\' \
                OR message LIKE ?1 ESCAPE '\\' \
             ORDER BY submitted_at DESC, id DESC LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let inquiries = stmt
            .query_map(params![pattern, to_sql_limit(limit)], Self::row_to_inquiry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(inquiries)
    }

    /// Count total inquiries in storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM contacts", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let total_inquiries = self.count()?;

        let (oldest, newest): (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(submitted_at), MAX(submitted_at) FROM contacts",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT inquiry_type, COUNT(*) FROM contacts GROUP BY inquiry_type ORDER BY inquiry_type",
        )?;
        let by_type = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<(String, i64)>, _>>()?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_inquiries,
            oldest_inquiry: oldest.as_deref().and_then(parse_timestamp),
            newest_inquiry: newest.as_deref().and_then(parse_timestamp),
            by_type,
            db_size_bytes,
        })
    }

    /// Convert a database row to a `StoredInquiry`.
    fn row_to_inquiry(row: &rusqlite::Row) -> rusqlite::Result<StoredInquiry> {
        let submitted_at_str: String = row.get(8)?;
        let status_str: String = row.get(9)?;

        let submitted_at = parse_timestamp(&submitted_at_str).unwrap_or_else(|| {
            warn!("Unparseable submitted_at: {}, using now", submitted_at_str);
            Utc::now()
        });

        let status = status_str.parse().unwrap_or_else(|_| {
            warn!("Unknown inquiry status: {}, defaulting to new", status_str);
            RecordStatus::New
        });

        Ok(StoredInquiry {
            id: row.get(0)?,
            submitted_at,
            status,
            form: InquiryForm {
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                email: row.get(3)?,
                institution: row.get(4)?,
                inquiry_type: row.get(5)?,
                message: row.get(6)?,
                consent: row.get(7)?,
            },
        })
    }
}

/// Escape `LIKE` wildcards with `\`.
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn to_sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Total number of inquiries stored.
    pub total_inquiries: i64,
    /// Submission time of the oldest inquiry.
    pub oldest_inquiry: Option<DateTime<Utc>>,
    /// Submission time of the newest inquiry.
    pub newest_inquiry: Option<DateTime<Utc>>,
    /// Inquiry counts per raw inquiry type, sorted by type.
    pub by_type: Vec<(String, i64)>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
