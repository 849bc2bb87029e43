//! `SQLite` schema definitions for inquirydesk.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the contacts table.
pub const CREATE_CONTACTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS contacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL,
    institution TEXT NOT NULL DEFAULT '',
    inquiry_type TEXT NOT NULL,
    message TEXT NOT NULL,
    consent INTEGER NOT NULL,
    submitted_at TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'new'
)
";

/// SQL statement to create an index on `submitted_at` for recency queries.
pub const CREATE_SUBMITTED_AT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_contacts_submitted_at ON contacts(submitted_at DESC)
";

/// SQL statement to create an index on email for sender lookups.
pub const CREATE_EMAIL_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_contacts_email ON contacts(email)
";

/// SQL statement to create an index on `inquiry_type` for filtering.
pub const CREATE_TYPE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_contacts_type ON contacts(inquiry_type)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_CONTACTS_TABLE,
    CREATE_SUBMITTED_AT_INDEX,
    CREATE_EMAIL_INDEX,
    CREATE_TYPE_INDEX,
    CREATE_METADATA_TABLE,
];
