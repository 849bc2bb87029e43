//! `inquirydesk` - contact inquiry intake
//!
//! This library holds the contact form model, its validation rules, and the
//! submission controller that appends valid inquiries to a record store with
//! a bounded wait and a self-expiring notification. A `SQLite` store and a
//! CLI front end are bundled.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod form;
pub mod logging;
pub mod storage;
pub mod store;
pub mod validation;

pub use config::Config;
pub use controller::{InquiryController, SubmissionSettings, SubmitOutcome};
pub use error::{Error, Result};
pub use form::{FieldUpdate, InquiryForm, InquiryType};
pub use logging::init_logging;
pub use storage::{Storage, StorageStats};
pub use store::{RecordStore, SqliteRecordStore, StoreError};
pub use validation::{validate, ValidationResult};
