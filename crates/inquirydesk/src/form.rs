//! Core inquiry types for inquirydesk.
//!
//! This module defines the contact form a visitor fills in, the typed field
//! updates the presentation layer sends, and the immutable record that is
//! handed to a record store on submission.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The option text a select control shows before a choice is made.
pub const INQUIRY_TYPE_PLACEHOLDER: &str = "Select an option";

/// A field of the inquiry form.
///
/// Declaration order is display order; validation results iterate in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    /// Visitor's given name.
    FirstName,
    /// Visitor's family name.
    LastName,
    /// Reply address.
    Email,
    /// Hospital, university or company. Optional.
    Institution,
    /// Selected inquiry category.
    InquiryType,
    /// Free-text message body.
    Message,
    /// Privacy policy agreement.
    Consent,
}

impl Field {
    /// Every form field, in display order.
    pub const ALL: [Field; 7] = [
        Self::FirstName,
        Self::LastName,
        Self::Email,
        Self::Institution,
        Self::InquiryType,
        Self::Message,
        Self::Consent,
    ];

    /// The wire name of the field, as used in stored documents.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::Email => "email",
            Self::Institution => "institution",
            Self::InquiryType => "inquiryType",
            Self::Message => "message",
            Self::Consent => "consent",
        }
    }

    /// Whether the field must be filled in before submission.
    #[must_use]
    pub fn is_required(&self) -> bool {
        !matches!(self, Self::Institution)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = Error;

    /// Accepts `firstName`, `first_name` and `first-name` spellings.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        Self::ALL
            .into_iter()
            .find(|field| field.as_str().to_lowercase() == normalized)
            .ok_or_else(|| Error::unknown_field(s))
    }
}

/// A single edit to the inquiry form, carrying a value of the right type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    /// New first name.
    FirstName(String),
    /// New last name.
    LastName(String),
    /// New email address.
    Email(String),
    /// New institution.
    Institution(String),
    /// New inquiry type selection (raw option text).
    InquiryType(String),
    /// New message body.
    Message(String),
    /// New consent checkbox state.
    Consent(bool),
}

impl FieldUpdate {
    /// The field this update targets.
    #[must_use]
    pub fn field(&self) -> Field {
        match self {
            Self::FirstName(_) => Field::FirstName,
            Self::LastName(_) => Field::LastName,
            Self::Email(_) => Field::Email,
            Self::Institution(_) => Field::Institution,
            Self::InquiryType(_) => Field::InquiryType,
            Self::Message(_) => Field::Message,
            Self::Consent(_) => Field::Consent,
        }
    }

    /// Build an update from a field name and a raw string value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] if the name matches no field, or
    /// [`Error::InvalidFieldValue`] if the consent value is not a boolean.
    pub fn parse(name: &str, raw: &str) -> Result<Self> {
        let field: Field = name.parse()?;
        let value = raw.to_string();

        Ok(match field {
            Field::FirstName => Self::FirstName(value),
            Field::LastName => Self::LastName(value),
            Field::Email => Self::Email(value),
            Field::Institution => Self::Institution(value),
            Field::InquiryType => Self::InquiryType(value),
            Field::Message => Self::Message(value),
            Field::Consent => Self::Consent(parse_checkbox(raw)?),
        })
    }
}

fn parse_checkbox(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" | "" => Ok(false),
        _ => Err(Error::invalid_field_value(Field::Consent.as_str(), raw)),
    }
}

/// The contact form as currently filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InquiryForm {
    /// Visitor's given name.
    pub first_name: String,
    /// Visitor's family name.
    pub last_name: String,
    /// Reply address.
    pub email: String,
    /// Optional institution.
    pub institution: String,
    /// Raw selected inquiry type; empty or the placeholder when unset.
    pub inquiry_type: String,
    /// Free-text message.
    pub message: String,
    /// Privacy policy agreement.
    pub consent: bool,
}

impl InquiryForm {
    /// Overwrite the attribute named by `update`.
    pub fn apply(&mut self, update: FieldUpdate) {
        match update {
            FieldUpdate::FirstName(v) => self.first_name = v,
            FieldUpdate::LastName(v) => self.last_name = v,
            FieldUpdate::Email(v) => self.email = v,
            FieldUpdate::Institution(v) => self.institution = v,
            FieldUpdate::InquiryType(v) => self.inquiry_type = v,
            FieldUpdate::Message(v) => self.message = v,
            FieldUpdate::Consent(v) => self.consent = v,
        }
    }

    /// Reset every field to its empty state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Whether every field is in its empty state.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The selected inquiry type, if it names one of the known options.
    #[must_use]
    pub fn selected_type(&self) -> Option<InquiryType> {
        self.inquiry_type.parse().ok()
    }
}

/// The inquiry categories offered on the contact page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InquiryType {
    /// Hospitals and research institutions joining the network.
    #[serde(rename = "Institutional Partnership")]
    InstitutionalPartnership,
    /// Pharmaceutical, AI companies and enterprise licensing.
    #[serde(rename = "Commercial Inquiry")]
    CommercialInquiry,
    /// Platform usage, API integration and troubleshooting.
    #[serde(rename = "Technical Support")]
    TechnicalSupport,
    /// Journalists and speaking opportunities.
    #[serde(rename = "Media & Press")]
    MediaAndPress,
    /// Academic research collaborations.
    #[serde(rename = "Academic Research")]
    AcademicResearch,
    /// Anything else.
    #[serde(rename = "Other")]
    Other,
}

impl InquiryType {
    /// All options, in the order the select control lists them.
    pub const ALL: [InquiryType; 6] = [
        Self::InstitutionalPartnership,
        Self::CommercialInquiry,
        Self::TechnicalSupport,
        Self::MediaAndPress,
        Self::AcademicResearch,
        Self::Other,
    ];

    /// The option text.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InstitutionalPartnership => "Institutional Partnership",
            Self::CommercialInquiry => "Commercial Inquiry",
            Self::TechnicalSupport => "Technical Support",
            Self::MediaAndPress => "Media & Press",
            Self::AcademicResearch => "Academic Research",
            Self::Other => "Other",
        }
    }

    /// The mailbox that handles this kind of inquiry.
    #[must_use]
    pub fn routing_address(&self) -> &'static str {
        match self {
            Self::InstitutionalPartnership => "partnerships@afribiobank.org",
            Self::CommercialInquiry => "enterprise@afribiobank.org",
            Self::TechnicalSupport => "support@afribiobank.org",
            Self::MediaAndPress => "press@afribiobank.org",
            Self::AcademicResearch | Self::Other => "info@afribiobank.org",
        }
    }
}

impl fmt::Display for InquiryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InquiryType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::invalid_field_value(Field::InquiryType.as_str(), s))
    }
}

/// Lifecycle tag carried by a stored inquiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Newly received, not yet handled.
    #[default]
    New,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
        }
    }
}

impl FromStr for RecordStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "new" => Ok(Self::New),
            other => Err(Error::invalid_field_value("status", other)),
        }
    }
}

/// Submission time of a record.
///
/// Records are built with [`SubmittedAt::ServerTimestamp`]; the store
/// replaces it with its own clock reading when the record is appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmittedAt {
    /// To be assigned by the store.
    ServerTimestamp,
    /// Assigned time.
    At(DateTime<Utc>),
}

impl SubmittedAt {
    /// The assigned time, or `now` if the store has not assigned one yet.
    #[must_use]
    pub fn resolve(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::ServerTimestamp => now,
            Self::At(at) => at,
        }
    }
}

/// An immutable snapshot of a valid form, ready to be appended to a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    #[serde(flatten)]
    form: InquiryForm,
    submitted_at: SubmittedAt,
    status: RecordStatus,
}

impl SubmissionRecord {
    /// Snapshot `form` into a new record awaiting a server timestamp.
    #[must_use]
    pub fn new(form: &InquiryForm) -> Self {
        Self {
            form: form.clone(),
            submitted_at: SubmittedAt::ServerTimestamp,
            status: RecordStatus::New,
        }
    }

    /// Return this record with its server timestamp assigned.
    ///
    /// A record whose timestamp is already assigned is returned unchanged.
    #[cfg(test)]
    #[must_use]
    pub(crate) fn stamped(self, now: DateTime<Utc>) -> Self {
        Self {
            submitted_at: SubmittedAt::At(self.submitted_at.resolve(now)),
            ..self
        }
    }

    /// The form snapshot.
    #[must_use]
    pub fn form(&self) -> &InquiryForm {
        &self.form
    }

    /// When the record was submitted.
    #[must_use]
    pub fn submitted_at(&self) -> SubmittedAt {
        self.submitted_at
    }

    /// The record's status tag.
    #[must_use]
    pub fn status(&self) -> RecordStatus {
        self.status
    }
}

/// An inquiry as read back from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredInquiry {
    /// Storage-assigned identifier.
    pub id: i64,
    /// When the inquiry was received.
    pub submitted_at: DateTime<Utc>,
    /// Lifecycle tag.
    pub status: RecordStatus,
    /// The submitted fields.
    #[serde(flatten)]
    pub form: InquiryForm,
}

impl StoredInquiry {
    /// "First Last" display name.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.form.first_name, self.form.last_name)
            .trim()
            .to_string()
    }
}
