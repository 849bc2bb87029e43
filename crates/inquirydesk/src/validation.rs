//! Client-side validation of the inquiry form.
//!
//! Every rule runs on every pass; the result maps each failing field to
//! exactly one human-readable message. Validation never fails itself.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::form::{Field, InquiryForm, INQUIRY_TYPE_PLACEHOLDER};

/// Minimum trimmed message length, in characters.
pub const MIN_MESSAGE_LENGTH: usize = 10;

/// Shown when the first name is blank.
pub const FIRST_NAME_REQUIRED: &str = "First name is required";
/// Shown when the last name is blank.
pub const LAST_NAME_REQUIRED: &str = "Last name is required";
/// Shown when the email is blank.
pub const EMAIL_REQUIRED: &str = "Email is required";
/// Shown when the email fails the structural check.
pub const EMAIL_INVALID: &str = "Please enter a valid email address";
/// Shown when no inquiry type is selected.
pub const INQUIRY_TYPE_REQUIRED: &str = "Please select an inquiry type";
/// Shown when the message is blank.
pub const MESSAGE_REQUIRED: &str = "Message is required";
/// Shown when the trimmed message is under [`MIN_MESSAGE_LENGTH`].
pub const MESSAGE_TOO_SHORT: &str = "Message must be at least 10 characters";
/// Shown when the privacy policy box is unchecked.
pub const CONSENT_REQUIRED: &str = "You must agree to the privacy policy";

/// Structural email check: something, `@`, something, `.`, something.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// Per-field validation errors. An absent field is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationResult {
    errors: BTreeMap<Field, &'static str>,
}

impl ValidationResult {
    /// An empty (passing) result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no field failed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The error message for `field`, if it failed.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&'static str> {
        self.errors.get(&field).copied()
    }

    /// Whether `field` failed.
    #[must_use]
    pub fn contains(&self, field: Field) -> bool {
        self.errors.contains_key(&field)
    }

    /// Number of failing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether no field failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// The failing fields in display order.
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.errors.keys().copied()
    }

    /// `(field, message)` pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &'static str)> + '_ {
        self.errors.iter().map(|(field, msg)| (*field, *msg))
    }

    /// Drop the error recorded for `field`. Returns whether one was present.
    pub fn clear(&mut self, field: Field) -> bool {
        self.errors.remove(&field).is_some()
    }

    fn insert(&mut self, field: Field, message: &'static str) {
        self.errors.insert(field, message);
    }
}

/// Check whether `email` passes the structural email pattern.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Validate a form snapshot.
#[must_use]
pub fn validate(form: &InquiryForm) -> ValidationResult {
    let mut result = ValidationResult::new();

    if form.first_name.trim().is_empty() {
        result.insert(Field::FirstName, FIRST_NAME_REQUIRED);
    }

    if form.last_name.trim().is_empty() {
        result.insert(Field::LastName, LAST_NAME_REQUIRED);
    }

    // The pattern sees the raw value, so surrounding whitespace fails it.
    if form.email.trim().is_empty() {
        result.insert(Field::Email, EMAIL_REQUIRED);
    } else if !is_valid_email(&form.email) {
        result.insert(Field::Email, EMAIL_INVALID);
    }

    if form.inquiry_type.is_empty() || form.inquiry_type == INQUIRY_TYPE_PLACEHOLDER {
        result.insert(Field::InquiryType, INQUIRY_TYPE_REQUIRED);
    }

    let message = form.message.trim();
    if message.is_empty() {
        result.insert(Field::Message, MESSAGE_REQUIRED);
    } else if message.chars().count() < MIN_MESSAGE_LENGTH {
        result.insert(Field::Message, MESSAGE_TOO_SHORT);
    }

    if !form.consent {
        result.insert(Field::Consent, CONSENT_REQUIRED);
    }

    result
}
