//! Transient user-facing feedback about a submission attempt.

use serde::Serialize;
use tokio::time::Instant;

/// Shown after the record store accepts an inquiry.
pub const SUCCESS_MESSAGE: &str =
    "Thank you for contacting us! We'll get back to you within 24-48 hours.";

/// Shown when the record store does not answer in time.
pub const TIMEOUT_MESSAGE: &str =
    "Request timed out. Please check your connection and try again.";

/// Shown when the record store rejects an inquiry.
pub const FAILURE_MESSAGE: &str =
    "Something went wrong. Please try again or email us directly.";

/// What kind of banner, if any, is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Nothing displayed.
    #[default]
    None,
    /// The inquiry was received.
    Success,
    /// The inquiry was not received.
    Failure,
}

/// The banner shown after a submission resolves.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Notification {
    /// Banner kind.
    pub kind: NotificationKind,
    /// Banner text; empty when nothing is displayed.
    pub message: String,
    /// When the banner clears itself.
    #[serde(skip)]
    pub expires_at: Option<Instant>,
}

impl Notification {
    /// No banner.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    pub(crate) fn new(kind: NotificationKind, message: &str, expires_at: Instant) -> Self {
        Self {
            kind,
            message: message.to_string(),
            expires_at: Some(expires_at),
        }
    }

    /// Whether a banner is displayed.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.kind != NotificationKind::None
    }
}
