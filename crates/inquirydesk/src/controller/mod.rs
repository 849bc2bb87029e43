//! The inquiry submission controller.
//!
//! [`InquiryController`] owns one contact form: it applies field edits,
//! validates on demand, performs at most one time-bounded append to a
//! [`RecordStore`] at a time, and turns the outcome into a self-expiring
//! [`Notification`].
//!
//! The append and the timeout are two independent completion sources
//! feeding a [`Settlement`]; whichever settles first decides the outcome
//! and the loser's later signal is dropped. A store that answers after the
//! timeout has already been reported can therefore never overwrite the
//! failure banner or clear the form.
//!
//! The outcome is applied by a spawned task, not by the caller of
//! [`InquiryController::submit`], so a caller that stops waiting (a
//! `select!`, an outer timeout, an aborted task) still leaves the
//! controller idle and ready for the next submission.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use inquirydesk::controller::{InquiryController, SubmissionSettings, SubmitOutcome};
//! use inquirydesk::form::FieldUpdate;
//! use inquirydesk::store::{SqliteRecordStore, DEFAULT_COLLECTION};
//!
//! # async fn run() -> inquirydesk::Result<()> {
//! let store = SqliteRecordStore::open("inquiries.db", DEFAULT_COLLECTION)?;
//! let controller = InquiryController::new(Arc::new(store), SubmissionSettings::default());
//!
//! controller.update_field(FieldUpdate::FirstName("Ada".into()));
//! // ... remaining fields ...
//!
//! match controller.submit().await {
//!     SubmitOutcome::Rejected(errors) => println!("{} fields need attention", errors.len()),
//!     _ => println!("{}", controller.notification().message),
//! }
//! # Ok(())
//! # }
//! ```

mod notification;
mod settlement;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::form::{FieldUpdate, InquiryForm, SubmissionRecord};
use crate::store::{RecordId, RecordStore, StoreError, DEFAULT_COLLECTION};
use crate::validation::{self, ValidationResult};

pub use notification::{
    Notification, NotificationKind, FAILURE_MESSAGE, SUCCESS_MESSAGE, TIMEOUT_MESSAGE,
};
pub use settlement::Settlement;

/// How long the record store gets before a submission counts as timed out.
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(15);

/// How long a notification stays on screen.
pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_secs(5);

/// Stand-in deadline for durations too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Tunables for a controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionSettings {
    /// Collection records are appended to.
    pub collection: String,
    /// Upper bound on a single store append.
    pub timeout: Duration,
    /// Display duration of a notification.
    pub notification_ttl: Duration,
}

impl Default for SubmissionSettings {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            timeout: DEFAULT_SUBMIT_TIMEOUT,
            notification_ttl: DEFAULT_NOTIFICATION_TTL,
        }
    }
}

/// Where the controller is in the submission lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionPhase {
    /// Ready for edits and submission.
    #[default]
    Idle,
    /// A store append is in flight.
    Submitting,
    /// The last submission succeeded; its notification is showing.
    Succeeded,
    /// The last submission failed; its notification is showing.
    Failed,
}

/// Result of one [`InquiryController::submit`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Validation failed; the store was not contacted.
    Rejected(ValidationResult),
    /// Another submission was already in flight.
    Ignored,
    /// The store accepted the record.
    Succeeded(RecordId),
    /// The store did not answer before the timeout.
    TimedOut,
    /// The store rejected the record.
    Failed,
    /// The controller was torn down while the append was in flight.
    Cancelled,
}

impl SubmitOutcome {
    /// Whether the inquiry reached the store.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

/// Everything the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ControllerSnapshot {
    /// Current form contents.
    pub form: InquiryForm,
    /// Errors from the last validation pass, minus fields edited since.
    pub errors: ValidationResult,
    /// Whether a submission is in flight.
    pub submitting: bool,
    /// Lifecycle phase.
    pub phase: SubmissionPhase,
    /// Current banner.
    pub notification: Notification,
    /// Whether [`InquiryController::teardown`] has run.
    pub torn_down: bool,
}

/// The two competing completions of a submission, plus teardown.
#[derive(Debug)]
enum Signal {
    Appended(Result<RecordId, StoreError>),
    TimedOut,
    TornDown,
}

/// What `begin_submission` decided.
enum Begin {
    Busy,
    Rejected(ValidationResult),
    Started {
        record: SubmissionRecord,
        settlement: Arc<Settlement<Signal>>,
        outcome: oneshot::Receiver<Signal>,
    },
}

#[derive(Debug, Default)]
struct State {
    form: InquiryForm,
    errors: ValidationResult,
    phase: SubmissionPhase,
    notification: Notification,
    notification_epoch: u64,
    reset_task: Option<JoinHandle<()>>,
    timeout_task: Option<JoinHandle<()>>,
    in_flight: Option<Arc<Settlement<Signal>>>,
    torn_down: bool,
}

impl State {
    fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            form: self.form.clone(),
            errors: self.errors.clone(),
            submitting: self.phase == SubmissionPhase::Submitting,
            phase: self.phase,
            notification: self.notification.clone(),
            torn_down: self.torn_down,
        }
    }

    fn cancel_timers(&mut self) {
        if let Some(task) = self.timeout_task.take() {
            task.abort();
        }
        if let Some(task) = self.reset_task.take() {
            task.abort();
        }
    }
}

struct Inner {
    store: Arc<dyn RecordStore>,
    settings: SubmissionSettings,
    state: Mutex<State>,
    updates: watch::Sender<ControllerSnapshot>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &State) {
        self.updates.send_replace(state.snapshot());
    }

    fn expire_notification(&self, epoch: u64) {
        let mut state = self.lock();
        if state.torn_down || state.notification_epoch != epoch {
            return;
        }

        trace!("Notification expired");
        state.notification = Notification::none();
        state.reset_task = None;
        if matches!(
            state.phase,
            SubmissionPhase::Succeeded | SubmissionPhase::Failed
        ) {
            state.phase = SubmissionPhase::Idle;
        }
        self.publish(&state);
    }
}

impl Inner {
    /// Apply the winning signal of a submission.
    fn finish_submission(self: &Arc<Self>, signal: Signal) -> SubmitOutcome {
        let mut state = self.lock();
        if let Some(task) = state.timeout_task.take() {
            task.abort();
        }
        state.in_flight = None;

        if state.torn_down {
            state.phase = SubmissionPhase::Idle;
            self.publish(&state);
            return SubmitOutcome::Cancelled;
        }

        let outcome = match signal {
            Signal::Appended(Ok(id)) => {
                info!("Inquiry submitted as record {}", id);
                state.form.clear();
                state.phase = SubmissionPhase::Succeeded;
                self.show_notification(&mut state, NotificationKind::Success, SUCCESS_MESSAGE);
                SubmitOutcome::Succeeded(id)
            }
            Signal::TimedOut => {
                warn!("Inquiry submission timed out after {:?}", self.settings.timeout);
                state.phase = SubmissionPhase::Failed;
                self.show_notification(&mut state, NotificationKind::Failure, TIMEOUT_MESSAGE);
                SubmitOutcome::TimedOut
            }
            Signal::Appended(Err(e)) => {
                error!("Error submitting inquiry: {}", e);
                state.phase = SubmissionPhase::Failed;
                self.show_notification(&mut state, NotificationKind::Failure, FAILURE_MESSAGE);
                SubmitOutcome::Failed
            }
            Signal::TornDown => {
                state.phase = SubmissionPhase::Idle;
                SubmitOutcome::Cancelled
            }
        };

        self.publish(&state);
        outcome
    }

    /// Replace the notification and re-arm its expiry.
    fn show_notification(
        self: &Arc<Self>,
        state: &mut State,
        kind: NotificationKind,
        message: &str,
    ) {
        if let Some(task) = state.reset_task.take() {
            task.abort();
        }

        state.notification_epoch += 1;
        let epoch = state.notification_epoch;
        let expires_at = deadline_after(self.settings.notification_ttl);
        state.notification = Notification::new(kind, message, expires_at);

        let inner: Weak<Inner> = Arc::downgrade(self);
        state.reset_task = Some(tokio::spawn(async move {
            tokio::time::sleep_until(expires_at).await;
            if let Some(inner) = inner.upgrade() {
                inner.expire_notification(epoch);
            }
        }));
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        state.cancel_timers();
        if let Some(settlement) = state.in_flight.take() {
            settlement.settle(Signal::TornDown);
        }
    }
}

/// `now + duration`, or a far-future instant if that overflows the clock.
fn deadline_after(duration: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(duration).unwrap_or_else(|| now + FAR_FUTURE)
}

/// A handle to one contact form's submission state.
///
/// Cloning is cheap; all clones drive the same form. Timers are cancelled
/// by [`teardown`](Self::teardown) or when the last handle is dropped.
#[derive(Clone)]
pub struct InquiryController {
    inner: Arc<Inner>,
}

impl fmt::Debug for InquiryController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InquiryController")
            .field("settings", &self.inner.settings)
            .field("state", &*self.inner.lock())
            .finish_non_exhaustive()
    }
}

impl InquiryController {
    /// Create a controller with an empty form.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, settings: SubmissionSettings) -> Self {
        let (updates, _) = watch::channel(ControllerSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                store,
                settings,
                state: Mutex::new(State::default()),
                updates,
            }),
        }
    }

    /// The settings this controller was built with.
    #[must_use]
    pub fn settings(&self) -> &SubmissionSettings {
        &self.inner.settings
    }

    /// Apply one field edit.
    ///
    /// A validation error previously recorded for the edited field is
    /// dropped without re-validating; other fields keep theirs until the
    /// next [`validate`](Self::validate).
    pub fn update_field(&self, update: FieldUpdate) {
        let mut state = self.inner.lock();
        let field = update.field();
        state.form.apply(update);
        if state.errors.clear(field) {
            trace!("Cleared validation error for {}", field);
        }
        self.inner.publish(&state);
    }

    /// Validate the current form and keep the result for display.
    pub fn validate(&self) -> ValidationResult {
        let mut state = self.inner.lock();
        let result = validation::validate(&state.form);
        state.errors = result.clone();
        self.inner.publish(&state);
        result
    }

    /// Validate and, if valid, append the form to the record store.
    ///
    /// Never fails: every outcome is reported through the returned value,
    /// the stored validation result and the notification. Dropping the
    /// returned future does not cancel the submission.
    pub async fn submit(&self) -> SubmitOutcome {
        let (record, settlement, signal) = match self.begin_submission() {
            Begin::Busy => return SubmitOutcome::Ignored,
            Begin::Rejected(errors) => return SubmitOutcome::Rejected(errors),
            Begin::Started {
                record,
                settlement,
                outcome,
            } => (record, settlement, outcome),
        };

        self.spawn_append(record, Arc::clone(&settlement));
        self.spawn_timeout(settlement);

        let (done_tx, done_rx) = oneshot::channel();
        let inner = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            // The sender lives in `in_flight` until something settles it;
            // teardown and drop both do.
            let signal = signal.await.unwrap_or(Signal::TornDown);
            let outcome = match inner.upgrade() {
                Some(inner) => inner.finish_submission(signal),
                None => SubmitOutcome::Cancelled,
            };
            let _ = done_tx.send(outcome);
        });

        done_rx.await.unwrap_or(SubmitOutcome::Cancelled)
    }

    /// Check the in-flight guard and validation; enter `Submitting` if both pass.
    fn begin_submission(&self) -> Begin {
        let mut state = self.inner.lock();

        if state.torn_down {
            debug!("Submit called after teardown, ignoring");
            return Begin::Busy;
        }
        if state.phase == SubmissionPhase::Submitting {
            debug!("Submission already in flight, ignoring");
            return Begin::Busy;
        }

        let errors = validation::validate(&state.form);
        state.errors = errors.clone();
        if !errors.is_valid() {
            debug!("Inquiry failed validation on {} field(s)", errors.len());
            self.inner.publish(&state);
            return Begin::Rejected(errors);
        }

        // A banner from the previous attempt does not outlive the retry.
        if let Some(task) = state.reset_task.take() {
            task.abort();
        }
        state.notification_epoch += 1;
        state.notification = Notification::none();

        let (settlement, outcome) = Settlement::new();
        let settlement = Arc::new(settlement);
        state.in_flight = Some(Arc::clone(&settlement));
        state.phase = SubmissionPhase::Submitting;
        self.inner.publish(&state);

        Begin::Started {
            record: SubmissionRecord::new(&state.form),
            settlement,
            outcome,
        }
    }

    fn spawn_append(&self, record: SubmissionRecord, settlement: Arc<Settlement<Signal>>) {
        let store = Arc::clone(&self.inner.store);
        let collection = self.inner.settings.collection.clone();

        tokio::spawn(async move {
            let result = store.append(&collection, record).await;
            if !settlement.settle(Signal::Appended(result)) {
                debug!("Store append resolved after the submission settled, ignoring");
            }
        });
    }

    fn spawn_timeout(&self, settlement: Arc<Settlement<Signal>>) {
        let deadline = deadline_after(self.inner.settings.timeout);
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if !settlement.settle(Signal::TimedOut) {
                debug!("Submission timer fired after the submission settled, ignoring");
            }
        });

        let mut state = self.inner.lock();
        if state.torn_down {
            task.abort();
        } else {
            state.timeout_task = Some(task);
        }
    }

    /// Cancel every pending timer and stop reacting to late callbacks.
    ///
    /// An in-flight [`submit`](Self::submit) returns
    /// [`SubmitOutcome::Cancelled`]. Field edits keep working; further
    /// submissions are ignored.
    pub fn teardown(&self) {
        let mut state = self.inner.lock();
        if state.torn_down {
            return;
        }

        debug!("Tearing down inquiry controller");
        state.torn_down = true;
        state.cancel_timers();
        if let Some(settlement) = state.in_flight.take() {
            settlement.settle(Signal::TornDown);
        }
        self.inner.publish(&state);
    }

    /// Whether [`teardown`](Self::teardown) has run.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.inner.lock().torn_down
    }

    /// Current state for rendering.
    #[must_use]
    pub fn snapshot(&self) -> ControllerSnapshot {
        self.inner.lock().snapshot()
    }

    /// Receive a fresh snapshot after every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ControllerSnapshot> {
        self.inner.updates.subscribe()
    }

    /// Current form contents.
    #[must_use]
    pub fn form(&self) -> InquiryForm {
        self.inner.lock().form.clone()
    }

    /// Current validation errors.
    #[must_use]
    pub fn errors(&self) -> ValidationResult {
        self.inner.lock().errors.clone()
    }

    /// Whether a submission is in flight.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.inner.lock().phase == SubmissionPhase::Submitting
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SubmissionPhase {
        self.inner.lock().phase
    }

    /// Current banner.
    #[must_use]
    pub fn notification(&self) -> Notification {
        self.inner.lock().notification.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::form::{Field, SubmittedAt};
    use crate::logging::init_test_logging;
    use crate::validation::{FIRST_NAME_REQUIRED, MESSAGE_TOO_SHORT};

    /// How the scripted store answers one append.
    #[derive(Debug, Clone)]
    struct Step {
        /// `None` never answers.
        delay: Option<Duration>,
        result: Result<(), StoreError>,
    }

    impl Step {
        fn ok_after(secs: u64) -> Self {
            Self {
                delay: Some(Duration::from_secs(secs)),
                result: Ok(()),
            }
        }

        fn reject_after(secs: u64) -> Self {
            Self {
                delay: Some(Duration::from_secs(secs)),
                result: Err(StoreError::Backend("permission denied".to_string())),
            }
        }

        fn never() -> Self {
            Self {
                delay: None,
                result: Ok(()),
            }
        }
    }

    /// A record store that follows a script, one step per append.
    #[derive(Debug, Default)]
    struct ScriptedStore {
        steps: Mutex<VecDeque<Step>>,
        calls: AtomicUsize,
        completed: AtomicUsize,
        records: Mutex<Vec<(String, SubmissionRecord)>>,
    }

    impl ScriptedStore {
        fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into_iter().collect()),
                ..Self::default()
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn completed(&self) -> usize {
            self.completed.load(Ordering::SeqCst)
        }

        fn records(&self) -> Vec<(String, SubmissionRecord)> {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecordStore for ScriptedStore {
        async fn append(
            &self,
            collection: &str,
            record: SubmissionRecord,
        ) -> Result<RecordId, StoreError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.records
                .lock()
                .unwrap()
                .push((collection.to_string(), record));
            let step = self
                .steps
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Step::ok_after(0));

            match step.delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => std::future::pending::<()>().await,
            }

            self.completed.fetch_add(1, Ordering::SeqCst);
            step.result.map(|()| RecordId::new(format!("doc-{n}")))
        }
    }

    fn ada_updates() -> Vec<FieldUpdate> {
        vec![
            FieldUpdate::FirstName("Ada".to_string()),
            FieldUpdate::LastName("Okoye".to_string()),
            FieldUpdate::Email("ada@example.org".to_string()),
            FieldUpdate::Institution(String::new()),
            FieldUpdate::InquiryType("Technical Support".to_string()),
            FieldUpdate::Message("Need help integrating the API".to_string()),
            FieldUpdate::Consent(true),
        ]
    }

    fn ada_form() -> InquiryForm {
        let mut form = InquiryForm::default();
        for update in ada_updates() {
            form.apply(update);
        }
        form
    }

    fn controller_with(store: &Arc<ScriptedStore>) -> InquiryController {
        init_test_logging();
        let store: Arc<dyn RecordStore> = store.clone();
        let controller = InquiryController::new(store, SubmissionSettings::default());
        for update in ada_updates() {
            controller.update_field(update);
        }
        controller
    }

    #[test]
    fn test_default_settings() {
        let settings = SubmissionSettings::default();
        assert_eq!(settings.collection, "contacts");
        assert_eq!(settings.timeout, Duration::from_secs(15));
        assert_eq!(settings.notification_ttl, Duration::from_secs(5));
    }

    #[test]
    fn test_new_controller_is_idle_and_empty() {
        let store: Arc<dyn RecordStore> = ScriptedStore::new([]);
        let controller = InquiryController::new(store, SubmissionSettings::default());

        let snapshot = controller.snapshot();
        assert!(snapshot.form.is_empty());
        assert!(snapshot.errors.is_empty());
        assert!(!snapshot.submitting);
        assert_eq!(snapshot.phase, SubmissionPhase::Idle);
        assert!(!snapshot.notification.is_visible());
    }

    #[test]
    fn test_update_field_clears_only_that_error() {
        let store: Arc<dyn RecordStore> = ScriptedStore::new([]);
        let controller = InquiryController::new(store, SubmissionSettings::default());

        assert_eq!(controller.validate().len(), 6);

        // Still blank, but the error goes away until the next full pass.
        controller.update_field(FieldUpdate::FirstName(String::new()));
        let errors = controller.errors();
        assert!(!errors.contains(Field::FirstName));
        assert_eq!(errors.len(), 5);

        assert_eq!(
            controller.validate().get(Field::FirstName),
            Some(FIRST_NAME_REQUIRED)
        );
    }

    #[test]
    fn test_update_field_twice_matches_once() {
        let store: Arc<dyn RecordStore> = ScriptedStore::new([]);
        let once = InquiryController::new(Arc::clone(&store), SubmissionSettings::default());
        let twice = InquiryController::new(store, SubmissionSettings::default());

        once.update_field(FieldUpdate::Email("ada@example.org".to_string()));
        twice.update_field(FieldUpdate::Email("ada@example.org".to_string()));
        twice.update_field(FieldUpdate::Email("ada@example.org".to_string()));

        assert_eq!(once.form(), twice.form());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_clears_form_and_expires_notification() {
        let store = ScriptedStore::new([Step::ok_after(1)]);
        let controller = controller_with(&store);
        let started = Instant::now();

        let outcome = controller.submit().await;

        assert_eq!(outcome, SubmitOutcome::Succeeded(RecordId::new("doc-1")));
        assert!(outcome.is_success());
        assert_eq!(started.elapsed(), Duration::from_secs(1));
        assert_eq!(store.calls(), 1);
        assert!(controller.form().is_empty());
        assert!(!controller.is_submitting());
        assert_eq!(controller.phase(), SubmissionPhase::Succeeded);

        let notification = controller.notification();
        assert_eq!(notification.kind, NotificationKind::Success);
        assert_eq!(notification.message, SUCCESS_MESSAGE);
        assert_eq!(
            notification.expires_at,
            Some(started + Duration::from_secs(6))
        );

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert!(controller.notification().is_visible());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!controller.notification().is_visible());
        assert_eq!(controller.phase(), SubmissionPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_is_a_snapshot_of_the_form() {
        let store = ScriptedStore::new([Step::ok_after(0)]);
        let controller = controller_with(&store);

        controller.submit().await;

        let records = store.records();
        assert_eq!(records.len(), 1);
        let (collection, record) = &records[0];
        assert_eq!(collection, "contacts");
        assert_eq!(record.form(), &ada_form());
        assert_eq!(record.submitted_at(), SubmittedAt::ServerTimestamp);
        assert_eq!(record.status(), crate::form::RecordStatus::New);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_keeps_form() {
        let store = ScriptedStore::new([Step::never()]);
        let controller = controller_with(&store);
        let started = Instant::now();

        let outcome = controller.submit().await;

        assert_eq!(outcome, SubmitOutcome::TimedOut);
        assert_eq!(started.elapsed(), Duration::from_secs(15));
        assert_eq!(store.calls(), 1);
        assert_eq!(controller.form(), ada_form());
        assert_eq!(controller.phase(), SubmissionPhase::Failed);

        let notification = controller.notification();
        assert_eq!(notification.kind, NotificationKind::Failure);
        assert_eq!(notification.message, TIMEOUT_MESSAGE);

        tokio::time::sleep(Duration::from_millis(5_100)).await;
        assert!(!controller.notification().is_visible());
        assert_eq!(controller.phase(), SubmissionPhase::Idle);
        assert_eq!(controller.form(), ada_form());
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_rejection_reports_generic_failure() {
        let store = ScriptedStore::new([Step::reject_after(2)]);
        let controller = controller_with(&store);
        let started = Instant::now();

        let outcome = controller.submit().await;

        assert_eq!(outcome, SubmitOutcome::Failed);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert_eq!(controller.form(), ada_form());

        let notification = controller.notification();
        assert_eq!(notification.kind, NotificationKind::Failure);
        assert_eq!(notification.message, FAILURE_MESSAGE);
        assert!(!notification.message.contains("permission denied"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires_after_rejection() {
        let store = ScriptedStore::new([Step::reject_after(2)]);
        let controller = controller_with(&store);
        let mut updates = controller.subscribe();

        controller.submit().await;
        updates.borrow_and_update();

        // Past the notification expiry (7s) and the would-be timeout (15s).
        tokio::time::sleep(Duration::from_secs(20)).await;

        let snapshot = controller.snapshot();
        assert!(!snapshot.notification.is_visible());
        assert_eq!(snapshot.phase, SubmissionPhase::Idle);

        // Exactly one change since the failure: the expiry.
        assert!(updates.has_changed().unwrap());
        updates.borrow_and_update();
        assert!(!updates.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_success_cannot_override_timeout() {
        let store = ScriptedStore::new([Step::ok_after(17)]);
        let controller = controller_with(&store);

        assert_eq!(controller.submit().await, SubmitOutcome::TimedOut);

        // The store finishes at 17s, before the banner expires at 20s.
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(store.completed(), 1);

        let notification = controller.notification();
        assert_eq!(notification.kind, NotificationKind::Failure);
        assert_eq!(notification.message, TIMEOUT_MESSAGE);
        assert_eq!(controller.form(), ada_form());
        assert_eq!(controller.phase(), SubmissionPhase::Failed);
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_blocks_submission() {
        let store = ScriptedStore::new([]);
        let controller = controller_with(&store);
        controller.update_field(FieldUpdate::Message("short".to_string()));

        let outcome = controller.submit().await;

        let SubmitOutcome::Rejected(errors) = outcome else {
            panic!("expected validation rejection, got {outcome:?}");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get(Field::Message), Some(MESSAGE_TOO_SHORT));
        assert_eq!(controller.errors(), errors);
        assert_eq!(store.calls(), 0);
        assert_eq!(controller.phase(), SubmissionPhase::Idle);
        assert!(!controller.notification().is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_form_never_reaches_store() {
        let store = ScriptedStore::new([]);
        let dyn_store: Arc<dyn RecordStore> = store.clone();
        let controller = InquiryController::new(dyn_store, SubmissionSettings::default());
        controller.update_field(FieldUpdate::Institution("LUTH".to_string()));

        let SubmitOutcome::Rejected(errors) = controller.submit().await else {
            panic!("expected validation rejection");
        };
        assert_eq!(errors.len(), 6);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_submit_appends_once() {
        let store = ScriptedStore::new([Step::ok_after(1), Step::ok_after(1)]);
        let controller = controller_with(&store);
        let other = controller.clone();

        let (first, second) = tokio::join!(controller.submit(), other.submit());

        assert!(first.is_success());
        assert_eq!(second, SubmitOutcome::Ignored);
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_are_not_blocked_while_submitting() {
        let store = ScriptedStore::new([Step::reject_after(3)]);
        let controller = controller_with(&store);

        let (outcome, ()) = tokio::join!(controller.submit(), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            assert!(controller.is_submitting());
            controller.update_field(FieldUpdate::Institution("LUTH".to_string()));
        });

        assert_eq!(outcome, SubmitOutcome::Failed);
        assert_eq!(controller.form().institution, "LUTH");
        // The record was taken before the edit.
        assert_eq!(store.records()[0].1.form().institution, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_notification_replaces_pending_expiry() {
        let store = ScriptedStore::new([Step::reject_after(0), Step::ok_after(0)]);
        let controller = controller_with(&store);

        assert_eq!(controller.submit().await, SubmitOutcome::Failed);
        assert_eq!(controller.phase(), SubmissionPhase::Failed);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(controller.submit().await.is_success());
        assert_eq!(controller.notification().message, SUCCESS_MESSAGE);

        // The first banner's 5s expiry would have fired here.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(controller.notification().kind, NotificationKind::Success);

        tokio::time::sleep(Duration::from_millis(2_100)).await;
        assert!(!controller.notification().is_visible());
        assert_eq!(store.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubmit_after_failure() {
        let store = ScriptedStore::new([Step::never(), Step::ok_after(1)]);
        let controller = controller_with(&store);

        assert_eq!(controller.submit().await, SubmitOutcome::TimedOut);
        assert_eq!(controller.form(), ada_form());

        let outcome = controller.submit().await;
        assert_eq!(outcome, SubmitOutcome::Succeeded(RecordId::new("doc-2")));
        assert!(controller.form().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_submitting_state() {
        let store = ScriptedStore::new([Step::ok_after(1)]);
        let controller = controller_with(&store);
        let mut updates = controller.subscribe();
        updates.borrow_and_update();

        let (outcome, saw_submitting) = tokio::join!(controller.submit(), async {
            updates.changed().await.unwrap();
            updates.borrow_and_update().submitting
        });

        assert!(outcome.is_success());
        assert!(saw_submitting);

        updates.changed().await.unwrap();
        let latest = updates.borrow_and_update().clone();
        assert!(!latest.submitting);
        assert_eq!(latest.notification.kind, NotificationKind::Success);
        assert!(latest.form.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels_in_flight_submission() {
        let store = ScriptedStore::new([Step::never()]);
        let controller = controller_with(&store);
        let mut updates = controller.subscribe();

        let (outcome, ()) = tokio::join!(controller.submit(), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            updates.borrow_and_update();
            controller.teardown();
            assert!(updates.has_changed().unwrap());
            assert!(updates.borrow_and_update().torn_down);
        });

        assert_eq!(outcome, SubmitOutcome::Cancelled);
        assert!(controller.is_torn_down());
        let latest = updates.borrow_and_update().clone();
        assert!(latest.torn_down);
        assert!(!latest.submitting);
        assert_eq!(latest.phase, SubmissionPhase::Idle);
        assert!(!controller.notification().is_visible());
        assert_eq!(controller.form(), ada_form());

        // No timeout banner appears later.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!controller.notification().is_visible());
        assert_eq!(controller.submit().await, SubmitOutcome::Ignored);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_submit_still_finishes() {
        let store = ScriptedStore::new([Step::ok_after(3), Step::ok_after(1)]);
        let controller = controller_with(&store);

        let waited = tokio::time::timeout(Duration::from_secs(1), controller.submit()).await;
        assert!(waited.is_err());
        assert!(controller.is_submitting());

        // The store answers at 3s and the banner expires at 8s.
        tokio::time::sleep(Duration::from_secs(60)).await;
        let snapshot = controller.snapshot();
        assert!(!snapshot.submitting);
        assert_eq!(snapshot.phase, SubmissionPhase::Idle);
        assert!(snapshot.form.is_empty());

        for update in ada_updates() {
            controller.update_field(update);
        }
        let outcome = controller.submit().await;
        assert_eq!(outcome, SubmitOutcome::Succeeded(RecordId::new("doc-2")));
        assert_eq!(store.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_submit_task_still_times_out() {
        let store = ScriptedStore::new([Step::never(), Step::ok_after(0)]);
        let controller = controller_with(&store);

        let task = tokio::spawn({
            let controller = controller.clone();
            async move { controller.submit().await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        task.abort();

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(controller.phase(), SubmissionPhase::Failed);
        assert_eq!(controller.notification().message, TIMEOUT_MESSAGE);

        assert!(controller.submit().await.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_clears_previous_banner() {
        let store = ScriptedStore::new([Step::reject_after(0), Step::ok_after(2)]);
        let controller = controller_with(&store);

        assert_eq!(controller.submit().await, SubmitOutcome::Failed);
        assert_eq!(controller.notification().message, FAILURE_MESSAGE);

        let (outcome, ()) = tokio::join!(controller.submit(), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            assert!(controller.is_submitting());
            assert!(!controller.notification().is_visible());
        });

        assert!(outcome.is_success());
        assert_eq!(controller.notification().kind, NotificationKind::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_durations_do_not_overflow() {
        let store = ScriptedStore::new([Step::ok_after(1)]);
        let dyn_store: Arc<dyn RecordStore> = store.clone();
        let settings = SubmissionSettings {
            timeout: Duration::from_secs(u64::MAX),
            notification_ttl: Duration::MAX,
            ..SubmissionSettings::default()
        };
        let controller = InquiryController::new(dyn_store, settings);
        for update in ada_updates() {
            controller.update_field(update);
        }

        assert!(controller.submit().await.is_success());

        tokio::time::sleep(Duration::from_secs(3_600)).await;
        assert_eq!(controller.notification().kind, NotificationKind::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels_notification_expiry() {
        let store = ScriptedStore::new([Step::ok_after(0)]);
        let controller = controller_with(&store);

        assert!(controller.submit().await.is_success());
        controller.teardown();
        controller.teardown();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(controller.notification().kind, NotificationKind::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_settings() {
        let store = ScriptedStore::new([Step::never()]);
        let dyn_store: Arc<dyn RecordStore> = store.clone();
        let settings = SubmissionSettings {
            collection: "inquiries".to_string(),
            timeout: Duration::from_secs(2),
            notification_ttl: Duration::from_secs(1),
        };
        let controller = InquiryController::new(dyn_store, settings.clone());
        for update in ada_updates() {
            controller.update_field(update);
        }
        let started = Instant::now();

        assert_eq!(controller.submit().await, SubmitOutcome::TimedOut);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert_eq!(store.records()[0].0, "inquiries");
        assert_eq!(controller.settings(), &settings);

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert!(!controller.notification().is_visible());
    }

    #[test]
    fn test_debug_output() {
        let store: Arc<dyn RecordStore> = ScriptedStore::new([]);
        let controller = InquiryController::new(store, SubmissionSettings::default());
        let debug_str = format!("{controller:?}");
        assert!(debug_str.contains("InquiryController"));
        assert!(debug_str.contains("contacts"));
    }
}
