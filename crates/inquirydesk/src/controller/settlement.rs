//! First-signal-wins resolution between competing completions.

use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;

/// Accepts the first value offered and ignores every later one.
///
/// Each competing source holds a shared reference and calls [`settle`];
/// the waiting side holds the receiver returned by [`Settlement::new`].
/// The settled flag is the taken sender, so acceptance and delivery are a
/// single step.
///
/// [`settle`]: Settlement::settle
#[derive(Debug)]
pub struct Settlement<T> {
    sender: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> Settlement<T> {
    /// Create an unsettled settlement and the receiver for its winner.
    #[must_use]
    pub fn new() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                sender: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    /// Offer `value`. Returns `true` if it won, `false` if already settled.
    pub fn settle(&self, value: T) -> bool {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match sender {
            Some(tx) => {
                // A dropped receiver still counts as settled.
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }
}
