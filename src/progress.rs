//! Progress reporting and cancellation for image-data retrieval.

use std::cell::Cell;
use std::fmt;

use tracing::trace;

use crate::error::{NkflError, NkflResult};
use crate::sdk::ErrorCode;

thread_local! {
    static IN_CALLBACK: Cell<bool> = const { Cell::new(false) };
}

// Marks the current thread as running a progress callback until dropped.
struct CallbackScope {
    outer: bool,
}

impl CallbackScope {
    fn enter() -> Self {
        Self {
            outer: IN_CALLBACK.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for CallbackScope {
    fn drop(&mut self) {
        IN_CALLBACK.with(|flag| flag.set(self.outer));
    }
}

/// Fails with `WrongSequence` on a thread that is running a progress callback.
///
/// The command that invoked the callback still holds the library's locks, so calling back into
/// the library from the callback would never return.
pub(crate) fn ensure_outside_callback() -> NkflResult<()> {
    if IN_CALLBACK.with(Cell::get) {
        return Err(NkflError::WrongSequence(
            "the library cannot be called from a progress callback".into(),
        ));
    }
    Ok(())
}

/// Returned by a progress callback to continue or stop the transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Keep going.
    Continue,
    /// Stop. The command then fails with [`ErrorCode::Cancel`].
    Cancel,
}

type Callback<'a> = Box<dyn FnMut(u64, u64) -> Progress + 'a>;

/// Relays the engine's `(done, total)` reports to a caller-supplied closure.
///
/// The closure runs synchronously on the thread that dispatched the command. Once it has asked
/// to cancel it is not called again. It must not call back into the library: any library or
/// session operation made from inside it fails with `WrongSequence`.
pub struct ProgressBridge<'a> {
    callback: Option<Callback<'a>>,
    cancel_requested: bool,
    reports: u64,
}

impl<'a> ProgressBridge<'a> {
    /// A bridge that never cancels and has nothing to notify.
    pub fn none() -> Self {
        Self {
            callback: None,
            cancel_requested: false,
            reports: 0,
        }
    }

    /// A bridge forwarding every report to `callback`.
    pub fn new(callback: impl FnMut(u64, u64) -> Progress + 'a) -> Self {
        Self {
            callback: Some(Box::new(callback)),
            cancel_requested: false,
            reports: 0,
        }
    }

    /// Whether a callback is attached.
    pub fn is_attached(&self) -> bool {
        self.callback.is_some()
    }

    /// Forwards one report.
    pub fn report(&mut self, done: u64, total: u64) -> Progress {
        self.reports += 1;
        if self.cancel_requested {
            return Progress::Cancel;
        }
        let decision = match self.callback.as_mut() {
            Some(callback) => {
                let _scope = CallbackScope::enter();
                callback(done, total)
            }
            None => Progress::Continue,
        };
        trace!(done, total, ?decision, "progress");
        if decision == Progress::Cancel {
            self.cancel_requested = true;
        }
        decision
    }

    /// Forwards one report and encodes the decision as the status the engine expects back
    /// from its callback.
    pub fn report_status(&mut self, done: u64, total: u64) -> u32 {
        match self.report(done, total) {
            Progress::Continue => 0,
            Progress::Cancel => ErrorCode::Cancel.into(),
        }
    }

    /// Whether the callback has asked to stop.
    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    /// Number of reports received so far.
    pub fn reports(&self) -> u64 {
        self.reports
    }
}

impl Default for ProgressBridge<'_> {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for ProgressBridge<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressBridge")
            .field("attached", &self.callback.is_some())
            .field("cancel_requested", &self.cancel_requested)
            .field("reports", &self.reports)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cancel_is_sticky() {
        let mut calls = Vec::new();
        let mut bridge = ProgressBridge::new(|done, total| {
            calls.push((done, total));
            if done >= 2 {
                Progress::Cancel
            } else {
                Progress::Continue
            }
        });
        assert_eq!(bridge.report_status(1, 4), 0);
        assert_eq!(bridge.report_status(2, 4), u32::from(ErrorCode::Cancel));
        assert_eq!(bridge.report(3, 4), Progress::Cancel);
        assert!(bridge.cancel_requested());
        assert_eq!(bridge.reports(), 3);
        drop(bridge);
        assert_eq!(calls, vec![(1, 4), (2, 4)]);
    }

    #[test]
    fn test_detached_bridge_continues() {
        let mut bridge = ProgressBridge::none();
        assert!(!bridge.is_attached());
        assert_eq!(bridge.report(10, 10), Progress::Continue);
        assert!(!bridge.cancel_requested());
    }
}
