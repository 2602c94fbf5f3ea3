//! Stop requests from the terminal.
//!
//! The first SIGINT or SIGTERM cancels the run: the check in flight finishes
//! within its own timeout, nothing new starts, and the partial report is
//! printed. A second signal exits at once.

use crate::engine::orchestrator::CancelToken;
use crate::GateError;

/// Exit status after a second stop signal (128 + SIGINT).
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// What to do about one received stop signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// The run was cancelled; let it wind down and report.
    Cancel,
    /// Already cancelled once; exit immediately.
    Exit,
}

/// Apply one stop signal to `token`.
pub fn on_stop_signal(token: &CancelToken) -> SignalAction {
    if token.is_cancelled() {
        SignalAction::Exit
    } else {
        token.cancel();
        SignalAction::Cancel
    }
}

/// Route SIGINT and SIGTERM to `token` for the rest of the process.
pub fn cancel_on_stop_signal(token: CancelToken) -> Result<(), GateError> {
    ctrlc::set_handler(move || match on_stop_signal(&token) {
        SignalAction::Cancel => {
            tracing::warn!("stop requested, finishing the check in flight");
        }
        SignalAction::Exit => std::process::exit(INTERRUPTED_EXIT_CODE),
    })
    .map_err(GateError::SignalHandler)
}
