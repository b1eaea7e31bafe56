//! Caller-side decisions and cancellation.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Asks the user a yes/no question.
pub trait Prompter: Send + Sync {
    /// Returns the user's answer to `message`, shown under `title`.
    fn ask_yes_no(&self, title: &str, message: &str) -> bool;
}

/// A [`Prompter`] that always gives the same answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Prompter for FixedAnswer {
    fn ask_yes_no(&self, title: &str, message: &str) -> bool {
        log::info!("{title}: {message} -> {}", if self.0 { "yes" } else { "no" });
        self.0
    }
}

/// Cooperative cancellation, polled between fetches and at pacing ticks.
pub trait CancelSignal: Send + Sync {
    /// Returns `true` once cancellation has been requested.
    fn is_cancelled(&self) -> bool;
}

/// Shared cancellation flag.
///
/// Clones share the same flag, so one clone can be handed to a signal
/// handler while another is polled by the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl CancelSignal for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
