//! Cooperative cancellation: a lightweight atomic flag checked at stage
//! boundaries and once per viewshed batch. Never unwinds a panic out of a
//! candidate's inner loop.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const CREATED: u8 = 0;
const CANCELLING: u8 = 1;
const CANCELLED: u8 = 2;

/// A shared, cloneable cancellation flag. Requesting cancellation moves the
/// token from `Created` straight to `Cancelling`; the pipeline observes it
/// at a suspension point and transitions the project to `Cancelled`.
#[derive(Clone)]
pub struct CancelToken {
    state: Arc<AtomicU8>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken {
            state: Arc::new(AtomicU8::new(CREATED)),
        }
    }

    pub fn cancel(&self) {
        self.state.store(CANCELLING, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::SeqCst) != CREATED
    }

    /// Called at a suspension point; acknowledges the cancellation request
    /// by moving the flag to its terminal state.
    pub fn acknowledge(&self) {
        self.state.store(CANCELLED, Ordering::SeqCst);
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        CancelToken::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_cancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancel_is_observed_across_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
