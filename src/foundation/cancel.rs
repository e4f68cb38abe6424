use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::foundation::error::{AvError, AvResult};

#[derive(Debug, Default)]
struct Inner {
    flag: AtomicBool,
    linked: Mutex<Vec<CancelToken>>,
}

/// Shared cooperative cancellation flag.
///
/// Clones observe the same flag. Long-running loops poll [`CancelToken::check`] once per
/// iteration. Tokens attached with [`CancelToken::link`] are cancelled together with this one.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<Inner>);

impl CancelToken {
    /// Create a fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and forward it to every linked token. Idempotent.
    pub fn cancel(&self) {
        if self.0.flag.swap(true, Ordering::SeqCst) {
            return;
        }
        let linked = match self.0.linked.lock() {
            Ok(mut linked) => std::mem::take(&mut *linked),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for token in linked {
            token.cancel();
        }
    }

    /// Cancel `other` whenever this token is cancelled; immediately if it already is.
    pub fn link(&self, other: CancelToken) {
        if Arc::ptr_eq(&self.0, &other.0) {
            return;
        }
        {
            let Ok(mut linked) = self.0.linked.lock() else {
                other.cancel();
                return;
            };
            // Checked under the lock so a concurrent `cancel` either sees `other` or we see it.
            if !self.is_cancelled() {
                linked.push(other);
                return;
            }
        }
        other.cancel();
    }

    /// Return `true` once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.flag.load(Ordering::SeqCst)
    }

    /// Return [`AvError::Cancelled`] once cancellation has been requested.
    pub fn check(&self) -> AvResult<()> {
        if self.is_cancelled() {
            Err(AvError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/cancel.rs"]
mod tests;
