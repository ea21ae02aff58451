//! Disposable handle for one live subscription.
//!
//! A [`SubscriptionHandle`] owns the cancellation side of a running
//! subscription: disposing it synchronously detaches the subscription
//! from its event source, after which at most one in-flight
//! notification may still be delivered. Disposal is idempotent, so the
//! registry's "dispose exactly once" bookkeeping composes with the
//! handle also being disposed on drop.

use std::fmt;
use std::sync::Mutex;

use tokio::task::JoinHandle;

type CancelFn = Box<dyn FnOnce() + Send>;

/// Owns the teardown action of one live subscription.
///
/// Created by a resource binding when a sink is attached to a feed.
/// The registry takes exclusive ownership once the subscription is
/// registered; disposing the handle is the sole cleanup action.
pub struct SubscriptionHandle {
    cancel: Mutex<Option<CancelFn>>,
}

impl SubscriptionHandle {
    /// Creates a handle that runs `cancel` exactly once when disposed.
    #[must_use]
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// Creates a handle that aborts the given pump task when disposed.
    ///
    /// `JoinHandle::abort` is synchronous: the task stops at its next
    /// suspension point, so a notification already past its channel
    /// receive may still be delivered, and nothing after it will be.
    #[must_use]
    pub fn from_task(task: JoinHandle<()>) -> Self {
        Self::new(move || task.abort())
    }

    /// Disposes the handle, running its cancellation action.
    ///
    /// Safe to call more than once; only the first call has an effect.
    pub fn dispose(&self) {
        let cancel = match self.cancel.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(cancel) = cancel {
            cancel();
        }
    }

    /// Returns `true` if the handle has already been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        match self.cancel.lock() {
            Ok(slot) => slot.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
