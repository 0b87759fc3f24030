//! Per-verb subscriber lists with snapshot dispatch.
//!
//! Each verb owns an `ArcSwap<Vec<Callback>>`. Registration replaces the
//! list through `rcu`; dispatch loads the current `Arc` once and iterates
//! that snapshot, so a callback that subscribes or unsubscribes while being
//! dispatched only affects later events.


use std::any::Any;
use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;
use tracing::error;

use crate::metrics::CALLBACK_PANICS;
use crate::metrics::DISPATCH_TOTAL;
use crate::Error;
use crate::IntoVerb;
use crate::Result;
use crate::Verb;

/// Subscriber for one verb. Compared by pointer in [`CallbackRegistry::off`].
pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Receives list failures and abnormal watch terminations.
pub type ErrorObserver = Arc<dyn Fn(&Error) + Send + Sync>;

type Subscribers<C> = ArcSwap<Vec<C>>;

pub struct CallbackRegistry<T> {
    add: Subscribers<Callback<T>>,
    update: Subscribers<Callback<T>>,
    delete: Subscribers<Callback<T>>,
    errors: Subscribers<ErrorObserver>,
}

impl<T> Default for CallbackRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CallbackRegistry<T> {
    pub fn new() -> Self {
        Self {
            add: ArcSwap::from_pointee(Vec::new()),
            update: ArcSwap::from_pointee(Vec::new()),
            delete: ArcSwap::from_pointee(Vec::new()),
            errors: ArcSwap::from_pointee(Vec::new()),
        }
    }

    fn slot(
        &self,
        verb: Verb,
    ) -> &Subscribers<Callback<T>> {
        match verb {
            Verb::Add => &self.add,
            Verb::Update => &self.update,
            Verb::Delete => &self.delete,
        }
    }

    /// Append `callback` to the subscribers of `verb`.
    pub fn on(
        &self,
        verb: impl IntoVerb,
        callback: Callback<T>,
    ) -> Result<()> {
        let verb = verb.into_verb()?;
        self.slot(verb).rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(Arc::clone(&callback));
            next
        });
        debug!(%verb, "callback registered");
        Ok(())
    }

    /// Remove the first registration of `callback` for `verb`.
    ///
    /// Returns whether anything was removed.
    pub fn off(
        &self,
        verb: impl IntoVerb,
        callback: &Callback<T>,
    ) -> Result<bool> {
        let verb = verb.into_verb()?;
        let previous = self.slot(verb).rcu(|current| {
            let mut next = Vec::clone(current);
            if let Some(ix) = next.iter().position(|cb| same_callback(cb, callback)) {
                next.remove(ix);
            }
            next
        });
        let removed = previous.iter().any(|cb| same_callback(cb, callback));
        debug!(%verb, removed, "callback unregistered");
        Ok(removed)
    }

    pub fn len(
        &self,
        verb: Verb,
    ) -> usize {
        self.slot(verb).load().len()
    }

    pub fn is_empty(&self) -> bool {
        Verb::ALL.iter().all(|v| self.len(*v) == 0)
    }

    /// Invoke every subscriber of `verb` registered at call time, in
    /// registration order. A panicking subscriber is logged and skipped.
    ///
    /// Returns the number of subscribers that panicked.
    pub fn dispatch(
        &self,
        verb: Verb,
        object: &T,
    ) -> usize {
        let subscribers = self.slot(verb).load_full();
        DISPATCH_TOTAL.with_label_values(&[verb.as_str()]).inc();

        let mut failed = 0;
        for (ix, callback) in subscribers.iter().enumerate() {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(object))) {
                failed += 1;
                CALLBACK_PANICS.with_label_values(&[verb.as_str()]).inc();
                error!(
                    %verb,
                    subscriber = ix,
                    panic = panic_message(&*panic),
                    "subscriber panicked during dispatch"
                );
            }
        }
        failed
    }

    pub fn on_error(
        &self,
        observer: ErrorObserver,
    ) {
        self.errors.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(Arc::clone(&observer));
            next
        });
    }

    /// Hand `err` to every error observer, isolating panics the same way as
    /// [`dispatch`](Self::dispatch).
    pub fn report(
        &self,
        err: &Error,
    ) {
        let observers = self.errors.load_full();
        for observer in observers.iter() {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| observer(err))) {
                error!(panic = panic_message(&*panic), "error observer panicked");
            }
        }
    }
}

fn same_callback<C: ?Sized>(
    a: &Arc<C>,
    b: &Arc<C>,
) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
