//! Deferred results with callback chaining.
//!
//! A [`Promise`] starts pending and settles exactly once, either resolved
//! with a value or rejected with a reason. Callbacks registered before
//! settlement run in registration order inside the settling call; callbacks
//! registered afterwards run immediately. Nothing is deferred to a later
//! scheduler turn, which is what lets the view manager reason about ordering.
//!
//! Async code can `await` the outcome through [`Promise::wait`].

mod when;

pub use when::when;

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

type Callback<T, E> = Box<dyn FnOnce(&Result<T, E>) + Send>;

enum State<T, E> {
    Pending(Vec<Callback<T, E>>),
    Settled(Arc<Result<T, E>>),
}

struct Shared<T, E> {
    state: Mutex<State<T, E>>,
    notify: Notify,
}

/// A chainable, settle-once result shared between producer and consumers.
///
/// Cloning a promise yields another handle to the same underlying result.
pub struct Promise<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match &*self.shared.state.lock() {
            State::Pending(_) => "pending",
            State::Settled(outcome) if outcome.is_ok() => "resolved",
            State::Settled(_) => "rejected",
        };
        f.debug_struct("Promise").field("status", &status).finish()
    }
}

impl<T, E> Default for Promise<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Promise<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Create a pending promise.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::Pending(Vec::new())),
                notify: Notify::new(),
            }),
        }
    }

    /// Create a promise that is already resolved with `value`.
    pub fn resolved(value: T) -> Self {
        let promise = Self::new();
        promise.resolve(value);
        promise
    }

    /// Create a promise that is already rejected with `reason`.
    pub fn rejected(reason: E) -> Self {
        let promise = Self::new();
        promise.reject(reason);
        promise
    }

    /// Resolve with `value`. Returns `false` if the promise had already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Reject with `reason`. Returns `false` if the promise had already settled.
    pub fn reject(&self, reason: E) -> bool {
        self.settle(Err(reason))
    }

    /// Settle with `outcome`. The first settlement wins; later calls are no-ops.
    pub fn settle(&self, outcome: Result<T, E>) -> bool {
        let outcome = Arc::new(outcome);
        let callbacks = {
            let mut state = self.shared.state.lock();
            match &mut *state {
                State::Settled(_) => return false,
                State::Pending(callbacks) => {
                    let callbacks = std::mem::take(callbacks);
                    *state = State::Settled(Arc::clone(&outcome));
                    callbacks
                }
            }
        };

        // Run outside the lock so callbacks may register further callbacks.
        for callback in callbacks {
            callback(&*outcome);
        }
        self.shared.notify.notify_waiters();
        true
    }

    /// The settled outcome, if any.
    pub fn outcome(&self) -> Option<Arc<Result<T, E>>> {
        match &*self.shared.state.lock() {
            State::Pending(_) => None,
            State::Settled(outcome) => Some(Arc::clone(outcome)),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(&*self.shared.state.lock(), State::Pending(_))
    }

    pub fn is_resolved(&self) -> bool {
        matches!(&*self.shared.state.lock(), State::Settled(outcome) if outcome.is_ok())
    }

    pub fn is_rejected(&self) -> bool {
        matches!(&*self.shared.state.lock(), State::Settled(outcome) if outcome.is_err())
    }

    /// Run `callback` once the promise settles, whichever way.
    pub fn always<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(&Result<T, E>) + Send + 'static,
    {
        let settled = {
            let mut state = self.shared.state.lock();
            match &mut *state {
                State::Pending(callbacks) => {
                    callbacks.push(Box::new(callback));
                    return self;
                }
                State::Settled(outcome) => Arc::clone(outcome),
            }
        };
        callback(&*settled);
        self
    }

    /// Run `callback` with the value if the promise resolves.
    pub fn success<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.always(move |outcome| {
            if let Ok(value) = outcome {
                callback(value);
            }
        })
    }

    /// Run `callback` with the reason if the promise rejects.
    pub fn error<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(&E) + Send + 'static,
    {
        self.always(move |outcome| {
            if let Err(reason) = outcome {
                callback(reason);
            }
        })
    }

    /// Map the resolved value into a new promise; rejections pass through.
    pub fn then<U, F>(&self, map: F) -> Promise<U, E>
    where
        U: Send + Sync + 'static,
        E: Clone,
        F: FnOnce(&T) -> U + Send + 'static,
    {
        let next = Promise::new();
        let target = next.clone();
        self.always(move |outcome| match outcome {
            Ok(value) => {
                target.resolve(map(value));
            }
            Err(reason) => {
                target.reject(reason.clone());
            }
        });
        next
    }

    /// Chain a nested promise produced from the resolved value.
    pub fn and_then<U, F>(&self, next_step: F) -> Promise<U, E>
    where
        U: Clone + Send + Sync + 'static,
        E: Clone,
        F: FnOnce(&T) -> Promise<U, E> + Send + 'static,
    {
        let next = Promise::new();
        let target = next.clone();
        self.always(move |outcome| match outcome {
            Ok(value) => next_step(value).forward_to(&target),
            Err(reason) => {
                target.reject(reason.clone());
            }
        });
        next
    }

    /// Settle `target` with this promise's outcome once it is known.
    pub fn forward_to(&self, target: &Promise<T, E>)
    where
        T: Clone,
        E: Clone,
    {
        let target = target.clone();
        self.always(move |outcome| {
            target.settle(outcome.clone());
        });
    }

    /// Discard the resolved value, keeping only success or failure.
    pub fn unit(&self) -> Promise<(), E>
    where
        E: Clone,
    {
        self.then(|_| ())
    }

    /// Wait for the outcome from async code.
    pub async fn wait(&self) -> Result<T, E>
    where
        T: Clone,
        E: Clone,
    {
        loop {
            // Register interest before checking the state so a settlement
            // between the check and the await is not lost.
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(outcome) = self.outcome() {
                return (*outcome).clone();
            }
            notified.await;
        }
    }
}
