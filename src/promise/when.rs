//! Aggregate settlement over several promises.

use std::sync::Arc;

use parking_lot::Mutex;

use super::Promise;

struct Pending<E> {
    remaining: usize,
    failure: Option<E>,
}

/// Settle once every promise in `promises` has settled.
///
/// The result resolves when all of them resolved and otherwise rejects with
/// the first failure observed. An empty input resolves immediately.
pub fn when<T, E, I>(promises: I) -> Promise<(), E>
where
    T: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = Promise<T, E>>,
{
    let promises: Vec<Promise<T, E>> = promises.into_iter().collect();
    let aggregate = Promise::new();
    if promises.is_empty() {
        aggregate.resolve(());
        return aggregate;
    }

    let pending = Arc::new(Mutex::new(Pending {
        remaining: promises.len(),
        failure: None,
    }));

    for promise in &promises {
        let pending = Arc::clone(&pending);
        let aggregate = aggregate.clone();
        promise.always(move |outcome| {
            let finished = {
                let mut pending = pending.lock();
                if let Err(reason) = outcome {
                    if pending.failure.is_none() {
                        pending.failure = Some(reason.clone());
                    }
                }
                pending.remaining -= 1;
                if pending.remaining == 0 {
                    Some(pending.failure.take())
                } else {
                    None
                }
            };
            match finished {
                Some(None) => {
                    aggregate.resolve(());
                }
                Some(Some(reason)) => {
                    aggregate.reject(reason);
                }
                None => {}
            }
        });
    }
    aggregate
}
