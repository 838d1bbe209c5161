//! Combinators over groups of in-flight calls.

use tracing::debug;

use crate::promise::Promise;

/// Collects an ordered group of promises into one promise over all values.
///
/// The aggregate resolves once every input has resolved, preserving input
/// order regardless of completion order. Awaiting walks the inputs in index
/// order and fails fast: the first error seen in that order becomes the
/// aggregate's outcome, and values other inputs already produced are
/// discarded (their side effects are not undone). An empty group resolves
/// to an empty vector.
///
/// The aggregate is itself an ordinary [`Promise`], with the same broadcast
/// retrieval and chaining behavior as any other.
pub fn all<T>(promises: Vec<Promise<T>>) -> Promise<Vec<T>>
where
    T: Clone + Send + 'static,
{
    Promise::new(move || {
        debug!(count = promises.len(), "awaiting promise group");
        let mut values = Vec::with_capacity(promises.len());
        for promise in &promises {
            values.push(promise.get()?);
        }
        Ok(values)
    })
}
