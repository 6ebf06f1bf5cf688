use std::future::Future;

use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::TaskClass;

/// Spawns an async task on the current Tokio runtime inside a span carrying
/// the task class and a short static name.
///
/// # Panics
///
/// Panics when called outside a Tokio runtime, like [`tokio::spawn`].
pub fn spawn<F>(class: TaskClass, name: &'static str, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), task = name, "worker.spawn");
	let span = tracing::debug_span!("task", class = class.as_str(), name);
	tokio::spawn(fut.instrument(span))
}
