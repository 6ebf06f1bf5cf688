use std::future::Future;

use tokio::task::{JoinError, JoinSet};
use tracing::Instrument;

use crate::TaskClass;

/// Classified wrapper around a Tokio [`JoinSet`].
///
/// Used for bounded fan-out where the caller wants every result, and a panic
/// in one task must not abort its siblings.
#[derive(Debug)]
pub struct WorkerJoinSet<T> {
	class: TaskClass,
	inner: JoinSet<T>,
}

impl<T> WorkerJoinSet<T>
where
	T: Send + 'static,
{
	/// Creates an empty join set for the given task class.
	pub fn new(class: TaskClass) -> Self {
		Self { class, inner: JoinSet::new() }
	}

	/// Returns the number of tasks currently in the set.
	pub fn len(&self) -> usize {
		self.inner.len()
	}

	/// Returns `true` if the set is empty.
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	/// Spawns a future into the set.
	pub fn spawn<F>(&mut self, fut: F)
	where
		F: Future<Output = T> + Send + 'static,
	{
		tracing::trace!(worker_class = self.class.as_str(), pending = self.inner.len(), "worker.join_set.spawn");
		let span = tracing::debug_span!("task", class = self.class.as_str());
		self.inner.spawn(fut.instrument(span));
	}

	/// Waits for the next completed task.
	pub async fn join_next(&mut self) -> Option<Result<T, JoinError>> {
		self.inner.join_next().await
	}

	/// Waits for every task and returns the successful outputs in completion
	/// order. Panicked or cancelled tasks are logged and skipped.
	pub async fn join_all(mut self) -> Vec<T> {
		let mut out = Vec::with_capacity(self.inner.len());
		while let Some(res) = self.inner.join_next().await {
			match res {
				Ok(value) => out.push(value),
				Err(err) => match join_error_panic_message(err) {
					Some(msg) => tracing::error!(worker_class = self.class.as_str(), panic = %msg, "worker.join_set.panic"),
					None => tracing::debug!(worker_class = self.class.as_str(), "worker.join_set.cancelled"),
				},
			}
		}
		out
	}
}

/// Extracts the panic payload message from a [`JoinError`].
///
/// Returns `None` when the task was cancelled rather than panicked.
pub fn join_error_panic_message(err: JoinError) -> Option<String> {
	if !err.is_panic() {
		return None;
	}
	let payload = err.into_panic();
	if let Some(s) = payload.downcast_ref::<&'static str>() {
		Some((*s).to_string())
	} else if let Some(s) = payload.downcast_ref::<String>() {
		Some(s.clone())
	} else {
		Some("<non-string panic payload>".to_string())
	}
}
