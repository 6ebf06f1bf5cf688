//! Per-key FIFO mutual exclusion for async tasks.
//!
//! A [`KeyedMutex`] hands out at most one [`KeyedGuard`] per key at a time.
//! Callers that find the key taken queue in arrival order and are granted the
//! key one by one as guards drop. Unrelated keys never contend.
//!
//! # Invariants
//!
//! - A key has an entry in the slot map iff it has a holder; waiters are only
//!   ever queued behind a holder.
//! - The entry is removed the moment the holder releases with no live waiter,
//!   so memory is bounded by currently-active keys.
//! - Release runs from `Drop`, so normal return, `?` propagation and task
//!   abort all hand the key on.
//! - A waiter dropped before its grant is skipped. A waiter dropped in the
//!   same instant it is granted passes the grant to the next in line.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

struct Slot {
	/// Queued waiters in arrival order. The current holder is not in here.
	waiters: VecDeque<oneshot::Sender<()>>,
}

struct Shared<K> {
	slots: Mutex<HashMap<K, Slot>>,
}

impl<K> Shared<K>
where
	K: Eq + Hash,
{
	/// Passes `key` to the next live waiter, or frees the slot.
	fn release(&self, key: &K) {
		let mut slots = self.slots.lock();
		let Some(slot) = slots.get_mut(key) else {
			tracing::error!("keyed_mutex.release_without_slot");
			return;
		};
		while let Some(waiter) = slot.waiters.pop_front() {
			if waiter.send(()).is_ok() {
				return;
			}
		}
		slots.remove(key);
	}
}

/// Async mutex keyed by an opaque value.
///
/// Cloning yields another handle to the same set of keys.
pub struct KeyedMutex<K> {
	shared: Arc<Shared<K>>,
}

impl<K> Clone for KeyedMutex<K> {
	fn clone(&self) -> Self {
		Self {
			shared: Arc::clone(&self.shared),
		}
	}
}

impl<K> Default for KeyedMutex<K> {
	fn default() -> Self {
		Self {
			shared: Arc::new(Shared {
				slots: Mutex::new(HashMap::new()),
			}),
		}
	}
}

impl<K> fmt::Debug for KeyedMutex<K> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("KeyedMutex").field("active_keys", &self.shared.slots.lock().len()).finish()
	}
}

impl<K> KeyedMutex<K>
where
	K: Eq + Hash + Clone,
{
	/// Creates a mutex with no active keys.
	pub fn new() -> Self {
		Self::default()
	}

	/// Waits until `key` is free, then returns a guard holding it.
	///
	/// Requests for the same key are granted in arrival order. Dropping the
	/// returned future before it resolves gives up the place in the queue.
	pub async fn acquire(&self, key: K) -> KeyedGuard<K> {
		loop {
			let rx = {
				let mut slots = self.shared.slots.lock();
				match slots.entry(key.clone()) {
					Entry::Vacant(entry) => {
						entry.insert(Slot { waiters: VecDeque::new() });
						None
					}
					Entry::Occupied(mut entry) => {
						let (tx, rx) = oneshot::channel();
						entry.get_mut().waiters.push_back(tx);
						Some(rx)
					}
				}
			};

			let Some(rx) = rx else {
				break;
			};

			let mut pending = PendingGrant {
				rx,
				shared: &self.shared,
				key: &key,
				granted: false,
			};
			if (&mut pending.rx).await.is_ok() {
				pending.granted = true;
				break;
			}
			// The sender vanished without granting; queue up again.
		}

		KeyedGuard {
			shared: Arc::clone(&self.shared),
			key,
		}
	}

	/// Returns `true` if some task holds `key` (or is queued behind a holder).
	///
	/// Best-effort introspection; the answer may be stale by the time it is used.
	pub fn is_held(&self, key: &K) -> bool {
		self.shared.slots.lock().contains_key(key)
	}

	/// Number of tasks queued behind the current holder of `key`.
	pub fn waiters(&self, key: &K) -> usize {
		self.shared.slots.lock().get(key).map_or(0, |slot| slot.waiters.len())
	}

	/// Number of keys that currently have a holder.
	pub fn len(&self) -> usize {
		self.shared.slots.lock().len()
	}

	/// Returns `true` when no key is held.
	pub fn is_empty(&self) -> bool {
		self.shared.slots.lock().is_empty()
	}
}

/// Queue position of a waiting [`KeyedMutex::acquire`] call.
struct PendingGrant<'a, K>
where
	K: Eq + Hash,
{
	rx: oneshot::Receiver<()>,
	shared: &'a Shared<K>,
	key: &'a K,
	granted: bool,
}

impl<K> Drop for PendingGrant<'_, K>
where
	K: Eq + Hash,
{
	fn drop(&mut self) {
		if self.granted {
			return;
		}
		self.rx.close();
		if self.rx.try_recv().is_ok() {
			// Granted while being cancelled: the key is ours, hand it on.
			self.shared.release(self.key);
		}
	}
}

/// Exclusive hold on one key of a [`KeyedMutex`]. Releases on drop.
#[must_use = "the key is released as soon as the guard is dropped"]
pub struct KeyedGuard<K>
where
	K: Eq + Hash,
{
	shared: Arc<Shared<K>>,
	key: K,
}

impl<K> KeyedGuard<K>
where
	K: Eq + Hash,
{
	/// The key this guard holds.
	pub fn key(&self) -> &K {
		&self.key
	}
}

impl<K> fmt::Debug for KeyedGuard<K>
where
	K: Eq + Hash + fmt::Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("KeyedGuard").field("key", &self.key).finish()
	}
}

impl<K> Drop for KeyedGuard<K>
where
	K: Eq + Hash,
{
	fn drop(&mut self) {
		self.shared.release(&self.key);
	}
}
