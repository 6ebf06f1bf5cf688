//! Channel lifecycle: attaching decodable channels, catching threads up, and
//! reacting to channels being created, changed or removed.

use skein_platform::{Channel, ChannelId, HistoryOrder};

use super::Inner;
use crate::codec::DecodedThread;
use crate::{IntroCache, OriginRef, ThreadError, ThreadRecord};

/// Outcome of indexing a decodable channel.
enum Attached {
	Fresh,
	/// Took over the origin from a newer channel, which is now unmanaged.
	Displaced(ChannelId),
	/// Another, older channel keeps the origin.
	Rejected(ChannelId),
}

impl Inner {
	/// Indexes `channel` as the thread of `decoded.origin`.
	///
	/// Returns the thread id when the channel is now managed and needs a
	/// catch-up pass. A channel already indexed for the same origin only gets
	/// its snapshot refreshed.
	pub(super) async fn attach(&self, channel: Channel, decoded: DecodedThread) -> Option<ChannelId> {
		let origin = decoded.origin;
		let _guard = self.locks.acquire(origin.message_id).await;
		let thread = channel.id;
		let record = ThreadRecord {
			origin,
			guild_id: channel.guild_id,
			channel,
			deleted: false,
			intro: IntroCache::Unloaded,
			first_contact: decoded.first_contact,
			starter: decoded.starter,
		};

		let attached = {
			let mut index = self.index.lock();
			if index.get(thread).is_some_and(|known| known.origin == origin) {
				index.refresh_channel(record.channel);
				return None;
			}
			match index.insert(record.clone()) {
				Ok(()) => Attached::Fresh,
				// Snowflakes grow over time: the smaller id is the older channel.
				Err(dup) if thread < dup.existing => {
					index.remove(dup.existing);
					match index.insert(record) {
						Ok(()) => Attached::Displaced(dup.existing),
						Err(again) => Attached::Rejected(again.existing),
					}
				}
				Err(dup) => Attached::Rejected(dup.existing),
			}
		};

		match attached {
			Attached::Fresh => {
				tracing::debug!(thread = %thread, origin = %origin, "thread.attached");
				Some(thread)
			}
			Attached::Displaced(newer) => {
				self.report("attach", origin, ThreadError::OriginConflict { origin, existing: thread, rejected: newer });
				Some(thread)
			}
			Attached::Rejected(existing) => {
				self.report("attach", origin, ThreadError::OriginConflict { origin, existing, rejected: thread });
				None
			}
		}
	}

	/// Runs the origin pass on a freshly attached thread.
	pub(super) async fn catch_up(&self, thread: ChannelId, origin: OriginRef) {
		let _guard = self.locks.acquire(origin.message_id).await;
		let Some(mut record) = self.record_of(thread, origin) else {
			return;
		};
		let result = async {
			let message = self.fetch_origin(origin).await?;
			self.update_thread(&mut record, message.as_ref()).await
		}
		.await;
		match result {
			Ok(()) => self.commit(record),
			Err(err) => self.report("catch_up", origin, err),
		}
	}

	/// Attaches `channel` if it decodes as a thread, then catches it up.
	pub(super) async fn adopt(&self, channel: Channel) {
		if !channel.is_text() {
			return;
		}
		let Some(decoded) = self.codec.decode(&channel.name, channel.topic()) else {
			return;
		};
		if let Some(thread) = self.attach(channel, decoded).await {
			self.catch_up(thread, decoded.origin).await;
		}
	}

	/// Runs the origin pass on recent messages of `channel` that carry the
	/// trigger reaction.
	pub(super) async fn scan_history(&self, channel: ChannelId) {
		let messages = match self.platform.history(channel, self.config.history_scan_limit, HistoryOrder::NewestFirst).await {
			Ok(messages) => messages,
			Err(err) if err.is_not_found() => return,
			Err(err) => {
				tracing::warn!(channel = %channel, error = %err, "thread.history_scan_failed");
				return;
			}
		};
		let origins: Vec<_> = messages
			.iter()
			.filter(|m| m.reaction(&self.config.emoji).is_some())
			.map(|m| OriginRef::new(channel, m.id))
			.collect();
		if !origins.is_empty() {
			tracing::debug!(channel = %channel, origins = origins.len(), "thread.history_scan");
		}
		futures::future::join_all(origins.into_iter().map(|origin| self.sync_origin(origin))).await;
	}

	pub(super) async fn channel_created(&self, channel: &Channel) {
		if !channel.is_text() {
			return;
		}
		self.adopt(channel.clone()).await;
		self.scan_history(channel.id).await;
	}

	pub(super) async fn channel_updated(&self, payload: &Channel) {
		let channel = self.platform.channel(payload.id).unwrap_or_else(|| payload.clone());
		let known = self.index.lock().get(channel.id).map(|record| record.origin);
		let decoded = if channel.is_text() { self.codec.decode(&channel.name, channel.topic()) } else { None };

		match (known, decoded) {
			(Some(origin), Some(decoded)) if decoded.origin == origin => {
				let _guard = self.locks.acquire(origin.message_id).await;
				let current = self.platform.channel(channel.id).unwrap_or(channel);
				self.index.lock().refresh_channel(current);
			}
			(Some(origin), decoded) => {
				{
					let _guard = self.locks.acquire(origin.message_id).await;
					if self.index.lock().remove(channel.id).is_some() {
						tracing::info!(thread = %channel.id, origin = %origin, "thread.detached");
					}
				}
				if decoded.is_some() {
					self.adopt(channel).await;
				}
			}
			(None, Some(_)) => self.adopt(channel).await,
			(None, None) => {}
		}
	}

	pub(super) async fn channel_deleted(&self, channel: &Channel) {
		let (thread_origin, hosted) = {
			let index = self.index.lock();
			(index.get(channel.id).map(|record| record.origin), index.origins_in(channel.id))
		};

		if let Some(origin) = thread_origin {
			let _guard = self.locks.acquire(origin.message_id).await;
			if self.index.lock().remove(channel.id).is_some() {
				tracing::info!(thread = %channel.id, origin = %origin, "thread.channel_removed");
			}
		}

		futures::future::join_all(hosted.into_iter().map(|(message, _)| self.sync_origin(OriginRef::new(channel.id, message)))).await;
	}
}
