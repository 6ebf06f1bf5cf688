//! Intro pass: keep a thread's cached leading messages current.

use skein_platform::{ChannelId, HistoryOrder};

use super::Inner;
use crate::error::Result;
use crate::{IntroCache, OriginRef, ThreadRecord};

impl Inner {
	/// Reads the first `intro_len` messages of a thread channel.
	pub(super) async fn load_intro(&self, thread: ChannelId) -> Result<IntroCache> {
		let messages = self.platform.history(thread, self.config.intro_len, HistoryOrder::OldestFirst).await?;
		Ok(IntroCache::from_messages(messages))
	}

	/// Clone of the record for `thread`, provided it still belongs to `origin`.
	pub(super) fn record_of(&self, thread: ChannelId, origin: OriginRef) -> Option<ThreadRecord> {
		self.index.lock().get(thread).filter(|record| record.origin == origin).cloned()
	}

	/// Runs the intro pass for `thread` under its origin's key.
	pub(super) async fn sync_intro(&self, thread: ChannelId) {
		let Some(origin) = self.index.lock().get(thread).map(|record| record.origin) else {
			return;
		};
		let _guard = self.locks.acquire(origin.message_id).await;
		let Some(record) = self.record_of(thread, origin) else {
			return;
		};
		if let Err(err) = self.sync_intro_locked(record).await {
			self.report("intro", origin, err);
		}
	}

	async fn sync_intro_locked(&self, mut record: ThreadRecord) -> Result<()> {
		let intro = match self.load_intro(record.id()).await {
			Ok(intro) => intro,
			Err(err) if err.is_not_found() => {
				tracing::debug!(thread = %record.id(), "thread.vanished");
				record.deleted = true;
				self.commit(record);
				return Ok(());
			}
			Err(err) => return Err(err),
		};

		let shrank = record.intro.messages().iter().any(|m| !intro.contains(m.id));
		record.intro = intro;
		if shrank {
			tracing::debug!(thread = %record.id(), remaining = record.intro.len(), "thread.intro_shrank");
			let message = self.fetch_origin(record.origin).await?;
			self.update_thread(&mut record, message.as_ref()).await?;
		}
		self.commit(record);
		Ok(())
	}
}
