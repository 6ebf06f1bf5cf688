//! Cheap, synchronous relevance checks run before any I/O.

use skein_platform::{ChannelId, Message, MessageId};

use super::Inner;
use crate::OriginRef;

impl Inner {
	/// Whether a notification about `message` may affect a thread it is (or
	/// could become) the origin of.
	pub(super) fn origin_relevant(&self, channel: ChannelId, message: MessageId, emoji: Option<&str>, payload: Option<&Message>) -> bool {
		let trigger = self.config.emoji.as_str();
		self.locks.is_held(&message)
			|| self.index.lock().is_origin(OriginRef::new(channel, message))
			|| emoji == Some(trigger)
			|| payload.and_then(|m| m.reaction(trigger)).is_some_and(|r| r.others() > 0)
	}

	/// Whether a change to `message` in `channel` may change a thread's
	/// cached intro.
	pub(super) fn intro_relevant(&self, channel: ChannelId, message: MessageId) -> bool {
		let index = self.index.lock();
		let Some(record) = index.get(channel) else {
			return false;
		};
		!record.intro.is_loaded() || record.intro.len() < self.config.intro_len || record.intro.contains(message)
	}
}
