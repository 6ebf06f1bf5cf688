//! Thread records and their two-way index.
//!
//! # Invariants
//!
//! - `by_thread` owns every record; `by_origin` only maps an origin back to a
//!   thread id. Both are updated by the same call, so a record reachable from
//!   one is reachable from the other.
//! - At most one record per [`OriginRef`]. [`ThreadIndex::insert`] refuses a
//!   second thread for an origin instead of replacing it.
//! - Removed records come back with `deleted` set and are never re-inserted
//!   by the reconciler.

use std::collections::HashMap;
use std::fmt;

use skein_platform::{Channel, ChannelId, GuildId, Message, MessageId, UserId};

/// Identity of the message a thread was started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OriginRef {
	pub channel_id: ChannelId,
	pub message_id: MessageId,
}

impl OriginRef {
	pub const fn new(channel_id: ChannelId, message_id: MessageId) -> Self {
		Self { channel_id, message_id }
	}
}

impl fmt::Display for OriginRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.channel_id, self.message_id)
	}
}

/// Cached leading messages of a thread channel.
///
/// `Unloaded` means nothing is known yet and must never be read as "no
/// messages": deciding a thread is empty from an unloaded cache would delete
/// user content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IntroCache {
	#[default]
	Unloaded,
	Empty,
	Populated(Vec<Message>),
}

impl IntroCache {
	pub fn from_messages(messages: Vec<Message>) -> Self {
		if messages.is_empty() { Self::Empty } else { Self::Populated(messages) }
	}

	pub fn is_loaded(&self) -> bool {
		!matches!(self, Self::Unloaded)
	}

	/// Cached messages, oldest first. Empty when unloaded.
	pub fn messages(&self) -> &[Message] {
		match self {
			Self::Populated(messages) => messages,
			Self::Unloaded | Self::Empty => &[],
		}
	}

	pub fn len(&self) -> usize {
		self.messages().len()
	}

	pub fn is_empty(&self) -> bool {
		self.messages().is_empty()
	}

	pub fn contains(&self, id: MessageId) -> bool {
		self.messages().iter().any(|m| m.id == id)
	}

	/// Whether anyone but `me` posted in the cached range. An unloaded cache
	/// counts as having foreign content.
	pub fn has_foreign_content(&self, me: UserId) -> bool {
		match self {
			Self::Unloaded => true,
			Self::Empty => false,
			Self::Populated(messages) => messages.iter().any(|m| m.author.id != me),
		}
	}

	/// First cached message written by `author`.
	pub fn first_by(&self, author: UserId) -> Option<&Message> {
		self.messages().iter().find(|m| m.author.id == author)
	}

	/// Appends a message posted after the cache was loaded.
	pub fn push(&mut self, message: Message) {
		match self {
			Self::Populated(messages) => messages.push(message),
			Self::Unloaded | Self::Empty => *self = Self::Populated(vec![message]),
		}
	}

	/// Swaps in the edited copy of a cached message.
	pub fn replace(&mut self, message: Message) {
		if let Self::Populated(messages) = self
			&& let Some(slot) = messages.iter_mut().find(|m| m.id == message.id)
		{
			*slot = message;
		}
	}
}

/// Reconciler state for one thread channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRecord {
	pub origin: OriginRef,
	pub guild_id: GuildId,
	/// Last known snapshot of the thread channel, for diff-and-skip.
	pub channel: Channel,
	pub deleted: bool,
	pub intro: IntroCache,
	/// The origin author is auto-granted visibility while set.
	pub first_contact: bool,
	/// User credited in the topic as having started the thread.
	pub starter: Option<UserId>,
}

impl ThreadRecord {
	pub fn id(&self) -> ChannelId {
		self.channel.id
	}
}

/// A second thread claimed an already indexed origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateOrigin {
	pub origin: OriginRef,
	pub existing: ChannelId,
}

/// Threads keyed by thread channel id, with a secondary origin lookup.
#[derive(Debug, Default)]
pub struct ThreadIndex {
	by_thread: HashMap<ChannelId, ThreadRecord>,
	by_origin: HashMap<ChannelId, HashMap<MessageId, ChannelId>>,
}

impl ThreadIndex {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.by_thread.len()
	}

	pub fn is_empty(&self) -> bool {
		self.by_thread.is_empty()
	}

	pub fn get(&self, thread: ChannelId) -> Option<&ThreadRecord> {
		self.by_thread.get(&thread)
	}

	pub fn thread_for(&self, origin: OriginRef) -> Option<ChannelId> {
		self.by_origin.get(&origin.channel_id)?.get(&origin.message_id).copied()
	}

	pub fn by_origin(&self, origin: OriginRef) -> Option<&ThreadRecord> {
		self.get(self.thread_for(origin)?)
	}

	pub fn is_origin(&self, origin: OriginRef) -> bool {
		self.thread_for(origin).is_some()
	}

	/// Origins hosted in `channel` and their thread ids.
	pub fn origins_in(&self, channel: ChannelId) -> Vec<(MessageId, ChannelId)> {
		let mut out: Vec<_> = self.by_origin.get(&channel).map(|m| m.iter().map(|(m, t)| (*m, *t)).collect()).unwrap_or_default();
		out.sort_unstable();
		out
	}

	pub fn threads(&self) -> impl Iterator<Item = &ThreadRecord> {
		self.by_thread.values()
	}

	/// Adds a record, or replaces the record for the same thread channel.
	///
	/// Fails without changes if a different thread already owns the origin.
	pub fn insert(&mut self, record: ThreadRecord) -> Result<(), DuplicateOrigin> {
		let origin = record.origin;
		if let Some(existing) = self.thread_for(origin)
			&& existing != record.id()
		{
			return Err(DuplicateOrigin { origin, existing });
		}
		if let Some(previous) = self.by_thread.get(&record.id())
			&& previous.origin != origin
		{
			let stale = previous.origin;
			self.unlink(stale);
		}
		self.by_origin.entry(origin.channel_id).or_default().insert(origin.message_id, record.id());
		self.by_thread.insert(record.id(), record);
		Ok(())
	}

	/// Replaces an indexed record in place. Returns `false` and drops the
	/// record if its thread is no longer indexed.
	pub fn update(&mut self, record: ThreadRecord) -> bool {
		match self.by_thread.get_mut(&record.id()) {
			Some(slot) if slot.origin == record.origin => {
				*slot = record;
				true
			}
			_ => false,
		}
	}

	/// Refreshes the channel snapshot of an indexed thread.
	pub fn refresh_channel(&mut self, channel: Channel) -> bool {
		match self.by_thread.get_mut(&channel.id) {
			Some(record) => {
				record.channel = channel;
				true
			}
			None => false,
		}
	}

	/// Removes a thread from both maps and returns it marked deleted.
	pub fn remove(&mut self, thread: ChannelId) -> Option<ThreadRecord> {
		let mut record = self.by_thread.remove(&thread)?;
		self.unlink(record.origin);
		record.deleted = true;
		Some(record)
	}

	/// Removes every thread of a guild.
	pub fn remove_guild(&mut self, guild: GuildId) -> Vec<ThreadRecord> {
		let doomed: Vec<_> = self.by_thread.values().filter(|r| r.guild_id == guild).map(ThreadRecord::id).collect();
		doomed.into_iter().filter_map(|id| self.remove(id)).collect()
	}

	fn unlink(&mut self, origin: OriginRef) {
		if let Some(messages) = self.by_origin.get_mut(&origin.channel_id) {
			messages.remove(&origin.message_id);
			if messages.is_empty() {
				self.by_origin.remove(&origin.channel_id);
			}
		}
	}
}
