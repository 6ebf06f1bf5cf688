//! Thread reconciler: turns change notifications into thread channel writes.
//!
//! # Purpose
//!
//! * Creates a thread channel when a message gets its first trigger reaction.
//! * Keeps the thread's intro, topic and access overlay in sync with the
//!   origin message and its reactors.
//! * Deletes the thread once it is orphaned or unreacted and has no
//!   content from anyone but the bot.
//! * Rebuilds its state from the platform at startup and whenever a guild or
//!   channel appears.
//!
//! # Mental model
//!
//! * Notifications are hints. Each relevant one leads to a re-fetch of the
//!   authoritative origin and a full decision pass, so duplicates, reordering
//!   and stale payloads all converge to the same result.
//! * Every decision pass for an origin runs under that origin's message id in
//!   a [`KeyedMutex`]. Notifications the pass itself causes (own reaction,
//!   own intro post, own channel edits) queue behind it.
//! * A pass works on a clone of the [`ThreadRecord`] and commits it back to
//!   the [`ThreadIndex`] at the end. The index lock is never held across I/O.
//!
//! # Invariants
//!
//! * At most one thread per origin. The create path re-checks the index after
//!   acquiring the origin key.
//! * An [`Unloaded`](crate::IntroCache::Unloaded) intro is loaded before any delete decision.
//! * Non-not-found platform failures abort the pass without committing.
//!   Nothing is retried; the next notification or discovery re-converges.
//! * A thread channel claiming an already indexed origin is left unmanaged,
//!   unless it is older than the indexed one.

mod channels;
mod discovery;
mod intro;
mod origin;
mod relevance;

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use skein_platform::{Channel, ChannelId, ChatPlatform, GuildId, Message, MessageId, NotificationHandler, ReactionEvent, User};
use skein_worker::KeyedMutex;

use crate::codec::ThreadCodec;
use crate::record::{OriginRef, ThreadIndex, ThreadRecord};
use crate::{ThreadConfig, ThreadError};

/// Handle to the reconciler. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct ThreadReconciler {
	inner: Arc<Inner>,
}

struct Inner {
	platform: Arc<dyn ChatPlatform>,
	config: ThreadConfig,
	codec: ThreadCodec,
	me: User,
	index: Mutex<ThreadIndex>,
	locks: KeyedMutex<MessageId>,
}

impl std::fmt::Debug for ThreadReconciler {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ThreadReconciler")
			.field("me", &self.inner.me.id)
			.field("threads", &self.inner.index.lock().len())
			.field("locks", &self.inner.locks)
			.finish()
	}
}

impl ThreadReconciler {
	pub fn new(platform: Arc<dyn ChatPlatform>, config: ThreadConfig) -> Self {
		let me = platform.me();
		Self {
			inner: Arc::new(Inner {
				codec: ThreadCodec::new(&config),
				platform,
				config,
				me,
				index: Mutex::new(ThreadIndex::new()),
				locks: KeyedMutex::new(),
			}),
		}
	}

	pub fn config(&self) -> &ThreadConfig {
		&self.inner.config
	}

	pub fn codec(&self) -> &ThreadCodec {
		&self.inner.codec
	}

	/// Snapshot of every managed thread, ordered by thread channel id.
	pub fn threads(&self) -> Vec<ThreadRecord> {
		let mut threads: Vec<_> = self.inner.index.lock().threads().cloned().collect();
		threads.sort_by_key(ThreadRecord::id);
		threads
	}

	pub fn thread(&self, thread: ChannelId) -> Option<ThreadRecord> {
		self.inner.index.lock().get(thread).cloned()
	}

	pub fn thread_for_origin(&self, origin: OriginRef) -> Option<ThreadRecord> {
		self.inner.index.lock().by_origin(origin).cloned()
	}

	/// Number of origin keys with a pass running or queued.
	pub fn active_origins(&self) -> usize {
		self.inner.locks.len()
	}
}

impl Inner {
	/// Writes a finished pass back to the index.
	fn commit(&self, record: ThreadRecord) {
		let mut index = self.index.lock();
		if record.deleted {
			if index.remove(record.id()).is_some() {
				tracing::debug!(thread = %record.id(), origin = %record.origin, "thread.forgotten");
			}
		} else if !index.update(record) {
			tracing::debug!("thread.commit_after_removal");
		}
	}

	/// Logs the outcome of a failed pass at the level its cause warrants.
	fn report(&self, pass: &'static str, origin: OriginRef, err: ThreadError) {
		match &err {
			ThreadError::OriginConflict { .. } => tracing::error!(pass, origin = %origin, error = %err, "thread.invariant_violation"),
			_ if err.is_not_found() => tracing::debug!(pass, origin = %origin, error = %err, "thread.pass_not_found"),
			_ => tracing::warn!(pass, origin = %origin, error = %err, "thread.pass_failed"),
		}
	}
}

#[async_trait]
impl NotificationHandler for ThreadReconciler {
	async fn ready(&self) {
		self.discover_all().await;
	}

	async fn guild_joined(&self, guild: GuildId) {
		self.discover_guild(guild).await;
	}

	async fn guild_removed(&self, guild: GuildId) {
		let removed = self.inner.index.lock().remove_guild(guild);
		tracing::info!(guild = %guild, threads = removed.len(), "thread.guild_removed");
	}

	async fn message_created(&self, message: &Message) {
		self.on_message(message.channel_id, message.id, None, Some(message)).await;
	}

	async fn message_deleted(&self, channel: ChannelId, message: MessageId) {
		self.on_message(channel, message, None, None).await;
	}

	async fn messages_bulk_deleted(&self, channel: ChannelId, messages: &[MessageId]) {
		let origins: Vec<_> = messages.iter().copied().filter(|&m| self.inner.origin_relevant(channel, m, None, None)).collect();
		futures::future::join_all(origins.into_iter().map(|m| self.inner.sync_origin(OriginRef::new(channel, m)))).await;
		if messages.iter().any(|&m| self.inner.intro_relevant(channel, m)) {
			self.inner.sync_intro(channel).await;
		}
	}

	async fn message_edited(&self, channel: ChannelId, message: MessageId, payload: Option<&Message>) {
		self.on_message(channel, message, None, payload).await;
	}

	async fn reaction_added(&self, event: &ReactionEvent) {
		self.on_message(event.channel_id, event.message_id, Some(&event.emoji), None).await;
	}

	async fn reaction_removed(&self, event: &ReactionEvent) {
		self.on_message(event.channel_id, event.message_id, Some(&event.emoji), None).await;
	}

	async fn reactions_cleared(&self, channel: ChannelId, message: MessageId, emoji: Option<&str>) {
		self.on_message(channel, message, emoji, None).await;
	}

	async fn channel_created(&self, channel: &Channel) {
		self.inner.channel_created(channel).await;
	}

	async fn channel_updated(&self, channel: &Channel) {
		self.inner.channel_updated(channel).await;
	}

	async fn channel_deleted(&self, channel: &Channel) {
		self.inner.channel_deleted(channel).await;
	}
}

impl ThreadReconciler {
	/// Routes a message-level notification to the origin pass, the intro
	/// pass, both or neither.
	async fn on_message(&self, channel: ChannelId, message: MessageId, emoji: Option<&str>, payload: Option<&Message>) {
		let inner = &self.inner;
		if inner.origin_relevant(channel, message, emoji, payload) {
			inner.sync_origin(OriginRef::new(channel, message)).await;
		}
		// Reactions never change an intro's message set.
		if emoji.is_none() && inner.intro_relevant(channel, message) {
			inner.sync_intro(channel).await;
		}
	}
}
