//! Shared fixtures for reconciler integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use skein_platform::memory::MemoryPlatform;
use skein_platform::{
	Channel, ChannelEdit, ChannelId, ChatPlatform, Dispatcher, Guild, GuildId, HistoryOrder, Message, MessageContent, MessageId, NewChannel, NotificationHandler,
	Result, RoleId, User, UserId,
};
use skein_threads::{ThreadConfig, ThreadReconciler};

pub const TRIGGER: &str = "🧵";

/// Rounds of drain-and-dispatch before [`Harness::settle`] gives up.
const MAX_SETTLE_ROUNDS: usize = 64;

/// A guild with one categorised channel, a reconciler and a dispatcher.
pub struct Harness {
	pub platform: Arc<MemoryPlatform>,
	pub client: Arc<dyn ChatPlatform>,
	pub reconciler: ThreadReconciler,
	pub dispatcher: Dispatcher,
	pub guild: GuildId,
	pub category: ChannelId,
	pub channel: ChannelId,
	pub me: UserId,
	pub alice: UserId,
	pub bob: UserId,
}

impl Harness {
	pub fn new() -> Self {
		let platform = Arc::new(MemoryPlatform::new("skein"));
		Self::build(platform.clone(), platform)
	}

	/// Like [`Harness::new`] but with the reconciler reading and writing
	/// through a [`ProbePlatform`].
	pub fn probed() -> (Self, Arc<ProbePlatform>) {
		let platform = Arc::new(MemoryPlatform::new("skein"));
		let probe = Arc::new(ProbePlatform::new(platform.clone()));
		(Self::build(platform, probe.clone()), probe)
	}

	fn build(platform: Arc<MemoryPlatform>, client: Arc<dyn ChatPlatform>) -> Self {
		let guild = platform.add_guild("Test Guild");
		let category = platform.add_category(guild, "Chat").unwrap();
		let channel = platform.add_text_channel(guild, "general", Some(category)).unwrap();
		let alice = platform.add_member(guild, "alice").unwrap();
		let bob = platform.add_member(guild, "bob").unwrap();
		platform.drain_events();

		let reconciler = ThreadReconciler::new(client.clone(), ThreadConfig::default());
		let dispatcher = Dispatcher::new(vec![Arc::new(reconciler.clone()) as Arc<dyn NotificationHandler>]);
		Self {
			me: platform.me().id,
			platform,
			client,
			reconciler,
			dispatcher,
			guild,
			category,
			channel,
			alice,
			bob,
		}
	}

	/// Drains and dispatches notifications one at a time until none are left.
	/// Returns the number of notifications dispatched.
	pub async fn settle(&self) -> usize {
		let mut dispatched = 0;
		for _ in 0..MAX_SETTLE_ROUNDS {
			let events = self.platform.drain_events();
			if events.is_empty() {
				return dispatched;
			}
			for event in &events {
				self.dispatcher.dispatch(event).await;
			}
			dispatched += events.len();
		}
		panic!("notifications did not settle after {MAX_SETTLE_ROUNDS} rounds");
	}

	/// Like [`Harness::settle`], but dispatches each drained batch
	/// concurrently.
	pub async fn settle_concurrently(&self) -> usize {
		let mut dispatched = 0;
		for _ in 0..MAX_SETTLE_ROUNDS {
			let events = self.platform.drain_events();
			if events.is_empty() {
				return dispatched;
			}
			join_all(events.iter().map(|event| self.dispatcher.dispatch(event))).await;
			dispatched += events.len();
		}
		panic!("notifications did not settle after {MAX_SETTLE_ROUNDS} rounds");
	}

	/// Replaces the reconciler with a fresh one, as after a restart, and runs
	/// discovery on it.
	pub async fn restart(&mut self) {
		self.platform.drain_events();
		self.reconciler = ThreadReconciler::new(self.client.clone(), ThreadConfig::default());
		self.dispatcher = Dispatcher::new(vec![Arc::new(self.reconciler.clone()) as Arc<dyn NotificationHandler>]);
		self.reconciler.discover_all().await;
		self.settle().await;
	}

	/// Posts `text` as `author` in the general channel and settles.
	pub async fn post(&self, author: UserId, text: &str) -> MessageId {
		let id = self.platform.post(self.channel, author, text).unwrap();
		self.settle().await;
		id
	}

	pub async fn react(&self, message: MessageId, user: UserId) {
		self.platform.react(self.channel, message, user, TRIGGER).unwrap();
		self.settle().await;
	}

	pub async fn unreact(&self, message: MessageId, user: UserId) {
		self.platform.unreact(self.channel, message, user, TRIGGER).unwrap();
		self.settle().await;
	}

	/// The single thread channel in the guild.
	pub fn only_thread(&self) -> Channel {
		let threads: Vec<_> = self.thread_channels();
		assert_eq!(threads.len(), 1, "expected exactly one thread channel, found {threads:?}");
		threads.into_iter().next().unwrap()
	}

	pub fn thread_channels(&self) -> Vec<Channel> {
		self.platform.guild_channels(self.guild).into_iter().filter(|c| c.name.starts_with(TRIGGER)).collect()
	}

	pub fn bot_reacted(&self, message: MessageId) -> bool {
		self.platform.message(self.channel, message).and_then(|m| m.reaction(TRIGGER).map(|r| r.me)).unwrap_or(false)
	}
}

/// [`ChatPlatform`] wrapper recording the peak number of concurrent
/// `fetch_message` calls per message id.
pub struct ProbePlatform {
	inner: Arc<MemoryPlatform>,
	in_flight: Mutex<HashMap<MessageId, usize>>,
	peak: AtomicUsize,
	fetches: AtomicUsize,
}

impl ProbePlatform {
	pub fn new(inner: Arc<MemoryPlatform>) -> Self {
		Self {
			inner,
			in_flight: Mutex::new(HashMap::new()),
			peak: AtomicUsize::new(0),
			fetches: AtomicUsize::new(0),
		}
	}

	/// Highest number of overlapping fetches seen for any one message.
	pub fn peak(&self) -> usize {
		self.peak.load(Ordering::SeqCst)
	}

	pub fn fetches(&self) -> usize {
		self.fetches.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl ChatPlatform for ProbePlatform {
	fn me(&self) -> User {
		self.inner.me()
	}

	fn guilds(&self) -> Vec<GuildId> {
		self.inner.guilds()
	}

	fn guild(&self, id: GuildId) -> Option<Guild> {
		self.inner.guild(id)
	}

	fn guild_channels(&self, guild: GuildId) -> Vec<Channel> {
		self.inner.guild_channels(guild)
	}

	fn channel(&self, id: ChannelId) -> Option<Channel> {
		self.inner.channel(id)
	}

	fn member_name(&self, guild: GuildId, user: UserId) -> Option<String> {
		self.inner.member_name(guild, user)
	}

	fn role_name(&self, guild: GuildId, role: RoleId) -> Option<String> {
		self.inner.role_name(guild, role)
	}

	async fn fetch_message(&self, channel: ChannelId, message: MessageId) -> Result<Message> {
		self.fetches.fetch_add(1, Ordering::SeqCst);
		let now = {
			let mut in_flight = self.in_flight.lock();
			let count = in_flight.entry(message).or_default();
			*count += 1;
			*count
		};
		self.peak.fetch_max(now, Ordering::SeqCst);
		let result = self.inner.fetch_message(channel, message).await;
		*self.in_flight.lock().entry(message).or_default() -= 1;
		result
	}

	async fn history(&self, channel: ChannelId, limit: usize, order: HistoryOrder) -> Result<Vec<Message>> {
		self.inner.history(channel, limit, order).await
	}

	async fn reaction_users(&self, channel: ChannelId, message: MessageId, emoji: &str, limit: usize) -> Result<Vec<User>> {
		self.inner.reaction_users(channel, message, emoji, limit).await
	}

	async fn create_channel(&self, guild: GuildId, channel: NewChannel) -> Result<Channel> {
		self.inner.create_channel(guild, channel).await
	}

	async fn edit_channel(&self, channel: ChannelId, edit: ChannelEdit) -> Result<Channel> {
		self.inner.edit_channel(channel, edit).await
	}

	async fn delete_channel(&self, channel: ChannelId) -> Result<()> {
		self.inner.delete_channel(channel).await
	}

	async fn send_message(&self, channel: ChannelId, content: MessageContent) -> Result<Message> {
		self.inner.send_message(channel, content).await
	}

	async fn edit_message(&self, channel: ChannelId, message: MessageId, content: MessageContent) -> Result<Message> {
		self.inner.edit_message(channel, message, content).await
	}

	async fn add_reaction(&self, channel: ChannelId, message: MessageId, emoji: &str) -> Result<()> {
		self.inner.add_reaction(channel, message, emoji).await
	}

	async fn remove_own_reaction(&self, channel: ChannelId, message: MessageId, emoji: &str) -> Result<()> {
		self.inner.remove_own_reaction(channel, message, emoji).await
	}
}
