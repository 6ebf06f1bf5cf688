//! In-process [`ChatPlatform`] for tests and scenario replay.
//!
//! # Purpose
//!
//! Holds a complete guild, channel and message graph in memory. Writes made
//! through the [`ChatPlatform`] API and actions of simulated users (posting,
//! reacting, deleting) both mutate the graph and queue a [`Notification`],
//! exactly as a live connection would echo them back. Callers drain the queue
//! with [`MemoryPlatform::drain_events`] and feed it to a
//! [`Dispatcher`](crate::Dispatcher).
//!
//! # Invariants
//!
//! - Every effective mutation queues exactly one notification. No-op
//!   mutations (re-adding an existing reaction) queue nothing.
//! - Only writes made through [`ChatPlatform`] are counted in [`WriteCounts`].
//! - Ids come from one monotonic sequence, so a later resource always has a
//!   larger snowflake than an earlier one.
//! - The state lock is never held across an await.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
	AccessOverlay, Attachment, Channel, ChannelEdit, ChannelId, ChannelKind, ChatPlatform, Embed, Guild, GuildId, HistoryOrder, Message, MessageContent, MessageId,
	NewChannel, Notification, PlatformError, Reaction, ReactionEvent, ResourceKind, Result, RoleId, Snowflake, User, UserId,
};

/// Milliseconds after the snowflake epoch at which minted ids start (2021).
const MINT_BASE_MILLIS: u64 = 189_302_400_000;

/// Client operations that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
	FetchMessage,
	History,
	ReactionUsers,
	CreateChannel,
	EditChannel,
	DeleteChannel,
	SendMessage,
	EditMessage,
	AddReaction,
	RemoveOwnReaction,
}

/// Number of writes issued through the [`ChatPlatform`] API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteCounts {
	pub channels_created: usize,
	pub channels_edited: usize,
	pub channels_deleted: usize,
	pub messages_sent: usize,
	pub messages_edited: usize,
	pub reactions_added: usize,
	pub reactions_removed: usize,
}

impl WriteCounts {
	pub fn total(&self) -> usize {
		self.channels_created + self.channels_edited + self.channels_deleted + self.messages_sent + self.messages_edited + self.reactions_added + self.reactions_removed
	}
}

/// Body of a message posted by a simulated user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
	pub content: String,
	pub attachments: Vec<Attachment>,
	pub embeds: Vec<Embed>,
}

impl Draft {
	pub fn text(content: impl Into<String>) -> Self {
		Self {
			content: content.into(),
			..Self::default()
		}
	}

	pub fn attachment(mut self, attachment: Attachment) -> Self {
		self.attachments.push(attachment);
		self
	}

	pub fn embed(mut self, embed: Embed) -> Self {
		self.embeds.push(embed);
		self
	}
}

struct GuildState {
	guild: Guild,
	/// Members and their nicknames.
	members: BTreeMap<UserId, Option<String>>,
	roles: BTreeMap<RoleId, String>,
}

struct StoredMessage {
	message: Message,
	/// Reactors per emoji, in reaction order. Emoji order is first-use order.
	reactions: Vec<(String, Vec<UserId>)>,
}

struct State {
	me: User,
	seq: u64,
	guilds: BTreeMap<GuildId, GuildState>,
	users: HashMap<UserId, User>,
	channels: BTreeMap<ChannelId, Channel>,
	messages: HashMap<ChannelId, BTreeMap<MessageId, StoredMessage>>,
	events: VecDeque<Notification>,
	writes: WriteCounts,
	failures: HashMap<Op, VecDeque<PlatformError>>,
}

impl State {
	fn mint(&mut self) -> u64 {
		self.seq += 1;
		Snowflake::from_parts(MINT_BASE_MILLIS + self.seq, 1, 1, self.seq).0
	}

	fn take_failure(&mut self, op: Op) -> Result<()> {
		match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
			Some(err) => {
				tracing::debug!(?op, error = %err, "memory.injected_failure");
				Err(err)
			}
			None => Ok(()),
		}
	}

	fn emit(&mut self, notification: Notification) {
		tracing::trace!(kind = notification.kind(), queued = self.events.len() + 1, "memory.emit");
		self.events.push_back(notification);
	}

	fn guild_mut(&mut self, id: GuildId) -> Result<&mut GuildState> {
		self.guilds.get_mut(&id).ok_or_else(|| PlatformError::not_found(ResourceKind::Guild, id))
	}

	fn text_channel(&self, id: ChannelId) -> Result<&Channel> {
		match self.channels.get(&id) {
			Some(channel) if channel.is_text() => Ok(channel),
			_ => Err(PlatformError::not_found(ResourceKind::Channel, id)),
		}
	}

	fn stored(&self, channel: ChannelId, message: MessageId) -> Result<&StoredMessage> {
		self.text_channel(channel)?;
		self.messages
			.get(&channel)
			.and_then(|messages| messages.get(&message))
			.ok_or_else(|| PlatformError::not_found(ResourceKind::Message, message))
	}

	fn stored_mut(&mut self, channel: ChannelId, message: MessageId) -> Result<&mut StoredMessage> {
		self.text_channel(channel)?;
		self.messages
			.get_mut(&channel)
			.and_then(|messages| messages.get_mut(&message))
			.ok_or_else(|| PlatformError::not_found(ResourceKind::Message, message))
	}

	fn user(&self, id: UserId) -> Result<User> {
		self.users.get(&id).cloned().ok_or_else(|| PlatformError::not_found(ResourceKind::User, id))
	}

	/// Snapshot of a stored message with reactions seen from `me`.
	fn view(&self, stored: &StoredMessage) -> Message {
		let mut message = stored.message.clone();
		message.reactions = stored
			.reactions
			.iter()
			.filter(|(_, users)| !users.is_empty())
			.map(|(emoji, users)| Reaction {
				emoji: emoji.clone(),
				count: u32::try_from(users.len()).unwrap_or(u32::MAX),
				me: users.contains(&self.me.id),
			})
			.collect();
		message
	}

	fn insert_message(&mut self, channel: ChannelId, author: UserId, draft: Draft) -> Result<Message> {
		let guild_id = self.text_channel(channel)?.guild_id;
		let author = self.user(author)?;
		let id = MessageId(self.mint());
		let message = Message {
			id,
			channel_id: channel,
			guild_id: Some(guild_id),
			author,
			content: draft.content,
			attachments: draft.attachments,
			embeds: draft.embeds,
			reactions: Vec::new(),
		};
		self.messages.entry(channel).or_default().insert(
			id,
			StoredMessage {
				message: message.clone(),
				reactions: Vec::new(),
			},
		);
		self.emit(Notification::MessageCreated(message.clone()));
		Ok(message)
	}

	fn insert_channel(&mut self, guild: GuildId, mut channel: Channel) -> Result<Channel> {
		self.guild_mut(guild)?;
		channel.id = ChannelId(self.mint());
		channel.guild_id = guild;
		self.channels.insert(channel.id, channel.clone());
		if channel.is_text() {
			self.messages.insert(channel.id, BTreeMap::new());
		}
		self.emit(Notification::ChannelCreated(channel.clone()));
		Ok(channel)
	}

	fn update_channel(&mut self, id: ChannelId, edit: ChannelEdit) -> Result<Channel> {
		let channel = self.channels.get_mut(&id).ok_or_else(|| PlatformError::not_found(ResourceKind::Channel, id))?;
		if let Some(name) = edit.name {
			channel.name = name;
		}
		if let Some(topic) = edit.topic {
			channel.topic = Some(topic);
		}
		if let Some(overlay) = edit.overlay {
			channel.overlay = overlay;
		}
		let channel = channel.clone();
		self.emit(Notification::ChannelUpdated(channel.clone()));
		Ok(channel)
	}

	fn remove_channel(&mut self, id: ChannelId) -> Result<Channel> {
		let channel = self.channels.remove(&id).ok_or_else(|| PlatformError::not_found(ResourceKind::Channel, id))?;
		self.messages.remove(&id);
		self.emit(Notification::ChannelDeleted(channel.clone()));
		Ok(channel)
	}

	fn replace_body(&mut self, channel: ChannelId, message: MessageId, content: MessageContent) -> Result<Message> {
		let stored = self.stored_mut(channel, message)?;
		stored.message.content = content.content;
		stored.message.embeds = content.embed.into_iter().map(fill_platform_fields).collect();
		let snapshot = self.view(self.stored(channel, message)?);
		self.emit(Notification::MessageEdited {
			channel_id: channel,
			message_id: message,
			message: Some(snapshot.clone()),
		});
		Ok(snapshot)
	}

	/// Returns `false` if `user` had already reacted with `emoji`.
	fn add_reactor(&mut self, channel: ChannelId, message: MessageId, user: UserId, emoji: &str) -> Result<bool> {
		let guild_id = self.text_channel(channel)?.guild_id;
		self.user(user)?;
		let stored = self.stored_mut(channel, message)?;
		let slot = match stored.reactions.iter().position(|(e, _)| e == emoji) {
			Some(slot) => slot,
			None => {
				stored.reactions.push((emoji.to_string(), Vec::new()));
				stored.reactions.len() - 1
			}
		};
		let users = &mut stored.reactions[slot].1;
		if users.contains(&user) {
			return Ok(false);
		}
		users.push(user);
		self.emit(Notification::ReactionAdded(ReactionEvent {
			guild_id: Some(guild_id),
			channel_id: channel,
			message_id: message,
			user_id: user,
			emoji: emoji.to_string(),
		}));
		Ok(true)
	}

	/// Returns `false` if `user` had not reacted with `emoji`.
	fn remove_reactor(&mut self, channel: ChannelId, message: MessageId, user: UserId, emoji: &str) -> Result<bool> {
		let guild_id = self.text_channel(channel)?.guild_id;
		let stored = self.stored_mut(channel, message)?;
		let Some((_, users)) = stored.reactions.iter_mut().find(|(e, _)| e == emoji) else {
			return Ok(false);
		};
		let before = users.len();
		users.retain(|u| *u != user);
		if users.len() == before {
			return Ok(false);
		}
		self.emit(Notification::ReactionRemoved(ReactionEvent {
			guild_id: Some(guild_id),
			channel_id: channel,
			message_id: message,
			user_id: user,
			emoji: emoji.to_string(),
		}));
		Ok(true)
	}
}

/// Mimics the media proxy rewriting author icons on stored embeds.
fn fill_platform_fields(mut embed: Embed) -> Embed {
	if let Some(author) = embed.author.as_mut() {
		author.proxy_icon_url = author.icon_url.as_ref().map(|url| format!("https://media.invalid/proxy?u={url}"));
	}
	embed
}

/// In-memory chat platform. See the module docs.
pub struct MemoryPlatform {
	state: Mutex<State>,
	io_yields: AtomicUsize,
}

impl std::fmt::Debug for MemoryPlatform {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.state.lock();
		f.debug_struct("MemoryPlatform")
			.field("me", &state.me.id)
			.field("guilds", &state.guilds.len())
			.field("channels", &state.channels.len())
			.field("pending_events", &state.events.len())
			.finish()
	}
}

impl MemoryPlatform {
	/// Creates an empty platform acting as a bot user named `me`.
	pub fn new(me: impl Into<String>) -> Self {
		let mut state = State {
			me: User {
				id: UserId(0),
				name: String::new(),
				avatar_url: None,
				bot: true,
			},
			seq: 0,
			guilds: BTreeMap::new(),
			users: HashMap::new(),
			channels: BTreeMap::new(),
			messages: HashMap::new(),
			events: VecDeque::new(),
			writes: WriteCounts::default(),
			failures: HashMap::new(),
		};
		let id = UserId(state.mint());
		state.me = User {
			id,
			name: me.into(),
			avatar_url: Some(format!("https://avatars.invalid/{id}.png")),
			bot: true,
		};
		state.users.insert(id, state.me.clone());
		Self {
			state: Mutex::new(state),
			io_yields: AtomicUsize::new(0),
		}
	}

	/// Makes every async client call yield `n` times before taking effect,
	/// so concurrent callers interleave.
	pub fn set_io_yields(&self, n: usize) {
		self.io_yields.store(n, Ordering::Relaxed);
	}

	async fn io(&self) {
		for _ in 0..self.io_yields.load(Ordering::Relaxed) {
			tokio::task::yield_now().await;
		}
	}

	/// Scripts the next call of `op` to fail with `error`. Calls queue up.
	pub fn fail_next(&self, op: Op, error: PlatformError) {
		self.state.lock().failures.entry(op).or_default().push_back(error);
	}

	pub fn writes(&self) -> WriteCounts {
		self.state.lock().writes
	}

	pub fn reset_writes(&self) {
		self.state.lock().writes = WriteCounts::default();
	}

	/// Takes every queued notification, oldest first.
	pub fn drain_events(&self) -> Vec<Notification> {
		self.state.lock().events.drain(..).collect()
	}

	pub fn pending_events(&self) -> usize {
		self.state.lock().events.len()
	}

	/// Queues a notification that did not come from a mutation, such as
	/// [`Notification::Ready`] or a duplicate delivery.
	pub fn push_event(&self, notification: Notification) {
		self.state.lock().emit(notification);
	}

	/// Joins a new guild, queuing [`Notification::GuildJoined`].
	pub fn add_guild(&self, name: impl Into<String>) -> GuildId {
		let mut state = self.state.lock();
		let id = GuildId(state.mint());
		let me = state.me.id;
		state.guilds.insert(
			id,
			GuildState {
				guild: Guild { id, name: name.into() },
				members: BTreeMap::from([(me, None)]),
				roles: BTreeMap::from([(RoleId::everyone(id), "@everyone".to_string())]),
			},
		);
		state.emit(Notification::GuildJoined(id));
		id
	}

	/// Leaves a guild, dropping its channels and queuing
	/// [`Notification::GuildRemoved`].
	pub fn remove_guild(&self, guild: GuildId) -> Result<()> {
		let mut state = self.state.lock();
		state.guilds.remove(&guild).ok_or_else(|| PlatformError::not_found(ResourceKind::Guild, guild))?;
		let doomed: Vec<_> = state.channels.values().filter(|c| c.guild_id == guild).map(|c| c.id).collect();
		for id in doomed {
			state.channels.remove(&id);
			state.messages.remove(&id);
		}
		state.emit(Notification::GuildRemoved(guild));
		Ok(())
	}

	/// Creates a user and makes it a member of `guild`.
	pub fn add_member(&self, guild: GuildId, name: impl Into<String>) -> Result<UserId> {
		let mut state = self.state.lock();
		state.guild_mut(guild)?;
		let id = UserId(state.mint());
		let user = User {
			id,
			name: name.into(),
			avatar_url: Some(format!("https://avatars.invalid/{id}.png")),
			bot: false,
		};
		state.users.insert(id, user);
		state.guild_mut(guild)?.members.insert(id, None);
		Ok(id)
	}

	pub fn set_nickname(&self, guild: GuildId, user: UserId, nickname: Option<String>) -> Result<()> {
		let mut state = self.state.lock();
		let guild_state = state.guild_mut(guild)?;
		let slot = guild_state.members.get_mut(&user).ok_or_else(|| PlatformError::not_found(ResourceKind::User, user))?;
		*slot = nickname;
		Ok(())
	}

	pub fn add_role(&self, guild: GuildId, name: impl Into<String>) -> Result<RoleId> {
		let mut state = self.state.lock();
		state.guild_mut(guild)?;
		let id = RoleId(state.mint());
		state.guild_mut(guild)?.roles.insert(id, name.into());
		Ok(id)
	}

	/// Creates a category out-of-band, queuing [`Notification::ChannelCreated`].
	pub fn add_category(&self, guild: GuildId, name: impl Into<String>) -> Result<ChannelId> {
		self.add_channel(guild, ChannelKind::Category, name.into(), None, None)
	}

	/// Creates a text channel out-of-band, queuing [`Notification::ChannelCreated`].
	pub fn add_text_channel(&self, guild: GuildId, name: impl Into<String>, parent: Option<ChannelId>) -> Result<ChannelId> {
		self.add_channel(guild, ChannelKind::Text, name.into(), None, parent)
	}

	/// Creates a text channel with an explicit topic, as if a user made it.
	pub fn add_text_channel_with_topic(&self, guild: GuildId, name: impl Into<String>, topic: impl Into<String>, parent: Option<ChannelId>) -> Result<ChannelId> {
		self.add_channel(guild, ChannelKind::Text, name.into(), Some(topic.into()), parent)
	}

	fn add_channel(&self, guild: GuildId, kind: ChannelKind, name: String, topic: Option<String>, parent: Option<ChannelId>) -> Result<ChannelId> {
		let mut state = self.state.lock();
		let overlay = parent.and_then(|p| state.channels.get(&p)).map(|p| p.overlay.clone()).unwrap_or_default();
		let position = u32::try_from(state.channels.values().filter(|c| c.guild_id == guild).count()).unwrap_or(u32::MAX);
		let channel = Channel {
			id: ChannelId(0),
			guild_id: guild,
			kind,
			name,
			topic,
			parent_id: parent,
			position,
			overlay,
		};
		Ok(state.insert_channel(guild, channel)?.id)
	}

	/// Edits a channel out-of-band, queuing [`Notification::ChannelUpdated`].
	pub fn update_channel(&self, channel: ChannelId, edit: ChannelEdit) -> Result<Channel> {
		self.state.lock().update_channel(channel, edit)
	}

	/// Replaces a channel's overlay out-of-band.
	pub fn set_overlay(&self, channel: ChannelId, overlay: AccessOverlay) -> Result<Channel> {
		self.update_channel(
			channel,
			ChannelEdit {
				overlay: Some(overlay),
				..ChannelEdit::default()
			},
		)
	}

	/// Deletes a channel out-of-band, queuing [`Notification::ChannelDeleted`].
	pub fn remove_channel(&self, channel: ChannelId) -> Result<Channel> {
		self.state.lock().remove_channel(channel)
	}

	/// Posts a plain-text message as `author`.
	pub fn post(&self, channel: ChannelId, author: UserId, content: impl Into<String>) -> Result<MessageId> {
		self.post_draft(channel, author, Draft::text(content))
	}

	pub fn post_draft(&self, channel: ChannelId, author: UserId, draft: Draft) -> Result<MessageId> {
		Ok(self.state.lock().insert_message(channel, author, draft)?.id)
	}

	/// Adds `user`'s reaction. Re-adding an existing reaction is a no-op.
	pub fn react(&self, channel: ChannelId, message: MessageId, user: UserId, emoji: &str) -> Result<()> {
		self.state.lock().add_reactor(channel, message, user, emoji).map(drop)
	}

	/// Removes `user`'s reaction. Removing a missing reaction is a no-op.
	pub fn unreact(&self, channel: ChannelId, message: MessageId, user: UserId, emoji: &str) -> Result<()> {
		self.state.lock().remove_reactor(channel, message, user, emoji).map(drop)
	}

	/// Removes every reaction, or every reaction with `emoji`.
	pub fn clear_reactions(&self, channel: ChannelId, message: MessageId, emoji: Option<&str>) -> Result<()> {
		let mut state = self.state.lock();
		let stored = state.stored_mut(channel, message)?;
		match emoji {
			Some(emoji) => stored.reactions.retain(|(e, _)| e != emoji),
			None => stored.reactions.clear(),
		}
		state.emit(Notification::ReactionsCleared {
			channel_id: channel,
			message_id: message,
			emoji: emoji.map(str::to_string),
		});
		Ok(())
	}

	/// Replaces a message's text as its author would.
	pub fn edit(&self, channel: ChannelId, message: MessageId, content: impl Into<String>) -> Result<()> {
		let mut state = self.state.lock();
		let embeds = state.stored(channel, message)?.message.embeds.first().cloned();
		state
			.replace_body(
				channel,
				message,
				MessageContent {
					content: content.into(),
					embed: embeds,
				},
			)
			.map(drop)
	}

	/// Deletes a message, queuing [`Notification::MessageDeleted`].
	pub fn delete_message(&self, channel: ChannelId, message: MessageId) -> Result<()> {
		let mut state = self.state.lock();
		state.stored(channel, message)?;
		if let Some(messages) = state.messages.get_mut(&channel) {
			messages.remove(&message);
		}
		state.emit(Notification::MessageDeleted {
			channel_id: channel,
			message_id: message,
		});
		Ok(())
	}

	/// Deletes several messages at once, queuing one
	/// [`Notification::MessagesBulkDeleted`].
	pub fn bulk_delete(&self, channel: ChannelId, messages: &[MessageId]) -> Result<()> {
		let mut state = self.state.lock();
		state.text_channel(channel)?;
		if let Some(stored) = state.messages.get_mut(&channel) {
			for id in messages {
				stored.remove(id);
			}
		}
		state.emit(Notification::MessagesBulkDeleted {
			channel_id: channel,
			message_ids: messages.to_vec(),
		});
		Ok(())
	}

	/// Current snapshot of one message.
	pub fn message(&self, channel: ChannelId, message: MessageId) -> Option<Message> {
		let state = self.state.lock();
		let stored = state.stored(channel, message).ok()?;
		Some(state.view(stored))
	}

	/// Every message in a channel, oldest first.
	pub fn messages(&self, channel: ChannelId) -> Vec<Message> {
		let state = self.state.lock();
		state.messages.get(&channel).map(|messages| messages.values().map(|stored| state.view(stored)).collect()).unwrap_or_default()
	}

	/// Looks a guild channel up by exact name.
	pub fn find_channel(&self, guild: GuildId, name: &str) -> Option<Channel> {
		self.state.lock().channels.values().find(|c| c.guild_id == guild && c.name == name).cloned()
	}

	/// Looks a user up by name.
	pub fn find_user(&self, name: &str) -> Option<User> {
		self.state.lock().users.values().find(|u| u.name == name).cloned()
	}
}

#[async_trait]
impl ChatPlatform for MemoryPlatform {
	fn me(&self) -> User {
		self.state.lock().me.clone()
	}

	fn guilds(&self) -> Vec<GuildId> {
		self.state.lock().guilds.keys().copied().collect()
	}

	fn guild(&self, id: GuildId) -> Option<Guild> {
		self.state.lock().guilds.get(&id).map(|g| g.guild.clone())
	}

	fn guild_channels(&self, guild: GuildId) -> Vec<Channel> {
		self.state.lock().channels.values().filter(|c| c.guild_id == guild).cloned().collect()
	}

	fn channel(&self, id: ChannelId) -> Option<Channel> {
		self.state.lock().channels.get(&id).cloned()
	}

	fn member_name(&self, guild: GuildId, user: UserId) -> Option<String> {
		let state = self.state.lock();
		let nickname = state.guilds.get(&guild)?.members.get(&user)?.clone();
		nickname.or_else(|| state.users.get(&user).map(|u| u.name.clone()))
	}

	fn role_name(&self, guild: GuildId, role: RoleId) -> Option<String> {
		self.state.lock().guilds.get(&guild)?.roles.get(&role).cloned()
	}

	async fn fetch_message(&self, channel: ChannelId, message: MessageId) -> Result<Message> {
		self.io().await;
		let mut state = self.state.lock();
		state.take_failure(Op::FetchMessage)?;
		let stored = state.stored(channel, message)?;
		Ok(state.view(stored))
	}

	async fn history(&self, channel: ChannelId, limit: usize, order: HistoryOrder) -> Result<Vec<Message>> {
		self.io().await;
		let mut state = self.state.lock();
		state.take_failure(Op::History)?;
		state.text_channel(channel)?;
		let Some(messages) = state.messages.get(&channel) else {
			return Ok(Vec::new());
		};
		let out = match order {
			HistoryOrder::OldestFirst => messages.values().take(limit).map(|stored| state.view(stored)).collect(),
			HistoryOrder::NewestFirst => messages.values().rev().take(limit).map(|stored| state.view(stored)).collect(),
		};
		Ok(out)
	}

	async fn reaction_users(&self, channel: ChannelId, message: MessageId, emoji: &str, limit: usize) -> Result<Vec<User>> {
		self.io().await;
		let mut state = self.state.lock();
		state.take_failure(Op::ReactionUsers)?;
		let stored = state.stored(channel, message)?;
		let ids: Vec<UserId> = stored.reactions.iter().find(|(e, _)| e == emoji).map(|(_, users)| users.iter().take(limit).copied().collect()).unwrap_or_default();
		ids.into_iter().map(|id| state.user(id)).collect()
	}

	async fn create_channel(&self, guild: GuildId, channel: NewChannel) -> Result<Channel> {
		self.io().await;
		let mut state = self.state.lock();
		state.take_failure(Op::CreateChannel)?;
		let created = state.insert_channel(
			guild,
			Channel {
				id: ChannelId(0),
				guild_id: guild,
				kind: channel.kind,
				name: channel.name,
				topic: channel.topic,
				parent_id: channel.parent_id,
				position: channel.position,
				overlay: channel.overlay,
			},
		)?;
		state.writes.channels_created += 1;
		Ok(created)
	}

	async fn edit_channel(&self, channel: ChannelId, edit: ChannelEdit) -> Result<Channel> {
		self.io().await;
		let mut state = self.state.lock();
		state.take_failure(Op::EditChannel)?;
		let edited = state.update_channel(channel, edit)?;
		state.writes.channels_edited += 1;
		Ok(edited)
	}

	async fn delete_channel(&self, channel: ChannelId) -> Result<()> {
		self.io().await;
		let mut state = self.state.lock();
		state.take_failure(Op::DeleteChannel)?;
		state.remove_channel(channel)?;
		state.writes.channels_deleted += 1;
		Ok(())
	}

	async fn send_message(&self, channel: ChannelId, content: MessageContent) -> Result<Message> {
		self.io().await;
		let mut state = self.state.lock();
		state.take_failure(Op::SendMessage)?;
		let me = state.me.id;
		let draft = Draft {
			content: content.content,
			attachments: Vec::new(),
			embeds: content.embed.into_iter().map(fill_platform_fields).collect(),
		};
		let sent = state.insert_message(channel, me, draft)?;
		state.writes.messages_sent += 1;
		Ok(sent)
	}

	async fn edit_message(&self, channel: ChannelId, message: MessageId, content: MessageContent) -> Result<Message> {
		self.io().await;
		let mut state = self.state.lock();
		state.take_failure(Op::EditMessage)?;
		if state.stored(channel, message)?.message.author.id != state.me.id {
			return Err(PlatformError::Forbidden(format!("message {message} is not ours to edit")));
		}
		let edited = state.replace_body(channel, message, content)?;
		state.writes.messages_edited += 1;
		Ok(edited)
	}

	async fn add_reaction(&self, channel: ChannelId, message: MessageId, emoji: &str) -> Result<()> {
		self.io().await;
		let mut state = self.state.lock();
		state.take_failure(Op::AddReaction)?;
		let me = state.me.id;
		state.add_reactor(channel, message, me, emoji)?;
		state.writes.reactions_added += 1;
		Ok(())
	}

	async fn remove_own_reaction(&self, channel: ChannelId, message: MessageId, emoji: &str) -> Result<()> {
		self.io().await;
		let mut state = self.state.lock();
		state.take_failure(Op::RemoveOwnReaction)?;
		let me = state.me.id;
		state.remove_reactor(channel, message, me, emoji)?;
		state.writes.reactions_removed += 1;
		Ok(())
	}
}
