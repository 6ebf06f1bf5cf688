//! Change notifications and their fan-out.
//!
//! # Purpose
//!
//! The platform pushes a [`Notification`] for every change it observes. A
//! [`Dispatcher`] holds the fixed set of [`NotificationHandler`]s registered at
//! startup and delivers each notification to all of them concurrently.
//!
//! # Invariants
//!
//! - Delivery is at-least-once. Handlers must tolerate duplicates and
//!   notifications that are stale by the time they run.
//! - Notifications carry ids plus whatever payload arrived inline; handlers
//!   re-fetch anything they need to be authoritative about.
//! - No ordering holds between notifications about unrelated resources.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{Channel, ChannelId, GuildId, Message, MessageId, UserId};

/// A single reaction being added or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
	pub guild_id: Option<GuildId>,
	pub channel_id: ChannelId,
	pub message_id: MessageId,
	pub user_id: UserId,
	pub emoji: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
	/// The client finished connecting; its cache is populated.
	Ready,
	GuildJoined(GuildId),
	GuildRemoved(GuildId),
	MessageCreated(Message),
	MessageDeleted {
		channel_id: ChannelId,
		message_id: MessageId,
	},
	MessagesBulkDeleted {
		channel_id: ChannelId,
		message_ids: Vec<MessageId>,
	},
	MessageEdited {
		channel_id: ChannelId,
		message_id: MessageId,
		/// Full message body, when the platform delivered one.
		message: Option<Message>,
	},
	ReactionAdded(ReactionEvent),
	ReactionRemoved(ReactionEvent),
	/// All reactions were removed, or all reactions of one emoji.
	ReactionsCleared {
		channel_id: ChannelId,
		message_id: MessageId,
		emoji: Option<String>,
	},
	ChannelCreated(Channel),
	ChannelUpdated(Channel),
	/// Carries the last known snapshot of the deleted channel.
	ChannelDeleted(Channel),
}

impl Notification {
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Ready => "ready",
			Self::GuildJoined(_) => "guild_joined",
			Self::GuildRemoved(_) => "guild_removed",
			Self::MessageCreated(_) => "message_created",
			Self::MessageDeleted { .. } => "message_deleted",
			Self::MessagesBulkDeleted { .. } => "messages_bulk_deleted",
			Self::MessageEdited { .. } => "message_edited",
			Self::ReactionAdded(_) => "reaction_added",
			Self::ReactionRemoved(_) => "reaction_removed",
			Self::ReactionsCleared { .. } => "reactions_cleared",
			Self::ChannelCreated(_) => "channel_created",
			Self::ChannelUpdated(_) => "channel_updated",
			Self::ChannelDeleted(_) => "channel_deleted",
		}
	}
}

/// Typed receiver of notifications. Every method defaults to a no-op so
/// implementors only override what they care about.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
	async fn ready(&self) {}

	async fn guild_joined(&self, _guild: GuildId) {}

	async fn guild_removed(&self, _guild: GuildId) {}

	async fn message_created(&self, _message: &Message) {}

	async fn message_deleted(&self, _channel: ChannelId, _message: MessageId) {}

	async fn messages_bulk_deleted(&self, _channel: ChannelId, _messages: &[MessageId]) {}

	async fn message_edited(&self, _channel: ChannelId, _message: MessageId, _payload: Option<&Message>) {}

	async fn reaction_added(&self, _event: &ReactionEvent) {}

	async fn reaction_removed(&self, _event: &ReactionEvent) {}

	async fn reactions_cleared(&self, _channel: ChannelId, _message: MessageId, _emoji: Option<&str>) {}

	async fn channel_created(&self, _channel: &Channel) {}

	async fn channel_updated(&self, _channel: &Channel) {}

	async fn channel_deleted(&self, _channel: &Channel) {}
}

/// Static fan-out table of notification handlers.
#[derive(Clone, Default)]
pub struct Dispatcher {
	handlers: Arc<[Arc<dyn NotificationHandler>]>,
}

impl std::fmt::Debug for Dispatcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Dispatcher").field("handlers", &self.handlers.len()).finish()
	}
}

impl Dispatcher {
	pub fn new(handlers: Vec<Arc<dyn NotificationHandler>>) -> Self {
		Self { handlers: handlers.into() }
	}

	pub fn len(&self) -> usize {
		self.handlers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.handlers.is_empty()
	}

	/// Delivers `notification` to every handler and waits for all of them.
	pub async fn dispatch(&self, notification: &Notification) {
		tracing::trace!(kind = notification.kind(), handlers = self.handlers.len(), "dispatch");
		futures::future::join_all(self.handlers.iter().map(|handler| deliver(handler.as_ref(), notification))).await;
	}
}

async fn deliver(handler: &dyn NotificationHandler, notification: &Notification) {
	match notification {
		Notification::Ready => handler.ready().await,
		Notification::GuildJoined(guild) => handler.guild_joined(*guild).await,
		Notification::GuildRemoved(guild) => handler.guild_removed(*guild).await,
		Notification::MessageCreated(message) => handler.message_created(message).await,
		Notification::MessageDeleted { channel_id, message_id } => handler.message_deleted(*channel_id, *message_id).await,
		Notification::MessagesBulkDeleted { channel_id, message_ids } => handler.messages_bulk_deleted(*channel_id, message_ids).await,
		Notification::MessageEdited { channel_id, message_id, message } => handler.message_edited(*channel_id, *message_id, message.as_ref()).await,
		Notification::ReactionAdded(event) => handler.reaction_added(event).await,
		Notification::ReactionRemoved(event) => handler.reaction_removed(event).await,
		Notification::ReactionsCleared { channel_id, message_id, emoji } => handler.reactions_cleared(*channel_id, *message_id, emoji.as_deref()).await,
		Notification::ChannelCreated(channel) => handler.channel_created(channel).await,
		Notification::ChannelUpdated(channel) => handler.channel_updated(channel).await,
		Notification::ChannelDeleted(channel) => handler.channel_deleted(channel).await,
	}
}
