//! Notification logger.
//!
//! Registered next to the reconciler so every notification leaves a trace:
//! guild membership changes at `info`, everything else at `debug`.

use std::sync::Arc;

use async_trait::async_trait;
use skein_platform::{Channel, ChannelId, ChatPlatform, GuildId, Message, MessageId, NotificationHandler, ReactionEvent, describe_channel, describe_message};

pub struct NotificationLogger {
	platform: Arc<dyn ChatPlatform>,
}

impl NotificationLogger {
	pub fn new(platform: Arc<dyn ChatPlatform>) -> Self {
		Self { platform }
	}

	fn channel_label(&self, channel: ChannelId) -> String {
		self.platform.channel(channel).map_or_else(|| format!("c={}", channel.pretty()), |c| describe_channel(&c))
	}

	fn guild_label(&self, guild: GuildId) -> String {
		self.platform.guild(guild).map_or_else(|| guild.pretty().to_string(), |g| g.name)
	}
}

#[async_trait]
impl NotificationHandler for NotificationLogger {
	async fn ready(&self) {
		tracing::info!(guilds = self.platform.guilds().len(), me = %self.platform.me().name, "notify.ready");
	}

	async fn guild_joined(&self, guild: GuildId) {
		tracing::info!(guild = %self.guild_label(guild), id = %guild.pretty(), "notify.guild_joined");
	}

	async fn guild_removed(&self, guild: GuildId) {
		tracing::info!(id = %guild.pretty(), "notify.guild_removed");
	}

	async fn message_created(&self, message: &Message) {
		tracing::debug!(channel = %self.channel_label(message.channel_id), message = %describe_message(message), "notify.message_created");
	}

	async fn message_deleted(&self, channel: ChannelId, message: MessageId) {
		tracing::debug!(channel = %self.channel_label(channel), message = %message.pretty(), "notify.message_deleted");
	}

	async fn messages_bulk_deleted(&self, channel: ChannelId, messages: &[MessageId]) {
		tracing::debug!(channel = %self.channel_label(channel), count = messages.len(), "notify.messages_bulk_deleted");
	}

	async fn message_edited(&self, channel: ChannelId, message: MessageId, payload: Option<&Message>) {
		match payload {
			Some(payload) => tracing::debug!(channel = %self.channel_label(channel), message = %describe_message(payload), "notify.message_edited"),
			None => tracing::debug!(channel = %self.channel_label(channel), message = %message.pretty(), "notify.message_edited"),
		}
	}

	async fn reaction_added(&self, event: &ReactionEvent) {
		tracing::debug!(channel = %self.channel_label(event.channel_id), message = %event.message_id.pretty(), user = %event.user_id, emoji = %event.emoji, "notify.reaction_added");
	}

	async fn reaction_removed(&self, event: &ReactionEvent) {
		tracing::debug!(channel = %self.channel_label(event.channel_id), message = %event.message_id.pretty(), user = %event.user_id, emoji = %event.emoji, "notify.reaction_removed");
	}

	async fn reactions_cleared(&self, channel: ChannelId, message: MessageId, emoji: Option<&str>) {
		tracing::debug!(channel = %self.channel_label(channel), message = %message.pretty(), emoji = emoji.unwrap_or("*"), "notify.reactions_cleared");
	}

	async fn channel_created(&self, channel: &Channel) {
		tracing::debug!(channel = %describe_channel(channel), id = %channel.id.pretty(), "notify.channel_created");
	}

	async fn channel_updated(&self, channel: &Channel) {
		tracing::debug!(channel = %describe_channel(channel), id = %channel.id.pretty(), "notify.channel_updated");
	}

	async fn channel_deleted(&self, channel: &Channel) {
		tracing::debug!(channel = %describe_channel(channel), id = %channel.id.pretty(), "notify.channel_deleted");
	}
}
