use async_trait::async_trait;

use crate::{Channel, ChannelEdit, ChannelId, Guild, GuildId, HistoryOrder, Message, MessageContent, MessageId, NewChannel, Result, RoleId, User, UserId};

/// Client for the chat platform.
///
/// Synchronous methods answer from the client's local cache and never fail;
/// a missing resource is `None` or an empty list. Async methods are network
/// round trips that may fail at any time, and report absence as
/// [`PlatformError::NotFound`](crate::PlatformError::NotFound).
///
/// Every write eventually surfaces as a [`Notification`](crate::Notification)
/// to all subscribers, including the writer itself.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
	/// The identity this client acts as.
	fn me(&self) -> User;

	fn guilds(&self) -> Vec<GuildId>;

	fn guild(&self, id: GuildId) -> Option<Guild>;

	/// Every channel of the guild, categories included.
	fn guild_channels(&self, guild: GuildId) -> Vec<Channel>;

	fn channel(&self, id: ChannelId) -> Option<Channel>;

	/// Display name of a guild member (nickname, else user name).
	fn member_name(&self, guild: GuildId, user: UserId) -> Option<String>;

	fn role_name(&self, guild: GuildId, role: RoleId) -> Option<String>;

	async fn fetch_message(&self, channel: ChannelId, message: MessageId) -> Result<Message>;

	/// Up to `limit` messages from one end of the channel.
	async fn history(&self, channel: ChannelId, limit: usize, order: HistoryOrder) -> Result<Vec<Message>>;

	/// Up to `limit` users that reacted with `emoji`, in reaction order.
	async fn reaction_users(&self, channel: ChannelId, message: MessageId, emoji: &str, limit: usize) -> Result<Vec<User>>;

	async fn create_channel(&self, guild: GuildId, channel: NewChannel) -> Result<Channel>;

	async fn edit_channel(&self, channel: ChannelId, edit: ChannelEdit) -> Result<Channel>;

	async fn delete_channel(&self, channel: ChannelId) -> Result<()>;

	async fn send_message(&self, channel: ChannelId, content: MessageContent) -> Result<Message>;

	async fn edit_message(&self, channel: ChannelId, message: MessageId, content: MessageContent) -> Result<Message>;

	async fn add_reaction(&self, channel: ChannelId, message: MessageId, emoji: &str) -> Result<()>;

	/// Withdraws the calling identity's own `emoji` reaction.
	async fn remove_own_reaction(&self, channel: ChannelId, message: MessageId, emoji: &str) -> Result<()>;
}
