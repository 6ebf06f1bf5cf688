//! Resource snapshots as returned by the platform.

use serde::{Deserialize, Serialize};

use crate::{AccessOverlay, ChannelId, GuildId, MessageId, RoleId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guild {
	pub id: GuildId,
	pub name: String,
}

impl Guild {
	pub const fn everyone_role(&self) -> RoleId {
		RoleId::everyone(self.id)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
	Text,
	Category,
	Voice,
}

/// Guild channel snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
	pub id: ChannelId,
	pub guild_id: GuildId,
	pub kind: ChannelKind,
	pub name: String,
	pub topic: Option<String>,
	/// Enclosing category, if any.
	pub parent_id: Option<ChannelId>,
	pub position: u32,
	pub overlay: AccessOverlay,
}

impl Channel {
	pub fn is_text(&self) -> bool {
		self.kind == ChannelKind::Text
	}

	pub fn topic(&self) -> &str {
		self.topic.as_deref().unwrap_or_default()
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
	pub id: UserId,
	pub name: String,
	pub avatar_url: Option<String>,
	pub bot: bool,
}

/// Aggregated reaction state for one emoji on one message, from the caller's
/// point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
	pub emoji: String,
	pub count: u32,
	/// Whether the calling identity is among the reactors.
	pub me: bool,
}

impl Reaction {
	/// Reactors other than the calling identity.
	pub fn others(&self) -> u32 {
		self.count.saturating_sub(u32::from(self.me))
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
	pub filename: String,
	pub url: String,
	/// Cached copy served by the platform's media proxy.
	pub proxy_url: Option<String>,
}

impl Attachment {
	/// Spoilered uploads are marked by a filename prefix.
	pub fn is_spoiler(&self) -> bool {
		self.filename.starts_with("SPOILER_")
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmbedAuthor {
	pub name: String,
	pub icon_url: Option<String>,
	/// Filled in by the platform when the embed is stored; never sent.
	pub proxy_icon_url: Option<String>,
}

/// Rich card attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Embed {
	pub title: Option<String>,
	pub url: Option<String>,
	pub description: Option<String>,
	pub author: Option<EmbedAuthor>,
}

impl Embed {
	/// Copy with the fields the platform fills in on storage cleared, for
	/// comparing a stored embed against a freshly rendered one.
	pub fn without_platform_fields(&self) -> Self {
		let mut embed = self.clone();
		if let Some(author) = embed.author.as_mut() {
			author.proxy_icon_url = None;
		}
		embed
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
	pub id: MessageId,
	pub channel_id: ChannelId,
	pub guild_id: Option<GuildId>,
	pub author: User,
	pub content: String,
	pub attachments: Vec<Attachment>,
	pub embeds: Vec<Embed>,
	pub reactions: Vec<Reaction>,
}

impl Message {
	pub fn reaction(&self, emoji: &str) -> Option<&Reaction> {
		self.reactions.iter().find(|reaction| reaction.emoji == emoji)
	}
}

/// Body for a new or edited message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageContent {
	pub content: String,
	pub embed: Option<Embed>,
}

impl MessageContent {
	pub fn text(content: impl Into<String>) -> Self {
		Self {
			content: content.into(),
			embed: None,
		}
	}

	/// Returns `true` if `message` already shows this content, ignoring
	/// platform-filled embed fields.
	pub fn matches(&self, message: &Message) -> bool {
		let stored = message.embeds.first().map(Embed::without_platform_fields);
		let wanted = self.embed.as_ref().map(Embed::without_platform_fields);
		message.content == self.content && stored == wanted
	}
}

/// Parameters for creating a guild channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChannel {
	pub name: String,
	pub kind: ChannelKind,
	pub topic: Option<String>,
	pub parent_id: Option<ChannelId>,
	pub position: u32,
	pub overlay: AccessOverlay,
}

/// Partial channel update. `None` fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelEdit {
	pub name: Option<String>,
	pub topic: Option<String>,
	pub overlay: Option<AccessOverlay>,
}

impl ChannelEdit {
	pub fn is_empty(&self) -> bool {
		self.name.is_none() && self.topic.is_none() && self.overlay.is_none()
	}
}

/// Direction of a history read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOrder {
	OldestFirst,
	NewestFirst,
}
