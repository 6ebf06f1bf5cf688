//! Intro message rendering.
//!
//! The intro is the bot's first post in a thread channel. It mirrors the
//! origin message as an embed card: body text with mentions spelled out, a
//! back-link to the origin, and one line per attachment and titled link.
//! Rendering is a pure function of its inputs, so an unchanged origin renders
//! byte-identical content and the reconciler can skip the edit.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use skein_platform::{ChannelId, ChatPlatform, Embed, EmbedAuthor, GuildId, Message, MessageContent, RoleId, UserId};

use crate::{OriginRef, ThreadConfig};

/// Longest embed description the platform accepts, in characters.
pub const DESCRIPTION_LIMIT: usize = 4096;

static MENTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<(#|@!?|@&)([0-9]+)>").expect("mention regex is valid"));

/// Display names for mention rewriting.
pub trait MentionResolver {
	fn resolve_channel(&self, channel: ChannelId) -> Option<String>;
	fn resolve_member(&self, guild: GuildId, user: UserId) -> Option<String>;
	fn resolve_role(&self, guild: GuildId, role: RoleId) -> Option<String>;
}

impl<P: ChatPlatform + ?Sized> MentionResolver for P {
	fn resolve_channel(&self, channel: ChannelId) -> Option<String> {
		self.channel(channel).map(|c| c.name)
	}

	fn resolve_member(&self, guild: GuildId, user: UserId) -> Option<String> {
		self.member_name(guild, user)
	}

	fn resolve_role(&self, guild: GuildId, role: RoleId) -> Option<String> {
		self.role_name(guild, role)
	}
}

/// Renders the intro for `message`, hosted in `guild`.
pub fn render_intro<R: MentionResolver + ?Sized>(config: &ThreadConfig, message: &Message, guild: GuildId, resolver: &R) -> MessageContent {
	let author = &message.author;
	let body = resolve_mentions(&message.content, guild, resolver);

	let mut footer = format!(
		"\n\u{a0}\n{} [original message]({}/{}/{}/{}) in <#{}> by <@{}>",
		config.emoji, config.link_base, guild, message.channel_id, message.id, message.channel_id, author.id
	);
	for attachment in &message.attachments {
		let url = attachment.proxy_url.as_deref().unwrap_or(&attachment.url);
		footer.push_str(&format!("\n📎 [{}]({})", escape_markdown(&attachment.filename), encode_url(url)));
		if attachment.is_spoiler() {
			footer.push_str(" (spoiler!)");
		}
	}
	for embed in &message.embeds {
		if let (Some(title), Some(url)) = (embed.title.as_deref(), embed.url.as_deref()) {
			footer.push_str(&format!("\n🔗 [{}]({})", escape_markdown(title), encode_url(url)));
		}
	}

	MessageContent {
		content: String::new(),
		embed: Some(Embed {
			description: Some(fit_description(&body, &footer)),
			author: Some(EmbedAuthor {
				name: resolver.resolve_member(guild, author.id).unwrap_or_else(|| author.name.clone()),
				icon_url: author.avatar_url.clone(),
				proxy_icon_url: None,
			}),
			..Embed::default()
		}),
	}
}

/// Intro shown once the origin message is gone but the thread has content.
pub fn deleted_marker(config: &ThreadConfig, origin: OriginRef) -> MessageContent {
	MessageContent::text(format!("{} original message in <#{}> was **deleted**", config.emoji, origin.channel_id))
}

/// Rewrites `<#id>`, `<@id>`, `<@!id>` and `<@&id>` to display text.
pub fn resolve_mentions<R: MentionResolver + ?Sized>(text: &str, guild: GuildId, resolver: &R) -> String {
	MENTION
		.replace_all(text, |caps: &Captures<'_>| {
			let Ok(id) = caps[2].parse::<u64>() else {
				return caps[0].to_string();
			};
			match &caps[1] {
				"#" => format!("#{}", resolver.resolve_channel(ChannelId(id)).as_deref().unwrap_or("unknown")),
				"@&" => {
					let name = resolver.resolve_role(guild, RoleId(id));
					format!("@{}", name.as_deref().map_or("unknown", |n| n.trim_start_matches('@')))
				}
				_ => format!("@{}", resolver.resolve_member(guild, UserId(id)).as_deref().unwrap_or("unknown")),
			}
		})
		.into_owned()
}

/// Joins body and footer within [`DESCRIPTION_LIMIT`], cutting the body
/// first.
fn fit_description(body: &str, footer: &str) -> String {
	let body_len = body.chars().count();
	let footer_len = footer.chars().count();
	let text = if body_len + footer_len <= DESCRIPTION_LIMIT {
		format!("{body}{footer}")
	} else if footer_len < DESCRIPTION_LIMIT {
		let kept: String = body.chars().take(DESCRIPTION_LIMIT - footer_len - 1).collect();
		format!("{kept}…{footer}")
	} else {
		let kept: String = footer.chars().take(DESCRIPTION_LIMIT - 1).collect();
		format!("{kept}…")
	};
	text.trim().to_string()
}

/// Backslash-escapes characters that carry markdown meaning.
pub fn escape_markdown(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for c in text.chars() {
		if matches!(c, '\\' | '*' | '_' | '~' | '|' | '`' | '>' | '[' | ']') {
			out.push('\\');
		}
		out.push(c);
	}
	out
}

/// Percent-encodes characters that would end a markdown link target early.
fn encode_url(url: &str) -> String {
	url.replace('(', "%28").replace(')', "%29").replace(' ', "%20")
}
