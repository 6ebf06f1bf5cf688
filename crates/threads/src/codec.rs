//! Restart-safe encoding of thread ownership into channel name and topic.
//!
//! A thread channel is recognised purely from its own metadata: the name
//! starts with the trigger emoji and the topic ends with a bracketed
//! reference to the origin, e.g.
//!
//! ```text
//! name:  🧵Check-this-out
//! topic: Thread started by <@42> for [<#1234>/4d2]*.
//! ```
//!
//! The message id is hex, the channel reference is a channel mention (older
//! topics carry bare hex instead) and a `*` after the bracket marks that the
//! origin author is still auto-granted visibility. Anything that does not
//! decode is simply not a thread.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use skein_platform::{ChannelId, MessageId, UserId};

use crate::{OriginRef, ThreadConfig};

/// Removed from message text before building a slug: whole URLs and any
/// character outside letters, marks, numbers, modifier/other symbols (emoji)
/// and format characters (zero-width joiners).
static SLUG_CLEANUP: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"https?://\S+|[^\p{L}\p{M}\p{N}\p{Sk}\p{So}\p{Cf}]+").expect("slug cleanup regex is valid"));

static TOPIC_REF: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?i)\[(?:id=)?(<#[0-9]+>|[0-9a-f]+)/([0-9a-f]+)\](\*?)[\s.]*").expect("topic regex is valid"));

static TOPIC_STARTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<@!?([0-9]+)>").expect("starter regex is valid"));

const FALLBACK_SLUG: &str = "thread";
const ELLIPSIS: char = '…';
const FIRST_CONTACT_MARKER: &str = "*";

/// Name and topic for a new thread channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedThread {
	pub name: String,
	pub topic: String,
}

/// Ownership data recovered from a thread channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedThread {
	pub origin: OriginRef,
	pub first_contact: bool,
	pub starter: Option<UserId>,
}

#[derive(Debug, Clone)]
pub struct ThreadCodec {
	prefix: String,
	budget: usize,
}

impl ThreadCodec {
	pub fn new(config: &ThreadConfig) -> Self {
		Self {
			prefix: config.emoji.clone(),
			budget: config.max_name_len,
		}
	}

	/// Builds the name and topic for a thread on `origin`.
	///
	/// `existing` holds the names already used in the guild; a numeric suffix
	/// is appended until the name is unique.
	pub fn encode(&self, origin: OriginRef, text: &str, starter: UserId, first_contact: bool, existing: &HashSet<String>) -> EncodedThread {
		EncodedThread {
			name: self.unique_name(text, existing),
			topic: self.topic(origin, starter, first_contact),
		}
	}

	pub fn topic(&self, origin: OriginRef, starter: UserId, first_contact: bool) -> String {
		let marker = if first_contact { FIRST_CONTACT_MARKER } else { "" };
		format!("Thread started by <@{starter}> for [<#{}>/{:x}]{marker}.", origin.channel_id, origin.message_id.get())
	}

	/// Prefix plus slug, disambiguated against `existing`.
	pub fn unique_name(&self, text: &str, existing: &HashSet<String>) -> String {
		let base = format!("{}{}", self.prefix, self.slug(text));
		let mut name = base.clone();
		let mut number = 1u32;
		while existing.contains(&name) {
			number += 1;
			name = format!("{base}-{number}");
		}
		name
	}

	/// Hyphen-joined words of `text` within the character budget.
	///
	/// A word that overflows the budget ends the slug with an ellipsis. It is
	/// cut to fill the budget only while the slug is shorter than half the
	/// budget, so long first words still yield something readable.
	pub fn slug(&self, text: &str) -> String {
		let cleaned = SLUG_CLEANUP.replace_all(text, " ");
		let mut slug = String::new();
		let mut len = 0usize;
		for word in cleaned.split_whitespace() {
			let sep = usize::from(!slug.is_empty());
			let add = sep + word.chars().count();
			if len + add <= self.budget {
				if sep == 1 {
					slug.push('-');
				}
				slug.push_str(word);
				len += add;
				continue;
			}
			if len < self.budget / 2 {
				let piece = if sep == 1 { "-" } else { "" };
				slug.extend(piece.chars().chain(word.chars()).take(self.budget - len));
			}
			slug.push(ELLIPSIS);
			break;
		}
		if slug.is_empty() { FALLBACK_SLUG.to_string() } else { slug }
	}

	pub fn is_thread_name(&self, name: &str) -> bool {
		name.starts_with(&self.prefix)
	}

	/// Recovers thread ownership from a channel's name and topic, or `None` if
	/// the channel is not a thread.
	pub fn decode(&self, name: &str, topic: &str) -> Option<DecodedThread> {
		if !self.is_thread_name(name) {
			return None;
		}
		let captures = TOPIC_REF.captures_iter(topic).last()?;
		let channel_ref = captures.get(1)?.as_str();
		let channel_id = match channel_ref.strip_prefix("<#").and_then(|rest| rest.strip_suffix('>')) {
			Some(decimal) => decimal.parse().ok()?,
			None => u64::from_str_radix(channel_ref, 16).ok()?,
		};
		let message_id = u64::from_str_radix(captures.get(2)?.as_str(), 16).ok()?;
		let first_contact = captures.get(3).is_some_and(|m| !m.as_str().is_empty());
		let reference_start = captures.get(0).map_or(topic.len(), |m| m.start());
		let starter = TOPIC_STARTER
			.captures(&topic[..reference_start])
			.and_then(|c| c.get(1))
			.and_then(|m| m.as_str().parse().ok())
			.map(UserId);
		Some(DecodedThread {
			origin: OriginRef::new(ChannelId(channel_id), MessageId(message_id)),
			first_contact,
			starter,
		})
	}
}

#[cfg(test)]
mod tests;
