//! Short human-readable descriptions of resources for log lines.

use crate::{Channel, Message};

const EXCERPT_CHARS: usize = 20;

/// Collapses whitespace and cuts `text` to a short excerpt, marking cuts
/// with ` ...`.
pub fn excerpt(text: &str) -> String {
	let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
	if collapsed.chars().count() <= EXCERPT_CHARS {
		return collapsed;
	}
	let cut: String = collapsed.chars().take(EXCERPT_CHARS).collect();
	format!("{} ...", cut.trim())
}

/// `#name`, or `c=<id>` for channels without a usable name.
pub fn describe_channel(channel: &Channel) -> String {
	if channel.name.is_empty() {
		format!("c={}", channel.id.pretty())
	} else {
		format!("#{}", channel.name)
	}
}

/// `(author): "excerpt"`.
pub fn describe_message(message: &Message) -> String {
	format!("({}): \"{}\"", message.author.name, excerpt(&message.content))
}
