use serde::{Deserialize, Serialize};

/// Tunables of the thread reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThreadConfig {
	/// Trigger reaction, also used as the thread channel name prefix.
	pub emoji: String,
	/// Character budget of the slug part of a thread channel name.
	pub max_name_len: usize,
	/// Number of leading thread messages tracked as the intro.
	pub intro_len: usize,
	/// How many recent messages per channel discovery scans for triggers.
	pub history_scan_limit: usize,
	/// Base of back-links to origin messages, without a trailing slash.
	pub link_base: String,
}

impl Default for ThreadConfig {
	fn default() -> Self {
		Self {
			emoji: "🧵".to_string(),
			max_name_len: 20,
			intro_len: 2,
			history_scan_limit: 100,
			link_base: "https://discord.com/channels".to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_tables_keep_defaults() {
		let config: ThreadConfig = toml::from_str("intro_len = 3\nlink_base = \"https://chat.invalid/c\"").unwrap();
		assert_eq!(config.intro_len, 3);
		assert_eq!(config.link_base, "https://chat.invalid/c");
		assert_eq!(config.emoji, "🧵");
		assert_eq!(config.max_name_len, 20);
	}

	#[test]
	fn unknown_keys_are_rejected() {
		assert!(toml::from_str::<ThreadConfig>("emojii = \"x\"").is_err());
	}
}
