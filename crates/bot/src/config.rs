//! Configuration file of the `skein` binary.
//!
//! ```toml
//! [log]
//! level = "info"
//! json = false
//!
//! [threads]
//! emoji = "🧵"
//! intro_len = 2
//! ```
//!
//! Every key is optional. A missing file yields the defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use skein_threads::ThreadConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("I/O error reading {path}: {error}")]
	Io { path: PathBuf, error: std::io::Error },
	#[error("invalid configuration: {0}")]
	Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BotConfig {
	pub log: LogConfig,
	pub threads: ThreadConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
	/// Default filter level when `RUST_LOG` is unset.
	pub level: String,
	/// Emit newline-delimited JSON instead of human-readable lines.
	pub json: bool,
}

impl Default for LogConfig {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			json: false,
		}
	}
}

impl BotConfig {
	pub fn parse(content: &str) -> Result<Self> {
		Ok(toml::from_str(content)?)
	}

	/// Loads configuration from a file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::parse(&content)
	}

	/// Loads `path` if given and present, defaults otherwise.
	pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
		match path {
			Some(path) => match Self::load(path) {
				Err(ConfigError::Io { error, .. }) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
				other => other,
			},
			None => Ok(Self::default()),
		}
	}
}
