//! Snowflake identifiers.
//!
//! Every resource id on the platform is a 64-bit snowflake: the top 42 bits
//! are milliseconds since [`PLATFORM_EPOCH_MS`], followed by 5 bits of worker
//! id, 5 bits of process id and a 12-bit increment. Ids minted later compare
//! greater, which the reconciler relies on to pick the older of two
//! conflicting thread channels.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unix milliseconds of 2015-01-01T00:00:00Z, the snowflake epoch.
pub const PLATFORM_EPOCH_MS: i64 = 1_420_070_400_000;

/// Raw snowflake with accessors for its packed fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snowflake(pub u64);

impl Snowflake {
	/// Packs a snowflake from its parts. Out-of-range parts are masked.
	pub const fn from_parts(millis: u64, worker: u64, process: u64, increment: u64) -> Self {
		Self((millis << 22) | ((worker & 0x1F) << 17) | ((process & 0x1F) << 12) | (increment & 0xFFF))
	}

	/// Milliseconds since [`PLATFORM_EPOCH_MS`].
	pub const fn millis(self) -> u64 {
		self.0 >> 22
	}

	pub const fn worker(self) -> u64 {
		(self.0 & 0x3E_0000) >> 17
	}

	pub const fn process(self) -> u64 {
		(self.0 & 0x1_F000) >> 12
	}

	pub const fn increment(self) -> u64 {
		self.0 & 0xFFF
	}

	/// Creation time encoded in the id.
	pub fn timestamp(self) -> Option<DateTime<Utc>> {
		let millis = i64::try_from(self.millis()).ok()?;
		DateTime::from_timestamp_millis(PLATFORM_EPOCH_MS.checked_add(millis)?)
	}

	/// Human-readable form for log lines, e.g. `<2020-01-02/03:04:05.678/13/2/56>`.
	///
	/// Zero worker, process or increment fields are left blank.
	pub const fn pretty(self) -> PrettySnowflake {
		PrettySnowflake(self)
	}
}

impl fmt::Display for Snowflake {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Display adapter returned by [`Snowflake::pretty`].
#[derive(Debug, Clone, Copy)]
pub struct PrettySnowflake(Snowflake);

impl fmt::Display for PrettySnowflake {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let id = self.0;
		let Some(time) = id.timestamp() else {
			return write!(f, "?{}?", id.0);
		};
		let blank = |v: u64| if v == 0 { String::new() } else { v.to_string() };
		write!(
			f,
			"<{}/{}/{}/{}>",
			time.format("%Y-%m-%d/%H:%M:%S%.3f"),
			blank(id.worker()),
			blank(id.process()),
			blank(id.increment())
		)
	}
}

macro_rules! snowflake_id {
	($(#[$meta:meta])* $name:ident) => {
		$(#[$meta])*
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(pub u64);

		impl $name {
			pub const fn get(self) -> u64 {
				self.0
			}

			pub const fn snowflake(self) -> Snowflake {
				Snowflake(self.0)
			}

			/// See [`Snowflake::pretty`].
			pub const fn pretty(self) -> PrettySnowflake {
				PrettySnowflake(Snowflake(self.0))
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<u64> for $name {
			fn from(raw: u64) -> Self {
				Self(raw)
			}
		}

		impl From<$name> for Snowflake {
			fn from(id: $name) -> Self {
				Snowflake(id.0)
			}
		}
	};
}

snowflake_id!(
	/// Guild (server) id.
	GuildId
);
snowflake_id!(
	/// Channel id. Categories and text channels share the id space.
	ChannelId
);
snowflake_id!(
	/// Message id, unique across channels.
	MessageId
);
snowflake_id!(
	/// User id.
	UserId
);
snowflake_id!(
	/// Role id.
	RoleId
);

impl RoleId {
	/// The `@everyone` role of a guild, which shares the guild's id.
	pub const fn everyone(guild: GuildId) -> Self {
		Self(guild.0)
	}
}
