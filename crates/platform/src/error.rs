use std::fmt;

use crate::Snowflake;

pub type Result<T, E = PlatformError> = std::result::Result<T, E>;

/// Kind of resource a [`PlatformError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
	Guild,
	Channel,
	Message,
	User,
}

impl fmt::Display for ResourceKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Guild => "guild",
			Self::Channel => "channel",
			Self::Message => "message",
			Self::User => "user",
		})
	}
}

/// Failure of a platform read or write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum PlatformError {
	/// The resource does not exist (any more). An expected outcome for most
	/// callers, not a fault.
	#[error("{kind} {id} not found")]
	NotFound { kind: ResourceKind, id: Snowflake },
	/// The calling identity lacks a permission.
	#[error("forbidden: {0}")]
	Forbidden(String),
	/// The platform answered with an unexpected status.
	#[error("http {status}: {message}")]
	Http { status: u16, message: String },
	/// The request never completed.
	#[error("transport failure: {0}")]
	Transport(String),
	/// Failure scripted by a test double.
	#[error("injected failure: {0}")]
	Injected(String),
}

impl PlatformError {
	pub fn not_found(kind: ResourceKind, id: impl Into<Snowflake>) -> Self {
		Self::NotFound { kind, id: id.into() }
	}

	pub const fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound { .. })
	}
}
