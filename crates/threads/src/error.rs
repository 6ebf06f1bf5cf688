use skein_platform::{ChannelId, PlatformError};

use crate::OriginRef;

pub type Result<T, E = ThreadError> = std::result::Result<T, E>;

/// Failure inside a reconciler procedure. Never surfaces past the
/// reconciler; it decides how loudly to log and drops the notification.
#[derive(Debug, thiserror::Error)]
pub enum ThreadError {
	#[error(transparent)]
	Platform(#[from] PlatformError),
	/// Two thread channels claim one origin. The newer channel is left alone.
	#[error("origin {origin} is already managed by thread {existing}; leaving {rejected} unmanaged")]
	OriginConflict { origin: OriginRef, existing: ChannelId, rejected: ChannelId },
}

impl ThreadError {
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::Platform(err) if err.is_not_found())
	}
}
