//! Chat-platform model and client interface.
//!
//! - [`ChatPlatform`]: the async client the reconciler reads and writes through.
//! - [`Notification`], [`NotificationHandler`], [`Dispatcher`]: typed change
//!   notifications and their static fan-out.
//! - Snowflake ids ([`GuildId`], [`ChannelId`], ...) and resource snapshots.
//! - `memory` (feature): an in-process platform for tests and scenario replay.

mod client;
mod describe;
mod error;
mod id;
mod model;
mod notification;
mod permissions;

#[cfg(feature = "memory")]
pub mod memory;

pub use client::ChatPlatform;
pub use describe::{describe_channel, describe_message, excerpt};
pub use error::{PlatformError, ResourceKind, Result};
pub use id::{ChannelId, GuildId, MessageId, PLATFORM_EPOCH_MS, PrettySnowflake, RoleId, Snowflake, UserId};
pub use model::{Attachment, Channel, ChannelEdit, ChannelKind, Embed, EmbedAuthor, Guild, HistoryOrder, Message, MessageContent, NewChannel, Reaction, User};
pub use notification::{Dispatcher, Notification, NotificationHandler, ReactionEvent};
pub use permissions::{AccessOverlay, Overwrite, OverwriteTarget, Permissions};
