//! Thread-channel reconciliation for skein.
//!
//! A message that receives the trigger reaction gets a private side channel
//! (a "thread") whose intro mirrors the message and whose visibility follows
//! the set of users holding the reaction.
//!
//! - [`ThreadReconciler`]: the notification handler that owns all writes.
//! - [`ThreadIndex`] and [`ThreadRecord`]: in-memory state, rebuilt by discovery.
//! - [`ThreadCodec`]: origin ownership encoded into channel name and topic.
//! - [`render_intro`]: the intro card, a pure function of the origin message.

mod codec;
mod config;
mod error;
mod overlay;
mod reconciler;
mod record;
mod summary;

pub use codec::{DecodedThread, EncodedThread, ThreadCodec};
pub use config::ThreadConfig;
pub use error::{Result, ThreadError};
pub use overlay::thread_overlay;
pub use reconciler::ThreadReconciler;
pub use record::{DuplicateOrigin, IntroCache, OriginRef, ThreadIndex, ThreadRecord};
pub use summary::{DESCRIPTION_LIMIT, MentionResolver, deleted_marker, escape_markdown, render_intro, resolve_mentions};
