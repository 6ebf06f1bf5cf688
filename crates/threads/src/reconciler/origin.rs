//! Origin pass: create, update or delete the thread of one origin message.

use std::collections::HashSet;

use skein_platform::{ChannelEdit, ChannelKind, Message, MessageContent, NewChannel, PlatformError, ResourceKind, UserId};

use super::Inner;
use crate::error::Result;
use crate::overlay::thread_overlay;
use crate::summary::{deleted_marker, render_intro};
use crate::{IntroCache, OriginRef, ThreadError, ThreadRecord};

impl Inner {
	/// Runs the origin pass for `origin` under its key.
	pub(super) async fn sync_origin(&self, origin: OriginRef) {
		let _guard = self.locks.acquire(origin.message_id).await;
		if let Err(err) = self.sync_origin_locked(origin).await {
			self.report("origin", origin, err);
		}
	}

	async fn sync_origin_locked(&self, origin: OriginRef) -> Result<()> {
		let message = self.fetch_origin(origin).await?;
		let record = self.index.lock().by_origin(origin).cloned();
		match (record, message) {
			(Some(mut record), message) => {
				self.update_thread(&mut record, message.as_ref()).await?;
				self.commit(record);
			}
			(None, Some(message)) => self.maybe_create(origin, &message).await?,
			(None, None) => {}
		}
		Ok(())
	}

	/// Authoritative copy of the origin message, `None` once it is gone.
	pub(super) async fn fetch_origin(&self, origin: OriginRef) -> Result<Option<Message>> {
		match self.platform.fetch_message(origin.channel_id, origin.message_id).await {
			Ok(message) => Ok(Some(message)),
			Err(err) if err.is_not_found() => Ok(None),
			Err(err) => Err(err.into()),
		}
	}

	/// Users other than the bot holding the trigger reaction on `message`.
	///
	/// Reads as many reactors as the fetched reaction counts, so every one of
	/// them gets a grant.
	async fn actors(&self, message: &Message) -> Result<Vec<UserId>> {
		let Some(reaction) = message.reaction(&self.config.emoji) else {
			return Ok(Vec::new());
		};
		let limit = usize::try_from(reaction.count).unwrap_or(usize::MAX);
		let users = self.platform.reaction_users(message.channel_id, message.id, &self.config.emoji, limit).await?;
		Ok(users.into_iter().map(|user| user.id).filter(|&id| id != self.me.id).collect())
	}

	async fn maybe_create(&self, origin: OriginRef, message: &Message) -> Result<()> {
		if message.author.id == self.me.id {
			return Ok(());
		}
		let Some(reaction) = message.reaction(&self.config.emoji) else {
			return Ok(());
		};
		if reaction.me {
			// Our own reaction without a record: the thread was removed behind our back.
			tracing::debug!(origin = %origin, "thread.not_resurrected");
			return Ok(());
		}
		let actors = self.actors(message).await?;
		let Some(&starter) = actors.first() else {
			return Ok(());
		};

		let source = self
			.platform
			.channel(origin.channel_id)
			.ok_or_else(|| PlatformError::not_found(ResourceKind::Channel, origin.channel_id))?;
		let guild = source.guild_id;
		let siblings = self.platform.guild_channels(guild);
		let names: HashSet<String> = siblings.iter().map(|c| c.name.clone()).collect();
		let first_contact = !actors.contains(&message.author.id);
		let encoded = self.codec.encode(origin, &message.content, starter, first_contact, &names);
		let overlay = thread_overlay(&source.overlay, guild, self.me.id, &actors, first_contact.then_some(message.author.id));

		let channel = self
			.platform
			.create_channel(
				guild,
				NewChannel {
					name: encoded.name,
					kind: ChannelKind::Text,
					topic: Some(encoded.topic),
					parent_id: source.parent_id,
					position: u32::try_from(siblings.len()).unwrap_or(u32::MAX),
					overlay,
				},
			)
			.await?;
		tracing::info!(thread = %channel.id, name = %channel.name, origin = %origin, actors = actors.len(), "thread.created");

		let mut record = ThreadRecord {
			origin,
			guild_id: guild,
			channel,
			deleted: false,
			intro: IntroCache::Empty,
			first_contact,
			starter: Some(starter),
		};
		let inserted = self.index.lock().insert(record.clone());
		if let Err(dup) = inserted {
			return Err(ThreadError::OriginConflict {
				origin,
				existing: dup.existing,
				rejected: record.id(),
			});
		}

		self.platform.add_reaction(origin.channel_id, origin.message_id, &self.config.emoji).await?;
		self.update_thread(&mut record, Some(message)).await?;
		self.commit(record);
		Ok(())
	}

	/// Brings an existing thread in line with its origin. `origin` is `None`
	/// when the origin message no longer exists.
	///
	/// Leaves `record.deleted` set when the thread is gone afterwards.
	pub(super) async fn update_thread(&self, record: &mut ThreadRecord, origin: Option<&Message>) -> Result<()> {
		if !record.intro.is_loaded() {
			match self.load_intro(record.id()).await {
				Ok(intro) => record.intro = intro,
				Err(err) if err.is_not_found() => {
					tracing::debug!(thread = %record.id(), "thread.vanished");
					record.deleted = true;
					return Ok(());
				}
				Err(err) => return Err(err),
			}
		}
		let foreign = record.intro.has_foreign_content(self.me.id);

		let Some(message) = origin else {
			if foreign {
				return self.post_intro(record, deleted_marker(&self.config, record.origin)).await;
			}
			return self.delete_thread(record, false).await;
		};

		let actors = self.actors(message).await?;
		if actors.is_empty() && !foreign {
			return self.delete_thread(record, true).await;
		}
		if record.first_contact && actors.contains(&message.author.id) {
			record.first_contact = false;
		}

		let intro = render_intro(&self.config, message, record.guild_id, self.platform.as_ref());
		self.post_intro(record, intro).await?;
		self.sync_channel(record, message, &actors).await
	}

	/// Posts `content` as the intro, or edits the existing intro if it differs.
	async fn post_intro(&self, record: &mut ThreadRecord, content: MessageContent) -> Result<()> {
		if let Some(intro) = record.intro.first_by(self.me.id) {
			if content.matches(intro) {
				return Ok(());
			}
			let id = intro.id;
			let edited = self.platform.edit_message(record.id(), id, content).await?;
			tracing::debug!(thread = %record.id(), message = %id, "thread.intro_edited");
			record.intro.replace(edited);
			return Ok(());
		}
		if record.intro.len() >= self.config.intro_len {
			tracing::error!(thread = %record.id(), origin = %record.origin, "thread.intro_sniped");
			return Ok(());
		}
		let posted = self.platform.send_message(record.id(), content).await?;
		tracing::debug!(thread = %record.id(), message = %posted.id, "thread.intro_posted");
		record.intro.push(posted);
		Ok(())
	}

	/// Applies overlay and topic, skipping the edit when nothing changed.
	async fn sync_channel(&self, record: &mut ThreadRecord, message: &Message, actors: &[UserId]) -> Result<()> {
		let base = self.platform.channel(record.origin.channel_id).map(|c| c.overlay).unwrap_or_default();
		let overlay = thread_overlay(&base, record.guild_id, self.me.id, actors, record.first_contact.then_some(message.author.id));
		let starter = record.starter.or_else(|| actors.first().copied()).unwrap_or(message.author.id);
		record.starter = Some(starter);
		let topic = self.codec.topic(record.origin, starter, record.first_contact);

		// The cached snapshot may lag behind edits made by others.
		let current = self.platform.channel(record.id()).unwrap_or_else(|| record.channel.clone());
		let edit = ChannelEdit {
			name: None,
			topic: (current.topic() != topic).then_some(topic),
			overlay: (current.overlay != overlay).then_some(overlay),
		};
		if edit.is_empty() {
			record.channel = current;
			return Ok(());
		}
		record.channel = self.platform.edit_channel(record.id(), edit).await?;
		tracing::debug!(thread = %record.id(), first_contact = record.first_contact, actors = actors.len(), "thread.channel_synced");
		Ok(())
	}

	/// Deletes the thread channel, optionally withdrawing the bot's trigger
	/// reaction from the origin.
	async fn delete_thread(&self, record: &mut ThreadRecord, withdraw_reaction: bool) -> Result<()> {
		match self.platform.delete_channel(record.id()).await {
			Ok(()) => {}
			Err(err) if err.is_not_found() => {}
			Err(err) => return Err(err.into()),
		}
		record.deleted = true;
		tracing::info!(thread = %record.id(), origin = %record.origin, "thread.deleted");

		if withdraw_reaction {
			let origin = record.origin;
			// The channel is gone either way; a stale reaction only blocks re-creation.
			if let Err(err) = self.platform.remove_own_reaction(origin.channel_id, origin.message_id, &self.config.emoji).await
				&& !err.is_not_found()
			{
				tracing::warn!(origin = %origin, error = %err, "thread.reaction_withdraw_failed");
			}
		}
		Ok(())
	}
}
