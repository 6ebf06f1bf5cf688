//! Startup and guild-join discovery.
//!
//! Threads are recognised from channel metadata alone, so discovery rebuilds
//! the whole index: attach every decodable channel, catch each thread up
//! with its origin, then scan recent history for trigger reactions that
//! arrived while nobody was listening.

use futures::future::join_all;
use skein_platform::GuildId;
use skein_worker::{TaskClass, WorkerJoinSet};

use super::ThreadReconciler;

impl ThreadReconciler {
	/// Runs [`Self::discover_guild`] for every guild, one task per guild.
	pub async fn discover_all(&self) {
		let guilds = self.inner.platform.guilds();
		let mut tasks = WorkerJoinSet::new(TaskClass::Discovery);
		for guild in guilds {
			let this = self.clone();
			tasks.spawn(async move { this.discover_guild(guild).await });
		}
		let swept = tasks.join_all().await.len();
		tracing::info!(guilds = swept, threads = self.inner.index.lock().len(), "thread.discovery_done");
	}

	/// Rebuilds the threads of one guild from its channels.
	pub async fn discover_guild(&self, guild: GuildId) {
		let inner = &self.inner;
		let channels: Vec<_> = inner.platform.guild_channels(guild).into_iter().filter(|c| c.is_text()).collect();

		let candidates: Vec<_> = channels.iter().filter_map(|c| inner.codec.decode(&c.name, c.topic()).map(|decoded| (c.clone(), decoded))).collect();
		let attached = join_all(candidates.into_iter().map(|(channel, decoded)| async move {
			let origin = decoded.origin;
			inner.attach(channel, decoded).await.map(|thread| (thread, origin))
		}))
		.await;

		join_all(attached.into_iter().flatten().map(|(thread, origin)| inner.catch_up(thread, origin))).await;
		join_all(channels.iter().map(|c| inner.scan_history(c.id))).await;

		tracing::debug!(guild = %guild, channels = channels.len(), "thread.guild_discovered");
	}
}
