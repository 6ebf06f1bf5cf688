//! Scripted scenarios against an in-memory guild.
//!
//! A scenario declares a guild, its members and channels, then a list of
//! steps. Every step mutates the [`MemoryPlatform`] the way a user would and
//! the resulting notifications are dispatched to a live [`ThreadReconciler`]
//! until none are left. The outcome is the set of thread channels.
//!
//! ```toml
//! guild = "Book club"
//! members = ["alice", "bob"]
//!
//! [[channels]]
//! name = "general"
//! category = "Chat"
//!
//! [[steps]]
//! action = "post"
//! label = "pitch"
//! channel = "general"
//! author = "alice"
//! text = "Next month: Dune?"
//!
//! [[steps]]
//! action = "react"
//! message = "pitch"
//! user = "bob"
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use skein_platform::memory::MemoryPlatform;
use skein_platform::{ChannelId, ChatPlatform, Dispatcher, GuildId, Message, MessageId, Notification, NotificationHandler, OverwriteTarget, Permissions, PlatformError, UserId};
use skein_threads::{OriginRef, ThreadConfig, ThreadReconciler};
use skein_worker::{TaskClass, join_error_panic_message};
use thiserror::Error;

use crate::event_log::NotificationLogger;

/// Drain-and-dispatch rounds after which a step counts as not settling.
const MAX_SETTLE_ROUNDS: usize = 64;

#[derive(Debug, Error)]
pub enum ScenarioError {
	#[error("I/O error reading {path}: {error}")]
	Io { path: PathBuf, error: std::io::Error },
	#[error("invalid scenario: {0}")]
	Parse(#[from] toml::de::Error),
	#[error("unknown member `{0}`")]
	UnknownMember(String),
	#[error("unknown channel `{0}`")]
	UnknownChannel(String),
	#[error("unknown message label `{0}`")]
	UnknownMessage(String),
	#[error("message `{0}` has no thread")]
	NoThread(String),
	#[error("step {index}: {reason}")]
	InvalidStep { index: usize, reason: String },
	#[error("notifications did not settle after {0} rounds")]
	Unsettled(usize),
	#[error(transparent)]
	Platform(#[from] PlatformError),
}

pub type Result<T> = std::result::Result<T, ScenarioError>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
	#[serde(default = "default_guild")]
	pub guild: String,
	#[serde(default)]
	pub members: Vec<String>,
	#[serde(default)]
	pub channels: Vec<ChannelSpec>,
	#[serde(default)]
	pub steps: Vec<Step>,
}

fn default_guild() -> String {
	"Scenario".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelSpec {
	pub name: String,
	#[serde(default)]
	pub category: Option<String>,
}

/// One user-visible action. Messages are referred to by the label given
/// when they were posted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
	/// Posts in a named channel, or in the thread of a labelled message.
	Post {
		#[serde(default)]
		label: Option<String>,
		#[serde(default)]
		channel: Option<String>,
		#[serde(default)]
		thread: Option<String>,
		author: String,
		text: String,
	},
	React {
		message: String,
		user: String,
	},
	Unreact {
		message: String,
		user: String,
	},
	Edit {
		message: String,
		text: String,
	},
	Delete {
		message: String,
	},
	/// Clears reactions, all of them or one emoji.
	Clear {
		message: String,
		#[serde(default)]
		emoji: Option<String>,
	},
	/// A moderator deletes the thread of a labelled message.
	RemoveThread {
		message: String,
	},
	/// Replaces the reconciler with a fresh one that rediscovers everything.
	Restart,
}

impl Scenario {
	pub fn parse(content: &str) -> Result<Self> {
		Ok(toml::from_str(content)?)
	}

	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|error| ScenarioError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::parse(&content)
	}
}

/// Final state of one thread channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadReport {
	pub name: String,
	pub topic: String,
	/// `channel/label` of the origin, or raw ids for unlabelled origins.
	pub origin: String,
	/// Members granted visibility, sorted.
	pub members: Vec<String>,
	/// Author and text of each intro message.
	pub intro: Vec<String>,
}

/// Runs `scenario` to completion and reports the resulting threads, sorted
/// by name.
pub async fn run(scenario: &Scenario, config: ThreadConfig) -> Result<Vec<ThreadReport>> {
	let mut replay = Replay::new(scenario, config)?;
	replay.boot().await?;
	for (index, step) in scenario.steps.iter().enumerate() {
		tracing::debug!(index, ?step, "replay.step");
		replay.apply(index, step).await?;
		replay.settle().await?;
	}
	Ok(replay.report())
}

struct Replay {
	platform: Arc<MemoryPlatform>,
	config: ThreadConfig,
	reconciler: ThreadReconciler,
	dispatcher: Dispatcher,
	guild: GuildId,
	members: HashMap<String, UserId>,
	channels: HashMap<String, ChannelId>,
	messages: HashMap<String, (ChannelId, MessageId)>,
}

impl Replay {
	fn new(scenario: &Scenario, config: ThreadConfig) -> Result<Self> {
		let platform = Arc::new(MemoryPlatform::new("skein"));
		let guild = platform.add_guild(scenario.guild.clone());
		let me = platform.me();

		let mut members = HashMap::from([(me.name, me.id)]);
		for name in &scenario.members {
			members.insert(name.clone(), platform.add_member(guild, name.clone())?);
		}

		let mut categories = HashMap::new();
		let mut channels = HashMap::new();
		for spec in &scenario.channels {
			let parent = match &spec.category {
				Some(category) => Some(match categories.get(category) {
					Some(&id) => id,
					None => {
						let id = platform.add_category(guild, category.clone())?;
						categories.insert(category.clone(), id);
						id
					}
				}),
				None => None,
			};
			channels.insert(spec.name.clone(), platform.add_text_channel(guild, spec.name.clone(), parent)?);
		}
		platform.drain_events();

		let (reconciler, dispatcher) = Self::handlers(&platform, &config);
		Ok(Self {
			platform,
			config,
			reconciler,
			dispatcher,
			guild,
			members,
			channels,
			messages: HashMap::new(),
		})
	}

	fn handlers(platform: &Arc<MemoryPlatform>, config: &ThreadConfig) -> (ThreadReconciler, Dispatcher) {
		let client: Arc<dyn ChatPlatform> = platform.clone();
		let reconciler = ThreadReconciler::new(client.clone(), config.clone());
		let dispatcher = Dispatcher::new(vec![
			Arc::new(NotificationLogger::new(client)) as Arc<dyn NotificationHandler>,
			Arc::new(reconciler.clone()),
		]);
		(reconciler, dispatcher)
	}

	async fn boot(&mut self) -> Result<()> {
		self.platform.push_event(Notification::Ready);
		self.settle().await
	}

	/// Dispatches queued notifications, each on its own task, until the
	/// queue stays empty.
	async fn settle(&self) -> Result<()> {
		for _ in 0..MAX_SETTLE_ROUNDS {
			let events = self.platform.drain_events();
			if events.is_empty() {
				return Ok(());
			}
			let handles: Vec<_> = events
				.into_iter()
				.map(|event| {
					let dispatcher = self.dispatcher.clone();
					skein_worker::spawn(TaskClass::Notification, "notification", async move { dispatcher.dispatch(&event).await })
				})
				.collect();
			for handle in handles {
				if let Err(err) = handle.await {
					let panic = join_error_panic_message(err);
					tracing::error!(panic = panic.as_deref().unwrap_or("cancelled"), "replay.notification_failed");
				}
			}
		}
		Err(ScenarioError::Unsettled(MAX_SETTLE_ROUNDS))
	}

	async fn apply(&mut self, index: usize, step: &Step) -> Result<()> {
		match step {
			Step::Post {
				label,
				channel,
				thread,
				author,
				text,
			} => {
				let target = match (channel, thread) {
					(Some(channel), None) => self.channel(channel)?,
					(None, Some(origin)) => self.thread_of(origin)?,
					_ => {
						return Err(ScenarioError::InvalidStep {
							index,
							reason: "post needs exactly one of `channel` or `thread`".to_string(),
						});
					}
				};
				let id = self.platform.post(target, self.member(author)?, text.clone())?;
				if let Some(label) = label {
					self.messages.insert(label.clone(), (target, id));
				}
			}
			Step::React { message, user } => {
				let (channel, id) = self.message(message)?;
				self.platform.react(channel, id, self.member(user)?, &self.config.emoji)?;
			}
			Step::Unreact { message, user } => {
				let (channel, id) = self.message(message)?;
				self.platform.unreact(channel, id, self.member(user)?, &self.config.emoji)?;
			}
			Step::Edit { message, text } => {
				let (channel, id) = self.message(message)?;
				self.platform.edit(channel, id, text.clone())?;
			}
			Step::Delete { message } => {
				let (channel, id) = self.message(message)?;
				self.platform.delete_message(channel, id)?;
			}
			Step::Clear { message, emoji } => {
				let (channel, id) = self.message(message)?;
				self.platform.clear_reactions(channel, id, emoji.as_deref())?;
			}
			Step::RemoveThread { message } => {
				let thread = self.thread_of(message)?;
				self.platform.remove_channel(thread)?;
			}
			Step::Restart => {
				self.platform.drain_events();
				(self.reconciler, self.dispatcher) = Self::handlers(&self.platform, &self.config);
				self.boot().await?;
			}
		}
		Ok(())
	}

	fn member(&self, name: &str) -> Result<UserId> {
		self.members.get(name).copied().ok_or_else(|| ScenarioError::UnknownMember(name.to_string()))
	}

	fn channel(&self, name: &str) -> Result<ChannelId> {
		self.channels.get(name).copied().ok_or_else(|| ScenarioError::UnknownChannel(name.to_string()))
	}

	fn message(&self, label: &str) -> Result<(ChannelId, MessageId)> {
		self.messages.get(label).copied().ok_or_else(|| ScenarioError::UnknownMessage(label.to_string()))
	}

	fn thread_of(&self, label: &str) -> Result<ChannelId> {
		let (channel, id) = self.message(label)?;
		self.reconciler
			.thread_for_origin(OriginRef::new(channel, id))
			.map(|record| record.id())
			.ok_or_else(|| ScenarioError::NoThread(label.to_string()))
	}

	fn report(&self) -> Vec<ThreadReport> {
		let member_names: HashMap<UserId, &str> = self.members.iter().map(|(name, &id)| (id, name.as_str())).collect();
		let channel_names: HashMap<ChannelId, &str> = self.channels.iter().map(|(name, &id)| (id, name.as_str())).collect();
		let labels: HashMap<(ChannelId, MessageId), &str> = self.messages.iter().map(|(label, &key)| (key, label.as_str())).collect();

		let mut reports: Vec<_> = self
			.platform
			.guild_channels(self.guild)
			.into_iter()
			.filter_map(|channel| {
				let decoded = self.reconciler.codec().decode(&channel.name, channel.topic())?;
				let origin = decoded.origin;
				let origin = match (channel_names.get(&origin.channel_id), labels.get(&(origin.channel_id, origin.message_id))) {
					(Some(name), Some(label)) => format!("{name}/{label}"),
					_ => origin.to_string(),
				};
				let members: BTreeSet<String> = channel
					.overlay
					.iter()
					.filter_map(|(target, _)| match target {
						OverwriteTarget::Member(user) if channel.overlay.allows(target, Permissions::VIEW_CHANNEL) => {
							Some(member_names.get(&user).map_or_else(|| user.to_string(), |name| name.to_string()))
						}
						_ => None,
					})
					.collect();
				let intro = self.platform.messages(channel.id).iter().take(self.config.intro_len).map(intro_line).collect();
				Some(ThreadReport {
					name: channel.name.clone(),
					topic: channel.topic().to_string(),
					origin,
					members: members.into_iter().collect(),
					intro,
				})
			})
			.collect();
		reports.sort_by(|a, b| a.name.cmp(&b.name));
		reports
	}
}

/// `author: text`, using the first line of an embed description when the
/// message has no plain content.
fn intro_line(message: &Message) -> String {
	let text = if message.content.is_empty() {
		message.embeds.iter().find_map(|embed| embed.description.as_deref()).and_then(|d| d.lines().next()).unwrap_or_default()
	} else {
		message.content.as_str()
	};
	format!("{}: {}", message.author.name, text)
}

pub fn render_json(reports: &[ThreadReport]) -> serde_json::Result<String> {
	serde_json::to_string_pretty(reports)
}

/// Human-readable rendering of a report.
pub fn render(reports: &[ThreadReport]) -> String {
	if reports.is_empty() {
		return "no threads\n".to_string();
	}
	let mut out = String::new();
	for report in reports {
		out.push_str(&format!("{} (origin {})\n", report.name, report.origin));
		out.push_str(&format!("  topic:   {}\n", report.topic));
		out.push_str(&format!("  members: {}\n", report.members.join(", ")));
		for line in &report.intro {
			out.push_str(&format!("  | {line}\n"));
		}
	}
	out
}
