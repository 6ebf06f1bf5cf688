#![allow(unused_crate_dependencies)]

mod support;

use futures::future::join_all;
use pretty_assertions::assert_eq;
use skein_platform::memory::Op;
use skein_platform::{AccessOverlay, ChannelEdit, ChatPlatform, Notification, NotificationHandler, OverwriteTarget, Permissions, PlatformError, ReactionEvent, RoleId};
use skein_threads::OriginRef;
use support::{Harness, TRIGGER};

fn http_500() -> PlatformError {
	PlatformError::Http {
		status: 500,
		message: "upstream hiccup".into(),
	}
}

#[tokio::test(flavor = "current_thread")]
async fn duplicate_trigger_notifications_create_one_thread() {
	let h = Harness::new();
	h.platform.set_io_yields(3);
	let m1 = h.post(h.alice, "Check this out").await;

	h.platform.react(h.channel, m1, h.alice, TRIGGER).unwrap();
	let events = h.platform.drain_events();
	join_all(events.iter().chain(&events).chain(&events).map(|event| h.dispatcher.dispatch(event))).await;
	h.settle_concurrently().await;

	h.only_thread();
	let writes = h.platform.writes();
	assert_eq!(writes.channels_created, 1);
	assert_eq!(writes.reactions_added, 1);
	assert_eq!(writes.messages_sent, 1);
	assert_eq!(h.reconciler.threads().len(), 1);
	assert_eq!(h.reconciler.active_origins(), 0);
}

#[tokio::test(flavor = "current_thread")]
async fn concurrent_reactors_share_one_thread() {
	let h = Harness::new();
	h.platform.set_io_yields(2);
	let m1 = h.post(h.alice, "Check this out").await;

	h.platform.react(h.channel, m1, h.alice, TRIGGER).unwrap();
	h.platform.react(h.channel, m1, h.bob, TRIGGER).unwrap();
	h.settle_concurrently().await;

	let thread = h.only_thread();
	assert!(thread.overlay.allows(OverwriteTarget::Member(h.alice), Permissions::PARTICIPATE));
	assert!(thread.overlay.allows(OverwriteTarget::Member(h.bob), Permissions::PARTICIPATE));
	assert_eq!(h.platform.writes().channels_created, 1);
}

#[tokio::test(flavor = "current_thread")]
async fn passes_for_one_origin_never_overlap() {
	let (h, probe) = Harness::probed();
	h.platform.set_io_yields(4);
	let m1 = h.post(h.alice, "Check this out").await;

	h.platform.react(h.channel, m1, h.alice, TRIGGER).unwrap();
	h.platform.react(h.channel, m1, h.bob, TRIGGER).unwrap();
	h.platform.edit(h.channel, m1, "Check this out, really").unwrap();
	let events = h.platform.drain_events();
	join_all(events.iter().chain(&events).map(|event| h.dispatcher.dispatch(event))).await;
	h.settle_concurrently().await;

	assert!(probe.fetches() >= 4, "only {} fetches", probe.fetches());
	assert_eq!(probe.peak(), 1);
	h.only_thread();
}

#[tokio::test(flavor = "current_thread")]
async fn unchanged_origin_renders_without_writes() {
	let h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.react(m1, h.alice).await;
	let thread = h.only_thread();
	h.platform.reset_writes();

	h.platform.push_event(Notification::ReactionAdded(ReactionEvent {
		guild_id: Some(h.guild),
		channel_id: h.channel,
		message_id: m1,
		user_id: h.alice,
		emoji: TRIGGER.into(),
	}));
	h.platform.push_event(Notification::MessageEdited {
		channel_id: h.channel,
		message_id: m1,
		message: None,
	});
	h.platform.push_event(Notification::ChannelUpdated(thread.clone()));
	h.platform.edit(h.channel, m1, "Check this out").unwrap();
	h.settle().await;

	assert_eq!(h.platform.writes().total(), 0);
	assert_eq!(h.only_thread(), thread);
}

#[tokio::test(flavor = "current_thread")]
async fn restart_recovers_threads_from_channel_metadata() {
	let mut h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.react(m1, h.alice).await;
	let thread = h.only_thread();
	h.platform.post(thread.id, h.bob, "hello").unwrap();
	h.settle().await;
	h.platform.reset_writes();

	h.restart().await;

	assert_eq!(h.platform.writes().total(), 0, "an unchanged world needs no repairs");
	let decoded = h.reconciler.codec().decode(&thread.name, thread.topic()).unwrap();
	let record = h.reconciler.thread_for_origin(decoded.origin).unwrap();
	assert_eq!(record.origin, OriginRef::new(h.channel, m1));
	assert_eq!(record.id(), thread.id);
	assert_eq!(record.starter, Some(h.alice));
	assert_eq!(record.intro.len(), 2);

	h.unreact(m1, h.alice).await;
	assert_eq!(h.only_thread().id, thread.id, "bob's reply keeps the thread");
}

#[tokio::test(flavor = "current_thread")]
async fn discovery_applies_changes_made_while_offline() {
	let mut h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.react(m1, h.alice).await;
	h.only_thread();

	h.platform.unreact(h.channel, m1, h.alice, TRIGGER).unwrap();
	let m2 = h.platform.post(h.channel, h.bob, "Offline idea").unwrap();
	h.platform.react(h.channel, m2, h.bob, TRIGGER).unwrap();
	h.restart().await;

	let thread = h.only_thread();
	assert_eq!(thread.name, "🧵Offline-idea");
	assert!(!h.bot_reacted(m1));
	assert!(h.bot_reacted(m2));
	assert!(h.reconciler.thread_for_origin(OriginRef::new(h.channel, m1)).is_none());
}

#[tokio::test(flavor = "current_thread")]
async fn failed_create_leaves_no_trace_and_retries_on_next_notification() {
	let h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.platform.fail_next(Op::CreateChannel, http_500());

	h.react(m1, h.alice).await;
	assert!(h.thread_channels().is_empty());
	assert!(h.reconciler.threads().is_empty());
	assert!(!h.bot_reacted(m1));
	assert_eq!(h.platform.writes().total(), 0);

	h.react(m1, h.bob).await;
	h.only_thread();
	assert!(h.bot_reacted(m1));
}

#[tokio::test(flavor = "current_thread")]
async fn failed_read_drops_the_pass_without_mutation() {
	let h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.react(m1, h.alice).await;
	let thread = h.only_thread();
	let record = h.reconciler.thread(thread.id).unwrap();
	h.platform.reset_writes();

	h.platform.fail_next(Op::ReactionUsers, http_500());
	h.platform.edit(h.channel, m1, "Check this out again").unwrap();
	h.settle().await;
	assert_eq!(h.platform.writes().total(), 0);
	assert_eq!(h.reconciler.thread(thread.id).unwrap(), record);

	h.platform.edit(h.channel, m1, "Check this out again!").unwrap();
	h.settle().await;
	assert_eq!(h.platform.writes().messages_edited, 1);
}

#[tokio::test(flavor = "current_thread")]
async fn unloaded_intro_blocks_deletion() {
	let mut h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.react(m1, h.alice).await;
	let thread = h.only_thread();

	// Catch-up fails to load the intro, then the origin channel scan fails too.
	h.platform.fail_next(Op::History, http_500());
	h.platform.fail_next(Op::History, http_500());
	h.restart().await;
	assert!(!h.reconciler.thread(thread.id).unwrap().intro.is_loaded());

	h.platform.fail_next(Op::History, http_500());
	h.platform.delete_message(h.channel, m1).unwrap();
	h.settle().await;
	assert_eq!(h.only_thread().id, thread.id, "an unknown intro may hold replies");

	h.platform.push_event(Notification::MessageDeleted {
		channel_id: h.channel,
		message_id: m1,
	});
	h.settle().await;
	assert!(h.thread_channels().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn hand_made_thread_channels_are_adopted() {
	let h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.platform.react(h.channel, m1, h.alice, TRIGGER).unwrap();
	h.platform.drain_events();
	let topic = format!("[{:x}/{:x}]", h.channel.get(), m1.get());
	let manual = h.platform.add_text_channel_with_topic(h.guild, "🧵manual", topic, Some(h.category)).unwrap();
	h.settle().await;

	let record = h.reconciler.thread_for_origin(OriginRef::new(h.channel, m1)).unwrap();
	assert_eq!(record.id(), manual);
	assert_eq!(h.thread_channels().len(), 1, "no second thread for the same origin");
	let channel = h.only_thread();
	assert!(channel.topic().starts_with(&format!("Thread started by <@{}>", h.alice)), "{}", channel.topic());
	assert!(channel.overlay.allows(OverwriteTarget::Member(h.alice), Permissions::PARTICIPATE));
	assert_eq!(h.platform.messages(manual).len(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn sniped_intro_is_not_posted() {
	let h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.platform.react(h.channel, m1, h.alice, TRIGGER).unwrap();
	h.platform.add_reaction(h.channel, m1, TRIGGER).await.unwrap();
	let topic = format!("Thread started by <@{}> for [<#{}>/{:x}].", h.alice, h.channel, m1.get());
	let manual = h.platform.add_text_channel_with_topic(h.guild, "🧵manual", topic, None).unwrap();
	h.platform.post(manual, h.bob, "first").unwrap();
	h.platform.post(manual, h.bob, "second").unwrap();
	h.platform.reset_writes();
	h.settle().await;

	assert!(h.reconciler.thread(manual).is_some());
	assert_eq!(h.platform.writes().messages_sent, 0);
	assert!(h.platform.messages(manual).iter().all(|m| m.author.id == h.bob));
}

#[tokio::test(flavor = "current_thread")]
async fn older_channel_wins_an_origin_conflict() {
	let h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.platform.react(h.channel, m1, h.alice, TRIGGER).unwrap();
	h.platform.add_reaction(h.channel, m1, TRIGGER).await.unwrap();
	let topic = format!("for [<#{}>/{:x}]", h.channel, m1.get());
	let older = h.platform.add_text_channel_with_topic(h.guild, "🧵older", topic.clone(), None).unwrap();
	let newer = h.platform.add_text_channel_with_topic(h.guild, "🧵newer", topic, None).unwrap();
	h.settle().await;

	assert_eq!(h.reconciler.thread_for_origin(OriginRef::new(h.channel, m1)).unwrap().id(), older);
	assert!(h.reconciler.thread(newer).is_none());
	assert_eq!(h.platform.writes().channels_deleted, 0, "the newer channel is left alone");
}

#[tokio::test(flavor = "current_thread")]
async fn renaming_a_thread_away_detaches_it() {
	let h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.react(m1, h.alice).await;
	let thread = h.only_thread();

	h.platform
		.update_channel(
			thread.id,
			ChannelEdit {
				name: Some("archive".into()),
				..Default::default()
			},
		)
		.unwrap();
	h.settle().await;

	assert!(h.reconciler.thread(thread.id).is_none());
	assert!(h.platform.channel(thread.id).is_some());
}

#[tokio::test(flavor = "current_thread")]
async fn every_reactor_of_a_popular_origin_is_granted() {
	let h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.react(m1, h.alice).await;

	let crowd: Vec<_> = (0..101).map(|i| h.platform.add_member(h.guild, format!("fan{i}")).unwrap()).collect();
	for &fan in &crowd {
		h.platform.react(h.channel, m1, fan, TRIGGER).unwrap();
	}
	h.platform.react(h.channel, m1, h.bob, TRIGGER).unwrap();
	h.settle().await;

	let thread = h.only_thread();
	for user in crowd.iter().chain([&h.alice, &h.bob]) {
		assert!(thread.overlay.allows(OverwriteTarget::Member(*user), Permissions::PARTICIPATE), "{user} has no grant");
	}
}

#[tokio::test(flavor = "current_thread")]
async fn overlay_wiped_during_a_pass_is_restored() {
	let h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.react(m1, h.alice).await;
	let thread = h.only_thread();

	h.platform.set_io_yields(3);
	let duplicate = Notification::ReactionAdded(ReactionEvent {
		guild_id: Some(h.guild),
		channel_id: h.channel,
		message_id: m1,
		user_id: h.alice,
		emoji: TRIGGER.into(),
	});
	let moderator = async {
		for _ in 0..5 {
			tokio::task::yield_now().await;
		}
		let wiped = h.platform.set_overlay(thread.id, AccessOverlay::new()).unwrap();
		h.reconciler.channel_updated(&wiped).await;
	};
	tokio::join!(h.dispatcher.dispatch(&duplicate), moderator);
	h.platform.set_io_yields(0);

	h.react(m1, h.bob).await;
	h.unreact(m1, h.bob).await;

	let overlay = h.platform.channel(thread.id).unwrap().overlay;
	assert!(overlay.denies(OverwriteTarget::Role(RoleId::everyone(h.guild)), Permissions::VIEW_CHANNEL));
	assert!(overlay.allows(OverwriteTarget::Member(h.alice), Permissions::PARTICIPATE));
	assert_eq!(h.reconciler.thread(thread.id).unwrap().channel.overlay, overlay);
}
