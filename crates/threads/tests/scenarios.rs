#![allow(unused_crate_dependencies)]

mod support;

use pretty_assertions::assert_eq;
use skein_platform::{OverwriteTarget, Permissions, RoleId};
use skein_threads::OriginRef;
use support::{Harness, TRIGGER};

#[tokio::test(flavor = "current_thread")]
async fn trigger_reaction_creates_a_private_thread() {
	let h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.react(m1, h.alice).await;

	let thread = h.only_thread();
	assert_eq!(thread.name, "🧵Check-this-out");
	assert_eq!(thread.parent_id, Some(h.category));

	let decoded = h.reconciler.codec().decode(&thread.name, thread.topic()).unwrap();
	assert_eq!(decoded.origin, OriginRef::new(h.channel, m1));
	assert_eq!(decoded.starter, Some(h.alice));
	assert!(!decoded.first_contact, "the author reacted themselves");

	let overlay = &thread.overlay;
	assert!(overlay.denies(OverwriteTarget::Role(RoleId::everyone(h.guild)), Permissions::VIEW_CHANNEL));
	assert!(overlay.allows(OverwriteTarget::Member(h.alice), Permissions::PARTICIPATE));
	assert!(overlay.allows(OverwriteTarget::Member(h.me), Permissions::PARTICIPATE));
	assert!(overlay.get(OverwriteTarget::Member(h.bob)).is_none());

	let posted = h.platform.messages(thread.id);
	assert_eq!(posted.len(), 1);
	assert_eq!(posted[0].author.id, h.me);
	let description = posted[0].embeds[0].description.clone().unwrap();
	assert!(description.starts_with("Check this out\n"), "{description}");
	assert!(description.contains(&format!("[original message](https://discord.com/channels/{}/{}/{})", h.guild, h.channel, m1)), "{description}");
	assert_eq!(posted[0].embeds[0].author.as_ref().unwrap().name, "alice");

	assert!(h.bot_reacted(m1));
	let record = h.reconciler.thread_for_origin(OriginRef::new(h.channel, m1)).unwrap();
	assert_eq!(record.id(), thread.id);
	assert_eq!(record.intro.len(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn origin_edit_updates_the_intro_in_place() {
	let h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.react(m1, h.alice).await;
	let before = h.only_thread();
	let intro = h.platform.messages(before.id)[0].id;
	h.platform.reset_writes();

	h.platform.edit(h.channel, m1, "Check this out now").unwrap();
	h.settle().await;

	let after = h.only_thread();
	assert_eq!(after.id, before.id);
	assert_eq!(after.name, before.name);
	assert_eq!(after.overlay, before.overlay);

	let posted = h.platform.messages(after.id);
	assert_eq!(posted.len(), 1);
	assert_eq!(posted[0].id, intro);
	assert!(posted[0].embeds[0].description.as_deref().unwrap().starts_with("Check this out now\n"));

	let writes = h.platform.writes();
	assert_eq!(writes.messages_edited, 1);
	assert_eq!(writes.total(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn deleting_an_unanswered_origin_deletes_the_thread() {
	let h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.react(m1, h.alice).await;
	let thread = h.only_thread();

	h.platform.delete_message(h.channel, m1).unwrap();
	h.settle().await;

	assert!(h.thread_channels().is_empty());
	assert!(h.reconciler.thread(thread.id).is_none());
	assert!(h.reconciler.thread_for_origin(OriginRef::new(h.channel, m1)).is_none());
	assert_eq!(h.platform.writes().channels_deleted, 1);
}

#[tokio::test(flavor = "current_thread")]
async fn last_unreact_deletes_thread_and_withdraws_reaction() {
	let h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.react(m1, h.alice).await;
	assert!(h.bot_reacted(m1));

	h.unreact(m1, h.alice).await;

	assert!(h.thread_channels().is_empty());
	assert!(!h.bot_reacted(m1));
	assert!(h.platform.message(h.channel, m1).unwrap().reaction(TRIGGER).is_none());
	assert!(h.reconciler.threads().is_empty());

	h.react(m1, h.bob).await;
	assert_eq!(h.only_thread().name, "🧵Check-this-out", "a withdrawn thread can be started again");
}

#[tokio::test(flavor = "current_thread")]
async fn foreign_content_keeps_the_thread_after_origin_deletion() {
	let h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.react(m1, h.alice).await;
	let thread = h.only_thread();
	h.platform.post(thread.id, h.bob, "my two cents").unwrap();
	h.settle().await;

	h.platform.delete_message(h.channel, m1).unwrap();
	h.settle().await;

	let kept = h.only_thread();
	assert_eq!(kept.id, thread.id);
	let posted = h.platform.messages(thread.id);
	assert_eq!(posted.len(), 2);
	assert_eq!(posted[0].content, format!("🧵 original message in <#{}> was **deleted**", h.channel));
	assert!(posted[0].embeds.is_empty());
	assert!(h.reconciler.thread(thread.id).is_some());
}

#[tokio::test(flavor = "current_thread")]
async fn foreign_content_keeps_the_thread_after_last_unreact() {
	let h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.react(m1, h.alice).await;
	let thread = h.only_thread();
	h.platform.post(thread.id, h.alice, "follow-up").unwrap();
	h.settle().await;

	h.unreact(m1, h.alice).await;

	let kept = h.only_thread();
	assert!(kept.overlay.get(OverwriteTarget::Member(h.alice)).is_none(), "access follows the reaction");
	assert!(kept.overlay.allows(OverwriteTarget::Member(h.me), Permissions::PARTICIPATE));
	assert!(h.bot_reacted(m1));
}

#[tokio::test(flavor = "current_thread")]
async fn first_contact_lets_the_author_watch_until_they_react() {
	let h = Harness::new();
	let m1 = h.post(h.bob, "Look at my cat").await;
	h.react(m1, h.alice).await;

	let thread = h.only_thread();
	assert!(thread.topic().ends_with("]*."), "{}", thread.topic());
	assert!(thread.overlay.allows(OverwriteTarget::Member(h.bob), Permissions::OBSERVE));
	assert!(!thread.overlay.allows(OverwriteTarget::Member(h.bob), Permissions::SEND_MESSAGES));

	h.react(m1, h.bob).await;
	let thread = h.only_thread();
	assert!(thread.topic().ends_with("]."), "{}", thread.topic());
	assert!(thread.overlay.allows(OverwriteTarget::Member(h.bob), Permissions::PARTICIPATE));
	assert!(!h.reconciler.thread(thread.id).unwrap().first_contact);

	h.unreact(m1, h.bob).await;
	let thread = h.only_thread();
	assert!(thread.overlay.get(OverwriteTarget::Member(h.bob)).is_none(), "first contact never comes back");
	assert!(thread.topic().ends_with("]."));
}

#[tokio::test(flavor = "current_thread")]
async fn origins_by_the_bot_never_get_threads() {
	let h = Harness::new();
	let m1 = h.post(h.me, "announcement").await;
	h.react(m1, h.alice).await;

	assert!(h.thread_channels().is_empty());
	assert_eq!(h.platform.writes().total(), 0);
}

#[tokio::test(flavor = "current_thread")]
async fn thread_removed_by_a_moderator_is_not_resurrected() {
	let h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.react(m1, h.alice).await;
	let thread = h.only_thread();

	h.platform.remove_channel(thread.id).unwrap();
	h.settle().await;
	assert!(h.reconciler.threads().is_empty());

	h.react(m1, h.bob).await;
	assert!(h.thread_channels().is_empty());
	assert_eq!(h.platform.writes().channels_created, 1);
}

#[tokio::test(flavor = "current_thread")]
async fn deleting_the_origin_channel_cleans_up_its_threads() {
	let h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.react(m1, h.alice).await;
	h.only_thread();

	h.platform.remove_channel(h.channel).unwrap();
	h.settle().await;

	assert!(h.thread_channels().is_empty());
	assert!(h.reconciler.threads().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn bulk_deletion_reaches_the_origin_pass() {
	let h = Harness::new();
	let noise = h.post(h.bob, "noise").await;
	let m1 = h.post(h.alice, "Check this out").await;
	h.react(m1, h.alice).await;
	h.only_thread();

	h.platform.bulk_delete(h.channel, &[noise, m1]).unwrap();
	h.settle().await;

	assert!(h.thread_channels().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn thread_names_stay_unique_within_the_guild() {
	let h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	let m2 = h.post(h.bob, "Check this out").await;
	h.react(m1, h.alice).await;
	h.react(m2, h.bob).await;

	let mut names: Vec<_> = h.thread_channels().into_iter().map(|c| c.name).collect();
	names.sort();
	assert_eq!(names, vec!["🧵Check-this-out", "🧵Check-this-out-2"]);
}

#[tokio::test(flavor = "current_thread")]
async fn leaving_a_guild_forgets_its_threads() {
	let h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.react(m1, h.alice).await;
	assert_eq!(h.reconciler.threads().len(), 1);

	h.platform.remove_guild(h.guild).unwrap();
	h.settle().await;

	assert!(h.reconciler.threads().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn removing_the_last_reply_of_an_unreacted_thread_deletes_it() {
	let h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.react(m1, h.alice).await;
	let thread = h.only_thread();
	let reply = h.platform.post(thread.id, h.alice, "follow-up").unwrap();
	h.settle().await;
	h.unreact(m1, h.alice).await;
	assert_eq!(h.only_thread().id, thread.id);

	h.platform.delete_message(thread.id, reply).unwrap();
	h.settle().await;

	assert!(h.thread_channels().is_empty());
	assert!(h.reconciler.threads().is_empty());
	assert!(!h.bot_reacted(m1));
}

#[tokio::test(flavor = "current_thread")]
async fn removing_the_last_reply_after_origin_deletion_deletes_the_thread() {
	let h = Harness::new();
	let m1 = h.post(h.alice, "Check this out").await;
	h.react(m1, h.alice).await;
	let thread = h.only_thread();
	let reply = h.platform.post(thread.id, h.bob, "my two cents").unwrap();
	h.settle().await;
	h.platform.delete_message(h.channel, m1).unwrap();
	h.settle().await;
	assert_eq!(h.only_thread().id, thread.id);

	h.platform.delete_message(thread.id, reply).unwrap();
	h.settle().await;

	assert!(h.thread_channels().is_empty());
	assert!(h.reconciler.thread(thread.id).is_none());
	assert!(h.reconciler.thread_for_origin(OriginRef::new(h.channel, m1)).is_none());
}
