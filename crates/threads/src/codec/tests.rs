use proptest::prelude::*;
use rstest::rstest;

use super::*;

fn codec() -> ThreadCodec {
	ThreadCodec::new(&ThreadConfig::default())
}

fn origin(channel: u64, message: u64) -> OriginRef {
	OriginRef::new(ChannelId(channel), MessageId(message))
}

#[rstest]
#[case("Check this out", "Check-this-out")]
#[case("hello, world! how are you doing today?", "hello-world-how-are…")]
#[case("Supercalifragilisticexpialidocious", "Supercalifragilistic…")]
#[case("abcdefghij klmnopqrstuvwxyz", "abcdefghij…")]
#[case("abcdefghi klmnopqrstuvwxyz", "abcdefghi-klmnopqrst…")]
#[case("see https://example.com/a_b?x=1 now", "see-now")]
#[case("a-b_c d", "a-b-c-d")]
#[case("café déjà vu", "café-déjà-vu")]
#[case("🎉 party time 🎉", "🎉-party-time-🎉")]
#[case("Hello👩\u{200d}💻world", "Hello👩\u{200d}💻world")]
#[case("!!!", "thread")]
#[case("", "thread")]
fn slug_from_text(#[case] text: &str, #[case] expected: &str) {
	assert_eq!(codec().slug(text), expected);
}

#[test]
fn slug_budget_is_configurable() {
	let codec = ThreadCodec::new(&ThreadConfig {
		max_name_len: 8,
		..ThreadConfig::default()
	});
	assert_eq!(codec.slug("one two three"), "one-two…");
}

#[test]
fn colliding_names_get_numbered() {
	let codec = codec();
	let mut existing = HashSet::new();
	assert_eq!(codec.unique_name("Check this out", &existing), "🧵Check-this-out");

	existing.insert("🧵Check-this-out".to_string());
	assert_eq!(codec.unique_name("Check this out", &existing), "🧵Check-this-out-2");

	existing.insert("🧵Check-this-out-2".to_string());
	assert_eq!(codec.unique_name("Check this out", &existing), "🧵Check-this-out-3");
}

#[test]
fn topic_layout() {
	let codec = codec();
	assert_eq!(codec.topic(origin(1234, 1234), UserId(42), false), "Thread started by <@42> for [<#1234>/4d2].");
	assert_eq!(codec.topic(origin(1234, 255), UserId(42), true), "Thread started by <@42> for [<#1234>/ff]*.");
}

#[test]
fn encode_combines_name_and_topic() {
	let encoded = codec().encode(origin(5, 6), "Check this out", UserId(7), true, &HashSet::new());
	assert_eq!(encoded.name, "🧵Check-this-out");
	assert_eq!(encoded.topic, "Thread started by <@7> for [<#5>/6]*.");
}

#[rstest]
#[case("Thread started by <@7> for [<#5>/a].", origin(5, 10), false, Some(UserId(7)))]
#[case("Thread started by <@7> for [<#5>/a]*.", origin(5, 10), true, Some(UserId(7)))]
#[case("Thread for [5/A]. \n", origin(5, 10), false, None)]
#[case("Thread for [id=ff/1b]", origin(255, 27), false, None)]
#[case("Thread started by <@!9> for [<#5>/AbC]...  ", origin(5, 0xabc), false, Some(UserId(9)))]
fn decodes_topic_variants(#[case] topic: &str, #[case] expected: OriginRef, #[case] first_contact: bool, #[case] starter: Option<UserId>) {
	let decoded = codec().decode("🧵anything", topic).expect("topic should decode");
	assert_eq!(decoded, DecodedThread { origin: expected, first_contact, starter });
}

#[rstest]
#[case("general", "Thread started by <@7> for [<#5>/a].")]
#[case("🧵thread", "")]
#[case("🧵thread", "just a topic")]
#[case("🧵thread", "Thread for [<#5>/xyz].")]
#[case("🧵thread", "Thread for [<#5>/ffffffffffffffffff].")]
fn rejects_foreign_channels(#[case] name: &str, #[case] topic: &str) {
	assert_eq!(codec().decode(name, topic), None);
}

proptest! {
	#[test]
	fn encoded_threads_decode_to_their_origin(channel in any::<u64>(), message in any::<u64>(), starter in any::<u64>(), first_contact in any::<bool>(), text in ".{0,60}") {
		let codec = codec();
		let origin = origin(channel, message);
		let encoded = codec.encode(origin, &text, UserId(starter), first_contact, &HashSet::new());
		let decoded = codec.decode(&encoded.name, &encoded.topic);
		prop_assert_eq!(decoded, Some(DecodedThread { origin, first_contact, starter: Some(UserId(starter)) }));
	}

	#[test]
	fn slugs_stay_within_budget(text in "\\PC{0,80}", budget in 1usize..40) {
		let codec = ThreadCodec::new(&ThreadConfig { max_name_len: budget, ..ThreadConfig::default() });
		let slug = codec.slug(&text);
		prop_assert!(!slug.is_empty());
		prop_assert!(!slug.chars().any(char::is_whitespace));
		prop_assert!(slug == FALLBACK_SLUG || slug.chars().count() <= budget + 1);
	}
}
