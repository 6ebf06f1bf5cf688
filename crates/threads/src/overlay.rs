use skein_platform::{AccessOverlay, GuildId, OverwriteTarget, Permissions, RoleId, UserId};

/// Computes the access overlay of a thread channel.
///
/// Starts from the origin channel's overlay, clears every member-specific
/// visibility grant, hides the channel from `@everyone`, then lets each
/// triggering actor and the bot participate. `first_contact` is the origin
/// author while they are still auto-granted read-only visibility.
pub fn thread_overlay(origin: &AccessOverlay, guild: GuildId, me: UserId, actors: &[UserId], first_contact: Option<UserId>) -> AccessOverlay {
	let mut overlay = origin.clone();
	overlay.revoke_member_grants(Permissions::VIEW_CHANNEL);
	overlay.deny(OverwriteTarget::Role(RoleId::everyone(guild)), Permissions::VIEW_CHANNEL);
	if let Some(author) = first_contact {
		overlay.allow(OverwriteTarget::Member(author), Permissions::OBSERVE);
	}
	for user in actors.iter().copied().chain([me]) {
		overlay.allow(OverwriteTarget::Member(user), Permissions::PARTICIPATE);
	}
	overlay
}
