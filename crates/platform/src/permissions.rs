//! Permission bits and per-channel access overlays.

use std::collections::BTreeMap;

use bitflags::bitflags;

use crate::{RoleId, UserId};

bitflags! {
	/// Channel permission bits, numbered as on the wire.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct Permissions: u64 {
		const MANAGE_CHANNELS = 1 << 4;
		const ADD_REACTIONS = 1 << 6;
		const VIEW_CHANNEL = 1 << 10;
		const SEND_MESSAGES = 1 << 11;
		const MANAGE_MESSAGES = 1 << 13;
		const READ_MESSAGE_HISTORY = 1 << 16;
		const MANAGE_ROLES = 1 << 28;
	}
}

impl Permissions {
	/// Everything a thread participant needs: see, read back and post.
	pub const PARTICIPATE: Self = Self::VIEW_CHANNEL.union(Self::READ_MESSAGE_HISTORY).union(Self::SEND_MESSAGES);

	/// Read-only visibility including history.
	pub const OBSERVE: Self = Self::VIEW_CHANNEL.union(Self::READ_MESSAGE_HISTORY);
}

/// Subject of a permission overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OverwriteTarget {
	Role(RoleId),
	Member(UserId),
}

/// Explicit allow and deny bits for one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Overwrite {
	pub allow: Permissions,
	pub deny: Permissions,
}

impl Overwrite {
	pub const fn is_empty(&self) -> bool {
		self.allow.is_empty() && self.deny.is_empty()
	}
}

/// Per-channel permission overwrites, ordered by target so that two overlays
/// with the same entries compare equal.
///
/// Entries whose allow and deny sets are both empty are dropped, mirroring
/// the platform which does not store no-op overwrites.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccessOverlay {
	entries: BTreeMap<OverwriteTarget, Overwrite>,
}

impl AccessOverlay {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, target: OverwriteTarget) -> Option<Overwrite> {
		self.entries.get(&target).copied()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (OverwriteTarget, Overwrite)> + '_ {
		self.entries.iter().map(|(target, overwrite)| (*target, *overwrite))
	}

	/// Replaces the overwrite for `target`.
	pub fn set(&mut self, target: OverwriteTarget, overwrite: Overwrite) {
		if overwrite.is_empty() {
			self.entries.remove(&target);
		} else {
			self.entries.insert(target, overwrite);
		}
	}

	/// Grants `perms` to `target`, lifting any matching deny.
	pub fn allow(&mut self, target: OverwriteTarget, perms: Permissions) {
		let mut overwrite = self.get(target).unwrap_or_default();
		overwrite.allow |= perms;
		overwrite.deny -= perms;
		self.set(target, overwrite);
	}

	/// Denies `perms` to `target`, lifting any matching grant.
	pub fn deny(&mut self, target: OverwriteTarget, perms: Permissions) {
		let mut overwrite = self.get(target).unwrap_or_default();
		overwrite.deny |= perms;
		overwrite.allow -= perms;
		self.set(target, overwrite);
	}

	/// Removes `perms` from the allow set of every member-specific overwrite.
	pub fn revoke_member_grants(&mut self, perms: Permissions) {
		let members: Vec<_> = self.entries.keys().copied().filter(|target| matches!(target, OverwriteTarget::Member(_))).collect();
		for target in members {
			if let Some(mut overwrite) = self.get(target) {
				overwrite.allow -= perms;
				self.set(target, overwrite);
			}
		}
	}

	/// Returns `true` if `target` is explicitly allowed all of `perms`.
	pub fn allows(&self, target: OverwriteTarget, perms: Permissions) -> bool {
		self.get(target).is_some_and(|overwrite| overwrite.allow.contains(perms))
	}

	/// Returns `true` if `target` is explicitly denied all of `perms`.
	pub fn denies(&self, target: OverwriteTarget, perms: Permissions) -> bool {
		self.get(target).is_some_and(|overwrite| overwrite.deny.contains(perms))
	}
}

impl FromIterator<(OverwriteTarget, Overwrite)> for AccessOverlay {
	fn from_iter<I: IntoIterator<Item = (OverwriteTarget, Overwrite)>>(iter: I) -> Self {
		let mut overlay = Self::new();
		for (target, overwrite) in iter {
			overlay.set(target, overwrite);
		}
		overlay
	}
}
