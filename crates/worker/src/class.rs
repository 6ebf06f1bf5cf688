/// Execution classes used to label spawned tasks in traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Handling of a single change notification.
	Notification,
	/// Guild discovery sweeps and the per-thread catch-up they fan out.
	Discovery,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Notification => "notification",
			Self::Discovery => "discovery",
		}
	}
}
