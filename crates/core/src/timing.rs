//! Timer periods and pauses.

use std::time::Duration;

/// Periods of the three timers and the pauses between UI steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
	/// How often the integrity monitor re-classifies the server.
	pub integrity_period: Duration,
	/// Challenge lifetime minus a safety margin.
	pub watchdog_period: Duration,
	/// Minutes before expiry at which a renewal challenge is raised.
	pub safety_margin_mins: u32,
	/// How long transient status messages stay up before deletion.
	pub grace: Duration,
	/// Poll interval while watching the queue position and transfer heading.
	pub poll: Duration,
	/// Pause after a click or navigation before reading the page.
	pub settle: Duration,
	/// Pause before reading the transfer heading after leaving the queue.
	pub transfer_settle: Duration,
	/// Pause between typed characters. Zero sends text in one command.
	pub keystroke_delay: Duration,
	/// Challenge attempts per cycle before giving up.
	pub max_attempts: u32,
}

impl Default for Timing {
	fn default() -> Self {
		Self {
			integrity_period: Duration::from_secs(10 * 60),
			watchdog_period: Duration::from_secs(55),
			safety_margin_mins: 11,
			grace: Duration::from_secs(5),
			poll: Duration::from_secs(5),
			settle: Duration::from_millis(500),
			transfer_settle: Duration::from_secs(2),
			keystroke_delay: Duration::ZERO,
			max_attempts: 20,
		}
	}
}
