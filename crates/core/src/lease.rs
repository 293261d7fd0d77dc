//! Lease timer parsing and renewal planning.

use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

static QUANTITY: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(\d+)\s*([A-Za-z]+)").expect("lease quantity regex is valid"));

/// Last observed condition of the lease, kept for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseState {
	#[default]
	Unknown,
	Queued,
	Transferring,
	WaitingResume,
	Active,
	RenewalDue,
	ChallengeOutstanding,
	Expired,
}

impl fmt::Display for LeaseState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Unknown => "unknown",
			Self::Queued => "queued",
			Self::Transferring => "transferring",
			Self::WaitingResume => "waiting for resume",
			Self::Active => "active",
			Self::RenewalDue => "renewal due",
			Self::ChallengeOutstanding => "challenge outstanding",
			Self::Expired => "expired",
		})
	}
}

/// Whole minutes left on the lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RemainingLease(u32);

impl RemainingLease {
	pub fn from_minutes(minutes: u32) -> Self {
		Self(minutes)
	}

	pub fn minutes(self) -> u32 {
		self.0
	}
}

impl fmt::Display for RemainingLease {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} min", self.0)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerParseError {
	#[error("no remaining time in {0:?}")]
	Missing(String),
	#[error("no known time unit in {0:?}")]
	Unit(String),
}

fn unit_minutes(unit: &str) -> Option<u32> {
	match unit.to_ascii_lowercase().as_str() {
		"m" | "min" | "mins" | "minute" | "minutes" => Some(1),
		"h" | "hr" | "hrs" | "hour" | "hours" => Some(60),
		"s" | "sec" | "secs" | "second" | "seconds" => Some(0),
		_ => None,
	}
}

/// Reads the remaining lease out of the panel's timer text.
///
/// Sums every `<N> <unit>` pair, so `"Expires in 1 hour 20 min."` is 80
/// minutes. Seconds count as zero.
pub fn parse_remaining(text: &str) -> Result<RemainingLease, TimerParseError> {
	let mut total: Option<u32> = None;
	for capture in QUANTITY.captures_iter(text) {
		let Some(per_unit) = unit_minutes(&capture[2]) else {
			continue;
		};
		let count = capture[1].parse::<u32>().unwrap_or(u32::MAX);
		total = Some(total.unwrap_or(0).saturating_add(count.saturating_mul(per_unit)));
	}
	match total {
		Some(minutes) => Ok(RemainingLease(minutes)),
		None if text.chars().any(|c| c.is_ascii_digit()) => Err(TimerParseError::Unit(text.to_string())),
		None => Err(TimerParseError::Missing(text.to_string())),
	}
}

/// What the renewal scheduler should do with a fresh lease reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalPlan {
	ChallengeNow,
	WakeIn(Duration),
}

/// Plans the next renewal step, `margin` minutes ahead of expiry.
pub fn plan_renewal(remaining: RemainingLease, margin: u32) -> RenewalPlan {
	if remaining.0 <= margin {
		RenewalPlan::ChallengeNow
	} else {
		RenewalPlan::WakeIn(Duration::from_secs(u64::from(remaining.0 - margin) * 60))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_panel_timer_text() {
		assert_eq!(parse_remaining("Expires in 45 min.").unwrap().minutes(), 45);
		assert_eq!(parse_remaining("Expires in 1 hour 20 minutes").unwrap().minutes(), 80);
		assert_eq!(parse_remaining("2h").unwrap().minutes(), 120);
		assert_eq!(parse_remaining("Expires in 40 s.").unwrap().minutes(), 0);
	}

	#[test]
	fn skips_numbers_without_units() {
		assert_eq!(parse_remaining("Server 13479479 expires in 12 min").unwrap().minutes(), 12);
	}

	#[test]
	fn rejects_text_without_a_duration() {
		assert_eq!(parse_remaining("Renew now"), Err(TimerParseError::Missing("Renew now".to_string())));
		assert_eq!(parse_remaining("in 7 fortnights"), Err(TimerParseError::Unit("in 7 fortnights".to_string())));
	}

	#[test]
	fn challenge_is_due_inside_the_margin() {
		assert_eq!(plan_renewal(RemainingLease(8), 11), RenewalPlan::ChallengeNow);
		assert_eq!(plan_renewal(RemainingLease(11), 11), RenewalPlan::ChallengeNow);
		assert_eq!(plan_renewal(RemainingLease(0), 11), RenewalPlan::ChallengeNow);
	}

	#[test]
	fn wakes_exactly_margin_before_expiry() {
		for minutes in 12..=240 {
			let plan = plan_renewal(RemainingLease(minutes), 11);
			assert_eq!(plan, RenewalPlan::WakeIn(Duration::from_secs(u64::from(minutes - 11) * 60)));
		}
	}
}
