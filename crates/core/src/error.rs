//! Error types for the keeper.

use thiserror::Error;

use crate::lease::TimerParseError;

/// Errors surfaced by keeper components.
///
/// Element lookups that miss are reported as [`KeepError::ElementNotFound`] or
/// [`KeepError::StaleElementReference`]; callers reinterpret those as page
/// transitions (an expired lease, a re-rendered modal) before surfacing them.
#[derive(Debug, Error)]
pub enum KeepError {
	#[error("element not found: {0}")]
	ElementNotFound(&'static str),

	#[error("stale element reference: {0}")]
	StaleElementReference(&'static str),

	#[error("challenge answer rejected after {attempts} attempts")]
	ChallengeRejected { attempts: u32 },

	#[error("challenge expired after {attempts} attempts without an accepted answer")]
	ChallengeExpired { attempts: u32 },

	#[error("resource unavailable: {0}")]
	ResourceUnavailable(String),

	#[error("a challenge cycle is already running")]
	ChallengeBusy,

	#[error("unreadable lease timer: {0}")]
	Timer(#[from] TimerParseError),

	#[error("automation failed: {0}")]
	Automation(#[source] Box<dyn std::error::Error + Send + Sync>),

	#[error("operator channel failed: {0}")]
	Channel(String),
}

impl KeepError {
	pub fn automation(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
		Self::Automation(err.into())
	}

	/// True when a page element disappeared or was re-rendered underneath us.
	pub fn is_element_vanished(&self) -> bool {
		matches!(self, Self::ElementNotFound(_) | Self::StaleElementReference(_))
	}
}

pub type Result<T> = std::result::Result<T, KeepError>;
