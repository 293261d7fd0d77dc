//! Periodic classification of the server's visible condition.
//!
//! The integrity monitor runs whenever the keeper does not know whether the
//! lease is live: after login onto an idle server, after an expiry, and while
//! a resume is in flight. Once it sees a live lease it hands control to the
//! renewal scheduler and stops.

use std::sync::Arc;

use leasekeep_runtime::Flow;
use tracing::{debug, info, warn};

use crate::error::{KeepError, Result};
use crate::facade::Lookup;
use crate::keeper::Keeper;
use crate::lease::{LeaseState, RemainingLease, parse_remaining};
use crate::panel::{CONTROL_PANEL_LABEL, Location};

/// What a classification pass observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integrity {
	Queued,
	/// The home page shows no actionable button.
	Transferring,
	WaitingResume,
	/// The home page offers the control panel; the server is up.
	AlreadyActive,
	/// Read from the console's lease timer.
	Lease(RemainingLease),
	/// Neither home nor console; a challenge page is assumed.
	ChallengePage,
}

impl Integrity {
	pub fn lease_state(self, margin: u32) -> LeaseState {
		match self {
			Self::Queued => LeaseState::Queued,
			Self::Transferring => LeaseState::Transferring,
			Self::WaitingResume => LeaseState::WaitingResume,
			Self::AlreadyActive => LeaseState::Active,
			Self::Lease(remaining) if remaining.minutes() <= margin => LeaseState::RenewalDue,
			Self::Lease(_) => LeaseState::Active,
			Self::ChallengePage => LeaseState::ChallengeOutstanding,
		}
	}
}

pub struct IntegrityMonitor<'a> {
	keeper: &'a Arc<Keeper>,
}

impl<'a> IntegrityMonitor<'a> {
	pub fn new(keeper: &'a Arc<Keeper>) -> Self {
		Self { keeper }
	}

	/// Classifies the page the keeper is on.
	pub async fn classify(&self) -> Result<Integrity> {
		match self.keeper.location().await? {
			Location::Home => self.classify_home().await,
			Location::Console => Ok(Integrity::Lease(self.read_scratch_lease().await?)),
			_ => Ok(Integrity::ChallengePage),
		}
	}

	/// True when someone else extended the lease past the safety margin.
	pub async fn third_party_renewed(&self) -> Result<bool> {
		let margin = self.keeper.timing().safety_margin_mins;
		Ok(match self.classify().await? {
			Integrity::AlreadyActive => true,
			Integrity::Lease(remaining) => remaining.minutes() > margin,
			_ => false,
		})
	}

	async fn classify_home(&self) -> Result<Integrity> {
		let facade = self.keeper.facade();
		let selectors = &self.keeper.layout().selectors;
		facade.refresh().await?;

		if facade.find(&selectors.queue_position).await?.is_found() {
			return Ok(Integrity::Queued);
		}
		let Lookup::Found(button) = facade.find(&selectors.primary_button).await? else {
			return Ok(Integrity::Transferring);
		};
		Ok(match facade.text(&button).await? {
			Lookup::Found(label) if label.trim() == CONTROL_PANEL_LABEL => Integrity::AlreadyActive,
			Lookup::Found(_) => Integrity::WaitingResume,
			Lookup::Stale | Lookup::Absent => Integrity::Transferring,
		})
	}

	/// Reads the lease timer in a scratch tab, leaving the current page untouched.
	async fn read_scratch_lease(&self) -> Result<RemainingLease> {
		let facade = self.keeper.facade();
		let original = facade.current_tab().await?;
		let scratch = facade.new_tab().await?;
		facade.switch_tab(&scratch).await?;

		let read: Result<RemainingLease> = async {
			facade.navigate(&self.keeper.layout().server_url()).await?;
			self.keeper.settle().await;
			let text = self.keeper.read_text(&self.keeper.layout().selectors.lease_timer, "lease timer").await?;
			Ok::<_, KeepError>(parse_remaining(&text)?)
		}
		.await;

		let closed = facade.close_tab().await;
		facade.switch_tab(&original).await?;
		closed?;
		debug!(target = "leasekeep.integrity", lease = ?read.as_ref().ok(), "lease read in scratch tab");
		read
	}

	pub(crate) async fn tick(&self) -> Flow {
		let keeper = self.keeper;
		let observed = match self.classify().await {
			Ok(observed) => observed,
			Err(err) => {
				warn!(target = "leasekeep.integrity", error = %err, "classification failed");
				keeper.notify(&format!("Integrity check failed: {err}")).await;
				return Flow::Continue;
			}
		};
		let resuming = keeper.session().resuming();
		keeper.session().set_lease(observed.lease_state(keeper.timing().safety_margin_mins));
		info!(target = "leasekeep.integrity", ?observed, resuming, "integrity check");

		match observed {
			Integrity::Queued | Integrity::Transferring | Integrity::ChallengePage if resuming => Flow::Stop,
			Integrity::Queued | Integrity::Transferring | Integrity::ChallengePage | Integrity::WaitingResume => {
				Flow::Continue
			}
			Integrity::AlreadyActive | Integrity::Lease(_) => {
				keeper.arm_renewal();
				Flow::Stop
			}
		}
	}
}
