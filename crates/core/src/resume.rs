//! Bringing an idle server back.
//!
//! A resume walks the server from "waiting for resume" through the provider's
//! challenge, the start queue and the node transfer, then hands it to the
//! renewal scheduler. Progress is shown in the single status message.

use std::sync::Arc;

use tracing::{error, info};

use crate::challenge::{ChallengeWorkflow, Origin};
use crate::channel::Presence;
use crate::error::{KeepError, Result};
use crate::facade::Lookup;
use crate::integrity::{Integrity, IntegrityMonitor};
use crate::keeper::Keeper;
use crate::lease::LeaseState;
use crate::notices;
use crate::panel::{Location, TRANSFERRING_PREFIX};

pub struct ResumeFlow<'a> {
	keeper: &'a Arc<Keeper>,
}

impl<'a> ResumeFlow<'a> {
	pub fn new(keeper: &'a Arc<Keeper>) -> Self {
		Self { keeper }
	}

	/// Runs the resume to completion. The caller must have set the session's
	/// `resuming` flag; it is cleared on every exit.
	pub async fn run(&self) {
		let keeper = self.keeper;
		match self.drive().await {
			Ok(()) => info!(target = "leasekeep.resume", "resume finished"),
			Err(err) => {
				error!(target = "leasekeep.resume", error = %err, "resume failed");
				keeper.release(&format!("Resume failed: {err}")).await;
				keeper.arm_integrity();
			}
		}
		keeper.session().end_resume();
	}

	async fn drive(&self) -> Result<()> {
		let keeper = self.keeper;
		let observed = IntegrityMonitor::new(keeper).classify().await?;
		keeper.session().set_lease(observed.lease_state(keeper.timing().safety_margin_mins));
		info!(target = "leasekeep.resume", ?observed, "resume requested");

		match observed {
			Integrity::WaitingResume => {
				keeper.disarm_integrity();
				keeper.click_on(&keeper.layout().selectors.primary_button, "resume button").await?;
				ChallengeWorkflow::new(keeper, Origin::ResumeFlow).run(notices::RESUME_PROMPT).await?;
			}
			Integrity::Queued | Integrity::Transferring => {
				keeper.disarm_integrity();
				keeper.facade().navigate(&keeper.layout().queue_url()).await?;
				keeper.settle().await;
			}
			Integrity::AlreadyActive | Integrity::Lease(_) => {
				keeper.disarm_integrity();
				keeper.arm_renewal();
				return Ok(());
			}
			Integrity::ChallengePage => {
				return Err(KeepError::ResourceUnavailable("the panel left the home page".to_string()));
			}
		}

		if keeper.location().await? == Location::Queue {
			self.wait_in_queue().await?;
		}
		self.wait_for_transfer().await?;

		keeper.arm_renewal();
		keeper.dismiss().await
	}

	async fn wait_in_queue(&self) -> Result<()> {
		let keeper = self.keeper;
		let selectors = &keeper.layout().selectors;
		keeper.session().set_lease(LeaseState::Queued);
		keeper.set_presence(Presence::idle(notices::QUEUE_ACTIVITY)).await;

		if let Lookup::Found(position) = keeper.facade().find(&selectors.queue_position).await? {
			while let Lookup::Found(text) = keeper.facade().text(&position).await? {
				keeper.show(text.trim(), None).await?;
				tokio::time::sleep(keeper.timing().poll).await;
			}
			keeper.show(notices::QUEUE_CLEARED, None).await?;
		}
		keeper.click_on(&selectors.queue_start, "queue start button").await?;
		info!(target = "leasekeep.resume", "left the queue");
		Ok(())
	}

	async fn wait_for_transfer(&self) -> Result<()> {
		let keeper = self.keeper;
		tokio::time::sleep(keeper.timing().transfer_settle).await;
		keeper.facade().refresh().await?;
		keeper.session().set_lease(LeaseState::Transferring);

		let heading = keeper.find(&keeper.layout().selectors.transfer_heading, "transfer status").await?;
		while let Lookup::Found(text) = keeper.facade().text(&heading).await? {
			keeper.show(text.trim(), None).await?;
			if !text.trim_start().starts_with(TRANSFERRING_PREFIX) {
				break;
			}
			tokio::time::sleep(keeper.timing().poll).await;
		}
		keeper.show(notices::STARTED, None).await?;
		info!(target = "leasekeep.resume", "transfer finished");
		Ok(())
	}
}
