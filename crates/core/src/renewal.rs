//! The renewal scheduler.
//!
//! Every tick re-initializes the console session and reads the lease timer.
//! With time to spare it sleeps until exactly the safety margin before
//! expiry; inside the margin it runs a challenge cycle to completion and then
//! ticks again straight away for a fresh reading.

use std::sync::Arc;
use std::time::Duration;

use leasekeep_runtime::Flow;
use tracing::{error, info, warn};

use crate::challenge::{ChallengeWorkflow, Origin};
use crate::channel::Presence;
use crate::error::{KeepError, Result};
use crate::keeper::Keeper;
use crate::lease::{LeaseState, RemainingLease, RenewalPlan, parse_remaining, plan_renewal};
use crate::notices;
use crate::panel::Location;

pub struct RenewalScheduler<'a> {
	keeper: &'a Arc<Keeper>,
}

impl<'a> RenewalScheduler<'a> {
	pub fn new(keeper: &'a Arc<Keeper>) -> Self {
		Self { keeper }
	}

	/// Opens the console, stores the timer and renew link, and reads the lease.
	pub async fn initialize(&self) -> Result<RemainingLease> {
		let keeper = self.keeper;
		let selectors = &keeper.layout().selectors;
		keeper.facade().navigate(&keeper.layout().console_url()).await?;
		keeper.settle().await;

		let timer = keeper.find(&selectors.lease_timer, "lease timer").await?;
		let renew_link = keeper.find(&selectors.renew_link, "renew link").await?;
		keeper.session().update(|flags| {
			flags.consolable = true;
			flags.timer = Some(timer.clone());
			flags.renew_link = Some(renew_link);
		});
		keeper.set_presence(Presence::online(notices::ONLINE_ACTIVITY)).await;

		let text = keeper.facade().text(&timer).await?.require("lease timer")?;
		Ok(parse_remaining(&text)?)
	}

	pub(crate) async fn tick(&self) -> Flow {
		let keeper = self.keeper;
		let remaining = match self.initialize().await {
			Ok(remaining) => remaining,
			Err(err) if err.is_element_vanished() => return self.vanished(err).await,
			Err(err) => return self.abandon(err).await,
		};
		let margin = keeper.timing().safety_margin_mins;

		match plan_renewal(remaining, margin) {
			RenewalPlan::WakeIn(wait) => {
				keeper.session().set_lease(LeaseState::Active);
				info!(target = "leasekeep.renewal", %remaining, wait_secs = wait.as_secs(), "lease healthy");
				Flow::After(wait)
			}
			RenewalPlan::ChallengeNow => {
				keeper.session().set_lease(LeaseState::RenewalDue);
				info!(target = "leasekeep.renewal", %remaining, "renewal due");
				match ChallengeWorkflow::new(keeper, Origin::ConsoleRenewal).run(notices::RENEW_PROMPT).await {
					Ok(_) => Flow::After(Duration::ZERO),
					Err(err) if err.is_element_vanished() => self.vanished(err).await,
					Err(err) => self.abandon(err).await,
				}
			}
		}
	}

	/// A page element disappeared. On the home page that means the lease ran
	/// out under us.
	async fn vanished(&self, err: KeepError) -> Flow {
		let keeper = self.keeper;
		match keeper.location().await {
			Ok(Location::Home) => {}
			_ => return self.abandon(err).await,
		}
		warn!(target = "leasekeep.renewal", error = %err, "lease expired before renewal completed");
		keeper.disarm_watchdog();
		keeper.session().update(|flags| {
			flags.consolable = false;
			flags.captchable = false;
			flags.timer = None;
			flags.renew_link = None;
			flags.lease = LeaseState::Expired;
		});
		keeper.set_presence(Presence::idle(notices::WAITING_ACTIVITY)).await;
		keeper.release(notices::EXPIRED).await;
		keeper.arm_integrity();
		Flow::Stop
	}

	/// Ends this scheduler run and falls back to periodic classification.
	async fn abandon(&self, err: KeepError) -> Flow {
		let keeper = self.keeper;
		error!(target = "leasekeep.renewal", error = %err, "renewal stopped");
		keeper.disarm_watchdog();
		keeper.session().update(|flags| {
			flags.consolable = false;
			flags.captchable = false;
		});
		keeper.release(&format!("Renewal stopped: {err}")).await;
		keeper.arm_integrity_later();
		Flow::Stop
	}
}
