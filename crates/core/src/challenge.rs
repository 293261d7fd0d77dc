//! The challenge cycle: capture, ask, submit, repeat.
//!
//! One cycle runs per renewal or resume. It captures the challenge image,
//! shows it to operators in the single status message, waits for an answer or
//! a watchdog expiry, and submits. Wrong answers and expiries produce a fresh
//! image; between attempts the cycle checks whether someone renewed the lease
//! through the website and stands down if so.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::channel::{ChallengeImage, Reply};
use crate::error::{KeepError, Result};
use crate::facade::{Key, Lookup};
use crate::integrity::IntegrityMonitor;
use crate::keeper::Keeper;
use crate::lease::LeaseState;
use crate::notices;
use crate::panel::Location;

/// Steps of a challenge cycle, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	Priming,
	AwaitingAnswer,
	Submitting,
	Solved,
	SupersededByThirdParty,
}

/// What triggered the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
	/// Renew link on the console page; the challenge opens in a modal.
	ConsoleRenewal,
	/// Resume button on the home page; the challenge is a full page.
	ResumeFlow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeAttempt {
	answer: String,
	attempt_count: u32,
	origin: Origin,
}

impl ChallengeAttempt {
	fn new(origin: Origin) -> Self {
		Self {
			answer: String::new(),
			attempt_count: 0,
			origin,
		}
	}

	/// Last submitted answer; empty until one is submitted or after an expiry.
	pub fn answer(&self) -> &str {
		&self.answer
	}

	pub fn attempt_count(&self) -> u32 {
		self.attempt_count
	}

	pub fn origin(&self) -> Origin {
		self.origin
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	Solved,
	Superseded,
}

/// Summary of a finished cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeReport {
	pub outcome: Outcome,
	pub attempts: u32,
	pub phases: Vec<Phase>,
}

enum Miss {
	Rejected,
	Expired,
}

pub struct ChallengeWorkflow<'a> {
	keeper: &'a Arc<Keeper>,
	attempt: ChallengeAttempt,
	phases: Vec<Phase>,
}

impl<'a> ChallengeWorkflow<'a> {
	pub fn new(keeper: &'a Arc<Keeper>, origin: Origin) -> Self {
		Self {
			keeper,
			attempt: ChallengeAttempt::new(origin),
			phases: Vec::new(),
		}
	}

	pub fn attempt(&self) -> &ChallengeAttempt {
		&self.attempt
	}

	/// Runs one cycle to completion, showing `prompt` with the first image.
	///
	/// Fails with [`KeepError::ChallengeBusy`] if another cycle holds the gate.
	pub async fn run(mut self, prompt: &str) -> Result<ChallengeReport> {
		let keeper = self.keeper;
		let _gate = keeper.try_challenge_gate()?;
		keeper.session().set_consolable(false);
		info!(target = "leasekeep.challenge", origin = ?self.attempt.origin, "challenge cycle started");

		let result = self.cycle(prompt).await;

		keeper.disarm_watchdog();
		keeper.session().set_captchable(false);
		match &result {
			Ok(report) => info!(
				target = "leasekeep.challenge",
				outcome = ?report.outcome,
				attempts = report.attempts,
				"challenge cycle finished"
			),
			Err(err) => warn!(
				target = "leasekeep.challenge",
				error = %err,
				attempts = self.attempt.attempt_count,
				"challenge cycle failed"
			),
		}
		result
	}

	fn enter(&mut self, phase: Phase) {
		debug!(target = "leasekeep.challenge", ?phase, attempt = self.attempt.attempt_count, "phase");
		self.phases.push(phase);
	}

	fn report(&mut self, outcome: Outcome) -> ChallengeReport {
		ChallengeReport {
			outcome,
			attempts: self.attempt.attempt_count,
			phases: std::mem::take(&mut self.phases),
		}
	}

	async fn cycle(&mut self, prompt: &str) -> Result<ChallengeReport> {
		let keeper = self.keeper;
		if keeper.location().await? != Location::Resume {
			self.click_renew_link().await?;
		}
		self.attempt.answer.clear();

		loop {
			self.enter(Phase::Priming);
			self.attempt.attempt_count += 1;
			let image = self.capture().await?;
			let text = if self.attempt.answer.is_empty() { prompt } else { notices::RETRY_PROMPT };
			keeper.show(text, Some(&image)).await?;
			keeper.arm_watchdog();

			self.enter(Phase::AwaitingAnswer);
			keeper.replies().clear().await;
			keeper.session().update(|flags| {
				flags.captchable = true;
				flags.lease = LeaseState::ChallengeOutstanding;
			});
			let reply = keeper.replies().next().await;
			keeper.session().set_captchable(false);
			keeper.disarm_watchdog();

			let miss = match reply {
				Some(Reply::Answer(answer)) => {
					self.attempt.answer = answer;
					self.enter(Phase::Submitting);
					if self.submit().await? {
						break;
					}
					info!(target = "leasekeep.challenge", attempt = self.attempt.attempt_count, "answer rejected");
					Miss::Rejected
				}
				Some(Reply::Expired) => {
					self.attempt.answer.clear();
					self.reraise().await?;
					info!(target = "leasekeep.challenge", attempt = self.attempt.attempt_count, "challenge expired");
					Miss::Expired
				}
				None => return Err(KeepError::Channel("reply mailbox closed".to_string())),
			};

			if IntegrityMonitor::new(keeper).third_party_renewed().await? {
				self.enter(Phase::SupersededByThirdParty);
				info!(target = "leasekeep.challenge", "lease renewed elsewhere; standing down");
				keeper.retire(notices::SUPERSEDED).await?;
				return Ok(self.report(Outcome::Superseded));
			}

			let attempts = self.attempt.attempt_count;
			if attempts >= keeper.timing().max_attempts {
				return Err(match miss {
					Miss::Rejected => KeepError::ChallengeRejected { attempts },
					Miss::Expired => KeepError::ChallengeExpired { attempts },
				});
			}
		}

		self.enter(Phase::Solved);
		keeper.show(notices::SOLVED, None).await?;
		if self.attempt.origin == Origin::ConsoleRenewal && keeper.location().await? == Location::Console {
			keeper.session().set_consolable(true);
			if let Err(err) = self.announce_renewal().await {
				warn!(target = "leasekeep.challenge", error = %err, "renewal announcement failed");
			}
		}
		keeper.dismiss().await?;
		Ok(self.report(Outcome::Solved))
	}

	/// Opens the renewal modal, looking the link up again if the stored one went stale.
	async fn click_renew_link(&self) -> Result<()> {
		let keeper = self.keeper;
		if let Some(link) = keeper.session().renew_link() {
			match keeper.facade().click(&link).await? {
				Lookup::Found(()) => return Ok(()),
				Lookup::Stale | Lookup::Absent => {
					debug!(target = "leasekeep.challenge", "stored renew link is outdated");
				}
			}
		}
		let link = keeper.find(&keeper.layout().selectors.renew_link, "renew link").await?;
		keeper.facade().click(&link).await?.require("renew link")?;
		keeper.session().set_renew_link(link);
		Ok(())
	}

	async fn capture(&self) -> Result<ChallengeImage> {
		let keeper = self.keeper;
		keeper.settle().await;
		let selectors = &keeper.layout().selectors;
		let selector = match keeper.location().await? {
			Location::Resume => &selectors.resume_challenge_image,
			_ => &selectors.modal_challenge_image,
		};
		let image = keeper.find(selector, "challenge image").await?;
		let png = keeper.facade().screenshot(&image).await?.require("challenge image")?;
		Ok(ChallengeImage::png(png))
	}

	/// Types and submits the current answer. Returns whether it was accepted.
	async fn submit(&self) -> Result<bool> {
		let keeper = self.keeper;
		let selectors = &keeper.layout().selectors;
		let input = keeper.find(&selectors.challenge_input, "challenge input").await?;
		keeper.type_into(&input, &self.attempt.answer, "challenge input").await?;
		keeper.click_on(&selectors.challenge_submit, "challenge submit").await?;
		keeper.settle().await;

		if !self.retry_image_shown().await? {
			return Ok(true);
		}
		if let Lookup::Found(banner) = keeper.facade().find(&selectors.challenge_error_banner).await? {
			keeper.facade().click(&banner).await?;
		}
		Ok(false)
	}

	async fn retry_image_shown(&self) -> Result<bool> {
		let keeper = self.keeper;
		let prefix = keeper.layout().retry_image_prefix();
		for image in keeper.facade().find_all(&keeper.layout().selectors.images).await? {
			if let Lookup::Found(Some(src)) = keeper.facade().attribute(&image, "src").await? {
				if src.starts_with(&prefix) {
					return Ok(true);
				}
			}
		}
		Ok(false)
	}

	/// Brings up a fresh challenge after the previous one expired.
	async fn reraise(&self) -> Result<()> {
		let keeper = self.keeper;
		if keeper.location().await? == Location::Resume {
			return keeper.facade().refresh().await;
		}
		keeper.click_on(&keeper.layout().selectors.modal_close, "modal close").await?;
		keeper.settle().await;
		self.click_renew_link().await
	}

	async fn announce_renewal(&self) -> Result<()> {
		let keeper = self.keeper;
		let input = keeper.find(&keeper.layout().selectors.console_input, "console input").await?;
		keeper.type_into(&input, notices::RENEWED_ANNOUNCEMENT, "console input").await?;
		keeper.facade().press(&input, Key::Enter).await?.require("console input")?;
		Ok(())
	}
}
