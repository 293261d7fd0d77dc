//! The keeper: shared state plus the three timers.
//!
//! A [`Keeper`] owns the automation facade, the operator channel, the session
//! flags and one [`Ticker`] per timer. Components borrow it; timers hold only a
//! weak reference, so dropping the last `Arc<Keeper>` winds everything down.

use std::pin::Pin;
use std::sync::{Arc, Weak};

use leasekeep_protocol::Selector;
use leasekeep_runtime::{Flow, Ticker};
use tokio::sync::{Mutex, MutexGuard, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::channel::{ChallengeImage, MessageRef, OperatorChannel, Presence, ReplyMailbox};
use crate::error::{KeepError, Result};
use crate::facade::{ElementRef, RemoteResource};
use crate::integrity::IntegrityMonitor;
use crate::panel::{Location, PanelLayout};
use crate::renewal::RenewalScheduler;
use crate::state::Session;
use crate::timing::Timing;
use crate::watchdog::ExpiryWatchdog;

pub struct Keeper {
	facade: Arc<dyn RemoteResource>,
	channel: Arc<dyn OperatorChannel>,
	layout: PanelLayout,
	timing: Timing,
	session: Session,
	replies: ReplyMailbox,
	integrity: Ticker,
	renewal: Ticker,
	watchdog: Ticker,
	challenge_gate: Mutex<()>,
	shutdown: watch::Sender<bool>,
}

impl Keeper {
	pub fn new(
		facade: Arc<dyn RemoteResource>,
		channel: Arc<dyn OperatorChannel>,
		layout: PanelLayout,
		timing: Timing,
	) -> Arc<Self> {
		let (shutdown, _) = watch::channel(false);
		Arc::new(Self {
			facade,
			channel,
			layout,
			integrity: Ticker::new("integrity", timing.integrity_period),
			// Period only backs Flow::Continue; every tick returns an explicit wait.
			renewal: Ticker::new("renewal", timing.integrity_period),
			watchdog: Ticker::delayed("watchdog", timing.watchdog_period),
			timing,
			session: Session::default(),
			replies: ReplyMailbox::new(),
			challenge_gate: Mutex::new(()),
			shutdown,
		})
	}

	pub fn facade(&self) -> &dyn RemoteResource {
		self.facade.as_ref()
	}

	pub fn channel(&self) -> &dyn OperatorChannel {
		self.channel.as_ref()
	}

	pub fn layout(&self) -> &PanelLayout {
		&self.layout
	}

	pub fn timing(&self) -> &Timing {
		&self.timing
	}

	pub fn session(&self) -> &Session {
		&self.session
	}

	pub fn replies(&self) -> &ReplyMailbox {
		&self.replies
	}

	pub(crate) fn try_challenge_gate(&self) -> Result<MutexGuard<'_, ()>> {
		self.challenge_gate.try_lock().map_err(|_| KeepError::ChallengeBusy)
	}

	/// Starts the integrity monitor unless it is already running.
	pub fn arm_integrity(self: &Arc<Self>) -> bool {
		self.integrity.start(ticking(self, |keeper| async move { IntegrityMonitor::new(&keeper).tick().await }))
	}

	/// Starts the integrity monitor with its first tick one period from now.
	pub fn arm_integrity_later(self: &Arc<Self>) -> bool {
		self.integrity.start_in(
			self.timing.integrity_period,
			ticking(self, |keeper| async move { IntegrityMonitor::new(&keeper).tick().await }),
		)
	}

	pub fn disarm_integrity(&self) -> bool {
		self.integrity.cancel()
	}

	/// Starts the renewal scheduler unless it is already running.
	pub fn arm_renewal(self: &Arc<Self>) -> bool {
		self.renewal.start(ticking(self, |keeper| async move { RenewalScheduler::new(&keeper).tick().await }))
	}

	pub fn disarm_renewal(&self) -> bool {
		self.renewal.cancel()
	}

	/// (Re)arms the expiry watchdog; the first tick fires one period from now.
	pub fn arm_watchdog(self: &Arc<Self>) {
		self.watchdog.restart(ticking(self, |keeper| async move { ExpiryWatchdog::new(&keeper).tick() }));
	}

	pub fn disarm_watchdog(&self) -> bool {
		self.watchdog.cancel()
	}

	pub fn is_integrity_armed(&self) -> bool {
		self.integrity.is_running()
	}

	pub fn is_renewal_armed(&self) -> bool {
		self.renewal.is_running()
	}

	pub fn is_watchdog_armed(&self) -> bool {
		self.watchdog.is_running()
	}

	pub fn next_integrity_check(&self) -> Option<Instant> {
		self.integrity.next_tick()
	}

	pub fn next_renewal(&self) -> Option<Instant> {
		self.renewal.next_tick()
	}

	/// Disarms every timer and wakes [`Keeper::wait_for_shutdown`].
	pub fn shutdown(&self) {
		info!(target = "leasekeep.keeper", "shutting down");
		self.integrity.cancel();
		self.renewal.cancel();
		self.watchdog.cancel();
		self.shutdown.send_replace(true);
	}

	pub fn is_shut_down(&self) -> bool {
		*self.shutdown.borrow()
	}

	pub async fn wait_for_shutdown(&self) {
		let mut rx = self.shutdown.subscribe();
		// The sender lives inside `self`, so the channel cannot close here.
		let _ = rx.wait_for(|stopped| *stopped).await;
	}

	pub async fn location(&self) -> Result<Location> {
		let url = self.facade.current_location().await?;
		Ok(self.layout.classify(&url))
	}

	pub(crate) async fn settle(&self) {
		tokio::time::sleep(self.timing.settle).await;
	}

	pub(crate) async fn find(&self, selector: &Selector, what: &'static str) -> Result<ElementRef> {
		self.facade.find(selector).await?.require(what)
	}

	pub(crate) async fn click_on(&self, selector: &Selector, what: &'static str) -> Result<()> {
		let element = self.find(selector, what).await?;
		self.facade.click(&element).await?.require(what)
	}

	pub(crate) async fn read_text(&self, selector: &Selector, what: &'static str) -> Result<String> {
		let element = self.find(selector, what).await?;
		self.facade.text(&element).await?.require(what)
	}

	pub(crate) async fn type_into(&self, element: &ElementRef, text: &str, what: &'static str) -> Result<()> {
		self.facade.type_text(element, text).await?.require(what)
	}

	/// Sets presence. Failures are logged; presence is cosmetic.
	pub(crate) async fn set_presence(&self, presence: Presence) {
		if let Err(err) = self.channel.set_presence(&presence).await {
			warn!(target = "leasekeep.keeper", error = %err, activity = %presence.activity, "presence update failed");
		}
	}

	/// Shows `text` in the single status message, posting it if none is up.
	pub(crate) async fn show(&self, text: &str, image: Option<&ChallengeImage>) -> Result<MessageRef> {
		if let Some(message) = self.session.pending_message() {
			self.channel.edit(message, text, image).await?;
			return Ok(message);
		}
		let message = self.channel.post(text, image).await?;
		self.session.set_pending_message(Some(message));
		debug!(target = "leasekeep.keeper", message = message.0, "status message posted");
		Ok(message)
	}

	/// Deletes the status message after the grace period.
	pub(crate) async fn dismiss(&self) -> Result<()> {
		tokio::time::sleep(self.timing.grace).await;
		if let Some(message) = self.session.take_pending_message() {
			self.channel.delete(message).await?;
			debug!(target = "leasekeep.keeper", message = message.0, "status message deleted");
		}
		Ok(())
	}

	/// Shows `text` without an image, then dismisses it after the grace period.
	pub(crate) async fn retire(&self, text: &str) -> Result<()> {
		self.show(text, None).await?;
		self.dismiss().await
	}

	/// Leaves `text` up as a final word and stops tracking the message.
	pub(crate) async fn release(&self, text: &str) {
		let shown = self.show(text, None).await;
		self.session.set_pending_message(None);
		if let Err(err) = shown {
			warn!(target = "leasekeep.keeper", error = %err, "could not show final status");
		}
	}

	/// Posts a one-off notice outside the status message.
	pub(crate) async fn notify(&self, text: &str) {
		if let Err(err) = self.channel.post(text, None).await {
			warn!(target = "leasekeep.keeper", error = %err, "could not notify operators");
		}
	}
}

type TickBody = Pin<Box<dyn Future<Output = Flow> + Send>>;

/// Builds a ticker body that upgrades the weak keeper on every tick and stops
/// once the keeper is gone.
fn ticking<F, Fut>(keeper: &Arc<Keeper>, tick: F) -> impl FnMut() -> TickBody + Send + 'static
where
	F: Fn(Arc<Keeper>) -> Fut + Send + 'static,
	Fut: Future<Output = Flow> + Send + 'static,
{
	let weak: Weak<Keeper> = Arc::downgrade(keeper);
	move || -> TickBody {
		match weak.upgrade() {
			Some(keeper) => Box::pin(tick(keeper)),
			None => Box::pin(std::future::ready(Flow::Stop)),
		}
	}
}
