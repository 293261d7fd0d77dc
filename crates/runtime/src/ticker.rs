//! Single-instance periodic tasks.
//!
//! A [`Ticker`] owns at most one running task. The task calls its body, then
//! sleeps for the interval the body asked for (or the default period), until
//! the body returns [`Flow::Stop`] or the ticker is cancelled. Starting a
//! running ticker is refused; restarting cancels the current task first, so
//! two instances never tick side by side.
//!
//! Cancellation aborts the task, which takes effect at its next suspension
//! point. A body must end its own ticker by returning [`Flow::Stop`]; calling
//! [`Ticker::cancel`] from inside the body would abort the body itself.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

/// What a tick body wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
	/// Tick again after the ticker's default period.
	Continue,
	/// Tick again after exactly this long.
	After(Duration),
	/// End the task.
	Stop,
}

struct Run {
	handle: JoinHandle<()>,
	next_tick: Arc<Mutex<Option<Instant>>>,
}

/// Handle to a named periodic task with at most one live instance.
pub struct Ticker {
	name: &'static str,
	period: Duration,
	delayed: bool,
	run: Mutex<Option<Run>>,
}

impl Ticker {
	/// Creates an idle ticker whose first tick fires as soon as it is started.
	pub fn new(name: &'static str, period: Duration) -> Self {
		Self {
			name,
			period,
			delayed: false,
			run: Mutex::new(None),
		}
	}

	/// Creates an idle ticker whose first tick fires one period after starting.
	pub fn delayed(name: &'static str, period: Duration) -> Self {
		Self {
			name,
			period,
			delayed: true,
			run: Mutex::new(None),
		}
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn period(&self) -> Duration {
		self.period
	}

	/// Starts the task unless one is already running.
	///
	/// Returns `false` (and leaves the running task alone) when already started.
	pub fn start<F, Fut>(&self, body: F) -> bool
	where
		F: FnMut() -> Fut + Send + 'static,
		Fut: Future<Output = Flow> + Send + 'static,
	{
		self.start_in(self.first_wait(), body)
	}

	/// Like [`Ticker::start`], with the first tick `delay` from now.
	pub fn start_in<F, Fut>(&self, delay: Duration, body: F) -> bool
	where
		F: FnMut() -> Fut + Send + 'static,
		Fut: Future<Output = Flow> + Send + 'static,
	{
		let mut run = self.run.lock();
		if run.as_ref().is_some_and(|r| !r.handle.is_finished()) {
			debug!(target = "leasekeep.ticker", ticker = self.name, "already running; start ignored");
			return false;
		}
		*run = Some(self.spawn(delay, body));
		true
	}

	/// Cancels any running task and starts a fresh one.
	pub fn restart<F, Fut>(&self, body: F)
	where
		F: FnMut() -> Fut + Send + 'static,
		Fut: Future<Output = Flow> + Send + 'static,
	{
		let mut run = self.run.lock();
		if let Some(previous) = run.take() {
			previous.handle.abort();
		}
		*run = Some(self.spawn(self.first_wait(), body));
	}

	/// Cancels the running task. Cancelling an idle ticker is a no-op.
	///
	/// Returns whether a live task was cancelled.
	pub fn cancel(&self) -> bool {
		let Some(previous) = self.run.lock().take() else {
			return false;
		};
		let live = !previous.handle.is_finished();
		previous.handle.abort();
		if live {
			debug!(target = "leasekeep.ticker", ticker = self.name, "cancelled");
		}
		live
	}

	pub fn is_running(&self) -> bool {
		self.run.lock().as_ref().is_some_and(|r| !r.handle.is_finished())
	}

	/// Instant of the next scheduled tick, if the task is sleeping between ticks.
	pub fn next_tick(&self) -> Option<Instant> {
		let run = self.run.lock();
		let run = run.as_ref().filter(|r| !r.handle.is_finished())?;
		*run.next_tick.lock()
	}

	fn first_wait(&self) -> Duration {
		if self.delayed { self.period } else { Duration::ZERO }
	}

	fn spawn<F, Fut>(&self, delay: Duration, mut body: F) -> Run
	where
		F: FnMut() -> Fut + Send + 'static,
		Fut: Future<Output = Flow> + Send + 'static,
	{
		let name = self.name;
		let period = self.period;
		let next_tick = Arc::new(Mutex::new(None));
		let schedule = Arc::clone(&next_tick);

		let handle = tokio::spawn(async move {
			if !delay.is_zero() {
				let at = Instant::now() + delay;
				*schedule.lock() = Some(at);
				tokio::time::sleep_until(at).await;
			}
			loop {
				*schedule.lock() = None;
				trace!(target = "leasekeep.ticker", ticker = name, "tick");
				let wait = match body().await {
					Flow::Continue => period,
					Flow::After(wait) => wait,
					Flow::Stop => break,
				};
				let at = Instant::now() + wait;
				*schedule.lock() = Some(at);
				debug!(target = "leasekeep.ticker", ticker = name, wait_secs = wait.as_secs(), "next tick scheduled");
				tokio::time::sleep_until(at).await;
			}
			*schedule.lock() = None;
			debug!(target = "leasekeep.ticker", ticker = name, "stopped");
		});

		Run { handle, next_tick }
	}
}

impl Drop for Ticker {
	fn drop(&mut self) {
		if let Some(run) = self.run.get_mut().take() {
			run.handle.abort();
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicU32, Ordering};

	use super::*;

	fn counting(counter: &Arc<AtomicU32>, flow: Flow) -> impl FnMut() -> std::future::Ready<Flow> + Send + 'static {
		let counter = Arc::clone(counter);
		move || {
			counter.fetch_add(1, Ordering::SeqCst);
			std::future::ready(flow)
		}
	}

	#[tokio::test(start_paused = true)]
	async fn ticks_on_the_default_period() {
		let ticks = Arc::new(AtomicU32::new(0));
		let ticker = Ticker::new("test", Duration::from_secs(60));
		assert!(ticker.start(counting(&ticks, Flow::Continue)));

		tokio::time::sleep(Duration::from_secs(1)).await;
		assert_eq!(ticks.load(Ordering::SeqCst), 1);
		tokio::time::sleep(Duration::from_secs(120)).await;
		assert_eq!(ticks.load(Ordering::SeqCst), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn after_overrides_the_period() {
		let ticks = Arc::new(AtomicU32::new(0));
		let ticker = Ticker::new("test", Duration::ZERO);
		ticker.start(counting(&ticks, Flow::After(Duration::from_secs(240))));

		tokio::time::sleep(Duration::from_secs(1)).await;
		let next = ticker.next_tick().expect("sleeping between ticks");
		assert_eq!(next.duration_since(Instant::now()), Duration::from_secs(239));
		assert_eq!(ticks.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn stop_ends_the_task() {
		let ticks = Arc::new(AtomicU32::new(0));
		let ticker = Ticker::new("test", Duration::from_secs(1));
		ticker.start(counting(&ticks, Flow::Stop));

		tokio::time::sleep(Duration::from_secs(10)).await;
		assert_eq!(ticks.load(Ordering::SeqCst), 1);
		assert!(!ticker.is_running());
		assert!(ticker.next_tick().is_none());
	}

	#[tokio::test(start_paused = true)]
	async fn start_refuses_a_second_instance() {
		let ticks = Arc::new(AtomicU32::new(0));
		let ticker = Ticker::new("test", Duration::from_secs(60));
		assert!(ticker.start(counting(&ticks, Flow::Continue)));
		assert!(!ticker.start(counting(&ticks, Flow::Continue)));

		tokio::time::sleep(Duration::from_secs(1)).await;
		assert_eq!(ticks.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn restart_replaces_the_running_instance() {
		let first = Arc::new(AtomicU32::new(0));
		let second = Arc::new(AtomicU32::new(0));
		let ticker = Ticker::new("test", Duration::from_secs(60));
		ticker.start(counting(&first, Flow::Continue));
		tokio::time::sleep(Duration::from_secs(1)).await;

		ticker.restart(counting(&second, Flow::Continue));
		tokio::time::sleep(Duration::from_secs(90)).await;
		assert_eq!(first.load(Ordering::SeqCst), 1);
		assert_eq!(second.load(Ordering::SeqCst), 2);
	}

	#[tokio::test(start_paused = true)]
	async fn cancel_is_idempotent() {
		let ticks = Arc::new(AtomicU32::new(0));
		let ticker = Ticker::new("test", Duration::from_secs(60));
		assert!(!ticker.cancel());

		ticker.start(counting(&ticks, Flow::Continue));
		tokio::time::sleep(Duration::from_secs(1)).await;
		assert!(ticker.cancel());
		assert!(!ticker.cancel());
		assert!(!ticker.is_running());
	}

	#[tokio::test(start_paused = true)]
	async fn delayed_ticker_waits_one_period_first() {
		let ticks = Arc::new(AtomicU32::new(0));
		let ticker = Ticker::delayed("test", Duration::from_secs(55));
		ticker.start(counting(&ticks, Flow::Continue));

		tokio::time::sleep(Duration::from_secs(54)).await;
		assert_eq!(ticks.load(Ordering::SeqCst), 0);
		tokio::time::sleep(Duration::from_secs(2)).await;
		assert_eq!(ticks.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn start_in_defers_the_first_tick() {
		let ticks = Arc::new(AtomicU32::new(0));
		let ticker = Ticker::new("test", Duration::from_secs(600));
		assert!(ticker.start_in(Duration::from_secs(30), counting(&ticks, Flow::Continue)));

		tokio::time::sleep(Duration::from_secs(1)).await;
		assert_eq!(ticks.load(Ordering::SeqCst), 0);
		assert!(ticker.is_running());
		tokio::time::sleep(Duration::from_secs(30)).await;
		assert_eq!(ticks.load(Ordering::SeqCst), 1);
	}
}
