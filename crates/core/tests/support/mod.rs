#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use leasekeep::testing::{FakeProvider, RecordingChannel, ServerPhase};
use leasekeep::{CommandDispatcher, Credentials, DEFAULT_BASE_URL, Keeper, PanelLayout, Response, Timing};
use leasekeep_protocol::OperatorCommand;
use tokio::task::JoinHandle;

pub const OWNER: &str = "owner";

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(tracing::Level::DEBUG).try_init();
}

pub fn layout() -> PanelLayout {
	PanelLayout::new(DEFAULT_BASE_URL, "13479479")
}

/// Default timing without the settle pause, so timer arithmetic is exact.
pub fn timing() -> Timing {
	Timing {
		settle: Duration::ZERO,
		..Timing::default()
	}
}

pub fn credentials() -> Credentials {
	Credentials {
		email: "ops@example.com".to_string(),
		password: "hunter2".to_string(),
	}
}

/// What the scripted operator does with each new challenge.
#[derive(Debug, Clone, Copy)]
pub enum Step {
	Right,
	Wrong(&'static str),
	/// Let the challenge expire.
	Silent,
}

pub struct Harness {
	pub provider: Arc<FakeProvider>,
	pub channel: Arc<RecordingChannel>,
	pub keeper: Arc<Keeper>,
	pub dispatcher: Arc<CommandDispatcher>,
}

impl Harness {
	pub fn new() -> Self {
		Self::with_timing(timing())
	}

	pub fn with_timing(timing: Timing) -> Self {
		Self::build(layout(), timing)
	}

	/// The keeper sees `keeper_layout` while the panel keeps the stock one.
	pub fn with_keeper_layout(keeper_layout: PanelLayout) -> Self {
		Self::build(keeper_layout, timing())
	}

	fn build(keeper_layout: PanelLayout, timing: Timing) -> Self {
		init_tracing();
		let provider = Arc::new(FakeProvider::new(layout()));
		let channel = Arc::new(RecordingChannel::new());
		let keeper = Keeper::new(provider.clone(), channel.clone(), keeper_layout, timing);
		let dispatcher = Arc::new(CommandDispatcher::new(Arc::clone(&keeper), OWNER));
		Self {
			provider,
			channel,
			keeper,
			dispatcher,
		}
	}

	/// A running server with `minutes` left on the lease.
	pub fn running(minutes: u32) -> Self {
		let harness = Self::new();
		harness.provider.set_phase(ServerPhase::Running);
		harness.provider.set_remaining(minutes);
		harness
	}

	pub async fn send(&self, command: OperatorCommand) -> Response {
		self.dispatcher.dispatch(OWNER, command).await
	}

	pub async fn answer(&self, text: &str) -> Response {
		self.send(OperatorCommand::Answer { text: text.to_string() }).await
	}

	/// Waits until a challenge newer than `seen` is awaiting an answer.
	pub async fn wait_for_challenge_after(&self, seen: u32) -> u32 {
		let keeper = Arc::clone(&self.keeper);
		let provider = Arc::clone(&self.provider);
		eventually("a fresh challenge", move || {
			keeper.session().captchable() && provider.challenge_serial() > seen
		})
		.await;
		self.provider.challenge_serial()
	}

	/// Plays `steps` against successive challenges in the background.
	pub fn spawn_operator(&self, steps: Vec<Step>) -> JoinHandle<Vec<Response>> {
		let keeper = Arc::clone(&self.keeper);
		let provider = Arc::clone(&self.provider);
		let dispatcher = Arc::clone(&self.dispatcher);
		tokio::spawn(async move {
			let mut seen = 0;
			let mut responses = Vec::new();
			for step in steps {
				let poll_keeper = Arc::clone(&keeper);
				let poll_provider = Arc::clone(&provider);
				eventually("a fresh challenge", move || {
					poll_keeper.session().captchable() && poll_provider.challenge_serial() > seen
				})
				.await;
				seen = provider.challenge_serial();
				let text = match step {
					Step::Right => provider.expected_answer(),
					Step::Wrong(text) => text.to_string(),
					Step::Silent => continue,
				};
				responses.push(dispatcher.dispatch(OWNER, OperatorCommand::Answer { text }).await);
			}
			responses
		})
	}
}

/// Polls `condition` on virtual time until it holds.
pub async fn eventually(what: &str, condition: impl Fn() -> bool) {
	for _ in 0..20_000 {
		if condition() {
			return;
		}
		tokio::time::sleep(Duration::from_millis(100)).await;
	}
	panic!("timed out waiting for {what}");
}
