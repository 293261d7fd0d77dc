//! Operator command handling.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use leasekeep_protocol::{OperatorCommand, Selector};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::channel::Reply;
use crate::error::Result;
use crate::facade::{Key, Lookup};
use crate::keeper::Keeper;
use crate::notices;
use crate::panel::{Location, Selectors};
use crate::resume::ResumeFlow;

/// Lines returned by the console command.
pub const CONSOLE_TAIL: usize = 10;

/// Reply to an operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
	pub text: String,
	/// Visible only to the operator who issued the command.
	pub ephemeral: bool,
}

impl Response {
	pub fn public(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			ephemeral: false,
		}
	}

	pub fn ephemeral(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			ephemeral: true,
		}
	}
}

/// Validates operator commands against the session flags and acts on them.
pub struct CommandDispatcher {
	keeper: Arc<Keeper>,
	owner: String,
}

impl CommandDispatcher {
	/// `owner` is the operator allowed to use the console and shut down.
	pub fn new(keeper: Arc<Keeper>, owner: impl Into<String>) -> Self {
		Self {
			keeper,
			owner: owner.into(),
		}
	}

	pub fn keeper(&self) -> &Arc<Keeper> {
		&self.keeper
	}

	pub async fn dispatch(&self, operator: &str, command: OperatorCommand) -> Response {
		debug!(target = "leasekeep.dispatch", command = command.name(), %operator, "command received");
		match command {
			OperatorCommand::Resume => self.resume().await,
			OperatorCommand::Answer { text } => self.answer(text),
			OperatorCommand::Console { command } => {
				if !self.is_owner(operator) {
					return Response::ephemeral(notices::OWNER_ONLY);
				}
				self.console(command.as_deref()).await
			}
			OperatorCommand::Start => self.power(|s| &s.power_on, "Starting...").await,
			OperatorCommand::Stop => self.power(|s| &s.power_off, "Stopping...").await,
			OperatorCommand::Restart => self.power(|s| &s.power_restart, "Restarting...").await,
			OperatorCommand::Shutdown => {
				if !self.is_owner(operator) {
					return Response::ephemeral(notices::OWNER_ONLY);
				}
				info!(target = "leasekeep.dispatch", %operator, "shutdown requested");
				self.keeper.shutdown();
				Response::ephemeral(notices::SHUTTING_DOWN)
			}
			OperatorCommand::Status => Response::ephemeral(self.status()),
		}
	}

	fn is_owner(&self, operator: &str) -> bool {
		operator == self.owner
	}

	async fn resume(&self) -> Response {
		let on_home = match self.keeper.location().await {
			Ok(location) => location == Location::Home,
			Err(err) => return Response::ephemeral(format!("Could not read the panel: {err}")),
		};
		if !on_home || !self.keeper.session().begin_resume() {
			return Response::ephemeral(notices::ALREADY_RESUMED);
		}
		let keeper = Arc::clone(&self.keeper);
		tokio::spawn(async move { ResumeFlow::new(&keeper).run().await });
		Response::public(notices::RESUMING)
	}

	fn answer(&self, text: String) -> Response {
		let text = text.trim().to_string();
		if !(4..=6).contains(&text.chars().count()) {
			return Response::ephemeral(notices::ANSWER_LENGTH);
		}
		if !self.keeper.session().captchable() {
			return Response::ephemeral(notices::NOT_AWAITING_ANSWER);
		}
		self.keeper.replies().deliver(Reply::Answer(text));
		Response::public(notices::ANSWER_RECEIVED)
	}

	async fn console(&self, command: Option<&str>) -> Response {
		if !self.keeper.session().consolable() {
			return Response::ephemeral(notices::RENEWING);
		}
		match self.run_console(command).await {
			Ok(lines) if lines.is_empty() => Response::ephemeral("(no console output)"),
			Ok(lines) => Response::ephemeral(lines.join("\n")),
			Err(err) => {
				warn!(target = "leasekeep.dispatch", error = %err, "console command failed");
				Response::ephemeral(format!("Console unavailable: {err}"))
			}
		}
	}

	async fn run_console(&self, command: Option<&str>) -> Result<Vec<String>> {
		let keeper = &self.keeper;
		let selectors = &keeper.layout().selectors;
		if let Some(command) = command.filter(|c| !c.trim().is_empty()) {
			let input = keeper.find(&selectors.console_input, "console input").await?;
			keeper.type_into(&input, command, "console input").await?;
			keeper.facade().press(&input, Key::Enter).await?.require("console input")?;
			keeper.settle().await;
		}

		let lines = keeper.facade().find_all(&selectors.console_lines).await?;
		let start = lines.len().saturating_sub(CONSOLE_TAIL);
		let mut tail = Vec::with_capacity(lines.len() - start);
		for line in &lines[start..] {
			if let Lookup::Found(text) = keeper.facade().text(line).await? {
				tail.push(text);
			}
		}
		Ok(tail)
	}

	async fn power(&self, control: fn(&Selectors) -> &Selector, ack: &str) -> Response {
		if !self.keeper.session().consolable() {
			return Response::ephemeral(notices::RENEWING);
		}
		let selector = control(&self.keeper.layout().selectors);
		match self.keeper.click_on(selector, "power control").await {
			Ok(()) => Response::public(ack),
			Err(err) => Response::ephemeral(format!("Power control unavailable: {err}")),
		}
	}

	fn status(&self) -> String {
		let keeper = &self.keeper;
		let flags = keeper.session().snapshot();
		let now = Instant::now();
		let mut out = String::new();
		let _ = writeln!(out, "lease: {}", flags.lease);
		let _ = writeln!(
			out,
			"consolable: {}, awaiting answer: {}, resuming: {}",
			yes_no(flags.consolable),
			yes_no(flags.captchable),
			yes_no(flags.resuming)
		);
		let _ = writeln!(out, "integrity monitor: {}", timer_line(keeper.is_integrity_armed(), keeper.next_integrity_check(), now));
		let _ = writeln!(out, "renewal scheduler: {}", timer_line(keeper.is_renewal_armed(), keeper.next_renewal(), now));
		let _ = write!(out, "expiry watchdog: {}", if keeper.is_watchdog_armed() { "armed" } else { "idle" });
		out
	}
}

fn yes_no(value: bool) -> &'static str {
	if value { "yes" } else { "no" }
}

fn timer_line(armed: bool, next: Option<Instant>, now: Instant) -> String {
	match (armed, next) {
		(false, _) => "idle".to_string(),
		(true, None) => "running".to_string(),
		(true, Some(at)) => format!("next tick in {}", format_wait(at.saturating_duration_since(now))),
	}
}

/// Formats a wait as `1h 5m`, `4m 0s` or `12s`.
pub fn format_wait(wait: Duration) -> String {
	let secs = wait.as_secs();
	match (secs / 3600, (secs % 3600) / 60, secs % 60) {
		(0, 0, s) => format!("{s}s"),
		(0, m, s) => format!("{m}m {s}s"),
		(h, m, _) => format!("{h}h {m}m"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn waits_format_compactly() {
		assert_eq!(format_wait(Duration::from_secs(12)), "12s");
		assert_eq!(format_wait(Duration::from_secs(240)), "4m 0s");
		assert_eq!(format_wait(Duration::from_secs(3900)), "1h 5m");
	}
}
