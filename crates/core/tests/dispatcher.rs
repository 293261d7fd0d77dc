mod support;

use std::time::Duration;

use leasekeep::notices;
use leasekeep_protocol::OperatorCommand;
use support::{Harness, OWNER, eventually};

async fn consoled(minutes: u32) -> Harness {
	let harness = Harness::running(minutes);
	harness.keeper.arm_renewal();
	let keeper = harness.keeper.clone();
	eventually("console session", move || keeper.session().consolable()).await;
	harness
}

#[tokio::test(start_paused = true)]
async fn answer_needs_an_outstanding_challenge() {
	let harness = Harness::new();
	let response = harness.answer("x7kq").await;
	assert_eq!(response.text, notices::NOT_AWAITING_ANSWER);
	assert!(response.ephemeral);
}

#[tokio::test(start_paused = true)]
async fn answer_length_is_checked() {
	let harness = Harness::new();
	assert_eq!(harness.answer("abc").await.text, notices::ANSWER_LENGTH);
	assert_eq!(harness.answer("abcdefg").await.text, notices::ANSWER_LENGTH);
}

#[tokio::test(start_paused = true)]
async fn power_controls_wait_for_the_console() {
	let harness = Harness::running(30);
	let refused = harness.send(OperatorCommand::Start).await;
	assert_eq!(refused.text, notices::RENEWING);
	assert!(refused.ephemeral);

	let harness = consoled(30).await;
	assert_eq!(harness.send(OperatorCommand::Start).await.text, "Starting...");
	assert_eq!(harness.send(OperatorCommand::Stop).await.text, "Stopping...");
	assert_eq!(harness.send(OperatorCommand::Restart).await.text, "Restarting...");
	assert_eq!(harness.provider.clicks(), vec!["PowerOn", "PowerOff", "PowerRestart"]);
}

#[tokio::test(start_paused = true)]
async fn console_is_owner_only() {
	let harness = consoled(30).await;
	let response = harness
		.dispatcher
		.dispatch("guest", OperatorCommand::Console { command: None })
		.await;
	assert_eq!(response.text, notices::OWNER_ONLY);
}

#[tokio::test(start_paused = true)]
async fn console_runs_a_command_and_tails_the_output() {
	let harness = consoled(30).await;
	for n in 1..=12 {
		harness.provider.push_console_line(&format!("line {n}"));
	}

	let response = harness
		.send(OperatorCommand::Console {
			command: Some("list".to_string()),
		})
		.await;
	assert!(response.ephemeral);
	let lines: Vec<&str> = response.text.lines().collect();
	assert_eq!(lines.len(), 10);
	assert_eq!(lines.first(), Some(&"line 4"));
	assert_eq!(lines.last(), Some(&"list"));
}

#[tokio::test(start_paused = true)]
async fn console_is_refused_during_a_renewal() {
	let harness = Harness::running(8);
	harness.keeper.arm_renewal();
	harness.wait_for_challenge_after(0).await;

	let response = harness.send(OperatorCommand::Console { command: None }).await;
	assert_eq!(response.text, notices::RENEWING);
}

#[tokio::test(start_paused = true)]
async fn shutdown_disarms_every_timer() {
	let harness = consoled(30).await;
	let refused = harness.dispatcher.dispatch("guest", OperatorCommand::Shutdown).await;
	assert_eq!(refused.text, notices::OWNER_ONLY);
	assert!(harness.keeper.is_renewal_armed());

	let response = harness.dispatcher.dispatch(OWNER, OperatorCommand::Shutdown).await;
	assert_eq!(response.text, notices::SHUTTING_DOWN);
	assert!(!harness.keeper.is_renewal_armed());
	assert!(!harness.keeper.is_integrity_armed());
	assert!(harness.keeper.is_shut_down());
	tokio::time::timeout(Duration::from_secs(1), harness.keeper.wait_for_shutdown())
		.await
		.expect("shutdown should be observable");
}

#[tokio::test(start_paused = true)]
async fn status_reports_lease_and_timers() {
	let harness = consoled(30).await;
	let keeper = harness.keeper.clone();
	eventually("renewal to reschedule", move || keeper.next_renewal().is_some()).await;

	let status = harness.send(OperatorCommand::Status).await;
	assert!(status.ephemeral);
	assert!(status.text.contains("lease: active"), "{}", status.text);
	assert!(status.text.contains("consolable: yes"), "{}", status.text);
	// 30 minutes left less the 11 minute margin, read up to one poll step later.
	assert!(
		status.text.contains("renewal scheduler: next tick in 19m 0s")
			|| status.text.contains("renewal scheduler: next tick in 18m 59s"),
		"{}",
		status.text
	);
	assert!(status.text.contains("integrity monitor: idle"), "{}", status.text);
	assert!(status.text.contains("expiry watchdog: idle"), "{}", status.text);
}
