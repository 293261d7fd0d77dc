mod support;

use std::time::Duration;

use leasekeep::{ChallengeWorkflow, KeepError, Origin, Outcome, Phase, Timing, notices};
use support::{Harness, Step, eventually};

fn console(harness: &Harness) {
	harness.provider.open(&harness.provider.layout().console_url());
}

#[tokio::test(start_paused = true)]
async fn wrong_then_right_answer_takes_two_attempts() {
	let harness = Harness::running(8);
	console(&harness);
	let operator = harness.spawn_operator(vec![Step::Wrong("zzzz"), Step::Right]);

	let report = ChallengeWorkflow::new(&harness.keeper, Origin::ConsoleRenewal)
		.run(notices::RENEW_PROMPT)
		.await
		.unwrap();

	assert_eq!(report.outcome, Outcome::Solved);
	assert_eq!(report.attempts, 2);
	assert_eq!(
		report.phases,
		vec![
			Phase::Priming,
			Phase::AwaitingAnswer,
			Phase::Submitting,
			Phase::Priming,
			Phase::AwaitingAnswer,
			Phase::Submitting,
			Phase::Solved,
		]
	);
	let responses = operator.await.unwrap();
	assert!(responses.iter().all(|r| r.text == notices::ANSWER_RECEIVED));
	assert_eq!(
		harness.channel.texts(),
		vec![notices::RENEW_PROMPT, notices::RETRY_PROMPT, notices::SOLVED]
	);
	assert_eq!(harness.channel.images(), vec![b"challenge-1".to_vec(), b"challenge-2".to_vec()]);
	assert_eq!(harness.channel.post_count(), 1);
	assert_eq!(harness.channel.max_live(), 1);
	assert!(harness.channel.live().is_empty());
	assert_eq!(harness.provider.submissions(), vec!["zzzz".to_string(), "k002".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn expiry_after_a_wrong_answer_reverts_to_the_prompt() {
	let harness = Harness::running(8);
	console(&harness);
	harness.spawn_operator(vec![Step::Wrong("zzzz"), Step::Silent, Step::Right]);

	let report = ChallengeWorkflow::new(&harness.keeper, Origin::ConsoleRenewal)
		.run(notices::RENEW_PROMPT)
		.await
		.unwrap();

	assert_eq!(report.attempts, 3);
	assert_eq!(
		report.phases,
		vec![
			Phase::Priming,
			Phase::AwaitingAnswer,
			Phase::Submitting,
			Phase::Priming,
			Phase::AwaitingAnswer,
			Phase::Priming,
			Phase::AwaitingAnswer,
			Phase::Submitting,
			Phase::Solved,
		]
	);
	assert_eq!(
		harness.channel.texts(),
		vec![notices::RENEW_PROMPT, notices::RETRY_PROMPT, notices::RENEW_PROMPT, notices::SOLVED]
	);
	// Renew link clicks: the initial one plus one after the expiry.
	let renews = harness.provider.clicks().iter().filter(|c| c.as_str() == "RenewLink").count();
	assert_eq!(renews, 2);
}

#[tokio::test(start_paused = true)]
async fn watchdog_fires_one_period_after_the_prompt() {
	let harness = Harness::running(8);
	console(&harness);
	let keeper = harness.keeper.clone();
	let cycle = tokio::spawn(async move {
		ChallengeWorkflow::new(&keeper, Origin::ConsoleRenewal).run(notices::RENEW_PROMPT).await
	});

	harness.wait_for_challenge_after(0).await;
	tokio::time::sleep(Duration::from_secs(50)).await;
	assert_eq!(harness.provider.challenge_serial(), 1);

	harness.wait_for_challenge_after(1).await;
	assert_eq!(harness.channel.images().last().unwrap(), &b"challenge-2".to_vec());
	harness.answer(&harness.provider.expected_answer()).await;
	let report = cycle.await.unwrap().unwrap();
	assert_eq!(report.attempts, 2);
}

#[tokio::test(start_paused = true)]
async fn third_party_renewal_supersedes_the_cycle() {
	let harness = Harness::running(8);
	console(&harness);
	let keeper = harness.keeper.clone();
	let cycle = tokio::spawn(async move {
		ChallengeWorkflow::new(&keeper, Origin::ConsoleRenewal).run(notices::RENEW_PROMPT).await
	});

	harness.wait_for_challenge_after(0).await;
	assert!(!harness.keeper.session().consolable());
	harness.provider.renew_externally(50);
	harness.answer("zzzz").await;

	let report = cycle.await.unwrap().unwrap();
	assert_eq!(report.outcome, Outcome::Superseded);
	assert_eq!(report.attempts, 1);
	assert_eq!(
		report.phases,
		vec![Phase::Priming, Phase::AwaitingAnswer, Phase::Submitting, Phase::SupersededByThirdParty]
	);
	assert_eq!(harness.channel.texts().last().unwrap(), notices::SUPERSEDED);
	assert!(harness.channel.live().is_empty());
	assert!(!harness.keeper.is_watchdog_armed());
	// The scratch tab is closed again.
	assert_eq!(harness.provider.tab_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn a_second_cycle_is_refused() {
	let harness = Harness::running(8);
	console(&harness);
	let keeper = harness.keeper.clone();
	let first = tokio::spawn(async move {
		ChallengeWorkflow::new(&keeper, Origin::ConsoleRenewal).run(notices::RENEW_PROMPT).await
	});
	harness.wait_for_challenge_after(0).await;

	let second = ChallengeWorkflow::new(&harness.keeper, Origin::ConsoleRenewal)
		.run(notices::RENEW_PROMPT)
		.await;
	assert!(matches!(second, Err(KeepError::ChallengeBusy)));
	assert!(harness.keeper.session().captchable());

	harness.answer(&harness.provider.expected_answer()).await;
	assert_eq!(first.await.unwrap().unwrap().outcome, Outcome::Solved);
}

#[tokio::test(start_paused = true)]
async fn attempts_are_bounded() {
	let harness = Harness::with_timing(Timing {
		max_attempts: 2,
		..support::timing()
	});
	harness.provider.set_phase(leasekeep::testing::ServerPhase::Running);
	harness.provider.set_remaining(8);
	console(&harness);
	harness.spawn_operator(vec![Step::Wrong("zzzz"), Step::Wrong("yyyy")]);

	let result = ChallengeWorkflow::new(&harness.keeper, Origin::ConsoleRenewal)
		.run(notices::RENEW_PROMPT)
		.await;
	assert!(matches!(result, Err(KeepError::ChallengeRejected { attempts: 2 })));
	assert!(!harness.keeper.session().captchable());
	assert!(!harness.keeper.is_watchdog_armed());
}

#[tokio::test(start_paused = true)]
async fn answers_are_only_taken_while_awaited() {
	let harness = Harness::running(8);
	console(&harness);
	assert_eq!(harness.answer("k001").await.text, notices::NOT_AWAITING_ANSWER);

	let keeper = harness.keeper.clone();
	let cycle = tokio::spawn(async move {
		ChallengeWorkflow::new(&keeper, Origin::ConsoleRenewal).run(notices::RENEW_PROMPT).await
	});
	harness.wait_for_challenge_after(0).await;
	harness.answer(&harness.provider.expected_answer()).await;
	cycle.await.unwrap().unwrap();

	eventually("captchable to clear", || !harness.keeper.session().captchable()).await;
	assert_eq!(harness.answer("k001").await.text, notices::NOT_AWAITING_ANSWER);
}
