mod support;

use leasekeep::testing::{ChannelEvent, ServerPhase};
use leasekeep::{Landing, Presence, login, notices};
use leasekeep_protocol::OperatorCommand;
use support::{Harness, Step, credentials, eventually};

async fn idle_harness() -> Harness {
	let harness = Harness::new();
	let landing = login(&harness.keeper, &credentials()).await.unwrap();
	assert_eq!(landing, Landing::Idle);
	harness
}

#[tokio::test(start_paused = true)]
async fn resume_walks_the_queue_and_the_transfer() {
	let harness = idle_harness().await;
	let keeper = &harness.keeper;
	harness.provider.set_queue(2);
	harness.provider.set_transfer(2);
	harness.spawn_operator(vec![Step::Right]);

	let response = harness.send(OperatorCommand::Resume).await;
	assert_eq!(response.text, notices::RESUMING);
	assert!(!response.ephemeral);

	eventually("renewal scheduler", || keeper.next_renewal().is_some()).await;
	eventually("status message cleanup", || harness.channel.live().is_empty()).await;
	assert!(!keeper.session().resuming());
	assert!(!keeper.is_integrity_armed());
	assert_eq!(harness.provider.phase(), ServerPhase::Running);

	let texts = harness.channel.texts();
	assert_eq!(texts[0], notices::RESUME_PROMPT);
	for expected in ["Position 2", "Position 1", notices::QUEUE_CLEARED, "Transferring to a new node", notices::STARTED] {
		assert!(texts.iter().any(|t| t == expected), "missing {expected:?} in {texts:?}");
	}
	assert!(
		harness
			.channel
			.events()
			.contains(&ChannelEvent::Presence(Presence::idle(notices::QUEUE_ACTIVITY)))
	);
}

#[tokio::test(start_paused = true)]
async fn resume_without_a_queue_goes_straight_to_the_transfer() {
	let harness = idle_harness().await;
	harness.provider.set_transfer(1);
	harness.spawn_operator(vec![Step::Right]);

	harness.send(OperatorCommand::Resume).await;
	eventually("renewal scheduler", || harness.keeper.next_renewal().is_some()).await;

	let texts = harness.channel.texts();
	assert!(!texts.iter().any(|t| t.starts_with("Position")));
	assert!(texts.iter().any(|t| t == notices::STARTED));
}

#[tokio::test(start_paused = true)]
async fn resume_is_refused_away_from_the_home_page() {
	let harness = Harness::running(30);
	harness.provider.open(&harness.provider.layout().console_url());

	let response = harness.send(OperatorCommand::Resume).await;
	assert_eq!(response.text, notices::ALREADY_RESUMED);
	assert!(response.ephemeral);
	assert!(!harness.keeper.session().resuming());
}

#[tokio::test(start_paused = true)]
async fn only_one_resume_runs_at_a_time() {
	let harness = idle_harness().await;
	let first = harness.send(OperatorCommand::Resume).await;
	let second = harness.send(OperatorCommand::Resume).await;
	assert_eq!(first.text, notices::RESUMING);
	assert_eq!(second.text, notices::ALREADY_RESUMED);
}

#[tokio::test(start_paused = true)]
async fn resuming_a_running_server_arms_renewal() {
	let harness = Harness::running(30);
	harness.provider.open(&harness.provider.layout().home_url());

	assert_eq!(harness.send(OperatorCommand::Resume).await.text, notices::RESUMING);
	eventually("renewal scheduler", || harness.keeper.next_renewal().is_some()).await;
	eventually("resume to finish", || !harness.keeper.session().resuming()).await;
	assert!(harness.channel.texts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn expired_resume_challenge_is_refreshed_in_place() {
	let harness = idle_harness().await;
	harness.provider.set_transfer(1);
	harness.spawn_operator(vec![Step::Silent, Step::Wrong("zzzz"), Step::Right]);

	harness.send(OperatorCommand::Resume).await;
	eventually("renewal scheduler", || harness.keeper.next_renewal().is_some()).await;
	eventually("resume to finish", || !harness.keeper.session().resuming()).await;

	// Opening the resume page, the refresh after the expiry, the wrong answer.
	assert_eq!(harness.provider.challenge_serial(), 3);
	assert_eq!(harness.provider.submissions(), vec!["zzzz".to_string(), "k003".to_string()]);
	let clicks = harness.provider.clicks();
	assert!(!clicks.iter().any(|c| c == "RenewLink" || c == "ModalClose"), "{clicks:?}");

	let texts = harness.channel.texts();
	assert_eq!(
		texts[..4],
		[notices::RESUME_PROMPT, notices::RESUME_PROMPT, notices::RETRY_PROMPT, notices::SOLVED]
	);
	assert!(texts.iter().any(|t| t == notices::STARTED));
	assert_eq!(
		harness.channel.images()[..3],
		[b"challenge-1".to_vec(), b"challenge-2".to_vec(), b"challenge-3".to_vec()]
	);
	let challenge_posts = harness
		.channel
		.events()
		.iter()
		.take_while(|e| !matches!(e, ChannelEvent::Deleted { .. }))
		.filter(|e| matches!(e, ChannelEvent::Posted { .. }))
		.count();
	assert_eq!(challenge_posts, 1);
	assert_eq!(harness.channel.max_live(), 1);
}

#[tokio::test(start_paused = true)]
async fn resume_during_a_transfer_skips_the_challenge() {
	let harness = Harness::new();
	harness.provider.set_phase(ServerPhase::Transferring);
	harness.provider.set_transfer(1);
	assert_eq!(login(&harness.keeper, &credentials()).await.unwrap(), Landing::Idle);
	let keeper = &harness.keeper;

	assert_eq!(harness.send(OperatorCommand::Resume).await.text, notices::RESUMING);
	eventually("renewal scheduler", || keeper.next_renewal().is_some()).await;
	// Still resuming while the final status message is on screen.
	assert!(keeper.session().resuming());
	assert_eq!(harness.channel.live(), vec![notices::STARTED.to_string()]);

	eventually("status message cleanup", || harness.channel.live().is_empty()).await;
	assert!(!keeper.session().resuming());
	assert!(!keeper.is_integrity_armed());
	assert_eq!(harness.provider.phase(), ServerPhase::Running);
	assert_eq!(harness.provider.challenge_serial(), 0);

	let texts = harness.channel.texts();
	assert!(!texts.iter().any(|t| t == notices::RESUME_PROMPT || t.starts_with("Position")));
	assert!(texts.iter().any(|t| t == "Transferring to a new node"));
}

#[tokio::test(start_paused = true)]
async fn resume_while_queued_waits_out_the_queue() {
	let harness = Harness::new();
	harness.provider.set_phase(ServerPhase::Queued);
	harness.provider.set_queue(2);
	assert_eq!(login(&harness.keeper, &credentials()).await.unwrap(), Landing::Idle);

	harness.send(OperatorCommand::Resume).await;
	eventually("renewal scheduler", || harness.keeper.next_renewal().is_some()).await;
	eventually("resume to finish", || !harness.keeper.session().resuming()).await;

	assert_eq!(harness.provider.challenge_serial(), 0);
	assert!(harness.provider.clicks().iter().any(|c| c == "QueueStart"));
	let texts = harness.channel.texts();
	for expected in ["Position 2", "Position 1", notices::QUEUE_CLEARED, notices::STARTED] {
		assert!(texts.iter().any(|t| t == expected), "missing {expected:?} in {texts:?}");
	}
	assert!(!texts.iter().any(|t| t == notices::RESUME_PROMPT));
}
