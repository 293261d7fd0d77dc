//! Operator-facing messaging.
//!
//! The keeper talks to a human operator through an [`OperatorChannel`]: it
//! posts and edits status messages (challenge images among them) and sets a
//! presence line. Answers travel back through the [`ReplyMailbox`], which the
//! expiry watchdog also feeds with synthetic [`Reply::Expired`] events.

use async_trait::async_trait;
use leasekeep_protocol::PresenceStatus;
use tokio::sync::{Mutex, mpsc};

use crate::error::Result;

/// Handle to a message previously posted on the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef(pub u64);

/// A rendered challenge, as PNG bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeImage(Vec<u8>);

impl ChallengeImage {
	pub fn png(data: Vec<u8>) -> Self {
		Self(data)
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}
}

/// Activity line and availability shown to operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presence {
	pub activity: String,
	pub status: PresenceStatus,
}

impl Presence {
	pub fn new(activity: impl Into<String>, status: PresenceStatus) -> Self {
		Self {
			activity: activity.into(),
			status,
		}
	}

	pub fn booting() -> Self {
		Self::new("booting", PresenceStatus::DoNotDisturb)
	}

	pub fn online(activity: impl Into<String>) -> Self {
		Self::new(activity, PresenceStatus::Online)
	}

	pub fn idle(activity: impl Into<String>) -> Self {
		Self::new(activity, PresenceStatus::Idle)
	}
}

/// Outbound side of the operator conversation.
#[async_trait]
pub trait OperatorChannel: Send + Sync {
	async fn post(&self, text: &str, image: Option<&ChallengeImage>) -> Result<MessageRef>;

	/// Replaces the text and attachment of a message. `None` removes any image.
	async fn edit(&self, message: MessageRef, text: &str, image: Option<&ChallengeImage>) -> Result<()>;

	async fn delete(&self, message: MessageRef) -> Result<()>;

	async fn set_presence(&self, presence: &Presence) -> Result<()>;
}

/// Something the challenge workflow waits for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
	Answer(String),
	/// The challenge outlived its lifetime without an answer.
	Expired,
}

/// Single-consumer queue of [`Reply`] values.
pub struct ReplyMailbox {
	tx: mpsc::UnboundedSender<Reply>,
	rx: Mutex<mpsc::UnboundedReceiver<Reply>>,
}

impl Default for ReplyMailbox {
	fn default() -> Self {
		Self::new()
	}
}

impl ReplyMailbox {
	pub fn new() -> Self {
		let (tx, rx) = mpsc::unbounded_channel();
		Self { tx, rx: Mutex::new(rx) }
	}

	pub fn deliver(&self, reply: Reply) {
		// The receiver lives as long as the mailbox.
		let _ = self.tx.send(reply);
	}

	/// Waits for the next reply. `None` only if the mailbox is closing.
	pub async fn next(&self) -> Option<Reply> {
		self.rx.lock().await.recv().await
	}

	/// Drops queued replies and returns how many were discarded.
	pub async fn clear(&self) -> usize {
		let mut rx = self.rx.lock().await;
		let mut dropped = 0;
		while rx.try_recv().is_ok() {
			dropped += 1;
		}
		dropped
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn replies_arrive_in_order() {
		let mailbox = ReplyMailbox::new();
		mailbox.deliver(Reply::Answer("x7kq".to_string()));
		mailbox.deliver(Reply::Expired);
		assert_eq!(mailbox.next().await, Some(Reply::Answer("x7kq".to_string())));
		assert_eq!(mailbox.next().await, Some(Reply::Expired));
	}

	#[tokio::test]
	async fn clear_discards_stale_replies() {
		let mailbox = ReplyMailbox::new();
		mailbox.deliver(Reply::Expired);
		mailbox.deliver(Reply::Answer("late".to_string()));
		assert_eq!(mailbox.clear().await, 2);
		assert_eq!(mailbox.clear().await, 0);
	}
}
