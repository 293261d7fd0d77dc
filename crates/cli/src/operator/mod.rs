//! The operator channel over a local control socket.
//!
//! [`SocketChannel`] is the keeper's [`OperatorChannel`]: every post, edit,
//! delete and presence change becomes an [`OperatorEvent`] broadcast to the
//! subscribed clients. Messages still up are replayed to late subscribers, so
//! an operator who connects mid-challenge still gets the image.

pub mod client;
pub mod server;

use std::collections::BTreeMap;

use async_trait::async_trait;
use leasekeep::{ChallengeImage, KeepError, MessageRef, OperatorChannel, Presence, Result};
use leasekeep_protocol::{ImagePayload, OperatorEvent};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Loopback port used instead of a Unix socket on Windows.
#[cfg(windows)]
pub const OPERATOR_TCP_PORT: u16 = 19_247;

const EVENT_BUFFER: usize = 64;

#[derive(Default)]
struct Board {
	next_id: u64,
	live: BTreeMap<u64, (String, Option<ImagePayload>)>,
	presence: Option<Presence>,
}

pub struct SocketChannel {
	events: broadcast::Sender<OperatorEvent>,
	board: Mutex<Board>,
}

impl Default for SocketChannel {
	fn default() -> Self {
		Self::new()
	}
}

impl SocketChannel {
	pub fn new() -> Self {
		let (events, _) = broadcast::channel(EVENT_BUFFER);
		Self {
			events,
			board: Mutex::new(Board::default()),
		}
	}

	/// Subscribes to future events and returns the backlog a new client needs:
	/// the current presence, then every live message as a post.
	pub fn subscribe(&self) -> (Vec<OperatorEvent>, broadcast::Receiver<OperatorEvent>) {
		let board = self.board.lock();
		let receiver = self.events.subscribe();
		let mut backlog = Vec::with_capacity(board.live.len() + 1);
		if let Some(presence) = &board.presence {
			backlog.push(presence_event(presence));
		}
		for (id, (text, image)) in &board.live {
			backlog.push(OperatorEvent::Posted {
				id: *id,
				text: text.clone(),
				image: image.clone(),
			});
		}
		(backlog, receiver)
	}

	pub fn live_messages(&self) -> usize {
		self.board.lock().live.len()
	}

	/// Callers hold the board lock so a concurrent subscribe sees each change
	/// either in its backlog or on its receiver, never both.
	fn publish(&self, event: OperatorEvent) {
		// No subscriber is not an error: the board keeps what late clients need.
		if self.events.send(event).is_err() {
			trace!(target = "leasekeep.operator", "no subscribers");
		}
	}
}

fn presence_event(presence: &Presence) -> OperatorEvent {
	OperatorEvent::Presence {
		activity: presence.activity.clone(),
		status: presence.status,
	}
}

fn payload(image: Option<&ChallengeImage>) -> Option<ImagePayload> {
	image.map(|i| ImagePayload::png(i.as_bytes().to_vec()))
}

#[async_trait]
impl OperatorChannel for SocketChannel {
	async fn post(&self, text: &str, image: Option<&ChallengeImage>) -> Result<MessageRef> {
		let image = payload(image);
		let mut board = self.board.lock();
		board.next_id += 1;
		let id = board.next_id;
		board.live.insert(id, (text.to_string(), image.clone()));
		self.publish(OperatorEvent::Posted {
			id,
			text: text.to_string(),
			image,
		});
		debug!(target = "leasekeep.operator", message = id, "message posted");
		Ok(MessageRef(id))
	}

	async fn edit(&self, message: MessageRef, text: &str, image: Option<&ChallengeImage>) -> Result<()> {
		let image = payload(image);
		let mut board = self.board.lock();
		let Some(current) = board.live.get_mut(&message.0) else {
			return Err(KeepError::Channel(format!("message {} does not exist", message.0)));
		};
		*current = (text.to_string(), image.clone());
		self.publish(OperatorEvent::Edited {
			id: message.0,
			text: text.to_string(),
			image,
		});
		Ok(())
	}

	async fn delete(&self, message: MessageRef) -> Result<()> {
		let mut board = self.board.lock();
		if board.live.remove(&message.0).is_none() {
			return Err(KeepError::Channel(format!("message {} does not exist", message.0)));
		}
		self.publish(OperatorEvent::Deleted { id: message.0 });
		debug!(target = "leasekeep.operator", message = message.0, "message deleted");
		Ok(())
	}

	async fn set_presence(&self, presence: &Presence) -> Result<()> {
		let mut board = self.board.lock();
		board.presence = Some(presence.clone());
		self.publish(presence_event(presence));
		Ok(())
	}
}
