use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::channel::{ChallengeImage, MessageRef, OperatorChannel, Presence};
use crate::error::{KeepError, Result};

/// One call made on a [`RecordingChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
	Posted { id: u64, text: String, image: Option<Vec<u8>> },
	Edited { id: u64, text: String, image: Option<Vec<u8>> },
	Deleted { id: u64 },
	Presence(Presence),
}

#[derive(Default)]
struct Log {
	next_id: u64,
	events: Vec<ChannelEvent>,
	live: BTreeMap<u64, String>,
	max_live: usize,
}

/// [`OperatorChannel`] that keeps every message in memory.
#[derive(Default)]
pub struct RecordingChannel {
	log: Mutex<Log>,
}

impl RecordingChannel {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn events(&self) -> Vec<ChannelEvent> {
		self.log.lock().events.clone()
	}

	/// Every text posted or edited in, in order.
	pub fn texts(&self) -> Vec<String> {
		self.log
			.lock()
			.events
			.iter()
			.filter_map(|event| match event {
				ChannelEvent::Posted { text, .. } | ChannelEvent::Edited { text, .. } => Some(text.clone()),
				_ => None,
			})
			.collect()
	}

	/// Every image attached by a post or edit, in order.
	pub fn images(&self) -> Vec<Vec<u8>> {
		self.log
			.lock()
			.events
			.iter()
			.filter_map(|event| match event {
				ChannelEvent::Posted { image, .. } | ChannelEvent::Edited { image, .. } => image.clone(),
				_ => None,
			})
			.collect()
	}

	pub fn post_count(&self) -> usize {
		self.log.lock().events.iter().filter(|e| matches!(e, ChannelEvent::Posted { .. })).count()
	}

	/// Current text of each message that has not been deleted.
	pub fn live(&self) -> Vec<String> {
		self.log.lock().live.values().cloned().collect()
	}

	/// Most messages ever visible at once.
	pub fn max_live(&self) -> usize {
		self.log.lock().max_live
	}

	pub fn last_presence(&self) -> Option<Presence> {
		self.log.lock().events.iter().rev().find_map(|event| match event {
			ChannelEvent::Presence(presence) => Some(presence.clone()),
			_ => None,
		})
	}
}

#[async_trait]
impl OperatorChannel for RecordingChannel {
	async fn post(&self, text: &str, image: Option<&ChallengeImage>) -> Result<MessageRef> {
		let mut log = self.log.lock();
		log.next_id += 1;
		let id = log.next_id;
		log.live.insert(id, text.to_string());
		log.max_live = log.max_live.max(log.live.len());
		log.events.push(ChannelEvent::Posted {
			id,
			text: text.to_string(),
			image: image.map(|i| i.as_bytes().to_vec()),
		});
		Ok(MessageRef(id))
	}

	async fn edit(&self, message: MessageRef, text: &str, image: Option<&ChallengeImage>) -> Result<()> {
		let mut log = self.log.lock();
		let Some(current) = log.live.get_mut(&message.0) else {
			return Err(KeepError::Channel(format!("message {} does not exist", message.0)));
		};
		*current = text.to_string();
		log.events.push(ChannelEvent::Edited {
			id: message.0,
			text: text.to_string(),
			image: image.map(|i| i.as_bytes().to_vec()),
		});
		Ok(())
	}

	async fn delete(&self, message: MessageRef) -> Result<()> {
		let mut log = self.log.lock();
		if log.live.remove(&message.0).is_none() {
			return Err(KeepError::Channel(format!("message {} does not exist", message.0)));
		}
		log.events.push(ChannelEvent::Deleted { id: message.0 });
		Ok(())
	}

	async fn set_presence(&self, presence: &Presence) -> Result<()> {
		self.log.lock().events.push(ChannelEvent::Presence(presence.clone()));
		Ok(())
	}
}
