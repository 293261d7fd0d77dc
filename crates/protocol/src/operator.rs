//! Operator control socket frames.
//!
//! Each frame is one JSON object on its own line. A client sends one
//! [`OperatorRequest`]; a `command` request is answered with exactly one
//! [`OperatorEvent::Response`], a `subscribe` request turns the connection into
//! a feed of message and presence events.

use serde::{Deserialize, Serialize};

use crate::ImagePayload;

/// Request sent by an operator client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperatorRequest {
	Command { operator: String, command: OperatorCommand },
	Subscribe,
}

/// Commands an operator can issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum OperatorCommand {
	Resume,
	Answer { text: String },
	Console {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		command: Option<String>,
	},
	Start,
	Stop,
	Restart,
	Shutdown,
	Status,
}

impl OperatorCommand {
	/// Stable name used in logs.
	pub fn name(&self) -> &'static str {
		match self {
			Self::Resume => "resume",
			Self::Answer { .. } => "answer",
			Self::Console { .. } => "console",
			Self::Start => "start",
			Self::Stop => "stop",
			Self::Restart => "restart",
			Self::Shutdown => "shutdown",
			Self::Status => "status",
		}
	}
}

/// Availability shown next to the activity text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
	Online,
	Idle,
	DoNotDisturb,
}

/// Frame sent from the keeper to operator clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperatorEvent {
	Response {
		text: String,
		ephemeral: bool,
	},
	Posted {
		id: u64,
		text: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		image: Option<ImagePayload>,
	},
	Edited {
		id: u64,
		text: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		image: Option<ImagePayload>,
	},
	Deleted {
		id: u64,
	},
	Presence {
		activity: String,
		status: PresenceStatus,
	},
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn answer_command_frame_shape() {
		let request = OperatorRequest::Command {
			operator: "alice".to_string(),
			command: OperatorCommand::Answer { text: "x7kq".to_string() },
		};
		let value = serde_json::to_value(&request).unwrap();
		assert_eq!(
			value,
			json!({"type": "command", "operator": "alice", "command": {"name": "answer", "text": "x7kq"}})
		);
	}

	#[test]
	fn console_command_defaults_to_no_input() {
		let parsed: OperatorRequest = serde_json::from_str(r#"{"type":"command","operator":"o","command":{"name":"console"}}"#).unwrap();
		assert_eq!(
			parsed,
			OperatorRequest::Command {
				operator: "o".to_string(),
				command: OperatorCommand::Console { command: None },
			}
		);
	}

	#[test]
	fn edited_event_without_image_omits_field() {
		let event = OperatorEvent::Edited {
			id: 3,
			text: ":thumbsup:".to_string(),
			image: None,
		};
		let value = serde_json::to_value(&event).unwrap();
		assert!(value.get("image").is_none());
		assert_eq!(value["type"], "edited");
	}
}
