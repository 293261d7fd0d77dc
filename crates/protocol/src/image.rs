//! Binary image payloads carried inside JSON frames.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An image encoded as base64 on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
	/// MIME type, `image/png` for element screenshots.
	pub mime: String,
	#[serde(serialize_with = "encode", deserialize_with = "decode")]
	pub data: Vec<u8>,
}

impl ImagePayload {
	pub fn png(data: Vec<u8>) -> Self {
		Self {
			mime: "image/png".to_string(),
			data,
		}
	}
}

fn encode<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
	serializer.serialize_str(&STANDARD.encode(data))
}

fn decode<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
	let encoded = String::deserialize(deserializer)?;
	STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
}
