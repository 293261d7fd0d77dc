//! W3C WebDriver request and response bodies.
//!
//! Every WebDriver response wraps its payload in `{"value": ...}`. Failures use
//! the same envelope with an error object:
//!
//! ```json
//! {"value": {"error": "no such element", "message": "Unable to locate element: p.hint"}}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Key under which the driver returns element references.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52f-4a5d7fcb2d92";

/// Special key code points understood by "send keys".
pub mod keys {
	pub const ENTER: char = '\u{E007}';
	pub const TAB: char = '\u{E004}';
	pub const SPACE: char = '\u{E00D}';
}

/// Response envelope shared by every command.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
	pub value: T,
}

/// Error payload returned for failed commands.
#[derive(Debug, Clone, Deserialize)]
pub struct WireError {
	pub error: String,
	#[serde(default)]
	pub message: String,
}

/// Error codes the keeper distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
	NoSuchElement,
	StaleElementReference,
	NoSuchWindow,
	InvalidSessionId,
	Other(String),
}

impl ErrorCode {
	pub fn parse(code: &str) -> Self {
		match code {
			"no such element" => Self::NoSuchElement,
			"stale element reference" => Self::StaleElementReference,
			"no such window" => Self::NoSuchWindow,
			"invalid session id" => Self::InvalidSessionId,
			other => Self::Other(other.to_string()),
		}
	}
}

impl fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::NoSuchElement => f.write_str("no such element"),
			Self::StaleElementReference => f.write_str("stale element reference"),
			Self::NoSuchWindow => f.write_str("no such window"),
			Self::InvalidSessionId => f.write_str("invalid session id"),
			Self::Other(code) => f.write_str(code),
		}
	}
}

/// Result of `POST /session`.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionCreated {
	#[serde(rename = "sessionId")]
	pub session_id: String,
	#[serde(default)]
	pub capabilities: Value,
}

/// Element reference as returned by "find element".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebElement {
	#[serde(rename = "element-6066-11e4-a52f-4a5d7fcb2d92")]
	pub id: String,
}

/// Result of `POST /session/{id}/window/new`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewWindow {
	pub handle: String,
	#[serde(rename = "type", default)]
	pub kind: Option<String>,
}

/// Browser engines with a known capability shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserName {
	#[default]
	Firefox,
	Chrome,
}

impl fmt::Display for BrowserName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Firefox => f.write_str("firefox"),
			Self::Chrome => f.write_str("chrome"),
		}
	}
}

/// Builds the `POST /session` body for the given browser.
pub fn new_session_body(browser: BrowserName, headless: bool) -> Value {
	let always_match = match browser {
		BrowserName::Firefox => {
			let args: Vec<&str> = if headless { vec!["-headless"] } else { Vec::new() };
			json!({ "browserName": "firefox", "moz:firefoxOptions": { "args": args } })
		}
		BrowserName::Chrome => {
			let args: Vec<&str> = if headless { vec!["--headless=new"] } else { Vec::new() };
			json!({ "browserName": "chrome", "goog:chromeOptions": { "args": args } })
		}
	};
	json!({ "capabilities": { "alwaysMatch": always_match } })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn element_reference_uses_w3c_key() {
		let parsed: Envelope<WebElement> = serde_json::from_str(r#"{"value":{"element-6066-11e4-a52f-4a5d7fcb2d92":"e-17"}}"#).unwrap();
		assert_eq!(parsed.value.id, "e-17");
		assert_eq!(serde_json::to_value(&parsed.value).unwrap()[ELEMENT_KEY], "e-17");
	}

	#[test]
	fn error_codes_parse() {
		let parsed: Envelope<WireError> = serde_json::from_str(r#"{"value":{"error":"stale element reference","message":"gone"}}"#).unwrap();
		assert_eq!(ErrorCode::parse(&parsed.value.error), ErrorCode::StaleElementReference);
		assert_eq!(ErrorCode::parse("timeout"), ErrorCode::Other("timeout".to_string()));
	}

	#[test]
	fn headless_firefox_session_body() {
		let body = new_session_body(BrowserName::Firefox, true);
		assert_eq!(body["capabilities"]["alwaysMatch"]["moz:firefoxOptions"]["args"][0], "-headless");
		let body = new_session_body(BrowserName::Chrome, false);
		assert!(body["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["args"].as_array().unwrap().is_empty());
	}
}
