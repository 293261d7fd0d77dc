//! Minimal W3C WebDriver client.
//!
//! Covers the commands needed to drive a hosting control panel: navigation,
//! element lookup and interaction, element screenshots and window handling.
//! One [`WebDriver`] owns one remote browser session.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use leasekeep_protocol::Selector;
use leasekeep_protocol::webdriver::{BrowserName, Envelope, ErrorCode, NewWindow, SessionCreated, WebElement, WireError, new_session_body};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, trace};
use url::Url;

use crate::error::{DriverError, Result};

/// Options used when creating the browser session.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverOptions {
	pub browser: BrowserName,
	pub headless: bool,
}

/// A live WebDriver session.
#[derive(Debug, Clone)]
pub struct WebDriver {
	http: reqwest::Client,
	session: Url,
	session_id: String,
}

impl WebDriver {
	/// Creates a new browser session on the driver at `endpoint`.
	pub async fn connect(endpoint: &str, options: DriverOptions) -> Result<Self> {
		let mut base = Url::parse(endpoint)?;
		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());
			base.set_path(&path);
		}
		let http = reqwest::Client::new();
		let body = new_session_body(options.browser, options.headless);
		let created: SessionCreated = send(&http, Method::POST, base.join("session")?, Some(body)).await?;
		let session = base.join(&format!("session/{}/", created.session_id))?;
		debug!(
			target = "leasekeep.webdriver",
			%endpoint,
			session_id = %created.session_id,
			browser = %options.browser,
			headless = options.headless,
			"webdriver session created"
		);
		Ok(Self {
			http,
			session,
			session_id: created.session_id,
		})
	}

	pub fn session_id(&self) -> &str {
		&self.session_id
	}

	/// Ends the browser session.
	pub async fn quit(&self) -> Result<()> {
		let url = self.session.join("..")?;
		let url = url.join(&self.session_id)?;
		let _: Value = send(&self.http, Method::DELETE, url, None).await?;
		debug!(target = "leasekeep.webdriver", session_id = %self.session_id, "webdriver session closed");
		Ok(())
	}

	pub async fn navigate(&self, url: &str) -> Result<()> {
		self.command::<Value>(Method::POST, "url", Some(json!({ "url": url }))).await.map(drop)
	}

	pub async fn current_url(&self) -> Result<String> {
		self.command(Method::GET, "url", None).await
	}

	pub async fn refresh(&self) -> Result<()> {
		self.command::<Value>(Method::POST, "refresh", Some(json!({}))).await.map(drop)
	}

	pub async fn find_element(&self, selector: &Selector) -> Result<String> {
		let element: WebElement = self.command(Method::POST, "element", Some(serde_json::to_value(selector)?)).await?;
		Ok(element.id)
	}

	pub async fn find_elements(&self, selector: &Selector) -> Result<Vec<String>> {
		let elements: Vec<WebElement> = self.command(Method::POST, "elements", Some(serde_json::to_value(selector)?)).await?;
		Ok(elements.into_iter().map(|e| e.id).collect())
	}

	pub async fn click(&self, element: &str) -> Result<()> {
		self.command::<Value>(Method::POST, &format!("element/{element}/click"), Some(json!({})))
			.await
			.map(drop)
	}

	pub async fn send_keys(&self, element: &str, text: &str) -> Result<()> {
		self.command::<Value>(Method::POST, &format!("element/{element}/value"), Some(json!({ "text": text })))
			.await
			.map(drop)
	}

	/// Rendered text of an element.
	pub async fn text(&self, element: &str) -> Result<String> {
		self.command(Method::GET, &format!("element/{element}/text"), None).await
	}

	pub async fn attribute(&self, element: &str, name: &str) -> Result<Option<String>> {
		let value: Value = self.command(Method::GET, &format!("element/{element}/attribute/{name}"), None).await?;
		Ok(value_to_string(value))
	}

	/// Captures a PNG of a single element.
	pub async fn element_screenshot(&self, element: &str) -> Result<Vec<u8>> {
		let encoded: String = self.command(Method::GET, &format!("element/{element}/screenshot"), None).await?;
		Ok(STANDARD.decode(encoded.as_bytes())?)
	}

	/// Opens a new tab and returns its handle. Focus stays on the current tab.
	pub async fn new_window(&self) -> Result<String> {
		let window: NewWindow = self.command(Method::POST, "window/new", Some(json!({ "type": "tab" }))).await?;
		Ok(window.handle)
	}

	pub async fn window_handle(&self) -> Result<String> {
		self.command(Method::GET, "window", None).await
	}

	pub async fn switch_window(&self, handle: &str) -> Result<()> {
		self.command::<Value>(Method::POST, "window", Some(json!({ "handle": handle })))
			.await
			.map(drop)
	}

	/// Closes the focused tab. The caller must switch to another handle afterwards.
	pub async fn close_window(&self) -> Result<()> {
		self.command::<Value>(Method::DELETE, "window", None).await.map(drop)
	}

	async fn command<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T> {
		let url = self.session.join(path)?;
		send(&self.http, method, url, body).await
	}
}

async fn send<T: DeserializeOwned>(http: &reqwest::Client, method: Method, url: Url, body: Option<Value>) -> Result<T> {
	trace!(target = "leasekeep.webdriver", method = method.as_str(), url = url.as_str(), "command");
	let mut request = http.request(method, url);
	if let Some(body) = body {
		request = request.json(&body);
	}
	let response = request.send().await?;
	let status = response.status();
	let text = response.text().await?;

	if status.is_success() {
		let envelope: Envelope<T> = serde_json::from_str(&text)?;
		return Ok(envelope.value);
	}

	match serde_json::from_str::<Envelope<WireError>>(&text) {
		Ok(envelope) => Err(DriverError::Protocol {
			code: ErrorCode::parse(&envelope.value.error),
			message: envelope.value.message,
		}),
		Err(_) => Err(DriverError::Status {
			status: status.as_u16(),
			body: text,
		}),
	}
}

fn value_to_string(value: Value) -> Option<String> {
	match value {
		Value::Null => None,
		Value::String(s) => Some(s),
		other => Some(other.to_string()),
	}
}
