//! Where things live on the provider's control panel.
//!
//! [`PanelLayout`] turns a base URL and server id into the page URLs the
//! keeper visits, and carries the [`Selectors`] used to find elements on them.
//! Every selector can be overridden from the configuration file.

use leasekeep_protocol::Selector;
use serde::{Deserialize, Serialize};

/// Label of the home-page button while the server is running.
pub const CONTROL_PANEL_LABEL: &str = "Control Panel";

/// Prefix of the transfer heading while the server moves between nodes.
pub const TRANSFERRING_PREFIX: &str = "Transferring";

/// Default provider base URL.
pub const DEFAULT_BASE_URL: &str = "https://server.pro/";

/// Element selectors, one per element the keeper touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Selectors {
	pub email_input: Selector,
	pub password_input: Selector,
	/// Sign-in button on the login page; resume or control-panel button on home.
	pub primary_button: Selector,
	pub queue_position: Selector,
	pub queue_start: Selector,
	pub transfer_heading: Selector,
	pub lease_timer: Selector,
	pub renew_link: Selector,
	pub resume_challenge_image: Selector,
	pub modal_challenge_image: Selector,
	pub challenge_input: Selector,
	pub challenge_submit: Selector,
	pub challenge_error_banner: Selector,
	pub modal_close: Selector,
	pub console_input: Selector,
	pub console_lines: Selector,
	pub power_on: Selector,
	pub power_off: Selector,
	pub power_restart: Selector,
	pub images: Selector,
}

impl Default for Selectors {
	fn default() -> Self {
		Self {
			email_input: Selector::id("input-email"),
			password_input: Selector::id("input-password"),
			primary_button: Selector::css("button.button-primary"),
			queue_position: Selector::css("p.percentage"),
			queue_start: Selector::css("button.button-positive.mt-1"),
			transfer_heading: Selector::css("div.col-xl-7.col-lg-8.col-sm-6.col-6.mb-3.mb-lg-0 h4"),
			lease_timer: Selector::css("div.margin-tiny p.hint"),
			renew_link: Selector::css("div.margin-tiny a.action"),
			resume_challenge_image: Selector::css("div.col-md-9.mb-5 div img"),
			modal_challenge_image: Selector::css("div.modal div.content div img"),
			challenge_input: Selector::xpath(r#"//div[@class="form-group-foot"]//input[@type="text"]"#),
			challenge_submit: Selector::css("button.button-positive"),
			challenge_error_banner: Selector::css("div.alert.negative div.head div.subhead"),
			modal_close: Selector::css("div.controls"),
			console_input: Selector::xpath(r#"//input[@name="text"]"#),
			console_lines: Selector::css("div.lines p"),
			power_on: Selector::css("div.button-power.power-on"),
			power_off: Selector::css("div.button-power.power-off"),
			power_restart: Selector::css("div.button-power.restart"),
			images: Selector::tag("img"),
		}
	}
}

/// Page URLs and selectors for one hosted server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelLayout {
	base: String,
	server_id: String,
	pub selectors: Selectors,
}

impl PanelLayout {
	pub fn new(base_url: &str, server_id: impl Into<String>) -> Self {
		Self {
			base: base_url.trim_end_matches('/').to_string(),
			server_id: server_id.into(),
			selectors: Selectors::default(),
		}
	}

	pub fn with_selectors(mut self, selectors: Selectors) -> Self {
		self.selectors = selectors;
		self
	}

	pub fn server_id(&self) -> &str {
		&self.server_id
	}

	pub fn home_url(&self) -> String {
		format!("{}/", self.base)
	}

	pub fn login_url(&self) -> String {
		format!("{}/login", self.base)
	}

	pub fn server_url(&self) -> String {
		format!("{}/{}", self.base, self.server_id)
	}

	pub fn console_url(&self) -> String {
		format!("{}/{}/console", self.base, self.server_id)
	}

	pub fn queue_url(&self) -> String {
		format!("{}/queue", self.base)
	}

	pub fn resume_url(&self) -> String {
		format!("{}/{}/resume", self.base, self.server_id)
	}

	/// `src` prefix of the image shown after a wrong answer.
	pub fn retry_image_prefix(&self) -> String {
		format!("{}/api/captcha/get?", self.base)
	}

	pub fn classify(&self, url: &str) -> Location {
		Location::classify(url, self)
	}
}

/// Which panel page a URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
	Login,
	Home,
	Console,
	/// A page showing the resume challenge.
	Resume,
	Queue,
	Server,
	Other,
}

impl Location {
	pub fn classify(url: &str, layout: &PanelLayout) -> Self {
		let url = url.split(['?', '#']).next().unwrap_or(url);
		let Some(path) = url.strip_prefix(&layout.base) else {
			return Self::Other;
		};
		if path.is_empty() || path == "/" {
			return Self::Home;
		}
		if path.contains("resume") {
			Self::Resume
		} else if path.contains("console") {
			Self::Console
		} else if path.contains("queue") {
			Self::Queue
		} else if path == "/login" {
			Self::Login
		} else if path.trim_end_matches('/') == format!("/{}", layout.server_id) {
			Self::Server
		} else {
			Self::Other
		}
	}
}
