//! Run configuration.
//!
//! Settings come from three layers: command-line flags (and their
//! environment variables), an optional JSON config file, then built-in
//! defaults. The first layer that sets a value wins.
//!
//! ```json
//! {
//!   "serverId": "13479479",
//!   "owner": "alice",
//!   "timing": { "safetyMarginMins": 12, "settleMs": 750 },
//!   "selectors": { "leaseTimer": { "using": "css selector", "value": "p.hint" } }
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use leasekeep::{Credentials, DEFAULT_BASE_URL, PanelLayout, Selectors, Timing};
use leasekeep_runtime::DriverOptions;
use serde::Deserialize;

use crate::cli::RunArgs;
use crate::error::{CliError, Result};

/// Keystroke pacing used with a visible browser unless the file sets one.
pub const HEADFUL_KEYSTROKE_DELAY: Duration = Duration::from_millis(100);

/// The JSON config file. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct FileConfig {
	pub base_url: Option<String>,
	pub server_id: Option<String>,
	pub owner: Option<String>,
	pub timing: TimingOverrides,
	pub selectors: Option<Selectors>,
}

impl FileConfig {
	pub fn load(path: &Path) -> Result<Self> {
		let raw = std::fs::read_to_string(path)?;
		serde_json::from_str(&raw).map_err(|source| CliError::ConfigFile {
			path: path.to_path_buf(),
			source,
		})
	}
}

/// Timer and pause overrides, in the units their names carry.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct TimingOverrides {
	pub integrity_period_secs: Option<u64>,
	pub watchdog_period_secs: Option<u64>,
	pub safety_margin_mins: Option<u32>,
	pub grace_secs: Option<u64>,
	pub poll_secs: Option<u64>,
	pub settle_ms: Option<u64>,
	pub transfer_settle_secs: Option<u64>,
	pub keystroke_delay_ms: Option<u64>,
	pub max_attempts: Option<u32>,
}

impl TimingOverrides {
	pub fn apply(self, base: Timing) -> Timing {
		let secs = |value: Option<u64>, default: Duration| value.map_or(default, Duration::from_secs);
		let millis = |value: Option<u64>, default: Duration| value.map_or(default, Duration::from_millis);
		Timing {
			integrity_period: secs(self.integrity_period_secs, base.integrity_period),
			watchdog_period: secs(self.watchdog_period_secs, base.watchdog_period),
			safety_margin_mins: self.safety_margin_mins.unwrap_or(base.safety_margin_mins),
			grace: secs(self.grace_secs, base.grace),
			poll: secs(self.poll_secs, base.poll),
			settle: millis(self.settle_ms, base.settle),
			transfer_settle: secs(self.transfer_settle_secs, base.transfer_settle),
			keystroke_delay: millis(self.keystroke_delay_ms, base.keystroke_delay),
			max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
		}
	}
}

/// Everything `run` needs, resolved across the layers.
#[derive(Debug, Clone)]
pub struct Settings {
	pub webdriver: String,
	pub driver: DriverOptions,
	pub credentials: Credentials,
	pub owner: String,
	pub layout: PanelLayout,
	pub timing: Timing,
}

impl Settings {
	/// Loads the config file named by `args`, if any, and resolves.
	pub fn from_args(args: &RunArgs) -> Result<Self> {
		let file = match &args.config {
			Some(path) => FileConfig::load(path)?,
			None => FileConfig::default(),
		};
		Self::resolve(args, file)
	}

	pub fn resolve(args: &RunArgs, file: FileConfig) -> Result<Self> {
		let email = required(args.email.clone(), "email (--email or LEASEKEEP_EMAIL)")?;
		let password = required(args.password.clone(), "password (--password or LEASEKEEP_PASSWORD)")?;
		let server_id = required(
			args.server_id.clone().or(file.server_id),
			"server id (--server-id, LEASEKEEP_SERVER_ID or serverId)",
		)?;
		let owner = required(args.owner.clone().or(file.owner), "owner (--owner, LEASEKEEP_OWNER or owner)")?;
		let base_url = args
			.base_url
			.clone()
			.or(file.base_url)
			.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

		let mut layout = PanelLayout::new(&base_url, server_id);
		if let Some(selectors) = file.selectors {
			layout = layout.with_selectors(selectors);
		}

		let paced = args.headful && file.timing.keystroke_delay_ms.is_none();
		let mut timing = file.timing.apply(Timing::default());
		if paced {
			timing.keystroke_delay = HEADFUL_KEYSTROKE_DELAY;
		}

		Ok(Self {
			webdriver: args.webdriver.clone(),
			driver: DriverOptions {
				browser: args.browser.into(),
				headless: !args.headful,
			},
			credentials: Credentials { email, password },
			owner,
			layout,
			timing,
		})
	}
}

fn required(value: Option<String>, what: &str) -> Result<String> {
	value
		.filter(|v| !v.trim().is_empty())
		.ok_or_else(|| CliError::Config(format!("missing {what}")))
}
