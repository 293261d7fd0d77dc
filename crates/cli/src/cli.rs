use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use leasekeep_protocol::webdriver::BrowserName;

/// Default WebDriver endpoint (geckodriver's default port).
pub const DEFAULT_WEBDRIVER: &str = "http://127.0.0.1:4444";

#[derive(Parser, Debug)]
#[command(name = "leasekeep")]
#[command(about = "Keep a challenge-gated hosted server leased")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Operator control socket
	#[arg(long, global = true, env = "LEASEKEEP_SOCKET", value_name = "PATH")]
	pub socket: Option<PathBuf>,

	/// Name reported to the keeper with every command
	#[arg(long, global = true, env = "LEASEKEEP_OPERATOR")]
	pub operator: Option<String>,

	#[command(subcommand)]
	pub command: Commands,
}

impl Cli {
	pub fn socket_path(&self) -> PathBuf {
		self.socket.clone().unwrap_or_else(default_socket)
	}

	pub fn operator_name(&self) -> String {
		self.operator
			.clone()
			.or_else(|| std::env::var("USER").ok())
			.unwrap_or_else(|| "operator".to_string())
	}
}

/// `<runtime dir>/leasekeep.sock`, falling back to the temp dir.
pub fn default_socket() -> PathBuf {
	dirs::runtime_dir().unwrap_or_else(std::env::temp_dir).join("leasekeep.sock")
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Sign in and keep the server leased until shut down
	Run(RunArgs),

	/// Bring an idle server back (solves the resume challenge)
	Resume,

	/// Answer the outstanding challenge
	#[command(alias = "a")]
	Answer { text: String },

	/// Run a console command and show the latest console lines
	#[command(alias = "con")]
	Console {
		/// Command to type; omit to only read the console
		#[arg(trailing_var_arg = true, allow_hyphen_values = true)]
		command: Vec<String>,
	},

	/// Power the server on
	Start,

	/// Power the server off
	Stop,

	/// Restart the server
	Restart,

	/// Stop the keeper (owner only)
	Shutdown,

	/// Show lease state and timers
	Status,

	/// Follow operator messages as they are posted
	Watch {
		/// Directory to save challenge images into
		#[arg(long, value_name = "DIR")]
		images: Option<PathBuf>,
	},
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
	/// JSON config file
	#[arg(short, long, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// WebDriver endpoint (geckodriver or chromedriver)
	#[arg(long, env = "LEASEKEEP_WEBDRIVER", default_value = DEFAULT_WEBDRIVER)]
	pub webdriver: String,

	/// Browser the driver should launch
	#[arg(short, long, value_enum, default_value = "firefox")]
	pub browser: BrowserKind,

	/// Show the browser window
	#[arg(long)]
	pub headful: bool,

	/// Panel account email
	#[arg(long, env = "LEASEKEEP_EMAIL")]
	pub email: Option<String>,

	/// Panel account password
	#[arg(long, env = "LEASEKEEP_PASSWORD", hide_env_values = true)]
	pub password: Option<String>,

	/// Operator allowed to use the console and shut down
	#[arg(long, env = "LEASEKEEP_OWNER")]
	pub owner: Option<String>,

	/// Server identifier in panel URLs
	#[arg(long, env = "LEASEKEEP_SERVER_ID")]
	pub server_id: Option<String>,

	/// Panel base URL
	#[arg(long, env = "LEASEKEEP_BASE_URL")]
	pub base_url: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum BrowserKind {
	#[default]
	Firefox,
	Chrome,
}

impl From<BrowserKind> for BrowserName {
	fn from(kind: BrowserKind) -> Self {
		match kind {
			BrowserKind::Firefox => BrowserName::Firefox,
			BrowserKind::Chrome => BrowserName::Chrome,
		}
	}
}
