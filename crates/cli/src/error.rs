use std::path::PathBuf;

use leasekeep::KeepError;
use leasekeep_runtime::DriverError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("configuration: {0}")]
	Config(String),

	#[error("config file {path}: {source}")]
	ConfigFile {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error(transparent)]
	Keep(#[from] KeepError),

	#[error(transparent)]
	Driver(#[from] DriverError),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;
