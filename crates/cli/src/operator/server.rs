//! Control socket server.
//!
//! Each connection speaks newline-delimited JSON. `command` requests are
//! answered one response line each, any number per connection; a `subscribe`
//! request turns the connection into an event feed until the client leaves.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use leasekeep::CommandDispatcher;
use leasekeep_protocol::{OperatorEvent, OperatorRequest};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
#[cfg(windows)]
use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::net::UnixListener;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::SocketChannel;
use crate::error::Result;

/// A bound control socket. The socket file is removed on drop.
pub struct OperatorListener {
	#[cfg(unix)]
	listener: UnixListener,
	#[cfg(windows)]
	listener: TcpListener,
	path: PathBuf,
}

impl OperatorListener {
	/// Binds `path`, replacing a stale socket left by an earlier run.
	#[cfg(unix)]
	pub async fn bind(path: &Path) -> Result<Self> {
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		if path.exists() {
			std::fs::remove_file(path)?;
		}
		let listener = UnixListener::bind(path)?;
		info!(target = "leasekeep.operator", socket = %path.display(), "operator socket listening");
		Ok(Self {
			listener,
			path: path.to_path_buf(),
		})
	}

	#[cfg(windows)]
	pub async fn bind(path: &Path) -> Result<Self> {
		let listener = TcpListener::bind(("127.0.0.1", super::OPERATOR_TCP_PORT)).await?;
		info!(target = "leasekeep.operator", port = super::OPERATOR_TCP_PORT, "operator socket listening");
		Ok(Self {
			listener,
			path: path.to_path_buf(),
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Accepts connections until the task is dropped or accepting fails.
	pub async fn serve(self, dispatcher: Arc<CommandDispatcher>, channel: Arc<SocketChannel>) -> Result<()> {
		loop {
			let (stream, _addr) = self.listener.accept().await?;
			debug!(target = "leasekeep.operator", "client connected");
			let dispatcher = Arc::clone(&dispatcher);
			let channel = Arc::clone(&channel);
			tokio::spawn(async move {
				if let Err(err) = handle_connection(stream, dispatcher, channel).await {
					debug!(target = "leasekeep.operator", error = %err, "client connection ended");
				}
			});
		}
	}
}

impl Drop for OperatorListener {
	fn drop(&mut self) {
		#[cfg(unix)]
		let _ = std::fs::remove_file(&self.path);
	}
}

pub async fn handle_connection<S>(stream: S, dispatcher: Arc<CommandDispatcher>, channel: Arc<SocketChannel>) -> Result<()>
where
	S: AsyncRead + AsyncWrite + Unpin,
{
	let (reader, mut writer) = tokio::io::split(stream);
	let mut lines = BufReader::new(reader).lines();

	while let Some(line) = lines.next_line().await? {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}
		let request = match serde_json::from_str::<OperatorRequest>(line) {
			Ok(request) => request,
			Err(err) => {
				warn!(target = "leasekeep.operator", error = %err, "invalid operator request");
				let reply = OperatorEvent::Response {
					text: format!("invalid request: {err}"),
					ephemeral: true,
				};
				write_event(&mut writer, &reply).await?;
				continue;
			}
		};

		match request {
			OperatorRequest::Command { operator, command } => {
				let response = dispatcher.dispatch(&operator, command).await;
				let reply = OperatorEvent::Response {
					text: response.text,
					ephemeral: response.ephemeral,
				};
				write_event(&mut writer, &reply).await?;
			}
			OperatorRequest::Subscribe => return stream_events(&mut writer, &channel).await,
		}
	}
	Ok(())
}

async fn stream_events<W>(writer: &mut W, channel: &SocketChannel) -> Result<()>
where
	W: AsyncWrite + Unpin,
{
	let (backlog, mut events) = channel.subscribe();
	debug!(target = "leasekeep.operator", backlog = backlog.len(), "client subscribed");
	for event in &backlog {
		write_event(writer, event).await?;
	}
	loop {
		match events.recv().await {
			Ok(event) => write_event(writer, &event).await?,
			Err(RecvError::Lagged(missed)) => {
				warn!(target = "leasekeep.operator", missed, "subscriber fell behind");
			}
			Err(RecvError::Closed) => return Ok(()),
		}
	}
}

async fn write_event<W>(writer: &mut W, event: &OperatorEvent) -> Result<()>
where
	W: AsyncWrite + Unpin,
{
	let mut payload = serde_json::to_vec(event)?;
	payload.push(b'\n');
	writer.write_all(&payload).await?;
	writer.flush().await?;
	Ok(())
}
