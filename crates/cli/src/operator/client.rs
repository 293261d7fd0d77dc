//! Control socket client used by the operator subcommands.

use std::path::Path;

use anyhow::{Context, anyhow, bail};
use colored::Colorize;
use leasekeep_protocol::{OperatorCommand, OperatorEvent, OperatorRequest, PresenceStatus};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
#[cfg(windows)]
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;

/// Keeper reply to one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
	pub text: String,
	pub ephemeral: bool,
}

#[cfg(unix)]
async fn connect(socket: &Path) -> std::io::Result<UnixStream> {
	UnixStream::connect(socket).await
}

#[cfg(windows)]
async fn connect(_socket: &Path) -> std::io::Result<TcpStream> {
	TcpStream::connect(("127.0.0.1", super::OPERATOR_TCP_PORT)).await
}

fn is_not_running(err: &std::io::Error) -> bool {
	matches!(
		err.kind(),
		std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused
	)
}

async fn connect_keeper(socket: &Path) -> anyhow::Result<impl AsyncRead + AsyncWrite + Unpin> {
	match connect(socket).await {
		Ok(stream) => Ok(stream),
		Err(err) if is_not_running(&err) => Err(anyhow!("keeper not running (no socket at {})", socket.display())),
		Err(err) => Err(err).with_context(|| format!("Failed connecting to {}", socket.display())),
	}
}

/// Sends one command and waits for the keeper's reply.
pub async fn send_command(socket: &Path, operator: &str, command: OperatorCommand) -> anyhow::Result<Reply> {
	let stream = connect_keeper(socket).await?;
	let request = OperatorRequest::Command {
		operator: operator.to_string(),
		command,
	};
	match send_request_stream(stream, &request).await? {
		OperatorEvent::Response { text, ephemeral } => Ok(Reply { text, ephemeral }),
		other => bail!("unexpected keeper frame: {other:?}"),
	}
}

pub async fn send_request_stream<S>(mut stream: S, request: &OperatorRequest) -> anyhow::Result<OperatorEvent>
where
	S: AsyncRead + AsyncWrite + Unpin,
{
	write_request(&mut stream, request).await?;

	let mut reader = BufReader::new(stream);
	let mut line = String::new();
	let read = reader.read_line(&mut line).await.context("Failed reading keeper response")?;
	if read == 0 {
		bail!("keeper closed the connection without answering");
	}
	serde_json::from_str(&line).context("Failed parsing keeper response")
}

async fn write_request<S>(stream: &mut S, request: &OperatorRequest) -> anyhow::Result<()>
where
	S: AsyncWrite + Unpin,
{
	let payload = serde_json::to_string(request).context("Failed to serialize operator request")?;
	stream
		.write_all(format!("{payload}\n").as_bytes())
		.await
		.context("Failed writing operator request")?;
	stream.flush().await.context("Failed flushing operator request")?;
	Ok(())
}

/// Follows the keeper's message feed, printing each event.
pub async fn watch(socket: &Path, images: Option<&Path>) -> anyhow::Result<()> {
	let stream = connect_keeper(socket).await?;
	watch_stream(stream, images, |line| println!("{line}")).await
}

/// Subscribes on `stream` and hands each rendered event to `print` until the
/// keeper closes the feed. Image attachments are saved under `images`.
pub async fn watch_stream<S, F>(mut stream: S, images: Option<&Path>, mut print: F) -> anyhow::Result<()>
where
	S: AsyncRead + AsyncWrite + Unpin,
	F: FnMut(String),
{
	if let Some(dir) = images {
		tokio::fs::create_dir_all(dir)
			.await
			.with_context(|| format!("Failed creating {}", dir.display()))?;
	}
	write_request(&mut stream, &OperatorRequest::Subscribe).await?;

	let mut lines = BufReader::new(stream).lines();
	while let Some(line) = lines.next_line().await.context("Failed reading keeper feed")? {
		if line.trim().is_empty() {
			continue;
		}
		let event: OperatorEvent = serde_json::from_str(&line).context("Failed parsing keeper event")?;
		let saved = match (images, &event) {
			(Some(dir), OperatorEvent::Posted { id, image: Some(image), .. })
			| (Some(dir), OperatorEvent::Edited { id, image: Some(image), .. }) => {
				let path = dir.join(format!("challenge-{id}.png"));
				tokio::fs::write(&path, &image.data)
					.await
					.with_context(|| format!("Failed writing {}", path.display()))?;
				Some(path)
			}
			_ => None,
		};
		let mut rendered = render(&event);
		if let Some(path) = saved {
			rendered.push_str(&format!(" {}", format!("(saved {})", path.display()).dimmed()));
		}
		print(rendered);
	}
	Ok(())
}

/// One-line rendering of a feed event.
pub fn render(event: &OperatorEvent) -> String {
	match event {
		OperatorEvent::Posted { id, text, image } => {
			format!("{} {}{}", format!("#{id}").cyan(), text, attachment(image.is_some()))
		}
		OperatorEvent::Edited { id, text, image } => {
			format!("{} {}{}", format!("#{id} edited").cyan(), text, attachment(image.is_some()))
		}
		OperatorEvent::Deleted { id } => format!("{}", format!("#{id} deleted").dimmed()),
		OperatorEvent::Presence { activity, status } => {
			let status = match status {
				PresenceStatus::Online => "online".green(),
				PresenceStatus::Idle => "idle".yellow(),
				PresenceStatus::DoNotDisturb => "do not disturb".red(),
			};
			format!("presence: {status} {activity}")
		}
		OperatorEvent::Response { text, .. } => text.clone(),
	}
}

fn attachment(present: bool) -> &'static str {
	if present { " [image]" } else { "" }
}

#[cfg(test)]
mod tests {
	use leasekeep_protocol::ImagePayload;

	use super::*;

	#[test]
	fn renders_feed_events() {
		let posted = OperatorEvent::Posted {
			id: 4,
			text: "Renew required".to_string(),
			image: Some(ImagePayload::png(vec![1, 2, 3])),
		};
		let line = render(&posted);
		assert!(line.contains("#4"));
		assert!(line.contains("Renew required [image]"));

		let presence = OperatorEvent::Presence {
			activity: "in queue".to_string(),
			status: PresenceStatus::Idle,
		};
		assert!(render(&presence).starts_with("presence: "));
		assert!(render(&presence).ends_with(" in queue"));
	}

	#[tokio::test]
	async fn command_round_trip_over_a_duplex_stream() {
		let (client, server) = tokio::io::duplex(4096);
		let keeper_side = tokio::spawn(async move {
			let (reader, mut writer) = tokio::io::split(server);
			let mut line = String::new();
			BufReader::new(reader).read_line(&mut line).await.unwrap();
			let request: OperatorRequest = serde_json::from_str(&line).unwrap();
			let reply = OperatorEvent::Response {
				text: "Renew not required".to_string(),
				ephemeral: true,
			};
			writer.write_all(format!("{}\n", serde_json::to_string(&reply).unwrap()).as_bytes()).await.unwrap();
			request
		});

		let request = OperatorRequest::Command {
			operator: "alice".to_string(),
			command: OperatorCommand::Answer { text: "x7kq".to_string() },
		};
		let reply = send_request_stream(client, &request).await.unwrap();
		assert_eq!(
			reply,
			OperatorEvent::Response {
				text: "Renew not required".to_string(),
				ephemeral: true
			}
		);
		assert_eq!(keeper_side.await.unwrap(), request);
	}
}
