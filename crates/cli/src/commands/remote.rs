use std::path::Path;

use colored::Colorize;
use leasekeep_protocol::OperatorCommand;
use tracing::debug;

use crate::error::Result;
use crate::operator::client;

pub async fn send(socket: &Path, operator: &str, command: OperatorCommand) -> Result<()> {
	let name = command.name();
	let reply = client::send_command(socket, operator, command).await?;
	debug!(target = "leasekeep.operator", command = name, ephemeral = reply.ephemeral, "reply received");
	if reply.ephemeral {
		println!("{}", reply.text);
	} else {
		// Public replies are what every operator sees in the feed.
		println!("{}", reply.text.bold());
	}
	Ok(())
}

pub async fn watch(socket: &Path, images: Option<&Path>) -> Result<()> {
	client::watch(socket, images).await?;
	Ok(())
}
