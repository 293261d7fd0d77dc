mod remote;
mod run;

use leasekeep_protocol::OperatorCommand;

use crate::cli::{Cli, Commands};
use crate::error::Result;

pub async fn dispatch(cli: Cli) -> Result<()> {
	let socket = cli.socket_path();
	let operator = cli.operator_name();
	let command = match cli.command {
		Commands::Run(args) => return run::execute(&args, &socket).await,
		Commands::Watch { images } => return remote::watch(&socket, images.as_deref()).await,
		Commands::Resume => OperatorCommand::Resume,
		Commands::Answer { text } => OperatorCommand::Answer { text },
		Commands::Console { command } => OperatorCommand::Console {
			command: (!command.is_empty()).then(|| command.join(" ")),
		},
		Commands::Start => OperatorCommand::Start,
		Commands::Stop => OperatorCommand::Stop,
		Commands::Restart => OperatorCommand::Restart,
		Commands::Shutdown => OperatorCommand::Shutdown,
		Commands::Status => OperatorCommand::Status,
	};
	remote::send(&socket, &operator, command).await
}
