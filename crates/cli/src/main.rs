use clap::Parser;
use leasekeep_cli::cli::Cli;
use leasekeep_cli::{commands, logging};
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = commands::dispatch(cli).await {
		error!(target = "leasekeep", error = %err, "command failed");
		std::process::exit(1);
	}
}
