//! `leasekeep run`: the long-lived keeper process.

use std::path::Path;
use std::sync::Arc;

use leasekeep::{CommandDispatcher, Keeper, Landing, WebDriverResource, login};
use leasekeep_runtime::WebDriver;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::config::Settings;
use crate::error::Result;
use crate::operator::SocketChannel;
use crate::operator::server::OperatorListener;

pub async fn execute(args: &RunArgs, socket: &Path) -> Result<()> {
	// Configuration problems surface before a browser is launched.
	let settings = Settings::from_args(args)?;
	let listener = OperatorListener::bind(socket).await?;

	let driver = WebDriver::connect(&settings.webdriver, settings.driver).await?;
	let facade = Arc::new(WebDriverResource::new(driver.clone(), settings.timing.keystroke_delay));
	let channel = Arc::new(SocketChannel::new());
	let keeper = Keeper::new(facade, channel.clone(), settings.layout.clone(), settings.timing);
	let dispatcher = Arc::new(CommandDispatcher::new(Arc::clone(&keeper), settings.owner.clone()));

	let server = tokio::spawn(listener.serve(dispatcher, channel));

	let outcome = match login(&keeper, &settings.credentials).await {
		Ok(landing) => {
			info!(
				target = "leasekeep",
				running = landing == Landing::Running,
				server_id = settings.layout.server_id(),
				"signed in"
			);
			wait_for_stop(&keeper).await;
			Ok(())
		}
		Err(err) => Err(err.into()),
	};

	keeper.shutdown();
	server.abort();
	if let Err(err) = driver.quit().await {
		warn!(target = "leasekeep", error = %err, "could not close the browser session");
	}
	outcome
}

async fn wait_for_stop(keeper: &Keeper) {
	tokio::select! {
		_ = keeper.wait_for_shutdown() => info!(target = "leasekeep", "shutdown requested by operator"),
		signal = tokio::signal::ctrl_c() => {
			match signal {
				Ok(()) => info!(target = "leasekeep", "interrupted"),
				Err(err) => {
					warn!(target = "leasekeep", error = %err, "could not listen for ctrl-c");
					keeper.wait_for_shutdown().await;
				}
			}
		}
	}
}
