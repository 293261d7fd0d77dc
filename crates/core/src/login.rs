//! Signing in to the control panel at startup.

use std::sync::Arc;

use tracing::{error, info};

use crate::channel::Presence;
use crate::error::{KeepError, Result};
use crate::facade::{Key, Lookup};
use crate::keeper::Keeper;
use crate::lease::LeaseState;
use crate::notices;
use crate::panel::{CONTROL_PANEL_LABEL, Location};

/// Panel account credentials.
#[derive(Clone)]
pub struct Credentials {
	pub email: String,
	pub password: String,
}

impl std::fmt::Debug for Credentials {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Credentials").field("email", &self.email).field("password", &"<redacted>").finish()
	}
}

/// Where the keeper went after signing in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
	/// The server is up; the renewal scheduler is armed.
	Running,
	/// The server needs a resume; the integrity monitor is armed.
	Idle,
}

/// Signs in and arms the timer matching what the home page shows.
///
/// Any failure is reported to operators as [`KeepError::ResourceUnavailable`]
/// and leaves every timer disarmed.
pub async fn login(keeper: &Arc<Keeper>, credentials: &Credentials) -> Result<Landing> {
	keeper.set_presence(Presence::booting()).await;
	let landed = match sign_in(keeper, credentials).await {
		Ok(landed) => landed,
		Err(err) => {
			error!(target = "leasekeep.login", error = %err, "login failed");
			keeper.notify(&format!("Login failed: {err}")).await;
			return Err(KeepError::ResourceUnavailable(format!("login failed: {err}")));
		}
	};

	if landed {
		info!(target = "leasekeep.login", "server running; renewal armed");
		keeper.arm_renewal();
		Ok(Landing::Running)
	} else {
		info!(target = "leasekeep.login", "server idle; waiting for resume");
		keeper.session().set_lease(LeaseState::WaitingResume);
		keeper.set_presence(Presence::idle(notices::WAITING_ACTIVITY)).await;
		keeper.arm_integrity();
		Ok(Landing::Idle)
	}
}

/// Returns whether the landing page reports a running server.
async fn sign_in(keeper: &Keeper, credentials: &Credentials) -> Result<bool> {
	let facade = keeper.facade();
	let selectors = &keeper.layout().selectors;
	facade.navigate(&keeper.layout().login_url()).await?;
	keeper.settle().await;

	let email = keeper.find(&selectors.email_input, "email input").await?;
	keeper.type_into(&email, &credentials.email, "email input").await?;
	facade.press(&email, Key::Tab).await?.require("email input")?;

	let password = keeper.find(&selectors.password_input, "password input").await?;
	keeper.type_into(&password, &credentials.password, "password input").await?;

	let submit = keeper.find(&selectors.primary_button, "sign-in button").await?;
	facade.press(&submit, Key::Space).await?.require("sign-in button")?;
	tokio::time::sleep(keeper.timing().transfer_settle).await;

	if keeper.location().await? == Location::Login {
		return Err(KeepError::ResourceUnavailable("still on the login page".to_string()));
	}
	// No button while the server is transferring; the integrity monitor sorts that out.
	let Lookup::Found(button) = facade.find(&selectors.primary_button).await? else {
		return Ok(false);
	};
	let label = facade.text(&button).await?.found().unwrap_or_default();
	Ok(label.trim() == CONTROL_PANEL_LABEL)
}
