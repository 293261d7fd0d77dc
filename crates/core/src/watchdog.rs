//! Challenge expiry watchdog.

use std::sync::Arc;

use leasekeep_runtime::Flow;
use tracing::{info, trace};

use crate::channel::Reply;
use crate::keeper::Keeper;

/// Turns an unanswered challenge into a [`Reply::Expired`] once its lifetime
/// is nearly over.
pub struct ExpiryWatchdog<'a> {
	keeper: &'a Arc<Keeper>,
}

impl<'a> ExpiryWatchdog<'a> {
	pub fn new(keeper: &'a Arc<Keeper>) -> Self {
		Self { keeper }
	}

	pub(crate) fn tick(&self) -> Flow {
		if self.keeper.session().captchable() {
			info!(target = "leasekeep.watchdog", "challenge lifetime elapsed without an answer");
			self.keeper.replies().deliver(Reply::Expired);
		} else {
			trace!(target = "leasekeep.watchdog", "no challenge outstanding");
		}
		Flow::Continue
	}
}
