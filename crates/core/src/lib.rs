//! Keeps a challenge-gated hosted server leased.
//!
//! The keeper signs in to the provider's control panel through a
//! [`RemoteResource`], then runs three cooperating timers on one scheduler:
//!
//! * the integrity monitor classifies the server while its lease state is
//!   unknown (queued, transferring, waiting for resume, running);
//! * the renewal scheduler sleeps until shortly before the lease expires and
//!   then runs a [`ChallengeWorkflow`], asking a human operator for the answer
//!   over an [`OperatorChannel`];
//! * the expiry watchdog replaces an unanswered challenge before the provider
//!   expires it.
//!
//! Operator commands enter through the [`CommandDispatcher`].
//!
//! ```ignore
//! let keeper = Keeper::new(facade, channel, PanelLayout::new(DEFAULT_BASE_URL, "13479479"), Timing::default());
//! leasekeep::login(&keeper, &credentials).await?;
//! keeper.wait_for_shutdown().await;
//! ```

pub mod challenge;
pub mod channel;
pub mod dispatcher;
pub mod error;
pub mod facade;
pub mod integrity;
pub mod keeper;
pub mod lease;
pub mod login;
pub mod notices;
pub mod panel;
pub mod renewal;
pub mod resume;
pub mod state;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod timing;
pub mod watchdog;

pub use challenge::{ChallengeAttempt, ChallengeReport, ChallengeWorkflow, Origin, Outcome, Phase};
pub use channel::{ChallengeImage, MessageRef, OperatorChannel, Presence, Reply, ReplyMailbox};
pub use dispatcher::{CommandDispatcher, Response};
pub use error::{KeepError, Result};
pub use facade::{ElementRef, Key, Lookup, RemoteResource, TabHandle, WebDriverResource};
pub use integrity::{Integrity, IntegrityMonitor};
pub use keeper::Keeper;
pub use lease::{LeaseState, RemainingLease, RenewalPlan, TimerParseError, parse_remaining, plan_renewal};
pub use login::{Credentials, Landing, login};
pub use panel::{DEFAULT_BASE_URL, Location, PanelLayout, Selectors};
pub use renewal::RenewalScheduler;
pub use resume::ResumeFlow;
pub use state::{Session, SessionFlags};
pub use timing::Timing;
pub use watchdog::ExpiryWatchdog;
