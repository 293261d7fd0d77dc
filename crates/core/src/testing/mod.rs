//! In-memory stand-ins for the control panel and the operator channel.
//!
//! [`FakeProvider`] models the panel pages the keeper visits closely enough to
//! drive every flow end to end: login, renewal challenges, expiry, the start
//! queue and node transfers. [`RecordingChannel`] records everything the
//! keeper shows to operators.

mod channel;
mod provider;

pub use channel::{ChannelEvent, RecordingChannel};
pub use provider::{FakeProvider, ServerPhase};
