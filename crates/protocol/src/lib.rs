//! Wire types for leasekeep.
//!
//! This crate contains the serde-serializable types that cross a process
//! boundary: the W3C WebDriver JSON bodies spoken to the browser driver, and
//! the newline-delimited JSON frames exchanged with operator clients over the
//! control socket.
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * 1:1 with the wire: field names match what the peer sends
//! * Stable: Changes only when a wire protocol changes
//!
//! The lease-keeping logic built on top of these lives in `leasekeep`.

pub mod image;
pub mod operator;
pub mod selector;
pub mod webdriver;

pub use image::*;
pub use operator::*;
pub use selector::*;
