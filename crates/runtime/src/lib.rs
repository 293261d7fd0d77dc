//! Runtime primitives for leasekeep.
//!
//! * [`ticker`]: single-instance periodic tasks driving the keeper's timers.
//! * [`webdriver`]: the W3C WebDriver connection used to automate the panel.

pub mod error;
pub mod ticker;
pub mod webdriver;

pub use error::{DriverError, Result};
pub use ticker::{Flow, Ticker};
pub use webdriver::{DriverOptions, WebDriver};
