//! The automation surface the keeper drives.
//!
//! [`RemoteResource`] is the only way keeper components touch the provider's
//! control panel. Element-scoped operations report a missing or re-rendered
//! element as a [`Lookup`] value rather than an error, so the caller decides
//! whether that is a page transition or a failure.

mod webdriver;

use async_trait::async_trait;
use leasekeep_protocol::Selector;

use crate::error::{KeepError, Result};

pub use webdriver::WebDriverResource;

/// Opaque reference to an element on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(String);

impl ElementRef {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn id(&self) -> &str {
		&self.0
	}
}

/// Handle to a browser tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TabHandle(String);

impl TabHandle {
	pub fn new(handle: impl Into<String>) -> Self {
		Self(handle.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

/// Non-text keys the keeper presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
	Enter,
	Tab,
	Space,
}

/// Outcome of an element lookup or element-scoped operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
	Found(T),
	/// The element existed but the page re-rendered it.
	Stale,
	/// No element matched.
	Absent,
}

impl<T> Lookup<T> {
	/// Converts a miss into the matching [`KeepError`], naming the element.
	pub fn require(self, what: &'static str) -> Result<T> {
		match self {
			Self::Found(value) => Ok(value),
			Self::Stale => Err(KeepError::StaleElementReference(what)),
			Self::Absent => Err(KeepError::ElementNotFound(what)),
		}
	}

	pub fn found(self) -> Option<T> {
		match self {
			Self::Found(value) => Some(value),
			Self::Stale | Self::Absent => None,
		}
	}

	pub fn is_found(&self) -> bool {
		matches!(self, Self::Found(_))
	}

	pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
		match self {
			Self::Found(value) => Lookup::Found(f(value)),
			Self::Stale => Lookup::Stale,
			Self::Absent => Lookup::Absent,
		}
	}
}

/// Verbs over the provider's web control panel.
///
/// Navigation and tab operations act on the focused tab. Errors are reserved
/// for transport and driver failures.
#[async_trait]
pub trait RemoteResource: Send + Sync {
	async fn navigate(&self, url: &str) -> Result<()>;

	async fn current_location(&self) -> Result<String>;

	async fn refresh(&self) -> Result<()>;

	async fn find(&self, selector: &Selector) -> Result<Lookup<ElementRef>>;

	/// All matches in document order; an empty list when nothing matches.
	async fn find_all(&self, selector: &Selector) -> Result<Vec<ElementRef>>;

	async fn click(&self, element: &ElementRef) -> Result<Lookup<()>>;

	async fn type_text(&self, element: &ElementRef, text: &str) -> Result<Lookup<()>>;

	async fn press(&self, element: &ElementRef, key: Key) -> Result<Lookup<()>>;

	/// Rendered text of the element.
	async fn text(&self, element: &ElementRef) -> Result<Lookup<String>>;

	async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Lookup<Option<String>>>;

	/// PNG screenshot of the element.
	async fn screenshot(&self, element: &ElementRef) -> Result<Lookup<Vec<u8>>>;

	async fn current_tab(&self) -> Result<TabHandle>;

	/// Opens a tab without focusing it.
	async fn new_tab(&self) -> Result<TabHandle>;

	async fn switch_tab(&self, tab: &TabHandle) -> Result<()>;

	/// Closes the focused tab. Switch to another tab before issuing more commands.
	async fn close_tab(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn require_maps_misses_to_errors() {
		assert_eq!(Lookup::Found(3).require("x").unwrap(), 3);
		assert!(matches!(
			Lookup::<()>::Stale.require("renew link"),
			Err(KeepError::StaleElementReference("renew link"))
		));
		assert!(matches!(
			Lookup::<()>::Absent.require("lease timer"),
			Err(KeepError::ElementNotFound("lease timer"))
		));
	}

	#[test]
	fn map_keeps_misses() {
		assert_eq!(Lookup::Found(2).map(|v| v * 2), Lookup::Found(4));
		assert_eq!(Lookup::<u8>::Stale.map(|v| v * 2), Lookup::Stale);
		assert_eq!(Lookup::<u8>::Absent.found(), None);
	}
}
