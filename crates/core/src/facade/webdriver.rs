use std::time::Duration;

use async_trait::async_trait;
use leasekeep_protocol::Selector;
use leasekeep_protocol::webdriver::keys;
use leasekeep_runtime::{DriverError, WebDriver};
use tracing::trace;

use super::{ElementRef, Key, Lookup, RemoteResource, TabHandle};
use crate::error::{KeepError, Result};

/// [`RemoteResource`] backed by a W3C WebDriver session.
pub struct WebDriverResource {
	driver: WebDriver,
	keystroke_delay: Duration,
}

impl WebDriverResource {
	/// Wraps a connected session. A non-zero `keystroke_delay` types text one
	/// character at a time.
	pub fn new(driver: WebDriver, keystroke_delay: Duration) -> Self {
		Self { driver, keystroke_delay }
	}

	pub fn driver(&self) -> &WebDriver {
		&self.driver
	}
}

fn lookup<T>(result: std::result::Result<T, DriverError>) -> Result<Lookup<T>> {
	match result {
		Ok(value) => Ok(Lookup::Found(value)),
		Err(err) if err.is_no_such_element() => Ok(Lookup::Absent),
		Err(err) if err.is_stale() => Ok(Lookup::Stale),
		Err(err) => Err(KeepError::automation(err)),
	}
}

fn plain<T>(result: std::result::Result<T, DriverError>) -> Result<T> {
	result.map_err(KeepError::automation)
}

fn key_char(key: Key) -> char {
	match key {
		Key::Enter => keys::ENTER,
		Key::Tab => keys::TAB,
		Key::Space => keys::SPACE,
	}
}

#[async_trait]
impl RemoteResource for WebDriverResource {
	async fn navigate(&self, url: &str) -> Result<()> {
		trace!(target = "leasekeep.facade", %url, "navigate");
		plain(self.driver.navigate(url).await)
	}

	async fn current_location(&self) -> Result<String> {
		plain(self.driver.current_url().await)
	}

	async fn refresh(&self) -> Result<()> {
		plain(self.driver.refresh().await)
	}

	async fn find(&self, selector: &Selector) -> Result<Lookup<ElementRef>> {
		Ok(lookup(self.driver.find_element(selector).await)?.map(ElementRef::new))
	}

	async fn find_all(&self, selector: &Selector) -> Result<Vec<ElementRef>> {
		let ids = plain(self.driver.find_elements(selector).await)?;
		Ok(ids.into_iter().map(ElementRef::new).collect())
	}

	async fn click(&self, element: &ElementRef) -> Result<Lookup<()>> {
		lookup(self.driver.click(element.id()).await)
	}

	async fn type_text(&self, element: &ElementRef, text: &str) -> Result<Lookup<()>> {
		if self.keystroke_delay.is_zero() {
			return lookup(self.driver.send_keys(element.id(), text).await);
		}
		let mut buf = [0u8; 4];
		for ch in text.chars() {
			match lookup(self.driver.send_keys(element.id(), ch.encode_utf8(&mut buf)).await)? {
				Lookup::Found(()) => {}
				miss => return Ok(miss),
			}
			tokio::time::sleep(self.keystroke_delay).await;
		}
		Ok(Lookup::Found(()))
	}

	async fn press(&self, element: &ElementRef, key: Key) -> Result<Lookup<()>> {
		let mut buf = [0u8; 4];
		lookup(self.driver.send_keys(element.id(), key_char(key).encode_utf8(&mut buf)).await)
	}

	async fn text(&self, element: &ElementRef) -> Result<Lookup<String>> {
		lookup(self.driver.text(element.id()).await)
	}

	async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Lookup<Option<String>>> {
		lookup(self.driver.attribute(element.id(), name).await)
	}

	async fn screenshot(&self, element: &ElementRef) -> Result<Lookup<Vec<u8>>> {
		lookup(self.driver.element_screenshot(element.id()).await)
	}

	async fn current_tab(&self) -> Result<TabHandle> {
		plain(self.driver.window_handle().await).map(TabHandle::new)
	}

	async fn new_tab(&self) -> Result<TabHandle> {
		plain(self.driver.new_window().await).map(TabHandle::new)
	}

	async fn switch_tab(&self, tab: &TabHandle) -> Result<()> {
		plain(self.driver.switch_window(tab.as_str()).await)
	}

	async fn close_tab(&self) -> Result<()> {
		plain(self.driver.close_window().await)
	}
}
