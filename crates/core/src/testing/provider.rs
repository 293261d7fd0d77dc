use async_trait::async_trait;
use leasekeep_protocol::Selector;
use parking_lot::Mutex;

use crate::error::{KeepError, Result};
use crate::facade::{ElementRef, Key, Lookup, RemoteResource, TabHandle};
use crate::panel::{Location, PanelLayout};

/// Server condition as the fake panel renders it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerPhase {
	WaitingResume,
	Queued,
	Transferring,
	Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
	EmailInput,
	PasswordInput,
	PrimaryButton,
	QueuePosition,
	QueueStart,
	TransferHeading,
	LeaseTimer,
	RenewLink,
	ResumeImage,
	ModalImage,
	ChallengeInput,
	ChallengeSubmit,
	ErrorBanner,
	ModalClose,
	ConsoleInput,
	ConsoleLine(usize),
	PowerOn,
	PowerOff,
	PowerRestart,
	Logo,
	ChallengeImg,
}

struct Tab {
	handle: String,
	url: String,
	epoch: u64,
	modal_open: bool,
	banner: bool,
}

struct Issued {
	tab: String,
	epoch: u64,
	part: Part,
}

struct World {
	tabs: Vec<Tab>,
	focused: Option<String>,
	next_tab: u64,
	issued: Vec<Issued>,
	phase: ServerPhase,
	timer_text: String,
	renewed_minutes: u32,
	challenge: u32,
	typed: String,
	submissions: Vec<String>,
	queue_reads: u32,
	transfer_reads: u32,
	login_enabled: bool,
	console: Vec<String>,
	console_typed: String,
	clicks: Vec<String>,
}

impl World {
	fn tab(&self) -> Result<&Tab> {
		let handle = self.focused.as_deref().ok_or_else(|| KeepError::automation("no focused tab"))?;
		self.tabs
			.iter()
			.find(|t| t.handle == handle)
			.ok_or_else(|| KeepError::automation("focused tab is gone"))
	}

	fn tab_mut(&mut self) -> Result<&mut Tab> {
		let handle = self.focused.clone().ok_or_else(|| KeepError::automation("no focused tab"))?;
		self.tabs
			.iter_mut()
			.find(|t| t.handle == handle)
			.ok_or_else(|| KeepError::automation("focused tab is gone"))
	}

	fn expected_answer(&self) -> String {
		format!("k{:03}", self.challenge)
	}
}

/// Scriptable model of the provider's control panel.
///
/// Element references are tied to the tab and page render they were found
/// on. Navigating, refreshing or a server-side change that removes the element
/// makes them stale, as in a real browser.
pub struct FakeProvider {
	layout: PanelLayout,
	world: Mutex<World>,
}

impl FakeProvider {
	/// A signed-out browser on a blank tab; the server waits for a resume.
	pub fn new(layout: PanelLayout) -> Self {
		Self {
			layout,
			world: Mutex::new(World {
				tabs: vec![Tab {
					handle: "tab-0".to_string(),
					url: "about:blank".to_string(),
					epoch: 0,
					modal_open: false,
					banner: false,
				}],
				focused: Some("tab-0".to_string()),
				next_tab: 1,
				issued: Vec::new(),
				phase: ServerPhase::WaitingResume,
				timer_text: "Expires in 45 min.".to_string(),
				renewed_minutes: 60,
				challenge: 0,
				typed: String::new(),
				submissions: Vec::new(),
				queue_reads: 0,
				transfer_reads: 0,
				login_enabled: true,
				console: Vec::new(),
				console_typed: String::new(),
				clicks: Vec::new(),
			}),
		}
	}

	pub fn layout(&self) -> &PanelLayout {
		&self.layout
	}

	pub fn set_phase(&self, phase: ServerPhase) {
		self.world.lock().phase = phase;
	}

	pub fn phase(&self) -> ServerPhase {
		self.world.lock().phase
	}

	/// Sets the lease timer to `minutes`.
	pub fn set_remaining(&self, minutes: u32) {
		self.set_timer_text(&format!("Expires in {minutes} min."));
	}

	pub fn set_timer_text(&self, text: &str) {
		self.world.lock().timer_text = text.to_string();
	}

	/// Lease granted by a correct renewal answer.
	pub fn set_renewed_lease(&self, minutes: u32) {
		self.world.lock().renewed_minutes = minutes;
	}

	/// Queue position reads before the queue clears after a resume.
	pub fn set_queue(&self, reads: u32) {
		self.world.lock().queue_reads = reads;
	}

	/// Transfer heading reads before the server comes online.
	pub fn set_transfer(&self, reads: u32) {
		self.world.lock().transfer_reads = reads;
	}

	pub fn disable_login(&self) {
		self.world.lock().login_enabled = false;
	}

	/// Points the focused tab at `url` as if the operator had navigated there.
	pub fn open(&self, url: &str) {
		let mut world = self.world.lock();
		if let Ok(tab) = world.tab_mut() {
			tab.url = url.to_string();
			tab.epoch += 1;
			tab.modal_open = false;
			tab.banner = false;
		}
	}

	/// Someone renewed the lease through the website.
	pub fn renew_externally(&self, minutes: u32) {
		self.set_remaining(minutes);
	}

	/// The lease runs out: the server stops and console pages bounce home.
	pub fn expire(&self) {
		let home = self.layout.home_url();
		let mut world = self.world.lock();
		world.phase = ServerPhase::WaitingResume;
		for tab in &mut world.tabs {
			if matches!(self.layout.classify(&tab.url), Location::Console | Location::Server) {
				tab.url = home.clone();
				tab.epoch += 1;
				tab.modal_open = false;
				tab.banner = false;
			}
		}
	}

	/// Answer that solves the challenge currently on screen.
	pub fn expected_answer(&self) -> String {
		self.world.lock().expected_answer()
	}

	/// Number of challenges rendered so far.
	pub fn challenge_serial(&self) -> u32 {
		self.world.lock().challenge
	}

	pub fn submissions(&self) -> Vec<String> {
		self.world.lock().submissions.clone()
	}

	pub fn clicks(&self) -> Vec<String> {
		self.world.lock().clicks.clone()
	}

	pub fn console_lines(&self) -> Vec<String> {
		self.world.lock().console.clone()
	}

	pub fn push_console_line(&self, line: &str) {
		self.world.lock().console.push(line.to_string());
	}

	pub fn location(&self) -> Location {
		let world = self.world.lock();
		world.tab().map(|t| self.layout.classify(&t.url)).unwrap_or(Location::Other)
	}

	pub fn tab_count(&self) -> usize {
		self.world.lock().tabs.len()
	}

	fn part_for(&self, selector: &Selector) -> Option<Part> {
		let s = &self.layout.selectors;
		let table = [
			(&s.email_input, Part::EmailInput),
			(&s.password_input, Part::PasswordInput),
			(&s.primary_button, Part::PrimaryButton),
			(&s.queue_position, Part::QueuePosition),
			(&s.queue_start, Part::QueueStart),
			(&s.transfer_heading, Part::TransferHeading),
			(&s.lease_timer, Part::LeaseTimer),
			(&s.renew_link, Part::RenewLink),
			(&s.resume_challenge_image, Part::ResumeImage),
			(&s.modal_challenge_image, Part::ModalImage),
			(&s.challenge_input, Part::ChallengeInput),
			(&s.challenge_submit, Part::ChallengeSubmit),
			(&s.challenge_error_banner, Part::ErrorBanner),
			(&s.modal_close, Part::ModalClose),
			(&s.console_input, Part::ConsoleInput),
			(&s.console_lines, Part::ConsoleLine(0)),
			(&s.power_on, Part::PowerOn),
			(&s.power_off, Part::PowerOff),
			(&s.power_restart, Part::PowerRestart),
			(&s.images, Part::Logo),
		];
		table.into_iter().find(|(candidate, _)| *candidate == selector).map(|(_, part)| part)
	}

	fn visible(&self, world: &World, tab: &Tab, part: Part) -> bool {
		let location = self.layout.classify(&tab.url);
		let running = world.phase == ServerPhase::Running;
		let on_console = location == Location::Console && running;
		let challenge_here =
			(on_console && tab.modal_open) || (location == Location::Resume && world.phase == ServerPhase::WaitingResume);
		match part {
			Part::EmailInput | Part::PasswordInput => location == Location::Login && world.login_enabled,
			Part::PrimaryButton => {
				(location == Location::Login && world.login_enabled)
					|| (location == Location::Home && world.phase != ServerPhase::Transferring)
			}
			Part::QueuePosition => {
				matches!(location, Location::Home | Location::Queue)
					&& world.phase == ServerPhase::Queued
					&& world.queue_reads > 0
			}
			Part::QueueStart => location == Location::Queue && world.phase == ServerPhase::Queued,
			Part::TransferHeading => {
				location == Location::Home && matches!(world.phase, ServerPhase::Transferring | ServerPhase::Running)
			}
			Part::LeaseTimer => matches!(location, Location::Console | Location::Server) && running,
			Part::RenewLink | Part::ConsoleInput | Part::PowerOn | Part::PowerOff | Part::PowerRestart => on_console,
			Part::ConsoleLine(index) => on_console && index < world.console.len(),
			Part::ResumeImage => location == Location::Resume && world.phase == ServerPhase::WaitingResume,
			Part::ModalImage | Part::ModalClose => on_console && tab.modal_open,
			Part::ChallengeInput | Part::ChallengeSubmit | Part::ChallengeImg => challenge_here,
			Part::ErrorBanner => challenge_here && tab.banner,
			Part::Logo => location != Location::Other,
		}
	}

	fn issue(world: &mut World, part: Part) -> Result<ElementRef> {
		let tab = world.tab()?;
		let issued = Issued {
			tab: tab.handle.clone(),
			epoch: tab.epoch,
			part,
		};
		world.issued.push(issued);
		Ok(ElementRef::new(format!("el-{}", world.issued.len() - 1)))
	}

	fn resolve(&self, world: &World, element: &ElementRef) -> Result<Lookup<Part>> {
		let issued = element
			.id()
			.strip_prefix("el-")
			.and_then(|n| n.parse::<usize>().ok())
			.and_then(|n| world.issued.get(n))
			.ok_or_else(|| KeepError::automation(format!("unknown element {}", element.id())))?;
		let tab = world.tab()?;
		if issued.tab != tab.handle || issued.epoch != tab.epoch || !self.visible(world, tab, issued.part) {
			return Ok(Lookup::Stale);
		}
		Ok(Lookup::Found(issued.part))
	}

	/// Applies server-side redirects for pages the current phase cannot show.
	fn redirect(&self, world: &World, url: &str) -> String {
		let home = self.layout.home_url();
		match self.layout.classify(url) {
			Location::Console | Location::Server if world.phase != ServerPhase::Running => home,
			Location::Queue if world.phase != ServerPhase::Queued => home,
			_ => url.to_string(),
		}
	}

	fn go_to(world: &mut World, url: String) -> Result<()> {
		let tab = world.tab_mut()?;
		tab.url = url;
		tab.epoch += 1;
		tab.modal_open = false;
		tab.banner = false;
		Ok(())
	}

	fn activate(&self, world: &mut World, part: Part) -> Result<()> {
		world.clicks.push(format!("{part:?}"));
		let location = self.layout.classify(&world.tab()?.url);
		match part {
			Part::PrimaryButton if location == Location::Login => {
				Self::go_to(world, self.layout.home_url())?;
			}
			Part::PrimaryButton if location == Location::Home && world.phase == ServerPhase::WaitingResume => {
				world.challenge += 1;
				Self::go_to(world, self.layout.resume_url())?;
			}
			Part::RenewLink => {
				world.challenge += 1;
				let tab = world.tab_mut()?;
				tab.modal_open = true;
				tab.banner = false;
			}
			Part::ModalClose => world.tab_mut()?.modal_open = false,
			Part::ErrorBanner => world.tab_mut()?.banner = false,
			Part::ChallengeSubmit => self.judge(world, location)?,
			Part::QueueStart => {
				world.phase = ServerPhase::Transferring;
				Self::go_to(world, self.layout.home_url())?;
			}
			_ => {}
		}
		Ok(())
	}

	fn judge(&self, world: &mut World, location: Location) -> Result<()> {
		let answer = std::mem::take(&mut world.typed);
		let correct = answer == world.expected_answer();
		world.submissions.push(answer);
		if !correct {
			world.challenge += 1;
			world.tab_mut()?.banner = true;
			return Ok(());
		}
		if location == Location::Resume {
			if world.queue_reads > 0 {
				world.phase = ServerPhase::Queued;
				Self::go_to(world, self.layout.queue_url())?;
			} else {
				world.phase = ServerPhase::Transferring;
				Self::go_to(world, self.layout.home_url())?;
			}
		} else {
			world.timer_text = format!("Expires in {} min.", world.renewed_minutes);
			let tab = world.tab_mut()?;
			tab.modal_open = false;
			tab.banner = false;
		}
		Ok(())
	}

	fn read_text(&self, world: &mut World, part: Part) -> Result<String> {
		let location = self.layout.classify(&world.tab()?.url);
		Ok(match part {
			Part::PrimaryButton if location == Location::Login => "Sign in".to_string(),
			Part::PrimaryButton if world.phase == ServerPhase::Running => "Control Panel".to_string(),
			Part::PrimaryButton => "Resume".to_string(),
			Part::QueuePosition => {
				let text = format!("Position {}", world.queue_reads);
				world.queue_reads = world.queue_reads.saturating_sub(1);
				text
			}
			Part::TransferHeading if world.phase == ServerPhase::Transferring && world.transfer_reads > 0 => {
				world.transfer_reads -= 1;
				"Transferring to a new node".to_string()
			}
			Part::TransferHeading => {
				if world.phase == ServerPhase::Transferring {
					world.phase = ServerPhase::Running;
					world.timer_text = format!("Expires in {} min.", world.renewed_minutes);
				}
				"Online".to_string()
			}
			Part::LeaseTimer => world.timer_text.clone(),
			Part::ConsoleLine(index) => world.console.get(index).cloned().unwrap_or_default(),
			_ => String::new(),
		})
	}
}

#[async_trait]
impl RemoteResource for FakeProvider {
	async fn navigate(&self, url: &str) -> Result<()> {
		let mut world = self.world.lock();
		let target = self.redirect(&world, url);
		Self::go_to(&mut world, target)
	}

	async fn current_location(&self) -> Result<String> {
		Ok(self.world.lock().tab()?.url.clone())
	}

	async fn refresh(&self) -> Result<()> {
		let mut world = self.world.lock();
		let url = world.tab()?.url.clone();
		if self.layout.classify(&url) == Location::Resume && world.phase == ServerPhase::WaitingResume {
			world.challenge += 1;
		}
		let target = self.redirect(&world, &url);
		Self::go_to(&mut world, target)
	}

	async fn find(&self, selector: &Selector) -> Result<Lookup<ElementRef>> {
		let mut world = self.world.lock();
		let Some(part) = self.part_for(selector) else {
			return Ok(Lookup::Absent);
		};
		// The first image on a challenge page is the challenge itself.
		let part = match part {
			Part::Logo if self.visible(&world, world.tab()?, Part::ChallengeImg) => Part::ChallengeImg,
			other => other,
		};
		if !self.visible(&world, world.tab()?, part) {
			return Ok(Lookup::Absent);
		}
		Ok(Lookup::Found(Self::issue(&mut world, part)?))
	}

	async fn find_all(&self, selector: &Selector) -> Result<Vec<ElementRef>> {
		let mut world = self.world.lock();
		let parts: Vec<Part> = match self.part_for(selector) {
			None => Vec::new(),
			Some(Part::ConsoleLine(_)) => (0..world.console.len()).map(Part::ConsoleLine).collect(),
			Some(Part::Logo) => vec![Part::ChallengeImg, Part::Logo],
			Some(part) => vec![part],
		};
		let mut found = Vec::new();
		for part in parts {
			if self.visible(&world, world.tab()?, part) {
				found.push(Self::issue(&mut world, part)?);
			}
		}
		Ok(found)
	}

	async fn click(&self, element: &ElementRef) -> Result<Lookup<()>> {
		let mut world = self.world.lock();
		let Lookup::Found(part) = self.resolve(&world, element)? else {
			return Ok(Lookup::Stale);
		};
		self.activate(&mut world, part)?;
		Ok(Lookup::Found(()))
	}

	async fn type_text(&self, element: &ElementRef, text: &str) -> Result<Lookup<()>> {
		let mut world = self.world.lock();
		let Lookup::Found(part) = self.resolve(&world, element)? else {
			return Ok(Lookup::Stale);
		};
		match part {
			Part::ChallengeInput => world.typed.push_str(text),
			Part::ConsoleInput => world.console_typed.push_str(text),
			_ => {}
		}
		Ok(Lookup::Found(()))
	}

	async fn press(&self, element: &ElementRef, key: Key) -> Result<Lookup<()>> {
		let mut world = self.world.lock();
		let Lookup::Found(part) = self.resolve(&world, element)? else {
			return Ok(Lookup::Stale);
		};
		match (part, key) {
			(Part::PrimaryButton, Key::Space | Key::Enter) => self.activate(&mut world, part)?,
			(Part::ConsoleInput, Key::Enter) => {
				let line = std::mem::take(&mut world.console_typed);
				world.console.push(line);
			}
			_ => {}
		}
		Ok(Lookup::Found(()))
	}

	async fn text(&self, element: &ElementRef) -> Result<Lookup<String>> {
		let mut world = self.world.lock();
		let Lookup::Found(part) = self.resolve(&world, element)? else {
			return Ok(Lookup::Stale);
		};
		Ok(Lookup::Found(self.read_text(&mut world, part)?))
	}

	async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Lookup<Option<String>>> {
		let world = self.world.lock();
		let Lookup::Found(part) = self.resolve(&world, element)? else {
			return Ok(Lookup::Stale);
		};
		if name != "src" {
			return Ok(Lookup::Found(None));
		}
		let src = match part {
			Part::Logo => Some(format!("{}logo.png", self.layout.home_url())),
			Part::ChallengeImg if world.tab()?.banner => {
				Some(format!("{}id={}", self.layout.retry_image_prefix(), world.challenge))
			}
			Part::ChallengeImg => Some(format!("data:image/png;base64,challenge-{}", world.challenge)),
			_ => None,
		};
		Ok(Lookup::Found(src))
	}

	async fn screenshot(&self, element: &ElementRef) -> Result<Lookup<Vec<u8>>> {
		let world = self.world.lock();
		let Lookup::Found(part) = self.resolve(&world, element)? else {
			return Ok(Lookup::Stale);
		};
		let bytes = match part {
			Part::ResumeImage | Part::ModalImage | Part::ChallengeImg => format!("challenge-{}", world.challenge),
			other => format!("{other:?}"),
		};
		Ok(Lookup::Found(bytes.into_bytes()))
	}

	async fn current_tab(&self) -> Result<TabHandle> {
		Ok(TabHandle::new(self.world.lock().tab()?.handle.clone()))
	}

	async fn new_tab(&self) -> Result<TabHandle> {
		let mut world = self.world.lock();
		let handle = format!("tab-{}", world.next_tab);
		world.next_tab += 1;
		world.tabs.push(Tab {
			handle: handle.clone(),
			url: "about:blank".to_string(),
			epoch: 0,
			modal_open: false,
			banner: false,
		});
		Ok(TabHandle::new(handle))
	}

	async fn switch_tab(&self, tab: &TabHandle) -> Result<()> {
		let mut world = self.world.lock();
		if !world.tabs.iter().any(|t| t.handle == tab.as_str()) {
			return Err(KeepError::automation(format!("no such tab {}", tab.as_str())));
		}
		world.focused = Some(tab.as_str().to_string());
		Ok(())
	}

	async fn close_tab(&self) -> Result<()> {
		let mut world = self.world.lock();
		let Some(handle) = world.focused.take() else {
			return Err(KeepError::automation("no focused tab"));
		};
		world.tabs.retain(|t| t.handle != handle);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::panel::DEFAULT_BASE_URL;

	fn provider() -> FakeProvider {
		FakeProvider::new(PanelLayout::new(DEFAULT_BASE_URL, "42"))
	}

	#[tokio::test]
	async fn navigation_makes_references_stale() {
		let provider = provider();
		provider.set_phase(ServerPhase::Running);
		provider.navigate(&provider.layout().console_url()).await.unwrap();
		let timer = provider.find(&provider.layout().selectors.lease_timer).await.unwrap().found().unwrap();
		assert_eq!(provider.text(&timer).await.unwrap(), Lookup::Found("Expires in 45 min.".to_string()));

		provider.refresh().await.unwrap();
		assert_eq!(provider.text(&timer).await.unwrap(), Lookup::Stale);
	}

	#[tokio::test]
	async fn console_redirects_home_unless_running() {
		let provider = provider();
		provider.navigate(&provider.layout().console_url()).await.unwrap();
		assert_eq!(provider.location(), Location::Home);
	}

	#[tokio::test]
	async fn wrong_answers_show_the_retry_image() {
		let provider = provider();
		provider.set_phase(ServerPhase::Running);
		provider.navigate(&provider.layout().console_url()).await.unwrap();
		let selectors = provider.layout().selectors.clone();
		let link = provider.find(&selectors.renew_link).await.unwrap().found().unwrap();
		provider.click(&link).await.unwrap();
		let input = provider.find(&selectors.challenge_input).await.unwrap().found().unwrap();
		provider.type_text(&input, "nope").await.unwrap();
		let submit = provider.find(&selectors.challenge_submit).await.unwrap().found().unwrap();
		provider.click(&submit).await.unwrap();

		let images = provider.find_all(&selectors.images).await.unwrap();
		let src = provider.attribute(&images[0], "src").await.unwrap().found().flatten().unwrap();
		assert!(src.starts_with(&provider.layout().retry_image_prefix()));
		assert_eq!(provider.challenge_serial(), 2);
	}
}
