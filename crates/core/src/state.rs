//! Shared session flags.

use parking_lot::Mutex;

use crate::channel::MessageRef;
use crate::facade::ElementRef;
use crate::lease::LeaseState;

/// Flags read and written by every keeper component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFlags {
	/// The server console can take commands.
	pub consolable: bool,
	/// A challenge answer is being awaited.
	pub captchable: bool,
	/// A resume sequence is in progress.
	pub resuming: bool,
	pub renew_link: Option<ElementRef>,
	pub timer: Option<ElementRef>,
	/// The one status message currently shown to operators.
	pub pending_message: Option<MessageRef>,
	pub lease: LeaseState,
}

/// Lock-guarded [`SessionFlags`].
///
/// The lock is held only for the duration of a read or a write, never across
/// an await point.
#[derive(Debug, Default)]
pub struct Session {
	flags: Mutex<SessionFlags>,
}

impl Session {
	pub fn snapshot(&self) -> SessionFlags {
		self.flags.lock().clone()
	}

	pub fn update<R>(&self, f: impl FnOnce(&mut SessionFlags) -> R) -> R {
		f(&mut self.flags.lock())
	}

	pub fn consolable(&self) -> bool {
		self.flags.lock().consolable
	}

	pub fn set_consolable(&self, value: bool) {
		self.flags.lock().consolable = value;
	}

	pub fn captchable(&self) -> bool {
		self.flags.lock().captchable
	}

	pub fn set_captchable(&self, value: bool) {
		self.flags.lock().captchable = value;
	}

	pub fn resuming(&self) -> bool {
		self.flags.lock().resuming
	}

	/// Marks a resume as started. Returns `false` if one already is.
	pub fn begin_resume(&self) -> bool {
		let mut flags = self.flags.lock();
		if flags.resuming {
			return false;
		}
		flags.resuming = true;
		true
	}

	pub fn end_resume(&self) {
		self.flags.lock().resuming = false;
	}

	pub fn lease(&self) -> LeaseState {
		self.flags.lock().lease
	}

	pub fn set_lease(&self, lease: LeaseState) {
		self.flags.lock().lease = lease;
	}

	pub fn renew_link(&self) -> Option<ElementRef> {
		self.flags.lock().renew_link.clone()
	}

	pub fn set_renew_link(&self, link: ElementRef) {
		self.flags.lock().renew_link = Some(link);
	}

	pub fn pending_message(&self) -> Option<MessageRef> {
		self.flags.lock().pending_message
	}

	pub fn set_pending_message(&self, message: Option<MessageRef>) {
		self.flags.lock().pending_message = message;
	}

	pub fn take_pending_message(&self) -> Option<MessageRef> {
		self.flags.lock().pending_message.take()
	}
}
