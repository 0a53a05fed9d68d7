//! Signals exchanged between the supervisor, the outside world, and the command.

use nix::sys::signal::Signal as NixSignal;

/// A signal received by the supervisor or sent to the command.
///
/// The signals the supervisor relays or uses to suspend and resume the command have their own
/// variants, as does `SIGKILL`. The generic [`Custom`][Signal::Custom] variant carries any other raw
/// signal number, such as the one a process was terminated by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
	/// `SIGINT`: the process should stop, generally at the request of the user.
	///
	/// This is relayed to the command when received by the supervisor.
	Interrupt,

	/// `SIGTERM`: the process should stop, generally at the request of the system.
	///
	/// This is relayed to the command when received by the supervisor.
	Terminate,

	/// `SIGKILL`: the kernel stops the process, which can't intercept it.
	ForceStop,

	/// `SIGSTOP`: the kernel suspends the process in place, which can't intercept it.
	///
	/// This is how the command is paused when its window closes.
	Suspend,

	/// `SIGCONT`: a suspended process carries on.
	///
	/// This is how the command is resumed when its window reopens.
	Continue,

	/// Any other signal, by raw number.
	///
	/// Signals which aren't valid on the current platform can't be sent.
	Custom(i32),
}

impl Signal {
	/// Converts to a [`nix::Signal`][NixSignal] if possible.
	///
	/// This will return `None` if the signal is not supported on the current platform (only for
	/// [`Custom`][Signal::Custom], as the first-class ones are always supported).
	#[must_use]
	pub fn to_nix(self) -> Option<NixSignal> {
		match self {
			Self::Interrupt => Some(NixSignal::SIGINT),
			Self::Terminate => Some(NixSignal::SIGTERM),
			Self::ForceStop => Some(NixSignal::SIGKILL),
			Self::Suspend => Some(NixSignal::SIGSTOP),
			Self::Continue => Some(NixSignal::SIGCONT),
			Self::Custom(sig) => NixSignal::try_from(sig).ok(),
		}
	}

	/// Converts from a [`nix::Signal`][NixSignal].
	#[must_use]
	pub const fn from_nix(sig: NixSignal) -> Self {
		match sig {
			NixSignal::SIGINT => Self::Interrupt,
			NixSignal::SIGTERM => Self::Terminate,
			NixSignal::SIGKILL => Self::ForceStop,
			NixSignal::SIGSTOP => Self::Suspend,
			NixSignal::SIGCONT => Self::Continue,
			sig => Self::Custom(sig as i32),
		}
	}

	/// The raw signal number on this platform.
	#[must_use]
	pub fn number(self) -> i32 {
		match self {
			Self::Custom(raw) => raw,
			sig => sig.to_nix().map_or(0, |nix| nix as i32),
		}
	}

	/// Whether this signal asks a process to end.
	///
	/// These are the signals the supervisor relays to its command.
	#[must_use]
	pub const fn is_termination(self) -> bool {
		matches!(self, Self::Interrupt | Self::Terminate)
	}
}

impl From<i32> for Signal {
	/// Converts from a raw signal number.
	fn from(raw: i32) -> Self {
		NixSignal::try_from(raw).map_or(Self::Custom(raw), Self::from_nix)
	}
}
