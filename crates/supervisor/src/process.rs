//! How the supervised process ended.

use std::{num::NonZeroI32, process::ExitStatus};

use crate::signal::Signal;

/// The end status of the supervised process.
///
/// This is a structured equivalent of [`std::process::ExitStatus`], reduced to what the supervisor
/// needs to mirror the command's end in its own exit code. The "success" value is zero, so it is
/// special-cased as a variant and [`NonZeroI32`] is used for the others.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ProcessEnd {
	/// The process ended successfully, with exit status = 0.
	Success,

	/// The process exited with a non-zero exit status.
	ExitError(NonZeroI32),

	/// The process was terminated by a signal.
	ExitSignal(Signal),

	/// How the process ended couldn't be determined.
	///
	/// This is reported as a success, as there is nothing better to report.
	Unknown,
}

impl ProcessEnd {
	/// The exit code the supervisor should exit with to mirror this end.
	///
	/// A process terminated by signal `N` maps to `128 + N`, like shells do.
	#[must_use]
	pub fn exit_code(self) -> i32 {
		match self {
			Self::Success | Self::Unknown => 0,
			Self::ExitError(code) => code.get(),
			Self::ExitSignal(signal) => 128 + signal.number(),
		}
	}

	/// Whether the process ended successfully.
	#[must_use]
	pub const fn is_success(self) -> bool {
		matches!(self, Self::Success)
	}
}

impl From<ExitStatus> for ProcessEnd {
	fn from(es: ExitStatus) -> Self {
		use std::os::unix::process::ExitStatusExt;

		match (es.code(), es.signal()) {
			(Some(code), _) => NonZeroI32::new(code).map_or(Self::Success, Self::ExitError),
			(None, Some(signal)) => Self::ExitSignal(signal.into()),
			(None, None) => Self::Unknown,
		}
	}
}
