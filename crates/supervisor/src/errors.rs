//! Error types.
//!
//! Errors are split by how the supervisor reacts to them:
//!
//! - [`ConfigError`] and [`StartError`] abort the run before the command ever executes;
//! - [`SignalError`] happens during steady-state operation and is only reported, as the exit
//!   notification remains the source of truth for whether the command is gone;
//! - [`CriticalError`] gathers what [`run()`](crate::run) can fail with.

use std::{io, path::PathBuf};

use miette::Diagnostic;
use thiserror::Error;

use crate::signal::Signal;

/// Contradictory or missing scheduling or command configuration.
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum ConfigError {
	/// Only one of the window boundaries was provided.
	#[error("a time window needs both a start and a stop time, only the {given} time was given")]
	#[diagnostic(
		code(timewindow::config::half_window),
		help("provide both --start-time and --stop-time, or neither to run unrestricted")
	)]
	HalfWindow {
		/// Which boundary was given (`start` or `stop`).
		given: &'static str,
	},

	/// No command to supervise.
	#[error("no command given")]
	#[diagnostic(code(timewindow::config::empty_command))]
	EmptyCommand,

	/// The command line couldn't be split into words.
	#[error("could not split command line {line:?} into arguments")]
	#[diagnostic(
		code(timewindow::config::unsplittable),
		help("check for unbalanced quotes, or pass the command and its arguments after `--`")
	)]
	Unsplittable {
		/// The offending command line.
		line: String,
	},
}

/// A time of day which isn't valid `HH:MM`.
#[derive(Debug, Diagnostic, Error)]
#[error("invalid time of day {input:?}, expected HH:MM in 24-hour format")]
#[diagnostic(code(timewindow::config::time_of_day))]
pub struct TimeParseError {
	/// The offending input.
	pub input: String,
}

/// Which redirected stream a file was meant for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stream {
	/// Standard output.
	Stdout,
	/// Standard error.
	Stderr,
}

impl std::fmt::Display for Stream {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			Self::Stdout => "stdout",
			Self::Stderr => "stderr",
		})
	}
}

/// The command could not be started.
///
/// This is fatal: the condition has to be fixed by the operator before re-running.
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum StartError {
	/// A redirection target couldn't be opened for appending.
	#[error("cannot open {path:?} to append the command's {stream}")]
	#[diagnostic(code(timewindow::start::redirect))]
	Redirect {
		/// Which stream was being redirected.
		stream: Stream,
		/// The file that couldn't be opened.
		path: PathBuf,
		/// The underlying I/O error.
		#[source]
		err: io::Error,
	},

	/// The program couldn't be executed.
	#[error("cannot execute {program:?}")]
	#[diagnostic(code(timewindow::start::spawn))]
	Spawn {
		/// The program which failed to start.
		program: PathBuf,
		/// The underlying I/O error.
		#[source]
		err: io::Error,
	},

	/// The process was suspended, and resuming it failed.
	#[error("cannot resume the suspended command")]
	#[diagnostic(code(timewindow::start::resume))]
	Resume(#[source] SignalError),

	/// The run already ended, so there is nothing left to start.
	#[error("the supervised command has already ended")]
	#[diagnostic(code(timewindow::start::ended))]
	Ended,

	/// The controller task is gone.
	///
	/// This can only happen if the controller task panicked.
	#[error("the process controller is gone")]
	#[diagnostic(code(timewindow::start::controller_gone))]
	ControllerGone,
}

/// A signal couldn't be delivered to the command.
///
/// During the run, these are reported and then ignored: the command is likely to have exited
/// already, and the exit notification will tell.
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum SignalError {
	/// There is no process yet.
	#[error("cannot send {signal:?}: the command hasn't been started")]
	#[diagnostic(code(timewindow::signal::not_started))]
	NotStarted {
		/// The signal which was to be sent.
		signal: Signal,
	},

	/// The process has already ended.
	#[error("cannot send {signal:?}: the command has already ended")]
	#[diagnostic(code(timewindow::signal::gone))]
	Gone {
		/// The signal which was to be sent.
		signal: Signal,
	},

	/// Suspending a process which is already suspended, or resuming one which is running.
	#[error("cannot send {signal:?}: the command is already {state}")]
	#[diagnostic(code(timewindow::signal::wrong_state))]
	WrongState {
		/// The signal which was to be sent.
		signal: Signal,
		/// What the process is currently doing.
		state: &'static str,
	},

	/// The signal has no meaning on this platform.
	#[error("signal {signal:?} is not supported on this platform")]
	#[diagnostic(code(timewindow::signal::unsupported))]
	Unsupported {
		/// The unsupported signal.
		signal: Signal,
	},

	/// The operating system refused to deliver the signal.
	#[error("cannot send {signal:?} to process {pid}")]
	#[diagnostic(code(timewindow::signal::os))]
	Os {
		/// The signal which was to be sent.
		signal: Signal,
		/// The target process.
		pid: u32,
		/// The underlying error.
		#[source]
		err: io::Error,
	},

	/// The controller task is gone.
	///
	/// This can only happen if the controller task panicked.
	#[error("the process controller is gone")]
	#[diagnostic(code(timewindow::signal::controller_gone))]
	ControllerGone,
}

/// Errors which stop the supervisor before the command could run to its end.
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum CriticalError {
	/// The command couldn't be started.
	#[error(transparent)]
	#[diagnostic(transparent)]
	Start(#[from] StartError),

	/// A listener for signals sent to the supervisor couldn't be installed.
	#[error("cannot listen for {signal:?} sent to the supervisor")]
	#[diagnostic(code(timewindow::critical::signal_listener))]
	SignalListener {
		/// The signal which couldn't be listened for.
		signal: Signal,
		/// The underlying I/O error.
		#[source]
		err: io::Error,
	},
}
