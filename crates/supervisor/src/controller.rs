//! The process controller: sole owner of the supervised process.
//!
//! A [`Controller`] is a handle to a task which owns the child process. Everything which touches the
//! process (spawning it, suspending and resuming it, relaying signals to it, and reaping it) happens
//! inside that task, one operation at a time.
//!
//! Signals go to the process's whole process group, as the command is spawned as a group leader.

#[doc(inline)]
pub use self::{
	handle::Controller,
	messages::{ExitNotification, Lifecycle, Started},
	task::start_controller,
};

#[cfg(test)]
pub(crate) use self::messages::Control;

mod handle;
mod messages;
mod task;
