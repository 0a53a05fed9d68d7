use std::{
	future::Future,
	pin::Pin,
	task::{Context, Poll},
};

use tokio::sync::oneshot;

use crate::{
	errors::{SignalError, StartError},
	process::ProcessEnd,
	signal::Signal,
};

/// What a successful [`start`](super::Controller::start) did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Started {
	/// A new process was spawned.
	Spawned {
		/// Its process ID.
		pid: u32,
	},

	/// The process was suspended, and was resumed instead of spawning another.
	Resumed {
		/// Its process ID, unchanged.
		pid: u32,
	},

	/// The process was already running, so nothing was done.
	AlreadyRunning {
		/// Its process ID, unchanged.
		pid: u32,
	},
}

impl Started {
	/// The process ID of the (only) process.
	#[must_use]
	pub const fn pid(self) -> u32 {
		match self {
			Self::Spawned { pid } | Self::Resumed { pid } | Self::AlreadyRunning { pid } => pid,
		}
	}
}

/// Where the supervised process is in its life.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Lifecycle {
	/// Not spawned yet.
	#[default]
	Unstarted,

	/// Spawned and executing.
	Running {
		/// Its process ID.
		pid: u32,
	},

	/// Spawned, and stopped in place.
	Suspended {
		/// Its process ID.
		pid: u32,
	},

	/// Ended. This is terminal.
	Exited(ProcessEnd),
}

type Reply<T> = oneshot::Sender<T>;

#[derive(Debug)]
pub(crate) enum Control {
	Prepare(Reply<Result<(), StartError>>),
	Start(Reply<Result<Started, StartError>>),
	Suspend(Reply<Result<(), SignalError>>),
	Resume(Reply<Result<(), SignalError>>),
	Forward(Signal, Reply<Result<(), SignalError>>),
}

/// Resolves once, when the supervised process ends.
///
/// There is exactly one of these per controller. If the controller task disappears without having
/// seen the process end, this resolves to [`ProcessEnd::Unknown`].
#[derive(Debug)]
pub struct ExitNotification(pub(crate) oneshot::Receiver<ProcessEnd>);

impl Future for ExitNotification {
	type Output = ProcessEnd;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.0)
			.poll(cx)
			.map(|end| end.unwrap_or(ProcessEnd::Unknown))
	}
}
