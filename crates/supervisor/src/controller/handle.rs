use tokio::sync::{mpsc, oneshot, watch};

use crate::{
	errors::{SignalError, StartError},
	signal::Signal,
};

use super::messages::{Control, Lifecycle, Started};

/// A handle to the task which owns the supervised process.
///
/// This is cheap to clone, and every clone talks to the same process. Operations are queued and
/// handled strictly in order, so a signal relayed by the proxy can never interleave with a
/// suspension requested by the scheduler.
#[derive(Clone, Debug)]
pub struct Controller {
	pub(crate) sender: mpsc::UnboundedSender<Control>,
	pub(crate) lifecycle: watch::Receiver<Lifecycle>,
}

impl Controller {
	async fn request<T>(&self, control: impl FnOnce(oneshot::Sender<T>) -> Control) -> Option<T> {
		let (reply, response) = oneshot::channel();
		self.sender.send(control(reply)).ok()?;
		response.await.ok()
	}

	/// Open the command's output redirections, ahead of starting it.
	///
	/// The opened files are kept for when the process is spawned. Calling this more than once, or
	/// after the process was started, does nothing.
	pub async fn prepare(&self) -> Result<(), StartError> {
		self.request(Control::Prepare)
			.await
			.unwrap_or(Err(StartError::ControllerGone))
	}

	/// Start the process, if it isn't already.
	///
	/// If the process exists and is suspended, it is resumed instead; if it is running, nothing
	/// happens. Only one process is ever spawned.
	pub async fn start(&self) -> Result<Started, StartError> {
		self.request(Control::Start)
			.await
			.unwrap_or(Err(StartError::ControllerGone))
	}

	/// Suspend the running process in place, with `SIGSTOP`.
	pub async fn suspend(&self) -> Result<(), SignalError> {
		self.request(Control::Suspend)
			.await
			.unwrap_or(Err(SignalError::ControllerGone))
	}

	/// Let the suspended process carry on, with `SIGCONT`.
	pub async fn resume(&self) -> Result<(), SignalError> {
		self.request(Control::Resume)
			.await
			.unwrap_or(Err(SignalError::ControllerGone))
	}

	/// Relay a signal to the process, whether it's suspended or not.
	///
	/// This doesn't change whether the process is considered suspended. A process which is
	/// suspended may only act on the signal once resumed, as the OS decides.
	///
	/// If the process hasn't been started yet, a termination signal ends the run without it: the
	/// exit notification resolves as if the process had been terminated by that signal.
	pub async fn forward(&self, signal: Signal) -> Result<(), SignalError> {
		self.request(|reply| Control::Forward(signal, reply))
			.await
			.unwrap_or(Err(SignalError::ControllerGone))
	}

	/// Where the process is in its life, as of the last handled operation.
	#[must_use]
	pub fn lifecycle(&self) -> Lifecycle {
		*self.lifecycle.borrow()
	}

	/// Wait until the lifecycle changes from what was last seen through this handle.
	///
	/// Returns the new lifecycle, or `None` if the controller task is gone.
	pub async fn changed(&mut self) -> Option<Lifecycle> {
		self.lifecycle.changed().await.ok()?;
		Some(*self.lifecycle.borrow_and_update())
	}
}
