use std::{future::pending, io};

use nix::{sys::signal::killpg, unistd::Pid};
use tokio::{
	process::Child,
	select,
	sync::{mpsc, oneshot, watch},
};
use tracing::{debug, error, info, trace, warn};

use crate::{
	command::{Command, Outputs},
	errors::{SignalError, StartError},
	process::ProcessEnd,
	signal::Signal,
};

use super::{
	handle::Controller,
	messages::{Control, ExitNotification, Lifecycle, Started},
};

/// Spawn the task which owns the command's process.
///
/// This returns a handle to control the process, and the notification of its end. Nothing is
/// spawned until [`Controller::start`] is called.
///
/// The task processes control messages in order, and waits on the process in the same loop: a
/// process which has ended is always seen as such before the next message is handled. It lives
/// until the process has ended and all handles are dropped.
///
/// Must be called from within a Tokio runtime.
pub fn start_controller(command: Command) -> (Controller, ExitNotification) {
	let (sender, mut receiver) = mpsc::unbounded_channel();
	let (exit_sender, exit_receiver) = oneshot::channel();
	let (lifecycle, watcher) = watch::channel(Lifecycle::Unstarted);

	tokio::spawn(async move {
		let mut task = ControllerTask {
			command,
			outputs: None,
			state: ProcessState::Unstarted,
			exit: Some(exit_sender),
			lifecycle,
		};
		let mut open = true;

		loop {
			let event = select! {
				biased;
				status = task.wait() => Event::Ended(status),
				control = receiver.recv(), if open => control.map_or(Event::Closed, Event::Control),
			};

			match event {
				Event::Ended(Ok(status)) => task.finish(status.into()),
				Event::Ended(Err(err)) => {
					error!(%err, "cannot wait on the command, its end status is unknown");
					task.finish(ProcessEnd::Unknown);
				}
				Event::Control(control) => task.handle(control),
				Event::Closed => {
					trace!("all controller handles dropped");
					open = false;
				}
			}

			if !open && !task.has_process() {
				break;
			}
		}

		trace!("controller task done");
	});

	(
		Controller {
			sender,
			lifecycle: watcher,
		},
		ExitNotification(exit_receiver),
	)
}

enum Event {
	Ended(io::Result<std::process::ExitStatus>),
	Control(Control),
	Closed,
}

#[derive(Debug)]
enum ProcessState {
	Unstarted,
	Running {
		child: Child,
		pid: u32,
		suspended: bool,
	},
	Exited(ProcessEnd),
}

struct ControllerTask {
	command: Command,
	outputs: Option<Outputs>,
	state: ProcessState,
	exit: Option<oneshot::Sender<ProcessEnd>>,
	lifecycle: watch::Sender<Lifecycle>,
}

impl ControllerTask {
	async fn wait(&mut self) -> io::Result<std::process::ExitStatus> {
		match &mut self.state {
			ProcessState::Running { child, .. } => child.wait().await,
			_ => pending().await,
		}
	}

	fn has_process(&self) -> bool {
		matches!(self.state, ProcessState::Running { .. })
	}

	fn current(&self) -> Lifecycle {
		match self.state {
			ProcessState::Unstarted => Lifecycle::Unstarted,
			ProcessState::Running {
				pid,
				suspended: false,
				..
			} => Lifecycle::Running { pid },
			ProcessState::Running {
				pid,
				suspended: true,
				..
			} => Lifecycle::Suspended { pid },
			ProcessState::Exited(end) => Lifecycle::Exited(end),
		}
	}

	fn publish(&self) {
		self.lifecycle.send_replace(self.current());
	}

	fn finish(&mut self, end: ProcessEnd) {
		info!(?end, code = end.exit_code(), "command ended");
		self.state = ProcessState::Exited(end);
		self.publish();

		if let Some(exit) = self.exit.take() {
			// the receiver may have been dropped by an embedder which doesn't care
			exit.send(end).ok();
		}
	}

	fn handle(&mut self, control: Control) {
		trace!(?control, state=?self.current(), "handling control");
		match control {
			Control::Prepare(reply) => {
				let result = self.prepare();
				reply.send(result).ok();
			}
			Control::Start(reply) => {
				let result = self.start();
				reply.send(result).ok();
			}
			Control::Suspend(reply) => {
				let result = self.suspend();
				reply.send(result).ok();
			}
			Control::Resume(reply) => {
				let result = self.resume();
				reply.send(result).ok();
			}
			Control::Forward(signal, reply) => {
				let result = self.forward(signal);
				reply.send(result).ok();
			}
		}
	}

	fn prepare(&mut self) -> Result<(), StartError> {
		if matches!(self.state, ProcessState::Unstarted) && self.outputs.is_none() {
			debug!("opening output redirections");
			self.outputs = Some(self.command.open_outputs()?);
		}
		Ok(())
	}

	fn start(&mut self) -> Result<Started, StartError> {
		match &self.state {
			ProcessState::Unstarted => {}
			ProcessState::Running {
				pid,
				suspended: false,
				..
			} => {
				debug!(pid, "command is already running");
				return Ok(Started::AlreadyRunning { pid: *pid });
			}
			ProcessState::Running {
				pid,
				suspended: true,
				..
			} => {
				let pid = *pid;
				debug!(pid, "command is suspended, resuming instead of spawning");
				self.resume().map_err(StartError::Resume)?;
				return Ok(Started::Resumed { pid });
			}
			ProcessState::Exited(_) => return Err(StartError::Ended),
		}

		let outputs = match self.outputs.take() {
			Some(outputs) => outputs,
			None => self.command.open_outputs()?,
		};
		let mut spawnable = self.command.to_spawnable(outputs);
		let spawn_error = |err| StartError::Spawn {
			program: self.command.program.clone(),
			err,
		};

		let child = spawnable.spawn().map_err(spawn_error)?;
		let pid = child
			.id()
			.ok_or_else(|| spawn_error(io::Error::other("process ended before it was identified")))?;

		info!(pid, command=%self.command, "started command");
		self.state = ProcessState::Running {
			child,
			pid,
			suspended: false,
		};
		self.publish();
		Ok(Started::Spawned { pid })
	}

	fn suspend(&mut self) -> Result<(), SignalError> {
		self.set_suspended(true, Signal::Suspend)
	}

	fn resume(&mut self) -> Result<(), SignalError> {
		self.set_suspended(false, Signal::Continue)
	}

	fn set_suspended(&mut self, want: bool, signal: Signal) -> Result<(), SignalError> {
		match &mut self.state {
			ProcessState::Unstarted => Err(SignalError::NotStarted { signal }),
			ProcessState::Exited(_) => Err(SignalError::Gone { signal }),
			ProcessState::Running { suspended, .. } if *suspended == want => {
				Err(SignalError::WrongState {
					signal,
					state: if want { "suspended" } else { "running" },
				})
			}
			ProcessState::Running { pid, suspended, .. } => {
				send(*pid, signal)?;
				*suspended = want;
				info!(pid = *pid, "{} command", if want { "suspended" } else { "resumed" });
				self.publish();
				Ok(())
			}
		}
	}

	fn forward(&mut self, signal: Signal) -> Result<(), SignalError> {
		match &self.state {
			ProcessState::Running { pid, suspended, .. } => {
				info!(pid, ?signal, suspended, "forwarding signal to command");
				send(*pid, signal)
			}
			ProcessState::Unstarted if signal.is_termination() => {
				info!(?signal, "asked to end before the command was started");
				self.finish(ProcessEnd::ExitSignal(signal));
				Ok(())
			}
			ProcessState::Unstarted => Err(SignalError::NotStarted { signal }),
			ProcessState::Exited(_) => Err(SignalError::Gone { signal }),
		}
	}
}

/// Signal the process group led by `pid`.
fn send(pid: u32, signal: Signal) -> Result<(), SignalError> {
	let nix = signal.to_nix().ok_or(SignalError::Unsupported { signal })?;
	let group = i32::try_from(pid).map_err(|_| SignalError::Os {
		signal,
		pid,
		err: io::Error::from(io::ErrorKind::InvalidInput),
	})?;

	trace!(pid, ?signal, "sending signal to process group");
	killpg(Pid::from_raw(group), nix).map_err(|errno| {
		let err = io::Error::from(errno);
		warn!(pid, ?signal, %err, "signal not delivered");
		SignalError::Os { signal, pid, err }
	})
}
