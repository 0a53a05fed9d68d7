//! The scheduler: the state machine which drives the command from the window.

use std::{fmt, time::Duration};

use tokio::{select, time::sleep};
use tracing::{debug, info, warn};

use crate::{
	clock::Clock,
	controller::{Controller, ExitNotification},
	errors::StartError,
	process::ProcessEnd,
	window::{TimeOfDay, Window},
};

/// Where the scheduler is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
	/// Not yet looked at the clock.
	Idle,

	/// Outside the window, before the command was ever started.
	AwaitingStart,

	/// Inside the window, with the command running.
	ActiveWindow,

	/// Outside the window, with the command suspended.
	Paused,

	/// The command has ended. This is terminal.
	Done,
}

/// What a timer does when it fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Timer {
	/// Start the command for the first time.
	Start,

	/// Suspend the command.
	Pause,

	/// Resume the command.
	Resume,
}

/// A timer which is armed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline {
	/// What happens when it fires.
	pub timer: Timer,

	/// How long from when it was armed until it fires.
	pub after: Duration,
}

/// A change of [`Phase`], as seen by a [transition hook](Scheduler::on_transition).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
	/// The phase left.
	pub from: Phase,

	/// The phase entered.
	pub to: Phase,

	/// The timer armed on entering, if any.
	pub armed: Option<Deadline>,
}

impl fmt::Display for Transition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:?} -> {:?}", self.from, self.to)?;
		if let Some(Deadline { timer, after }) = self.armed {
			write!(f, " ({timer:?} in {after:?})")?;
		}
		Ok(())
	}
}

/// A function called on every phase change.
pub type TransitionHook = Box<dyn FnMut(&Transition) + Send + Sync>;

enum Event {
	Ended(ProcessEnd),
	Fired(Timer),
}

/// Drives a [`Controller`] through the window, until the command ends.
///
/// | Phase | On | Does | Then |
/// |---|---|---|---|
/// | Idle | unrestricted window | start | ActiveWindow, no timer |
/// | Idle | outside the window | arm start timer | AwaitingStart |
/// | Idle | inside the window | start, arm pause timer | ActiveWindow |
/// | AwaitingStart | start timer | start, arm pause timer | ActiveWindow |
/// | ActiveWindow | pause timer | suspend, arm resume timer | Paused |
/// | Paused | resume timer | resume, arm pause timer | ActiveWindow |
/// | any | command ended | | Done |
///
/// There is at most one timer armed at any time, and its duration is computed from the clock at
/// the moment it is armed. When a timer fires, the clock is checked again, and if the boundary
/// hasn't actually been crossed the same timer is re-armed instead.
///
/// When the command ends at the same time as a timer fires, the end wins.
pub struct Scheduler<C> {
	window: Window,
	clock: C,
	controller: Controller,
	exit: ExitNotification,
	phase: Phase,
	hook: Option<TransitionHook>,
}

impl<C> fmt::Debug for Scheduler<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scheduler")
			.field("window", &self.window)
			.field("phase", &self.phase)
			.field("controller", &self.controller)
			.finish_non_exhaustive()
	}
}

impl<C: Clock> Scheduler<C> {
	/// A scheduler for the command behind `controller`.
	///
	/// `exit` must be the notification which came with the controller.
	pub fn new(window: Window, clock: C, controller: Controller, exit: ExitNotification) -> Self {
		Self {
			window,
			clock,
			controller,
			exit,
			phase: Phase::Idle,
			hook: None,
		}
	}

	/// Set a function to call on every phase change.
	///
	/// It runs inline in the scheduler, so it should return quickly.
	#[must_use]
	pub fn on_transition(mut self, hook: impl FnMut(&Transition) + Send + Sync + 'static) -> Self {
		self.hook = Some(Box::new(hook));
		self
	}

	/// Run until the command ends, and return how it did.
	///
	/// Fails only if the command can't be started. Its output redirections are opened first, so that
	/// an unopenable target fails the run right away rather than when the window opens. Errors
	/// suspending or resuming it are logged, and then the scheduler only waits for it to end.
	pub async fn run(mut self) -> Result<ProcessEnd, StartError> {
		let mut armed = self.begin().await?;

		loop {
			let event = if let Some(Deadline { timer, after }) = armed {
				select! {
					biased;
					end = &mut self.exit => Event::Ended(end),
					() = sleep(after) => Event::Fired(timer),
				}
			} else {
				Event::Ended((&mut self.exit).await)
			};

			match event {
				Event::Ended(end) => {
					self.enter(Phase::Done, None);
					return Ok(end);
				}
				Event::Fired(timer) => {
					armed = self.fired(timer).await?;
				}
			}
		}
	}

	fn now(&self) -> TimeOfDay {
		TimeOfDay::of(self.clock.now())
	}

	fn arm(&self, timer: Timer) -> Option<Deadline> {
		let after = self.window.until_next_transition_from(self.clock.now())?;
		info!(?timer, seconds = after.as_secs(), "waiting for the next window boundary");
		Some(Deadline { timer, after })
	}

	fn enter(&mut self, phase: Phase, armed: Option<Deadline>) {
		let transition = Transition {
			from: self.phase,
			to: phase,
			armed,
		};
		debug!(%transition, "scheduler transition");

		self.phase = phase;
		if let Some(hook) = self.hook.as_mut() {
			hook(&transition);
		}
	}

	async fn begin(&mut self) -> Result<Option<Deadline>, StartError> {
		self.controller.prepare().await?;

		if self.window.is_unrestricted() {
			info!("no window restriction, starting command now");
			self.start().await?;
			self.enter(Phase::ActiveWindow, None);
			return Ok(None);
		}

		if self.window.contains(self.now()) {
			info!(window=%self.window, "inside the window, starting command now");
			let armed = self.start().await?.then(|| self.arm(Timer::Pause)).flatten();
			self.enter(Phase::ActiveWindow, armed);
			Ok(armed)
		} else {
			info!(window=%self.window, "outside the window, waiting for it to open");
			let armed = self.arm(Timer::Start);
			self.enter(Phase::AwaitingStart, armed);
			Ok(armed)
		}
	}

	/// Start the command, returning whether it did.
	///
	/// It doesn't when the run ended before the command ever started, in which case the exit
	/// notification is already resolved.
	async fn start(&self) -> Result<bool, StartError> {
		match self.controller.start().await {
			Ok(started) => {
				debug!(?started, "command started");
				Ok(true)
			}
			Err(StartError::Ended) => {
				debug!("run ended before the command could start");
				Ok(false)
			}
			Err(err) => Err(err),
		}
	}

	async fn fired(&mut self, timer: Timer) -> Result<Option<Deadline>, StartError> {
		let inside = self.window.contains(self.now());
		let crossed = match timer {
			Timer::Start | Timer::Resume => inside,
			Timer::Pause => !inside,
		};

		if !crossed {
			debug!(?timer, "timer fired ahead of the boundary, re-arming");
			return Ok(self.arm(timer));
		}

		match timer {
			Timer::Start => {
				info!("window opened, starting command");
				let armed = self.start().await?.then(|| self.arm(Timer::Pause)).flatten();
				self.enter(Phase::ActiveWindow, armed);
				Ok(armed)
			}
			Timer::Pause => {
				info!("window closed, pausing command");
				let armed = match self.controller.suspend().await {
					Ok(()) => self.arm(Timer::Resume),
					Err(err) => {
						warn!(%err, "could not pause command, it has probably ended");
						None
					}
				};
				self.enter(Phase::Paused, armed);
				Ok(armed)
			}
			Timer::Resume => {
				info!("window opened, resuming command");
				let armed = match self.controller.resume().await {
					Ok(()) => self.arm(Timer::Pause),
					Err(err) => {
						warn!(%err, "could not resume command, it has probably ended");
						None
					}
				};
				self.enter(Phase::ActiveWindow, armed);
				Ok(armed)
			}
		}
	}
}

#[cfg(test)]
mod test;
