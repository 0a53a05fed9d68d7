use std::{num::NonZeroI32, time::Duration};

use chrono::{DateTime, TimeZone, Utc};
use tokio::{
	sync::{mpsc, oneshot, watch},
	time::timeout,
};

use crate::{
	clock::OffsetClock,
	command::{Command, Output},
	controller::{start_controller, Control, Controller, ExitNotification, Lifecycle, Started},
	errors::{SignalError, StartError},
	process::ProcessEnd,
	signal::Signal,
	window::{TimeOfDay, Window},
};

use super::{Deadline, Phase, Scheduler, Timer, Transition};

const HOUR: Duration = Duration::from_secs(3600);

fn sh(script: &str) -> Command {
	Command::new("sh", ["-c", script])
}

fn hm(hours: u32, minutes: u32) -> TimeOfDay {
	TimeOfDay::from_hm(hours, minutes)
}

fn at(hours: u32, minutes: u32, seconds: u32, millis: i64) -> DateTime<Utc> {
	Utc.with_ymd_and_hms(2024, 6, 1, hours, minutes, seconds)
		.unwrap()
		+ chrono::Duration::milliseconds(millis)
}

fn recorder() -> (
	impl FnMut(&Transition) + Send + Sync + 'static,
	mpsc::UnboundedReceiver<Transition>,
) {
	let (sender, receiver) = mpsc::unbounded_channel();
	(
		move |transition: &Transition| {
			sender.send(*transition).ok();
		},
		receiver,
	)
}

async fn next(transitions: &mut mpsc::UnboundedReceiver<Transition>) -> Transition {
	timeout(Duration::from_secs(10), transitions.recv())
		.await
		.expect("scheduler should have moved on")
		.expect("scheduler should still be running")
}

fn assert_armed(transition: Transition, from: Phase, to: Phase, timer: Timer, within: (Duration, Duration)) {
	assert_eq!((transition.from, transition.to), (from, to), "{transition}");
	let Some(Deadline { timer: armed, after }) = transition.armed else {
		panic!("expected a timer to be armed: {transition}");
	};
	assert_eq!(armed, timer, "{transition}");
	assert!(
		within.0 < after && after <= within.1,
		"{transition}: expected within {within:?}"
	);
}

/// A controller with no real process behind it, whose suspend and resume fail when told to.
///
/// The run ends when something is sent on the returned sender.
fn scripted_controller(
	suspend_fails: bool,
	resume_fails: bool,
) -> (Controller, ExitNotification, oneshot::Sender<ProcessEnd>) {
	const PID: u32 = 4242;

	let (sender, mut receiver) = mpsc::unbounded_channel();
	let (lifecycle, watcher) = watch::channel(Lifecycle::Unstarted);
	let (exit_sender, exit_receiver) = oneshot::channel();

	tokio::spawn(async move {
		while let Some(control) = receiver.recv().await {
			match control {
				Control::Prepare(reply) => {
					reply.send(Ok(())).ok();
				}
				Control::Start(reply) => {
					lifecycle.send_replace(Lifecycle::Running { pid: PID });
					reply.send(Ok(Started::Spawned { pid: PID })).ok();
				}
				Control::Suspend(reply) => {
					let result = if suspend_fails {
						Err(SignalError::Gone {
							signal: Signal::Suspend,
						})
					} else {
						lifecycle.send_replace(Lifecycle::Suspended { pid: PID });
						Ok(())
					};
					reply.send(result).ok();
				}
				Control::Resume(reply) => {
					let result = if resume_fails {
						Err(SignalError::Gone {
							signal: Signal::Continue,
						})
					} else {
						lifecycle.send_replace(Lifecycle::Running { pid: PID });
						Ok(())
					};
					reply.send(result).ok();
				}
				Control::Forward(_, reply) => {
					reply.send(Ok(())).ok();
				}
			}
		}
	});

	(
		Controller {
			sender,
			lifecycle: watcher,
		},
		ExitNotification(exit_receiver),
		exit_sender,
	)
}

fn done(from: Phase) -> Transition {
	Transition {
		from,
		to: Phase::Done,
		armed: None,
	}
}

#[tokio::test]
async fn unrestricted_window_starts_immediately_without_timers() {
	let (controller, exit) = start_controller(sh("exit 3"));
	let (hook, mut transitions) = recorder();

	let end = Scheduler::new(
		Window::new(hm(9, 0), hm(9, 0)),
		OffsetClock::starting_at(at(3, 0, 0, 0)),
		controller,
		exit,
	)
	.on_transition(hook)
	.run()
	.await
	.unwrap();

	assert_eq!(end.exit_code(), 3);
	assert_eq!(
		next(&mut transitions).await,
		Transition {
			from: Phase::Idle,
			to: Phase::ActiveWindow,
			armed: None,
		}
	);
	assert_eq!(next(&mut transitions).await, done(Phase::ActiveWindow));
}

#[tokio::test]
async fn outside_window_waits_for_the_start() {
	let (controller, exit) = start_controller(Command::new("sleep", ["30"]));
	let (hook, mut transitions) = recorder();

	let run = tokio::spawn(
		Scheduler::new(
			Window::new(hm(9, 0), hm(17, 0)),
			OffsetClock::starting_at(at(8, 0, 0, 0)),
			controller.clone(),
			exit,
		)
		.on_transition(hook)
		.run(),
	);

	assert_armed(
		next(&mut transitions).await,
		Phase::Idle,
		Phase::AwaitingStart,
		Timer::Start,
		(HOUR - Duration::from_secs(1), HOUR),
	);
	assert_eq!(controller.lifecycle(), Lifecycle::Unstarted);

	controller.forward(Signal::Terminate).await.unwrap();

	let end = run.await.unwrap().unwrap();
	assert_eq!(end, ProcessEnd::ExitSignal(Signal::Terminate));
	assert_eq!(end.exit_code(), 143);
	assert_eq!(next(&mut transitions).await, done(Phase::AwaitingStart));
}

#[tokio::test]
async fn starts_when_the_window_opens() {
	let (controller, exit) = start_controller(sh("exit 4"));
	let (hook, mut transitions) = recorder();

	let end = timeout(
		Duration::from_secs(10),
		Scheduler::new(
			Window::new(hm(9, 0), hm(17, 0)),
			OffsetClock::starting_at(at(8, 59, 59, 600)),
			controller,
			exit,
		)
		.on_transition(hook)
		.run(),
	)
	.await
	.unwrap()
	.unwrap();

	assert_eq!(end.exit_code(), 4);
	assert_armed(
		next(&mut transitions).await,
		Phase::Idle,
		Phase::AwaitingStart,
		Timer::Start,
		(Duration::ZERO, Duration::from_millis(400)),
	);
	assert_armed(
		next(&mut transitions).await,
		Phase::AwaitingStart,
		Phase::ActiveWindow,
		Timer::Pause,
		(8 * HOUR - Duration::from_secs(1), 8 * HOUR),
	);
	assert_eq!(next(&mut transitions).await, done(Phase::ActiveWindow));
}

#[tokio::test]
async fn inside_a_midnight_spanning_window_starts_immediately() {
	let (controller, exit) = start_controller(Command::new("true", Vec::<String>::new()));
	let (hook, mut transitions) = recorder();

	let end = Scheduler::new(
		Window::new(hm(22, 0), hm(6, 0)),
		OffsetClock::starting_at(at(23, 0, 0, 0)),
		controller,
		exit,
	)
	.on_transition(hook)
	.run()
	.await
	.unwrap();

	assert!(end.is_success());
	assert_armed(
		next(&mut transitions).await,
		Phase::Idle,
		Phase::ActiveWindow,
		Timer::Pause,
		(7 * HOUR - Duration::from_secs(1), 7 * HOUR),
	);
	assert_eq!(next(&mut transitions).await, done(Phase::ActiveWindow));
}

#[tokio::test]
async fn pauses_then_resumes_the_same_process() {
	// a window which is only closed for the one second 09:00:00
	let window = Window::new(TimeOfDay::from_seconds(32_401), TimeOfDay::from_seconds(32_400));
	let (controller, exit) = start_controller(Command::new("sleep", ["3"]));
	let (hook, mut transitions) = recorder();

	let run = tokio::spawn(
		Scheduler::new(
			window,
			OffsetClock::starting_at(at(8, 59, 59, 700)),
			controller.clone(),
			exit,
		)
		.on_transition(hook)
		.run(),
	);

	assert_armed(
		next(&mut transitions).await,
		Phase::Idle,
		Phase::ActiveWindow,
		Timer::Pause,
		(Duration::ZERO, Duration::from_millis(300)),
	);
	let Lifecycle::Running { pid } = controller.lifecycle() else {
		panic!("command should be running");
	};

	assert_armed(
		next(&mut transitions).await,
		Phase::ActiveWindow,
		Phase::Paused,
		Timer::Resume,
		(Duration::ZERO, Duration::from_secs(1)),
	);
	assert_eq!(controller.lifecycle(), Lifecycle::Suspended { pid });

	assert_armed(
		next(&mut transitions).await,
		Phase::Paused,
		Phase::ActiveWindow,
		Timer::Pause,
		(24 * HOUR - Duration::from_secs(2), 24 * HOUR),
	);
	assert_eq!(controller.lifecycle(), Lifecycle::Running { pid });

	let end = timeout(Duration::from_secs(10), run)
		.await
		.unwrap()
		.unwrap()
		.unwrap();
	assert!(end.is_success());
	assert_eq!(next(&mut transitions).await, done(Phase::ActiveWindow));
}

#[tokio::test]
async fn command_ending_while_paused_is_done() {
	// a window which is only open for the one second 09:00:00
	let window = Window::new(TimeOfDay::from_seconds(32_400), TimeOfDay::from_seconds(32_401));
	let (controller, exit) = start_controller(Command::new("sleep", ["30"]));
	let (hook, mut transitions) = recorder();

	let run = tokio::spawn(
		Scheduler::new(
			window,
			OffsetClock::starting_at(at(8, 59, 59, 700)),
			controller.clone(),
			exit,
		)
		.on_transition(hook)
		.run(),
	);

	let mut paused = next(&mut transitions).await;
	while paused.to != Phase::Paused {
		paused = next(&mut transitions).await;
	}
	assert_armed(
		paused,
		Phase::ActiveWindow,
		Phase::Paused,
		Timer::Resume,
		(24 * HOUR - Duration::from_secs(2), 24 * HOUR),
	);

	let Lifecycle::Suspended { pid } = controller.lifecycle() else {
		panic!("command should be suspended");
	};
	nix::sys::signal::kill(
		nix::unistd::Pid::from_raw(pid as i32),
		nix::sys::signal::Signal::SIGKILL,
	)
	.unwrap();

	let end = timeout(Duration::from_secs(10), run)
		.await
		.unwrap()
		.unwrap()
		.unwrap();
	assert_eq!(end, ProcessEnd::ExitSignal(Signal::ForceStop));
	assert_eq!(end.exit_code(), 137);
	assert_eq!(next(&mut transitions).await, done(Phase::Paused));
}

#[tokio::test]
async fn interrupt_while_active_ends_with_130() {
	let (controller, exit) = start_controller(Command::new("sleep", ["30"]));
	let (hook, mut transitions) = recorder();

	let run = tokio::spawn(
		Scheduler::new(
			Window::unrestricted(),
			OffsetClock::starting_at(at(12, 0, 0, 0)),
			controller.clone(),
			exit,
		)
		.on_transition(hook)
		.run(),
	);

	assert_eq!(next(&mut transitions).await.to, Phase::ActiveWindow);
	controller.forward(Signal::Interrupt).await.unwrap();

	let end = timeout(Duration::from_secs(10), run)
		.await
		.unwrap()
		.unwrap()
		.unwrap();
	assert_eq!(end.exit_code(), 130);
}

#[tokio::test]
async fn start_failure_is_fatal_before_the_window_is_active() {
	let (controller, exit) = start_controller(Command::new("/does/not/exist", Vec::<String>::new()));
	let (hook, mut transitions) = recorder();

	let result = Scheduler::new(
		Window::unrestricted(),
		OffsetClock::starting_at(at(12, 0, 0, 0)),
		controller,
		exit,
	)
	.on_transition(hook)
	.run()
	.await;

	assert!(matches!(result, Err(StartError::Spawn { .. })));
	assert!(transitions.recv().await.is_none());
}

#[tokio::test]
async fn unopenable_redirection_fails_even_outside_the_window() {
	let (controller, exit) = start_controller(Command {
		stdout: Output::Append("/does/not/exist/out.log".into()),
		..Command::new("true", Vec::<String>::new())
	});
	let (hook, mut transitions) = recorder();

	let result = timeout(
		Duration::from_secs(2),
		Scheduler::new(
			Window::new(hm(9, 0), hm(17, 0)),
			OffsetClock::starting_at(at(8, 0, 0, 0)),
			controller.clone(),
			exit,
		)
		.on_transition(hook)
		.run(),
	)
	.await
	.expect("scheduler should fail without waiting for the window");

	assert!(matches!(result, Err(StartError::Redirect { .. })));
	assert!(transitions.recv().await.is_none());
	assert_eq!(controller.lifecycle(), Lifecycle::Unstarted);
}

#[tokio::test]
async fn failing_to_pause_waits_for_the_end_without_timers() {
	// a window which is only closed for the one second 09:00:00
	let window = Window::new(TimeOfDay::from_seconds(32_401), TimeOfDay::from_seconds(32_400));
	let (controller, exit, end_sender) = scripted_controller(true, false);
	let (hook, mut transitions) = recorder();

	let run = tokio::spawn(
		Scheduler::new(
			window,
			OffsetClock::starting_at(at(8, 59, 59, 700)),
			controller,
			exit,
		)
		.on_transition(hook)
		.run(),
	);

	assert_eq!(next(&mut transitions).await.to, Phase::ActiveWindow);
	assert_eq!(
		next(&mut transitions).await,
		Transition {
			from: Phase::ActiveWindow,
			to: Phase::Paused,
			armed: None,
		}
	);

	let status = ProcessEnd::ExitError(NonZeroI32::new(5).unwrap());
	end_sender.send(status).unwrap();

	let end = timeout(Duration::from_secs(10), run)
		.await
		.unwrap()
		.unwrap()
		.unwrap();
	assert_eq!(end, status);
	assert_eq!(next(&mut transitions).await, done(Phase::Paused));
}

#[tokio::test]
async fn failing_to_resume_waits_for_the_end_without_timers() {
	// a window which is only closed for the one second 09:00:00
	let window = Window::new(TimeOfDay::from_seconds(32_401), TimeOfDay::from_seconds(32_400));
	let (controller, exit, end_sender) = scripted_controller(false, true);
	let (hook, mut transitions) = recorder();

	let run = tokio::spawn(
		Scheduler::new(
			window,
			OffsetClock::starting_at(at(8, 59, 59, 700)),
			controller,
			exit,
		)
		.on_transition(hook)
		.run(),
	);

	assert_eq!(next(&mut transitions).await.to, Phase::ActiveWindow);
	assert_eq!(next(&mut transitions).await.to, Phase::Paused);
	assert_eq!(
		next(&mut transitions).await,
		Transition {
			from: Phase::Paused,
			to: Phase::ActiveWindow,
			armed: None,
		}
	);

	end_sender.send(ProcessEnd::Success).unwrap();

	let end = timeout(Duration::from_secs(10), run)
		.await
		.unwrap()
		.unwrap()
		.unwrap();
	assert!(end.is_success());
	assert_eq!(next(&mut transitions).await, done(Phase::ActiveWindow));
}
