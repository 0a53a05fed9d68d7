//! Time-window process supervisor.
//!
//! This crate runs a single command so that it only executes during a recurring daily window. When
//! the window closes the process is suspended in place (`SIGSTOP`), and when it reopens the process
//! is resumed (`SIGCONT`). The run ends when the process exits, and its end status is handed back
//! so that the caller can mirror it as its own exit code.
//!
//! # Theory of Operation
//!
//! Three pieces cooperate, each running as its own Tokio task or future:
//!
//! - The [`Controller`](controller::Controller) is a handle to a task which owns the child process.
//!   It processes start/suspend/resume/forward messages in order and, in the same loop, waits on
//!   the child. When the child ends, it resolves the run's single
//!   [`ExitNotification`](controller::ExitNotification).
//! - The [`SignalProxy`](proxy::SignalProxy) listens for `SIGINT` and `SIGTERM` aimed at the
//!   supervisor and relays each of them to the child through the controller.
//! - The [`Scheduler`](schedule::Scheduler) is the state machine. It asks the
//!   [`Window`](window::Window) whether the current time is inside the run window, drives the
//!   controller accordingly, and arms a single timer for the next transition. It waits on that
//!   timer and the exit notification, the latter winning any tie.
//!
//! Deadlines are never carried over from one transition to the next: every timer is computed from
//! the wall clock at the moment it is armed.
//!
//! # Example
//!
//! ```no_run
//! # #[tokio::main(flavor = "current_thread")] async fn main() -> miette::Result<()> {
//! use timewindow_supervisor::{
//! 	command::{Command, Output},
//! 	config::Config,
//! 	window::Window,
//! };
//!
//! let config = Config {
//! 	window: Window::new("22:00".parse()?, "06:00".parse()?),
//! 	command: Command {
//! 		program: "rsync".into(),
//! 		args: vec!["-a".into(), "/data/".into(), "backup:/data/".into()],
//! 		stdout: Output::Inherit,
//! 		stderr: Output::Append("sync.err".into()),
//! 	},
//! };
//!
//! let end = timewindow_supervisor::run(&config).await?;
//! std::process::exit(end.exit_code());
//! # }
//! ```

#![warn(clippy::unwrap_used, missing_docs, rustdoc::unescaped_backticks)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(rust_2018_idioms)]

#[cfg(not(unix))]
compile_error!("timewindow suspends processes with SIGSTOP/SIGCONT and only supports Unix targets");

#[doc(inline)]
pub use crate::{process::ProcessEnd, signal::Signal};

pub mod clock;
pub mod command;
pub mod config;
pub mod controller;
pub mod errors;
pub mod process;
pub mod proxy;
pub mod schedule;
pub mod signal;
pub mod window;

use tracing::{debug, info};

use crate::{
	clock::SystemClock, config::Config, controller::start_controller, errors::CriticalError,
	proxy::SignalProxy, schedule::Scheduler,
};

/// Supervise the configured command until it ends.
///
/// This wires the pieces together with the system clock: a controller for the command, a signal
/// proxy relaying `SIGINT`/`SIGTERM`, and a scheduler driving both from the configured window.
///
/// Returns the child's end status, or the fatal error which prevented the run from happening.
pub async fn run(config: &Config) -> Result<ProcessEnd, CriticalError> {
	info!(window=%config.window, command=%config.command, "supervising command");

	let (controller, exit) = start_controller(config.command.clone());
	let proxy = SignalProxy::spawn(controller.clone())?;

	let end = Scheduler::new(config.window, SystemClock, controller, exit)
		.run()
		.await;

	debug!("stopping signal proxy");
	proxy.abort();

	Ok(end?)
}
