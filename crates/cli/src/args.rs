use std::{env, ffi::OsString, process::ExitCode};

use clap::{Parser, ValueHint};
use timewindow_supervisor::{config::Config, errors::ConfigError, window::TimeOfDay};
use tracing::debug;

use crate::SUPERVISOR_FAILURE;

pub use self::{command::CommandArgs, logging::LoggingArgs};

mod command;
pub(crate) mod logging;

const OPTSET_WINDOW: &str = "Window options";
const OPTSET_COMMAND: &str = "Command options";
const OPTSET_OUTPUT: &str = "Output options";
const OPTSET_DEBUGGING: &str = "Debugging options";

/// Run a command only inside a daily time window.
///
/// The command is started when the window opens. When the window closes, the command is suspended
/// in place (SIGSTOP), and it is resumed (SIGCONT) when the window opens again, until it ends.
/// SIGINT and SIGTERM received by timewindow are relayed to the command.
///
/// timewindow exits with the command's exit code, or 128+N if the command was killed by signal N,
/// or 125 if the command couldn't be run at all.
#[derive(Debug, Clone, Parser)]
#[command(
	name = "timewindow",
	author,
	version,
	after_help = "Times are in UTC. A window can span midnight: '--start-time 22:00 --stop-time 06:00' runs the command at night.",
	hide_possible_values = true,
)]
#[cfg_attr(debug_assertions, command(before_help = "⚠ DEBUG BUILD ⚠"))]
pub struct Args {
	/// Time of day the window opens, as HH:MM in UTC
	///
	/// Both '--start-time' and '--stop-time' must be given, or neither. With neither, or with both
	/// the same, the command runs without restriction.
	#[arg(
		long,
		env = "TIMEWINDOW_START_TIME",
		help_heading = OPTSET_WINDOW,
		value_hint = ValueHint::Other,
		value_name = "HH:MM",
	)]
	pub start_time: Option<TimeOfDay>,

	/// Time of day the window closes, as HH:MM in UTC
	#[arg(
		long,
		env = "TIMEWINDOW_STOP_TIME",
		help_heading = OPTSET_WINDOW,
		value_hint = ValueHint::Other,
		value_name = "HH:MM",
	)]
	pub stop_time: Option<TimeOfDay>,

	#[command(flatten)]
	pub command: CommandArgs,

	#[command(flatten)]
	pub logging: LoggingArgs,
}

impl Args {
	/// Parse from raw arguments, the first being the program name.
	///
	/// The command is verbatim only if it's everything after the first '--', i.e. if that '--' is
	/// the separator before the command rather than something following it.
	pub fn parse_raw(raw_args: Vec<OsString>) -> Result<Self, clap::Error> {
		let after_separator = raw_args
			.iter()
			.skip(1)
			.position(|arg| arg == "--")
			.map(|at| raw_args[at + 2..].to_vec());

		let mut args = Self::try_parse_from(raw_args)?;
		args.command.verbatim = after_separator.is_some_and(|rest| {
			rest.iter()
				.map(|arg| arg.to_str())
				.eq(args.command.command.iter().map(|word| Some(word.as_str())))
		});
		Ok(args)
	}

	/// The immutable configuration for the run.
	pub fn to_config(&self) -> Result<Config, ConfigError> {
		Config::new(self.start_time, self.stop_time, self.command.to_command()?)
	}
}

/// Parse the process's arguments.
///
/// On failure, or for `--help` and `--version`, the output is printed and the exit code returned.
pub fn get_args() -> Result<Args, ExitCode> {
	let raw_args: Vec<OsString> = env::args_os().collect();
	debug!(?raw_args, "parsing arguments");

	Args::parse_raw(raw_args).map_err(|err| {
		err.print().ok();
		if err.use_stderr() {
			ExitCode::from(SUPERVISOR_FAILURE)
		} else {
			ExitCode::SUCCESS
		}
	})
}
