//! What to run, and when.

use crate::{
	command::Command,
	errors::ConfigError,
	window::{TimeOfDay, Window},
};

/// The complete configuration of a supervised run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
	/// The daily window the command is allowed to run in.
	pub window: Window,

	/// The command to run.
	pub command: Command,
}

impl Config {
	/// Validate and assemble a configuration.
	///
	/// Both window boundaries must be given, or neither: with neither, the command runs unrestricted.
	pub fn new(
		start: Option<TimeOfDay>,
		stop: Option<TimeOfDay>,
		command: Command,
	) -> Result<Self, ConfigError> {
		if command.program.as_os_str().is_empty() {
			return Err(ConfigError::EmptyCommand);
		}

		Ok(Self {
			window: Window::from_bounds(start, stop)?,
			command,
		})
	}
}

impl Window {
	/// A window from optional boundaries.
	///
	/// Neither boundary means unrestricted; just one is an error.
	pub fn from_bounds(start: Option<TimeOfDay>, stop: Option<TimeOfDay>) -> Result<Self, ConfigError> {
		match (start, stop) {
			(Some(start), Some(stop)) => Ok(Self::new(start, stop)),
			(None, None) => Ok(Self::unrestricted()),
			(Some(_), None) => Err(ConfigError::HalfWindow { given: "start" }),
			(None, Some(_)) => Err(ConfigError::HalfWindow { given: "stop" }),
		}
	}
}
