use std::path::PathBuf;

use clap::{Parser, ValueHint};
use timewindow_supervisor::{
	command::{Command, Output},
	errors::ConfigError,
};
use tracing::debug;

use super::{OPTSET_COMMAND, OPTSET_OUTPUT};

#[derive(Debug, Clone, Parser)]
pub struct CommandArgs {
	/// Append the command's standard output to a file
	///
	/// The file is created if it doesn't exist, and is always appended to. Without this option, the
	/// command writes to the same standard output as timewindow.
	///
	/// If '--stderr' names the same file, it's opened once and both streams share it.
	#[arg(
		long,
		env = "TIMEWINDOW_STDOUT",
		help_heading = OPTSET_OUTPUT,
		value_hint = ValueHint::FilePath,
		value_name = "PATH",
	)]
	pub stdout: Option<PathBuf>,

	/// Append the command's standard error to a file
	///
	/// The file is created if it doesn't exist, and is always appended to. Without this option, the
	/// command writes to the same standard error as timewindow.
	#[arg(
		long,
		env = "TIMEWINDOW_STDERR",
		help_heading = OPTSET_OUTPUT,
		value_hint = ValueHint::FilePath,
		value_name = "PATH",
	)]
	pub stderr: Option<PathBuf>,

	/// Command to run
	///
	/// A single argument is split into words following shell quoting rules, so the whole command
	/// line can be given as one string. Several arguments are used as they are, as is anything after
	/// a '--', which can be used to pass a program whose name has spaces in it.
	///
	/// The command is executed directly, not through a shell.
	#[arg(
		trailing_var_arg = true,
		num_args = 1..,
		required = true,
		help_heading = OPTSET_COMMAND,
		value_name = "COMMAND",
	)]
	pub command: Vec<String>,

	/// Whether the command was given after a '--'.
	#[arg(skip)]
	pub verbatim: bool,
}

impl CommandArgs {
	/// The words of the command line: program first.
	fn words(&self) -> Result<Vec<String>, ConfigError> {
		match self.command.as_slice() {
			[] => Err(ConfigError::EmptyCommand),
			[line] if !self.verbatim => {
				let words = shlex::split(line).ok_or_else(|| ConfigError::Unsplittable {
					line: line.clone(),
				})?;
				debug!(?line, ?words, "split command line");
				Ok(words)
			}
			words => Ok(words.to_vec()),
		}
	}

	pub fn to_command(&self) -> Result<Command, ConfigError> {
		let mut words = self.words()?.into_iter();
		let program = words.next().ok_or(ConfigError::EmptyCommand)?;

		Ok(Command {
			program: program.into(),
			args: words.collect(),
			stdout: self.stdout.clone().map_or(Output::Inherit, Output::Append),
			stderr: self.stderr.clone().map_or(Output::Inherit, Output::Append),
		})
	}
}
