//! Command construction and configuration.

use std::{
	fmt,
	fs::{File, OpenOptions},
	path::{Path, PathBuf},
	process::Stdio,
};

use tokio::process::Command as TokioCommand;
use tracing::trace;

use crate::errors::{StartError, Stream};

/// Where one of the command's output streams goes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Output {
	/// Share the supervisor's own stream.
	#[default]
	Inherit,

	/// Append to a file, creating it if needed.
	Append(PathBuf),
}

/// The command to supervise.
///
/// ```
/// # use timewindow_supervisor::command::{Command, Output};
/// Command {
///     program: "ping".into(),
///     args: vec!["-c".into(), "4".into(), "example.com".into()],
///     stdout: Output::Append("ping.log".into()),
///     stderr: Output::Inherit,
/// };
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Command {
	/// Path or name of the program.
	pub program: PathBuf,

	/// The arguments to pass.
	pub args: Vec<String>,

	/// Where the program's standard output goes.
	pub stdout: Output,

	/// Where the program's standard error goes.
	pub stderr: Output,
}

impl Command {
	/// A command with both output streams inherited.
	pub fn new(program: impl Into<PathBuf>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
		Self {
			program: program.into(),
			args: args.into_iter().map(Into::into).collect(),
			stdout: Output::Inherit,
			stderr: Output::Inherit,
		}
	}

	/// Open the output redirection targets, creating them if needed.
	///
	/// When both streams are redirected to the same file, it's opened once and shared.
	pub fn open_outputs(&self) -> Result<Outputs, StartError> {
		match (&self.stdout, &self.stderr) {
			(Output::Append(out), Output::Append(err)) if out == err => {
				let file = append(out, Stream::Stdout)?;
				let shared = file.try_clone().map_err(|err| StartError::Redirect {
					stream: Stream::Stderr,
					path: out.clone(),
					err,
				})?;
				Ok(Outputs {
					stdout: Some(file),
					stderr: Some(shared),
				})
			}
			(stdout, stderr) => Ok(Outputs {
				stdout: stdout.path().map(|path| append(path, Stream::Stdout)).transpose()?,
				stderr: stderr.path().map(|path| append(path, Stream::Stderr)).transpose()?,
			}),
		}
	}

	/// Obtain a [`tokio::process::Command`], writing to the opened `outputs`.
	///
	/// The program is placed in its own process group, so that suspending and resuming it reaches
	/// every process it spawned, and so that a `Ctrl-C` at the terminal reaches it only once, through
	/// the supervisor. Its standard input is closed, as a background process group can't read from
	/// the terminal.
	#[must_use]
	pub fn to_spawnable(&self, outputs: Outputs) -> TokioCommand {
		trace!(command=?self, ?outputs, "constructing command");

		let mut cmd = TokioCommand::new(&self.program);
		cmd.args(&self.args)
			.stdin(Stdio::null())
			.process_group(0)
			.kill_on_drop(false);

		if let Some(file) = outputs.stdout {
			cmd.stdout(file);
		}
		if let Some(file) = outputs.stderr {
			cmd.stderr(file);
		}

		cmd
	}
}

impl Output {
	fn path(&self) -> Option<&Path> {
		match self {
			Self::Inherit => None,
			Self::Append(path) => Some(path),
		}
	}
}

/// The command's redirected output streams, opened ahead of spawning.
///
/// A stream which isn't redirected is `None`, and is inherited.
#[derive(Debug, Default)]
pub struct Outputs {
	stdout: Option<File>,
	stderr: Option<File>,
}

fn append(path: &Path, stream: Stream) -> Result<File, StartError> {
	trace!(?path, %stream, "opening redirection target");
	OpenOptions::new()
		.append(true)
		.create(true)
		.open(path)
		.map_err(|err| StartError::Redirect {
			stream,
			path: path.to_owned(),
			err,
		})
}

impl fmt::Display for Command {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.program.display())?;
		for arg in &self.args {
			write!(f, " {arg}")?;
		}

		Ok(())
	}
}
