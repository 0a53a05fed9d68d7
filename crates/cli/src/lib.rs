#![deny(rust_2018_idioms)]
#![allow(clippy::missing_const_for_fn, clippy::future_not_send)]

use std::process::ExitCode;

use miette::Result;
use timewindow_supervisor::ProcessEnd;
use tracing::{debug, info, warn};

use crate::args::Args;

pub mod args;

/// Exit code for failures of timewindow itself, as opposed to the command's.
pub const SUPERVISOR_FAILURE: u8 = 125;

async fn run_timewindow(args: &Args) -> Result<ProcessEnd> {
	info!(version=%env!("CARGO_PKG_VERSION"), "constructing configuration from CLI");

	let config = args.to_config()?;
	debug!(?config, "configuration");

	let end = timewindow_supervisor::run(&config).await?;
	info!(?end, "done supervising");
	Ok(end)
}

/// Mirror the command's end as an exit code.
#[must_use]
pub fn exit_code(end: ProcessEnd) -> u8 {
	// codes and 128+N from real processes always fit; anything else is still a failure
	u8::try_from(end.exit_code()).unwrap_or(1)
}

pub async fn run() -> ExitCode {
	let log_on = args::logging::preargs();

	let args = match args::get_args() {
		Ok(args) => args,
		Err(code) => return code,
	};
	debug!(?args, "arguments");

	let _guard = if log_on {
		warn!("ignoring logging options from args");
		None
	} else {
		match args::logging::postargs(&args.logging).await {
			Ok(guard) => Some(guard),
			Err(err) => {
				eprintln!("{err:?}");
				return ExitCode::from(SUPERVISOR_FAILURE);
			}
		}
	};

	match run_timewindow(&args).await {
		Ok(end) => ExitCode::from(exit_code(end)),
		Err(err) => {
			eprintln!("{err:?}");
			ExitCode::from(SUPERVISOR_FAILURE)
		}
	}
}

#[cfg(test)]
mod tests {
	use std::num::NonZeroI32;

	use timewindow_supervisor::Signal;

	use super::*;

	#[test]
	fn exit_codes_mirror_the_command() {
		assert_eq!(exit_code(ProcessEnd::Success), 0);
		assert_eq!(exit_code(ProcessEnd::ExitError(NonZeroI32::new(3).unwrap())), 3);
		assert_eq!(exit_code(ProcessEnd::ExitSignal(Signal::Interrupt)), 130);
		assert_eq!(exit_code(ProcessEnd::ExitError(NonZeroI32::new(-1).unwrap())), 1);
	}
}
