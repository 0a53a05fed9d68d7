use std::{env::var, io::stderr, path::PathBuf};

use clap::{ArgAction, Parser, ValueHint};
use miette::{bail, Result};
use tokio::fs::metadata;
use tracing::{info, warn};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Parser)]
pub struct LoggingArgs {
	/// Increase diagnostic log level
	///
	/// By default only warnings and errors are logged, such as a signal which couldn't be delivered
	/// to the command. Use once to log the lifecycle of the command (started, paused, resumed, and
	/// how long until the next window boundary), and more times for more detail, up to '-vvvv'.
	///
	/// Setting $RUST_LOG also works, and takes precedence.
	#[arg(
		long,
		short,
		help_heading = super::OPTSET_DEBUGGING,
		action = ArgAction::Count,
		default_value = "0",
		num_args = 0,
	)]
	pub verbose: u8,

	/// Write diagnostic logs to a file
	///
	/// This writes diagnostic logs to a file, instead of the terminal, in JSON format.
	///
	/// If a path is not provided, the default is the working directory. If the path provided is a
	/// directory, a file will be created in that directory. The file name will be the current date
	/// and time, in the format 'timewindow.YYYY-MM-DDTHH-MM-SSZ.log'.
	#[arg(
		long,
		help_heading = super::OPTSET_DEBUGGING,
		num_args = 0..=1,
		default_missing_value = ".",
		value_hint = ValueHint::AnyPath,
		value_name = "PATH",
	)]
	pub log_file: Option<PathBuf>,
}

impl LoggingArgs {
	fn filter(&self) -> &'static str {
		match self.verbose {
			0 => "warn",
			1 => "info",
			2 => "debug",
			_ => "trace",
		}
	}
}

pub fn preargs() -> bool {
	if var("RUST_LOG").is_ok() {
		match tracing_subscriber::fmt()
			.with_env_filter(EnvFilter::from_default_env())
			.with_writer(stderr)
			.try_init()
		{
			Ok(()) => {
				warn!(RUST_LOG=%var("RUST_LOG").unwrap_or_default(), "logging configured from RUST_LOG");
				return true;
			}
			Err(e) => eprintln!("Failed to initialise logging with RUST_LOG, falling back\n{e}"),
		}
	}

	false
}

pub async fn postargs(args: &LoggingArgs) -> Result<WorkerGuard> {
	let (log_writer, guard) = if let Some(file) = &args.log_file {
		let is_dir = metadata(&file).await.is_ok_and(|info| info.is_dir());
		let (dir, filename) = if is_dir {
			(
				file.to_owned(),
				PathBuf::from(format!(
					"timewindow.{}.log",
					chrono::Utc::now().format("%Y-%m-%dT%H-%M-%SZ")
				)),
			)
		} else if let (Some(parent), Some(file_name)) = (file.parent(), file.file_name()) {
			(parent.into(), PathBuf::from(file_name))
		} else {
			bail!("Failed to determine log file name");
		};

		non_blocking(rolling::never(dir, filename))
	} else {
		non_blocking(stderr())
	};

	let mut builder = tracing_subscriber::fmt().with_env_filter(args.filter());

	if args.verbose > 2 {
		use tracing_subscriber::fmt::format::FmtSpan;
		builder = builder.with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);
	}

	match if args.log_file.is_some() {
		builder.json().with_writer(log_writer).try_init()
	} else if args.verbose > 3 {
		builder.pretty().with_writer(log_writer).try_init()
	} else {
		builder.with_writer(log_writer).try_init()
	} {
		Ok(()) => info!("logging initialised"),
		Err(e) => eprintln!("Failed to initialise logging, continuing with none\n{e}"),
	}

	Ok(guard)
}
