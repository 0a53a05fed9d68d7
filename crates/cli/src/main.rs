#![deny(rust_2018_idioms)]

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
	timewindow_cli::run().await
}
