//! Relaying termination signals from the supervisor to the command.

use tokio::{
	select,
	signal::unix::{signal, SignalKind},
	task::JoinHandle,
};
use tracing::{debug, trace, warn};

use crate::{controller::Controller, errors::CriticalError, signal::Signal};

/// A background task relaying `SIGINT` and `SIGTERM` to the command.
///
/// Every signal received is forwarded through the [`Controller`], and listening carries on: the
/// supervisor only ends when the command does, however many signals it's sent. The proxy itself
/// never decides to exit.
///
/// Once the listeners are installed, these signals no longer have their default effect on the
/// supervisor, for the lifetime of the process.
#[derive(Debug)]
pub struct SignalProxy {
	task: JoinHandle<()>,
}

impl SignalProxy {
	/// Install the signal listeners and start relaying.
	///
	/// Fails if a listener can't be installed. Must be called from within a Tokio runtime.
	pub fn spawn(controller: Controller) -> Result<Self, CriticalError> {
		macro_rules! listen {
			($kind:ident, $sig:expr) => {{
				trace!(kind=%stringify!($kind), "listening for unix signal");
				signal(SignalKind::$kind()).map_err(|err| CriticalError::SignalListener {
					signal: $sig,
					err,
				})?
			}};
		}

		let mut s_interrupt = listen!(interrupt, Signal::Interrupt);
		let mut s_terminate = listen!(terminate, Signal::Terminate);

		let task = tokio::spawn(async move {
			loop {
				let sig = select!(
					Some(()) = s_interrupt.recv() => Signal::Interrupt,
					Some(()) = s_terminate.recv() => Signal::Terminate,
					else => break,
				);

				debug!(?sig, "received unix signal, relaying to command");
				if let Err(err) = controller.forward(sig).await {
					warn!(?sig, %err, "could not relay signal to command");
				}
			}

			trace!("signal listeners closed");
		});

		Ok(Self { task })
	}

	/// Stop relaying.
	pub fn abort(&self) {
		self.task.abort();
	}
}
