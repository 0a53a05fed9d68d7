//! Where the scheduler gets the current time from.

use std::time::Instant;

use chrono::{DateTime, Utc};

/// A source of wall-clock time.
///
/// The scheduler samples this every time it arms a timer, and never does date arithmetic on past
/// samples.
pub trait Clock: Send + Sync + 'static {
	/// The current instant.
	fn now(&self) -> DateTime<Utc>;
}

/// The system's wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}
}

/// A clock which started at a chosen instant and runs at real speed from there.
///
/// Useful to place a run right before a window boundary.
#[derive(Clone, Copy, Debug)]
pub struct OffsetClock {
	origin: DateTime<Utc>,
	started: Instant,
}

impl OffsetClock {
	/// A clock which reads `origin` right now.
	#[must_use]
	pub fn starting_at(origin: DateTime<Utc>) -> Self {
		Self {
			origin,
			started: Instant::now(),
		}
	}
}

impl Clock for OffsetClock {
	fn now(&self) -> DateTime<Utc> {
		// an elapsed time that doesn't fit a TimeDelta is centuries away
		let elapsed = chrono::Duration::from_std(self.started.elapsed())
			.unwrap_or_else(|_| chrono::Duration::zero());
		self.origin + elapsed
	}
}

#[cfg(test)]
mod tests {
	use chrono::TimeZone;

	use super::*;

	#[test]
	fn offset_clock_starts_at_origin_and_moves_forward() {
		let origin = Utc.with_ymd_and_hms(2024, 6, 1, 8, 59, 59).unwrap();
		let clock = OffsetClock::starting_at(origin);

		let first = clock.now();
		let second = clock.now();
		assert!(first >= origin);
		assert!(first - origin < chrono::Duration::seconds(1));
		assert!(second >= first);
	}
}
