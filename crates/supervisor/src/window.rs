//! The daily run window and the arithmetic around it.
//!
//! All times of day are in UTC, for the whole system, so that daylight-saving changes can never make
//! a boundary happen twice or not at all.

use std::{fmt, str::FromStr, time::Duration};

use chrono::{DateTime, NaiveTime, Timelike, Utc};

use crate::errors::TimeParseError;

/// Seconds in a day.
pub const SECONDS_IN_DAY: u32 = 24 * 60 * 60;

/// A time of day, as seconds since UTC midnight.
///
/// Always within `[0, 86400)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u32);

impl TimeOfDay {
	/// Midnight.
	pub const MIDNIGHT: Self = Self(0);

	/// Build a time of day from seconds since midnight, wrapping around whole days.
	#[must_use]
	pub const fn from_seconds(seconds: u32) -> Self {
		Self(seconds % SECONDS_IN_DAY)
	}

	/// Build a time of day from hours and minutes, wrapping around whole days.
	#[must_use]
	pub const fn from_hm(hours: u32, minutes: u32) -> Self {
		Self::from_seconds(hours * 3600 + minutes * 60)
	}

	/// The time of day of an instant.
	#[must_use]
	pub fn of(instant: DateTime<Utc>) -> Self {
		// leap seconds are folded into the preceding second
		Self::from_seconds(instant.num_seconds_from_midnight())
	}

	/// Seconds since midnight.
	#[must_use]
	pub const fn seconds(self) -> u32 {
		self.0
	}

	/// Seconds from `self` until the next occurrence of `later`, looking forward only.
	///
	/// Zero is never returned: if `later` is `self`, its next occurrence is a full day away.
	#[must_use]
	pub const fn seconds_until(self, later: Self) -> u32 {
		match (later.0 + SECONDS_IN_DAY - self.0) % SECONDS_IN_DAY {
			0 => SECONDS_IN_DAY,
			distance => distance,
		}
	}
}

/// Map an instant to seconds since UTC midnight.
#[must_use]
pub fn seconds_since_midnight(instant: DateTime<Utc>) -> TimeOfDay {
	TimeOfDay::of(instant)
}

impl FromStr for TimeOfDay {
	type Err = TimeParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		NaiveTime::parse_from_str(s.trim(), "%H:%M")
			.map(|time| Self(time.num_seconds_from_midnight()))
			.map_err(|_| TimeParseError {
				input: s.to_owned(),
			})
	}
}

impl fmt::Display for TimeOfDay {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let (hours, minutes, seconds) = (self.0 / 3600, self.0 / 60 % 60, self.0 % 60);
		if seconds == 0 {
			write!(f, "{hours:02}:{minutes:02}")
		} else {
			write!(f, "{hours:02}:{minutes:02}:{seconds:02}")
		}
	}
}

/// The daily window during which the command is allowed to run.
///
/// The order of the boundaries carries the shape of the window:
///
/// - `start < stop` is a same-day window, like 09:00–17:00;
/// - `start > stop` spans midnight, like 22:00–06:00;
/// - `start == stop` places no restriction at all: the command always runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Window {
	/// When the command starts being allowed to run.
	pub start: TimeOfDay,

	/// When the command stops being allowed to run.
	pub stop: TimeOfDay,
}

impl Window {
	/// A window from `start` to `stop`.
	#[must_use]
	pub const fn new(start: TimeOfDay, stop: TimeOfDay) -> Self {
		Self { start, stop }
	}

	/// The window which places no restriction.
	#[must_use]
	pub const fn unrestricted() -> Self {
		Self {
			start: TimeOfDay::MIDNIGHT,
			stop: TimeOfDay::MIDNIGHT,
		}
	}

	/// Whether the command may always run.
	#[must_use]
	pub fn is_unrestricted(&self) -> bool {
		self.start == self.stop
	}

	/// Whether the window spans midnight.
	#[must_use]
	pub fn spans_midnight(&self) -> bool {
		self.start > self.stop
	}

	/// Whether `now` is inside the window.
	#[must_use]
	pub fn contains(&self, now: TimeOfDay) -> bool {
		use std::cmp::Ordering::*;
		match self.start.cmp(&self.stop) {
			Equal => true,
			Less => self.start <= now && now < self.stop,
			Greater => now >= self.start || now < self.stop,
		}
	}

	/// Time from `now` until the next boundary crossing, either way.
	///
	/// This is the nearest next occurrence of either boundary, which covers same-day and
	/// midnight-spanning windows alike. The result is always within `(0, 86400]` seconds.
	///
	/// Returns `None` for an unrestricted window, which has no transitions.
	#[must_use]
	pub fn until_next_transition(&self, now: TimeOfDay) -> Option<Duration> {
		if self.is_unrestricted() {
			return None;
		}

		let seconds = now
			.seconds_until(self.start)
			.min(now.seconds_until(self.stop));
		Some(Duration::from_secs(seconds.into()))
	}

	/// Time from `instant` until the next boundary crossing, to sub-second precision.
	///
	/// Boundaries fall on whole seconds, so the fraction of the current second which has already
	/// elapsed is taken off. A timer armed with this duration therefore doesn't fire before the
	/// boundary second has begun.
	#[must_use]
	pub fn until_next_transition_from(&self, instant: DateTime<Utc>) -> Option<Duration> {
		let whole = self.until_next_transition(TimeOfDay::of(instant))?;
		let elapsed = Duration::from_nanos(instant.nanosecond().min(999_999_999).into());
		Some(whole.saturating_sub(elapsed))
	}
}

impl fmt::Display for Window {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.is_unrestricted() {
			f.write_str("unrestricted")
		} else {
			write!(f, "{}–{} UTC", self.start, self.stop)
		}
	}
}
