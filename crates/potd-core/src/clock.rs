//! Time sources and calendar-day windows.
//!
//! The rotation engine never reads the wall clock itself; it asks a [`Clock`]
//! and turns the answer into a [`DayWindow`] via the configured
//! [`DayBoundary`].

use std::{fmt, sync::Mutex};

use chrono::{
  DateTime, FixedOffset, Local, NaiveDate, NaiveTime, Offset as _, TimeDelta,
  TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::{Error, Result};

// ─── Clock ───────────────────────────────────────────────────────────────────

/// A source of "now".
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A manually driven clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
  now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
  pub fn new(now: DateTime<Utc>) -> Self { Self { now: Mutex::new(now) } }

  pub fn set(&self, now: DateTime<Utc>) { *self.lock() = now; }

  pub fn advance(&self, by: TimeDelta) {
    let mut now = self.lock();
    *now += by;
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
    // A poisoned guard still holds a valid timestamp.
    self.now.lock().unwrap_or_else(|e| e.into_inner())
  }
}

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> { *self.lock() }
}

// ─── Day windows ─────────────────────────────────────────────────────────────

/// A half-open interval `[start, end)` covering one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
  pub start: DateTime<Utc>,
  pub end:   DateTime<Utc>,
}

impl DayWindow {
  pub fn contains(&self, at: DateTime<Utc>) -> bool {
    self.start <= at && at < self.end
  }
}

/// Where one calendar day ends and the next begins.
///
/// Days follow the civil calendar of a time zone: a fixed UTC offset, an IANA
/// zone such as `America/New_York`, or the server's local zone. Named and
/// local zones observe daylight saving, so a day may last 23 or 25 hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBoundary {
  zone: Zone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
  Fixed(FixedOffset),
  Named(Tz),
  Local,
}

impl Default for DayBoundary {
  fn default() -> Self { Self::utc() }
}

impl DayBoundary {
  pub fn fixed(offset: FixedOffset) -> Self { Self { zone: Zone::Fixed(offset) } }

  pub fn named(tz: Tz) -> Self { Self { zone: Zone::Named(tz) } }

  /// The server's local zone, as reported by the operating system.
  pub fn local() -> Self { Self { zone: Zone::Local } }

  pub fn utc() -> Self { Self::fixed(Utc.fix()) }

  /// Parse `local`, an offset such as `+02:00` or `-0530`, or an IANA zone
  /// name such as `Europe/Madrid`.
  pub fn parse(zone: &str) -> Result<Self> {
    let trimmed = zone.trim();
    if trimmed.eq_ignore_ascii_case("local") {
      return Ok(Self::local());
    }
    if let Ok(offset) = trimmed.parse::<FixedOffset>() {
      return Ok(Self::fixed(offset));
    }
    trimmed
      .parse::<Tz>()
      .map(Self::named)
      .map_err(|_| Error::InvalidTimeZone(zone.to_owned()))
  }

  /// The calendar date containing `now`.
  pub fn date(&self, now: DateTime<Utc>) -> NaiveDate {
    match self.zone {
      Zone::Fixed(offset) => now.with_timezone(&offset).date_naive(),
      Zone::Named(tz) => now.with_timezone(&tz).date_naive(),
      Zone::Local => now.with_timezone(&Local).date_naive(),
    }
  }

  /// The day containing `now`, expressed in UTC instants.
  pub fn window(&self, now: DateTime<Utc>) -> DayWindow {
    let date = self.date(now);
    let next = date.succ_opt().unwrap_or(NaiveDate::MAX);
    DayWindow { start: self.start_of(date), end: self.start_of(next) }
  }

  fn start_of(&self, date: NaiveDate) -> DateTime<Utc> {
    match self.zone {
      Zone::Fixed(offset) => start_of_day(&offset, date),
      Zone::Named(tz) => start_of_day(&tz, date),
      Zone::Local => start_of_day(&Local, date),
    }
  }
}

impl fmt::Display for DayBoundary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.zone {
      Zone::Fixed(offset) => write!(f, "{offset}"),
      Zone::Named(tz) => f.write_str(tz.name()),
      Zone::Local => f.write_str("local"),
    }
  }
}

/// The first instant of `date` in `zone`.
///
/// Where midnight falls in a daylight-saving gap the day starts at the first
/// local time that exists. Ambiguous midnights take the earlier instant.
fn start_of_day<Z: TimeZone>(zone: &Z, date: NaiveDate) -> DateTime<Utc> {
  let midnight = date.and_time(NaiveTime::MIN);
  let step = TimeDelta::minutes(15);
  let mut local = midnight;
  while local - midnight < TimeDelta::days(1) {
    if let Some(start) = zone.from_local_datetime(&local).earliest() {
      return start.with_timezone(&Utc);
    }
    local += step;
  }
  Utc.from_utc_datetime(&midnight)
}
