//! # Business-Day Calendar
//!
//! The single place where procedural date arithmetic happens. Due dates are
//! counted in business days (días hábiles); "days remaining" figures shown
//! to users are counted in calendar days.
//!
//! ## Counting rule
//!
//! A plazo notified on a non-business day takes effect on the next business
//! day ([`BusinessDayCalculator::roll_forward`]). Counting starts the day
//! after that effective date, so for `n >= 0`:
//!
//! ```text
//! start  = roll_forward(base)
//! result = add_business_days(base, n)
//! business_days_between(start, result) == n      // counts start < d <= result
//! ```
//!
//! Holidays are not built in. A [`HolidayCalendar`] is injected at
//! construction so a court's feriados can be added without touching callers.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Weekday};
use thiserror::Error;

/// Upper bound on consecutive closed days before the calendar gives up.
/// A real court calendar never closes for a full year.
const MAX_CONSECUTIVE_CLOSED_DAYS: u32 = 366;

/// Errors from calendar arithmetic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// The computation ran past the representable date range.
    #[error("date arithmetic out of range starting from {0}")]
    OutOfRange(NaiveDate),

    /// The holiday calendar closed every day for a full year.
    #[error("no business day within {MAX_CONSECUTIVE_CLOSED_DAYS} days after {0}")]
    NoBusinessDay(NaiveDate),
}

/// A source of non-working days in addition to weekends.
pub trait HolidayCalendar: Send + Sync {
    /// Whether `date` is a court holiday.
    fn is_holiday(&self, date: NaiveDate) -> bool;
}

impl<F> HolidayCalendar for F
where
    F: Fn(NaiveDate) -> bool + Send + Sync,
{
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self(date)
    }
}

/// Weekends only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHolidays;

impl HolidayCalendar for NoHolidays {
    fn is_holiday(&self, _date: NaiveDate) -> bool {
        false
    }
}

/// A fixed set of holiday dates, typically loaded from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedHolidays(BTreeSet<NaiveDate>);

impl FixedHolidays {
    /// Build from any collection of dates.
    pub fn new(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self(dates.into_iter().collect())
    }

    /// Number of configured holidays.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no holidays are configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl HolidayCalendar for FixedHolidays {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.0.contains(&date)
    }
}

/// Converts a base date plus N business days into a concrete due date.
///
/// Cheap to clone; the holiday calendar is shared behind an `Arc`.
#[derive(Clone)]
pub struct BusinessDayCalculator {
    holidays: Arc<dyn HolidayCalendar>,
}

impl std::fmt::Debug for BusinessDayCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusinessDayCalculator").finish_non_exhaustive()
    }
}

impl Default for BusinessDayCalculator {
    fn default() -> Self {
        Self::new(NoHolidays)
    }
}

impl BusinessDayCalculator {
    /// Create a calculator with the given holiday calendar.
    pub fn new(holidays: impl HolidayCalendar + 'static) -> Self {
        Self {
            holidays: Arc::new(holidays),
        }
    }

    /// Saturday and Sunday are never business days.
    pub fn is_weekend(date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Whether `date` is a working day for the court.
    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        !Self::is_weekend(date) && !self.holidays.is_holiday(date)
    }

    /// The first business day on or after `date`.
    pub fn roll_forward(&self, date: NaiveDate) -> Result<NaiveDate, CalendarError> {
        let mut current = date;
        let mut closed = 0;
        while !self.is_business_day(current) {
            closed += 1;
            if closed > MAX_CONSECUTIVE_CLOSED_DAYS {
                return Err(CalendarError::NoBusinessDay(date));
            }
            current = current.succ_opt().ok_or(CalendarError::OutOfRange(date))?;
        }
        Ok(current)
    }

    /// The next business day strictly after `date`.
    fn next_business_day(&self, date: NaiveDate) -> Result<NaiveDate, CalendarError> {
        let next = date.succ_opt().ok_or(CalendarError::OutOfRange(date))?;
        self.roll_forward(next)
    }

    /// Add `n` business days to `base`, skipping weekends and holidays.
    ///
    /// Never returns a non-business day. See the module docs for the
    /// counting rule.
    pub fn add_business_days(&self, base: NaiveDate, n: u32) -> Result<NaiveDate, CalendarError> {
        let mut current = self.roll_forward(base)?;
        for _ in 0..n {
            current = self.next_business_day(current)?;
        }
        Ok(current)
    }

    /// Count business days `d` with `from < d <= to`. Zero when `to <= from`.
    pub fn business_days_between(&self, from: NaiveDate, to: NaiveDate) -> u32 {
        from.iter_days()
            .skip(1)
            .take_while(|d| *d <= to)
            .filter(|d| self.is_business_day(*d))
            .count() as u32
    }

    /// Signed calendar days from `max(base, today)` until `due`.
    ///
    /// Negative once the due date has passed. Before the plazo starts
    /// (`today < base`) the full span from `base` is reported.
    pub fn days_remaining(base: NaiveDate, due: NaiveDate, today: NaiveDate) -> i64 {
        let from = base.max(today);
        (due - from).num_days()
    }

    /// Signed business days until `due`, for display next to the calendar count.
    pub fn business_days_remaining(&self, due: NaiveDate, today: NaiveDate) -> i64 {
        if today <= due {
            i64::from(self.business_days_between(today, due))
        } else {
            -i64::from(self.business_days_between(due, today))
        }
    }
}
