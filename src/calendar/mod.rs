//! Resolve human date expressions ("eom", "tuesday", "3 days", "2h30m")
//! against a fixed present.

mod durations;
mod synonyms;

pub use durations::{parse_duration, parse_go_duration};
pub use synonyms::Synonym;

use crate::error::{PoetError, PoetResult};
use chrono::{
    DateTime, Datelike, Local, Month, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone,
    Utc, Weekday,
};

/// Date resolver bound to a "present" instant in some time zone.
///
/// Day boundaries are computed in the present's zone and returned in UTC.
#[derive(Debug, Clone)]
pub struct Calendar<Tz: TimeZone = Local> {
    present: DateTime<Tz>,
}

impl Calendar<Local> {
    /// Calendar anchored at the current local time.
    pub fn new() -> Self {
        Self {
            present: Local::now(),
        }
    }
}

impl Default for Calendar<Local> {
    fn default() -> Self {
        Self::new()
    }
}

/// Latest instant a task date can hold; what `later` resolves to.
pub fn far_future() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|d| d.and_hms_nano_opt(23, 59, 59, 999_999_999))
        .map_or(DateTime::<Utc>::MAX_UTC, |dt| dt.and_utc())
}

fn end_of_day_time() -> NaiveTime {
    NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN)
}

impl<Tz: TimeZone> Calendar<Tz> {
    pub fn with_present(present: DateTime<Tz>) -> Self {
        Self { present }
    }

    pub fn present(&self) -> &DateTime<Tz> {
        &self.present
    }

    /// Resolve a named synonym such as `"eom"` or `"friday"`.
    pub fn synonym(&self, expr: &str) -> PoetResult<DateTime<Utc>> {
        let syn: Synonym = expr
            .parse()
            .map_err(|_| PoetError::invalid_expression(expr))?;
        self.resolve(syn)
    }

    /// Synonym first, then present + duration.
    pub fn date(&self, expr: &str) -> PoetResult<DateTime<Utc>> {
        if let Ok(syn) = expr.parse::<Synonym>() {
            return self.resolve(syn);
        }
        let offset = parse_duration(expr)?;
        self.present
            .clone()
            .checked_add_signed(offset)
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| PoetError::invalid_expression(expr))
    }

    pub fn resolve(&self, syn: Synonym) -> PoetResult<DateTime<Utc>> {
        let today = self.present.date_naive();
        let wd_sun = i64::from(today.weekday().num_days_from_sunday());
        let wd_mon = i64::from(today.weekday().num_days_from_monday());

        let resolved = match syn {
            Synonym::Now => self.present.with_timezone(&Utc),
            Synonym::Today | Synonym::StartOfDay => self.floor(today),
            Synonym::EndOfDay => self.ceil(today),
            Synonym::Yesterday => self.floor(shift(today, -1)?),
            Synonym::Tomorrow => self.floor(shift(today, 1)?),
            Synonym::StartOfYear => self.floor(ymd(today.year() + 1, 1, 1)?),
            Synonym::EndOfYear => self.ceil(ymd(today.year(), 12, 31)?),
            Synonym::Som => self.floor(first_of_next_month(today)?),
            Synonym::Socm => self.floor(ymd(today.year(), today.month(), 1)?),
            Synonym::Eom | Synonym::Eocm => self.ceil(shift(first_of_next_month(today)?, -1)?),
            Synonym::Sow => self.floor(shift(today, 7 - wd_sun)?),
            Synonym::Socw => self.floor(shift(today, -wd_sun)?),
            Synonym::Eow | Synonym::Eocw => self.ceil(shift(today, 6 - wd_sun)?),
            Synonym::Soww => self.floor(shift(today, (7 - wd_mon) % 7)?),
            Synonym::Eoww => self.ceil(shift(today, (7 + 4 - wd_mon) % 7)?),
            Synonym::Later => far_future(),
            Synonym::Weekday(target) => self.floor(next_weekday(today, target)?),
            Synonym::Month(target) => self.floor(next_month(today, target)?),
            Synonym::Nth(day) => self.floor(next_nth(today, day)?),
        };
        Ok(resolved)
    }

    fn floor(&self, date: NaiveDate) -> DateTime<Utc> {
        self.localize(date.and_time(NaiveTime::MIN))
    }

    fn ceil(&self, date: NaiveDate) -> DateTime<Utc> {
        self.localize(date.and_time(end_of_day_time()))
    }

    /// Interpret a wall-clock time in the present's zone. Times inside a DST
    /// gap are read as UTC.
    fn localize(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        self.present
            .timezone()
            .from_local_datetime(&naive)
            .earliest()
            .map_or_else(|| naive.and_utc(), |dt| dt.with_timezone(&Utc))
    }
}

fn ymd(year: i32, month: u32, day: u32) -> PoetResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| PoetError::invalid_expression(format!("{year:04}-{month:02}-{day:02}")))
}

fn shift(date: NaiveDate, days: i64) -> PoetResult<NaiveDate> {
    date.checked_add_signed(TimeDelta::days(days))
        .ok_or_else(|| PoetError::invalid_expression(format!("{date} {days:+} days")))
}

fn first_of_next_month(date: NaiveDate) -> PoetResult<NaiveDate> {
    if date.month() == 12 {
        ymd(date.year() + 1, 1, 1)
    } else {
        ymd(date.year(), date.month() + 1, 1)
    }
}

/// Same weekday jumps a full week.
fn next_weekday(today: NaiveDate, target: Weekday) -> PoetResult<NaiveDate> {
    let current = i64::from(today.weekday().num_days_from_monday());
    let wanted = i64::from(target.num_days_from_monday());
    let diff = match (7 + wanted - current) % 7 {
        0 => 7,
        d => d,
    };
    shift(today, diff)
}

/// The 1st of `target`, this year if still ahead, otherwise next year.
fn next_month(today: NaiveDate, target: Month) -> PoetResult<NaiveDate> {
    let month = target.number_from_month();
    let year = if month <= today.month() {
        today.year() + 1
    } else {
        today.year()
    };
    ymd(year, month, 1)
}

/// Next date strictly after `today` falling on day-of-month `day`.
fn next_nth(today: NaiveDate, day: u32) -> PoetResult<NaiveDate> {
    let (mut year, mut month) = (today.year(), today.month());
    // Any day 1..=31 occurs within the next two months.
    for _ in 0..3 {
        if let Some(candidate) = NaiveDate::from_ymd_opt(year, month, day) {
            if candidate > today {
                return Ok(candidate);
            }
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    Err(PoetError::invalid_expression(Synonym::Nth(day).name()))
}
