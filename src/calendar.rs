// src/calendar.rs
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

/// Jurisdiction code understood by [`FrenchHolidayCalendar`].
pub const FRANCE: &str = "FR";

// --- Error Types ---

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HolidayError {
    #[error("No holiday data for jurisdiction '{0}'")]
    UnsupportedJurisdiction(String),
    #[error("No holiday data for year {0}")]
    YearOutOfRange(i32),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeriodError {
    #[error("Invalid month '{0}', expected YYYY-MM")]
    Malformed(String),
    #[error("Month {month} of {year} is out of range")]
    OutOfRange { year: i32, month: u32 },
}

// --- Period ---

/// A calendar month. `month` is 1-based (January = 1), as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawYearMonth")]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

#[derive(Deserialize)]
struct RawYearMonth {
    year: i32,
    month: u32,
}

impl TryFrom<RawYearMonth> for YearMonth {
    type Error = PeriodError;

    fn try_from(raw: RawYearMonth) -> Result<Self, Self::Error> {
        YearMonth::new(raw.year, raw.month)
    }
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, PeriodError> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(PeriodError::OutOfRange { year, month });
        }
        Ok(Self { year, month })
    }

    /// Zero-based month index (January = 0).
    pub fn month_index(&self) -> u32 {
        self.month.saturating_sub(1)
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| PeriodError::Malformed(s.to_string()))?;
        let year: i32 = year
            .parse()
            .map_err(|_| PeriodError::Malformed(s.to_string()))?;
        let month: u32 = month
            .parse()
            .map_err(|_| PeriodError::Malformed(s.to_string()))?;
        YearMonth::new(year, month)
    }
}

// --- Calendar Day ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub day_of_month: u32,
    pub date: NaiveDate,
    pub is_weekend: bool,
    pub is_holiday: bool,
    /// Short French weekday label shown in the planning grid header.
    pub label: String,
}

impl CalendarDay {
    pub fn is_workable(&self) -> bool {
        !self.is_weekend && !self.is_holiday
    }
}

fn weekday_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Lun",
        Weekday::Tue => "Mar",
        Weekday::Wed => "Mer",
        Weekday::Thu => "Jeu",
        Weekday::Fri => "Ven",
        Weekday::Sat => "Sam",
        Weekday::Sun => "Dim",
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

// --- Holiday Sources ---

pub trait HolidaySource: Send + Sync {
    fn holidays_for_year(
        &self,
        jurisdiction: &str,
        year: i32,
    ) -> Result<BTreeSet<NaiveDate>, HolidayError>;

    /// Jurisdiction used when building month calendars.
    fn jurisdiction(&self) -> &str {
        FRANCE
    }
}

/// French statutory public holidays, computed from the Gregorian Easter date.
#[derive(Debug, Clone, Default)]
pub struct FrenchHolidayCalendar;

impl FrenchHolidayCalendar {
    pub fn new() -> Self {
        Self
    }
}

impl HolidaySource for FrenchHolidayCalendar {
    fn holidays_for_year(
        &self,
        jurisdiction: &str,
        year: i32,
    ) -> Result<BTreeSet<NaiveDate>, HolidayError> {
        if !jurisdiction.eq_ignore_ascii_case(FRANCE) {
            return Err(HolidayError::UnsupportedJurisdiction(
                jurisdiction.to_string(),
            ));
        }
        if year < 1583 {
            // Gregorian computus only.
            return Err(HolidayError::YearOutOfRange(year));
        }
        let easter = easter_sunday(year).ok_or(HolidayError::YearOutOfRange(year))?;
        let fixed = |month: u32, day: u32| {
            NaiveDate::from_ymd_opt(year, month, day).ok_or(HolidayError::YearOutOfRange(year))
        };

        let holidays = BTreeSet::from([
            fixed(1, 1)?,                 // Jour de l'an
            easter + Duration::days(1),   // Lundi de Pâques
            fixed(5, 1)?,                 // Fête du travail
            fixed(5, 8)?,                 // Victoire 1945
            easter + Duration::days(39),  // Ascension
            easter + Duration::days(50),  // Lundi de Pentecôte
            fixed(7, 14)?,                // Fête nationale
            fixed(8, 15)?,                // Assomption
            fixed(11, 1)?,                // Toussaint
            fixed(11, 11)?,               // Armistice 1918
            fixed(12, 25)?,               // Noël
        ]);
        debug!("Computed {} French holidays for {}", holidays.len(), year);
        Ok(holidays)
    }
}

/// Anonymous Gregorian algorithm (Meeus/Jones/Butcher).
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// Explicitly configured holiday dates, regardless of jurisdiction.
#[derive(Debug, Clone, Default)]
pub struct FixedHolidaySource {
    dates: BTreeSet<NaiveDate>,
}

impl FixedHolidaySource {
    pub fn new(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            dates: dates.into_iter().collect(),
        }
    }
}

impl HolidaySource for FixedHolidaySource {
    fn holidays_for_year(
        &self,
        _jurisdiction: &str,
        year: i32,
    ) -> Result<BTreeSet<NaiveDate>, HolidayError> {
        Ok(self
            .dates
            .iter()
            .filter(|date| date.year() == year)
            .copied()
            .collect())
    }
}

/// Wraps a source so month calendars are built for a configured jurisdiction.
#[derive(Debug, Clone)]
pub struct ConfiguredHolidays<S> {
    inner: S,
    jurisdiction: String,
}

impl<S: HolidaySource> ConfiguredHolidays<S> {
    pub fn new(inner: S, jurisdiction: impl Into<String>) -> Self {
        Self {
            inner,
            jurisdiction: jurisdiction.into(),
        }
    }
}

impl<S: HolidaySource> HolidaySource for ConfiguredHolidays<S> {
    fn holidays_for_year(
        &self,
        jurisdiction: &str,
        year: i32,
    ) -> Result<BTreeSet<NaiveDate>, HolidayError> {
        self.inner.holidays_for_year(jurisdiction, year)
    }

    fn jurisdiction(&self) -> &str {
        &self.jurisdiction
    }
}

// --- Calendar Builder ---

/// Builds the ordered days of a month. `month_index` is zero-based (January = 0).
///
/// Holiday lookup failures never fail the calendar: the month is then treated
/// as having no holidays.
pub fn build_month(year: i32, month_index: u32, holidays: &dyn HolidaySource) -> Vec<CalendarDay> {
    let first_day = month_index
        .checked_add(1)
        .and_then(|month| NaiveDate::from_ymd_opt(year, month, 1));
    let Some(first_day) = first_day else {
        warn!(
            "Cannot build calendar for year {} month index {}",
            year, month_index
        );
        return Vec::new();
    };

    let jurisdiction = holidays.jurisdiction();
    let month_holidays: BTreeSet<NaiveDate> = match holidays.holidays_for_year(jurisdiction, year)
    {
        Ok(dates) => dates
            .into_iter()
            .filter(|date| date.month() == first_day.month())
            .collect(),
        Err(e) => {
            warn!(
                "Holiday lookup failed for {} {}: {}. Continuing without holidays.",
                jurisdiction, year, e
            );
            BTreeSet::new()
        }
    };

    first_day
        .iter_days()
        .take_while(|date| date.month() == first_day.month())
        .map(|date| CalendarDay {
            day_of_month: date.day(),
            date,
            is_weekend: is_weekend(date),
            is_holiday: month_holidays.contains(&date),
            label: weekday_label(date.weekday()).to_string(),
        })
        .collect()
}

pub fn build_period(period: YearMonth, holidays: &dyn HolidaySource) -> Vec<CalendarDay> {
    build_month(period.year, period.month_index(), holidays)
}

pub fn workable_days(days: &[CalendarDay]) -> impl Iterator<Item = &CalendarDay> {
    days.iter().filter(|day| day.is_workable())
}

#[cfg(test)]
mod calendar_tests {
    use super::*;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    struct FailingSource;

    impl HolidaySource for FailingSource {
        fn holidays_for_year(
            &self,
            jurisdiction: &str,
            _year: i32,
        ) -> Result<BTreeSet<NaiveDate>, HolidayError> {
            Err(HolidayError::UnsupportedJurisdiction(jurisdiction.to_string()))
        }
    }

    #[test]
    fn month_has_one_entry_per_day_in_order() {
        let calendar = FrenchHolidayCalendar::new();
        for year in [2023, 2024, 2025] {
            for month_index in 0..12 {
                let days = build_month(year, month_index, &calendar);
                let expected = YearMonth::new(year, month_index + 1)
                    .unwrap()
                    .last_day()
                    .unwrap()
                    .day() as usize;
                assert_eq!(days.len(), expected, "{}-{}", year, month_index + 1);
                for (i, day) in days.iter().enumerate() {
                    assert_eq!(day.day_of_month as usize, i + 1);
                }
                assert!(days.windows(2).all(|w| w[1].date == w[0].date + Duration::days(1)));
            }
        }
    }

    #[test]
    fn february_leap_year_has_29_days() {
        let days = build_month(2024, 1, &FrenchHolidayCalendar::new());
        assert_eq!(days.len(), 29);
        let days = build_month(2025, 1, &FrenchHolidayCalendar::new());
        assert_eq!(days.len(), 28);
    }

    #[test]
    fn weekend_flag_matches_weekday() {
        let days = build_month(2025, 0, &FrenchHolidayCalendar::new());
        for day in &days {
            let weekend = matches!(day.date.weekday(), Weekday::Sat | Weekday::Sun);
            assert_eq!(day.is_weekend, weekend, "{}", day.date);
        }
        assert_eq!(days.iter().filter(|d| d.is_weekend).count(), 8);
    }

    #[test]
    fn january_2025_first_is_a_wednesday_holiday() {
        let days = build_month(2025, 0, &FrenchHolidayCalendar::new());
        let first = &days[0];
        assert_eq!(first.date, d("2025-01-01"));
        assert_eq!(first.label, "Mer");
        assert!(first.is_holiday);
        assert!(!first.is_weekend);
        assert!(!first.is_workable());
        assert_eq!(workable_days(&days).count(), 22);
    }

    #[test]
    fn easter_dates_are_correct() {
        assert_eq!(easter_sunday(2024), Some(d("2024-03-31")));
        assert_eq!(easter_sunday(2025), Some(d("2025-04-20")));
        assert_eq!(easter_sunday(2026), Some(d("2026-04-05")));
    }

    #[test]
    fn french_holidays_2025() {
        let holidays = FrenchHolidayCalendar::new()
            .holidays_for_year(FRANCE, 2025)
            .unwrap();
        assert_eq!(holidays.len(), 11);
        for date in [
            "2025-01-01",
            "2025-04-21",
            "2025-05-01",
            "2025-05-08",
            "2025-05-29",
            "2025-06-09",
            "2025-07-14",
            "2025-08-15",
            "2025-11-01",
            "2025-11-11",
            "2025-12-25",
        ] {
            assert!(holidays.contains(&d(date)), "missing {}", date);
        }
    }

    #[test]
    fn may_2025_has_three_weekday_holidays() {
        let days = build_month(2025, 4, &FrenchHolidayCalendar::new());
        let weekday_holidays: Vec<_> = days
            .iter()
            .filter(|day| day.is_holiday && !day.is_weekend)
            .map(|day| day.date)
            .collect();
        assert_eq!(
            weekday_holidays,
            vec![d("2025-05-01"), d("2025-05-08"), d("2025-05-29")]
        );
    }

    #[test]
    fn unsupported_jurisdiction_is_an_error() {
        let result = FrenchHolidayCalendar::new().holidays_for_year("SE", 2025);
        assert_eq!(
            result,
            Err(HolidayError::UnsupportedJurisdiction("SE".to_string()))
        );
    }

    #[test]
    fn failed_holiday_lookup_degrades_to_no_holidays() {
        let days = build_month(2025, 0, &FailingSource);
        assert_eq!(days.len(), 31);
        assert!(days.iter().all(|day| !day.is_holiday));
        assert_eq!(workable_days(&days).count(), 23);
    }

    #[test]
    fn holidays_outside_target_month_are_ignored() {
        let source = FixedHolidaySource::new([d("2025-02-03"), d("2025-03-03")]);
        let days = build_month(2025, 1, &source);
        let holidays: Vec<_> = days.iter().filter(|d| d.is_holiday).map(|d| d.date).collect();
        assert_eq!(holidays, vec![d("2025-02-03")]);
    }

    #[test]
    fn configured_jurisdiction_is_used_for_lookups() {
        let french = ConfiguredHolidays::new(FrenchHolidayCalendar::new(), "fr");
        assert_eq!(workable_days(&build_month(2025, 0, &french)).count(), 22);

        let swedish = ConfiguredHolidays::new(FrenchHolidayCalendar::new(), "SE");
        assert_eq!(workable_days(&build_month(2025, 0, &swedish)).count(), 23);
    }

    #[test]
    fn invalid_month_index_yields_empty_calendar() {
        assert!(build_month(2025, 12, &FrenchHolidayCalendar::new()).is_empty());
    }

    #[test]
    fn year_month_parses_and_formats() {
        let period: YearMonth = "2025-01".parse().unwrap();
        assert_eq!(period, YearMonth { year: 2025, month: 1 });
        assert_eq!(period.month_index(), 0);
        assert_eq!(period.to_string(), "2025-01");
        assert_eq!(period.last_day(), Some(d("2025-01-31")));
        assert!(period.contains(d("2025-01-15")));
        assert!(!period.contains(d("2025-02-01")));
        assert!(matches!(
            "2025-13".parse::<YearMonth>(),
            Err(PeriodError::OutOfRange { .. })
        ));
        assert!(matches!(
            "january".parse::<YearMonth>(),
            Err(PeriodError::Malformed(_))
        ));
    }

    #[test]
    fn year_month_deserialization_rejects_out_of_range_months() {
        let period: YearMonth = serde_json::from_str(r#"{"year":2025,"month":12}"#).unwrap();
        assert_eq!(period, YearMonth::new(2025, 12).unwrap());
        assert_eq!(serde_json::to_string(&period).unwrap(), r#"{"year":2025,"month":12}"#);
        assert!(serde_json::from_str::<YearMonth>(r#"{"year":2025,"month":0}"#).is_err());
        assert!(serde_json::from_str::<YearMonth>(r#"{"year":2025,"month":13}"#).is_err());
    }
}
