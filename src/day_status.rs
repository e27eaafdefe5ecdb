// src/day_status.rs
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calendar::CalendarDay;
use crate::records::{AbsenceRecord, DeclarationRecord, ForecastRecord};

/// Classification of one (collaborator, day) pair.
///
/// Precedence is strict: `NonWorkable` > `Absent` > `Declared` > `Forecast` > `Unplanned`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DayStatus {
    NonWorkable,
    /// `absence_type` is the first covering record in input order (display only).
    Absent { absence_type: String },
    Declared { hours: Decimal },
    Forecast { hours: Decimal },
    Unplanned,
}

impl DayStatus {
    pub fn is_absent(&self) -> bool {
        matches!(self, DayStatus::Absent { .. })
    }

    pub fn is_declared(&self) -> bool {
        matches!(self, DayStatus::Declared { .. })
    }

    pub fn is_forecast(&self) -> bool {
        matches!(self, DayStatus::Forecast { .. })
    }

    /// Declared, forecast or absent. This is the per-day footer notion of "planned",
    /// which differs from the utilization numerator.
    pub fn counts_as_planned(&self) -> bool {
        self.is_absent() || self.is_declared() || self.is_forecast()
    }

    /// Value shown in the planning grid cell.
    pub fn display_hours(&self, standard_day_hours: Decimal) -> Option<Decimal> {
        match self {
            DayStatus::NonWorkable => None,
            DayStatus::Absent { .. } => Some(standard_day_hours),
            DayStatus::Declared { hours } | DayStatus::Forecast { hours } => Some(*hours),
            DayStatus::Unplanned => Some(dec!(0)),
        }
    }
}

pub fn absence_type_for_date(date: NaiveDate, absences: &[AbsenceRecord]) -> Option<&str> {
    absences
        .iter()
        .find(|absence| absence.covers(date))
        .map(|absence| absence.absence_type.as_str())
}

pub fn is_date_in_absence(date: NaiveDate, absences: &[AbsenceRecord]) -> bool {
    absences.iter().any(|absence| absence.covers(date))
}

/// Sum of declared hours. Intermediate sums are never rounded.
pub fn total_declared_hours(declarations: &[DeclarationRecord]) -> Decimal {
    declarations.iter().map(|d| d.hours).sum()
}

pub fn total_forecast_hours(forecasts: &[ForecastRecord]) -> Decimal {
    forecasts.iter().map(|f| f.hours).sum()
}

pub fn resolve_day(
    day: &CalendarDay,
    absences: &[AbsenceRecord],
    declarations_for_day: &[DeclarationRecord],
    forecasts_for_day: &[ForecastRecord],
) -> DayStatus {
    if !day.is_workable() {
        return DayStatus::NonWorkable;
    }

    if let Some(absence_type) = absence_type_for_date(day.date, absences) {
        debug!("{}: absent ({})", day.date, absence_type);
        return DayStatus::Absent {
            absence_type: absence_type.to_string(),
        };
    }

    let declared = total_declared_hours(declarations_for_day);
    if declared > Decimal::ZERO {
        return DayStatus::Declared { hours: declared };
    }

    let forecast = total_forecast_hours(forecasts_for_day);
    if forecast > Decimal::ZERO {
        return DayStatus::Forecast { hours: forecast };
    }

    DayStatus::Unplanned
}

#[cfg(test)]
mod day_status_tests {
    use super::*;
    use crate::calendar::{build_month, FrenchHolidayCalendar};

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    fn january_2025() -> Vec<CalendarDay> {
        build_month(2025, 0, &FrenchHolidayCalendar::new())
    }

    fn day(days: &[CalendarDay], date: &str) -> CalendarDay {
        let date = d(date);
        days.iter()
            .find(|day| day.date == date)
            .cloned()
            .unwrap_or_else(|| panic!("{} not in calendar", date))
    }

    fn absence(start: &str, end: &str, type_: &str) -> AbsenceRecord {
        AbsenceRecord {
            start_date: d(start),
            end_date: d(end),
            absence_type: type_.to_string(),
            status: "approved".to_string(),
        }
    }

    fn declaration(date: &str, project: &str, hours: Decimal) -> DeclarationRecord {
        DeclarationRecord {
            date: d(date),
            project_id: project.to_string(),
            project_name: format!("Projet {}", project),
            hours,
        }
    }

    fn forecast(date: &str, project: &str, hours: Decimal) -> ForecastRecord {
        ForecastRecord {
            date: d(date),
            project_id: project.to_string(),
            project_name: Some(format!("Projet {}", project)),
            task_id: None,
            task_name: None,
            hours,
        }
    }

    #[test]
    fn weekend_and_holiday_are_non_workable_whatever_the_data() {
        let days = january_2025();
        let absences = vec![absence("2025-01-01", "2025-01-31", "fr_rtt")];
        let decls = vec![declaration("2025-01-04", "P1", dec!(7))];
        for date in ["2025-01-01", "2025-01-04", "2025-01-05"] {
            assert_eq!(
                resolve_day(&day(&days, date), &absences, &decls, &[]),
                DayStatus::NonWorkable
            );
        }
    }

    #[test]
    fn absence_dominates_declarations_and_forecasts() {
        let days = january_2025();
        let target = day(&days, "2025-01-08");
        let status = resolve_day(
            &target,
            &[absence("2025-01-06", "2025-01-10", "fr_conges_payes")],
            &[declaration("2025-01-08", "P1", dec!(7))],
            &[forecast("2025-01-08", "P2", dec!(7))],
        );
        assert_eq!(
            status,
            DayStatus::Absent {
                absence_type: "fr_conges_payes".to_string()
            }
        );
    }

    #[test]
    fn absence_bounds_are_inclusive() {
        let days = january_2025();
        let absences = [absence("2025-01-06", "2025-01-10", "fr_rtt")];
        assert!(resolve_day(&day(&days, "2025-01-06"), &absences, &[], &[]).is_absent());
        assert!(resolve_day(&day(&days, "2025-01-10"), &absences, &[], &[]).is_absent());
        assert_eq!(
            resolve_day(&day(&days, "2025-01-13"), &absences, &[], &[]),
            DayStatus::Unplanned
        );
    }

    #[test]
    fn overlapping_absences_report_first_type_in_input_order() {
        let days = january_2025();
        let absences = [
            absence("2025-01-07", "2025-01-09", "fr_maladie_ordinaire"),
            absence("2025-01-06", "2025-01-10", "fr_conges_payes"),
        ];
        let status = resolve_day(&day(&days, "2025-01-08"), &absences, &[], &[]);
        assert_eq!(
            status,
            DayStatus::Absent {
                absence_type: "fr_maladie_ordinaire".to_string()
            }
        );
        assert_eq!(
            absence_type_for_date(d("2025-01-06"), &absences),
            Some("fr_conges_payes")
        );
    }

    #[test]
    fn inverted_absence_is_ignored() {
        let days = january_2025();
        let absences = [absence("2025-01-10", "2025-01-06", "fr_rtt")];
        assert_eq!(
            resolve_day(&day(&days, "2025-01-08"), &absences, &[], &[]),
            DayStatus::Unplanned
        );
    }

    #[test]
    fn declared_dominates_forecast() {
        let days = january_2025();
        let status = resolve_day(
            &day(&days, "2025-01-13"),
            &[],
            &[declaration("2025-01-13", "P1", dec!(2))],
            &[forecast("2025-01-13", "P2", dec!(7))],
        );
        assert_eq!(status, DayStatus::Declared { hours: dec!(2) });
    }

    #[test]
    fn declarations_on_same_day_are_summed() {
        let days = january_2025();
        let status = resolve_day(
            &day(&days, "2025-01-13"),
            &[],
            &[
                declaration("2025-01-13", "P1", dec!(3)),
                declaration("2025-01-13", "P2", dec!(4)),
            ],
            &[],
        );
        assert_eq!(status, DayStatus::Declared { hours: dec!(7) });
    }

    #[test]
    fn fractional_forecasts_keep_precision() {
        let days = january_2025();
        let status = resolve_day(
            &day(&days, "2025-01-14"),
            &[],
            &[],
            &[
                forecast("2025-01-14", "P1", dec!(1.75)),
                forecast("2025-01-14", "P2", dec!(1.75)),
            ],
        );
        assert_eq!(status, DayStatus::Forecast { hours: dec!(3.50) });
    }

    #[test]
    fn zero_hour_entries_leave_the_day_unplanned() {
        let days = january_2025();
        let status = resolve_day(
            &day(&days, "2025-01-14"),
            &[],
            &[declaration("2025-01-14", "P1", dec!(0))],
            &[forecast("2025-01-14", "P1", dec!(0))],
        );
        assert_eq!(status, DayStatus::Unplanned);
    }

    #[test]
    fn non_workable_iff_day_not_workable() {
        let days = january_2025();
        for calendar_day in &days {
            let status = resolve_day(calendar_day, &[], &[], &[]);
            assert_eq!(
                status == DayStatus::NonWorkable,
                !calendar_day.is_workable(),
                "{}",
                calendar_day.date
            );
        }
    }

    #[test]
    fn display_hours_per_status() {
        let standard = dec!(7);
        assert_eq!(DayStatus::NonWorkable.display_hours(standard), None);
        assert_eq!(
            DayStatus::Absent {
                absence_type: "fr_rtt".to_string()
            }
            .display_hours(standard),
            Some(dec!(7))
        );
        assert_eq!(
            DayStatus::Declared { hours: dec!(3.5) }.display_hours(standard),
            Some(dec!(3.5))
        );
        assert_eq!(DayStatus::Unplanned.display_hours(standard), Some(dec!(0)));
    }
}
