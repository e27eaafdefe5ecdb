// src/lib.rs
//! Plan de charge (capacity planning) and titres-restaurant computations over
//! payroll absences, time declarations and forecasts.

pub mod aggregation;
pub mod calendar;
pub mod config;
pub mod day_status;
pub mod error;
pub mod export;
pub mod feeds;
pub mod meal_voucher;
pub mod plan_charge;
pub mod records;
pub mod server;


pub use aggregation::{GlobalMetrics, StaffingThresholds, UtilizationBand, UtilizationSummary};
pub use calendar::{build_month, CalendarDay, FrenchHolidayCalendar, HolidaySource, YearMonth};
pub use day_status::{resolve_day, DayStatus};
pub use error::AppError;
pub use plan_charge::{compute_monthly_view, MonthlyView, PlanningSettings};
