// src/aggregation.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::calendar::CalendarDay;
use crate::day_status::DayStatus;

// --- Constants ---

pub const DEFAULT_MIN_UTILIZATION_PERCENT: u32 = 50;
pub const DEFAULT_MAX_UNPLANNED_DAYS: u32 = 3;
const GOOD_BAND_FROM_PERCENT: u32 = 80;
const WARNING_BAND_FROM_PERCENT: u32 = 50;

/// `round(100 * numerator / denominator)` with halves rounded up, `0` when the
/// denominator is zero. Exact integer arithmetic.
pub fn percent(numerator: u32, denominator: u32) -> u32 {
    if denominator == 0 {
        return 0;
    }
    let numerator = u64::from(numerator);
    let denominator = u64::from(denominator);
    ((200 * numerator + denominator) / (2 * denominator)) as u32
}

// --- Thresholds & Bands ---

/// Limits below which a collaborator is flagged as insufficiently staffed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffingThresholds {
    pub min_utilization_percent: u32,
    pub max_unplanned_days: u32,
}

impl Default for StaffingThresholds {
    fn default() -> Self {
        Self {
            min_utilization_percent: DEFAULT_MIN_UTILIZATION_PERCENT,
            max_unplanned_days: DEFAULT_MAX_UNPLANNED_DAYS,
        }
    }
}

impl StaffingThresholds {
    pub fn is_insufficient(&self, utilization_percent: u32, unplanned_days: u32) -> bool {
        utilization_percent < self.min_utilization_percent
            || unplanned_days > self.max_unplanned_days
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilizationBand {
    Good,
    Warning,
    Critical,
}

impl UtilizationBand {
    pub fn from_percent(percent: u32) -> Self {
        if percent >= GOOD_BAND_FROM_PERCENT {
            UtilizationBand::Good
        } else if percent >= WARNING_BAND_FROM_PERCENT {
            UtilizationBand::Warning
        } else {
            UtilizationBand::Critical
        }
    }
}

// --- Per Collaborator ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilizationSummary {
    pub working_days: u32,
    pub absence_days: u32,
    pub declared_days: u32,
    pub forecast_days: u32,
    pub unplanned_days: u32,
    pub available_days: u32,
    pub utilization_percent: u32,
    pub band: UtilizationBand,
    pub insufficient_staffing: bool,
}

/// Monthly rollup of one collaborator's day statuses.
///
/// A workable day missing from `statuses_by_day` counts as unplanned. Absence
/// days leave the denominator; only declared and forecast days are in the
/// numerator.
pub fn summarize(
    days: &[CalendarDay],
    statuses_by_day: &BTreeMap<NaiveDate, DayStatus>,
    thresholds: &StaffingThresholds,
) -> UtilizationSummary {
    let mut working_days = 0;
    let mut absence_days = 0;
    let mut declared_days = 0;
    let mut forecast_days = 0;
    let mut unplanned_days = 0;

    for day in days.iter().filter(|day| day.is_workable()) {
        working_days += 1;
        match statuses_by_day.get(&day.date) {
            Some(DayStatus::Absent { .. }) => absence_days += 1,
            Some(DayStatus::Declared { .. }) => declared_days += 1,
            Some(DayStatus::Forecast { .. }) => forecast_days += 1,
            // A workable day never resolves to NonWorkable; a stale status is unplanned.
            Some(DayStatus::Unplanned) | Some(DayStatus::NonWorkable) | None => {
                unplanned_days += 1
            }
        }
    }

    let available_days = working_days - absence_days;
    let utilization_percent = percent(declared_days + forecast_days, available_days);

    UtilizationSummary {
        working_days,
        absence_days,
        declared_days,
        forecast_days,
        unplanned_days,
        available_days,
        utilization_percent,
        band: UtilizationBand::from_percent(utilization_percent),
        insufficient_staffing: thresholds.is_insufficient(utilization_percent, unplanned_days),
    }
}

// --- Organization Wide ---

/// Statuses and rollup of one active collaborator, input of [`aggregate_global`].
#[derive(Debug, Clone, Copy)]
pub struct CollaboratorMonth<'a> {
    pub statuses: &'a BTreeMap<NaiveDate, DayStatus>,
    pub summary: &'a UtilizationSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTotals {
    pub working_days: u32,
    pub absence_days: u32,
    pub declared_days: u32,
    pub forecast_days: u32,
    pub unplanned_days: u32,
    pub available_days: u32,
}

/// Footer cell of one workable day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCoverage {
    /// Collaborators not absent that day.
    pub available: u32,
    /// Collaborators declared, forecast or absent that day.
    pub planned: u32,
    pub coverage_percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalMetrics {
    /// Against total available days (working minus absence).
    pub global_utilization_percent: u32,
    pub global_band: UtilizationBand,
    pub collaborators_with_insufficient_staffing: u32,
    /// The three breakdown percentages are against total working days, so they
    /// sum to less than 100 when absences exist.
    pub declared_percent: u32,
    pub forecast_percent: u32,
    pub unplanned_percent: u32,
    pub totals: DayTotals,
    pub active_collaborators: u32,
    pub daily: BTreeMap<NaiveDate, DailyCoverage>,
}

pub fn aggregate_global(days: &[CalendarDay], collaborators: &[CollaboratorMonth<'_>]) -> GlobalMetrics {
    let mut totals = DayTotals::default();
    let mut with_issues = 0;

    for collaborator in collaborators {
        let summary = collaborator.summary;
        totals.working_days += summary.working_days;
        totals.absence_days += summary.absence_days;
        totals.declared_days += summary.declared_days;
        totals.forecast_days += summary.forecast_days;
        totals.unplanned_days += summary.unplanned_days;
        if summary.insufficient_staffing {
            with_issues += 1;
        }
    }
    totals.available_days = totals.working_days - totals.absence_days;

    let mut daily = BTreeMap::new();
    for day in days.iter().filter(|day| day.is_workable()) {
        let mut coverage = DailyCoverage::default();
        for collaborator in collaborators {
            let status = collaborator.statuses.get(&day.date);
            if !matches!(status, Some(DayStatus::Absent { .. })) {
                coverage.available += 1;
            }
            if status.is_some_and(DayStatus::counts_as_planned) {
                coverage.planned += 1;
            }
        }
        coverage.coverage_percent = percent(coverage.planned, coverage.available);
        daily.insert(day.date, coverage);
    }

    let global_utilization_percent = percent(
        totals.declared_days + totals.forecast_days,
        totals.available_days,
    );
    debug!(
        "Global utilization {}% over {} collaborators ({} available days)",
        global_utilization_percent,
        collaborators.len(),
        totals.available_days
    );

    GlobalMetrics {
        global_utilization_percent,
        global_band: UtilizationBand::from_percent(global_utilization_percent),
        collaborators_with_insufficient_staffing: with_issues,
        declared_percent: percent(totals.declared_days, totals.working_days),
        forecast_percent: percent(totals.forecast_days, totals.working_days),
        unplanned_percent: percent(totals.unplanned_days, totals.working_days),
        totals,
        active_collaborators: collaborators.len() as u32,
        daily,
    }
}
