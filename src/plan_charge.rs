// src/plan_charge.rs
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::aggregation::{
    aggregate_global, summarize, CollaboratorMonth, GlobalMetrics, StaffingThresholds,
    UtilizationSummary,
};
use crate::calendar::{build_period, CalendarDay, HolidaySource, YearMonth};
use crate::day_status::{resolve_day, DayStatus};
use crate::records::{
    AbsenceRecord, Collaborator, CollaboratorId, DeclarationRecord, ForecastRecord,
};

pub const DEFAULT_MAX_PROJECT_LINES: usize = 3;
const ABSENCE_LINE_LABEL: &str = "Absences";

// --- Settings ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningSettings {
    pub thresholds: StaffingThresholds,
    /// Hours shown for a day of absence in the grid.
    pub standard_day_hours: Decimal,
    /// Maximum project lines (declarations and forecasts together) in a detail row.
    pub max_project_lines: usize,
}

impl Default for PlanningSettings {
    fn default() -> Self {
        Self {
            thresholds: StaffingThresholds::default(),
            standard_day_hours: dec!(7),
            max_project_lines: DEFAULT_MAX_PROJECT_LINES,
        }
    }
}

// --- Inputs ---

/// Everything known about one collaborator for the month, indexed by date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollaboratorInputs {
    pub absences: Vec<AbsenceRecord>,
    pub declarations: BTreeMap<NaiveDate, Vec<DeclarationRecord>>,
    pub forecasts: BTreeMap<NaiveDate, Vec<ForecastRecord>>,
}

impl CollaboratorInputs {
    pub fn new(
        absences: Vec<AbsenceRecord>,
        declarations: Vec<DeclarationRecord>,
        forecasts: Vec<ForecastRecord>,
    ) -> Self {
        let mut inputs = Self {
            absences,
            ..Self::default()
        };
        for declaration in declarations {
            inputs
                .declarations
                .entry(declaration.date)
                .or_default()
                .push(declaration);
        }
        for forecast in forecasts {
            inputs
                .forecasts
                .entry(forecast.date)
                .or_default()
                .push(forecast);
        }
        inputs
    }

    pub fn declarations_on(&self, date: NaiveDate) -> &[DeclarationRecord] {
        self.declarations.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn forecasts_on(&self, date: NaiveDate) -> &[ForecastRecord] {
        self.forecasts.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub type MonthInputs = HashMap<CollaboratorId, CollaboratorInputs>;

// --- Output ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailKind {
    Absence,
    Declaration,
    Forecast,
}

/// One line of the expandable detail row under a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailLine {
    pub kind: DetailKind,
    pub label: String,
    pub hours_by_day: BTreeMap<NaiveDate, Decimal>,
    pub total_hours: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaboratorView {
    pub collaborator: Collaborator,
    pub statuses: BTreeMap<NaiveDate, DayStatus>,
    /// Grid cell values. Non-workable days are absent from the map.
    pub hours_by_day: BTreeMap<NaiveDate, Decimal>,
    pub summary: UtilizationSummary,
    pub detail_lines: Vec<DetailLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyView {
    pub period: YearMonth,
    pub calendar_days: Vec<CalendarDay>,
    pub collaborators: Vec<CollaboratorView>,
    pub global_metrics: GlobalMetrics,
}

// --- Pipeline ---

/// Builds the plan de charge of `period` for every collaborator of `roster`, in
/// roster order. A collaborator missing from `inputs` has no records at all.
pub fn compute_monthly_view(
    period: YearMonth,
    roster: &[Collaborator],
    inputs: &MonthInputs,
    holidays: &dyn HolidaySource,
    settings: &PlanningSettings,
) -> MonthlyView {
    info!(
        "Computing plan de charge for {} ({} collaborators)",
        period,
        roster.len()
    );
    let calendar_days = build_period(period, holidays);
    let empty = CollaboratorInputs::default();

    let collaborators: Vec<CollaboratorView> = roster
        .iter()
        .map(|collaborator| {
            let collaborator_inputs = inputs.get(&collaborator.id).unwrap_or(&empty);
            build_collaborator_view(collaborator, collaborator_inputs, &calendar_days, settings)
        })
        .collect();

    let months: Vec<CollaboratorMonth<'_>> = collaborators
        .iter()
        .map(|view| CollaboratorMonth {
            statuses: &view.statuses,
            summary: &view.summary,
        })
        .collect();
    let global_metrics = aggregate_global(&calendar_days, &months);

    MonthlyView {
        period,
        calendar_days,
        collaborators,
        global_metrics,
    }
}

fn build_collaborator_view(
    collaborator: &Collaborator,
    inputs: &CollaboratorInputs,
    calendar_days: &[CalendarDay],
    settings: &PlanningSettings,
) -> CollaboratorView {
    let statuses: BTreeMap<NaiveDate, DayStatus> = calendar_days
        .iter()
        .map(|day| {
            let status = resolve_day(
                day,
                &inputs.absences,
                inputs.declarations_on(day.date),
                inputs.forecasts_on(day.date),
            );
            (day.date, status)
        })
        .collect();

    let hours_by_day = statuses
        .iter()
        .filter_map(|(date, status)| {
            status
                .display_hours(settings.standard_day_hours)
                .map(|hours| (*date, hours))
        })
        .collect();

    let summary = summarize(calendar_days, &statuses, &settings.thresholds);
    debug!(
        "{}: {}% utilization, {} unplanned days",
        collaborator.name, summary.utilization_percent, summary.unplanned_days
    );
    let detail_lines = detail_lines(inputs, calendar_days, &statuses, settings);

    CollaboratorView {
        collaborator: collaborator.clone(),
        statuses,
        hours_by_day,
        summary,
        detail_lines,
    }
}

/// The absence line first, then declarations grouped by project and forecasts
/// grouped by project and task. Project lines, declarations first, are capped
/// together at `max_project_lines`.
fn detail_lines(
    inputs: &CollaboratorInputs,
    calendar_days: &[CalendarDay],
    statuses: &BTreeMap<NaiveDate, DayStatus>,
    settings: &PlanningSettings,
) -> Vec<DetailLine> {
    let mut lines = Vec::new();

    let absence_hours: BTreeMap<NaiveDate, Decimal> = statuses
        .iter()
        .filter(|(_, status)| status.is_absent())
        .map(|(date, _)| (*date, settings.standard_day_hours))
        .collect();
    if !absence_hours.is_empty() {
        lines.push(DetailLine {
            kind: DetailKind::Absence,
            label: ABSENCE_LINE_LABEL.to_string(),
            total_hours: absence_hours.values().sum(),
            hours_by_day: absence_hours,
        });
    }

    let in_month = |date: &NaiveDate| calendar_days.iter().any(|day| day.date == *date);

    let declarations = inputs
        .declarations
        .iter()
        .filter(|(date, _)| in_month(*date))
        .flat_map(|(date, records)| {
            records
                .iter()
                .map(move |r| (r.project_name.clone(), *date, r.hours))
        });
    let forecasts = inputs
        .forecasts
        .iter()
        .filter(|(date, _)| in_month(*date))
        .flat_map(|(date, records)| records.iter().map(move |r| (r.line_label(), *date, r.hours)));

    let mut project_lines = grouped_lines(DetailKind::Declaration, declarations);
    project_lines.extend(grouped_lines(DetailKind::Forecast, forecasts));
    project_lines.truncate(settings.max_project_lines);
    lines.extend(project_lines);

    lines
}

/// One line per label, in order of first appearance.
fn grouped_lines(
    kind: DetailKind,
    entries: impl Iterator<Item = (String, NaiveDate, Decimal)>,
) -> Vec<DetailLine> {
    let mut lines: Vec<DetailLine> = Vec::new();
    for (label, date, hours) in entries {
        let index = match lines.iter().position(|line| line.label == label) {
            Some(index) => index,
            None => {
                lines.push(DetailLine {
                    kind,
                    label,
                    hours_by_day: BTreeMap::new(),
                    total_hours: Decimal::ZERO,
                });
                lines.len() - 1
            }
        };
        let line = &mut lines[index];
        *line.hours_by_day.entry(date).or_default() += hours;
        line.total_hours += hours;
    }
    lines
}
