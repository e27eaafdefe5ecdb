// src/meal_voucher.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::calendar::{build_period, workable_days, CalendarDay, HolidaySource, YearMonth};
use crate::day_status::is_date_in_absence;
use crate::plan_charge::MonthInputs;
use crate::records::{AbsenceRecord, Collaborator, CollaboratorId};

// --- Eligibility Inputs ---

/// Manual decision taken by HR for one collaborator, keyed by e-mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityOverride {
    pub email: String,
    pub is_eligible: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollContract {
    pub email: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    Override { is_eligible: bool },
    ActiveContract,
    NoActiveContract,
    /// Collaborator unknown to payroll. Eligible by default.
    NoPayrollData,
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        match self {
            Eligibility::Override { is_eligible } => *is_eligible,
            Eligibility::ActiveContract | Eligibility::NoPayrollData => true,
            Eligibility::NoActiveContract => false,
        }
    }
}

/// An override wins; otherwise at least one active payroll contract is required
/// when payroll knows the collaborator.
pub fn resolve_eligibility(
    collaborator: &Collaborator,
    overrides: &[EligibilityOverride],
    contracts: &[PayrollContract],
) -> Eligibility {
    if let Some(manual) = overrides
        .iter()
        .find(|o| collaborator.email_matches(&o.email))
    {
        return Eligibility::Override {
            is_eligible: manual.is_eligible,
        };
    }

    let mut contracts = contracts
        .iter()
        .filter(|c| collaborator.email_matches(&c.email))
        .peekable();
    if contracts.peek().is_none() {
        return Eligibility::NoPayrollData;
    }
    if contracts.any(|c| c.is_active) {
        Eligibility::ActiveContract
    } else {
        Eligibility::NoActiveContract
    }
}

// --- Rights ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsenceDetail {
    pub absence_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub working_days_in_month: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealVoucherRights {
    pub collaborator_id: CollaboratorId,
    pub email: String,
    pub name: String,
    pub matricule: Option<String>,
    pub year: i32,
    pub month: u32,
    pub working_days: u32,
    /// Distinct workable days covered by at least one absence.
    pub absence_days: u32,
    pub rights: u32,
    pub absences: Vec<AbsenceDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealVoucherMonth {
    pub year: i32,
    pub month: u32,
    pub working_days: u32,
    /// Holidays falling on a weekday.
    pub holidays: Vec<NaiveDate>,
    pub employees: Vec<MealVoucherRights>,
}

fn covered_workable_days(absence: &AbsenceRecord, days: &[CalendarDay]) -> u32 {
    workable_days(days)
        .filter(|day| absence.covers(day.date))
        .count() as u32
}

pub fn compute_rights(
    period: YearMonth,
    collaborator: &Collaborator,
    days: &[CalendarDay],
    absences: &[AbsenceRecord],
) -> MealVoucherRights {
    let working_days = workable_days(days).count() as u32;
    let absence_days = workable_days(days)
        .filter(|day| is_date_in_absence(day.date, absences))
        .count() as u32;

    let details = absences
        .iter()
        .map(|absence| AbsenceDetail {
            absence_type: absence.absence_type.clone(),
            start_date: absence.start_date,
            end_date: absence.end_date,
            status: absence.status.clone(),
            working_days_in_month: covered_workable_days(absence, days),
        })
        .collect();

    MealVoucherRights {
        collaborator_id: collaborator.id.clone(),
        email: collaborator.email.clone(),
        name: collaborator.name.clone(),
        matricule: collaborator.matricule.clone(),
        year: period.year,
        month: period.month,
        working_days,
        absence_days,
        rights: working_days.saturating_sub(absence_days),
        absences: details,
    }
}

/// Rights of every eligible collaborator holding a matricule, in roster order.
pub fn compute_month_rights(
    period: YearMonth,
    roster: &[Collaborator],
    inputs: &MonthInputs,
    overrides: &[EligibilityOverride],
    contracts: &[PayrollContract],
    holidays: &dyn HolidaySource,
) -> MealVoucherMonth {
    let days = build_period(period, holidays);

    let employees: Vec<MealVoucherRights> = roster
        .iter()
        .filter(|collaborator| collaborator.matricule.is_some())
        .filter(|collaborator| {
            let eligibility = resolve_eligibility(collaborator, overrides, contracts);
            debug!("{}: {:?}", collaborator.email, eligibility);
            eligibility.is_eligible()
        })
        .map(|collaborator| {
            let absences = inputs
                .get(&collaborator.id)
                .map(|i| i.absences.as_slice())
                .unwrap_or(&[]);
            compute_rights(period, collaborator, &days, absences)
        })
        .collect();
    info!(
        "Computed meal-voucher rights for {} eligible collaborators in {}",
        employees.len(),
        period
    );

    MealVoucherMonth {
        year: period.year,
        month: period.month,
        working_days: workable_days(&days).count() as u32,
        holidays: days
            .iter()
            .filter(|day| day.is_holiday && !day.is_weekend)
            .map(|day| day.date)
            .collect(),
        employees,
    }
}

#[cfg(test)]
mod meal_voucher_tests {
    use super::*;
    use crate::calendar::FrenchHolidayCalendar;
    use crate::plan_charge::CollaboratorInputs;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    fn collaborator(id: &str, matricule: Option<&str>) -> Collaborator {
        Collaborator {
            id: id.to_string(),
            name: format!("Collab {}", id),
            email: format!("{}@example.com", id.to_lowercase()),
            matricule: matricule.map(str::to_string),
        }
    }

    fn absence(start: &str, end: &str) -> AbsenceRecord {
        AbsenceRecord {
            start_date: d(start),
            end_date: d(end),
            absence_type: "fr_conges_payes".to_string(),
            status: "approved".to_string(),
        }
    }

    fn contract(email: &str, is_active: bool) -> PayrollContract {
        PayrollContract {
            email: email.to_string(),
            is_active,
        }
    }

    #[test]
    fn override_wins_over_contracts() {
        let overrides = [EligibilityOverride {
            email: "Alice@Example.com".to_string(),
            is_eligible: false,
            reason: Some("Forfait repas".to_string()),
        }];
        let contracts = [contract("alice@example.com", true)];
        let alice = collaborator("Alice", Some("0001"));
        let eligibility = resolve_eligibility(&alice, &overrides, &contracts);
        assert_eq!(eligibility, Eligibility::Override { is_eligible: false });
        assert!(!eligibility.is_eligible());
    }

    #[test]
    fn contracts_decide_without_override() {
        let contracts = [
            contract("alice@example.com", false),
            contract("alice@example.com", true),
            contract("bruno@example.com", false),
        ];
        assert_eq!(
            resolve_eligibility(&collaborator("Alice", None), &[], &contracts),
            Eligibility::ActiveContract
        );
        let bruno = Collaborator {
            email: "BRUNO@example.com".to_string(),
            ..collaborator("Bruno", None)
        };
        assert_eq!(
            resolve_eligibility(&bruno, &[], &contracts),
            Eligibility::NoActiveContract
        );
        let unknown = resolve_eligibility(&collaborator("Chloe", None), &[], &contracts);
        assert_eq!(unknown, Eligibility::NoPayrollData);
        assert!(unknown.is_eligible());
    }

    #[test]
    fn rights_subtract_distinct_absence_days() {
        let period = YearMonth::new(2025, 1).unwrap();
        let days = build_period(period, &FrenchHolidayCalendar::new());
        // Overlapping records: 6-10 Jan and 9-13 Jan cover 6 distinct workable days.
        let absences = [absence("2025-01-06", "2025-01-10"), absence("2025-01-09", "2025-01-13")];
        let rights = compute_rights(period, &collaborator("C1", Some("0001")), &days, &absences);
        assert_eq!(rights.working_days, 22);
        assert_eq!(rights.absence_days, 6);
        assert_eq!(rights.rights, 16);
        let per_record: Vec<_> = rights
            .absences
            .iter()
            .map(|a| a.working_days_in_month)
            .collect();
        assert_eq!(per_record, vec![5, 3]);
    }

    #[test]
    fn absence_spanning_months_counts_only_days_inside_the_month() {
        let period = YearMonth::new(2025, 1).unwrap();
        let days = build_period(period, &FrenchHolidayCalendar::new());
        // 1 Jan is a holiday; 2-3 Jan are workable.
        let absences = [absence("2024-12-23", "2025-01-03")];
        let rights = compute_rights(period, &collaborator("C1", Some("0001")), &days, &absences);
        assert_eq!(rights.absence_days, 2);
        assert_eq!(rights.rights, 20);
    }

    #[test]
    fn month_rights_skip_ineligible_and_unregistered_collaborators() {
        let period = YearMonth::new(2025, 5).unwrap();
        let roster = vec![
            collaborator("C1", Some("0001")),
            collaborator("C2", None),
            collaborator("C3", Some("0003")),
        ];
        let mut inputs = MonthInputs::new();
        inputs.insert(
            "C1".to_string(),
            CollaboratorInputs::new(vec![absence("2025-05-01", "2025-05-31")], Vec::new(), Vec::new()),
        );
        let contracts = [contract("c3@example.com", false)];
        let month = compute_month_rights(
            period,
            &roster,
            &inputs,
            &[],
            &contracts,
            &FrenchHolidayCalendar::new(),
        );

        assert_eq!(month.working_days, 19);
        assert_eq!(month.holidays, vec![d("2025-05-01"), d("2025-05-08"), d("2025-05-29")]);
        assert_eq!(month.employees.len(), 1);
        let c1 = &month.employees[0];
        assert_eq!(c1.matricule.as_deref(), Some("0001"));
        assert_eq!(c1.absence_days, 19);
        assert_eq!(c1.rights, 0);
    }
}
