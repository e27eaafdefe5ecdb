// src/records.rs
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub type CollaboratorId = String;
pub type ProjectId = String;

// --- Error Types ---

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Invalid date '{value}' in field {field}")]
    InvalidDate { field: &'static str, value: String },
    #[error("Hours value {0} cannot be represented as a decimal")]
    InvalidHours(String),
    #[error("Collaborator {id} has no e-mail address")]
    MissingEmail { id: String },
}

/// Accepts `YYYY-MM-DD` and ISO datetimes (`YYYY-MM-DDTHH:MM:SS`), keeping only the date.
pub fn parse_api_date(field: &'static str, value: &str) -> Result<NaiveDate, RecordError> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date())
        })
        .map_err(|_| RecordError::InvalidDate {
            field,
            value: value.to_string(),
        })
}

fn hours_from_f64(hours: f64) -> Result<Decimal, RecordError> {
    Decimal::from_f64(hours).ok_or_else(|| RecordError::InvalidHours(hours.to_string()))
}

// --- Core Records ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub id: CollaboratorId,
    pub name: String,
    pub email: String,
    /// Payroll registration number, required for meal-voucher export.
    pub matricule: Option<String>,
}

impl Collaborator {
    pub fn email_matches(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email)
    }
}

/// One absence interval from the payroll feed. Bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsenceRecord {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub absence_type: String,
    pub status: String,
}

impl AbsenceRecord {
    /// An inverted interval (`end_date < start_date`) covers nothing.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn is_inverted(&self) -> bool {
        self.end_date < self.start_date
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationRecord {
    pub date: NaiveDate,
    pub project_id: ProjectId,
    pub project_name: String,
    pub hours: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub date: NaiveDate,
    pub project_id: ProjectId,
    pub project_name: Option<String>,
    pub task_id: Option<String>,
    pub task_name: Option<String>,
    pub hours: Decimal,
}

impl ForecastRecord {
    /// Label of the detail line this forecast is grouped under.
    pub fn line_label(&self) -> String {
        let project = self
            .project_name
            .clone()
            .unwrap_or_else(|| self.project_id.clone());
        match &self.task_name {
            Some(task) => format!("{} – {}", project, task),
            None => project,
        }
    }
}

// --- Raw API Shapes ---
// Loosely typed payloads as served by the synchronization backend.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCollaborator {
    pub id: String,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub matricule: Option<String>,
    pub active: Option<bool>,
}

impl RawCollaborator {
    /// Missing flag means active.
    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(true)
    }
}

impl TryFrom<&RawCollaborator> for Collaborator {
    type Error = RecordError;

    fn try_from(raw: &RawCollaborator) -> Result<Self, Self::Error> {
        let email = raw
            .email
            .clone()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| RecordError::MissingEmail { id: raw.id.clone() })?;
        let full_name = format!(
            "{} {}",
            raw.first_name.as_deref().unwrap_or_default(),
            raw.last_name.as_deref().unwrap_or_default()
        );
        // Display name, then first and last name, then the e-mail.
        let name = [raw.name.as_deref().unwrap_or_default(), full_name.as_str()]
            .into_iter()
            .map(str::trim)
            .find(|candidate| !candidate.is_empty())
            .unwrap_or(email.as_str())
            .to_string();
        Ok(Collaborator {
            id: raw.id.clone(),
            name,
            email,
            matricule: raw.matricule.clone().filter(|m| !m.trim().is_empty()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAbsence {
    pub collaborator_id: String,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub status: Option<String>,
}

impl TryFrom<&RawAbsence> for AbsenceRecord {
    type Error = RecordError;

    fn try_from(raw: &RawAbsence) -> Result<Self, Self::Error> {
        let record = AbsenceRecord {
            start_date: parse_api_date("start_date", &raw.start_date)?,
            end_date: parse_api_date("end_date", &raw.end_date)?,
            absence_type: raw.type_.clone().unwrap_or_default(),
            status: raw.status.clone().unwrap_or_default(),
        };
        if record.is_inverted() {
            warn!(
                "Absence for {} ends before it starts ({} > {}); it will match no day",
                raw.collaborator_id, record.start_date, record.end_date
            );
        }
        Ok(record)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDeclaration {
    pub collaborator_id: String,
    pub date: String,
    pub project_id: String,
    pub project_name: Option<String>,
    pub hours: f64,
}

impl TryFrom<&RawDeclaration> for DeclarationRecord {
    type Error = RecordError;

    fn try_from(raw: &RawDeclaration) -> Result<Self, Self::Error> {
        Ok(DeclarationRecord {
            date: parse_api_date("date", &raw.date)?,
            project_id: raw.project_id.clone(),
            project_name: raw
                .project_name
                .clone()
                .unwrap_or_else(|| raw.project_id.clone()),
            hours: hours_from_f64(raw.hours)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawForecast {
    pub collaborator_id: String,
    pub date: String,
    pub project_id: String,
    pub project_name: Option<String>,
    pub task_id: Option<String>,
    pub task_name: Option<String>,
    pub hours: f64,
}

impl TryFrom<&RawForecast> for ForecastRecord {
    type Error = RecordError;

    fn try_from(raw: &RawForecast) -> Result<Self, Self::Error> {
        Ok(ForecastRecord {
            date: parse_api_date("date", &raw.date)?,
            project_id: raw.project_id.clone(),
            project_name: raw.project_name.clone(),
            task_id: raw.task_id.clone(),
            task_name: raw.task_name.clone(),
            hours: hours_from_f64(raw.hours)?,
        })
    }
}
