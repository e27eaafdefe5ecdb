// src/feeds.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::calendar::YearMonth;
use crate::meal_voucher::{EligibilityOverride, PayrollContract};
use crate::plan_charge::{CollaboratorInputs, MonthInputs};
use crate::records::{
    AbsenceRecord, Collaborator, CollaboratorId, DeclarationRecord, ForecastRecord,
    RawAbsence, RawCollaborator, RawDeclaration, RawForecast, RecordError,
};

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Period {0} has no valid date range")]
    InvalidPeriod(YearMonth),
}

// --- Feed Capabilities ---

#[async_trait]
pub trait CollaboratorRoster: Send + Sync {
    async fn active_collaborators(&self) -> Result<Vec<Collaborator>, FeedError>;
}

/// Absences overlapping `[from, to]` (inclusive).
#[async_trait]
pub trait AbsenceFeed: Send + Sync {
    async fn absences_for(
        &self,
        collaborator_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AbsenceRecord>, FeedError>;
}

#[async_trait]
pub trait DeclarationFeed: Send + Sync {
    async fn declarations_for(
        &self,
        collaborator_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DeclarationRecord>, FeedError>;
}

#[async_trait]
pub trait ForecastFeed: Send + Sync {
    async fn forecasts_for(
        &self,
        collaborator_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ForecastRecord>, FeedError>;
}

// --- Snapshot ---

/// Already synchronized payroll and time-tracking data, as exchanged in JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanningSnapshot {
    #[serde(default)]
    pub collaborators: Vec<RawCollaborator>,
    #[serde(default)]
    pub absences: Vec<RawAbsence>,
    #[serde(default)]
    pub declarations: Vec<RawDeclaration>,
    #[serde(default)]
    pub forecasts: Vec<RawForecast>,
    #[serde(default)]
    pub eligibility_overrides: Vec<EligibilityOverride>,
    #[serde(default)]
    pub payroll_contracts: Vec<PayrollContract>,
}

impl PlanningSnapshot {
    pub fn from_json_str(json: &str) -> Result<Self, FeedError> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn load(path: &Path) -> Result<Self, FeedError> {
        let json = tokio::fs::read_to_string(path).await?;
        let snapshot = Self::from_json_str(&json)?;
        info!(
            "Loaded snapshot {}: {} collaborators, {} absences, {} declarations, {} forecasts",
            path.display(),
            snapshot.collaborators.len(),
            snapshot.absences.len(),
            snapshot.declarations.len(),
            snapshot.forecasts.len()
        );
        Ok(snapshot)
    }
}

/// Converts raw records, dropping the ones that fail validation.
fn convert_by_collaborator<'a, R, T>(
    kind: &str,
    raw: &'a [R],
    collaborator_id: impl Fn(&'a R) -> &'a str,
) -> HashMap<CollaboratorId, Vec<T>>
where
    T: TryFrom<&'a R, Error = RecordError>,
{
    let mut converted: HashMap<CollaboratorId, Vec<T>> = HashMap::new();
    for record in raw {
        let owner = collaborator_id(record);
        match T::try_from(record) {
            Ok(record) => converted.entry(owner.to_string()).or_default().push(record),
            Err(e) => warn!("Skipping {} of collaborator {}: {}", kind, owner, e),
        }
    }
    converted
}

fn overlaps(date: NaiveDate, from: NaiveDate, to: NaiveDate) -> bool {
    from <= date && date <= to
}

/// In-memory implementation of every feed, backed by a [`PlanningSnapshot`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotFeeds {
    collaborators: Vec<Collaborator>,
    absences: HashMap<CollaboratorId, Vec<AbsenceRecord>>,
    declarations: HashMap<CollaboratorId, Vec<DeclarationRecord>>,
    forecasts: HashMap<CollaboratorId, Vec<ForecastRecord>>,
    /// Lowercased. `None` accepts every absence.
    accepted_absence_statuses: Option<BTreeSet<String>>,
}

impl SnapshotFeeds {
    pub fn from_snapshot(snapshot: &PlanningSnapshot) -> Self {
        let mut collaborators = Vec::new();
        for raw in &snapshot.collaborators {
            if !raw.is_active() {
                debug!("Collaborator {} is inactive, not in roster", raw.id);
                continue;
            }
            match Collaborator::try_from(raw) {
                Ok(collaborator) => collaborators.push(collaborator),
                Err(e) => warn!("Skipping collaborator {}: {}", raw.id, e),
            }
        }

        Self {
            collaborators,
            absences: convert_by_collaborator("absence", &snapshot.absences, |r| {
                r.collaborator_id.as_str()
            }),
            declarations: convert_by_collaborator("declaration", &snapshot.declarations, |r| {
                r.collaborator_id.as_str()
            }),
            forecasts: convert_by_collaborator("forecast", &snapshot.forecasts, |r| {
                r.collaborator_id.as_str()
            }),
            accepted_absence_statuses: None,
        }
    }

    /// Only absences whose status is in `statuses` (case-insensitive) are served.
    pub fn with_accepted_absence_statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.accepted_absence_statuses = Some(
            statuses
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .collect(),
        );
        self
    }

    fn absence_status_accepted(&self, absence: &AbsenceRecord) -> bool {
        match &self.accepted_absence_statuses {
            Some(accepted) => accepted.contains(&absence.status.to_lowercase()),
            None => true,
        }
    }
}

#[async_trait]
impl CollaboratorRoster for SnapshotFeeds {
    async fn active_collaborators(&self) -> Result<Vec<Collaborator>, FeedError> {
        Ok(self.collaborators.clone())
    }
}

#[async_trait]
impl AbsenceFeed for SnapshotFeeds {
    async fn absences_for(
        &self,
        collaborator_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AbsenceRecord>, FeedError> {
        Ok(self
            .absences
            .get(collaborator_id)
            .into_iter()
            .flatten()
            .filter(|a| a.start_date <= to && a.end_date >= from)
            .filter(|a| self.absence_status_accepted(a))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DeclarationFeed for SnapshotFeeds {
    async fn declarations_for(
        &self,
        collaborator_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DeclarationRecord>, FeedError> {
        Ok(self
            .declarations
            .get(collaborator_id)
            .into_iter()
            .flatten()
            .filter(|d| overlaps(d.date, from, to))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ForecastFeed for SnapshotFeeds {
    async fn forecasts_for(
        &self,
        collaborator_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ForecastRecord>, FeedError> {
        Ok(self
            .forecasts
            .get(collaborator_id)
            .into_iter()
            .flatten()
            .filter(|f| overlaps(f.date, from, to))
            .cloned()
            .collect())
    }
}

// --- Collection ---

/// Fetches the roster and each collaborator's records for `period`.
pub async fn gather_month_inputs(
    roster: &dyn CollaboratorRoster,
    absences: &dyn AbsenceFeed,
    declarations: &dyn DeclarationFeed,
    forecasts: &dyn ForecastFeed,
    period: YearMonth,
) -> Result<(Vec<Collaborator>, MonthInputs), FeedError> {
    let (Some(from), Some(to)) = (period.first_day(), period.last_day()) else {
        return Err(FeedError::InvalidPeriod(period));
    };

    let collaborators = roster.active_collaborators().await?;
    let mut inputs = MonthInputs::new();
    for collaborator in &collaborators {
        let id = collaborator.id.as_str();
        let collaborator_inputs = CollaboratorInputs::new(
            absences.absences_for(id, from, to).await?,
            declarations.declarations_for(id, from, to).await?,
            forecasts.forecasts_for(id, from, to).await?,
        );
        inputs.insert(collaborator.id.clone(), collaborator_inputs);
    }
    debug!(
        "Gathered inputs for {} collaborators in {}",
        collaborators.len(),
        period
    );
    Ok((collaborators, inputs))
}
