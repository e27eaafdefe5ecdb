// src/config.rs
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::aggregation::{
    StaffingThresholds, DEFAULT_MAX_UNPLANNED_DAYS, DEFAULT_MIN_UTILIZATION_PERCENT,
};
use crate::calendar::{ConfiguredHolidays, FrenchHolidayCalendar, FRANCE};
use crate::plan_charge::{PlanningSettings, DEFAULT_MAX_PROJECT_LINES};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    // Calendar
    #[serde(default = "default_holiday_jurisdiction")]
    pub holiday_jurisdiction: String,

    // Staffing thresholds
    #[serde(default = "default_min_utilization_percent")]
    pub min_utilization_percent: u32,
    #[serde(default = "default_max_unplanned_days")]
    pub max_unplanned_days: u32,

    // Grid
    #[serde(default = "default_standard_day_hours")]
    pub standard_day_hours: Decimal,
    #[serde(default = "default_max_project_lines")]
    pub max_project_lines: usize,

    /// Comma separated, e.g. `approved,validated`. Unset accepts every absence.
    pub accepted_absence_statuses: Option<String>,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    3000
}

fn default_holiday_jurisdiction() -> String {
    FRANCE.to_string()
}

fn default_min_utilization_percent() -> u32 {
    DEFAULT_MIN_UTILIZATION_PERCENT
}

fn default_max_unplanned_days() -> u32 {
    DEFAULT_MAX_UNPLANNED_DAYS
}

fn default_standard_day_hours() -> Decimal {
    dec!(7)
}

fn default_max_project_lines() -> usize {
    DEFAULT_MAX_PROJECT_LINES
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        // Load .env file if it exists
        dotenv::dotenv().ok();
        envy::from_env::<Config>()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn planning_settings(&self) -> PlanningSettings {
        PlanningSettings {
            thresholds: StaffingThresholds {
                min_utilization_percent: self.min_utilization_percent,
                max_unplanned_days: self.max_unplanned_days,
            },
            standard_day_hours: self.standard_day_hours,
            max_project_lines: self.max_project_lines,
        }
    }

    pub fn holiday_source(&self) -> ConfiguredHolidays<FrenchHolidayCalendar> {
        ConfiguredHolidays::new(FrenchHolidayCalendar::new(), self.holiday_jurisdiction.clone())
    }

    pub fn accepted_absence_statuses(&self) -> Option<Vec<String>> {
        self.accepted_absence_statuses.as_ref().map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}
