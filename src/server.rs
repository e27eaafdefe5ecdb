// src/server.rs
use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::calendar::{build_period, CalendarDay, HolidaySource, YearMonth};
use crate::config::Config;
use crate::error::AppError;
use crate::export::rights_to_csv;
use crate::feeds::{gather_month_inputs, PlanningSnapshot, SnapshotFeeds};
use crate::meal_voucher::{compute_month_rights, MealVoucherMonth};
use crate::plan_charge::{compute_monthly_view, MonthlyView, PlanningSettings};

#[derive(Clone)]
pub struct AppState {
    pub settings: PlanningSettings,
    pub holidays: Arc<dyn HolidaySource>,
    pub accepted_absence_statuses: Option<Vec<String>>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            settings: config.planning_settings(),
            holidays: Arc::new(config.holiday_source()),
            accepted_absence_statuses: config.accepted_absence_statuses(),
        }
    }

    fn feeds(&self, snapshot: &PlanningSnapshot) -> SnapshotFeeds {
        let feeds = SnapshotFeeds::from_snapshot(snapshot);
        match &self.accepted_absence_statuses {
            Some(statuses) => feeds.with_accepted_absence_statuses(statuses),
            None => feeds,
        }
    }

    pub async fn plan_charge(
        &self,
        period: YearMonth,
        snapshot: &PlanningSnapshot,
    ) -> Result<MonthlyView, AppError> {
        let feeds = self.feeds(snapshot);
        let (roster, inputs) = gather_month_inputs(&feeds, &feeds, &feeds, &feeds, period).await?;
        Ok(compute_monthly_view(
            period,
            &roster,
            &inputs,
            self.holidays.as_ref(),
            &self.settings,
        ))
    }

    pub async fn meal_vouchers(
        &self,
        period: YearMonth,
        snapshot: &PlanningSnapshot,
    ) -> Result<MealVoucherMonth, AppError> {
        let feeds = self.feeds(snapshot);
        let (roster, inputs) = gather_month_inputs(&feeds, &feeds, &feeds, &feeds, period).await?;
        Ok(compute_month_rights(
            period,
            &roster,
            &inputs,
            &snapshot.eligibility_overrides,
            &snapshot.payroll_contracts,
            self.holidays.as_ref(),
        ))
    }
}

/// Body of the computation endpoints. `month` is 1-based.
#[derive(Debug, Deserialize)]
pub struct MonthRequest {
    pub year: i32,
    pub month: u32,
    #[serde(default)]
    pub snapshot: PlanningSnapshot,
}

impl MonthRequest {
    fn period(&self) -> Result<YearMonth, AppError> {
        Ok(YearMonth::new(self.year, self.month)?)
    }
}

pub fn router(state: AppState) -> Router {
    let api_router = Router::new()
        .route("/calendar/{year}/{month}", get(get_calendar))
        .route("/plan-charge", post(post_plan_charge))
        .route("/meal-vouchers", post(post_meal_vouchers))
        .route("/meal-vouchers/export", post(post_meal_vouchers_export));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let app = router(AppState::from_config(config));
    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

// --- Handlers ---

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn get_calendar(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<Vec<CalendarDay>>, AppError> {
    let period = YearMonth::new(year, month)?;
    Ok(Json(build_period(period, state.holidays.as_ref())))
}

async fn post_plan_charge(
    State(state): State<AppState>,
    Json(request): Json<MonthRequest>,
) -> Result<Json<MonthlyView>, AppError> {
    let view = state.plan_charge(request.period()?, &request.snapshot).await?;
    Ok(Json(view))
}

async fn post_meal_vouchers(
    State(state): State<AppState>,
    Json(request): Json<MonthRequest>,
) -> Result<Json<MealVoucherMonth>, AppError> {
    let month = state
        .meal_vouchers(request.period()?, &request.snapshot)
        .await?;
    Ok(Json(month))
}

async fn post_meal_vouchers_export(
    State(state): State<AppState>,
    Json(request): Json<MonthRequest>,
) -> Result<impl IntoResponse, AppError> {
    let period = request.period()?;
    let month = state.meal_vouchers(period, &request.snapshot).await?;
    let csv = rights_to_csv(&month)?;
    let disposition = format!(
        "attachment; filename=\"titres_restaurant_{}_{:02}.csv\"",
        period.year, period.month
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}
