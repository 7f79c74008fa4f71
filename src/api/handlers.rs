//! REST API handlers for shop activity reports
//!
//! These handlers use the shared ReportService.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::service::{ReportService, Stats};
use crate::ledger::LoadStats;
use crate::report::{MonthlyReport, ReportOutcome};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct StatsResponse {
    pub source: String,
    pub transactions: usize,
    pub employees: usize,
    pub load: LoadStats,
}

impl From<Stats> for StatsResponse {
    fn from(s: Stats) -> Self {
        Self {
            source: s.source.display().to_string(),
            transactions: s.transactions,
            employees: s.employees,
            load: s.load,
        }
    }
}

#[derive(Serialize)]
pub struct EmployeesResponse {
    pub employees: Vec<String>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn internal_error(e: anyhow::Error) -> ApiError {
    tracing::error!("Request failed: {:#}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("{:#}", e),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

pub type AppState = Arc<ReportService>;

/// GET /api/v1/health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// GET /api/v1/stats
pub async fn get_stats(State(service): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    service
        .stats()
        .await
        .map(|s| Json(s.into()))
        .map_err(internal_error)
}

/// GET /api/v1/employees
pub async fn get_employees(
    State(service): State<AppState>,
) -> Result<Json<EmployeesResponse>, ApiError> {
    service
        .employees()
        .await
        .map(|employees| Json(EmployeesResponse { employees }))
        .map_err(internal_error)
}

/// GET /api/v1/reports/:employee
pub async fn get_report(
    State(service): State<AppState>,
    Path(employee): Path<String>,
) -> Result<Json<MonthlyReport>, ApiError> {
    match service.report(&employee).await {
        Ok(ReportOutcome::Report(report)) => Ok(Json(report)),
        Ok(ReportOutcome::NoData { employee }) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("No data found for employee: {}", employee),
            }),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

/// POST /api/v1/refresh
pub async fn refresh(State(service): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    service
        .refresh()
        .await
        .map(|s| Json(s.into()))
        .map_err(internal_error)
}
