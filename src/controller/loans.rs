//! Loan read endpoints
//!
//! Views over the request log and the live contract records. List views
//! accept `?format=csv`.

use actix_web::{get, web, HttpResponse, Responder};
use alloy_primitives::Address;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::{
    configuration::{AppState, State},
    error::Error,
    helpers::{repayment_preview, to_csv_response},
};

#[derive(Debug, Deserialize)]
pub struct FormatQuery {
    format: Option<String>,
}

// =============================================================================
// Loan Requests
// =============================================================================

#[get("/loan-requests")]
pub async fn loan_requests(
    state: web::Data<AppState<State>>,
    query: web::Query<FormatQuery>,
) -> Result<HttpResponse, Error> {
    let data = state.aggregator.get_all_requests().await;

    match query.format.as_deref() {
        Some("csv") => to_csv_response(&data, "loan-requests.csv"),
        _ => Ok(HttpResponse::Ok().json(data)),
    }
}

#[get("/loan-requests/pending")]
pub async fn pending_requests(
    state: web::Data<AppState<State>>,
    query: web::Query<FormatQuery>,
) -> Result<HttpResponse, Error> {
    let data = state.aggregator.get_pending_requests().await;

    match query.format.as_deref() {
        Some("csv") => to_csv_response(&data, "pending-loan-requests.csv"),
        _ => Ok(HttpResponse::Ok().json(data)),
    }
}

// =============================================================================
// Loans
// =============================================================================

#[get("/loans/approved")]
pub async fn approved_loans(
    state: web::Data<AppState<State>>,
    query: web::Query<FormatQuery>,
) -> Result<HttpResponse, Error> {
    let data = state.aggregator.get_approved_loans().await;

    match query.format.as_deref() {
        Some("csv") => to_csv_response(&data, "approved-loans.csv"),
        _ => Ok(HttpResponse::Ok().json(data)),
    }
}

#[get("/loans/statistics")]
pub async fn statistics(
    state: web::Data<AppState<State>>,
) -> Result<impl Responder, Error> {
    let data = state.aggregator.get_statistics().await;
    Ok(web::Json(data))
}

#[derive(Debug, Deserialize)]
pub struct RepaymentPreviewQuery {
    income: BigDecimal,
    repayment_percent: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RepaymentPreviewResponse {
    pub repayment: BigDecimal,
}

#[get("/loans/repayment-preview")]
pub async fn preview(
    query: web::Query<RepaymentPreviewQuery>,
) -> Result<impl Responder, Error> {
    if query.income < BigDecimal::from(0) {
        return Err(Error::InvalidAmount(query.income.to_string()));
    }

    let repayment = repayment_preview(&query.income, query.repayment_percent);
    Ok(web::Json(RepaymentPreviewResponse { repayment }))
}

#[get("/loans/{address}")]
pub async fn loan_details(
    state: web::Data<AppState<State>>,
    path: web::Path<String>,
) -> Result<impl Responder, Error> {
    let borrower = parse_address(&path)?;
    let data = state.aggregator.get_loan_details(borrower).await?;
    Ok(web::Json(data))
}

// =============================================================================
// Activity
// =============================================================================

#[get("/activity")]
pub async fn activity(
    state: web::Data<AppState<State>>,
    query: web::Query<FormatQuery>,
) -> Result<HttpResponse, Error> {
    let data = state.aggregator.get_activity().await;

    match query.format.as_deref() {
        Some("csv") => to_csv_response(&data, "loan-activity.csv"),
        _ => Ok(HttpResponse::Ok().json(data)),
    }
}

pub(super) fn parse_address(value: &str) -> Result<Address, Error> {
    value
        .parse()
        .map_err(|e| Error::InvalidAddress(format!("{}: {}", value, e)))
}
