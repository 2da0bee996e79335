//! Miscellaneous API endpoints
//!
//! Owner check, contract runtime status and service version.

use actix_web::{get, web, Responder};
use serde::{Deserialize, Serialize};

use crate::{
    configuration::{AppState, State},
    error::Error,
};

use super::loans::parse_address;

// =============================================================================
// Owner
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct OwnerResponse {
    pub is_owner: bool,
}

#[get("/owner/{address}")]
pub async fn owner(
    state: web::Data<AppState<State>>,
    path: web::Path<String>,
) -> Result<impl Responder, Error> {
    let address = parse_address(&path)?;
    let is_owner = state.aggregator.is_contract_owner(address).await;

    Ok(web::Json(OwnerResponse { is_owner }))
}

// =============================================================================
// Status
// =============================================================================

#[get("/status")]
pub async fn status(
    state: web::Data<AppState<State>>,
) -> Result<impl Responder, Error> {
    let data = state
        .aggregator
        .get_system_status(state.config.loan_contract)
        .await;

    Ok(web::Json(data))
}

// =============================================================================
// Version
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse<'a> {
    pub version: Option<&'a str>,
}

#[get("/version")]
pub async fn version() -> Result<impl Responder, Error> {
    const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

    Ok(web::Json(VersionResponse { version: VERSION }))
}
