use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use alloy_sol_types::Error as SOL_TYPES_ERROR;
use anyhow::Error as ANYHOW_ERROR;
use reqwest::Error as REQWEST_ERROR;
use serde_json::Error as JSON_ERROR;
use std::{env::VarError, io::Error as IO_ERROR, num::ParseIntError};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::subscriber::SetGlobalDefaultError as TRACING_GLOBAL_DEFAULT_ERROR;
use url::ParseError as URL_ERROR;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] IO_ERROR),

    #[error("{0}")]
    URL(#[from] URL_ERROR),

    #[error("{0}")]
    INT(#[from] ParseIntError),

    #[error("{0}")]
    VAR(#[from] VarError),

    #[error("{0}")]
    TokioJoinError(#[from] JoinError),

    #[error("{0}")]
    ReqwestError(#[from] REQWEST_ERROR),

    #[error("{0}")]
    JsonError(#[from] JSON_ERROR),

    #[error("ABI decode error: {0}")]
    SolTypesError(#[from] SOL_TYPES_ERROR),

    #[error("Tracing error: {0}")]
    SetGlobalDefaultError(#[from] TRACING_GLOBAL_DEFAULT_ERROR),

    #[error("{0}")]
    AnyHowError(#[from] ANYHOW_ERROR),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Server end with error: {0}")]
    ServerError(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("RPC response without result: {0}")]
    EmptyRpcResult(String),

    #[error("ABI decode error: {0}")]
    AbiDecode(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Write rejected: {0}")]
    WriteRejected(String),

    #[error("Account {0} is not managed by the node")]
    UnmanagedAccount(String),

    #[error("Unauthorized")]
    Unauthorized(),
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidAddress(_) | Error::InvalidAmount(_) => {
                StatusCode::BAD_REQUEST
            },

            Error::Unauthorized() => StatusCode::UNAUTHORIZED,

            Error::UnmanagedAccount(_) => StatusCode::FORBIDDEN,

            Error::WriteRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,

            Error::ReqwestError(_)
            | Error::Rpc { .. }
            | Error::EmptyRpcResult(_)
            | Error::AbiDecode(_)
            | Error::SolTypesError(_)
            | Error::JsonError(_) => StatusCode::BAD_GATEWAY,

            Error::Io(_)
            | Error::URL(_)
            | Error::INT(_)
            | Error::VAR(_)
            | Error::TokioJoinError(_)
            | Error::SetGlobalDefaultError(_)
            | Error::AnyHowError(_)
            | Error::ConfigurationError(_)
            | Error::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": status.canonical_reason().unwrap_or("Unknown"),
            "message": self.to_string(),
            "status": status.as_u16(),
        });
        HttpResponse::build(status).json(body)
    }
}
