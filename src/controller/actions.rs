//! Loan write endpoints
//!
//! Protected by the shared `Authorization` secret. Each call is sent from the
//! account named in the body, which must be unlocked on the node. Each call
//! waits until the transaction is mined and answers with its confirmation.

use actix_web::{post, web, HttpRequest, Responder};
use alloy_primitives::Address;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::{
    configuration::{AppState, State},
    error::Error,
};

use super::loans::parse_address;

#[derive(Debug, Serialize, Deserialize)]
pub struct RequestLoanBody {
    pub borrower: Address,
    pub amount: BigDecimal,
    pub repayment_percent: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RepayLoanBody {
    pub borrower: Address,
    pub income: BigDecimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApproveLoanBody {
    pub owner: Address,
}

#[post("/loans/request")]
pub async fn request_loan(
    state: web::Data<AppState<State>>,
    req: HttpRequest,
    body: web::Json<RequestLoanBody>,
) -> Result<impl Responder, Error> {
    authorize(&state, &req)?;

    let confirmation = state
        .dispatcher
        .request_loan(body.borrower, &body.amount, body.repayment_percent)
        .await?;

    Ok(web::Json(confirmation))
}

#[post("/loans/{address}/approve")]
pub async fn approve_loan(
    state: web::Data<AppState<State>>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<ApproveLoanBody>,
) -> Result<impl Responder, Error> {
    authorize(&state, &req)?;

    let borrower = parse_address(&path)?;
    let confirmation =
        state.dispatcher.approve_loan(body.owner, borrower).await?;

    Ok(web::Json(confirmation))
}

#[post("/loans/repay")]
pub async fn repay_loan(
    state: web::Data<AppState<State>>,
    req: HttpRequest,
    body: web::Json<RepayLoanBody>,
) -> Result<impl Responder, Error> {
    authorize(&state, &req)?;

    let confirmation = state
        .dispatcher
        .repay_loan(body.borrower, &body.income)
        .await?;

    Ok(web::Json(confirmation))
}

fn authorize(state: &AppState<State>, req: &HttpRequest) -> Result<(), Error> {
    let auth = req
        .headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok());

    match auth {
        Some(auth) if auth == state.config.auth => Ok(()),
        _ => Err(Error::Unauthorized()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{http::StatusCode, test, App};
    use alloy_primitives::U256;

    use super::*;
    use crate::{
        model::Confirmation,
        testing::{
            address, app_state, config, FakeLoanContract, StubNode,
            Submitted, UNIT,
        },
    };

    #[actix_web::test]
    async fn test_write_requires_authorization() {
        let fake = Arc::new(FakeLoanContract::default());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state(fake.clone())))
                .service(request_loan),
        )
        .await;

        let body = RequestLoanBody {
            borrower: address(1),
            amount: BigDecimal::from(2),
            repayment_percent: 10,
        };

        let req = test::TestRequest::post()
            .uri("/loans/request")
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/loans/request")
            .insert_header(("Authorization", "wrong"))
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        assert!(fake.submitted().is_empty());
    }

    #[actix_web::test]
    async fn test_request_and_approve() {
        let fake = Arc::new(FakeLoanContract::default());
        let state = app_state(fake.clone());
        let auth = state.config.auth.to_owned();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(request_loan)
                .service(approve_loan),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/loans/request")
            .insert_header(("Authorization", auth.as_str()))
            .set_json(RequestLoanBody {
                borrower: address(1),
                amount: BigDecimal::from(2),
                repayment_percent: 10,
            })
            .to_request();
        let confirmation: Confirmation =
            test::call_and_read_body_json(&app, req).await;
        assert_eq!(confirmation.block_number, 42);

        let req = test::TestRequest::post()
            .uri(&format!("/loans/{}/approve", address(4)))
            .insert_header(("Authorization", auth.as_str()))
            .set_json(ApproveLoanBody { owner: address(9) })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        assert_eq!(
            fake.submitted(),
            vec![
                Submitted::Request {
                    from: address(1),
                    amount: U256::from(2 * UNIT),
                    repayment_percent: 10,
                },
                Submitted::Approve {
                    from: address(9),
                    borrower: address(4),
                },
            ]
        );
    }

    #[actix_web::test]
    async fn test_rejected_write() {
        let fake = Arc::new(
            FakeLoanContract::default().rejecting("execution reverted: No active loan"),
        );
        let state = app_state(fake);
        let auth = state.config.auth.to_owned();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(repay_loan),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/loans/repay")
            .insert_header(("Authorization", auth.as_str()))
            .set_json(RepayLoanBody {
                borrower: address(1),
                income: BigDecimal::from(1),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(
            body["message"],
            "Write rejected: execution reverted: No active loan"
        );
    }

    #[actix_web::test]
    async fn test_sender_not_managed_by_node() {
        let node = StubNode::default()
            .respond(
                "eth_accounts",
                serde_json::json!({ "result": [address(9)] }),
            )
            .start();
        let contract = Arc::new(node.contract());
        let state = AppState::new(State::with_contract(
            config(),
            contract.clone(),
            contract,
        ));
        let auth = state.config.auth.to_owned();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(repay_loan),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/loans/repay")
            .insert_header(("Authorization", auth.as_str()))
            .set_json(RepayLoanBody {
                borrower: address(3),
                income: BigDecimal::from(1),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(node.params("eth_sendTransaction").is_empty());
    }
}
