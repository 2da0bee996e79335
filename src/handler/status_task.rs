use std::time::Duration;

use tokio::time;
use tracing::{info, warn};

use crate::{
    configuration::{AppState, State},
    error::Error,
};

/// Periodically checks the contract runtime and logs the portfolio
/// snapshot. Disabled when the interval is zero.
pub async fn status_task(app_state: AppState<State>) -> Result<(), Error> {
    let interval_value = app_state.config.status_interval;

    if interval_value == 0 {
        return Ok(());
    }

    let mut interval = time::interval(Duration::from_secs(interval_value));

    loop {
        interval.tick().await;

        let status = app_state
            .aggregator
            .get_system_status(app_state.config.loan_contract)
            .await;

        match status.block_number {
            Some(block_number) => info!(
                "block {}: {} loans, {} pending, {} approved, {} completed, repayment rate {}%",
                block_number,
                status.statistics.total_requests,
                status.statistics.pending_loans,
                status.statistics.approved_loans,
                status.statistics.completed_loans,
                status.statistics.repayment_rate
            ),
            None => warn!(
                "contract runtime {} is not reachable",
                app_state.config.rpc_host
            ),
        }
    }
}
