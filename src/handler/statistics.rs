use bigdecimal::{BigDecimal, Zero as _};

use crate::model::{LoanRecord, PortfolioStatistics};

/// Portfolio totals over the live records of one refresh. Records without a
/// loan are skipped.
pub fn compute_statistics<'a>(
    records: impl IntoIterator<Item = &'a LoanRecord>,
) -> PortfolioStatistics {
    let mut statistics = PortfolioStatistics::empty();

    for record in records.into_iter().filter(|record| record.exists()) {
        statistics.total_requests += 1;

        if record.is_pending() {
            statistics.pending_loans += 1;
        }

        if record.is_active() {
            statistics.approved_loans += 1;
        }

        if record.is_completed {
            statistics.completed_loans += 1;
        }

        statistics.total_loan_amount += &record.loan_amount;
        statistics.total_repaid_amount += &record.repaid_amount;
    }

    statistics.repayment_rate = repayment_rate(
        &statistics.total_repaid_amount,
        &statistics.total_loan_amount,
    );

    statistics
}

pub fn repayment_rate(repaid: &BigDecimal, total: &BigDecimal) -> BigDecimal {
    if total <= &BigDecimal::zero() {
        return BigDecimal::zero();
    }

    (repaid * BigDecimal::from(100) / total).with_scale(2)
}
