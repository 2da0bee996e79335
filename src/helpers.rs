use actix_web::HttpResponse;
use alloy_primitives::U256;
use bigdecimal::{
    num_bigint::{BigInt, Sign},
    BigDecimal, Zero as _,
};

use crate::error::Error;

/// Contract amounts are stored with 18 decimals (wei per display unit).
pub const AMOUNT_DECIMALS: i64 = 18;

pub fn from_smallest_unit(value: U256) -> BigDecimal {
    let digits = BigInt::from_bytes_be(Sign::Plus, &value.to_be_bytes::<32>());
    trim_zeros(BigDecimal::new(digits, AMOUNT_DECIMALS))
}

pub fn to_smallest_unit(amount: &BigDecimal) -> Result<U256, Error> {
    if amount < &BigDecimal::zero() {
        return Err(Error::InvalidAmount(format!(
            "{} must not be negative",
            amount
        )));
    }

    let scaled = amount * BigDecimal::new(BigInt::from(1), -AMOUNT_DECIMALS);
    let integral = scaled.with_scale(0);

    if integral != scaled {
        return Err(Error::InvalidAmount(format!(
            "{} has more than {} decimal places",
            amount, AMOUNT_DECIMALS
        )));
    }

    let (digits, _) = integral.as_bigint_and_exponent();
    let (_, bytes) = digits.to_bytes_be();

    U256::try_from_be_slice(&bytes).ok_or_else(|| {
        Error::InvalidAmount(format!("{} is too large", amount))
    })
}

/// Amount the contract takes from a declared income on repayment.
pub fn repayment_preview(
    income: &BigDecimal,
    repayment_percent: u64,
) -> BigDecimal {
    trim_zeros(
        income * BigDecimal::from(repayment_percent) / BigDecimal::from(100),
    )
}

/// Drops trailing fractional zeros without switching to exponent notation.
fn trim_zeros(value: BigDecimal) -> BigDecimal {
    let value = value.normalized();
    let (_, scale) = value.as_bigint_and_exponent();

    if scale < 0 {
        value.with_scale(0)
    } else {
        value
    }
}

pub fn to_csv_response<T: serde::Serialize>(
    data: &[T],
    filename: &str,
) -> Result<HttpResponse, Error> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in data {
        wtr.serialize(record).map_err(|e| {
            Error::ServerError(format!("CSV serialization error: {}", e))
        })?;
    }
    let csv_data = wtr
        .into_inner()
        .map_err(|e| Error::ServerError(format!("CSV writer error: {}", e)))?;
    let csv_string = String::from_utf8(csv_data).map_err(|e| {
        Error::ServerError(format!("CSV encoding error: {}", e))
    })?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(csv_string))
}
