//! Fixed-rate, fully-amortising loan math.
//!
//! Periodic payment, annualised debt service, remaining balance and a
//! year-by-year schedule. Degenerate loans (no principal, no interest) follow
//! fixed fallback policies instead of raising errors; only a zero-length term
//! is rejected.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DealScreenError;
use crate::types::{checked_powi, Money, Periods, Rate, MONTHS_PER_YEAR};
use crate::DealScreenResult;

/// One year of a monthly-pay amortisation schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationYear {
    pub year: u32,
    pub opening_balance: Money,
    pub interest: Money,
    pub principal: Money,
    pub closing_balance: Money,
}

/// Summary of a monthly-pay loan and its schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSummary {
    pub principal: Money,
    pub annual_rate: Rate,
    pub amortization_years: u32,
    pub monthly_payment: Money,
    pub annual_debt_service: Money,
    pub total_interest: Money,
    pub schedule: Vec<AmortizationYear>,
}

fn compound_factor(rate: Rate, n: Periods) -> DealScreenResult<Decimal> {
    checked_powi(Decimal::ONE + rate, n).ok_or_else(|| DealScreenError::NumericOverflow {
        context: format!("compound factor (1 + {rate})^{n}"),
    })
}

fn total_months(amortization_years: u32) -> DealScreenResult<Periods> {
    if amortization_years == 0 {
        return Err(DealScreenError::invalid(
            "amortization_years",
            "Amortization term must be at least 1 year",
        ));
    }
    amortization_years
        .checked_mul(MONTHS_PER_YEAR)
        .ok_or_else(|| DealScreenError::invalid("amortization_years", "Amortization term too long"))
}

/// Fixed payment that fully amortises `principal` over `n_periods` at `rate`
/// per period: `r·P / (1 − (1+r)^−n)`.
///
/// No principal pays nothing; a non-positive rate repays straight-line.
pub fn periodic_payment(rate: Rate, n_periods: Periods, principal: Money) -> DealScreenResult<Money> {
    if n_periods == 0 {
        return Err(DealScreenError::invalid(
            "n_periods",
            "Number of periods must be > 0",
        ));
    }
    if principal <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    if rate <= Decimal::ZERO {
        return Ok(principal / Decimal::from(n_periods));
    }

    // r·P·c / (c − 1) with c = (1+r)^n, algebraically the same as the
    // negative-exponent form but without a reciprocal of a large power.
    let compound = compound_factor(rate, n_periods)?;
    let denominator = compound - Decimal::ONE;
    if denominator.is_zero() {
        return Err(DealScreenError::DivisionByZero {
            context: "payment annuity factor".into(),
        });
    }

    Ok(principal * rate * compound / denominator)
}

/// Monthly payment on a loan quoted at an annual rate and term.
pub fn monthly_payment(principal: Money, annual_rate: Rate, amortization_years: u32) -> DealScreenResult<Money> {
    let n = total_months(amortization_years)?;
    periodic_payment(annual_rate / Decimal::from(MONTHS_PER_YEAR), n, principal)
}

/// Twelve monthly payments.
pub fn annual_debt_service(
    principal: Money,
    annual_rate: Rate,
    amortization_years: u32,
) -> DealScreenResult<Money> {
    Ok(monthly_payment(principal, annual_rate, amortization_years)? * Decimal::from(MONTHS_PER_YEAR))
}

/// Balance outstanding after `periods_elapsed` monthly payments.
///
/// `periods_elapsed` is clamped to the term. Closed form
/// `P(1+r)^k − m((1+r)^k − 1)/r`, floored at zero.
pub fn remaining_balance(
    principal: Money,
    annual_rate: Rate,
    amortization_years: u32,
    periods_elapsed: Periods,
) -> DealScreenResult<Money> {
    let total = total_months(amortization_years)?;
    if principal <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }

    let k = periods_elapsed.min(total);
    if k == 0 {
        return Ok(principal);
    }
    if k >= total {
        return Ok(Decimal::ZERO);
    }

    let monthly_rate = annual_rate / Decimal::from(MONTHS_PER_YEAR);
    if monthly_rate <= Decimal::ZERO {
        let repaid_fraction = Decimal::from(k) / Decimal::from(total);
        return Ok((principal * (Decimal::ONE - repaid_fraction)).max(Decimal::ZERO));
    }

    let payment = periodic_payment(monthly_rate, total, principal)?;
    let growth = compound_factor(monthly_rate, k)?;
    let balance = principal * growth - payment * (growth - Decimal::ONE) / monthly_rate;

    Ok(balance.max(Decimal::ZERO))
}

/// Walk the loan month by month and roll the result up by year.
///
/// The final payment absorbs any rounding residue so the closing balance of
/// the last year is exactly zero.
pub fn amortization_schedule(
    principal: Money,
    annual_rate: Rate,
    amortization_years: u32,
) -> DealScreenResult<LoanSummary> {
    let total = total_months(amortization_years)?;
    let payment = monthly_payment(principal, annual_rate, amortization_years)?;
    let monthly_rate = (annual_rate / Decimal::from(MONTHS_PER_YEAR)).max(Decimal::ZERO);

    let mut balance = principal.max(Decimal::ZERO);
    let mut schedule = Vec::with_capacity(amortization_years as usize);
    let mut total_interest = Decimal::ZERO;

    for year in 1..=amortization_years {
        let opening_balance = balance;
        let mut interest = Decimal::ZERO;
        let mut principal_paid = Decimal::ZERO;

        for month in 1..=MONTHS_PER_YEAR {
            let period = (year - 1) * MONTHS_PER_YEAR + month;
            let month_interest = balance * monthly_rate;
            let month_principal = if period == total {
                balance
            } else {
                (payment - month_interest).min(balance)
            };
            balance -= month_principal;
            interest += month_interest;
            principal_paid += month_principal;
        }

        total_interest += interest;
        schedule.push(AmortizationYear {
            year,
            opening_balance,
            interest,
            principal: principal_paid,
            closing_balance: balance,
        });
    }

    debug!(
        %principal,
        %annual_rate,
        amortization_years,
        %payment,
        %total_interest,
        "built amortization schedule"
    );

    Ok(LoanSummary {
        principal,
        annual_rate,
        amortization_years,
        monthly_payment: payment,
        annual_debt_service: payment * Decimal::from(MONTHS_PER_YEAR),
        total_interest,
        schedule,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_payment_zero_rate_is_straight_line() {
        assert_eq!(periodic_payment(dec!(0), 360, dec!(360000)).unwrap(), dec!(1000));
        assert_eq!(periodic_payment(dec!(-0.01), 4, dec!(100)).unwrap(), dec!(25));
    }

    #[test]
    fn test_payment_no_principal() {
        assert_eq!(periodic_payment(dec!(0.005), 360, dec!(0)).unwrap(), Decimal::ZERO);
        assert_eq!(periodic_payment(dec!(0.005), 360, dec!(-10)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_payment_zero_periods_rejected() {
        assert!(periodic_payment(dec!(0.005), 0, dec!(1000)).is_err());
        assert!(periodic_payment(dec!(0), 0, dec!(0)).is_err());
    }

    #[test]
    fn test_standard_30_year_mortgage() {
        // $200k at 6% over 30 years: textbook payment $1,199.10
        let pmt = monthly_payment(dec!(200000), dec!(0.06), 30).unwrap();
        assert!((pmt - dec!(1199.10)).abs() < dec!(0.01), "got {pmt}");
    }

    #[test]
    fn test_single_period_payment() {
        // One period at 10%: repay principal plus one period of interest
        let pmt = periodic_payment(dec!(0.10), 1, dec!(1000)).unwrap();
        assert!((pmt - dec!(1100)).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_remaining_balance_endpoints() {
        let p = dec!(500000);
        assert_eq!(remaining_balance(p, dec!(0.07), 30, 0).unwrap(), p);
        assert_eq!(remaining_balance(p, dec!(0.07), 30, 360).unwrap(), Decimal::ZERO);
        assert_eq!(remaining_balance(p, dec!(0.07), 30, 999).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_remaining_balance_zero_rate_straight_line() {
        let bal = remaining_balance(dec!(120000), dec!(0), 10, 30).unwrap();
        assert_eq!(bal, dec!(90000));
    }

    #[test]
    fn test_remaining_balance_matches_schedule() {
        let summary = amortization_schedule(dec!(300000), dec!(0.065), 30).unwrap();
        let closed_form = remaining_balance(dec!(300000), dec!(0.065), 30, 60).unwrap();
        let walked = summary.schedule[4].closing_balance;
        assert!((closed_form - walked).abs() < dec!(0.01), "{closed_form} vs {walked}");
    }

    #[test]
    fn test_zero_amortization_term_rejected() {
        assert!(remaining_balance(dec!(1000), dec!(0.05), 0, 12).is_err());
        assert!(annual_debt_service(dec!(1000), dec!(0.05), 0).is_err());
    }
}
