use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, trace};

use crate::error::DealScreenError;
use crate::types::{Money, Rate};
use crate::DealScreenResult;

/// Default bisection bracket.
const BRACKET_LOW: Rate = dec!(-0.95);
const BRACKET_HIGH: Rate = dec!(5.0);

/// Upper bounds tried in order when the default bracket shows no sign change.
const WIDENED_UPPER_BOUNDS: [Rate; 3] = [dec!(10), dec!(25), dec!(50)];

const MAX_BISECTION_ITERATIONS: u32 = 200;
const RATE_TOLERANCE: Rate = dec!(0.000000000000001);

/// Solved rates outside `(MIN_SANE_RATE, MAX_SANE_RATE]` are reported as undefined.
const MIN_SANE_RATE: Rate = dec!(-0.99);
const MAX_SANE_RATE: Rate = dec!(5);

/// Net Present Value of a series of periodic cash flows, `cash_flows[t]` at time `t`.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> DealScreenResult<Money> {
    if rate <= dec!(-1) {
        return Err(DealScreenError::invalid(
            "rate",
            "Discount rate must be greater than -100%",
        ));
    }

    let one_plus_r = Decimal::ONE + rate;
    let mut result = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount
                .checked_mul(one_plus_r)
                .ok_or_else(|| DealScreenError::NumericOverflow {
                    context: format!("NPV discount factor at period {t}"),
                })?;
        }
        if discount.is_zero() {
            return Err(DealScreenError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result += cf / discount;
    }

    Ok(result)
}

/// NPV multiplied by a positive factor, finite across the whole bracket.
///
/// At `r >= 0` this is the NPV itself, discounted by repeated division. Below
/// zero it is `NPV · (1+r)^N` by Horner's rule, which shrinks instead of
/// overflowing as `r → −1`. Only the sign drives bisection.
fn scaled_npv(rate: Rate, cash_flows: &[Money]) -> Option<Decimal> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r >= Decimal::ONE {
        let mut total = Decimal::ZERO;
        let mut discount = Decimal::ONE;
        for cf in cash_flows {
            total = total.checked_add(cf.checked_mul(discount)?)?;
            discount /= one_plus_r;
        }
        Some(total)
    } else {
        cash_flows.iter().try_fold(Decimal::ZERO, |acc, cf| {
            acc.checked_mul(one_plus_r)?.checked_add(*cf)
        })
    }
}

fn opposite_signs(a: Decimal, b: Decimal) -> bool {
    (a < Decimal::ZERO && b > Decimal::ZERO) || (a > Decimal::ZERO && b < Decimal::ZERO)
}

fn accept(rate: Rate) -> Option<Rate> {
    if rate > MIN_SANE_RATE && rate <= MAX_SANE_RATE {
        Some(rate)
    } else {
        debug!(%rate, "IRR outside the accepted band; reporting undefined");
        None
    }
}

/// Internal Rate of Return of periodic cash flows by bisection.
///
/// Returns `None` when the series cannot have a meaningful IRR: fewer than two
/// flows, no sign change, no bracketed root, or a root outside `(−99%, 500%]`.
/// Bisection cannot overshoot into `r <= −1` the way Newton-Raphson can on
/// lumpy forced-appreciation cash flows.
pub fn solve_irr(cash_flows: &[Money]) -> Option<Rate> {
    if cash_flows.len() < 2 {
        return None;
    }
    let has_outflow = cash_flows.iter().any(|cf| *cf < Decimal::ZERO);
    let has_inflow = cash_flows.iter().any(|cf| *cf > Decimal::ZERO);
    if !(has_outflow && has_inflow) {
        debug!(periods = cash_flows.len(), "IRR undefined: cash flows never change sign");
        return None;
    }

    let mut low = BRACKET_LOW;
    let mut npv_low = scaled_npv(low, cash_flows)?;
    let mut high = BRACKET_HIGH;
    let mut npv_high = scaled_npv(high, cash_flows)?;

    if npv_low.is_zero() {
        return accept(low);
    }
    if npv_high.is_zero() {
        return accept(high);
    }

    if !opposite_signs(npv_low, npv_high) {
        let widened = WIDENED_UPPER_BOUNDS.iter().find_map(|&bound| {
            let value = scaled_npv(bound, cash_flows)?;
            (value.is_zero() || opposite_signs(npv_low, value)).then_some((bound, value))
        });
        match widened {
            Some((bound, value)) => {
                debug!(%bound, "IRR bracket widened");
                if value.is_zero() {
                    return accept(bound);
                }
                high = bound;
                npv_high = value;
            }
            None => {
                debug!("IRR undefined: no sign change up to the widest bracket");
                return None;
            }
        }
    }

    let two = dec!(2);
    let mut iterations = 0;
    while iterations < MAX_BISECTION_ITERATIONS && high - low > RATE_TOLERANCE {
        iterations += 1;
        let mid = (low + high) / two;
        let npv_mid = scaled_npv(mid, cash_flows)?;
        trace!(iteration = iterations, %mid, %npv_mid, "bisection step");

        if npv_mid.is_zero() {
            low = mid;
            high = mid;
            break;
        }
        if opposite_signs(npv_low, npv_mid) {
            high = mid;
            npv_high = npv_mid;
        } else {
            low = mid;
            npv_low = npv_mid;
        }
    }

    let rate = (low + high) / two;
    debug!(%rate, iterations, residual = %npv_high, "IRR bisection finished");
    accept(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(0.01));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        assert_eq!(npv(dec!(0.0), &cfs).unwrap(), dec!(50));
    }

    #[test]
    fn test_npv_rejects_total_loss_rate() {
        assert!(npv(dec!(-1), &[dec!(-1), dec!(2)]).is_err());
    }

    #[test]
    fn test_irr_one_period() {
        let irr = solve_irr(&[dec!(-100), dec!(110)]).unwrap();
        assert!((irr - dec!(0.10)).abs() < dec!(0.0000001), "got {irr}");
    }

    #[test]
    fn test_irr_negative_rate() {
        // Lose half in one year
        let irr = solve_irr(&[dec!(-100), dec!(50)]).unwrap();
        assert!((irr - dec!(-0.5)).abs() < dec!(0.0000001), "got {irr}");
    }

    #[test]
    fn test_irr_no_sign_change() {
        assert_eq!(solve_irr(&[dec!(100), dec!(200), dec!(300)]), None);
        assert_eq!(solve_irr(&[dec!(-100), dec!(-200)]), None);
        assert_eq!(solve_irr(&[dec!(0), dec!(0)]), None);
    }

    #[test]
    fn test_irr_too_few_flows() {
        assert_eq!(solve_irr(&[]), None);
        assert_eq!(solve_irr(&[dec!(-100)]), None);
    }

    #[test]
    fn test_irr_above_band_is_undefined() {
        // Tenfold in one year is a 900% IRR: found by widening, then rejected
        assert_eq!(solve_irr(&[dec!(-100), dec!(1000)]), None);
    }

    #[test]
    fn test_irr_near_band_edge() {
        // 400% in one year stays inside the default bracket
        let irr = solve_irr(&[dec!(-100), dec!(500)]).unwrap();
        assert!((irr - dec!(4)).abs() < dec!(0.0000001));
    }
}
