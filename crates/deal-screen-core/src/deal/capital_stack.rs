use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::amortization::{annual_debt_service, monthly_payment};
use crate::deal::inputs::{AcquisitionLoanBasis, AcquisitionRepayment, DealInputs};
use crate::deal::pro_forma::ProFormaResult;
use crate::types::{ratio, Money, Multiple, MONTHS_PER_YEAR};
use crate::DealScreenResult;

/// Acquisition financing, cash to close, and the refinance out of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalStackResult {
    /// (units × rehab per unit + exterior) × (1 + contingency)
    pub total_rehab: Money,
    /// Amount the acquisition LTV is applied to
    pub loan_basis: Money,
    pub acquisition_loan: Money,
    /// Loan basis not covered by the acquisition loan
    pub down_payment: Money,
    pub closing_costs: Money,
    pub lender_fees: Money,
    /// Closing costs plus lender fees
    pub total_transaction_costs: Money,
    pub initial_reserves: Money,
    /// Rehab funded from equity because it sits outside the loan basis
    pub rehab_funded_with_cash: Money,
    /// Investor cash in at close
    pub cash_needed_at_close: Money,
    /// Annual carry on the acquisition loan (when a rate is given)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition_annual_debt_service: Option<Money>,
    /// In-place NOI over acquisition debt service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_place_dscr: Option<Multiple>,
    /// Value after × refinance LTV
    pub refinance_loan: Money,
    pub refinance_monthly_payment: Money,
    pub refinance_annual_debt_service: Money,
    /// NOI after / refinance annual debt service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dscr: Option<Multiple>,
    /// Refinance proceeds above the acquisition payoff
    pub cash_out: Money,
    /// Cash needed at close not returned by the cash-out
    pub cash_left_in_deal: Money,
    /// Cash-out / cash needed at close (0 when nothing was needed)
    pub cash_out_multiple: Multiple,
    /// Stabilised NOI after refinance debt service
    pub annual_cash_flow_after_debt: Money,
    pub monthly_cash_flow_after_debt: Money,
}

impl CapitalStackResult {
    /// DSCR is defined and at least the minimum.
    pub fn dscr_target_met(&self, min_dscr: Multiple) -> bool {
        self.dscr.is_some_and(|dscr| dscr >= min_dscr)
    }
}

/// Size the acquisition loan and equity at close, then refinance off the
/// after-stabilisation value. Forced appreciation is what creates the
/// refinanceable equity: the new loan is sized on `value_after`, not on cost.
pub fn compute_capital_stack(
    input: &DealInputs,
    pro_forma: &ProFormaResult,
) -> DealScreenResult<CapitalStackResult> {
    let units = Decimal::from(input.units);
    let total_rehab = (units * input.rehab_per_unit + input.exterior_rehab)
        * (Decimal::ONE + input.rehab_contingency);

    let (loan_basis, rehab_funded_with_cash) = match input.acquisition_loan_basis {
        AcquisitionLoanBasis::PurchasePrice => (input.purchase_price, total_rehab),
        AcquisitionLoanBasis::PurchasePlusRehab => (input.purchase_price + total_rehab, Decimal::ZERO),
    };
    let acquisition_loan = loan_basis * input.acquisition_ltv;
    let down_payment = (loan_basis - acquisition_loan).max(Decimal::ZERO);

    let closing_costs = input.purchase_price * input.closing_cost_pct;
    let lender_fees = acquisition_loan * input.lender_fee_pct;
    let total_transaction_costs = closing_costs + lender_fees;
    let cash_needed_at_close =
        down_payment + total_transaction_costs + input.initial_reserves + rehab_funded_with_cash;

    let acquisition_annual_debt_service = match input.acquisition_rate {
        Some(rate) => Some(match input.acquisition_repayment {
            AcquisitionRepayment::InterestOnly => acquisition_loan * rate,
            AcquisitionRepayment::Amortizing => {
                annual_debt_service(acquisition_loan, rate, input.amortization_years)?
            }
        }),
        None => None,
    };
    let in_place_dscr = acquisition_annual_debt_service
        .and_then(|debt_service| ratio(pro_forma.noi_before, debt_service));

    // No valuation (zero cap rate) means nothing to refinance against.
    let refinance_loan = pro_forma.value_after.unwrap_or(Decimal::ZERO) * input.refinance_ltv;
    let refinance_monthly_payment =
        monthly_payment(refinance_loan, input.refinance_rate, input.amortization_years)?;
    let refinance_annual_debt_service = refinance_monthly_payment * Decimal::from(MONTHS_PER_YEAR);
    let dscr = ratio(pro_forma.noi_after, refinance_annual_debt_service);

    let cash_out = (refinance_loan - acquisition_loan).max(Decimal::ZERO);
    let cash_left_in_deal = (cash_needed_at_close - cash_out).max(Decimal::ZERO);
    let cash_out_multiple = ratio(cash_out, cash_needed_at_close).unwrap_or(Decimal::ZERO);

    let annual_cash_flow_after_debt = pro_forma.noi_after - refinance_annual_debt_service;

    Ok(CapitalStackResult {
        total_rehab,
        loan_basis,
        acquisition_loan,
        down_payment,
        closing_costs,
        lender_fees,
        total_transaction_costs,
        initial_reserves: input.initial_reserves,
        rehab_funded_with_cash,
        cash_needed_at_close,
        acquisition_annual_debt_service,
        in_place_dscr,
        refinance_loan,
        refinance_monthly_payment,
        refinance_annual_debt_service,
        dscr,
        cash_out,
        cash_left_in_deal,
        cash_out_multiple,
        annual_cash_flow_after_debt,
        monthly_cash_flow_after_debt: annual_cash_flow_after_debt / Decimal::from(MONTHS_PER_YEAR),
    })
}
