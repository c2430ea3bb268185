use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use deal_screen_core::deal::screen::{analyze_capital_stack, analyze_hold_returns, analyze_pro_forma};
use deal_screen_core::deal::{
    screen_deal, AcquisitionLoanBasis, AcquisitionRepayment, DealInputs, EquityAnchor,
};

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LoanBasisArg {
    /// Acquisition LTV on purchase price only; rehab paid in cash
    Purchase,
    /// Acquisition LTV on purchase price plus rehab
    PurchasePlusRehab,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AnchorArg {
    /// Returns measured on cash left in the deal after the refinance
    CashLeft,
    /// Returns measured on all cash needed at close
    TotalCash,
}

/// Deal assumptions shared by the screening commands.
///
/// Flags override the standard screening defaults; `--input` (JSON or YAML)
/// or piped JSON replaces the defaults wholesale.
#[derive(Args, Debug, Default)]
#[command(allow_hyphen_values = true)]
pub struct DealArgs {
    /// Path to JSON/YAML deal file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Purchase price
    #[arg(long)]
    pub price: Option<Decimal>,

    /// Number of units
    #[arg(long)]
    pub units: Option<u32>,

    /// In-place rent per unit per month
    #[arg(long)]
    pub rent: Option<Decimal>,

    /// Stabilised rent per unit per month after the value-add plan
    #[arg(long)]
    pub after_rent: Option<Decimal>,

    /// Other income per unit per month
    #[arg(long)]
    pub other_income: Option<Decimal>,

    /// Vacancy rate (e.g. 0.07)
    #[arg(long)]
    pub vacancy: Option<Decimal>,

    /// Stabilised vacancy rate, if different
    #[arg(long)]
    pub vacancy_after: Option<Decimal>,

    /// Expense ratio in-place (share of EGI)
    #[arg(long)]
    pub expense_before: Option<Decimal>,

    /// Expense ratio after stabilisation
    #[arg(long)]
    pub expense_after: Option<Decimal>,

    /// Extra NOI lift beyond rent (e.g. 0.05 for RUBS/fees)
    #[arg(long)]
    pub extra_noi_lift: Option<Decimal>,

    /// Interior rehab per unit
    #[arg(long)]
    pub rehab_per_unit: Option<Decimal>,

    /// Exterior / common-area rehab
    #[arg(long)]
    pub exterior_rehab: Option<Decimal>,

    /// Rehab contingency (e.g. 0.10 for +10%)
    #[arg(long)]
    pub contingency: Option<Decimal>,

    /// Closing costs as a share of price
    #[arg(long)]
    pub closing_cost: Option<Decimal>,

    /// Lender fees as a share of the acquisition loan
    #[arg(long)]
    pub lender_fee: Option<Decimal>,

    /// Initial reserves
    #[arg(long)]
    pub reserves: Option<Decimal>,

    /// Acquisition LTV
    #[arg(long)]
    pub acq_ltv: Option<Decimal>,

    /// What the acquisition LTV applies to
    #[arg(long, value_enum)]
    pub loan_basis: Option<LoanBasisArg>,

    /// Acquisition loan rate
    #[arg(long)]
    pub acq_rate: Option<Decimal>,

    /// Amortise the acquisition loan instead of interest-only
    #[arg(long)]
    pub acq_amortizing: bool,

    /// Refinance LTV
    #[arg(long)]
    pub refi_ltv: Option<Decimal>,

    /// Refinance interest rate
    #[arg(long)]
    pub refi_rate: Option<Decimal>,

    /// Refinance amortisation term in years
    #[arg(long)]
    pub amort_years: Option<u32>,

    /// Cap rate for the refinance valuation
    #[arg(long)]
    pub refi_cap: Option<Decimal>,

    /// Exit cap rate
    #[arg(long)]
    pub sale_cap: Option<Decimal>,

    /// Selling costs as a share of sale price
    #[arg(long)]
    pub sale_cost: Option<Decimal>,

    /// Minimum NOI lift (e.g. 0.20)
    #[arg(long)]
    pub noi_target: Option<Decimal>,

    /// Minimum stabilised DSCR
    #[arg(long)]
    pub min_dscr: Option<Decimal>,

    /// Hold period in years
    #[arg(long)]
    pub hold_years: Option<u32>,

    /// Annual NOI growth after stabilisation
    #[arg(long)]
    pub growth: Option<Decimal>,

    /// Equity base for hold returns
    #[arg(long, value_enum)]
    pub anchor: Option<AnchorArg>,

    /// Skip the hold-period analysis
    #[arg(long)]
    pub no_hold: bool,
}

impl DealArgs {
    /// Layer the given flags over the standard screening assumptions.
    fn apply_to(&self, mut deal: DealInputs) -> DealInputs {
        fn set<T: Copy>(target: &mut T, flag: Option<T>) {
            if let Some(value) = flag {
                *target = value;
            }
        }

        set(&mut deal.purchase_price, self.price);
        set(&mut deal.units, self.units);
        set(&mut deal.in_place_rent_per_unit, self.rent);
        set(&mut deal.after_rent_per_unit, self.after_rent);
        set(&mut deal.other_income_per_unit, self.other_income);
        set(&mut deal.vacancy_rate, self.vacancy);
        if self.vacancy_after.is_some() {
            deal.vacancy_rate_after = self.vacancy_after;
        }
        set(&mut deal.expense_ratio_before, self.expense_before);
        set(&mut deal.expense_ratio_after, self.expense_after);
        set(&mut deal.extra_noi_lift, self.extra_noi_lift);
        set(&mut deal.rehab_per_unit, self.rehab_per_unit);
        set(&mut deal.exterior_rehab, self.exterior_rehab);
        set(&mut deal.rehab_contingency, self.contingency);
        set(&mut deal.closing_cost_pct, self.closing_cost);
        set(&mut deal.lender_fee_pct, self.lender_fee);
        set(&mut deal.initial_reserves, self.reserves);
        set(&mut deal.acquisition_ltv, self.acq_ltv);
        if let Some(basis) = self.loan_basis {
            deal.acquisition_loan_basis = match basis {
                LoanBasisArg::Purchase => AcquisitionLoanBasis::PurchasePrice,
                LoanBasisArg::PurchasePlusRehab => AcquisitionLoanBasis::PurchasePlusRehab,
            };
        }
        if self.acq_rate.is_some() {
            deal.acquisition_rate = self.acq_rate;
        }
        if self.acq_amortizing {
            deal.acquisition_repayment = AcquisitionRepayment::Amortizing;
        }
        set(&mut deal.refinance_ltv, self.refi_ltv);
        set(&mut deal.refinance_rate, self.refi_rate);
        set(&mut deal.amortization_years, self.amort_years);
        set(&mut deal.refinance_cap_rate, self.refi_cap);
        set(&mut deal.sale_cap_rate, self.sale_cap);
        set(&mut deal.sale_cost_pct, self.sale_cost);
        set(&mut deal.noi_lift_target, self.noi_target);
        set(&mut deal.min_dscr, self.min_dscr);
        set(&mut deal.hold_years, self.hold_years);
        set(&mut deal.noi_growth_rate, self.growth);
        if let Some(anchor) = self.anchor {
            deal.equity_anchor = match anchor {
                AnchorArg::CashLeft => EquityAnchor::CashLeftInDeal,
                AnchorArg::TotalCash => EquityAnchor::TotalCashInvested,
            };
        }
        if self.no_hold {
            deal.analyze_hold = false;
        }
        deal
    }

    /// Deal inputs from `--input`, else piped stdin, else flags over the defaults.
    pub fn resolve(&self) -> Result<DealInputs, Box<dyn std::error::Error>> {
        if let Some(ref path) = self.input {
            return input::file::read_input(path);
        }
        if let Some(deal) = input::stdin::read_stdin()? {
            return Ok(deal);
        }
        Ok(self.apply_to(DealInputs::default()))
    }
}

pub fn run_screen(args: DealArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let deal = args.resolve()?;
    let result = screen_deal(&deal)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_pro_forma(args: DealArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let deal = args.resolve()?;
    let result = analyze_pro_forma(&deal)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_capital_stack(args: DealArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let deal = args.resolve()?;
    let result = analyze_capital_stack(&deal)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_hold_returns(args: DealArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let deal = args.resolve()?;
    let result = analyze_hold_returns(&deal)?;
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_flags_layer_over_defaults() {
        let args = DealArgs {
            price: Some(dec!(1500000)),
            refi_rate: Some(dec!(0.11)),
            vacancy_after: Some(dec!(0.05)),
            anchor: Some(AnchorArg::TotalCash),
            no_hold: true,
            ..DealArgs::default()
        };
        let deal = args.apply_to(DealInputs::default());
        assert_eq!(deal.purchase_price, dec!(1500000));
        assert_eq!(deal.refinance_rate, dec!(0.11));
        assert_eq!(deal.vacancy_rate_after, Some(dec!(0.05)));
        assert_eq!(deal.equity_anchor, EquityAnchor::TotalCashInvested);
        assert!(!deal.analyze_hold);
        // Untouched fields keep the defaults
        assert_eq!(deal.units, 14);
        assert_eq!(deal.acquisition_rate, Some(dec!(0.095)));
    }

    #[test]
    fn test_no_flags_is_default_deal() {
        let deal = DealArgs::default().apply_to(DealInputs::default());
        assert_eq!(deal, DealInputs::default());
    }
}
