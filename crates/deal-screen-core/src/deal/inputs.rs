use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::DealScreenError;
use crate::types::{Money, Multiple, Rate};
use crate::DealScreenResult;

const MAX_HOLD_YEARS: u32 = 100;
const MAX_AMORTIZATION_YEARS: u32 = 50;

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// What the acquisition lender's LTV is applied to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionLoanBasis {
    /// Purchase price only; rehab is funded with cash at close
    PurchasePrice,
    /// Purchase price plus total rehab ("total project cost" financing)
    #[default]
    PurchasePlusRehab,
}

/// How the acquisition (bridge) loan is serviced before the refinance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionRepayment {
    #[default]
    InterestOnly,
    /// Amortised over the refinance amortisation term
    Amortizing,
}

/// Equity figure that anchors period 0 of the hold cash flows and every
/// return ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquityAnchor {
    /// Cash still trapped in the deal after the refinance cash-out
    #[default]
    CashLeftInDeal,
    /// Total cash needed at close, before any cash-out
    TotalCashInvested,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Deal inputs
// ---------------------------------------------------------------------------

/// Every assumption a screening run needs. Rents and other income are per unit
/// per month; everything else is annual. Rates are decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealInputs {
    /// Contract purchase price
    pub purchase_price: Money,
    /// Number of residential units
    pub units: u32,
    /// In-place rent per unit per month
    pub in_place_rent_per_unit: Money,
    /// Stabilised rent per unit per month after the value-add plan
    pub after_rent_per_unit: Money,
    /// Other income (laundry, parking, fees) per unit per month
    #[serde(default)]
    pub other_income_per_unit: Money,
    /// Vacancy and collection loss, in-place
    pub vacancy_rate: Rate,
    /// Vacancy after stabilisation; the in-place rate when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vacancy_rate_after: Option<Rate>,
    /// Operating expenses as a share of EGI, in-place
    pub expense_ratio_before: Rate,
    /// Operating expenses as a share of EGI, after stabilisation
    pub expense_ratio_after: Rate,
    /// NOI uplift beyond rent (RUBS, fees, ops improvements), applied to after-NOI
    #[serde(default)]
    pub extra_noi_lift: Rate,
    pub rehab_per_unit: Money,
    /// Exterior / common-area rehab budget
    #[serde(default)]
    pub exterior_rehab: Money,
    /// Contingency multiplier on the rehab budget (0.10 = +10%)
    #[serde(default)]
    pub rehab_contingency: Rate,
    /// Closing costs as a share of purchase price
    pub closing_cost_pct: Rate,
    /// Lender fees as a share of the acquisition loan
    pub lender_fee_pct: Rate,
    #[serde(default)]
    pub initial_reserves: Money,
    pub acquisition_ltv: Rate,
    #[serde(default)]
    pub acquisition_loan_basis: AcquisitionLoanBasis,
    /// Acquisition loan rate; carry is not computed when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquisition_rate: Option<Rate>,
    #[serde(default)]
    pub acquisition_repayment: AcquisitionRepayment,
    pub refinance_ltv: Rate,
    pub refinance_rate: Rate,
    /// Refinance amortisation term in years
    pub amortization_years: u32,
    /// Cap rate used to value the property for the refinance
    pub refinance_cap_rate: Rate,
    /// Exit cap rate at sale
    pub sale_cap_rate: Rate,
    /// Selling costs as a share of sale price
    pub sale_cost_pct: Rate,
    /// Minimum NOI lift the plan must achieve (0.20 = +20%)
    pub noi_lift_target: Rate,
    /// Minimum stabilised DSCR on the refinance loan
    pub min_dscr: Multiple,
    pub hold_years: u32,
    /// Annual NOI growth after stabilisation (may be negative)
    pub noi_growth_rate: Rate,
    #[serde(default)]
    pub equity_anchor: EquityAnchor,
    /// Build the hold-period cash flows and return metrics
    #[serde(default = "default_true")]
    pub analyze_hold: bool,
}

impl Default for DealInputs {
    /// Standard screening assumptions for a 14-unit value-add deal.
    fn default() -> Self {
        DealInputs {
            purchase_price: dec!(2000000),
            units: 14,
            in_place_rent_per_unit: dec!(1050),
            after_rent_per_unit: dec!(1200),
            other_income_per_unit: Decimal::ZERO,
            vacancy_rate: dec!(0.07),
            vacancy_rate_after: None,
            expense_ratio_before: dec!(0.45),
            expense_ratio_after: dec!(0.42),
            extra_noi_lift: Decimal::ZERO,
            rehab_per_unit: dec!(7000),
            exterior_rehab: dec!(20000),
            rehab_contingency: Decimal::ZERO,
            closing_cost_pct: dec!(0.02),
            lender_fee_pct: dec!(0.01),
            initial_reserves: dec!(25000),
            acquisition_ltv: dec!(0.80),
            acquisition_loan_basis: AcquisitionLoanBasis::PurchasePlusRehab,
            acquisition_rate: Some(dec!(0.095)),
            acquisition_repayment: AcquisitionRepayment::InterestOnly,
            refinance_ltv: dec!(0.75),
            refinance_rate: dec!(0.0725),
            amortization_years: 30,
            refinance_cap_rate: dec!(0.065),
            sale_cap_rate: dec!(0.0675),
            sale_cost_pct: dec!(0.03),
            noi_lift_target: dec!(0.20),
            min_dscr: dec!(1.25),
            hold_years: 5,
            noi_growth_rate: dec!(0.03),
            equity_anchor: EquityAnchor::CashLeftInDeal,
            analyze_hold: true,
        }
    }
}

impl DealInputs {
    /// Vacancy applied to the stabilised income state.
    pub fn effective_vacancy_after(&self) -> Rate {
        self.vacancy_rate_after.unwrap_or(self.vacancy_rate)
    }

    /// Reject out-of-range assumptions and flag unusual-but-legal ones.
    ///
    /// This is the input boundary: the formula functions downstream assume a
    /// validated record and only apply their own degenerate-case fallbacks.
    pub fn validate(&self, warnings: &mut Vec<String>) -> DealScreenResult<()> {
        if self.units == 0 {
            return Err(DealScreenError::invalid("units", "Unit count must be at least 1"));
        }
        if self.hold_years == 0 || self.hold_years > MAX_HOLD_YEARS {
            return Err(DealScreenError::invalid(
                "hold_years",
                format!("Hold period must be between 1 and {MAX_HOLD_YEARS} years"),
            ));
        }
        if self.amortization_years == 0 || self.amortization_years > MAX_AMORTIZATION_YEARS {
            return Err(DealScreenError::invalid(
                "amortization_years",
                format!("Amortization term must be between 1 and {MAX_AMORTIZATION_YEARS} years"),
            ));
        }

        for (field, value) in [
            ("purchase_price", self.purchase_price),
            ("in_place_rent_per_unit", self.in_place_rent_per_unit),
            ("after_rent_per_unit", self.after_rent_per_unit),
            ("other_income_per_unit", self.other_income_per_unit),
            ("extra_noi_lift", self.extra_noi_lift),
            ("rehab_per_unit", self.rehab_per_unit),
            ("exterior_rehab", self.exterior_rehab),
            ("rehab_contingency", self.rehab_contingency),
            ("initial_reserves", self.initial_reserves),
            ("refinance_rate", self.refinance_rate),
            ("refinance_cap_rate", self.refinance_cap_rate),
            ("sale_cap_rate", self.sale_cap_rate),
            ("noi_lift_target", self.noi_lift_target),
            ("min_dscr", self.min_dscr),
        ] {
            require_non_negative(field, value)?;
        }
        if let Some(rate) = self.acquisition_rate {
            require_non_negative("acquisition_rate", rate)?;
        }

        for (field, value) in [
            ("vacancy_rate", self.vacancy_rate),
            ("expense_ratio_before", self.expense_ratio_before),
            ("expense_ratio_after", self.expense_ratio_after),
            ("closing_cost_pct", self.closing_cost_pct),
            ("lender_fee_pct", self.lender_fee_pct),
            ("acquisition_ltv", self.acquisition_ltv),
            ("refinance_ltv", self.refinance_ltv),
            ("sale_cost_pct", self.sale_cost_pct),
        ] {
            require_unit_interval(field, value)?;
        }
        if let Some(vacancy) = self.vacancy_rate_after {
            require_unit_interval("vacancy_rate_after", vacancy)?;
        }

        if self.noi_growth_rate <= dec!(-1) {
            return Err(DealScreenError::invalid(
                "noi_growth_rate",
                "NOI growth must be greater than -100%",
            ));
        }

        // --- Warnings for unusual metrics ---
        for (label, cap) in [
            ("Refinance cap rate", self.refinance_cap_rate),
            ("Sale cap rate", self.sale_cap_rate),
        ] {
            if cap.is_zero() {
                warnings.push(format!("{label} is zero — valuations at this cap are undefined"));
            } else if cap < dec!(0.03) {
                warnings.push(format!(
                    "{label} {cap} is below 3% — unusually low, verify market data"
                ));
            } else if cap > dec!(0.12) {
                warnings.push(format!(
                    "{label} {cap} exceeds 12% — unusually high, may indicate elevated risk"
                ));
            }
        }

        if self.sale_cap_rate > Decimal::ZERO && self.sale_cap_rate < self.refinance_cap_rate {
            warnings.push(format!(
                "Sale cap {} is below refinance cap {} — exit assumes cap-rate compression",
                self.sale_cap_rate, self.refinance_cap_rate
            ));
        }

        let worst_vacancy = self.vacancy_rate.max(self.effective_vacancy_after());
        if worst_vacancy > dec!(0.15) {
            warnings.push(format!(
                "Vacancy rate {:.1}% exceeds 15% — above typical market norms",
                worst_vacancy * dec!(100)
            ));
        }

        if self.acquisition_ltv > dec!(0.80) {
            warnings.push(format!(
                "Acquisition LTV of {:.1}% exceeds 80% — high leverage",
                self.acquisition_ltv * dec!(100)
            ));
        }
        if self.refinance_ltv > dec!(0.80) {
            warnings.push(format!(
                "Refinance LTV of {:.1}% exceeds 80% — above typical agency limits",
                self.refinance_ltv * dec!(100)
            ));
        }

        if self.after_rent_per_unit < self.in_place_rent_per_unit {
            warnings.push("After-stabilisation rent is below in-place rent".into());
        }

        Ok(())
    }
}

fn require_non_negative(field: &str, value: Decimal) -> DealScreenResult<()> {
    if value < Decimal::ZERO {
        return Err(DealScreenError::invalid(field, "Must not be negative"));
    }
    Ok(())
}

fn require_unit_interval(field: &str, value: Rate) -> DealScreenResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(DealScreenError::invalid(field, "Must be between 0 and 1"));
    }
    Ok(())
}
