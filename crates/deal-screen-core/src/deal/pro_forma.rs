use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::deal::inputs::DealInputs;
use crate::types::{ratio, Money, Rate, MONTHS_PER_YEAR};

/// Annual income statement for one state of the property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeState {
    /// Rent per unit per month
    pub rent_per_unit: Money,
    /// Units × rent × 12
    pub gross_potential_rent: Money,
    pub other_income: Money,
    pub vacancy_rate: Rate,
    /// (GPR + other income) × (1 − vacancy)
    pub effective_gross_income: Money,
    pub expense_ratio: Rate,
    pub operating_expenses: Money,
    /// EGI × (1 − expense ratio)
    pub noi: Money,
}

/// What it takes to hit the NOI-lift target through rent alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiTargetDiagnostic {
    pub noi_lift_target: Rate,
    /// In-place NOI × (1 + target)
    pub required_noi: Money,
    /// Shortfall of after-NOI against the required NOI, zero when met
    pub noi_gap: Money,
    /// After-stabilisation rent per unit per month that closes the gap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_rent_per_unit: Option<Money>,
    /// Required rent less in-place rent, floored at zero
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent_lift_needed_per_unit: Option<Money>,
}

/// Income before and after the value-add plan, and the value it creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProFormaResult {
    pub in_place: IncomeState,
    pub after: IncomeState,
    /// Planned rent raise per unit per month
    pub rent_raise_per_unit: Money,
    /// After-NOI before the extra lift beyond rent
    pub noi_after_base: Money,
    pub extra_noi_lift: Rate,
    /// After-NOI including the extra lift
    pub noi_after: Money,
    pub noi_before: Money,
    pub noi_increase: Money,
    /// (NOI after − NOI before) / NOI before
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noi_lift: Option<Rate>,
    pub refinance_cap_rate: Rate,
    /// In-place NOI capitalised at the refinance cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_before: Option<Money>,
    /// After-NOI capitalised at the refinance cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_after: Option<Money>,
    /// Forced appreciation, floored at zero
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_created: Option<Money>,
    pub target: NoiTargetDiagnostic,
}

impl ProFormaResult {
    /// NOI lift is defined and at least the target.
    pub fn noi_target_met(&self) -> bool {
        self.noi_lift
            .is_some_and(|lift| lift >= self.target.noi_lift_target)
    }
}

fn income_state(
    units: Decimal,
    rent_per_unit: Money,
    other_income: Money,
    vacancy_rate: Rate,
    expense_ratio: Rate,
) -> IncomeState {
    let gross_potential_rent = units * rent_per_unit * Decimal::from(MONTHS_PER_YEAR);
    let effective_gross_income = (gross_potential_rent + other_income) * (Decimal::ONE - vacancy_rate);
    let operating_expenses = effective_gross_income * expense_ratio;
    IncomeState {
        rent_per_unit,
        gross_potential_rent,
        other_income,
        vacancy_rate,
        effective_gross_income,
        expense_ratio,
        operating_expenses,
        noi: effective_gross_income - operating_expenses,
    }
}

/// Build the in-place and stabilised income statements, the NOI lift, the
/// cap-rate valuations and the NOI-target diagnostic.
pub fn compute_pro_forma(input: &DealInputs) -> ProFormaResult {
    let units = Decimal::from(input.units);
    let other_income = units * input.other_income_per_unit * Decimal::from(MONTHS_PER_YEAR);

    let in_place = income_state(
        units,
        input.in_place_rent_per_unit,
        other_income,
        input.vacancy_rate,
        input.expense_ratio_before,
    );
    let after = income_state(
        units,
        input.after_rent_per_unit,
        other_income,
        input.effective_vacancy_after(),
        input.expense_ratio_after,
    );

    let lift_factor = Decimal::ONE + input.extra_noi_lift;
    let noi_before = in_place.noi;
    let noi_after_base = after.noi;
    let noi_after = noi_after_base * lift_factor;
    let noi_increase = noi_after - noi_before;
    let noi_lift = ratio(noi_increase, noi_before);

    let cap = input.refinance_cap_rate;
    let value_before = ratio(noi_before, cap);
    let value_after = ratio(noi_after, cap);
    let value_created = value_before
        .zip(value_after)
        .map(|(before, after)| (after - before).max(Decimal::ZERO));

    let target = target_diagnostic(input, noi_before, noi_after, other_income, lift_factor);

    ProFormaResult {
        rent_raise_per_unit: input.after_rent_per_unit - input.in_place_rent_per_unit,
        in_place,
        after,
        noi_after_base,
        extra_noi_lift: input.extra_noi_lift,
        noi_after,
        noi_before,
        noi_increase,
        noi_lift,
        refinance_cap_rate: cap,
        value_before,
        value_after,
        value_created,
        target,
    }
}

/// Invert NOI → EGI → GPR → rent for the required NOI, holding the
/// stabilised vacancy, expense ratio, other income and extra lift fixed.
fn target_diagnostic(
    input: &DealInputs,
    noi_before: Money,
    noi_after: Money,
    other_income: Money,
    lift_factor: Decimal,
) -> NoiTargetDiagnostic {
    let required_noi = noi_before * (Decimal::ONE + input.noi_lift_target);
    let noi_gap = (required_noi - noi_after).max(Decimal::ZERO);

    // A lift target on a non-positive baseline has no rent that satisfies it.
    let required_rent_per_unit = if noi_before > Decimal::ZERO {
        let required_noi_base = ratio(required_noi, lift_factor);
        let required_egi = required_noi_base
            .and_then(|noi| ratio(noi, Decimal::ONE - input.expense_ratio_after));
        let required_gpr = required_egi
            .and_then(|egi| ratio(egi, Decimal::ONE - input.effective_vacancy_after()))
            .map(|gross| gross - other_income);
        required_gpr.and_then(|gpr| {
            ratio(gpr, Decimal::from(MONTHS_PER_YEAR) * Decimal::from(input.units))
        })
    } else {
        None
    };

    let rent_lift_needed_per_unit = required_rent_per_unit
        .map(|rent| (rent - input.in_place_rent_per_unit).max(Decimal::ZERO));

    NoiTargetDiagnostic {
        noi_lift_target: input.noi_lift_target,
        required_noi,
        noi_gap,
        required_rent_per_unit,
        rent_lift_needed_per_unit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn scenario_a() -> DealInputs {
        DealInputs::default()
    }

    #[test]
    fn test_noi_before_and_after() {
        let pf = compute_pro_forma(&scenario_a());
        // 14 × 1050 × 12 = 176,400 GPR; × 0.93 × 0.55
        assert_eq!(pf.in_place.gross_potential_rent, dec!(176400));
        assert_eq!(pf.noi_before, dec!(90228.60));
        // 14 × 1200 × 12 = 201,600 GPR; × 0.93 × 0.58
        assert_eq!(pf.after.gross_potential_rent, dec!(201600));
        assert_eq!(pf.noi_after, dec!(108743.04));
    }

    #[test]
    fn test_noi_lift_ratio() {
        let pf = compute_pro_forma(&scenario_a());
        let lift = pf.noi_lift.unwrap();
        assert!((lift - dec!(0.2052)).abs() < dec!(0.0001), "got {lift}");
        assert!(pf.noi_target_met());
    }

    #[test]
    fn test_noi_lift_undefined_on_zero_baseline() {
        let input = DealInputs {
            in_place_rent_per_unit: dec!(0),
            ..scenario_a()
        };
        let pf = compute_pro_forma(&input);
        assert_eq!(pf.noi_before, Decimal::ZERO);
        assert_eq!(pf.noi_lift, None);
        assert!(!pf.noi_target_met());
        assert_eq!(pf.target.required_rent_per_unit, None);
    }

    #[test]
    fn test_valuation_undefined_without_cap_rate() {
        let input = DealInputs {
            refinance_cap_rate: dec!(0),
            ..scenario_a()
        };
        let pf = compute_pro_forma(&input);
        assert_eq!(pf.value_before, None);
        assert_eq!(pf.value_after, None);
        assert_eq!(pf.value_created, None);
    }

    #[test]
    fn test_value_created_floored_at_zero() {
        let input = DealInputs {
            after_rent_per_unit: dec!(900),
            ..scenario_a()
        };
        let pf = compute_pro_forma(&input);
        assert!(pf.noi_increase < Decimal::ZERO);
        assert_eq!(pf.value_created, Some(Decimal::ZERO));
    }

    #[test]
    fn test_extra_lift_applied_to_after_noi() {
        let input = DealInputs {
            extra_noi_lift: dec!(0.10),
            ..scenario_a()
        };
        let pf = compute_pro_forma(&input);
        assert_eq!(pf.noi_after, pf.noi_after_base * dec!(1.10));
    }

    #[test]
    fn test_separate_after_vacancy() {
        let input = DealInputs {
            vacancy_rate_after: Some(dec!(0.05)),
            ..scenario_a()
        };
        let pf = compute_pro_forma(&input);
        assert_eq!(pf.in_place.vacancy_rate, dec!(0.07));
        assert_eq!(pf.after.vacancy_rate, dec!(0.05));
        // 201,600 × 0.95 × 0.58
        assert_eq!(pf.noi_after, dec!(111081.60));
    }

    #[test]
    fn test_required_rent_reproduces_target_noi() {
        let input = DealInputs {
            noi_lift_target: dec!(0.35),
            other_income_per_unit: dec!(25),
            extra_noi_lift: dec!(0.05),
            ..scenario_a()
        };
        let pf = compute_pro_forma(&input);
        let rent = pf.target.required_rent_per_unit.unwrap();

        // Re-run the plan at the back-solved rent and land on the required NOI
        let solved = compute_pro_forma(&DealInputs {
            after_rent_per_unit: rent,
            ..input
        });
        assert!((solved.noi_after - pf.target.required_noi).abs() < dec!(0.000001));
        assert!(pf.target.noi_gap > Decimal::ZERO);
        assert_eq!(
            pf.target.rent_lift_needed_per_unit,
            Some(rent - dec!(1050))
        );
    }
}
