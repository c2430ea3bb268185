use deal_screen_core::deal::capital_stack::compute_capital_stack;
use deal_screen_core::deal::hold_returns::compute_hold_returns;
use deal_screen_core::deal::pro_forma::compute_pro_forma;
use deal_screen_core::deal::{screen_deal, AcquisitionLoanBasis, DealInputs, EquityAnchor};
use deal_screen_core::time_value::npv;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// $2M, 14 units, $1,050 → $1,200 rent, 7% vacancy, 45% → 42% expenses,
/// 6.5% refi cap, 75% refi LTV, 80% acquisition LTV.
fn scenario_a() -> DealInputs {
    DealInputs::default()
}

/// Scenario A refinanced at 11% and 85% LTV.
fn scenario_b() -> DealInputs {
    DealInputs {
        refinance_rate: dec!(0.11),
        refinance_ltv: dec!(0.85),
        ..scenario_a()
    }
}

// ===========================================================================
// Scenario A
// ===========================================================================

#[test]
fn test_scenario_a_noi() {
    let out = screen_deal(&scenario_a()).unwrap().result;
    let pf = &out.pro_forma;
    // 176,400 × 0.93 × 0.55 and 201,600 × 0.93 × 0.58
    assert_eq!(pf.noi_before, dec!(90228.60));
    assert_eq!(pf.noi_after, dec!(108743.04));
    assert_eq!(pf.noi_increase, dec!(18514.44));
    let lift = pf.noi_lift.unwrap();
    assert!((lift - dec!(0.2052)).abs() < dec!(0.0001), "lift {lift}");
}

#[test]
fn test_scenario_a_valuation_and_refinance() {
    let out = screen_deal(&scenario_a()).unwrap().result;
    let value_after = out.pro_forma.value_after.unwrap();
    assert!(
        (value_after - dec!(1672969.85)).abs() < dec!(0.01),
        "value after {value_after}"
    );
    let loan = out.capital_stack.refinance_loan;
    assert!((loan - dec!(1254727.38)).abs() < dec!(0.01), "refi loan {loan}");
    let created = out.pro_forma.value_created.unwrap();
    assert!((created - dec!(284837.54)).abs() < dec!(0.01), "value created {created}");
}

#[test]
fn test_scenario_a_verdict() {
    let out = screen_deal(&scenario_a()).unwrap().result;
    assert!(out.verdict.noi_target_met);
    // 7.25% / 30yr debt on a 75% loan leaves ~1.06x coverage
    let dscr = out.verdict.dscr.unwrap();
    assert!(dscr > dec!(1.0) && dscr < dec!(1.25), "dscr {dscr}");
    assert!(!out.verdict.dscr_target_met);
    assert!(!out.verdict.passes);
}

// ===========================================================================
// Scenario B
// ===========================================================================

#[test]
fn test_scenario_b_fails_dscr_but_meets_noi_target() {
    let result = screen_deal(&scenario_b()).unwrap();
    let verdict = &result.result.verdict;
    assert!(verdict.dscr.unwrap() < dec!(1.25));
    assert!(!verdict.dscr_target_met);
    assert!(verdict.noi_target_met);
    assert!(result.warnings.iter().any(|w| w.contains("Refinance LTV")));
}

#[test]
fn test_scenario_b_larger_loan_than_a() {
    let a = screen_deal(&scenario_a()).unwrap().result;
    let b = screen_deal(&scenario_b()).unwrap().result;
    assert!(b.capital_stack.refinance_loan > a.capital_stack.refinance_loan);
    assert!(
        b.capital_stack.refinance_annual_debt_service
            > a.capital_stack.refinance_annual_debt_service
    );
}

// ===========================================================================
// Pipeline properties
// ===========================================================================

#[test]
fn test_screen_is_idempotent() {
    let first = screen_deal(&scenario_a()).unwrap();
    let second = screen_deal(&scenario_a()).unwrap();
    assert_eq!(first.result, second.result);
    assert_eq!(first.warnings, second.warnings);
}

#[test]
fn test_stages_compose_to_screen() {
    let input = scenario_a();
    let pf = compute_pro_forma(&input);
    let cs = compute_capital_stack(&input, &pf).unwrap();
    let hr = compute_hold_returns(&input, &pf, &cs).unwrap();
    let out = screen_deal(&input).unwrap().result;
    assert_eq!(out.pro_forma, pf);
    assert_eq!(out.capital_stack, cs);
    assert_eq!(out.hold_returns, Some(hr));
}

#[test]
fn test_hold_irr_zeroes_npv() {
    let out = screen_deal(&scenario_a()).unwrap().result;
    let hold = out.hold_returns.unwrap();
    let irr = hold.irr.unwrap();
    let residual = npv(irr, &hold.cash_flows).unwrap();
    assert!(residual.abs() < dec!(0.000001), "NPV at IRR = {residual}");
}

#[test]
fn test_hold_series_layout() {
    let out = screen_deal(&scenario_a()).unwrap().result;
    let cs = &out.capital_stack;
    let hold = out.hold_returns.unwrap();
    assert_eq!(hold.cash_flows.len(), 6);
    assert_eq!(hold.cash_flows[0], -cs.cash_left_in_deal);
    let last = hold.periods.last().unwrap();
    assert_eq!(
        last.net_cash_flow,
        last.operating_cash_flow + hold.sale.net_sale_proceeds
    );
    for window in hold.periods[1..].windows(2) {
        assert!(window[1].noi > window[0].noi);
        assert_eq!(window[1].debt_service, window[0].debt_service);
    }
}

#[test]
fn test_cash_left_in_deal_never_negative() {
    for price in [dec!(800000), dec!(1200000), dec!(2000000), dec!(3000000)] {
        let input = DealInputs {
            purchase_price: price,
            ..scenario_a()
        };
        let out = screen_deal(&input).unwrap().result;
        assert!(out.capital_stack.cash_left_in_deal >= Decimal::ZERO);
        assert!(out.capital_stack.cash_out >= Decimal::ZERO);
    }
}

#[test]
fn test_full_cash_out_leaves_returns_undefined() {
    let input = DealInputs {
        purchase_price: dec!(900000),
        acquisition_ltv: dec!(0.70),
        acquisition_loan_basis: AcquisitionLoanBasis::PurchasePlusRehab,
        ..scenario_a()
    };
    let result = screen_deal(&input).unwrap();
    let hold = result.result.hold_returns.unwrap();
    assert_eq!(hold.equity_base, Decimal::ZERO);
    assert_eq!(hold.irr, None);
    assert_eq!(hold.equity_multiple, None);
    assert_eq!(hold.cash_on_cash_year1, None);
}

#[test]
fn test_total_cash_anchor_lowers_multiple() {
    // Partial cash-out: the same distributions measured against a larger base
    let trapped = screen_deal(&DealInputs {
        purchase_price: dec!(1400000),
        ..scenario_a()
    })
    .unwrap()
    .result;
    let total = screen_deal(&DealInputs {
        purchase_price: dec!(1400000),
        equity_anchor: EquityAnchor::TotalCashInvested,
        ..scenario_a()
    })
    .unwrap()
    .result;
    let cs = &trapped.capital_stack;
    assert!(cs.cash_out > Decimal::ZERO);
    assert!(cs.cash_left_in_deal > Decimal::ZERO);
    let trapped_multiple = trapped.hold_returns.unwrap().equity_multiple.unwrap();
    let total_multiple = total.hold_returns.unwrap().equity_multiple.unwrap();
    assert!(trapped_multiple > total_multiple);
}

#[test]
fn test_zero_refinance_cap_degrades_gracefully() {
    let input = DealInputs {
        refinance_cap_rate: dec!(0),
        ..scenario_a()
    };
    let result = screen_deal(&input).unwrap();
    let out = &result.result;
    assert_eq!(out.pro_forma.value_after, None);
    assert_eq!(out.capital_stack.refinance_loan, Decimal::ZERO);
    assert_eq!(out.capital_stack.dscr, None);
    assert!(!out.verdict.dscr_target_met);
    assert!(result.warnings.iter().any(|w| w.contains("No refinance valuation")));
}

#[test]
fn test_undefined_metrics_serialize_as_absent() {
    let input = DealInputs {
        in_place_rent_per_unit: dec!(0),
        refinance_cap_rate: dec!(0),
        ..scenario_a()
    };
    let out = screen_deal(&input).unwrap();
    let json = serde_json::to_value(&out.result).unwrap();
    assert!(json["pro_forma"].get("noi_lift").is_none());
    assert!(json["capital_stack"].get("dscr").is_none());
    assert_eq!(json["verdict"]["noi_target_met"], serde_json::json!(false));
}

#[test]
fn test_rejects_invalid_inputs() {
    let bad = [
        DealInputs { units: 0, ..scenario_a() },
        DealInputs { hold_years: 0, ..scenario_a() },
        DealInputs { amortization_years: 0, ..scenario_a() },
        DealInputs { expense_ratio_after: dec!(1.2), ..scenario_a() },
        DealInputs { purchase_price: dec!(-1), ..scenario_a() },
        DealInputs { noi_growth_rate: dec!(-1), ..scenario_a() },
    ];
    for input in &bad {
        assert!(screen_deal(input).is_err(), "accepted {input:?}");
    }
}

#[test]
fn test_extreme_growth_reports_overflow() {
    let extreme = [
        DealInputs { noi_growth_rate: dec!(1.0), hold_years: 82, ..scenario_a() },
        DealInputs {
            noi_growth_rate: dec!(0.9),
            hold_years: 85,
            sale_cap_rate: dec!(0.0001),
            ..scenario_a()
        },
    ];
    for input in &extreme {
        let err = screen_deal(input).unwrap_err();
        assert!(
            err.to_string().starts_with("Numeric overflow"),
            "unexpected error {err}"
        );
    }
}
