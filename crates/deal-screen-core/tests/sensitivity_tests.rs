use deal_screen_core::deal::DealInputs;
use deal_screen_core::scenarios::{deal_sensitivity, DealSensitivityInput, ScreenMetric};
use deal_screen_core::SensitivityVariable;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn sweep(name: &str, min: Decimal, max: Decimal, step: Decimal) -> SensitivityVariable {
    SensitivityVariable {
        name: name.into(),
        min,
        max,
        step,
    }
}

#[test]
fn test_dscr_grid_over_rate_and_ltv() {
    let input = DealSensitivityInput {
        base_inputs: DealInputs::default(),
        variable_1: sweep("refinance_rate", dec!(0.06), dec!(0.11), dec!(0.01)),
        variable_2: sweep("refinance_ltv", dec!(0.65), dec!(0.85), dec!(0.05)),
        output_metric: ScreenMetric::Dscr,
    };
    let out = deal_sensitivity(&input).unwrap().result;
    assert_eq!(out.matrix.len(), 6);
    assert_eq!(out.matrix[0].len(), 5);

    // Cheapest, lowest-leverage corner covers best; priciest, highest-leverage worst
    let best = out.matrix[0][0].unwrap();
    let worst = out.matrix[5][4].unwrap();
    assert!(best > dec!(1.25), "best {best}");
    assert!(worst < dec!(1.0), "worst {worst}");

    for row in &out.matrix {
        for pair in row.windows(2) {
            assert!(pair[0].unwrap() > pair[1].unwrap());
        }
    }
}

#[test]
fn test_noi_lift_grid_over_rent_and_expenses() {
    let input = DealSensitivityInput {
        base_inputs: DealInputs::default(),
        variable_1: sweep("after_rent_per_unit", dec!(1100), dec!(1300), dec!(50)),
        variable_2: sweep("expense_ratio_after", dec!(0.38), dec!(0.46), dec!(0.02)),
        output_metric: ScreenMetric::NoiLift,
    };
    let result = deal_sensitivity(&input).unwrap();
    let out = &result.result;
    // Base case: 1,200 rent and 42% expenses
    assert_eq!(out.base_case_position, (2, 2));
    let base = out.base_case_value.unwrap();
    assert!((base - dec!(0.2052)).abs() < dec!(0.0001), "base {base}");
    assert!(out.matrix[4][0].unwrap() > out.matrix[0][4].unwrap());
}

#[test]
fn test_irr_grid_marks_undefined_cells() {
    // Cheap purchases get all cash back on refinance: nothing left to measure
    let input = DealSensitivityInput {
        base_inputs: DealInputs {
            acquisition_ltv: dec!(0.70),
            ..DealInputs::default()
        },
        variable_1: sweep("purchase_price", dec!(900000), dec!(2100000), dec!(600000)),
        variable_2: sweep("sale_cap_rate", dec!(0.06), dec!(0.07), dec!(0.01)),
        output_metric: ScreenMetric::Irr,
    };
    let out = deal_sensitivity(&input).unwrap().result;
    assert_eq!(out.variable_1_values, vec![dec!(900000), dec!(1500000), dec!(2100000)]);
    assert!(out.matrix[0][0].is_none());
    assert!(out.matrix[2][0].is_some());
}

#[test]
fn test_same_variable_twice_rejected() {
    let input = DealSensitivityInput {
        base_inputs: DealInputs::default(),
        variable_1: sweep("vacancy_rate", dec!(0.05), dec!(0.10), dec!(0.01)),
        variable_2: sweep("vacancy_rate", dec!(0.05), dec!(0.10), dec!(0.01)),
        output_metric: ScreenMetric::NoiLift,
    };
    assert!(deal_sensitivity(&input).is_err());
}

#[test]
fn test_input_round_trips_through_json() {
    let json = serde_json::json!({
        "base_inputs": serde_json::to_value(DealInputs::default()).unwrap(),
        "variable_1": { "name": "vacancy_rate", "min": "0.05", "max": "0.09", "step": "0.02" },
        "variable_2": { "name": "units", "min": "12", "max": "16", "step": "2" },
        "output_metric": "value_after"
    });
    let input: DealSensitivityInput = serde_json::from_value(json).unwrap();
    let out = deal_sensitivity(&input).unwrap().result;
    assert_eq!(out.output_metric, ScreenMetric::ValueAfter);
    assert_eq!(out.base_case_position, (1, 1));
    // More units, more value
    assert!(out.matrix[0][2].unwrap() > out.matrix[0][0].unwrap());
}
