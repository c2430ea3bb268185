use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::deal::capital_stack::{compute_capital_stack, CapitalStackResult};
use crate::deal::hold_returns::{compute_hold_returns, HoldReturnResult};
use crate::deal::inputs::DealInputs;
use crate::deal::pro_forma::{compute_pro_forma, ProFormaResult};
use crate::types::{with_metadata, ComputationOutput, Multiple, Rate};
use crate::DealScreenResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Pass/fail against the two screening thresholds, judged independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenVerdict {
    pub noi_lift_target: Rate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noi_lift: Option<Rate>,
    pub noi_target_met: bool,
    pub min_dscr: Multiple,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dscr: Option<Multiple>,
    pub dscr_target_met: bool,
    /// Both thresholds cleared
    pub passes: bool,
}

/// Full screening result for one deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealScreenOutput {
    pub pro_forma: ProFormaResult,
    pub capital_stack: CapitalStackResult,
    /// Absent when hold analysis is switched off
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_returns: Option<HoldReturnResult>,
    pub verdict: ScreenVerdict,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Screen a value-add deal end to end: pro-forma, capital stack and refinance,
/// optional hold-period returns, and the NOI-lift / DSCR verdict.
pub fn screen_deal(input: &DealInputs) -> DealScreenResult<ComputationOutput<DealScreenOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let output = run_screen(input, &mut warnings)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Value-Add / BRRRR Deal Screen (Direct Cap Refinance, Annual Hold Cash Flows)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// In-place and stabilised income, cap-rate valuations and the NOI-target
/// diagnostic only.
pub fn analyze_pro_forma(input: &DealInputs) -> DealScreenResult<ComputationOutput<ProFormaResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    input.validate(&mut warnings)?;
    let pro_forma = compute_pro_forma(input);
    pro_forma_warnings(&pro_forma, &mut warnings);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Deal Pro-Forma (GPR → EGI → NOI, Direct Capitalisation)",
        input,
        warnings,
        elapsed,
        pro_forma,
    ))
}

/// Acquisition financing, cash to close and the refinance.
pub fn analyze_capital_stack(
    input: &DealInputs,
) -> DealScreenResult<ComputationOutput<CapitalStackResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    input.validate(&mut warnings)?;
    let pro_forma = compute_pro_forma(input);
    let capital = compute_capital_stack(input, &pro_forma)?;
    capital_warnings(input, &pro_forma, &capital, &mut warnings);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Capital Stack & Cash-Out Refinance",
        input,
        warnings,
        elapsed,
        capital,
    ))
}

/// Hold-period equity cash flows and returns. Runs regardless of
/// `analyze_hold`, which only governs the full screen.
pub fn analyze_hold_returns(
    input: &DealInputs,
) -> DealScreenResult<ComputationOutput<HoldReturnResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    input.validate(&mut warnings)?;
    let pro_forma = compute_pro_forma(input);
    let capital = compute_capital_stack(input, &pro_forma)?;
    let returns = compute_hold_returns(input, &pro_forma, &capital)?;
    hold_warnings(&returns, &mut warnings);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Hold-Period Equity Returns (Annual Cash Flows, Bisection IRR)",
        input,
        warnings,
        elapsed,
        returns,
    ))
}

/// Validate, run every stage and collect the screening diagnostics.
///
/// Shared by `screen_deal` and the sensitivity grid, which needs the bare
/// output for each grid point.
pub fn run_screen(input: &DealInputs, warnings: &mut Vec<String>) -> DealScreenResult<DealScreenOutput> {
    input.validate(warnings)?;

    let pro_forma = compute_pro_forma(input);
    debug!(
        noi_before = %pro_forma.noi_before,
        noi_after = %pro_forma.noi_after,
        noi_lift = ?pro_forma.noi_lift,
        "pro-forma computed"
    );
    pro_forma_warnings(&pro_forma, warnings);

    let capital_stack = compute_capital_stack(input, &pro_forma)?;
    debug!(
        refinance_loan = %capital_stack.refinance_loan,
        cash_out = %capital_stack.cash_out,
        dscr = ?capital_stack.dscr,
        "capital stack computed"
    );
    capital_warnings(input, &pro_forma, &capital_stack, warnings);

    let hold_returns = if input.analyze_hold {
        let returns = compute_hold_returns(input, &pro_forma, &capital_stack)?;
        hold_warnings(&returns, warnings);
        Some(returns)
    } else {
        None
    };

    let noi_target_met = pro_forma.noi_target_met();
    let dscr_target_met = capital_stack.dscr_target_met(input.min_dscr);
    let verdict = ScreenVerdict {
        noi_lift_target: input.noi_lift_target,
        noi_lift: pro_forma.noi_lift,
        noi_target_met,
        min_dscr: input.min_dscr,
        dscr: capital_stack.dscr,
        dscr_target_met,
        passes: noi_target_met && dscr_target_met,
    };
    debug!(noi_target_met, dscr_target_met, "screen verdict");

    Ok(DealScreenOutput {
        pro_forma,
        capital_stack,
        hold_returns,
        verdict,
    })
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

fn pct(rate: Decimal) -> Decimal {
    rate * dec!(100)
}

fn pro_forma_warnings(pro_forma: &ProFormaResult, warnings: &mut Vec<String>) {
    match pro_forma.noi_lift {
        None => warnings.push(
            "NOI lift undefined: in-place NOI is zero or negative".into(),
        ),
        Some(lift) if lift < pro_forma.target.noi_lift_target => {
            let mut message = format!(
                "NOI lift of {:.1}% misses the {:.1}% target",
                pct(lift),
                pct(pro_forma.target.noi_lift_target)
            );
            if let Some(rent) = pro_forma.target.required_rent_per_unit {
                message.push_str(&format!(
                    "; stabilised rent of {rent:.0}/unit/month would close the gap"
                ));
            }
            warnings.push(message);
        }
        Some(_) => {}
    }

    if pro_forma.value_after.is_none() {
        warnings.push("No refinance valuation: refinance cap rate is zero".into());
    }
}

fn capital_warnings(
    input: &DealInputs,
    pro_forma: &ProFormaResult,
    capital: &CapitalStackResult,
    warnings: &mut Vec<String>,
) {
    match capital.dscr {
        None => warnings.push("DSCR undefined: refinance carries no debt service".into()),
        Some(dscr) if dscr < input.min_dscr => warnings.push(format!(
            "DSCR of {dscr:.2}x is below the {:.2}x minimum",
            input.min_dscr
        )),
        Some(_) => {}
    }

    if let Some(dscr) = capital.in_place_dscr {
        if dscr < Decimal::ONE {
            warnings.push(format!(
                "In-place NOI covers only {dscr:.2}x of the acquisition loan carry"
            ));
        }
    }

    if pro_forma.value_after.is_some() && capital.refinance_loan < capital.acquisition_loan {
        warnings.push(format!(
            "Refinance loan of {:.0} does not pay off the {:.0} acquisition loan",
            capital.refinance_loan, capital.acquisition_loan
        ));
    }

    if capital.annual_cash_flow_after_debt < Decimal::ZERO {
        warnings.push(format!(
            "Negative cash flow after debt service: {:.0} per year",
            capital.annual_cash_flow_after_debt
        ));
    }
}

fn hold_warnings(returns: &HoldReturnResult, warnings: &mut Vec<String>) {
    if returns.equity_base <= Decimal::ZERO {
        warnings.push(
            "No equity left in the deal after the cash-out; return ratios are undefined \
             (the total_cash_invested anchor measures returns on cash at close)"
                .into(),
        );
    } else if returns.irr.is_none() {
        warnings.push("IRR undefined for the hold-period cash flows".into());
    }

    if returns.sale.sale_price.is_none() {
        warnings.push("Sale price undefined: sale cap rate is zero".into());
    }
}
