use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

use deal_screen_core::amortization::{
    amortization_schedule, remaining_balance, AmortizationYear,
};
use deal_screen_core::time_value::{npv, solve_irr};
use deal_screen_core::types::{with_metadata, Money, Rate, MONTHS_PER_YEAR};

/// Arguments for IRR of a cash-flow series
#[derive(Args)]
pub struct IrrArgs {
    /// Annual cash flows, period 0 first (comma-separated, e.g. "-100,30,30,130")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub cash_flows: Vec<Decimal>,
}

/// Arguments for loan payment and balance
#[derive(Args)]
pub struct PaymentArgs {
    /// Loan principal
    #[arg(long)]
    pub principal: Decimal,

    /// Annual interest rate (e.g. 0.0725)
    #[arg(long)]
    pub rate: Decimal,

    /// Amortisation term in years
    #[arg(long, default_value = "30")]
    pub years: u32,

    /// Report the balance outstanding after this many years
    #[arg(long)]
    pub balance_after: Option<u32>,

    /// Include the year-by-year amortisation schedule
    #[arg(long)]
    pub schedule: bool,
}

#[derive(Debug, Serialize)]
struct IrrOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    irr: Option<Rate>,
    /// NPV at the solved rate
    #[serde(skip_serializing_if = "Option::is_none")]
    npv_at_irr: Option<Money>,
    periods: usize,
}

#[derive(Debug, Serialize)]
struct PaymentOutput {
    monthly_payment: Money,
    annual_debt_service: Money,
    total_interest: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    balance_after: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schedule: Option<Vec<AmortizationYear>>,
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let irr = solve_irr(&args.cash_flows);
    let npv_at_irr = irr.map(|rate| npv(rate, &args.cash_flows)).transpose()?;
    if irr.is_none() {
        warnings.push(
            "IRR undefined: cash flows need an outflow and an inflow, with a root between -99% and 500%"
                .to_string(),
        );
    }

    let output = IrrOutput {
        irr,
        npv_at_irr,
        periods: args.cash_flows.len(),
    };
    let elapsed = start.elapsed().as_micros() as u64;
    let result = with_metadata(
        "IRR (Bisection on Annual Cash Flows)",
        &serde_json::json!({ "cash_flows": args.cash_flows }),
        warnings,
        elapsed,
        output,
    );
    Ok(serde_json::to_value(result)?)
}

pub fn run_payment(args: PaymentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();

    let summary = amortization_schedule(args.principal, args.rate, args.years)?;
    let balance_after = args
        .balance_after
        .map(|years| {
            remaining_balance(
                args.principal,
                args.rate,
                args.years,
                years.saturating_mul(MONTHS_PER_YEAR),
            )
        })
        .transpose()?;

    let output = PaymentOutput {
        monthly_payment: summary.monthly_payment,
        annual_debt_service: summary.annual_debt_service,
        total_interest: summary.total_interest,
        balance_after,
        schedule: args.schedule.then_some(summary.schedule),
    };
    let elapsed = start.elapsed().as_micros() as u64;
    let result = with_metadata(
        "Fixed-Rate Monthly Amortisation",
        &serde_json::json!({
            "principal": args.principal,
            "annual_rate": args.rate,
            "amortization_years": args.years,
        }),
        Vec::new(),
        elapsed,
        output,
    );
    Ok(serde_json::to_value(result)?)
}
