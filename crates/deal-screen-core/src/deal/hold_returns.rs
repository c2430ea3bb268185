use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::amortization::remaining_balance;
use crate::deal::capital_stack::CapitalStackResult;
use crate::deal::inputs::{DealInputs, EquityAnchor};
use crate::deal::pro_forma::ProFormaResult;
use crate::error::DealScreenError;
use crate::time_value::solve_irr;
use crate::types::{checked_powi, ratio, Money, Multiple, Rate, MONTHS_PER_YEAR};
use crate::DealScreenResult;

/// One annual period of the equity cash-flow series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldPeriodCashFlow {
    /// 0 = acquisition, N = sale year
    pub year: u32,
    pub label: String,
    pub noi: Money,
    pub debt_service: Money,
    /// NOI less debt service
    pub operating_cash_flow: Money,
    pub cash_out: Money,
    pub net_sale_proceeds: Money,
    /// Net cash flow to equity for the period (negative at year 0)
    pub net_cash_flow: Money,
}

/// Exit at the end of the hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleSummary {
    /// NOI after grown for N − 1 years
    pub exit_noi: Money,
    pub sale_cap_rate: Rate,
    /// Exit NOI / sale cap; undefined at a zero cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<Money>,
    pub sale_costs: Money,
    /// Refinance balance outstanding after N × 12 payments
    pub loan_balance_at_exit: Money,
    /// Sale price less costs and payoff, floored at zero
    pub net_sale_proceeds: Money,
}

/// Hold-period returns on the anchored equity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldReturnResult {
    pub equity_anchor: EquityAnchor,
    /// Equity at risk at year 0
    pub equity_base: Money,
    pub hold_years: u32,
    pub periods: Vec<HoldPeriodCashFlow>,
    /// `periods[t].net_cash_flow`, the series fed to the IRR solver
    pub cash_flows: Vec<Money>,
    pub sale: SaleSummary,
    /// Sum of the strictly positive period cash flows
    pub total_distributions: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irr: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equity_multiple: Option<Multiple>,
    /// Year-1 operating cash flow / equity base
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_on_cash_year1: Option<Rate>,
}

fn growth_overflow(year: u32) -> DealScreenError {
    DealScreenError::NumericOverflow {
        context: format!("NOI growth to year {year}"),
    }
}

fn overflow(context: &str) -> DealScreenError {
    DealScreenError::NumericOverflow {
        context: context.to_string(),
    }
}

/// Build the annual equity cash flows over the hold and solve the returns.
///
/// Year 1 carries the refinance cash-out. NOI grows geometrically from the
/// stabilised figure while debt service stays flat; the sale year adds net
/// sale proceeds at the exit cap.
pub fn compute_hold_returns(
    input: &DealInputs,
    pro_forma: &ProFormaResult,
    capital: &CapitalStackResult,
) -> DealScreenResult<HoldReturnResult> {
    let n = input.hold_years;
    if n == 0 {
        return Err(DealScreenError::invalid("hold_years", "Hold period must be at least 1 year"));
    }

    let equity_base = match input.equity_anchor {
        EquityAnchor::CashLeftInDeal => capital.cash_left_in_deal,
        EquityAnchor::TotalCashInvested => capital.cash_needed_at_close,
    };
    let debt_service = capital.refinance_annual_debt_service;
    let growth = Decimal::ONE + input.noi_growth_rate;

    // --- Exit ---
    let exit_noi = checked_powi(growth, n - 1)
        .and_then(|factor| pro_forma.noi_after.checked_mul(factor))
        .ok_or_else(|| growth_overflow(n))?;
    let sale_price = if input.sale_cap_rate > Decimal::ZERO {
        let price = exit_noi
            .checked_div(input.sale_cap_rate)
            .ok_or_else(|| overflow("sale price at exit cap"))?;
        Some(price)
    } else {
        None
    };
    let sale_costs = sale_price.unwrap_or(Decimal::ZERO) * input.sale_cost_pct;
    let loan_balance_at_exit = remaining_balance(
        capital.refinance_loan,
        input.refinance_rate,
        input.amortization_years,
        n.saturating_mul(MONTHS_PER_YEAR),
    )?;
    let net_sale_proceeds = sale_price
        .map(|price| (price - sale_costs - loan_balance_at_exit).max(Decimal::ZERO))
        .unwrap_or(Decimal::ZERO);

    // --- Periods ---
    let mut periods = Vec::with_capacity(n as usize + 1);
    periods.push(HoldPeriodCashFlow {
        year: 0,
        label: "Acquisition".into(),
        noi: Decimal::ZERO,
        debt_service: Decimal::ZERO,
        operating_cash_flow: Decimal::ZERO,
        cash_out: Decimal::ZERO,
        net_sale_proceeds: Decimal::ZERO,
        net_cash_flow: -equity_base,
    });

    let mut noi = pro_forma.noi_after;
    for year in 1..=n {
        if year > 1 {
            noi = noi.checked_mul(growth).ok_or_else(|| growth_overflow(year))?;
        }
        let operating_cash_flow = noi - debt_service;
        let cash_out = if year == 1 { capital.cash_out } else { Decimal::ZERO };
        let sale = if year == n { net_sale_proceeds } else { Decimal::ZERO };
        let label = match (year == 1, year == n) {
            (true, true) => "Year 1 (Cash-Out + CF + Sale)".to_string(),
            (true, false) => "Year 1 (Cash-Out + CF)".to_string(),
            (false, true) => format!("Year {year} (CF + Sale)"),
            (false, false) => format!("Year {year}"),
        };
        let net_cash_flow = operating_cash_flow
            .checked_add(cash_out)
            .and_then(|cf| cf.checked_add(sale))
            .ok_or_else(|| overflow("hold-period cash flow"))?;
        periods.push(HoldPeriodCashFlow {
            year,
            label,
            noi,
            debt_service,
            operating_cash_flow,
            cash_out,
            net_sale_proceeds: sale,
            net_cash_flow,
        });
    }

    let cash_flows: Vec<Money> = periods.iter().map(|p| p.net_cash_flow).collect();
    let total_distributions = cash_flows
        .iter()
        .filter(|cf| **cf > Decimal::ZERO)
        .try_fold(Decimal::ZERO, |acc, cf| acc.checked_add(*cf))
        .ok_or_else(|| overflow("total distributions"))?;
    let year1_operating = periods[1].operating_cash_flow;

    // Every ratio is undefined when no equity is left at risk.
    let (irr, equity_multiple, cash_on_cash_year1) = if equity_base > Decimal::ZERO {
        (
            solve_irr(&cash_flows),
            ratio(total_distributions, equity_base),
            ratio(year1_operating, equity_base),
        )
    } else {
        (None, None, None)
    };

    debug!(
        hold_years = n,
        %equity_base,
        irr = ?irr,
        equity_multiple = ?equity_multiple,
        "hold returns computed"
    );

    Ok(HoldReturnResult {
        equity_anchor: input.equity_anchor,
        equity_base,
        hold_years: n,
        periods,
        cash_flows,
        sale: SaleSummary {
            exit_noi,
            sale_cap_rate: input.sale_cap_rate,
            sale_price,
            sale_costs,
            loan_balance_at_exit,
            net_sale_proceeds,
        },
        total_distributions,
        irr,
        equity_multiple,
        cash_on_cash_year1,
    })
}
