use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use deal_screen_core::deal::DealInputs;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse_deal(input_json: &str) -> NapiResult<DealInputs> {
    serde_json::from_str(input_json).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Screening
// ---------------------------------------------------------------------------

#[napi]
pub fn screen_deal(input_json: String) -> NapiResult<String> {
    let input = parse_deal(&input_json)?;
    let output = deal_screen_core::deal::screen_deal(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn compute_pro_forma(input_json: String) -> NapiResult<String> {
    let input = parse_deal(&input_json)?;
    let output =
        deal_screen_core::deal::screen::analyze_pro_forma(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn compute_capital_stack(input_json: String) -> NapiResult<String> {
    let input = parse_deal(&input_json)?;
    let output =
        deal_screen_core::deal::screen::analyze_capital_stack(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn compute_hold_returns(input_json: String) -> NapiResult<String> {
    let input = parse_deal(&input_json)?;
    let output =
        deal_screen_core::deal::screen::analyze_hold_returns(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Time value
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct IrrRequest {
    cash_flows: Vec<Decimal>,
}

#[derive(Serialize)]
struct IrrResponse {
    /// `null` when the series has no meaningful IRR
    irr: Option<Decimal>,
}

#[napi]
pub fn solve_irr(input_json: String) -> NapiResult<String> {
    let request: IrrRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let irr = deal_screen_core::time_value::solve_irr(&request.cash_flows);
    serde_json::to_string(&IrrResponse { irr }).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[napi]
pub fn deal_sensitivity(input_json: String) -> NapiResult<String> {
    let input: deal_screen_core::scenarios::DealSensitivityInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        deal_screen_core::scenarios::deal_sensitivity(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
