use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Dollar amounts. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.065 = 6.5%). Never as percentages.
pub type Rate = Decimal;

/// Coverage and return multiples (1.25x DSCR, 2.1x equity multiple)
pub type Multiple = Decimal;

/// Count of loan payment periods (months unless stated otherwise)
pub type Periods = u32;

pub const MONTHS_PER_YEAR: u32 = 12;

/// `numerator / denominator`, or `None` when the denominator is not positive.
///
/// Screening ratios (DSCR, NOI lift, equity multiple) are undefined rather
/// than zero when their base is missing. A quotient outside the Decimal
/// range is also undefined.
pub fn ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator <= Decimal::ZERO {
        None
    } else {
        numerator.checked_div(denominator)
    }
}

/// `base^n` for a whole-number exponent by repeated multiplication.
///
/// Returns `None` if an intermediate product leaves the Decimal range.
pub fn checked_powi(base: Decimal, n: u32) -> Option<Decimal> {
    let mut acc = Decimal::ONE;
    for _ in 0..n {
        acc = acc.checked_mul(base)?;
    }
    Some(acc)
}

/// One swept input in a sensitivity grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityVariable {
    pub name: String,
    pub min: Decimal,
    pub max: Decimal,
    pub step: Decimal,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Wrap a result with methodology, echoed assumptions, warnings and timing.
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
