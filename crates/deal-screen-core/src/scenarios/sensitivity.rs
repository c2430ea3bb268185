use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::debug;

use crate::deal::inputs::DealInputs;
use crate::deal::screen::{run_screen, DealScreenOutput};
use crate::error::DealScreenError;
use crate::types::*;
use crate::DealScreenResult;

/// Upper bound on evaluated grid points.
const MAX_GRID_POINTS: usize = 10_000;

/// Screening output measured across the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenMetric {
    NoiLift,
    Dscr,
    ValueAfter,
    ValueCreated,
    RefinanceLoan,
    CashOut,
    CashLeftInDeal,
    Irr,
    EquityMultiple,
    CashOnCash,
}

impl ScreenMetric {
    pub const ALL: [ScreenMetric; 10] = [
        ScreenMetric::NoiLift,
        ScreenMetric::Dscr,
        ScreenMetric::ValueAfter,
        ScreenMetric::ValueCreated,
        ScreenMetric::RefinanceLoan,
        ScreenMetric::CashOut,
        ScreenMetric::CashLeftInDeal,
        ScreenMetric::Irr,
        ScreenMetric::EquityMultiple,
        ScreenMetric::CashOnCash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenMetric::NoiLift => "noi_lift",
            ScreenMetric::Dscr => "dscr",
            ScreenMetric::ValueAfter => "value_after",
            ScreenMetric::ValueCreated => "value_created",
            ScreenMetric::RefinanceLoan => "refinance_loan",
            ScreenMetric::CashOut => "cash_out",
            ScreenMetric::CashLeftInDeal => "cash_left_in_deal",
            ScreenMetric::Irr => "irr",
            ScreenMetric::EquityMultiple => "equity_multiple",
            ScreenMetric::CashOnCash => "cash_on_cash",
        }
    }

    /// Read the metric off a screening run. Hold metrics are `None` when the
    /// hold analysis was skipped.
    pub fn extract(&self, out: &DealScreenOutput) -> Option<Decimal> {
        let hold = out.hold_returns.as_ref();
        match self {
            ScreenMetric::NoiLift => out.pro_forma.noi_lift,
            ScreenMetric::Dscr => out.capital_stack.dscr,
            ScreenMetric::ValueAfter => out.pro_forma.value_after,
            ScreenMetric::ValueCreated => out.pro_forma.value_created,
            ScreenMetric::RefinanceLoan => Some(out.capital_stack.refinance_loan),
            ScreenMetric::CashOut => Some(out.capital_stack.cash_out),
            ScreenMetric::CashLeftInDeal => Some(out.capital_stack.cash_left_in_deal),
            ScreenMetric::Irr => hold.and_then(|h| h.irr),
            ScreenMetric::EquityMultiple => hold.and_then(|h| h.equity_multiple),
            ScreenMetric::CashOnCash => hold.and_then(|h| h.cash_on_cash_year1),
        }
    }

    fn needs_hold(&self) -> bool {
        matches!(
            self,
            ScreenMetric::Irr | ScreenMetric::EquityMultiple | ScreenMetric::CashOnCash
        )
    }
}

impl fmt::Display for ScreenMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScreenMetric {
    type Err = DealScreenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        ScreenMetric::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| {
                DealScreenError::invalid(
                    "output_metric",
                    format!(
                        "Unknown metric '{s}'. Valid: {}",
                        ScreenMetric::ALL.map(|m| m.as_str()).join(", ")
                    ),
                )
            })
    }
}

/// Input for a 2-way sensitivity grid over a deal screen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealSensitivityInput {
    /// Base case deal; swept fields are overridden per grid point
    pub base_inputs: DealInputs,
    /// First input to sweep, by its serialized field name (rows)
    pub variable_1: SensitivityVariable,
    /// Second input to sweep (columns)
    pub variable_2: SensitivityVariable,
    pub output_metric: ScreenMetric,
}

/// Output of a 2-way deal sensitivity grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealSensitivityOutput {
    pub variable_1_name: String,
    pub variable_2_name: String,
    pub variable_1_values: Vec<Decimal>,
    pub variable_2_values: Vec<Decimal>,
    pub output_metric: ScreenMetric,
    /// Matrix[i][j] = metric when variable_1 = variable_1_values[i], variable_2 = variable_2_values[j]
    pub matrix: Vec<Vec<Option<Decimal>>>,
    /// Metric at the grid point nearest the base inputs
    pub base_case_value: Option<Decimal>,
    /// Position of the base case in the matrix (row, col)
    pub base_case_position: (usize, usize),
}

/// Generate the sweep values for a sensitivity variable from min to max with step.
fn generate_sweep_values(var: &SensitivityVariable) -> DealScreenResult<Vec<Decimal>> {
    if var.step <= Decimal::ZERO {
        return Err(DealScreenError::invalid(
            format!("variable:{}", var.name),
            "Step must be positive",
        ));
    }
    if var.min > var.max {
        return Err(DealScreenError::invalid(
            format!("variable:{}", var.name),
            "Min must be <= max",
        ));
    }

    let mut values = Vec::new();
    let mut current = var.min;
    while current <= var.max {
        values.push(current);
        if values.len() > MAX_GRID_POINTS {
            return Err(DealScreenError::invalid(
                format!("variable:{}", var.name),
                format!("Sweep exceeds {MAX_GRID_POINTS} values; use a larger step"),
            ));
        }
        current += var.step;
    }
    // Ensure max is included if step doesn't land exactly on it
    if let Some(&last) = values.last() {
        if last < var.max {
            values.push(var.max);
        }
    }

    Ok(values)
}

/// Find the closest index to a target value in a sorted list.
fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| (**v - target).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// How a swept field is written back into the serialized inputs.
#[derive(Debug, Clone, Copy)]
enum FieldKind {
    /// Decimal fields serialize as strings
    Decimal,
    /// Counts (units, years) serialize as JSON integers
    Whole,
}

/// A numeric `DealInputs` field resolved against the serialized base case.
struct SweptField {
    name: String,
    kind: FieldKind,
    /// Value in the base case; `None` for an unset optional input
    base_value: Option<Decimal>,
}

fn resolve_field(
    base: &Map<String, Value>,
    var: &SensitivityVariable,
) -> DealScreenResult<SweptField> {
    let not_numeric = || {
        DealScreenError::invalid(
            format!("variable:{}", var.name),
            "Not a numeric deal input",
        )
    };

    let (kind, base_value) = match base.get(&var.name) {
        Some(Value::String(s)) => (
            FieldKind::Decimal,
            Some(Decimal::from_str(s).map_err(|_| not_numeric())?),
        ),
        Some(Value::Number(n)) => {
            // Every grid point of a count must be a whole number
            if !var.min.fract().is_zero() || !var.step.fract().is_zero() {
                return Err(DealScreenError::invalid(
                    format!("variable:{}", var.name),
                    "Whole-number input needs a whole-number min and step",
                ));
            }
            (FieldKind::Whole, n.as_u64().map(Decimal::from))
        }
        Some(_) => return Err(not_numeric()),
        // Unset optional input: probe that it exists and takes a decimal
        None => {
            let mut probe = base.clone();
            probe.insert(var.name.clone(), Value::String(var.min.to_string()));
            let inputs: DealInputs = serde_json::from_value(Value::Object(probe))?;
            let reserialized = serde_json::to_value(&inputs)?;
            if reserialized.get(&var.name).is_none() {
                return Err(not_numeric());
            }
            (FieldKind::Decimal, None)
        }
    };

    Ok(SweptField {
        name: var.name.clone(),
        kind,
        base_value,
    })
}

fn field_value(field: &SweptField, value: Decimal) -> DealScreenResult<Value> {
    match field.kind {
        FieldKind::Decimal => Ok(Value::String(value.to_string())),
        FieldKind::Whole => {
            if !value.fract().is_zero() {
                return Err(DealScreenError::invalid(
                    format!("variable:{}", field.name),
                    format!("{value} is not a whole number"),
                ));
            }
            value.to_u64().map(Value::from).ok_or_else(|| {
                DealScreenError::invalid(
                    format!("variable:{}", field.name),
                    format!("{value} is out of range"),
                )
            })
        }
    }
}

fn set_json_field(
    obj: &mut Map<String, Value>,
    field: &SweptField,
    value: Decimal,
) -> DealScreenResult<()> {
    obj.insert(field.name.clone(), field_value(field, value)?);
    Ok(())
}

/// Base inputs with both swept fields overridden, then screened.
fn evaluate_point(
    base: &Map<String, Value>,
    fields: (&SweptField, &SweptField),
    values: (Decimal, Decimal),
) -> DealScreenResult<DealScreenOutput> {
    let mut point = base.clone();
    set_json_field(&mut point, fields.0, values.0)?;
    set_json_field(&mut point, fields.1, values.1)?;
    let deal: DealInputs = serde_json::from_value(Value::Object(point))?;

    // Per-point diagnostics would repeat across the grid; keep failures only.
    let mut point_warnings = Vec::new();
    run_screen(&deal, &mut point_warnings)
}

/// Evaluate a 2-way sensitivity grid of one screening metric.
///
/// Each grid point re-runs the full screen on the base inputs with the two
/// swept fields overridden. A point whose inputs fail validation becomes an
/// empty cell and a warning; it does not abort the grid.
pub fn deal_sensitivity(
    input: &DealSensitivityInput,
) -> DealScreenResult<ComputationOutput<DealSensitivityOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.variable_1.name == input.variable_2.name {
        return Err(DealScreenError::invalid(
            "variable_2",
            "Sensitivity variables must be different inputs",
        ));
    }

    let v1_values = generate_sweep_values(&input.variable_1)?;
    let v2_values = generate_sweep_values(&input.variable_2)?;
    let points = v1_values.len() * v2_values.len();
    if points > MAX_GRID_POINTS {
        return Err(DealScreenError::invalid(
            "variables",
            format!("Grid of {points} points exceeds {MAX_GRID_POINTS}"),
        ));
    }

    let mut base_inputs = input.base_inputs.clone();
    if input.output_metric.needs_hold() && !base_inputs.analyze_hold {
        base_inputs.analyze_hold = true;
        warnings.push(format!(
            "Hold analysis enabled to measure {}",
            input.output_metric
        ));
    }
    let base_map = match serde_json::to_value(&base_inputs)? {
        Value::Object(map) => map,
        _ => {
            return Err(DealScreenError::SerializationError(
                "Deal inputs did not serialize to an object".into(),
            ))
        }
    };

    let field_1 = resolve_field(&base_map, &input.variable_1)?;
    let field_2 = resolve_field(&base_map, &input.variable_2)?;

    let mut matrix = Vec::with_capacity(v1_values.len());
    for v1 in &v1_values {
        let mut row = Vec::with_capacity(v2_values.len());
        for v2 in &v2_values {
            match evaluate_point(&base_map, (&field_1, &field_2), (*v1, *v2)) {
                Ok(out) => row.push(input.output_metric.extract(&out)),
                Err(e) => {
                    warnings.push(format!(
                        "Evaluation failed at ({}={v1}, {}={v2}): {e}",
                        field_1.name, field_2.name
                    ));
                    row.push(None);
                }
            }
        }
        matrix.push(row);
    }

    let mid1 = (input.variable_1.min + input.variable_1.max) / dec!(2);
    let mid2 = (input.variable_2.min + input.variable_2.max) / dec!(2);
    let base_row = closest_index(&v1_values, field_1.base_value.unwrap_or(mid1));
    let base_col = closest_index(&v2_values, field_2.base_value.unwrap_or(mid2));
    let base_case_value = matrix[base_row][base_col];

    debug!(
        rows = v1_values.len(),
        cols = v2_values.len(),
        metric = %input.output_metric,
        "sensitivity grid evaluated"
    );

    let output = DealSensitivityOutput {
        variable_1_name: input.variable_1.name.clone(),
        variable_2_name: input.variable_2.name.clone(),
        variable_1_values: v1_values,
        variable_2_values: v2_values,
        output_metric: input.output_metric,
        matrix,
        base_case_value,
        base_case_position: (base_row, base_col),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "2-Way Deal Screen Sensitivity",
        &serde_json::json!({
            "variable_1": input.variable_1,
            "variable_2": input.variable_2,
            "output_metric": input.output_metric,
            "base_inputs": base_inputs,
        }),
        warnings,
        elapsed,
        output,
    ))
}
