use serde_json::Value;

use super::{flatten, format_scalar, result_section};

/// Key answer per command, in priority order over the flattened result.
const PRIORITY_KEYS: [&str; 8] = [
    "verdict.passes",
    "irr",
    "base_case_value",
    "monthly_payment",
    "noi_lift",
    "dscr",
    "equity_multiple",
    "noi_after",
];

/// Print just the key answer value from the output.
///
/// Heuristic: look for well-known result fields in order of priority,
/// then fall back to the first field in the result object.
pub fn print_minimal(value: &Value) {
    let result = result_section(value);
    if !result.is_object() {
        println!("{}", format_scalar(result));
        return;
    }

    let rows = flatten(result);
    println!("{}", pick_minimal(&rows));
}

fn pick_minimal(rows: &[(String, Value)]) -> String {
    for key in PRIORITY_KEYS {
        if let Some((_, val)) = rows.iter().find(|(k, v)| k == key && !v.is_null()) {
            return match key {
                "verdict.passes" => screen_summary(rows, val),
                _ => format_scalar(val),
            };
        }
    }

    // Fall back to first field
    rows.first()
        .map(|(key, val)| format!("{key}: {}", format_scalar(val)))
        .unwrap_or_default()
}

/// `PASS` / `FAIL` with the two metrics behind the verdict.
fn screen_summary(rows: &[(String, Value)], passes: &Value) -> String {
    let lookup = |key: &str| {
        rows.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| format_scalar(v))
            .unwrap_or_else(|| "n/a".to_string())
    };
    let label = if passes.as_bool().unwrap_or(false) {
        "PASS"
    } else {
        "FAIL"
    };
    format!(
        "{label} noi_lift={} dscr={}",
        lookup("verdict.noi_lift"),
        lookup("verdict.dscr")
    )
}
