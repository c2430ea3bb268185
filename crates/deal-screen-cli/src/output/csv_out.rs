use serde_json::Value;
use std::io;

use super::{flatten, format_scalar, result_section};

/// Write output as CSV to stdout.
///
/// A sensitivity result becomes a grid (`var1 \ var2` header row); a result
/// with hold periods becomes one row per period; anything else is a
/// two-column field/value listing of the flattened result.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());
    let result = result_section(value);

    if let Some(matrix) = result.get("matrix") {
        write_matrix_csv(&mut wtr, result, matrix);
    } else if let Some(Value::Array(periods)) = result
        .get("periods")
        .or_else(|| result.get("hold_returns").and_then(|h| h.get("periods")))
    {
        write_array_csv(&mut wtr, periods);
    } else if let Some(Value::Array(schedule)) = result.get("schedule") {
        write_array_csv(&mut wtr, schedule);
    } else if result.is_object() {
        let _ = wtr.write_record(["field", "value"]);
        for (key, val) in flatten(result) {
            let _ = wtr.write_record([key.as_str(), &format_scalar(&val)]);
        }
    } else {
        let _ = wtr.write_record([&format_scalar(result)]);
    }

    let _ = wtr.flush();
}

fn write_matrix_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, result: &Value, matrix: &Value) {
    let axis = |key: &str| -> Vec<String> {
        result
            .get(key)
            .and_then(Value::as_array)
            .map(|vals| vals.iter().map(format_scalar).collect())
            .unwrap_or_default()
    };
    let corner = format!(
        "{}\\{}",
        result["variable_1_name"].as_str().unwrap_or("var1"),
        result["variable_2_name"].as_str().unwrap_or("var2"),
    );

    let mut header = vec![corner];
    header.extend(axis("variable_2_values"));
    let _ = wtr.write_record(&header);

    if let Value::Array(rows) = matrix {
        for (label, row) in axis("variable_1_values").into_iter().zip(rows) {
            let mut record = vec![label];
            if let Value::Array(cells) = row {
                record.extend(cells.iter().map(format_scalar));
            }
            let _ = wtr.write_record(&record);
        }
    }
}

fn write_array_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    // Extract headers from first object
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_scalar).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_scalar(item)]);
        }
    }
}
