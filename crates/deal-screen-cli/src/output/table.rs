use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{flatten, format_scalar};

/// Format output as tables using the tabled crate.
///
/// Scalars in the result print as a Field/Value table; arrays of records
/// (hold periods, amortisation schedule) and the sensitivity matrix each get
/// their own table.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_fields(&flatten(value));
            }
        }
        Value::Array(arr) => print_records(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    let rows = flatten(result);
    let (records, fields): (Vec<_>, Vec<_>) = rows
        .into_iter()
        .partition(|(key, val)| is_record_list(val) || key == "matrix");

    print_fields(&fields);

    for (key, val) in &records {
        println!("\n{key}:");
        if key == "matrix" {
            print_matrix(result, val);
        } else if let Value::Array(arr) = val {
            print_records(arr);
        }
    }

    // Print warnings if any
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    // Print methodology
    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn is_record_list(value: &Value) -> bool {
    matches!(value, Value::Array(arr) if arr.first().is_some_and(Value::is_object))
}

fn print_fields(rows: &[(String, Value)]) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in rows {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_records(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    // Collect all keys from first object for headers
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

/// Sensitivity grid: variable 1 down the side, variable 2 across the top.
fn print_matrix(result: &Value, matrix: &Value) {
    let axis = |key: &str| -> Vec<String> {
        result
            .get(key)
            .and_then(Value::as_array)
            .map(|vals| vals.iter().map(format_scalar).collect())
            .unwrap_or_default()
    };
    let rows_axis = axis("variable_1_values");
    let cols_axis = axis("variable_2_values");
    let corner = format!(
        "{} \\ {}",
        result["variable_1_name"].as_str().unwrap_or("var1"),
        result["variable_2_name"].as_str().unwrap_or("var2"),
    );

    let mut builder = Builder::default();
    builder.push_record(std::iter::once(corner).chain(cols_axis));
    if let Value::Array(rows) = matrix {
        for (label, row) in rows_axis.iter().zip(rows) {
            let cells = row
                .as_array()
                .map(|cells| cells.iter().map(cell_value).collect::<Vec<_>>())
                .unwrap_or_default();
            builder.push_record(std::iter::once(label.clone()).chain(cells));
        }
    }
    println!("{}", Table::from(builder));
}

fn cell_value(value: &Value) -> String {
    match value {
        Value::Null => "n/a".to_string(),
        _ => format_scalar(value),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        _ => format_scalar(value),
    }
}
