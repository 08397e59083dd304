use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Result arrays rendered as their own table under the field/value table.
const ROW_SECTIONS: [&str; 5] = ["payments", "points", "schedule", "milestones", "scenarios"];

/// Render a response as tables, followed by notes from the envelope.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            let result = map.get("result").unwrap_or(value);
            match result {
                Value::Object(fields) => print_fields(fields),
                Value::Array(rows) => print_rows(rows),
                other => println!("{other}"),
            }
            // `scenarios` sits beside the result in compare-scenarios output
            if let Some(Value::Array(rows)) = map.get("scenarios") {
                println!("\nscenarios:");
                print_rows(rows);
            }
            print_notes(map);
        }
        Value::Array(rows) => print_rows(rows),
        other => println!("{other}"),
    }
}

fn print_fields(fields: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in fields {
        if ROW_SECTIONS.contains(&key.as_str()) && val.is_array() {
            continue;
        }
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));

    for section in ROW_SECTIONS {
        if let Some(Value::Array(rows)) = fields.get(section) {
            println!("\n{section}:");
            print_rows(rows);
        }
    }
}

fn print_rows(rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        if rows.is_empty() {
            println!("(empty)");
        }
        for row in rows {
            println!("{}", format_value(row));
        }
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for row in rows {
        if let Value::Object(map) = row {
            builder.push_record(
                headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default()),
            );
        }
    }
    println!("{}", Table::from(builder));
}

/// Summary, assumptions, warnings and methodology, whichever are present.
fn print_notes(map: &Map<String, Value>) {
    if let Some(Value::String(summary)) = map.get("summary") {
        println!("\n{summary}");
    }
    for (key, title) in [("assumptions", "Assumptions"), ("warnings", "Warnings")] {
        if let Some(Value::Array(items)) = map.get(key) {
            if !items.is_empty() {
                println!("\n{title}:");
                for item in items.iter().filter_map(Value::as_str) {
                    println!("  - {item}");
                }
            }
        }
    }
    if let Some(Value::String(methodology)) = map.get("methodology") {
        println!("\nMethodology: {methodology}");
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(items) => items.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
