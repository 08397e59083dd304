use serde_json::Value;

/// Headline answer per command, in lookup order.
const HEADLINE_KEYS: [&str; 14] = [
    "summary",
    "recommended",
    "months_to_payoff",
    "months_remaining",
    "months_saved",
    "years_to_fire",
    "fire_number",
    "reached_fire_month",
    "status",
    "avg_monthly_spending",
    "projection",
    "best_for_debt",
    "category_id",
    "reason",
];

/// Print only the headline value of a result.
///
/// Looks inside the `result` envelope when present, tries the headline
/// keys in order and falls back to the first field.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Object(map) => {
            let headline = HEADLINE_KEYS
                .iter()
                .find_map(|key| map.get(*key).filter(|v| !v.is_null()).map(|v| (*key, v)));
            match headline {
                // Nested projections answer with their own headline
                Some(("projection", Value::Object(inner))) => match inner.get("years_to_fire") {
                    Some(years) => println!("{}", format_minimal(years)),
                    None => println!("{}", format_minimal(&Value::Object(inner.clone()))),
                },
                Some(("recommended", Value::Object(pick))) => {
                    println!("{}", pick.get("name").map(format_minimal).unwrap_or_default())
                }
                Some((_, v)) => println!("{}", format_minimal(v)),
                None => {
                    if let Some((key, v)) = map.iter().next() {
                        println!("{key}: {}", format_minimal(v));
                    }
                }
            }
        }
        // Lists (e.g. category anomalies) print one headline per row
        Value::Array(rows) => {
            for row in rows {
                let name = row.get("category_name").or_else(|| row.get("category_id"));
                let amount = row.get("change").or_else(|| row.get("average_spent"));
                match (name, amount) {
                    (Some(n), Some(a)) => println!("{}: {}", format_minimal(n), format_minimal(a)),
                    _ => println!("{}", format_minimal(row)),
                }
            }
        }
        other => println!("{}", format_minimal(other)),
    }
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
