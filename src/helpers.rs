//! Small row-value helpers shared by the engines and the row transformer.

use std::cmp::Ordering;

use serde_json::{Map, Value};

/// An ordered row: column name to value, in column order.
pub type RowMap = Map<String, Value>;

/// Looks up a value by dotted path (`user.profile.city`), descending into
/// nested objects. A path that does not resolve yields `None`.
pub fn value_at_path<'a>(row: &'a RowMap, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = row.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// The plain-text form of a cell, as the search predicates see it.
///
/// Scalars stringify naturally, `null` is empty, and nested structures fall
/// back to their JSON form so a global search can still hit them.
pub fn value_to_plain(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Natural comparison of two cell values: numbers numerically, strings with
/// digit runs compared as numbers (`"item2" < "item10"`), mixed kinds by
/// their plain-text form.
pub fn natural_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => natural_str_cmp(&value_to_plain(a), &value_to_plain(b)),
    }
}

/// Natural string comparison: consecutive digits compare as one number.
pub fn natural_str_cmp(a: &str, b: &str) -> Ordering {
    let mut ca = a.chars().peekable();
    let mut cb = b.chars().peekable();
    loop {
        match (ca.peek().copied(), cb.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let nx = take_digits(&mut ca);
                let ny = take_digits(&mut cb);
                match nx.cmp(&ny) {
                    Ordering::Equal => {}
                    other => return other,
                }
            }
            (Some(x), Some(y)) => {
                match x.cmp(&y) {
                    Ordering::Equal => {}
                    other => return other,
                }
                ca.next();
                cb.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> u128 {
    let mut n: u128 = 0;
    while let Some(c) = chars.peek().copied() {
        if let Some(d) = c.to_digit(10) {
            n = n.saturating_mul(10).saturating_add(d as u128);
            chars.next();
        } else {
            break;
        }
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dotted_lookup() {
        let row: RowMap = serde_json::from_value(json!({
            "id": 1,
            "user": { "profile": { "city": "Lisbon" } }
        }))
        .unwrap();

        assert_eq!(
            value_at_path(&row, "user.profile.city"),
            Some(&json!("Lisbon"))
        );
        assert_eq!(value_at_path(&row, "user.missing"), None);
    }

    #[test]
    fn natural_ordering_of_digit_runs() {
        assert_eq!(natural_str_cmp("item2", "item10"), Ordering::Less);
        assert_eq!(natural_str_cmp("item10", "item10"), Ordering::Equal);
        assert_eq!(natural_cmp(&json!(9), &json!(10.5)), Ordering::Less);
        assert_eq!(natural_cmp(&json!(null), &json!("a")), Ordering::Less);
    }
}
