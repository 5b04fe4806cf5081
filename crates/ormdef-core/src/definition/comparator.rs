//! Value comparators used to order attribute values.

use std::cmp::Ordering;
use std::sync::Arc;

use super::item::Item;
use crate::value::Value;

/// Orders two values of one attribute.
pub type Comparator = Arc<dyn Fn(&Value, &Value) -> Ordering + Send + Sync>;

/// Case-insensitive first, then case-sensitive to keep the order total.
pub fn lexical_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Lexical ordering of the values' display strings, nulls first.
pub fn lexical() -> Comparator {
    Arc::new(|a, b| match (a, b) {
        (Value::String(a), Value::String(b)) => lexical_cmp(a, b),
        _ => nulls_first(a, b).unwrap_or_else(|| lexical_cmp(&a.to_string(), &b.to_string())),
    })
}

/// Natural ordering, falling back to display strings for incomparable values.
pub fn natural() -> Comparator {
    Arc::new(|a, b| {
        a.natural_cmp(b)
            .unwrap_or_else(|| a.to_string().cmp(&b.to_string()))
    })
}

/// Ordering of the values' display strings, nulls first.
pub fn display() -> Comparator {
    Arc::new(|a, b| nulls_first(a, b).unwrap_or_else(|| a.to_string().cmp(&b.to_string())))
}

/// Orders values by the caption of their item, lexically.
///
/// Values missing from the item list sort by their display string.
pub fn item_captions(items: Arc<[Item]>) -> Comparator {
    Arc::new(move |a, b| {
        let caption = |value: &Value| {
            items
                .iter()
                .find(|item| item.value() == value)
                .map(|item| item.caption().to_string())
                .unwrap_or_else(|| value.to_string())
        };
        lexical_cmp(&caption(a), &caption(b))
    })
}

fn nulls_first(a: &Value, b: &Value) -> Option<Ordering> {
    match (a.is_null(), b.is_null()) {
        (true, true) => Some(Ordering::Equal),
        (true, false) => Some(Ordering::Less),
        (false, true) => Some(Ordering::Greater),
        (false, false) => None,
    }
}
