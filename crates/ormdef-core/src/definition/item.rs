//! Items: the closed set of values an attribute may take.

use std::fmt;

use crate::attribute::Attribute;
use crate::error::{Error, Result};
use crate::value::Value;

/// A value paired with its display caption.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    value: Value,
    caption: String,
}

impl Item {
    pub fn new(value: impl Into<Value>, caption: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            caption: caption.into(),
        }
    }

    /// An item whose caption is the value's display form.
    pub fn of(value: impl Into<Value>) -> Self {
        let value = value.into();
        let caption = value.to_string();
        Self { value, caption }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.caption)
    }
}

/// Check that every item value fits the attribute and none repeats.
pub(crate) fn validate_items(attribute: &Attribute, items: &[Item]) -> Result<()> {
    for (index, item) in items.iter().enumerate() {
        if !attribute.value_type().accepts(item.value()) {
            return Err(Error::InvalidArgument(format!(
                "item value {} ({}) is not a valid {} value for {}",
                item.value(),
                item.value().type_name(),
                attribute.value_type(),
                attribute
            )));
        }
        if items[..index].iter().any(|other| other.value() == item.value()) {
            return Err(Error::InvalidArgument(format!(
                "item list contains duplicate values: {}",
                attribute
            )));
        }
    }
    Ok(())
}
