//! Attribute definitions.
//!
//! An [`AttributeDefinition`] describes how one attribute of an entity type
//! is obtained, validated, formatted and ordered. The common part is shared
//! by every definition; the [`DefinitionKind`] carries what is specific to
//! columns, derived attributes, foreign keys and transient attributes.
//!
//! Definitions are created through consuming builders and are immutable
//! once built. Captions, date/time patterns and comparators are resolved
//! lazily on first use and then cached.

mod builder;
mod column;
pub mod comparator;
mod derived;
mod format;
mod item;
mod reference;
mod transient;

use std::cmp::Ordering;
use std::fmt::{self, Write};
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use tracing::debug;

use crate::attribute::{Attribute, EntityType, ValueType};
use crate::config::DomainConfig;
use crate::value::Value;

pub use builder::{BaseDefinition, DefinitionBuilder};
pub(crate) use format::validate_pattern;
pub use column::{ColumnDefinition, ColumnDefinitionBuilder};
pub use comparator::Comparator;
pub use derived::{DerivedDefinition, DerivedDefinitionBuilder};
pub use format::{
    DateOrder, Format, LocaleDateTimePattern, NumberFormat, RoundingMode, TimePrecision,
};
pub use item::Item;
pub use reference::{ForeignKeyDefinition, ForeignKeyDefinitionBuilder};
pub use transient::{TransientDefinition, TransientDefinitionBuilder};

/// What kind of attribute a definition describes.
pub enum DefinitionKind {
    /// A value stored in a table column.
    Column(ColumnDefinition),
    /// A value computed from other attributes of the same entity.
    Derived(DerivedDefinition),
    /// A reference to another entity, backed by local columns.
    ForeignKey(ForeignKeyDefinition),
    /// A value held only in memory.
    Transient(TransientDefinition),
}

impl DefinitionKind {
    fn name(&self) -> &'static str {
        match self {
            DefinitionKind::Column(_) => "column",
            DefinitionKind::Derived(_) => "derived",
            DefinitionKind::ForeignKey(_) => "foreign key",
            DefinitionKind::Transient(_) => "transient",
        }
    }
}

/// The definition of one attribute.
pub struct AttributeDefinition {
    base: BaseDefinition,
    kind: DefinitionKind,
    resource_caption: OnceLock<Option<String>>,
    resource_description: OnceLock<Option<String>>,
    resolved_pattern: OnceLock<String>,
    resolved_comparator: OnceLock<Comparator>,
}

impl AttributeDefinition {
    pub(crate) fn new(base: BaseDefinition, kind: DefinitionKind) -> Self {
        debug!(
            attribute = %base.attribute,
            kind = kind.name(),
            "built attribute definition"
        );
        Self {
            base,
            kind,
            resource_caption: OnceLock::new(),
            resource_description: OnceLock::new(),
            resolved_pattern: OnceLock::new(),
            resolved_comparator: OnceLock::new(),
        }
    }

    /// The attribute this definition describes.
    pub fn attribute(&self) -> &Attribute {
        &self.base.attribute
    }

    pub fn entity_type(&self) -> &EntityType {
        self.base.attribute.entity_type()
    }

    pub fn value_type(&self) -> &ValueType {
        self.base.attribute.value_type()
    }

    pub fn kind(&self) -> &DefinitionKind {
        &self.kind
    }

    /// The configuration this definition was built with.
    pub fn config(&self) -> &DomainConfig {
        &self.base.config
    }

    pub fn as_column(&self) -> Option<&ColumnDefinition> {
        match &self.kind {
            DefinitionKind::Column(column) => Some(column),
            _ => None,
        }
    }

    pub fn as_derived(&self) -> Option<&DerivedDefinition> {
        match &self.kind {
            DefinitionKind::Derived(derived) => Some(derived),
            _ => None,
        }
    }

    pub fn as_foreign_key(&self) -> Option<&ForeignKeyDefinition> {
        match &self.kind {
            DefinitionKind::ForeignKey(foreign_key) => Some(foreign_key),
            _ => None,
        }
    }

    pub fn as_transient(&self) -> Option<&TransientDefinition> {
        match &self.kind {
            DefinitionKind::Transient(transient) => Some(transient),
            _ => None,
        }
    }

    pub fn is_column(&self) -> bool {
        self.as_column().is_some()
    }

    pub fn is_derived(&self) -> bool {
        self.as_derived().is_some()
    }

    pub fn is_foreign_key(&self) -> bool {
        self.as_foreign_key().is_some()
    }

    pub fn is_transient(&self) -> bool {
        self.as_transient().is_some()
    }

    /// The caption.
    ///
    /// A non-empty resource string takes precedence over an explicit
    /// caption, which takes precedence over the attribute name.
    pub fn caption(&self) -> &str {
        if let Some(bundle) = self.entity_type().resource_bundle() {
            let resolved = self.resource_caption.get_or_init(|| {
                bundle
                    .get(&self.base.caption_resource_key)
                    .filter(|caption| !caption.is_empty())
            });
            if let Some(caption) = resolved {
                return caption;
            }
        }
        self.base
            .caption
            .as_deref()
            .unwrap_or_else(|| self.base.attribute.name())
    }

    pub fn description(&self) -> Option<&str> {
        if let (Some(bundle), Some(key)) = (
            self.entity_type().resource_bundle(),
            &self.base.description_resource_key,
        ) {
            let resolved = self
                .resource_description
                .get_or_init(|| bundle.get(key).filter(|d| !d.is_empty()));
            if let Some(description) = resolved {
                return Some(description);
            }
        }
        self.base.description.as_deref()
    }

    pub fn mnemonic(&self) -> Option<char> {
        self.base.mnemonic
    }

    pub fn hidden(&self) -> bool {
        self.base.hidden
    }

    pub fn nullable(&self) -> bool {
        self.base.nullable
    }

    /// The value of this attribute in a new entity.
    pub fn default_value(&self) -> &Value {
        &self.base.default_value
    }

    pub fn has_default_value(&self) -> bool {
        !self.base.default_value.is_null()
    }

    /// Maximum string length, -1 when unbounded.
    pub fn maximum_length(&self) -> i32 {
        self.base.maximum_length
    }

    pub fn minimum_value(&self) -> Option<f64> {
        self.base.minimum_value
    }

    pub fn maximum_value(&self) -> Option<f64> {
        self.base.maximum_value
    }

    pub fn trim(&self) -> bool {
        self.base.trim
    }

    pub fn format(&self) -> Option<&Format> {
        self.base.format.as_ref()
    }

    /// Maximum fraction digits of the number format, -1 without one.
    pub fn maximum_fraction_digits(&self) -> i32 {
        match &self.base.format {
            Some(Format::Number(number)) => number.maximum_fraction_digits() as i32,
            _ => -1,
        }
    }

    pub fn decimal_rounding_mode(&self) -> RoundingMode {
        self.base.decimal_rounding_mode
    }

    /// The strftime pattern used for temporal values, `None` for other types.
    pub fn date_time_pattern(&self) -> Option<&str> {
        let value_type = self.value_type();
        if !value_type.is_temporal() {
            return None;
        }
        let pattern = self.resolved_pattern.get_or_init(|| {
            let config = &self.base.config;
            if let Some(pattern) = &self.base.date_time_pattern {
                return pattern.clone();
            }
            match (&self.base.locale_date_time_pattern, value_type) {
                (Some(locale), ValueType::Date) => locale.date_pattern(),
                (Some(locale), ValueType::Time) => locale
                    .time_pattern()
                    .unwrap_or_else(|| config.time_pattern.clone()),
                (Some(locale), _) => locale.date_time_pattern(),
                (None, ValueType::Date) => config.date_pattern.clone(),
                (None, ValueType::Time) => config.time_pattern.clone(),
                (None, ValueType::OffsetDateTime) => config.offset_date_time_pattern.clone(),
                (None, _) => config.date_time_pattern.clone(),
            }
        });
        Some(pattern)
    }

    /// The allowed values, if restricted.
    pub fn items(&self) -> Option<&[Item]> {
        self.base.items.as_deref()
    }

    /// The item holding `value`, if any.
    pub fn item(&self, value: &Value) -> Option<&Item> {
        self.items()?.iter().find(|item| item.value() == value)
    }

    /// Whether `value` is allowed by the items. Null is allowed when nullable.
    pub fn is_valid_item(&self, value: &Value) -> bool {
        match self.items() {
            None => true,
            Some(_) if value.is_null() && self.base.nullable => true,
            Some(_) => self.item(value).is_some(),
        }
    }

    /// The comparator ordering values of this attribute.
    pub fn comparator(&self) -> &Comparator {
        self.resolved_comparator.get_or_init(|| {
            if let Some(comparator) = &self.base.comparator {
                return comparator.clone();
            }
            if let Some(items) = &self.base.items {
                return comparator::item_captions(items.clone());
            }
            let value_type = self.value_type();
            if value_type.is_string() && self.base.config.use_lexical_string_comparator {
                comparator::lexical()
            } else if value_type.is_comparable() {
                comparator::natural()
            } else {
                comparator::display()
            }
        })
    }

    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        (self.comparator())(a, b)
    }

    /// Render `value` for display.
    pub fn string_of(&self, value: &Value) -> String {
        if self.base.items.is_some() {
            return match self.item(value) {
                Some(item) => item.caption().to_string(),
                None if value.is_null() => String::new(),
                None => format!("{}{}", value, self.base.config.invalid_item_suffix),
            };
        }
        if value.is_null() {
            return String::new();
        }
        if let Some(pattern) = self.date_time_pattern() {
            if let Some(formatted) = format_temporal(value, pattern) {
                return formatted;
            }
        }
        match &self.base.format {
            Some(format) => format.format(value),
            None => value.to_string(),
        }
    }

    /// Normalize a value before it is stored.
    ///
    /// Doubles and decimals are rounded to the maximum fraction digits,
    /// strings are trimmed when trimming is enabled.
    pub fn prepare_value(&self, value: Value) -> Value {
        let digits = self.maximum_fraction_digits();
        let mode = self.base.decimal_rounding_mode;
        match value {
            Value::Double(d) if digits >= 0 => Value::Double(mode.round_double(d, digits as u32)),
            Value::Decimal(d) if digits >= 0 => Value::Decimal(mode.round_decimal(d, digits as u32)),
            Value::Decimal(d) => Value::Decimal(d.normalize()),
            Value::String(s) if self.base.trim => Value::String(s.trim().to_string()),
            other => other,
        }
    }
}

fn format_temporal(value: &Value, pattern: &str) -> Option<String> {
    let mut out = String::new();
    let written = match value {
        Value::Date(d) => write!(out, "{}", d.format(pattern)),
        Value::Time(t) => write!(out, "{}", t.format(pattern)),
        Value::DateTime(dt) => write!(out, "{}", dt.format(pattern)),
        Value::OffsetDateTime(dt) => write!(out, "{}", dt.format(pattern)),
        _ => return None,
    };
    written.ok().map(|_| out)
}

impl PartialEq for AttributeDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.base.attribute == other.base.attribute
    }
}

impl Eq for AttributeDefinition {}

impl Hash for AttributeDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.base.attribute.hash(state);
    }
}

impl fmt::Debug for AttributeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeDefinition")
            .field("attribute", &self.base.attribute)
            .field("kind", &self.kind.name())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for AttributeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.caption())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::resource::MemoryResources;
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::Arc;

    fn employee() -> EntityType {
        EntityType::new("employee")
    }

    #[test]
    fn test_caption_and_hidden() {
        let name = employee().string_attribute("name");
        let hidden = ColumnDefinition::builder(name.clone()).build().unwrap();
        assert!(hidden.hidden());
        assert_eq!(hidden.caption(), "name");

        let shown = ColumnDefinition::builder(name.clone())
            .caption(Some("Name"))
            .build()
            .unwrap();
        assert!(!shown.hidden());
        assert_eq!(shown.caption(), "Name");

        let cleared = ColumnDefinition::builder(name)
            .caption(Some("Name"))
            .caption(None)
            .build()
            .unwrap();
        assert!(cleared.hidden());
    }

    #[test]
    fn test_resource_caption() {
        let bundle = MemoryResources::new()
            .with_entry("employee", "name", "Employee name")
            .with_entry("employee", "salary_caption", "Salary")
            .with_entry("employee", "salary_mnemonic", "S")
            .bundle("employee");
        let employee = EntityType::with_resource_bundle("employee", bundle);

        let name = ColumnDefinition::builder(employee.string_attribute("name"))
            .build()
            .unwrap();
        assert!(!name.hidden());
        assert_eq!(name.caption(), "Employee name");

        let salary = ColumnDefinition::builder(employee.double_attribute("salary"))
            .caption_resource_key("salary_caption")
            .unwrap()
            .mnemonic_resource_key("salary_mnemonic")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(salary.caption(), "Salary");
        assert_eq!(salary.mnemonic(), Some('S'));

        let missing = ColumnDefinition::builder(employee.string_attribute("job"))
            .caption_resource_key("job_caption");
        assert!(matches!(missing, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_resource_key_without_bundle() {
        let result = ColumnDefinition::builder(employee().string_attribute("name"))
            .caption_resource_key("name");
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_resource_key_after_caption() {
        let bundle = MemoryResources::new()
            .with_entry("employee", "name", "Name")
            .bundle("employee");
        let employee = EntityType::with_resource_bundle("employee", bundle);
        let result = ColumnDefinition::builder(employee.string_attribute("name"))
            .caption(Some("Explicit"))
            .caption_resource_key("name");
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_type_restricted_builders() {
        let employee = employee();
        let name = || ColumnDefinition::builder(employee.string_attribute("name"));
        let salary = || ColumnDefinition::builder(employee.double_attribute("salary"));
        let hired = || ColumnDefinition::builder(employee.date_attribute("hired"));

        assert!(matches!(
            salary().maximum_length(10),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(salary().trim(true), Err(Error::InvalidState(_))));
        assert!(matches!(
            name().value_range(Some(0.0), Some(1.0)),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            name().maximum_fraction_digits(2),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            name().date_time_pattern("%Y"),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            hired().number_format_grouping(true),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            ColumnDefinition::builder(employee.integer_attribute("id"))
                .decimal_rounding_mode(RoundingMode::Up),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_invalid_arguments() {
        let employee = employee();
        assert!(matches!(
            ColumnDefinition::builder(employee.string_attribute("name")).maximum_length(0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            ColumnDefinition::builder(employee.double_attribute("salary"))
                .value_range(Some(10.0), Some(1.0)),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            ColumnDefinition::builder(employee.integer_attribute("id")).default_value("one"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            ColumnDefinition::builder(employee.date_attribute("hired")).date_time_pattern("%Q"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_pattern_conflicts() {
        let hired = EntityType::new("employee").date_attribute("hired");
        let result = ColumnDefinition::builder(hired.clone())
            .date_time_pattern("%Y")
            .unwrap()
            .locale_date_time_pattern(LocaleDateTimePattern::new(DateOrder::YearMonthDay));
        assert!(matches!(result, Err(Error::InvalidState(_))));

        let result = ColumnDefinition::builder(hired)
            .locale_date_time_pattern(LocaleDateTimePattern::new(DateOrder::YearMonthDay))
            .unwrap()
            .date_time_pattern("%Y");
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_temporal_string_of() {
        let employee = employee();
        let hired = ColumnDefinition::builder(employee.date_attribute("hired"))
            .build()
            .unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(hired.string_of(&Value::Date(date)), "09-03-2024");
        assert_eq!(hired.date_time_pattern(), Some("%d-%m-%Y"));

        let local = ColumnDefinition::builder(employee.date_attribute("left"))
            .locale_date_time_pattern(
                LocaleDateTimePattern::new(DateOrder::YearMonthDay).with_delimiter('/'),
            )
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(local.string_of(&Value::Date(date)), "2024/03/09");

        let updated = ColumnDefinition::builder(employee.date_time_attribute("updated"))
            .date_time_pattern("%Y-%m-%dT%H:%M")
            .unwrap()
            .build()
            .unwrap();
        let timestamp =
            NaiveDateTime::parse_from_str("2024-03-09 14:05:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(
            updated.string_of(&Value::DateTime(timestamp)),
            "2024-03-09T14:05"
        );
        assert_eq!(updated.string_of(&Value::Null), "");
    }

    #[test]
    fn test_number_string_of() {
        let salary = ColumnDefinition::builder(employee().double_attribute("salary"))
            .maximum_fraction_digits(2)
            .unwrap()
            .number_format_grouping(true)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(salary.string_of(&Value::Double(1234.567)), "1,234.57");
        assert_eq!(salary.maximum_fraction_digits(), 2);

        let name = ColumnDefinition::builder(employee().string_attribute("name"))
            .build()
            .unwrap();
        assert_eq!(name.maximum_fraction_digits(), -1);
        assert_eq!(name.string_of(&Value::from("King")), "King");
    }

    #[test]
    fn test_custom_format() {
        let name = ColumnDefinition::builder(employee().string_attribute("name"))
            .format(Format::custom(|v| v.to_string().to_uppercase()))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(name.string_of(&Value::from("king")), "KING");

        let result = ColumnDefinition::builder(employee().integer_attribute("id"))
            .format(Format::custom(|v| v.to_string()));
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_prepare_value() {
        let salary = ColumnDefinition::builder(employee().double_attribute("salary"))
            .maximum_fraction_digits(2)
            .unwrap()
            .decimal_rounding_mode(RoundingMode::HalfUp)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(salary.prepare_value(Value::Double(1.006)), Value::Double(1.01));
        assert_eq!(salary.prepare_value(Value::Double(2.344)), Value::Double(2.34));

        let bonus = ColumnDefinition::builder(employee().decimal_attribute("bonus"))
            .maximum_fraction_digits(1)
            .unwrap()
            .build()
            .unwrap();
        let prepared = bonus.prepare_value(Value::Decimal(Decimal::from_str("3.25").unwrap()));
        assert_eq!(prepared.as_decimal().unwrap().to_string(), "3.2");

        let trimmed = ColumnDefinition::builder(employee().string_attribute("name"))
            .trim(true)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(trimmed.prepare_value(Value::from("  King ")), Value::from("King"));
    }

    #[test]
    fn test_default_comparators() {
        let employee = employee();
        let name = ColumnDefinition::builder(employee.string_attribute("name"))
            .build()
            .unwrap();
        assert_eq!(
            name.compare(&Value::from("adams"), &Value::from("Blake")),
            Ordering::Less
        );

        let id = ColumnDefinition::builder(employee.integer_attribute("id"))
            .build()
            .unwrap();
        assert_eq!(id.compare(&Value::Int(2), &Value::Int(10)), Ordering::Less);

        let reversed = ColumnDefinition::builder(employee.integer_attribute("rank"))
            .comparator(Arc::new(|a: &Value, b: &Value| {
                b.natural_cmp(a).unwrap_or(Ordering::Equal)
            }))
            .build()
            .unwrap();
        assert_eq!(
            reversed.compare(&Value::Int(2), &Value::Int(10)),
            Ordering::Greater
        );
    }

    #[test]
    fn test_default_range() {
        let id = ColumnDefinition::builder(employee().short_attribute("grade"))
            .build()
            .unwrap();
        assert_eq!(id.minimum_value(), Some(i16::MIN as f64));
        assert_eq!(id.maximum_value(), Some(i16::MAX as f64));

        let commission = ColumnDefinition::builder(employee().double_attribute("commission"))
            .minimum_value(0.0)
            .unwrap()
            .maximum_value(100.0)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(commission.minimum_value(), Some(0.0));
        assert_eq!(commission.maximum_value(), Some(100.0));
    }
}
