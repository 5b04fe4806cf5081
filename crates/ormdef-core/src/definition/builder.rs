//! Builder methods shared by every kind of attribute definition.

use std::sync::Arc;

use super::comparator::Comparator;
use super::format::{validate_pattern, Format, LocaleDateTimePattern, NumberFormat, RoundingMode};
use super::item::Item;
use super::AttributeDefinition;
use crate::attribute::{Attribute, ValueType};
use crate::config::{self, DomainConfig};
use crate::error::{Error, Result};
use crate::value::Value;

/// Properties common to every attribute definition.
///
/// Accumulated by a builder and then owned by the built definition.
#[doc(hidden)]
#[derive(Clone)]
pub struct BaseDefinition {
    pub(crate) attribute: Attribute,
    pub(crate) config: Arc<DomainConfig>,
    pub(crate) caption: Option<String>,
    pub(crate) caption_resource_key: String,
    pub(crate) description: Option<String>,
    pub(crate) description_resource_key: Option<String>,
    pub(crate) mnemonic: Option<char>,
    pub(crate) hidden: bool,
    pub(crate) nullable: bool,
    pub(crate) default_value: Value,
    pub(crate) maximum_length: i32,
    pub(crate) minimum_value: Option<f64>,
    pub(crate) maximum_value: Option<f64>,
    pub(crate) trim: bool,
    pub(crate) format: Option<Format>,
    pub(crate) date_time_pattern: Option<String>,
    pub(crate) locale_date_time_pattern: Option<LocaleDateTimePattern>,
    pub(crate) decimal_rounding_mode: RoundingMode,
    pub(crate) items: Option<Arc<[Item]>>,
    pub(crate) comparator: Option<Comparator>,
}

impl BaseDefinition {
    pub(crate) fn new(attribute: Attribute) -> Self {
        let config = config::global();
        let value_type = attribute.value_type();
        let hidden = !attribute
            .entity_type()
            .resource_bundle()
            .is_some_and(|bundle| bundle.contains(attribute.name()));
        let (minimum_value, maximum_value) = default_range(value_type);
        let format = value_type
            .is_numeric()
            .then(|| Format::Number(NumberFormat::for_type(value_type, &config)));

        Self {
            caption_resource_key: attribute.name().to_string(),
            decimal_rounding_mode: config.decimal_rounding_mode,
            caption: None,
            description: None,
            description_resource_key: None,
            mnemonic: None,
            hidden,
            nullable: true,
            default_value: Value::Null,
            maximum_length: -1,
            minimum_value,
            maximum_value,
            trim: false,
            format,
            date_time_pattern: None,
            locale_date_time_pattern: None,
            items: None,
            comparator: None,
            config,
            attribute,
        }
    }

    fn value_type(&self) -> &ValueType {
        self.attribute.value_type()
    }

    fn require(&self, applicable: bool, what: &str) -> Result<()> {
        if applicable {
            Ok(())
        } else {
            Err(Error::InvalidState(format!(
                "{} is not applicable to {} ({})",
                what,
                self.attribute,
                self.value_type()
            )))
        }
    }

    fn number_format(&mut self, what: &str) -> Result<&mut NumberFormat> {
        match &mut self.format {
            Some(Format::Number(number)) => Ok(number),
            _ => Err(Error::InvalidState(format!(
                "{} requires a number format on {}",
                what, self.attribute
            ))),
        }
    }

    fn resolve_resource(&self, key: &str) -> Result<String> {
        let bundle = self.attribute.entity_type().resource_bundle().ok_or_else(|| {
            Error::InvalidState(format!(
                "entity type {} has no resource bundle",
                self.attribute.entity_type()
            ))
        })?;
        bundle.get(key).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "resource '{}' not found in bundle {}",
                key,
                bundle.name()
            ))
        })
    }
}

fn default_range(value_type: &ValueType) -> (Option<f64>, Option<f64>) {
    match value_type {
        ValueType::Short => (Some(i16::MIN as f64), Some(i16::MAX as f64)),
        ValueType::Integer => (Some(i32::MIN as f64), Some(i32::MAX as f64)),
        ValueType::Long => (Some(i64::MIN as f64), Some(i64::MAX as f64)),
        ValueType::Double => (Some(f64::MIN), Some(f64::MAX)),
        _ => (None, None),
    }
}

/// Builds an [`AttributeDefinition`].
///
/// Methods restricted to certain value types fail with
/// [`Error::InvalidState`] when the attribute has another type.
pub trait DefinitionBuilder: Sized {
    #[doc(hidden)]
    fn base(&mut self) -> &mut BaseDefinition;

    /// Build the definition.
    fn build(self) -> Result<AttributeDefinition>;

    /// Set the caption. No caption hides the attribute, a caption shows it.
    fn caption(mut self, caption: Option<&str>) -> Self {
        let base = self.base();
        base.caption = caption.map(str::to_string);
        base.hidden = base.caption.is_none();
        self
    }

    /// Look the caption up in the entity type's resource bundle under `key`.
    fn caption_resource_key(mut self, key: &str) -> Result<Self> {
        let base = self.base();
        if base.caption.is_some() {
            return Err(Error::InvalidState(format!(
                "caption has already been set for {}",
                base.attribute
            )));
        }
        base.resolve_resource(key)?;
        base.caption_resource_key = key.to_string();
        base.hidden = false;
        Ok(self)
    }

    fn description(mut self, description: &str) -> Self {
        self.base().description = Some(description.to_string());
        self
    }

    /// Look the description up in the entity type's resource bundle.
    fn description_resource_key(mut self, key: &str) -> Result<Self> {
        let base = self.base();
        if base.description.is_some() {
            return Err(Error::InvalidState(format!(
                "description has already been set for {}",
                base.attribute
            )));
        }
        base.resolve_resource(key)?;
        base.description_resource_key = Some(key.to_string());
        Ok(self)
    }

    fn mnemonic(mut self, mnemonic: char) -> Self {
        self.base().mnemonic = Some(mnemonic);
        self
    }

    /// Use the first character of a resource string as mnemonic.
    fn mnemonic_resource_key(mut self, key: &str) -> Result<Self> {
        let base = self.base();
        let resolved = base.resolve_resource(key)?;
        let mnemonic = resolved.chars().next().ok_or_else(|| {
            Error::InvalidArgument(format!("mnemonic resource '{}' is empty", key))
        })?;
        base.mnemonic = Some(mnemonic);
        Ok(self)
    }

    fn hidden(mut self, hidden: bool) -> Self {
        self.base().hidden = hidden;
        self
    }

    fn nullable(mut self, nullable: bool) -> Self {
        self.base().nullable = nullable;
        self
    }

    /// The value of this attribute in a new entity.
    fn default_value(mut self, value: impl Into<Value>) -> Result<Self> {
        let base = self.base();
        let value = value.into();
        if !base.value_type().accepts(&value) {
            return Err(Error::InvalidArgument(format!(
                "default value {} ({}) is not a valid {} value for {}",
                value,
                value.type_name(),
                base.value_type(),
                base.attribute
            )));
        }
        base.default_value = value;
        Ok(self)
    }

    /// Maximum string length, must be positive.
    fn maximum_length(mut self, maximum_length: i32) -> Result<Self> {
        let base = self.base();
        base.require(base.value_type().is_string(), "maximum_length")?;
        if maximum_length <= 0 {
            return Err(Error::InvalidArgument(format!(
                "maximum length must be positive: {}",
                maximum_length
            )));
        }
        base.maximum_length = maximum_length;
        Ok(self)
    }

    /// Trim string values when they are set.
    fn trim(mut self, trim: bool) -> Result<Self> {
        let base = self.base();
        base.require(base.value_type().is_string(), "trim")?;
        base.trim = trim;
        Ok(self)
    }

    /// Inclusive value range; either bound may be absent.
    fn value_range(mut self, minimum: Option<f64>, maximum: Option<f64>) -> Result<Self> {
        let base = self.base();
        base.require(base.value_type().is_numeric(), "value_range")?;
        if let (Some(minimum), Some(maximum)) = (minimum, maximum) {
            if minimum > maximum {
                return Err(Error::InvalidArgument(format!(
                    "minimum value {} exceeds maximum value {}",
                    minimum, maximum
                )));
            }
        }
        base.minimum_value = minimum;
        base.maximum_value = maximum;
        Ok(self)
    }

    fn minimum_value(mut self, minimum: f64) -> Result<Self> {
        let maximum = self.base().maximum_value;
        self.value_range(Some(minimum), maximum)
    }

    fn maximum_value(mut self, maximum: f64) -> Result<Self> {
        let minimum = self.base().minimum_value;
        self.value_range(minimum, Some(maximum))
    }

    fn number_format_grouping(mut self, grouping: bool) -> Result<Self> {
        let base = self.base();
        base.require(base.value_type().is_numeric(), "number_format_grouping")?;
        let number = base.number_format("number_format_grouping")?;
        *number = number.clone().with_grouping(grouping);
        Ok(self)
    }

    /// Replace the format. Numeric attributes require a number format,
    /// temporal attributes use date/time patterns instead.
    fn format(mut self, format: Format) -> Result<Self> {
        let base = self.base();
        if base.value_type().is_temporal() {
            return Err(Error::InvalidState(format!(
                "use a date/time pattern to format temporal attribute {}",
                base.attribute
            )));
        }
        if base.value_type().is_numeric() && format.as_number().is_none() {
            return Err(Error::InvalidState(format!(
                "numeric attribute {} requires a number format",
                base.attribute
            )));
        }
        base.format = Some(format);
        Ok(self)
    }

    /// A strftime pattern for temporal values.
    fn date_time_pattern(mut self, pattern: &str) -> Result<Self> {
        let base = self.base();
        base.require(base.value_type().is_temporal(), "date_time_pattern")?;
        if base.locale_date_time_pattern.is_some() {
            return Err(Error::InvalidState(format!(
                "locale date/time pattern has already been set for {}",
                base.attribute
            )));
        }
        validate_pattern(pattern)?;
        base.date_time_pattern = Some(pattern.to_string());
        Ok(self)
    }

    fn locale_date_time_pattern(mut self, pattern: LocaleDateTimePattern) -> Result<Self> {
        let base = self.base();
        base.require(base.value_type().is_temporal(), "locale_date_time_pattern")?;
        if base.date_time_pattern.is_some() {
            return Err(Error::InvalidState(format!(
                "date/time pattern has already been set for {}",
                base.attribute
            )));
        }
        base.locale_date_time_pattern = Some(pattern);
        Ok(self)
    }

    fn maximum_fraction_digits(mut self, digits: u32) -> Result<Self> {
        let base = self.base();
        base.require(base.value_type().is_decimal(), "maximum_fraction_digits")?;
        let number = base.number_format("maximum_fraction_digits")?;
        *number = number.clone().with_maximum_fraction_digits(digits);
        Ok(self)
    }

    fn decimal_rounding_mode(mut self, mode: RoundingMode) -> Result<Self> {
        let base = self.base();
        base.require(base.value_type().is_decimal(), "decimal_rounding_mode")?;
        base.decimal_rounding_mode = mode;
        if let Some(Format::Number(number)) = &mut base.format {
            *number = number.clone().with_rounding_mode(mode);
        }
        Ok(self)
    }

    /// Order values with `comparator` instead of the default ordering.
    fn comparator(mut self, comparator: Comparator) -> Self {
        self.base().comparator = Some(comparator);
        self
    }
}
