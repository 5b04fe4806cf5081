//! Domain-wide defaults applied when building attribute definitions.
//!
//! Builders snapshot the process-wide configuration when they are created, so
//! changing it afterwards only affects definitions built from then on.

use std::path::Path;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::definition::{validate_pattern, RoundingMode};
use crate::error::{Error, Result};

static GLOBAL: LazyLock<RwLock<Arc<DomainConfig>>> =
    LazyLock::new(|| RwLock::new(Arc::new(DomainConfig::default())));

/// The process-wide configuration.
pub fn global() -> Arc<DomainConfig> {
    GLOBAL.read().clone()
}

/// Replace the process-wide configuration.
///
/// Fails with [`Error::Config`] if `config` does not validate.
pub fn set_global(config: DomainConfig) -> Result<()> {
    config.validate()?;
    *GLOBAL.write() = Arc::new(config);
    Ok(())
}

/// Defaults for formatting, comparison and foreign key metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    /// Default strftime pattern for dates.
    pub date_pattern: String,

    /// Default strftime pattern for times.
    pub time_pattern: String,

    /// Default strftime pattern for date-times.
    pub date_time_pattern: String,

    /// Default strftime pattern for date-times with an offset.
    pub offset_date_time_pattern: String,

    /// Maximum fraction digits for decimal attributes.
    pub maximum_fraction_digits: u32,

    /// Rounding applied when a decimal value exceeds its fraction digits.
    pub decimal_rounding_mode: RoundingMode,

    /// Whether number formats group integer digits.
    pub number_format_grouping: bool,

    /// Grouping separator. None uses ','.
    pub grouping_separator: Option<char>,

    /// Decimal separator. None uses '.'.
    pub decimal_separator: Option<char>,

    /// Compare strings case-insensitively first.
    pub use_lexical_string_comparator: bool,

    /// Default foreign key reference depth, -1 for unlimited.
    pub foreign_key_reference_depth: i32,

    /// Appended to values not found among an attribute's items.
    pub invalid_item_suffix: String,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            date_pattern: "%d-%m-%Y".to_string(),
            time_pattern: "%H:%M".to_string(),
            date_time_pattern: "%d-%m-%Y %H:%M".to_string(),
            offset_date_time_pattern: "%d-%m-%Y %H:%M %z".to_string(),
            maximum_fraction_digits: 10,
            decimal_rounding_mode: RoundingMode::HalfEven,
            number_format_grouping: false,
            grouping_separator: None,
            decimal_separator: None,
            use_lexical_string_comparator: true,
            foreign_key_reference_depth: 1,
            invalid_item_suffix: " <invalid>".to_string(),
        }
    }
}

impl DomainConfig {
    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Check the temporal patterns and the reference depth.
    pub fn validate(&self) -> Result<()> {
        for pattern in [
            &self.date_pattern,
            &self.time_pattern,
            &self.date_time_pattern,
            &self.offset_date_time_pattern,
        ] {
            checked_pattern(pattern)?;
        }
        checked_depth(self.foreign_key_reference_depth)?;
        Ok(())
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn with_date_pattern(mut self, pattern: impl Into<String>) -> Result<Self> {
        self.date_pattern = pattern.into();
        checked_pattern(&self.date_pattern)?;
        Ok(self)
    }

    pub fn with_time_pattern(mut self, pattern: impl Into<String>) -> Result<Self> {
        self.time_pattern = pattern.into();
        checked_pattern(&self.time_pattern)?;
        Ok(self)
    }

    pub fn with_date_time_pattern(mut self, pattern: impl Into<String>) -> Result<Self> {
        self.date_time_pattern = pattern.into();
        checked_pattern(&self.date_time_pattern)?;
        Ok(self)
    }

    pub fn with_offset_date_time_pattern(mut self, pattern: impl Into<String>) -> Result<Self> {
        self.offset_date_time_pattern = pattern.into();
        checked_pattern(&self.offset_date_time_pattern)?;
        Ok(self)
    }

    pub fn with_maximum_fraction_digits(mut self, digits: u32) -> Self {
        self.maximum_fraction_digits = digits;
        self
    }

    pub fn with_decimal_rounding_mode(mut self, mode: RoundingMode) -> Self {
        self.decimal_rounding_mode = mode;
        self
    }

    pub fn with_number_format_grouping(mut self, grouping: bool) -> Self {
        self.number_format_grouping = grouping;
        self
    }

    pub fn with_grouping_separator(mut self, separator: char) -> Self {
        self.grouping_separator = Some(separator);
        self
    }

    pub fn with_decimal_separator(mut self, separator: char) -> Self {
        self.decimal_separator = Some(separator);
        self
    }

    pub fn with_lexical_string_comparator(mut self, lexical: bool) -> Self {
        self.use_lexical_string_comparator = lexical;
        self
    }

    /// Set the default reference depth, -1 for unlimited.
    pub fn with_foreign_key_reference_depth(mut self, depth: i32) -> Result<Self> {
        self.foreign_key_reference_depth = checked_depth(depth)?;
        Ok(self)
    }

    pub fn with_invalid_item_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.invalid_item_suffix = suffix.into();
        self
    }
}

fn checked_pattern(pattern: &str) -> Result<()> {
    validate_pattern(pattern)
        .map_err(|_| Error::Config(format!("invalid date/time pattern: '{}'", pattern)))
}

fn checked_depth(depth: i32) -> Result<i32> {
    if depth < -1 {
        return Err(Error::Config(format!(
            "foreign key reference depth must be at least -1: {}",
            depth
        )));
    }
    Ok(depth)
}
