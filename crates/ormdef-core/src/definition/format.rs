//! Number and date/time formatting.

use std::fmt;
use std::sync::Arc;

use chrono::format::{Item, StrftimeItems};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::attribute::ValueType;
use crate::config::DomainConfig;
use crate::error::{Error, Result};
use crate::value::Value;

/// How decimal values are rounded to their maximum fraction digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Away from zero.
    Up,
    /// Towards zero.
    Down,
    /// Towards positive infinity.
    Ceiling,
    /// Towards negative infinity.
    Floor,
    /// To nearest, ties away from zero.
    HalfUp,
    /// To nearest, ties towards zero.
    HalfDown,
    /// To nearest, ties to the even neighbour.
    HalfEven,
}

impl RoundingMode {
    fn strategy(self) -> RoundingStrategy {
        match self {
            RoundingMode::Up => RoundingStrategy::AwayFromZero,
            RoundingMode::Down => RoundingStrategy::ToZero,
            RoundingMode::Ceiling => RoundingStrategy::ToPositiveInfinity,
            RoundingMode::Floor => RoundingStrategy::ToNegativeInfinity,
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::HalfDown => RoundingStrategy::MidpointTowardZero,
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
        }
    }

    /// Round a decimal to `digits` fraction digits, stripping trailing zeros.
    pub fn round_decimal(self, value: Decimal, digits: u32) -> Decimal {
        value
            .round_dp_with_strategy(digits, self.strategy())
            .normalize()
    }

    /// Round a double to `digits` fraction digits.
    ///
    /// Values without a decimal representation (NaN, infinities, magnitudes
    /// beyond 96 bits) are returned unchanged.
    pub fn round_double(self, value: f64, digits: u32) -> f64 {
        Decimal::from_f64(value)
            .map(|d| self.round_decimal(d, digits))
            .and_then(|d| d.to_f64())
            .unwrap_or(value)
    }
}

/// Formats numeric values with optional grouping and bounded fraction digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormat {
    grouping: bool,
    grouping_separator: char,
    decimal_separator: char,
    maximum_fraction_digits: u32,
    minimum_fraction_digits: u32,
    rounding_mode: RoundingMode,
    integer_only: bool,
}

impl NumberFormat {
    /// A format that renders whole numbers only.
    pub fn integer() -> Self {
        Self {
            grouping: false,
            grouping_separator: ',',
            decimal_separator: '.',
            maximum_fraction_digits: 0,
            minimum_fraction_digits: 0,
            rounding_mode: RoundingMode::HalfEven,
            integer_only: true,
        }
    }

    /// A format rendering at most `maximum_fraction_digits` fraction digits.
    pub fn decimal(maximum_fraction_digits: u32) -> Self {
        Self {
            maximum_fraction_digits,
            integer_only: false,
            ..Self::integer()
        }
    }

    /// The default format for a numeric value type under `config`.
    pub fn for_type(value_type: &ValueType, config: &DomainConfig) -> Self {
        let format = if value_type.is_decimal() {
            Self::decimal(config.maximum_fraction_digits)
                .with_rounding_mode(config.decimal_rounding_mode)
        } else {
            Self::integer()
        };

        Self {
            grouping: config.number_format_grouping,
            grouping_separator: config.grouping_separator.unwrap_or(','),
            decimal_separator: config.decimal_separator.unwrap_or('.'),
            ..format
        }
    }

    pub fn with_grouping(mut self, grouping: bool) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn with_separators(mut self, grouping: char, decimal: char) -> Self {
        self.grouping_separator = grouping;
        self.decimal_separator = decimal;
        self
    }

    pub fn with_maximum_fraction_digits(mut self, digits: u32) -> Self {
        self.maximum_fraction_digits = digits;
        self.minimum_fraction_digits = self.minimum_fraction_digits.min(digits);
        self
    }

    pub fn with_minimum_fraction_digits(mut self, digits: u32) -> Self {
        self.minimum_fraction_digits = digits.min(self.maximum_fraction_digits);
        self
    }

    pub fn with_rounding_mode(mut self, mode: RoundingMode) -> Self {
        self.rounding_mode = mode;
        self
    }

    pub fn grouping(&self) -> bool {
        self.grouping
    }

    pub fn maximum_fraction_digits(&self) -> u32 {
        self.maximum_fraction_digits
    }

    pub fn rounding_mode(&self) -> RoundingMode {
        self.rounding_mode
    }

    /// Format a value. Non-numeric values use their display form.
    pub fn format(&self, value: &Value) -> String {
        match value {
            Value::Short(_) | Value::Int(_) | Value::Long(_) => match value.as_i64() {
                Some(i) => self.render(i < 0, &i.unsigned_abs().to_string(), ""),
                None => value.to_string(),
            },
            Value::Double(d) => match Decimal::from_f64(*d) {
                Some(decimal) => self.format_decimal(decimal),
                None => d.to_string(),
            },
            Value::Decimal(d) => self.format_decimal(*d),
            other => other.to_string(),
        }
    }

    fn format_decimal(&self, value: Decimal) -> String {
        let digits = if self.integer_only {
            0
        } else {
            self.maximum_fraction_digits
        };
        let rounded = self.rounding_mode.round_decimal(value, digits);
        let text = rounded.abs().to_string();
        let (integer, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));

        self.render(
            rounded.is_sign_negative() && !rounded.is_zero(),
            integer,
            fraction,
        )
    }

    fn render(&self, negative: bool, integer: &str, fraction: &str) -> String {
        let mut out = String::with_capacity(integer.len() * 2 + fraction.len() + 2);
        if negative {
            out.push('-');
        }

        let len = integer.len();
        for (i, c) in integer.chars().enumerate() {
            if self.grouping && i > 0 && (len - i) % 3 == 0 {
                out.push(self.grouping_separator);
            }
            out.push(c);
        }

        let padding = (self.minimum_fraction_digits as usize).saturating_sub(fraction.len());
        if !fraction.is_empty() || padding > 0 {
            out.push(self.decimal_separator);
            out.push_str(fraction);
            out.extend(std::iter::repeat('0').take(padding));
        }
        out
    }
}

/// Order of the date fields in a [`LocaleDateTimePattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    DayMonthYear,
    MonthDayYear,
    YearMonthDay,
}

/// Time fields included in a [`LocaleDateTimePattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimePrecision {
    HoursMinutes,
    HoursMinutesSeconds,
}

/// Builds date/time patterns from field order, delimiter and precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleDateTimePattern {
    order: DateOrder,
    delimiter: char,
    four_digit_year: bool,
    time: Option<TimePrecision>,
}

impl LocaleDateTimePattern {
    /// A date-only pattern with '-' as delimiter and a four digit year.
    pub fn new(order: DateOrder) -> Self {
        Self {
            order,
            delimiter: '-',
            four_digit_year: true,
            time: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_two_digit_year(mut self) -> Self {
        self.four_digit_year = false;
        self
    }

    pub fn with_time(mut self, precision: TimePrecision) -> Self {
        self.time = Some(precision);
        self
    }

    /// The date part of the pattern.
    pub fn date_pattern(&self) -> String {
        let year = if self.four_digit_year { "%Y" } else { "%y" };
        let fields = match self.order {
            DateOrder::DayMonthYear => ["%d", "%m", year],
            DateOrder::MonthDayYear => ["%m", "%d", year],
            DateOrder::YearMonthDay => [year, "%m", "%d"],
        };
        fields.join(&self.delimiter.to_string())
    }

    /// The time part of the pattern, if time fields are included.
    pub fn time_pattern(&self) -> Option<String> {
        self.time.map(|precision| match precision {
            TimePrecision::HoursMinutes => "%H:%M".to_string(),
            TimePrecision::HoursMinutesSeconds => "%H:%M:%S".to_string(),
        })
    }

    /// The full pattern: date followed by time when present.
    pub fn date_time_pattern(&self) -> String {
        match self.time_pattern() {
            Some(time) => format!("{} {}", self.date_pattern(), time),
            None => self.date_pattern(),
        }
    }
}

/// Reject strftime patterns chrono can not interpret.
pub(crate) fn validate_pattern(pattern: &str) -> Result<()> {
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(Error::InvalidArgument(format!(
            "invalid date/time pattern: '{}'",
            pattern
        )));
    }
    Ok(())
}

/// How an attribute renders its values.
#[derive(Clone)]
pub enum Format {
    /// A number format.
    Number(NumberFormat),
    /// A caller supplied formatting function.
    Custom(Arc<dyn Fn(&Value) -> String + Send + Sync>),
}

impl Format {
    /// Wrap a formatting function.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        Format::Custom(Arc::new(f))
    }

    /// Format a non-null value.
    pub fn format(&self, value: &Value) -> String {
        match self {
            Format::Number(number) => number.format(value),
            Format::Custom(f) => f(value),
        }
    }

    pub fn as_number(&self) -> Option<&NumberFormat> {
        match self {
            Format::Number(number) => Some(number),
            Format::Custom(_) => None,
        }
    }
}

impl fmt::Debug for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Number(number) => f.debug_tuple("Number").field(number).finish(),
            Format::Custom(_) => f.write_str("Custom"),
        }
    }
}
