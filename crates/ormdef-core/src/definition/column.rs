//! Column definitions.

use std::fmt;
use std::sync::Arc;

use super::builder::{BaseDefinition, DefinitionBuilder};
use super::item::{validate_items, Item};
use super::{AttributeDefinition, DefinitionKind};
use crate::attribute::Attribute;
use crate::codec::{BooleanConverter, ColumnCodec, ColumnType, Converter, ResultRow, Statement};
use crate::error::{Error, Result};
use crate::keygen::KeyGenerator;
use crate::value::Value;

/// A value stored in a table column.
#[derive(Clone)]
pub struct ColumnDefinition {
    codec: ColumnCodec,
    column_name: String,
    column_expression: Option<String>,
    primary_key_index: Option<u32>,
    insertable: bool,
    updatable: bool,
    grouping: bool,
    aggregate: bool,
    selectable: bool,
    search_column: bool,
    column_has_default_value: bool,
    key_generator: Option<Arc<dyn KeyGenerator>>,
}

impl ColumnDefinition {
    /// Start building a column definition.
    pub fn builder(attribute: Attribute) -> ColumnDefinitionBuilder {
        let column = ColumnDefinition {
            codec: ColumnCodec::for_type(attribute.value_type()),
            column_name: attribute.name().to_string(),
            column_expression: None,
            primary_key_index: None,
            insertable: true,
            updatable: true,
            grouping: false,
            aggregate: false,
            selectable: true,
            search_column: false,
            column_has_default_value: false,
            key_generator: None,
        };
        ColumnDefinitionBuilder {
            base: BaseDefinition::new(attribute),
            column,
            read_only_locked: false,
        }
    }

    /// A single column primary key.
    pub fn primary_key(attribute: Attribute) -> ColumnDefinitionBuilder {
        Self::builder(attribute).primary_key_index(0)
    }

    /// A column restricted to the values of `items`.
    pub fn item_builder(attribute: Attribute, items: Vec<Item>) -> Result<ColumnDefinitionBuilder> {
        validate_items(&attribute, &items)?;
        let mut builder = Self::builder(attribute);
        builder.base.items = Some(items.into());
        Ok(builder)
    }

    /// A boolean column stored using `true_value` and `false_value`.
    pub fn boolean_builder(
        attribute: Attribute,
        column_type: ColumnType,
        true_value: impl Into<Value>,
        false_value: impl Into<Value>,
    ) -> Result<ColumnDefinitionBuilder> {
        if !attribute.value_type().is_boolean() {
            return Err(Error::InvalidArgument(format!(
                "{} is not a boolean attribute",
                attribute
            )));
        }
        let converter = BooleanConverter::new(true_value, false_value)?;
        Ok(Self::builder(attribute).column_type(column_type, Arc::new(converter)))
    }

    /// A read-only column selected with a subquery.
    pub fn subquery_builder(attribute: Attribute, subquery: &str) -> ColumnDefinitionBuilder {
        let mut builder = Self::builder(attribute);
        builder.column.column_expression = Some(format!("({})", subquery));
        builder.column.insertable = false;
        builder.column.updatable = false;
        builder.read_only_locked = true;
        builder
    }

    pub fn codec(&self) -> &ColumnCodec {
        &self.codec
    }

    pub fn column_type(&self) -> ColumnType {
        self.codec.column_type()
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    /// The expression used to select this column, the column name by default.
    pub fn column_expression(&self) -> &str {
        self.column_expression
            .as_deref()
            .unwrap_or(&self.column_name)
    }

    /// Position within the primary key, if part of it.
    pub fn primary_key_index(&self) -> Option<u32> {
        self.primary_key_index
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key_index.is_some()
    }

    pub fn insertable(&self) -> bool {
        self.insertable
    }

    pub fn updatable(&self) -> bool {
        self.updatable
    }

    /// Neither insertable nor updatable.
    pub fn read_only(&self) -> bool {
        !self.insertable && !self.updatable
    }

    pub fn grouping(&self) -> bool {
        self.grouping
    }

    pub fn aggregate(&self) -> bool {
        self.aggregate
    }

    pub fn selectable(&self) -> bool {
        self.selectable
    }

    pub fn search_column(&self) -> bool {
        self.search_column
    }

    /// Whether the database supplies a value when none is inserted.
    pub fn column_has_default_value(&self) -> bool {
        self.column_has_default_value
    }

    pub fn key_generator(&self) -> Option<&Arc<dyn KeyGenerator>> {
        self.key_generator.as_ref()
    }

    /// Read this column from `row`.
    pub fn fetch(&self, row: &dyn ResultRow, index: usize) -> Result<Value> {
        self.codec.fetch(row, index)
    }

    /// Bind a value of this column to `statement`.
    pub fn bind(&self, statement: &mut dyn Statement, index: usize, value: &Value) -> Result<()> {
        self.codec.bind(statement, index, value)
    }
}

impl fmt::Debug for ColumnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDefinition")
            .field("column_name", &self.column_name)
            .field("column_type", &self.codec.column_type())
            .field("primary_key_index", &self.primary_key_index)
            .field("insertable", &self.insertable)
            .field("updatable", &self.updatable)
            .finish_non_exhaustive()
    }
}

/// Builds a column [`AttributeDefinition`].
pub struct ColumnDefinitionBuilder {
    base: BaseDefinition,
    column: ColumnDefinition,
    read_only_locked: bool,
}

impl ColumnDefinitionBuilder {
    /// Make this column part of the primary key at `index`.
    ///
    /// Primary key columns are non-nullable and not updatable; later builder
    /// calls may override either.
    pub fn primary_key_index(mut self, index: u32) -> Self {
        self.column.primary_key_index = Some(index);
        self.base.nullable = false;
        self.column.updatable = false;
        self
    }

    pub fn column_name(mut self, column_name: impl Into<String>) -> Self {
        self.column.column_name = column_name.into();
        self
    }

    pub fn column_expression(mut self, expression: impl Into<String>) -> Result<Self> {
        self.check_unlocked("column_expression")?;
        self.column.column_expression = Some(expression.into());
        Ok(self)
    }

    /// Store values as `column_type` using `converter`.
    pub fn column_type(mut self, column_type: ColumnType, converter: Arc<dyn Converter>) -> Self {
        self.column.codec = ColumnCodec::new(column_type, converter);
        self
    }

    pub fn column_has_default_value(mut self, has_default: bool) -> Self {
        self.column.column_has_default_value = has_default;
        self
    }

    /// Neither insertable nor updatable when true.
    pub fn read_only(mut self, read_only: bool) -> Result<Self> {
        self.check_unlocked("read_only")?;
        self.column.insertable = !read_only;
        self.column.updatable = !read_only;
        Ok(self)
    }

    pub fn insertable(mut self, insertable: bool) -> Result<Self> {
        self.check_unlocked("insertable")?;
        self.column.insertable = insertable;
        Ok(self)
    }

    pub fn updatable(mut self, updatable: bool) -> Result<Self> {
        self.check_unlocked("updatable")?;
        self.column.updatable = updatable;
        Ok(self)
    }

    /// Marking a column as grouping clears the aggregate flag.
    pub fn grouping(mut self, grouping: bool) -> Self {
        self.column.grouping = grouping;
        if grouping {
            self.column.aggregate = false;
        }
        self
    }

    /// Marking a column as aggregate clears the grouping flag.
    pub fn aggregate(mut self, aggregate: bool) -> Self {
        self.column.aggregate = aggregate;
        if aggregate {
            self.column.grouping = false;
        }
        self
    }

    pub fn selectable(mut self, selectable: bool) -> Self {
        self.column.selectable = selectable;
        self
    }

    /// Include this column in text searches. String columns only.
    pub fn search_column(mut self, search_column: bool) -> Result<Self> {
        if !self.base.attribute.value_type().is_string() {
            return Err(Error::InvalidState(format!(
                "search column {} must be a string attribute",
                self.base.attribute
            )));
        }
        self.column.search_column = search_column;
        Ok(self)
    }

    pub fn key_generator(mut self, key_generator: impl KeyGenerator + 'static) -> Self {
        self.column.key_generator = Some(Arc::new(key_generator));
        self
    }

    fn check_unlocked(&self, what: &str) -> Result<()> {
        if self.read_only_locked {
            return Err(Error::InvalidState(format!(
                "{} can not be changed for subquery column {}",
                what, self.base.attribute
            )));
        }
        Ok(())
    }
}

impl DefinitionBuilder for ColumnDefinitionBuilder {
    fn base(&mut self) -> &mut BaseDefinition {
        &mut self.base
    }

    fn build(self) -> Result<AttributeDefinition> {
        Ok(AttributeDefinition::new(
            self.base,
            DefinitionKind::Column(self.column),
        ))
    }
}
