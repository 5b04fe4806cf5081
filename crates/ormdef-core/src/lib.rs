//! ORMDEF Core - Attribute definitions, derived values and foreign keys.
//!
//! This crate describes the attributes of entity types and keeps entity
//! values consistent: derived attributes are computed from their sources
//! and cached, and foreign keys propagate referenced key values to their
//! local columns.

pub mod attribute;
pub mod codec;
pub mod config;
pub mod definition;
pub mod derived;
pub mod entity;
pub mod error;
pub mod foreign_key;
pub mod keygen;
pub mod resource;
pub mod validation;
pub mod value;

pub use attribute::{Attribute, EntityType, ValueType};
pub use config::DomainConfig;
pub use definition::{
    AttributeDefinition, ColumnDefinition, DefinitionBuilder, DefinitionKind, DerivedDefinition,
    ForeignKeyDefinition, Format, Item, NumberFormat, RoundingMode, TransientDefinition,
};
pub use derived::{SourceValues, ValueProvider};
pub use entity::{Domain, Entity, EntityDefinition, Key};
pub use error::{Error, Result, ValidationError, ValidationKind};
pub use foreign_key::{ForeignKey, Reference};
pub use validation::EntityValidator;
pub use value::Value;

// Collaborator traits
pub use codec::{ColumnType, Converter, ResultRow, Statement};
pub use keygen::{Connection, Database, KeyGenerator};
pub use resource::{ResourceBundle, ResourceLookup};
