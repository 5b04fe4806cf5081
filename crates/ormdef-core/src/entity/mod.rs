//! Entity definitions, domains and entity instances.
//!
//! An [`EntityDefinition`] collects the attribute definitions of one entity
//! type and indexes their dependencies once. A [`Domain`] holds the entity
//! definitions that reference each other, and creates [`Entity`] instances
//! whose values are kept consistent with those dependencies.

mod definition;
mod domain;
mod instance;
mod key;

pub use definition::{EntityDefinition, EntityDefinitionBuilder, StringProvider};
pub use domain::{Domain, DomainBuilder};
pub use instance::Entity;
pub use key::Key;
