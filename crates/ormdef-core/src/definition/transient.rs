//! Transient attribute definitions.

use super::builder::{BaseDefinition, DefinitionBuilder};
use super::{AttributeDefinition, DefinitionKind};
use crate::attribute::Attribute;
use crate::error::Result;

/// A value held only in memory, never stored.
#[derive(Debug, Clone)]
pub struct TransientDefinition {
    modifies: bool,
}

impl TransientDefinition {
    pub fn builder(attribute: Attribute) -> TransientDefinitionBuilder {
        TransientDefinitionBuilder {
            base: BaseDefinition::new(attribute),
            transient: TransientDefinition { modifies: true },
        }
    }

    /// Whether changing the value marks the entity as modified.
    pub fn modifies(&self) -> bool {
        self.modifies
    }
}

/// Builds a transient [`AttributeDefinition`].
pub struct TransientDefinitionBuilder {
    base: BaseDefinition,
    transient: TransientDefinition,
}

impl TransientDefinitionBuilder {
    pub fn modifies(mut self, modifies: bool) -> Self {
        self.transient.modifies = modifies;
        self
    }
}

impl DefinitionBuilder for TransientDefinitionBuilder {
    fn base(&mut self) -> &mut BaseDefinition {
        &mut self.base
    }

    fn build(self) -> Result<AttributeDefinition> {
        Ok(AttributeDefinition::new(
            self.base,
            DefinitionKind::Transient(self.transient),
        ))
    }
}
