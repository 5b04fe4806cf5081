//! Derived attribute definitions.

use std::fmt;
use std::sync::Arc;

use super::builder::{BaseDefinition, DefinitionBuilder};
use super::{AttributeDefinition, DefinitionKind};
use crate::attribute::Attribute;
use crate::derived::{DenormalizedProvider, ValueProvider};
use crate::error::{Error, Result};
use crate::foreign_key::ForeignKey;

/// A value computed from source attributes of the same entity.
#[derive(Clone)]
pub struct DerivedDefinition {
    sources: Vec<Attribute>,
    provider: Arc<dyn ValueProvider>,
    cached: bool,
}

impl DerivedDefinition {
    /// Start building a derived attribute computed by `provider` from
    /// `sources`.
    ///
    /// Sources must belong to the attribute's entity type and may not
    /// include the attribute itself.
    pub fn builder(
        attribute: Attribute,
        sources: impl IntoIterator<Item = Attribute>,
        provider: impl ValueProvider + 'static,
    ) -> Result<DerivedDefinitionBuilder> {
        Self::with_provider(attribute, sources.into_iter().collect(), Arc::new(provider))
    }

    /// A derived attribute reading `attribute` of the entity referenced by
    /// `foreign_key`. Never cached.
    pub fn denormalized(
        attribute: Attribute,
        foreign_key: &ForeignKey,
        denormalized: Attribute,
    ) -> Result<DerivedDefinitionBuilder> {
        if denormalized.entity_type() != foreign_key.referenced_type() {
            return Err(Error::InvalidArgument(format!(
                "{} is not an attribute of {}, referenced by {}",
                denormalized,
                foreign_key.referenced_type(),
                foreign_key
            )));
        }
        if denormalized.value_type() != attribute.value_type() {
            return Err(Error::InvalidArgument(format!(
                "value type of {} ({}) does not match {} ({})",
                attribute,
                attribute.value_type(),
                denormalized,
                denormalized.value_type()
            )));
        }
        let provider = DenormalizedProvider::new(foreign_key.attribute().clone(), denormalized);
        Self::with_provider(
            attribute,
            vec![foreign_key.attribute().clone()],
            Arc::new(provider),
        )
    }

    fn with_provider(
        attribute: Attribute,
        sources: Vec<Attribute>,
        provider: Arc<dyn ValueProvider>,
    ) -> Result<DerivedDefinitionBuilder> {
        for (index, source) in sources.iter().enumerate() {
            if source == &attribute {
                return Err(Error::InvalidArgument(format!(
                    "derived attribute {} can not be derived from itself",
                    attribute
                )));
            }
            if source.entity_type() != attribute.entity_type() {
                return Err(Error::InvalidArgument(format!(
                    "source attribute {} must be of entity type {}",
                    source,
                    attribute.entity_type()
                )));
            }
            if sources[..index].contains(source) {
                return Err(Error::InvalidArgument(format!(
                    "source attribute {} appears more than once in {}",
                    source, attribute
                )));
            }
        }
        let cached = !sources.is_empty() && !provider.is_denormalized();

        Ok(DerivedDefinitionBuilder {
            base: BaseDefinition::new(attribute),
            derived: DerivedDefinition {
                sources,
                provider,
                cached,
            },
        })
    }

    /// The source attributes, in declaration order.
    pub fn sources(&self) -> &[Attribute] {
        &self.sources
    }

    pub fn provider(&self) -> &Arc<dyn ValueProvider> {
        &self.provider
    }

    /// Whether computed values are cached until a source changes.
    pub fn cached(&self) -> bool {
        self.cached
    }

    pub fn is_denormalized(&self) -> bool {
        self.provider.is_denormalized()
    }
}

impl fmt::Debug for DerivedDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedDefinition")
            .field("sources", &self.sources)
            .field("cached", &self.cached)
            .finish_non_exhaustive()
    }
}

/// Builds a derived [`AttributeDefinition`].
pub struct DerivedDefinitionBuilder {
    base: BaseDefinition,
    derived: DerivedDefinition,
}

impl DerivedDefinitionBuilder {
    /// Enable or disable caching.
    ///
    /// Derived attributes without sources or reading through a foreign key
    /// can not be cached.
    pub fn cached(mut self, cached: bool) -> Result<Self> {
        if cached && self.derived.sources.is_empty() {
            return Err(Error::InvalidState(format!(
                "derived attribute {} has no source attributes and can not be cached",
                self.base.attribute
            )));
        }
        if cached && self.derived.provider.is_denormalized() {
            return Err(Error::InvalidState(format!(
                "denormalized attribute {} can not be cached",
                self.base.attribute
            )));
        }
        self.derived.cached = cached;
        Ok(self)
    }
}

impl DefinitionBuilder for DerivedDefinitionBuilder {
    fn base(&mut self) -> &mut BaseDefinition {
        &mut self.base
    }

    fn build(self) -> Result<AttributeDefinition> {
        Ok(AttributeDefinition::new(
            self.base,
            DefinitionKind::Derived(self.derived),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::EntityType;
    use crate::derived::SourceValues;
    use crate::value::Value;

    fn sum(values: &SourceValues<'_>) -> Result<Value> {
        let mut total = 0.0;
        for source in values.sources() {
            total += values.get(source)?.as_f64().unwrap_or(0.0);
        }
        Ok(Value::Double(total))
    }

    #[test]
    fn test_cached_by_default() {
        let employee = EntityType::new("employee");
        let salary = employee.double_attribute("salary");
        let commission = employee.double_attribute("commission");
        let total = employee.double_attribute("total");

        let definition = DerivedDefinition::builder(total, [salary, commission], sum)
            .unwrap()
            .build()
            .unwrap();
        let derived = definition.as_derived().unwrap();
        assert!(derived.cached());
        assert_eq!(derived.sources().len(), 2);
        assert!(!derived.is_denormalized());
    }

    #[test]
    fn test_no_sources_is_not_cached() {
        let employee = EntityType::new("employee");
        let now = employee.date_time_attribute("now");
        let builder = DerivedDefinition::builder(now, [], |_: &SourceValues<'_>| Ok(Value::Null))
            .unwrap();
        assert!(matches!(builder.cached(true), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_self_source() {
        let employee = EntityType::new("employee");
        let total = employee.double_attribute("total");
        let result = DerivedDefinition::builder(total.clone(), [total], sum);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_foreign_source() {
        let employee = EntityType::new("employee");
        let department = EntityType::new("department");
        let result = DerivedDefinition::builder(
            employee.double_attribute("total"),
            [department.double_attribute("budget")],
            sum,
        );
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_denormalized_is_never_cached() {
        let employee = EntityType::new("employee");
        let department = EntityType::new("department");
        let fk = ForeignKey::single(
            &employee,
            "department_fk",
            employee.integer_attribute("department_id"),
            department.integer_attribute("id"),
        )
        .unwrap();

        let builder = DerivedDefinition::denormalized(
            employee.string_attribute("department_name"),
            &fk,
            department.string_attribute("name"),
        )
        .unwrap();
        assert!(matches!(builder.cached(true), Err(Error::InvalidState(_))));

        let definition = DerivedDefinition::denormalized(
            employee.string_attribute("department_name"),
            &fk,
            department.string_attribute("name"),
        )
        .unwrap()
        .build()
        .unwrap();
        let derived = definition.as_derived().unwrap();
        assert!(!derived.cached());
        assert!(derived.is_denormalized());
        assert_eq!(derived.sources(), &[fk.attribute().clone()]);
    }

    #[test]
    fn test_denormalized_wrong_entity_type() {
        let employee = EntityType::new("employee");
        let department = EntityType::new("department");
        let fk = ForeignKey::single(
            &employee,
            "department_fk",
            employee.integer_attribute("department_id"),
            department.integer_attribute("id"),
        )
        .unwrap();
        let result = DerivedDefinition::denormalized(
            employee.string_attribute("department_name"),
            &fk,
            employee.string_attribute("name"),
        );
        assert!(result.is_err());
    }
}
