//! Key generation strategies.

use std::sync::Arc;

use tracing::debug;

use super::{select_single, Connection, KeyGenerator};
use crate::definition::AttributeDefinition;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::value::Value;

/// Reads the key generated by an identity column after insert.
pub fn identity() -> Identity {
    Identity
}

/// Selects the next value of `sequence` before insert.
pub fn sequence(sequence: impl Into<String>) -> Sequence {
    Sequence {
        sequence: sequence.into(),
    }
}

/// Selects the value generated for `source` after insert.
pub fn automatic(source: impl Into<String>) -> Automatic {
    Automatic {
        source: source.into(),
    }
}

/// Selects the maximum key value plus one before insert.
pub fn increment() -> Increment {
    Increment
}

/// Runs `query` before insert.
pub fn queried(query: impl Into<String>) -> Queried {
    Queried {
        query: query.into(),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Identity;

impl KeyGenerator for Identity {
    fn inserted(&self) -> bool {
        false
    }

    fn returns_generated_keys(&self) -> bool {
        true
    }

    fn after_insert(&self, entity: &mut Entity, connection: &mut dyn Connection) -> Result<()> {
        let definition = primary_key(entity)?;
        let column_name = column_name(&definition)?;
        let value = connection
            .generated_keys(&[column_name])?
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::NoData(format!("no generated key returned for {}", column_name))
            })?;
        set_key(entity, &definition, value)
    }
}

#[derive(Debug, Clone)]
pub struct Sequence {
    sequence: String,
}

impl Sequence {
    pub fn name(&self) -> &str {
        &self.sequence
    }
}

impl KeyGenerator for Sequence {
    fn before_insert(&self, entity: &mut Entity, connection: &mut dyn Connection) -> Result<()> {
        let definition = primary_key(entity)?;
        if !entity.is_null(definition.attribute())? {
            return Ok(());
        }
        let query = connection.database().sequence_query(&self.sequence);
        let value = select_single(connection, &query)?;
        set_key(entity, &definition, value)
    }
}

#[derive(Debug, Clone)]
pub struct Automatic {
    source: String,
}

impl Automatic {
    /// The table or sequence the value is generated for.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl KeyGenerator for Automatic {
    fn inserted(&self) -> bool {
        false
    }

    fn after_insert(&self, entity: &mut Entity, connection: &mut dyn Connection) -> Result<()> {
        let definition = primary_key(entity)?;
        let query = connection.database().auto_increment_query(&self.source);
        let value = select_single(connection, &query)?;
        set_key(entity, &definition, value)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Increment;

impl KeyGenerator for Increment {
    fn before_insert(&self, entity: &mut Entity, connection: &mut dyn Connection) -> Result<()> {
        let definition = primary_key(entity)?;
        if !entity.is_null(definition.attribute())? {
            return Ok(());
        }
        let query = format!(
            "select max({}) + 1 from {}",
            column_name(&definition)?,
            entity.definition().table_name()
        );
        let value = match select_single(connection, &query)? {
            // empty table
            Value::Null => Value::Long(1),
            value => value,
        };
        set_key(entity, &definition, value)
    }
}

#[derive(Debug, Clone)]
pub struct Queried {
    query: String,
}

impl Queried {
    pub fn query(&self) -> &str {
        &self.query
    }
}

impl KeyGenerator for Queried {
    fn before_insert(&self, entity: &mut Entity, connection: &mut dyn Connection) -> Result<()> {
        let definition = primary_key(entity)?;
        if !entity.is_null(definition.attribute())? {
            return Ok(());
        }
        let value = select_single(connection, &self.query)?;
        set_key(entity, &definition, value)
    }
}

fn primary_key(entity: &Entity) -> Result<Arc<AttributeDefinition>> {
    entity
        .definition()
        .primary_key_definitions()
        .next()
        .cloned()
        .ok_or_else(|| {
            Error::InvalidState(format!(
                "entity {} has no primary key to generate",
                entity.entity_type()
            ))
        })
}

fn column_name(definition: &AttributeDefinition) -> Result<&str> {
    definition
        .as_column()
        .map(|column| column.column_name())
        .ok_or_else(|| Error::InvalidState(format!("{} is not a column", definition.attribute())))
}

fn set_key(entity: &mut Entity, definition: &AttributeDefinition, value: Value) -> Result<()> {
    let value = match definition.as_column() {
        Some(column) => column.codec().from_column(value)?,
        None => value,
    };
    let value = value.convert(definition.value_type())?;
    debug!(attribute = %definition.attribute(), value = %value, "generated key value");
    entity.set(definition.attribute(), value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{Attribute, EntityType};
    use crate::definition::ColumnDefinition;
    use crate::entity::{Domain, EntityDefinition};
    use crate::keygen::Database;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TestDatabase {
        queries: AtomicUsize,
    }

    impl Database for TestDatabase {
        fn name(&self) -> &str {
            "test"
        }

        fn auto_increment_query(&self, source: &str) -> String {
            format!("select currval('{}')", source)
        }

        fn sequence_query(&self, sequence: &str) -> String {
            format!("select nextval('{}')", sequence)
        }

        fn count_query(&self, _query: &str) {
            self.queries.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct TestConnection {
        database: TestDatabase,
        results: VecDeque<Vec<Value>>,
        executed: Vec<String>,
        generated: Vec<Value>,
    }

    impl TestConnection {
        fn returning(rows: Vec<Value>) -> Self {
            Self {
                results: VecDeque::from([rows]),
                ..Self::default()
            }
        }
    }

    impl Connection for TestConnection {
        fn database(&self) -> &dyn Database {
            &self.database
        }

        fn select(&mut self, query: &str) -> Result<Vec<Value>> {
            self.executed.push(query.to_string());
            Ok(self.results.pop_front().unwrap_or_default())
        }

        fn generated_keys(&mut self, _columns: &[&str]) -> Result<Vec<Value>> {
            Ok(std::mem::take(&mut self.generated))
        }
    }

    fn entity(generator: impl KeyGenerator + 'static) -> (Entity, Attribute) {
        let invoice = EntityType::new("invoice");
        let id = invoice.integer_attribute("id");
        let definition = EntityDefinition::builder(invoice.clone())
            .table_name("sales.invoice")
            .define(
                ColumnDefinition::primary_key(id.clone())
                    .column_name("invoice_id")
                    .key_generator(generator),
            )
            .unwrap()
            .build()
            .unwrap();
        let domain = Domain::builder("sales")
            .entity(definition)
            .unwrap()
            .build()
            .unwrap();
        (domain.entity(&invoice).unwrap(), id)
    }

    #[test]
    fn test_sequence() {
        let generator = sequence("invoice_seq");
        let (mut invoice, id) = entity(generator.clone());
        let mut connection = TestConnection::returning(vec![Value::Long(42)]);
        generator.before_insert(&mut invoice, &mut connection).unwrap();
        assert_eq!(invoice.get(&id).unwrap(), Value::Int(42));
        assert_eq!(connection.executed, vec!["select nextval('invoice_seq')"]);
        assert_eq!(connection.database.queries.load(Ordering::SeqCst), 1);

        // key already present
        generator.before_insert(&mut invoice, &mut connection).unwrap();
        assert_eq!(connection.executed.len(), 1);
        assert!(generator.inserted());
    }

    #[test]
    fn test_no_rows_and_too_many_rows() {
        let generator = queried("select next_invoice()");
        let (mut invoice, _) = entity(generator.clone());

        let mut empty = TestConnection::returning(vec![]);
        let error = generator.before_insert(&mut invoice, &mut empty).unwrap_err();
        assert!(error.is_no_data());

        let mut many = TestConnection::returning(vec![Value::Int(1), Value::Int(2)]);
        let error = generator.before_insert(&mut invoice, &mut many).unwrap_err();
        assert!(matches!(error, Error::InvalidData(_)));
    }

    #[test]
    fn test_increment() {
        let (mut invoice, id) = entity(increment());
        let mut connection = TestConnection::returning(vec![Value::Long(8)]);
        increment().before_insert(&mut invoice, &mut connection).unwrap();
        assert_eq!(invoice.get(&id).unwrap(), Value::Int(8));
        assert_eq!(
            connection.executed,
            vec!["select max(invoice_id) + 1 from sales.invoice"]
        );

        let (mut empty_table, id) = entity(increment());
        let mut connection = TestConnection::returning(vec![Value::Null]);
        increment().before_insert(&mut empty_table, &mut connection).unwrap();
        assert_eq!(empty_table.get(&id).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_automatic() {
        let generator = automatic("invoice");
        let (mut invoice, id) = entity(generator.clone());
        assert!(!generator.inserted());
        let mut connection = TestConnection::returning(vec![Value::Int(7)]);
        generator.after_insert(&mut invoice, &mut connection).unwrap();
        assert_eq!(invoice.get(&id).unwrap(), Value::Int(7));
        assert_eq!(connection.executed, vec!["select currval('invoice')"]);
    }

    #[test]
    fn test_identity() {
        let (mut invoice, id) = entity(identity());
        assert!(identity().returns_generated_keys());
        let mut connection = TestConnection {
            generated: vec![Value::Long(3)],
            ..TestConnection::default()
        };
        identity().after_insert(&mut invoice, &mut connection).unwrap();
        assert_eq!(invoice.get(&id).unwrap(), Value::Int(3));

        let error = identity().after_insert(&mut invoice, &mut connection).unwrap_err();
        assert!(error.is_no_data());
    }

    #[test]
    fn test_key_generator_relaxes_nullability_of_new_entities() {
        use crate::validation::EntityValidator;

        let (invoice, _) = entity(identity());
        assert!(invoice.definition().key_generator().is_some());
        assert!(EntityValidator::new().is_valid(&invoice));
    }
}
