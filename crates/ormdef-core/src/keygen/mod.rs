//! Primary key generation.
//!
//! A [`KeyGenerator`] fills in the primary key of an entity either before it
//! is inserted, by querying the database, or after, by reading the value the
//! database generated. Queries go through the [`Connection`] collaborator;
//! the SQL dialect comes from its [`Database`].

mod generators;

use tracing::debug;

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::value::Value;

pub use generators::{
    automatic, identity, increment, queried, sequence, Automatic, Identity, Increment, Queried,
    Sequence,
};

/// The SQL dialect of a database.
pub trait Database: Send + Sync {
    fn name(&self) -> &str;

    /// Query selecting the last value generated for `source`, a table or
    /// sequence depending on the database.
    fn auto_increment_query(&self, source: &str) -> String;

    /// Query selecting the next value of `sequence`.
    fn sequence_query(&self, sequence: &str) -> String;

    /// Called for every query run on behalf of key generation.
    fn count_query(&self, _query: &str) {}
}

/// A database connection as seen by key generators.
pub trait Connection {
    fn database(&self) -> &dyn Database;

    /// Run `query`, returning the first column of every row.
    fn select(&mut self, query: &str) -> Result<Vec<Value>>;

    /// Values generated by the last insert for `columns`.
    fn generated_keys(&mut self, columns: &[&str]) -> Result<Vec<Value>>;
}

/// Produces primary key values for an entity type.
pub trait KeyGenerator: Send + Sync {
    /// Whether the primary key columns are included in inserts.
    fn inserted(&self) -> bool {
        true
    }

    /// Whether the insert statement must return generated keys.
    fn returns_generated_keys(&self) -> bool {
        false
    }

    /// Prepare `entity` for insert.
    fn before_insert(&self, _entity: &mut Entity, _connection: &mut dyn Connection) -> Result<()> {
        Ok(())
    }

    /// Complete `entity` after insert.
    fn after_insert(&self, _entity: &mut Entity, _connection: &mut dyn Connection) -> Result<()> {
        Ok(())
    }
}

/// Run `query`, which must return exactly one row.
///
/// No rows is [`Error::NoData`], more than one is [`Error::InvalidData`].
pub fn select_single(connection: &mut dyn Connection, query: &str) -> Result<Value> {
    {
        let database = connection.database();
        database.count_query(query);
        debug!(database = database.name(), query, "selecting key value");
    }
    let mut rows = connection.select(query)?;
    match rows.len() {
        0 => Err(Error::NoData(format!("no rows returned: {}", query))),
        1 => Ok(rows.remove(0)),
        count => Err(Error::InvalidData(format!(
            "{} rows returned where one was expected: {}",
            count, query
        ))),
    }
}
