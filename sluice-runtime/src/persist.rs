//! Entity persistence: INSERT, UPDATE and DELETE over one table schema.
//!
//! All statement texts are rendered once at construction. A table without
//! a primary key gets no update or delete text; calling those operations
//! is a configuration error reported before any SQL is issued.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use sluice_query::dialect::Dialect;
use sluice_query::error::{SluiceError, SluiceResult};
use sluice_query::field::TableSchema;
use sluice_query::value::SqlValue;

use crate::driver::{Connection, ConnectionSupplier, Statement};

/// Executes write operations for one table.
pub struct SqlPersistence<E> {
    schema: Arc<TableSchema<E>>,
    supplier: Arc<dyn ConnectionSupplier>,
    insert_sql: String,
    update_sql: Option<String>,
    delete_sql: Option<String>,
}

impl<E> SqlPersistence<E> {
    /// Build the persistence layer for a table, rendering all statement
    /// texts up front.
    pub fn new(
        schema: Arc<TableSchema<E>>,
        dialect: &dyn Dialect,
        supplier: Arc<dyn ConnectionSupplier>,
    ) -> Self {
        let table = dialect.full_name(schema.db_schema(), schema.table());

        let insert_fields: Vec<_> = schema
            .fields()
            .iter()
            .filter(|f| !schema.is_generated(f.name()))
            .collect();
        let columns = insert_fields
            .iter()
            .map(|f| dialect.quote(f.column()))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=insert_fields.len())
            .map(|i| dialect.placeholder(i))
            .collect::<Vec<_>>()
            .join(", ");
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table, columns, placeholders
        );

        let (update_sql, delete_sql) = if schema.has_primary_key() {
            let pk: Vec<_> = schema.primary_key_fields().collect();
            let set_fields: Vec<_> = schema
                .fields()
                .iter()
                .filter(|f| pk.iter().all(|k| k.name() != f.name()))
                .collect();

            let assignments = set_fields
                .iter()
                .enumerate()
                .map(|(i, f)| format!("{} = {}", dialect.quote(f.column()), dialect.placeholder(i + 1)))
                .collect::<Vec<_>>()
                .join(", ");
            let update_where = pk
                .iter()
                .enumerate()
                .map(|(i, f)| {
                    format!(
                        "{} = {}",
                        dialect.quote(f.column()),
                        dialect.placeholder(set_fields.len() + i + 1)
                    )
                })
                .collect::<Vec<_>>()
                .join(" AND ");
            let delete_where = pk
                .iter()
                .enumerate()
                .map(|(i, f)| format!("{} = {}", dialect.quote(f.column()), dialect.placeholder(i + 1)))
                .collect::<Vec<_>>()
                .join(" AND ");

            (
                Some(format!(
                    "UPDATE {} SET {} WHERE {}",
                    table, assignments, update_where
                )),
                Some(format!("DELETE FROM {} WHERE {}", table, delete_where)),
            )
        } else {
            (None, None)
        };

        Self {
            schema,
            supplier,
            insert_sql,
            update_sql,
            delete_sql,
        }
    }

    /// The rendered INSERT text.
    pub fn insert_sql(&self) -> &str {
        &self.insert_sql
    }

    /// The rendered UPDATE text, absent without a primary key.
    pub fn update_sql(&self) -> Option<&str> {
        self.update_sql.as_deref()
    }

    /// The rendered DELETE text, absent without a primary key.
    pub fn delete_sql(&self) -> Option<&str> {
        self.delete_sql.as_deref()
    }

    fn acquire(&self) -> SluiceResult<(Box<dyn Connection>, Box<dyn Statement>)> {
        let mut conn = self.supplier.connection()?;
        let stmt = conn.statement()?;
        Ok((conn, stmt))
    }

    fn release(mut conn: Box<dyn Connection>, mut stmt: Box<dyn Statement>) {
        if let Err(e) = stmt.close() {
            warn!(error = %e, "releasing statement failed");
        }
        if let Err(e) = conn.close() {
            warn!(error = %e, "releasing connection failed");
        }
    }

    /// Insert an entity and populate its database-generated fields.
    ///
    /// Generated keys are consumed positionally: the driver's first
    /// reported key goes to the first declared generated field, and so
    /// on.
    pub fn insert(&self, entity: &mut E) -> SluiceResult<()> {
        let params: Vec<SqlValue> = self
            .schema
            .fields()
            .iter()
            .filter(|f| !self.schema.is_generated(f.name()))
            .map(|f| f.get(entity))
            .collect();

        let (conn, mut stmt) = self.acquire()?;
        let result = self.insert_on(&mut *stmt, entity, params);
        Self::release(conn, stmt);
        result
    }

    fn insert_on(
        &self,
        stmt: &mut dyn Statement,
        entity: &mut E,
        params: Vec<SqlValue>,
    ) -> SluiceResult<()> {
        stmt.execute_update(&self.insert_sql, &params)?;

        let generated = self.schema.generated_fields();
        if !generated.is_empty() {
            let keys = stmt.generated_keys()?;
            if keys.len() < generated.len() {
                return Err(SluiceError::execution(format!(
                    "driver returned {} generated keys for {} generated fields",
                    keys.len(),
                    generated.len()
                )));
            }
            for (field, key) in generated.iter().zip(keys) {
                field.populate(entity, key);
            }
        }

        debug!(table = self.schema.table(), "entity inserted");
        Ok(())
    }

    /// Update an entity by primary key. Returns the affected-row count.
    pub fn update(&self, entity: &E) -> SluiceResult<u64> {
        let sql = self.update_sql.as_deref().ok_or_else(|| {
            SluiceError::configuration(format!(
                "table '{}' has no primary key; update is not possible",
                self.schema.table()
            ))
        })?;

        let pk: Vec<_> = self.schema.primary_key_fields().collect();
        let mut params: Vec<SqlValue> = self
            .schema
            .fields()
            .iter()
            .filter(|f| pk.iter().all(|k| k.name() != f.name()))
            .map(|f| f.get(entity))
            .collect();
        params.extend(pk.iter().map(|f| f.get(entity)));

        self.run_update(sql, &params)
    }

    /// Delete an entity by primary key. Returns the affected-row count.
    pub fn remove(&self, entity: &E) -> SluiceResult<u64> {
        let sql = self.delete_sql.as_deref().ok_or_else(|| {
            SluiceError::configuration(format!(
                "table '{}' has no primary key; delete is not possible",
                self.schema.table()
            ))
        })?;

        let params: Vec<SqlValue> = self
            .schema
            .primary_key_fields()
            .map(|f| f.get(entity))
            .collect();

        self.run_update(sql, &params)
    }

    fn run_update(&self, sql: &str, params: &[SqlValue]) -> SluiceResult<u64> {
        let (conn, mut stmt) = self.acquire()?;
        let result = stmt.execute_update(sql, params);
        Self::release(conn, stmt);
        let affected = result?;
        debug!(table = self.schema.table(), affected, "write executed");
        Ok(affected)
    }
}

impl<E> fmt::Debug for SqlPersistence<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlPersistence")
            .field("table", &self.schema.table())
            .field("insert_sql", &self.insert_sql)
            .field("update_sql", &self.update_sql)
            .field("delete_sql", &self.delete_sql)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSupplier;
    use pretty_assertions::assert_eq;
    use sluice_query::dialect::StandardDialect;
    use sluice_query::field::{DbType, Field, GeneratedField};

    #[derive(Debug, Clone, PartialEq)]
    struct User {
        id: i64,
        name: String,
    }

    fn id_field() -> Field<User> {
        Field::new("id", "id", DbType::BigInt, |u: &User| u.id.into())
    }

    fn name_field() -> Field<User> {
        Field::new("name", "name", DbType::Text, |u: &User| {
            SqlValue::from(u.name.clone())
        })
    }

    fn keyed_schema() -> Arc<TableSchema<User>> {
        Arc::new(
            TableSchema::builder("users")
                .field(id_field())
                .field(name_field())
                .primary_key("id")
                .generated(GeneratedField::new(
                    id_field(),
                    |u: &mut User, v| u.id = v.as_i64().unwrap_or_default(),
                    SqlValue::Int,
                ))
                .build(),
        )
    }

    fn keyless_schema() -> Arc<TableSchema<User>> {
        Arc::new(
            TableSchema::builder("audit_log")
                .field(id_field())
                .field(name_field())
                .build(),
        )
    }

    fn persistence(
        schema: Arc<TableSchema<User>>,
        supplier: Arc<MockSupplier>,
    ) -> SqlPersistence<User> {
        SqlPersistence::new(schema, &StandardDialect, supplier as Arc<dyn ConnectionSupplier>)
    }

    // ========== Statement Text Tests ==========

    #[test]
    fn test_rendered_statement_texts() {
        let supplier = Arc::new(MockSupplier::new(vec![], Vec::new()));
        let p = persistence(keyed_schema(), supplier);

        assert_eq!(p.insert_sql(), "INSERT INTO \"users\" (\"name\") VALUES ($1)");
        assert_eq!(
            p.update_sql().unwrap(),
            "UPDATE \"users\" SET \"name\" = $1 WHERE \"id\" = $2"
        );
        assert_eq!(
            p.delete_sql().unwrap(),
            "DELETE FROM \"users\" WHERE \"id\" = $1"
        );
    }

    #[test]
    fn test_keyless_table_has_no_write_by_key_texts() {
        let supplier = Arc::new(MockSupplier::new(vec![], Vec::new()));
        let p = persistence(keyless_schema(), supplier);
        assert!(p.update_sql().is_none());
        assert!(p.delete_sql().is_none());
        assert_eq!(
            p.insert_sql(),
            "INSERT INTO \"audit_log\" (\"id\", \"name\") VALUES ($1, $2)"
        );
    }

    // ========== Insert Tests ==========

    #[test]
    fn test_insert_populates_generated_key() {
        let supplier =
            Arc::new(MockSupplier::new(vec![], Vec::new()).with_generated_keys(vec![42]));
        let p = persistence(keyed_schema(), Arc::clone(&supplier));

        let mut user = User { id: 0, name: "Ann".into() };
        p.insert(&mut user).unwrap();
        assert_eq!(user.id, 42);

        let updates = supplier.executed_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "INSERT INTO \"users\" (\"name\") VALUES ($1)");
        assert_eq!(updates[0].1, vec![SqlValue::String("Ann".into())]);
    }

    #[test]
    fn test_insert_missing_generated_key_is_execution_error() {
        let supplier = Arc::new(MockSupplier::new(vec![], Vec::new()));
        let p = persistence(keyed_schema(), supplier);

        let mut user = User { id: 0, name: "Ann".into() };
        let err = p.insert(&mut user).unwrap_err();
        assert!(err.is_execution());
        assert_eq!(user.id, 0);
    }

    // ========== Update / Remove Tests ==========

    #[test]
    fn test_update_binds_set_then_key() {
        let supplier = Arc::new(MockSupplier::new(vec![], Vec::new()));
        let p = persistence(keyed_schema(), Arc::clone(&supplier));

        let affected = p.update(&User { id: 7, name: "Bea".into() }).unwrap();
        assert_eq!(affected, 1);

        let updates = supplier.executed_updates();
        assert_eq!(
            updates[0].0,
            "UPDATE \"users\" SET \"name\" = $1 WHERE \"id\" = $2"
        );
        assert_eq!(
            updates[0].1,
            vec![SqlValue::String("Bea".into()), SqlValue::Int(7)]
        );
    }

    #[test]
    fn test_remove_binds_key() {
        let supplier = Arc::new(MockSupplier::new(vec![], Vec::new()));
        let p = persistence(keyed_schema(), Arc::clone(&supplier));

        p.remove(&User { id: 7, name: "Bea".into() }).unwrap();
        let updates = supplier.executed_updates();
        assert_eq!(updates[0].0, "DELETE FROM \"users\" WHERE \"id\" = $1");
        assert_eq!(updates[0].1, vec![SqlValue::Int(7)]);
    }

    #[test]
    fn test_keyless_update_and_remove_are_configuration_errors() {
        let supplier = Arc::new(MockSupplier::new(vec![], Vec::new()));
        let p = persistence(keyless_schema(), Arc::clone(&supplier));
        let user = User { id: 1, name: "Ann".into() };

        assert!(p.update(&user).unwrap_err().is_configuration());
        assert!(p.remove(&user).unwrap_err().is_configuration());
        // no SQL was issued for either call
        assert!(supplier.executed_updates().is_empty());
    }
}
