//! Field and table metadata: the typed bridge between entity structs and
//! database columns.
//!
//! A [`Field`] knows its column identifier, its database type and how to
//! read itself out of an entity. Fields are the only way to build
//! translatable predicates and sort keys, which is what lets the optimizer
//! decompose a pipeline back into SQL.
//!
//! # Example
//!
//! ```rust
//! use sluice_query::field::{DbType, Field, TableSchema};
//! use sluice_query::value::SqlValue;
//!
//! #[derive(Clone)]
//! struct User { id: i64, name: String }
//!
//! let id = Field::new("id", "id", DbType::BigInt, |u: &User| u.id.into());
//! let name = Field::new("name", "name", DbType::Text, |u: &User| {
//!     SqlValue::from(u.name.clone())
//! });
//!
//! let schema = TableSchema::builder("users")
//!     .field(id.clone())
//!     .field(name)
//!     .primary_key("id")
//!     .build();
//!
//! assert_eq!(schema.table(), "users");
//! assert!(schema.has_primary_key());
//! ```

use std::fmt;
use std::sync::Arc;

use crate::compare::{SortKey, SortOrder};
use crate::error::{SluiceError, SluiceResult};
use crate::predicate::{CompareOp, Predicate};
use crate::value::SqlValue;

/// Database type tag for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbType {
    /// 32-bit integer column.
    Integer,
    /// 64-bit integer column.
    BigInt,
    /// Double-precision float column.
    Double,
    /// Text column.
    Text,
    /// Boolean column.
    Boolean,
    /// JSON column.
    Json,
}

/// Reads a field value out of an entity.
pub type Getter<E> = Arc<dyn Fn(&E) -> SqlValue + Send + Sync>;

/// Writes a field value back into an entity.
pub type Setter<E> = Arc<dyn Fn(&mut E, SqlValue) + Send + Sync>;

/// A single entity field bound to a database column.
pub struct Field<E> {
    name: &'static str,
    column: &'static str,
    db_type: DbType,
    getter: Getter<E>,
}

impl<E> Field<E> {
    /// Create a new field.
    pub fn new(
        name: &'static str,
        column: &'static str,
        db_type: DbType,
        getter: impl Fn(&E) -> SqlValue + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            column,
            db_type,
            getter: Arc::new(getter),
        }
    }

    /// The field name in the entity.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The column identifier in the database.
    pub fn column(&self) -> &'static str {
        self.column
    }

    /// The database type of the column.
    pub fn db_type(&self) -> DbType {
        self.db_type
    }

    /// Read this field's value out of an entity, converted to its database
    /// representation.
    pub fn get(&self, entity: &E) -> SqlValue {
        (self.getter)(entity)
    }

    // ----- predicate constructors -----

    /// Field equals the given value.
    pub fn eq(&self, value: impl Into<SqlValue>) -> Predicate<E> {
        Predicate::compare(self.clone(), CompareOp::Eq, value)
    }

    /// Field does not equal the given value.
    pub fn ne(&self, value: impl Into<SqlValue>) -> Predicate<E> {
        Predicate::compare(self.clone(), CompareOp::Ne, value)
    }

    /// Field is less than the given value.
    pub fn lt(&self, value: impl Into<SqlValue>) -> Predicate<E> {
        Predicate::compare(self.clone(), CompareOp::Lt, value)
    }

    /// Field is less than or equal to the given value.
    pub fn le(&self, value: impl Into<SqlValue>) -> Predicate<E> {
        Predicate::compare(self.clone(), CompareOp::Le, value)
    }

    /// Field is greater than the given value.
    pub fn gt(&self, value: impl Into<SqlValue>) -> Predicate<E> {
        Predicate::compare(self.clone(), CompareOp::Gt, value)
    }

    /// Field is greater than or equal to the given value.
    pub fn ge(&self, value: impl Into<SqlValue>) -> Predicate<E> {
        Predicate::compare(self.clone(), CompareOp::Ge, value)
    }

    /// Field is null.
    pub fn is_null(&self) -> Predicate<E> {
        Predicate::IsNull(self.clone())
    }

    /// Field is not null.
    pub fn is_not_null(&self) -> Predicate<E> {
        Predicate::IsNotNull(self.clone())
    }

    // ----- sort key constructors -----

    /// Sort ascending on this field.
    pub fn asc(&self) -> SortKey<E> {
        SortKey::new(self.clone(), SortOrder::Asc)
    }

    /// Sort descending on this field.
    pub fn desc(&self) -> SortKey<E> {
        SortKey::new(self.clone(), SortOrder::Desc)
    }
}

impl<E> Clone for Field<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            column: self.column,
            db_type: self.db_type,
            getter: Arc::clone(&self.getter),
        }
    }
}

impl<E> fmt::Debug for Field<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("column", &self.column)
            .field("db_type", &self.db_type)
            .finish_non_exhaustive()
    }
}

/// Binds one auto-increment field to the driver-returned generated key.
///
/// Created once per managed table at setup time and immutable thereafter.
/// The key mapper converts the numeric key the driver hands back into the
/// field's domain representation before the setter stores it.
pub struct GeneratedField<E> {
    field: Field<E>,
    setter: Setter<E>,
    key_mapper: Arc<dyn Fn(i64) -> SqlValue + Send + Sync>,
}

impl<E> GeneratedField<E> {
    /// Create a generated-field binding.
    pub fn new(
        field: Field<E>,
        setter: impl Fn(&mut E, SqlValue) + Send + Sync + 'static,
        key_mapper: impl Fn(i64) -> SqlValue + Send + Sync + 'static,
    ) -> Self {
        Self {
            field,
            setter: Arc::new(setter),
            key_mapper: Arc::new(key_mapper),
        }
    }

    /// The bound field.
    pub fn field(&self) -> &Field<E> {
        &self.field
    }

    /// Map a driver-returned generated key into the field's domain type and
    /// set it on the entity.
    pub fn populate(&self, entity: &mut E, key: i64) {
        let value = (self.key_mapper)(key);
        (self.setter)(entity, value);
    }
}

impl<E> Clone for GeneratedField<E> {
    fn clone(&self) -> Self {
        Self {
            field: self.field.clone(),
            setter: Arc::clone(&self.setter),
            key_mapper: Arc::clone(&self.key_mapper),
        }
    }
}

impl<E> fmt::Debug for GeneratedField<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedField")
            .field("field", &self.field)
            .finish_non_exhaustive()
    }
}

/// The ordered column layout of one managed table.
///
/// Fields appear in ordinal position order; the primary-key subset and
/// the generated (auto-increment) fields are tracked separately.
pub struct TableSchema<E> {
    table: &'static str,
    schema: Option<&'static str>,
    fields: Vec<Field<E>>,
    primary_key: Vec<&'static str>,
    generated: Vec<GeneratedField<E>>,
}

impl<E> TableSchema<E> {
    /// Start building a schema for the given table.
    pub fn builder(table: &'static str) -> TableSchemaBuilder<E> {
        TableSchemaBuilder {
            table,
            schema: None,
            fields: Vec::new(),
            primary_key: Vec::new(),
            generated: Vec::new(),
        }
    }

    /// The table name.
    pub fn table(&self) -> &'static str {
        self.table
    }

    /// The database schema the table lives in, if any.
    pub fn db_schema(&self) -> Option<&'static str> {
        self.schema
    }

    /// All fields in ordinal position order.
    pub fn fields(&self) -> &[Field<E>] {
        &self.fields
    }

    /// The primary-key fields, in declaration order.
    pub fn primary_key_fields(&self) -> impl Iterator<Item = &Field<E>> {
        self.primary_key
            .iter()
            .filter_map(|name| self.fields.iter().find(|f| f.name() == *name))
    }

    /// Whether the table has at least one primary-key column.
    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }

    /// The generated (auto-increment) fields, in declaration order.
    pub fn generated_fields(&self) -> &[GeneratedField<E>] {
        &self.generated
    }

    /// Whether the named field is populated by the database.
    pub fn is_generated(&self, name: &str) -> bool {
        self.generated.iter().any(|g| g.field().name() == name)
    }

    /// Look up a field by name.
    ///
    /// Referencing an unknown column is a configuration error, detected
    /// before any SQL is issued.
    pub fn field(&self, name: &str) -> SluiceResult<&Field<E>> {
        self.fields.iter().find(|f| f.name() == name).ok_or_else(|| {
            SluiceError::configuration(format!(
                "unknown column '{}' on table '{}'",
                name, self.table
            ))
        })
    }
}

impl<E> Clone for TableSchema<E> {
    fn clone(&self) -> Self {
        Self {
            table: self.table,
            schema: self.schema,
            fields: self.fields.clone(),
            primary_key: self.primary_key.clone(),
            generated: self.generated.clone(),
        }
    }
}

impl<E> fmt::Debug for TableSchema<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableSchema")
            .field("table", &self.table)
            .field("fields", &self.fields)
            .field("primary_key", &self.primary_key)
            .finish_non_exhaustive()
    }
}

/// Builder for [`TableSchema`].
pub struct TableSchemaBuilder<E> {
    table: &'static str,
    schema: Option<&'static str>,
    fields: Vec<Field<E>>,
    primary_key: Vec<&'static str>,
    generated: Vec<GeneratedField<E>>,
}

impl<E> TableSchemaBuilder<E> {
    /// Set the database schema the table lives in.
    pub fn db_schema(mut self, schema: &'static str) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Append a field at the next ordinal position.
    pub fn field(mut self, field: Field<E>) -> Self {
        self.fields.push(field);
        self
    }

    /// Mark a field as part of the primary key.
    pub fn primary_key(mut self, name: &'static str) -> Self {
        self.primary_key.push(name);
        self
    }

    /// Register an auto-increment field binding.
    pub fn generated(mut self, generated: GeneratedField<E>) -> Self {
        self.generated.push(generated);
        self
    }

    /// Finish the schema.
    pub fn build(self) -> TableSchema<E> {
        TableSchema {
            table: self.table,
            schema: self.schema,
            fields: self.fields,
            primary_key: self.primary_key,
            generated: self.generated,
        }
    }
}
