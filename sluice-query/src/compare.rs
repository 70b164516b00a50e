//! Stream comparators: sort specifications that evaluate in memory and,
//! when field-based, render into ORDER BY clauses.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::dialect::Dialect;
use crate::field::Field;

/// Sort order for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    /// Ascending order (A-Z, 0-9, oldest first).
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0, newest first).
    Desc,
}

impl SortOrder {
    /// Get the SQL keyword for this sort order.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// One sort key: a field and a direction.
pub struct SortKey<E> {
    field: Field<E>,
    order: SortOrder,
}

impl<E> SortKey<E> {
    /// Create a sort key.
    pub fn new(field: Field<E>, order: SortOrder) -> Self {
        Self { field, order }
    }

    /// The field being sorted on.
    pub fn field(&self) -> &Field<E> {
        &self.field
    }

    /// The sort direction.
    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// Compare two entities on this key alone.
    fn compare(&self, a: &E, b: &E) -> Ordering {
        let ord = self
            .field
            .get(a)
            .compare(&self.field.get(b))
            .unwrap_or(Ordering::Equal);
        match self.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

impl<E> Clone for SortKey<E> {
    fn clone(&self) -> Self {
        Self {
            field: self.field.clone(),
            order: self.order,
        }
    }
}

impl<E> fmt::Debug for SortKey<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SortKey({} {})", self.field.column(), self.order)
    }
}

/// A comparator over entities of type `E`.
///
/// Key-based comparators evaluate in memory *and* translate into an
/// ORDER BY list; [`Comparator::Custom`] closures evaluate in memory only
/// and block pushdown for the sort action that carries them.
pub enum Comparator<E> {
    /// Ordered list of sort keys; earlier keys dominate.
    Keys(SmallVec<[SortKey<E>; 2]>),
    /// Opaque closure; cannot be pushed down.
    Custom(Arc<dyn Fn(&E, &E) -> Ordering + Send + Sync>),
}

impl<E> Comparator<E> {
    /// Create a comparator from a single sort key.
    pub fn by(key: SortKey<E>) -> Self {
        Self::Keys(SmallVec::from_iter([key]))
    }

    /// Create a comparator from several sort keys.
    pub fn by_keys(keys: impl IntoIterator<Item = SortKey<E>>) -> Self {
        Self::Keys(keys.into_iter().collect())
    }

    /// Create an opaque comparator from a closure.
    pub fn custom(cmp: impl Fn(&E, &E) -> Ordering + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(cmp))
    }

    /// Append a secondary sort key. No-op on custom comparators.
    pub fn then(self, key: SortKey<E>) -> Self {
        match self {
            Self::Keys(mut keys) => {
                keys.push(key);
                Self::Keys(keys)
            }
            custom @ Self::Custom(_) => custom,
        }
    }

    /// Compare two entities in memory.
    pub fn compare(&self, a: &E, b: &E) -> Ordering {
        match self {
            Self::Keys(keys) => keys
                .iter()
                .map(|k| k.compare(a, b))
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal),
            Self::Custom(cmp) => cmp(a, b),
        }
    }

    /// Whether this comparator renders into an ORDER BY list.
    pub fn is_translatable(&self) -> bool {
        matches!(self, Self::Keys(_))
    }

    /// Render the ORDER BY column list (without the `ORDER BY` keyword).
    ///
    /// Returns `None` for custom comparators and empty key lists.
    pub fn to_order_by(&self, dialect: &dyn Dialect) -> Option<String> {
        match self {
            Self::Keys(keys) if !keys.is_empty() => Some(
                keys.iter()
                    .map(|k| format!("{} {}", dialect.quote(k.field.column()), k.order.as_sql()))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            _ => None,
        }
    }
}

impl<E> Clone for Comparator<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Keys(keys) => Self::Keys(keys.clone()),
            Self::Custom(cmp) => Self::Custom(Arc::clone(cmp)),
        }
    }
}

impl<E> fmt::Debug for Comparator<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keys(keys) => f.debug_tuple("Keys").field(keys).finish(),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::StandardDialect;
    use crate::field::DbType;
    use crate::value::SqlValue;
    use pretty_assertions::assert_eq;

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

    fn users() -> Vec<User> {
        vec![
            User { id: 2, name: "Bea".into() },
            User { id: 1, name: "Ann".into() },
            User { id: 3, name: "Ann".into() },
        ]
    }

    #[test]
    fn test_single_key_sort() {
        let mut rows = users();
        let cmp = Comparator::by(id_field().asc());
        rows.sort_by(|a, b| cmp.compare(a, b));
        let ids: Vec<_> = rows.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_desc_sort() {
        let mut rows = users();
        let cmp = Comparator::by(id_field().desc());
        rows.sort_by(|a, b| cmp.compare(a, b));
        let ids: Vec<_> = rows.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_secondary_key() {
        let mut rows = users();
        let cmp = Comparator::by(name_field().asc()).then(id_field().desc());
        rows.sort_by(|a, b| cmp.compare(a, b));
        let ids: Vec<_> = rows.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_order_by_rendering() {
        let cmp = Comparator::by(name_field().asc()).then(id_field().desc());
        assert_eq!(
            cmp.to_order_by(&StandardDialect).unwrap(),
            "\"name\" ASC, \"id\" DESC"
        );
    }

    #[test]
    fn test_custom_is_not_translatable() {
        let cmp = Comparator::<User>::custom(|a, b| a.name.len().cmp(&b.name.len()));
        assert!(!cmp.is_translatable());
        assert!(cmp.to_order_by(&StandardDialect).is_none());
    }
}
