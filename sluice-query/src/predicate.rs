//! Stream predicates: filter conditions that evaluate in memory and, when
//! field-based, decompose into SQL WHERE fragments.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::dialect::Dialect;
use crate::field::Field;
use crate::value::SqlValue;

/// Comparison operators supported by field predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// Equals.
    Eq,
    /// Not equals.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl CompareOp {
    /// The SQL operator text.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Whether an in-memory comparison outcome satisfies this operator.
    pub fn matches(&self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

/// A predicate over entities of type `E`.
///
/// Field-based variants evaluate in memory *and* translate into SQL;
/// [`Predicate::Custom`] closures evaluate in memory only and block
/// pushdown for the filter action that carries them.
pub enum Predicate<E> {
    /// Matches every entity.
    Always,
    /// Simple comparison between a field and a constant.
    Compare {
        /// The field being compared.
        field: Field<E>,
        /// The comparison operator.
        op: CompareOp,
        /// The constant to compare against.
        value: SqlValue,
    },
    /// Field is null.
    IsNull(Field<E>),
    /// Field is not null.
    IsNotNull(Field<E>),
    /// Conjunction of predicates.
    And(Vec<Predicate<E>>),
    /// Opaque closure; cannot be pushed down.
    Custom(Arc<dyn Fn(&E) -> bool + Send + Sync>),
}

impl<E> Predicate<E> {
    /// Create a field comparison predicate.
    pub fn compare(field: Field<E>, op: CompareOp, value: impl Into<SqlValue>) -> Self {
        Self::Compare {
            field,
            op,
            value: value.into(),
        }
    }

    /// Create an opaque predicate from a closure.
    pub fn custom(test: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(test))
    }

    /// Conjoin predicates, flattening trivial cases.
    pub fn and(predicates: impl IntoIterator<Item = Predicate<E>>) -> Self {
        let mut flat: Vec<_> = predicates
            .into_iter()
            .filter(|p| !matches!(p, Self::Always))
            .collect();
        match flat.len() {
            0 => Self::Always,
            1 => flat.remove(0),
            _ => Self::And(flat),
        }
    }

    /// Evaluate the predicate against an entity in memory.
    pub fn test(&self, entity: &E) -> bool {
        match self {
            Self::Always => true,
            Self::Compare { field, op, value } => field
                .get(entity)
                .compare(value)
                .is_some_and(|ord| op.matches(ord)),
            Self::IsNull(field) => field.get(entity).is_null(),
            Self::IsNotNull(field) => !field.get(entity).is_null(),
            Self::And(children) => children.iter().all(|p| p.test(entity)),
            Self::Custom(test) => test(entity),
        }
    }

    /// Whether this predicate decomposes into simple SQL comparisons.
    pub fn is_translatable(&self) -> bool {
        match self {
            Self::Always | Self::Compare { .. } | Self::IsNull(_) | Self::IsNotNull(_) => true,
            Self::And(children) => children.iter().all(Predicate::is_translatable),
            Self::Custom(_) => false,
        }
    }

    /// Render the predicate as a WHERE fragment, appending bound values to
    /// `params`.
    ///
    /// Returns `None` for [`Predicate::Always`] (nothing to render) and for
    /// untranslatable shapes, which callers must not have consumed.
    pub fn to_sql(&self, dialect: &dyn Dialect, params: &mut Vec<SqlValue>) -> Option<String> {
        match self {
            Self::Always => None,
            Self::Compare { field, op, value } => {
                params.push(value.clone());
                Some(format!(
                    "{} {} {}",
                    dialect.quote(field.column()),
                    op.as_sql(),
                    dialect.placeholder(params.len())
                ))
            }
            Self::IsNull(field) => Some(format!("{} IS NULL", dialect.quote(field.column()))),
            Self::IsNotNull(field) => {
                Some(format!("{} IS NOT NULL", dialect.quote(field.column())))
            }
            Self::And(children) => {
                let parts: Vec<_> = children
                    .iter()
                    .filter_map(|p| p.to_sql(dialect, params))
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join(" AND "))
                }
            }
            Self::Custom(_) => None,
        }
    }
}

impl<E> Clone for Predicate<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Always => Self::Always,
            Self::Compare { field, op, value } => Self::Compare {
                field: field.clone(),
                op: *op,
                value: value.clone(),
            },
            Self::IsNull(field) => Self::IsNull(field.clone()),
            Self::IsNotNull(field) => Self::IsNotNull(field.clone()),
            Self::And(children) => Self::And(children.clone()),
            Self::Custom(test) => Self::Custom(Arc::clone(test)),
        }
    }
}

impl<E> fmt::Debug for Predicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "Always"),
            Self::Compare { field, op, value } => {
                write!(f, "Compare({} {} {:?})", field.column(), op.as_sql(), value)
            }
            Self::IsNull(field) => write!(f, "IsNull({})", field.column()),
            Self::IsNotNull(field) => write!(f, "IsNotNull({})", field.column()),
            Self::And(children) => f.debug_tuple("And").field(children).finish(),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}
