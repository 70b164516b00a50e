//! The pipeline/action model: an immutable, ordered sequence of stream
//! operations over an abstract entity stream.
//!
//! A [`Pipeline`] is created per query call, consumed once and never
//! mutated in place; optimizer rewrites produce a new `Pipeline` value
//! containing only the actions left to run in memory. Actions are
//! identified by their position in the sequence, not by value — two
//! structurally identical filters at different positions are distinct
//! entries.
//!
//! # Example
//!
//! ```rust,ignore
//! let pipeline = Pipeline::new()
//!     .filter(user::id.eq(1))
//!     .sorted(Comparator::by(user::name.asc()))
//!     .skip(1);
//! assert_eq!(pipeline.len(), 3);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::compare::Comparator;
use crate::predicate::Predicate;

/// One stream operation.
pub enum Action<E> {
    /// Keep entities matching the predicate.
    Filter(Predicate<E>),
    /// Order entities with the comparator.
    Sort(Comparator<E>),
    /// Drop the first `n` entities.
    Skip(u64),
    /// Keep at most `n` entities.
    Limit(u64),
    /// Observe each entity without changing the stream.
    Peek(Arc<dyn Fn(&E) + Send + Sync>),
    /// Drop duplicate entities, keeping first occurrences.
    Distinct,
}

/// The kind of an action, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// A filter action.
    Filter,
    /// A sort action.
    Sort,
    /// A skip action.
    Skip,
    /// A limit action.
    Limit,
    /// A peek action.
    Peek,
    /// A distinct action.
    Distinct,
}

impl<E> Action<E> {
    /// The kind of this action.
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Filter(_) => ActionKind::Filter,
            Self::Sort(_) => ActionKind::Sort,
            Self::Skip(_) => ActionKind::Skip,
            Self::Limit(_) => ActionKind::Limit,
            Self::Peek(_) => ActionKind::Peek,
            Self::Distinct => ActionKind::Distinct,
        }
    }
}

impl<E> Clone for Action<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Filter(p) => Self::Filter(p.clone()),
            Self::Sort(c) => Self::Sort(c.clone()),
            Self::Skip(n) => Self::Skip(*n),
            Self::Limit(n) => Self::Limit(*n),
            Self::Peek(f) => Self::Peek(Arc::clone(f)),
            Self::Distinct => Self::Distinct,
        }
    }
}

impl<E> fmt::Debug for Action<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter(p) => f.debug_tuple("Filter").field(p).finish(),
            Self::Sort(c) => f.debug_tuple("Sort").field(c).finish(),
            Self::Skip(n) => f.debug_tuple("Skip").field(n).finish(),
            Self::Limit(n) => f.debug_tuple("Limit").field(n).finish(),
            Self::Peek(_) => write!(f, "Peek(..)"),
            Self::Distinct => write!(f, "Distinct"),
        }
    }
}

/// An immutable, ordered sequence of [`Action`]s.
///
/// The base (un-filtered) row source is supplied at execution time — by
/// the stream terminator for database-backed execution, or by any
/// iterator for in-memory evaluation — so a rewrite that only changes
/// the action list trivially preserves it.
pub struct Pipeline<E> {
    actions: Vec<Action<E>>,
}

impl<E> Pipeline<E> {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self { actions: Vec::new() }
    }

    /// Append a filter action.
    pub fn filter(mut self, predicate: Predicate<E>) -> Self {
        self.actions.push(Action::Filter(predicate));
        self
    }

    /// Append a sort action.
    pub fn sorted(mut self, comparator: Comparator<E>) -> Self {
        self.actions.push(Action::Sort(comparator));
        self
    }

    /// Append a skip action.
    pub fn skip(mut self, n: u64) -> Self {
        self.actions.push(Action::Skip(n));
        self
    }

    /// Append a limit action.
    pub fn limit(mut self, n: u64) -> Self {
        self.actions.push(Action::Limit(n));
        self
    }

    /// Append a peek action.
    pub fn peek(mut self, observer: impl Fn(&E) + Send + Sync + 'static) -> Self {
        self.actions.push(Action::Peek(Arc::new(observer)));
        self
    }

    /// Append a distinct action.
    pub fn distinct(mut self) -> Self {
        self.actions.push(Action::Distinct);
        self
    }

    /// The actions in order, read-only.
    pub fn actions(&self) -> &[Action<E>] {
        &self.actions
    }

    /// Number of actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the pipeline has no actions.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Produce a new pipeline over the same base source with a different
    /// action list. The receiver is untouched.
    pub fn rebuild(&self, actions: Vec<Action<E>>) -> Self {
        Self { actions }
    }
}

impl<E> Default for Pipeline<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Pipeline<E> {
    fn clone(&self) -> Self {
        Self {
            actions: self.actions.clone(),
        }
    }
}

impl<E> fmt::Debug for Pipeline<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.actions.iter()).finish()
    }
}

impl<E> FromIterator<Action<E>> for Pipeline<E> {
    fn from_iter<I: IntoIterator<Item = Action<E>>>(iter: I) -> Self {
        Self {
            actions: iter.into_iter().collect(),
        }
    }
}
