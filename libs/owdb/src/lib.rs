//! Embedded filter engine
//!
//! A query is a tree of [`FilterNode`]s: leaves wrap a [`Where`] (a set of
//! per-field [`Criterion`]s that must all hold) and inner nodes combine
//! children with AND, OR or NOT. Besides deciding whether a record matches,
//! a tree can report [`Limits`] on one designated orderable field so that a
//! store can range-scan an index before evaluating the full predicate.

pub mod criterion;
pub mod filter;
pub mod limits;

pub use criterion::Criterion;
pub use filter::{FilterNode, Operator, Where};
pub use limits::Limits;
