//! Boolean filter trees
//!
//! Trees are immutable values: every combinator clones the receiver into a
//! new node, so one base filter can be shared by many derived ones.

use serde::{Deserialize, Serialize};

use crate::limits::Limits;

/// Leaf predicate of a filter tree.
///
/// Implementations hold optional per-field criteria that are implicitly
/// AND'd: an unset criterion accepts everything. `Index` is the designated
/// orderable field (usually a timestamp) that stores can range-scan.
pub trait Where {
    type Record;
    type Index: Clone + PartialOrd;

    fn matches(&self, record: &Self::Record) -> bool;

    /// Bounds on the indexed field; open when the field is unconstrained.
    fn index_limits(&self) -> Limits<Self::Index>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    And,
    Or,
    /// Applies to the first operand only
    Not,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterNode<W> {
    Condition(W),
    Operation {
        op: Operator,
        operands: Vec<FilterNode<W>>,
    },
}

impl<W> From<W> for FilterNode<W> {
    fn from(condition: W) -> Self {
        FilterNode::Condition(condition)
    }
}

impl<W> FilterNode<W> {
    pub fn is_operation(&self) -> bool {
        matches!(self, FilterNode::Operation { .. })
    }

    pub fn condition(&self) -> Option<&W> {
        match self {
            FilterNode::Condition(condition) => Some(condition),
            FilterNode::Operation { .. } => None,
        }
    }

    pub fn operator(&self) -> Option<Operator> {
        match self {
            FilterNode::Condition(_) => None,
            FilterNode::Operation { op, .. } => Some(*op),
        }
    }

    pub fn operands(&self) -> &[FilterNode<W>] {
        match self {
            FilterNode::Condition(_) => &[],
            FilterNode::Operation { operands, .. } => operands,
        }
    }
}

impl<W: Clone> FilterNode<W> {
    fn combine<I>(&self, op: Operator, others: I) -> Self
    where
        I: IntoIterator<Item = FilterNode<W>>,
    {
        let mut operands = vec![self.clone()];
        operands.extend(others);
        FilterNode::Operation { op, operands }
    }

    pub fn and(&self, other: impl Into<FilterNode<W>>) -> Self {
        self.combine(Operator::And, [other.into()])
    }

    pub fn and_all<I>(&self, others: I) -> Self
    where
        I: IntoIterator<Item = FilterNode<W>>,
    {
        self.combine(Operator::And, others)
    }

    pub fn or(&self, other: impl Into<FilterNode<W>>) -> Self {
        self.combine(Operator::Or, [other.into()])
    }

    pub fn or_all<I>(&self, others: I) -> Self
    where
        I: IntoIterator<Item = FilterNode<W>>,
    {
        self.combine(Operator::Or, others)
    }

    pub fn negate(&self) -> Self {
        FilterNode::Operation {
            op: Operator::Not,
            operands: vec![self.clone()],
        }
    }

    /// Remove double negations and normalise operands recursively. The
    /// result matches exactly the same records as `self`.
    pub fn simplify(&self) -> Self {
        match self {
            FilterNode::Condition(_) => self.clone(),
            FilterNode::Operation {
                op: Operator::Not,
                operands,
            } => match operands.first() {
                None => self.clone(),
                Some(FilterNode::Operation {
                    op: Operator::Not,
                    operands: inner,
                }) if !inner.is_empty() => inner[0].simplify(),
                Some(child) => FilterNode::Operation {
                    op: Operator::Not,
                    operands: vec![child.simplify()],
                },
            },
            FilterNode::Operation { op, operands } => FilterNode::Operation {
                op: *op,
                operands: operands.iter().map(FilterNode::simplify).collect(),
            },
        }
    }
}

impl<W: Where + Clone> FilterNode<W> {
    pub fn matches(&self, record: &W::Record) -> bool {
        match self {
            FilterNode::Condition(condition) => condition.matches(record),
            FilterNode::Operation { op, operands } => match op {
                Operator::And => operands.iter().all(|node| node.matches(record)),
                Operator::Or => operands.iter().any(|node| node.matches(record)),
                Operator::Not => operands
                    .first()
                    .is_some_and(|node| !node.matches(record)),
            },
        }
    }

    /// Bounds on the indexed field for every record this tree can match.
    ///
    /// This is a pruning hint: anything outside the bounds cannot match, but
    /// anything inside still has to go through [`FilterNode::matches`].
    pub fn index_limits(&self) -> Limits<W::Index> {
        self.simplify().simplified_limits()
    }

    fn simplified_limits(&self) -> Limits<W::Index> {
        match self {
            FilterNode::Condition(condition) => condition.index_limits(),
            FilterNode::Operation { op, operands } => match op {
                // inverting a range through negation is not attempted
                Operator::Not => Limits::open(),
                Operator::And => {
                    let mut limits = Limits::open();
                    for node in operands {
                        limits = limits.narrow(&node.simplified_limits());
                        if limits.is_impossible() {
                            break;
                        }
                    }
                    limits
                }
                Operator::Or => {
                    let all: Vec<Limits<W::Index>> =
                        operands.iter().map(FilterNode::simplified_limits).collect();
                    match all.iter().position(|limits| !limits.is_impossible()) {
                        Some(start) => all[start + 1..]
                            .iter()
                            .fold(all[start].clone(), |acc, limits| acc.widen(limits)),
                        None => all.into_iter().next().unwrap_or_else(Limits::open),
                    }
                }
            },
        }
    }
}
