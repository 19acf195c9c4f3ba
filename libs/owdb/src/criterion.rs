//! Single-field predicates

use serde::{Deserialize, Serialize};

use crate::limits::Limits;

/// A test applied to one field of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion<T> {
    Eq(T),
    Ne(T),
    Lt(T),
    Le(T),
    Gt(T),
    Ge(T),
    /// Inclusive on both ends
    Between(T, T),
    OneOf(Vec<T>),
}

impl<T: PartialOrd> Criterion<T> {
    pub fn accepts(&self, value: &T) -> bool {
        match self {
            Criterion::Eq(v) => value == v,
            Criterion::Ne(v) => value != v,
            Criterion::Lt(v) => value < v,
            Criterion::Le(v) => value <= v,
            Criterion::Gt(v) => value > v,
            Criterion::Ge(v) => value >= v,
            Criterion::Between(lo, hi) => value >= lo && value <= hi,
            Criterion::OneOf(values) => values.iter().any(|v| v == value),
        }
    }

    /// An absent value satisfies only `Ne`.
    pub fn accepts_opt(&self, value: Option<&T>) -> bool {
        match value {
            Some(value) => self.accepts(value),
            None => matches!(self, Criterion::Ne(_)),
        }
    }
}

impl<T: Clone + PartialOrd> Criterion<T> {
    /// Inclusive bounds containing every accepted value. Strict comparisons
    /// yield the inclusive bound, which over-approximates by one point.
    pub fn limits(&self) -> Limits<T> {
        match self {
            Criterion::Eq(v) => Limits::exactly(v.clone()),
            Criterion::Lt(v) | Criterion::Le(v) => Limits::at_most(v.clone()),
            Criterion::Gt(v) | Criterion::Ge(v) => Limits::at_least(v.clone()),
            Criterion::Between(lo, hi) => Limits::new(Some(lo.clone()), Some(hi.clone())),
            Criterion::OneOf(values) => {
                let mut iter = values.iter();
                match iter.next() {
                    Some(first) => iter.fold(Limits::exactly(first.clone()), |acc, v| {
                        acc.widen(&Limits::exactly(v.clone()))
                    }),
                    None => Limits::open(),
                }
            }
            Criterion::Ne(_) => Limits::open(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts() {
        assert!(Criterion::Eq(3).accepts(&3));
        assert!(!Criterion::Ne(3).accepts(&3));
        assert!(Criterion::Lt(3).accepts(&2));
        assert!(!Criterion::Lt(3).accepts(&3));
        assert!(Criterion::Le(3).accepts(&3));
        assert!(Criterion::Gt(3).accepts(&4));
        assert!(Criterion::Ge(3).accepts(&3));
        assert!(Criterion::Between(1, 3).accepts(&1));
        assert!(Criterion::Between(1, 3).accepts(&3));
        assert!(!Criterion::Between(1, 3).accepts(&4));
        assert!(Criterion::OneOf(vec![1, 5]).accepts(&5));
        assert!(!Criterion::<i32>::OneOf(vec![]).accepts(&5));
    }

    #[test]
    fn test_missing_value_only_matches_ne() {
        assert!(!Criterion::Eq("a".to_string()).accepts_opt(None));
        assert!(Criterion::Ne("a".to_string()).accepts_opt(None));
        assert!(Criterion::Eq("a".to_string()).accepts_opt(Some(&"a".to_string())));
    }

    #[test]
    fn test_limits_contain_every_accepted_value() {
        let criteria = vec![
            Criterion::Eq(4),
            Criterion::Ne(4),
            Criterion::Lt(4),
            Criterion::Le(4),
            Criterion::Gt(4),
            Criterion::Ge(4),
            Criterion::Between(2, 6),
            Criterion::OneOf(vec![7, 1, 3]),
        ];
        for criterion in criteria {
            let limits = criterion.limits();
            for x in -5..15 {
                if criterion.accepts(&x) {
                    assert!(limits.contains(&x), "{:?} at {}", criterion, x);
                }
            }
        }
    }

    #[test]
    fn test_one_of_limits_span_values() {
        assert_eq!(
            Criterion::OneOf(vec![7, 1, 3]).limits(),
            Limits::new(Some(1), Some(7))
        );
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&Criterion::Between(1, 2)).unwrap();
        assert_eq!(json, r#"{"between":[1,2]}"#);
        let back: Criterion<i32> = serde_json::from_str(r#"{"ge":5}"#).unwrap();
        assert_eq!(back, Criterion::Ge(5));
    }
}
