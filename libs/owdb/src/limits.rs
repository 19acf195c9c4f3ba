//! Inclusive bounds on an indexed field

/// A `[min, max]` range where either end may be unbounded.
///
/// The `*_by` methods take a strict "greater than" comparator so the algebra
/// works for any value type; the plain methods use `PartialOrd`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> Default for Limits<T> {
    fn default() -> Self {
        Self::open()
    }
}

impl<T> Limits<T> {
    /// Unbounded on both sides
    pub fn open() -> Self {
        Self {
            min: None,
            max: None,
        }
    }

    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max }
    }

    pub fn at_least(min: T) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn at_most(max: T) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn exactly(value: T) -> Self
    where
        T: Clone,
    {
        Self {
            min: Some(value.clone()),
            max: Some(value),
        }
    }

    pub fn is_open(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// No value can satisfy the range: both ends set and `min > max`.
    pub fn is_impossible_by<F>(&self, gt: F) -> bool
    where
        F: Fn(&T, &T) -> bool,
    {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) => gt(min, max),
            _ => false,
        }
    }

    pub fn contains_by<F>(&self, value: &T, gt: F) -> bool
    where
        F: Fn(&T, &T) -> bool,
    {
        let above_min = self.min.as_ref().is_none_or(|min| !gt(min, value));
        let below_max = self.max.as_ref().is_none_or(|max| !gt(value, max));
        above_min && below_max
    }
}

impl<T: Clone> Limits<T> {
    /// Intersection. An impossible operand is returned as is.
    pub fn narrow_by<F>(&self, other: &Limits<T>, gt: F) -> Limits<T>
    where
        F: Fn(&T, &T) -> bool,
    {
        if self.is_impossible_by(&gt) {
            return self.clone();
        }
        if other.is_impossible_by(&gt) {
            return other.clone();
        }

        let min = match (&self.min, &other.min) {
            (None, b) => b.clone(),
            (a, None) => a.clone(),
            (Some(a), Some(b)) => Some(if gt(a, b) { a.clone() } else { b.clone() }),
        };
        let max = match (&self.max, &other.max) {
            (None, b) => b.clone(),
            (a, None) => a.clone(),
            (Some(a), Some(b)) => Some(if gt(a, b) { b.clone() } else { a.clone() }),
        };

        Limits { min, max }
    }

    /// Smallest range covering both. An impossible operand is discarded in
    /// favour of the other one.
    pub fn widen_by<F>(&self, other: &Limits<T>, gt: F) -> Limits<T>
    where
        F: Fn(&T, &T) -> bool,
    {
        if self.is_impossible_by(&gt) {
            return other.clone();
        }
        if other.is_impossible_by(&gt) {
            return self.clone();
        }

        let min = match (&self.min, &other.min) {
            (Some(a), Some(b)) => Some(if gt(a, b) { b.clone() } else { a.clone() }),
            _ => None,
        };
        let max = match (&self.max, &other.max) {
            (Some(a), Some(b)) => Some(if gt(a, b) { a.clone() } else { b.clone() }),
            _ => None,
        };

        Limits { min, max }
    }
}

fn greater<T: PartialOrd>(a: &T, b: &T) -> bool {
    a > b
}

impl<T: Clone + PartialOrd> Limits<T> {
    pub fn is_impossible(&self) -> bool {
        self.is_impossible_by(greater)
    }

    pub fn contains(&self, value: &T) -> bool {
        self.contains_by(value, greater)
    }

    pub fn narrow(&self, other: &Limits<T>) -> Limits<T> {
        self.narrow_by(other, greater)
    }

    pub fn widen(&self, other: &Limits<T>) -> Limits<T> {
        self.widen_by(other, greater)
    }
}
