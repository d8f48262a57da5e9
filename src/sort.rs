//! Sortable list view model.
//!
//! Items expose named fields through [`Sortable`]; [`reorder`] produces a new,
//! stably sorted vector and never touches its input.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[serde(alias = "asc")]
    Ascending,
    #[serde(alias = "desc")]
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDescriptor {
    pub field: String,
    pub direction: SortDirection,
}

impl SortDescriptor {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn ascending(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Ascending)
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Descending)
    }
}

/// A comparable field value borrowed from an item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Number(f64),
    Text(&'a str),
    /// Length of a string sequence, e.g. `names.length`.
    Count(usize),
}

impl FieldValue<'_> {
    fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Count(c) => Some(*c as f64),
            FieldValue::Text(_) => None,
        }
    }

    /// Natural ordering: numerically for numbers and counts, lexicographically
    /// for text. Numbers sort before text when kinds are mixed.
    pub fn natural_cmp(&self, other: &FieldValue<'_>) -> Ordering {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => match (self, other) {
                (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
                _ => Ordering::Equal,
            },
        }
    }
}

/// Records that can be ordered by a named field.
pub trait Sortable {
    /// Value of `field`, or `None` if the record has no such field.
    fn field(&self, field: &str) -> Option<FieldValue<'_>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SortError {
    #[error("invalid sort field {field:?}: not present on item {index}")]
    InvalidField { field: String, index: usize },
}

/// Return `items` ordered by `descriptor`. Ties keep their input order in both
/// directions.
pub fn reorder<T>(items: &[T], descriptor: &SortDescriptor) -> Result<Vec<T>, SortError>
where
    T: Sortable + Clone,
{
    // Resolve every key up front so a missing field fails before any sorting.
    let mut keyed = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let value = item
            .field(&descriptor.field)
            .ok_or_else(|| SortError::InvalidField {
                field: descriptor.field.clone(),
                index,
            })?;
        keyed.push((value, item));
    }

    // `sort_by` is stable; reversing the comparator keeps equal keys in place.
    keyed.sort_by(|(a, _), (b, _)| match descriptor.direction {
        SortDirection::Ascending => a.natural_cmp(b),
        SortDirection::Descending => b.natural_cmp(a),
    });

    Ok(keyed.into_iter().map(|(_, item)| item.clone()).collect())
}

/// A fixed item collection plus the active sort descriptor.
#[derive(Debug, Clone)]
pub struct SortableListModel<T> {
    items: Vec<T>,
    descriptor: SortDescriptor,
}

impl<T> SortableListModel<T>
where
    T: Sortable + Clone,
{
    pub fn new(items: Vec<T>, descriptor: SortDescriptor) -> Self {
        Self { items, descriptor }
    }

    pub fn descriptor(&self) -> &SortDescriptor {
        &self.descriptor
    }

    /// Replace the active descriptor. Validation is deferred to the next
    /// [`view`](Self::view).
    pub fn set_descriptor(&mut self, descriptor: SortDescriptor) {
        tracing::debug!(field = %descriptor.field, direction = ?descriptor.direction, "sort descriptor changed");
        self.descriptor = descriptor;
    }

    /// Column-header click: the active field flips direction, any other field
    /// starts ascending.
    pub fn sort_by_column(&mut self, field: &str) {
        let next = if self.descriptor.field == field {
            SortDescriptor::new(field, self.descriptor.direction.flipped())
        } else {
            SortDescriptor::ascending(field)
        };
        self.set_descriptor(next);
    }

    pub fn view(&self) -> Result<Vec<T>, SortError> {
        reorder(&self.items, &self.descriptor)
    }
}
