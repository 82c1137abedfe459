//! Sort requests and their resolution against a projection.

use serde::{Deserialize, Serialize};

use crate::query::columns::Column;
use crate::query::projection::Selection;
use crate::repository::errors::{RepositoryError, RepositoryResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Placement of nulls. `Default` leaves it to the store; SQLite and the
/// in-memory backend both treat null as the smallest value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullOrdering {
    #[default]
    Default,
    First,
    Last,
}

/// A caller-facing sort request naming an output field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub nulls: NullOrdering,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
            nulls: NullOrdering::Default,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            direction: Direction::Desc,
            ..Self::asc(field)
        }
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls = NullOrdering::First;
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls = NullOrdering::Last;
        self
    }
}

/// A sort order bound to a schema column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortOrder {
    pub column: Column,
    pub direction: Direction,
    pub nulls: NullOrdering,
}

impl SortOrder {
    pub fn asc(column: Column) -> Self {
        Self {
            column,
            direction: Direction::Asc,
            nulls: NullOrdering::Default,
        }
    }
}

/// Binds each requested field to a column. Only the aliases exposed by the
/// projection are sortable.
pub fn resolve_sort(
    fields: &[SortField],
    selections: &[Selection],
) -> RepositoryResult<Vec<SortOrder>> {
    fields
        .iter()
        .map(|field| {
            selections
                .iter()
                .find(|selection| selection.alias == field.field)
                .map(|selection| SortOrder {
                    column: selection.column,
                    direction: field.direction,
                    nulls: field.nulls,
                })
                .ok_or_else(|| {
                    let allowed = selections
                        .iter()
                        .map(|selection| selection.alias)
                        .collect::<Vec<_>>()
                        .join(", ");
                    RepositoryError::InvalidSort(format!(
                        "unknown sort field `{}` (allowed: {allowed})",
                        field.field
                    ))
                })
        })
        .collect()
}
