//! Projection descriptors: which columns a read selects and how each
//! fetched row becomes a value.
//!
//! Three binding styles are supported and produce equal values for equal
//! rows:
//!
//! * [`Projection::constructor`] feeds the row positionally to
//!   [`ConstructorProjection::construct`]; column kinds must line up with the
//!   declared parameters.
//! * [`Projection::fields`] assigns each cell to the target field named by
//!   its alias through [`FieldProjection::set_field`].
//! * [`Projection::accessors`] resolves each alias to a setter from
//!   [`AccessorProjection::ACCESSORS`] once, when the projection is built.

use std::fmt;

use crate::domain::types::{MemberId, TeamId};
use crate::query::columns::{Column, ValueKind};
use crate::query::predicate::Value;
use crate::repository::errors::{RepositoryError, RepositoryResult};

/// A column in the select list together with the output alias it is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Selection {
    pub column: Column,
    pub alias: &'static str,
}

impl Selection {
    /// Selects a column under its canonical alias.
    pub const fn new(column: Column) -> Self {
        Self {
            column,
            alias: column.alias(),
        }
    }

    pub const fn aliased(column: Column, alias: &'static str) -> Self {
        Self { column, alias }
    }
}

/// One fetched row: cells in select-list order, labelled with their aliases.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Row {
    cells: Vec<(&'static str, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, alias: &'static str, value: impl Into<Value>) -> Self {
        self.push(alias, value);
        self
    }

    pub fn push(&mut self, alias: &'static str, value: impl Into<Value>) {
        self.cells.push((alias, value.into()));
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.cells.get(index).map(|(_, value)| value)
    }

    pub fn by_alias(&self, alias: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(name, _)| *name == alias)
            .map(|(_, value)| value)
    }

    pub fn into_cells(self) -> Vec<(&'static str, Value)> {
        self.cells
    }

    pub fn into_values(self) -> Vec<Value> {
        self.cells.into_iter().map(|(_, value)| value).collect()
    }
}

/// Conversion from a cell value into a Rust field type.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> RepositoryResult<Self>;
}

fn mismatch(expected: &str, value: &Value) -> RepositoryError {
    RepositoryError::ValidationError(format!("expected {expected}, found {value:?}"))
}

impl FromValue for i64 {
    fn from_value(value: Value) -> RepositoryResult<Self> {
        match value {
            Value::Int(v) => Ok(v),
            other => Err(mismatch("integer", &other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> RepositoryResult<Self> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|_| {
            RepositoryError::ValidationError(format!("value {wide} does not fit in i32"))
        })
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> RepositoryResult<Self> {
        match value {
            Value::Text(v) => Ok(v),
            other => Err(mismatch("text", &other)),
        }
    }
}

impl FromValue for MemberId {
    fn from_value(value: Value) -> RepositoryResult<Self> {
        Ok(MemberId::new(i64::from_value(value)?)?)
    }
}

impl FromValue for TeamId {
    fn from_value(value: Value) -> RepositoryResult<Self> {
        Ok(TeamId::new(i64::from_value(value)?)?)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> RepositoryResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Pulls the next positional argument out of a row.
pub fn next_value<T, I>(values: &mut I) -> RepositoryResult<T>
where
    T: FromValue,
    I: Iterator<Item = Value>,
{
    let value = values
        .next()
        .ok_or_else(|| RepositoryError::ValidationError("row has too few columns".to_string()))?;
    T::from_value(value)
}

/// Targets built positionally from a row.
pub trait ConstructorProjection: Sized {
    /// Parameter kinds in constructor order.
    const PARAMETERS: &'static [ValueKind];

    fn construct(values: Vec<Value>) -> RepositoryResult<Self>;
}

/// Targets whose fields are assigned by name.
pub trait FieldProjection: Default {
    const FIELDS: &'static [&'static str];

    fn set_field(&mut self, name: &str, value: Value) -> RepositoryResult<()>;
}

/// A named setter.
pub struct Accessor<T> {
    pub name: &'static str,
    pub set: fn(&mut T, Value) -> RepositoryResult<()>,
}

/// Targets populated through a table of setters.
pub trait AccessorProjection: Default + 'static {
    const ACCESSORS: &'static [Accessor<Self>];
}

type RowFactory<T> = Box<dyn Fn(Row) -> RepositoryResult<T> + Send + Sync>;

/// Select list plus the factory that turns each row into a `T`.
pub struct Projection<T> {
    selections: Vec<Selection>,
    factory: RowFactory<T>,
}

impl<T> fmt::Debug for Projection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projection")
            .field("selections", &self.selections)
            .finish_non_exhaustive()
    }
}

impl<T> Projection<T> {
    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    pub fn map_row(&self, row: Row) -> RepositoryResult<T> {
        if row.len() != self.selections.len() {
            return Err(RepositoryError::ValidationError(format!(
                "row has {} columns, projection selects {}",
                row.len(),
                self.selections.len()
            )));
        }
        (self.factory)(row)
    }

    pub fn map_rows(&self, rows: Vec<Row>) -> RepositoryResult<Vec<T>> {
        rows.into_iter().map(|row| self.map_row(row)).collect()
    }
}

impl<T: ConstructorProjection + 'static> Projection<T> {
    pub fn constructor(selections: Vec<Selection>) -> RepositoryResult<Self> {
        if selections.len() != T::PARAMETERS.len() {
            return Err(RepositoryError::ValidationError(format!(
                "constructor takes {} arguments, {} columns selected",
                T::PARAMETERS.len(),
                selections.len()
            )));
        }
        for (position, (selection, kind)) in selections.iter().zip(T::PARAMETERS).enumerate() {
            if selection.column.kind() != *kind {
                return Err(RepositoryError::ValidationError(format!(
                    "argument {position} expects {kind:?}, column {} is {:?}",
                    selection.column,
                    selection.column.kind()
                )));
            }
        }
        Ok(Self {
            selections,
            factory: Box::new(|row: Row| T::construct(row.into_values())),
        })
    }
}

impl<T: FieldProjection + 'static> Projection<T> {
    pub fn fields(selections: Vec<Selection>) -> RepositoryResult<Self> {
        if let Some(unknown) = selections
            .iter()
            .find(|selection| !T::FIELDS.contains(&selection.alias))
        {
            return Err(RepositoryError::ValidationError(format!(
                "no field named `{}` to bind {} to",
                unknown.alias, unknown.column
            )));
        }
        Ok(Self {
            selections,
            factory: Box::new(|row: Row| {
                let mut target = T::default();
                for (alias, value) in row.into_cells() {
                    target.set_field(alias, value)?;
                }
                Ok(target)
            }),
        })
    }
}

impl<T: AccessorProjection> Projection<T> {
    pub fn accessors(selections: Vec<Selection>) -> RepositoryResult<Self> {
        let setters = selections
            .iter()
            .map(|selection| {
                T::ACCESSORS
                    .iter()
                    .find(|accessor| accessor.name == selection.alias)
                    .map(|accessor| accessor.set)
                    .ok_or_else(|| {
                        RepositoryError::ValidationError(format!(
                            "no accessor named `{}` to bind {} to",
                            selection.alias, selection.column
                        ))
                    })
            })
            .collect::<RepositoryResult<Vec<_>>>()?;
        Ok(Self {
            selections,
            factory: Box::new(move |row: Row| {
                let mut target = T::default();
                for (set, value) in setters.iter().zip(row.into_values()) {
                    set(&mut target, value)?;
                }
                Ok(target)
            }),
        })
    }
}
