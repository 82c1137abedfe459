//! Query building blocks: the schema descriptor, predicate trees and their
//! builders, projections and sort orders.

pub mod builder;
pub mod columns;
pub mod predicate;
pub mod projection;
pub mod sort;

pub use builder::{BooleanBuilder, conjoin, search_predicate};
pub use columns::{Column, Entity, JoinSpec, ValueKind};
pub use predicate::{CompareOp, Predicate, Value};
pub use projection::{Projection, Row, Selection};
pub use sort::{Direction, NullOrdering, SortField, SortOrder};
