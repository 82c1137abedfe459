//! Dynamic member/team queries with pagination.
//!
//! Search criteria become optional predicates, which are conjoined and run
//! through a [`repository::QueryBackend`] together with a projection that
//! maps each row into a read shape. Paged reads skip the count query when
//! the fetched slice already determines the total.

pub mod domain;
pub mod dto;
pub mod models;
pub mod pagination;
pub mod query;
pub mod repository;

#[cfg(feature = "sqlite")]
pub mod db;
#[cfg(feature = "sqlite")]
pub mod schema;

mod error_conversions;
