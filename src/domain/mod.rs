//! Domain entities and search criteria for members and teams.

pub mod member;
pub mod search;
pub mod types;
