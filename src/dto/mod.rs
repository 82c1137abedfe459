//! Read shapes produced by projections.

pub mod member;
pub mod member_team;

pub use member::{MemberDto, member_projection};
pub use member_team::MemberTeamRecord;
