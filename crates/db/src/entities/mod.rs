//! `SeaORM` entity definitions.

pub mod prelude;

pub mod attachments;
pub mod posts;
pub mod users;
