//! Entity re-exports.

pub use super::attachments::Entity as Attachments;
pub use super::posts::Entity as Posts;
pub use super::users::Entity as Users;
