//! Post domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use postline_shared::types::{AttachmentId, PostId, UserId};

use super::error::PostError;
use crate::attachment::Attachment;

/// A published post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Store-assigned id; the timeline cursor.
    pub id: PostId,
    /// Message text.
    pub content: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Author.
    pub owner_id: UserId,
    /// Linked attachment, if any.
    pub attachment: Option<Attachment>,
}

impl Post {
    /// Id of the linked attachment.
    #[must_use]
    pub fn attachment_id(&self) -> Option<AttachmentId> {
        self.attachment.as_ref().map(|a| a.id)
    }

    /// Whether `user` wrote this post.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner_id == user
    }
}

/// A validated post waiting to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    /// Message text.
    pub content: String,
    /// Author.
    pub owner_id: UserId,
}

impl NewPost {
    /// Minimum content length in characters.
    pub const MIN_CONTENT_CHARS: usize = 10;
    /// Maximum content length in characters.
    pub const MAX_CONTENT_CHARS: usize = 5000;

    /// Validate content and build a new post.
    ///
    /// # Errors
    ///
    /// Returns `InvalidContent` if the content length is out of range.
    pub fn new(content: impl Into<String>, owner_id: UserId) -> Result<Self, PostError> {
        let content = content.into();
        let chars = content.chars().count();
        if !(Self::MIN_CONTENT_CHARS..=Self::MAX_CONTENT_CHARS).contains(&chars) {
            return Err(PostError::InvalidContent(format!(
                "content must be between {} and {} characters, got {chars}",
                Self::MIN_CONTENT_CHARS,
                Self::MAX_CONTENT_CHARS
            )));
        }
        Ok(Self { content, owner_id })
    }
}

/// Which side of an anchor a relative timeline read looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Older posts, `id < anchor`.
    Before,
    /// Newer posts, `id > anchor`.
    #[default]
    After,
}

impl Direction {
    /// `after` in any case selects newer posts; every other value selects
    /// older ones.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("after") {
            Self::After
        } else {
            Self::Before
        }
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

/// Store-level filter for paged (descending) timeline reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimelineQuery {
    /// Only posts by this owner.
    pub owner: Option<UserId>,
    /// Only posts with `id < before`.
    pub before: Option<PostId>,
}

impl TimelineQuery {
    /// Whether a post passes this filter.
    #[must_use]
    pub fn matches(&self, post_id: PostId, owner_id: UserId) -> bool {
        self.owner.is_none_or(|o| o == owner_id) && self.before.is_none_or(|b| post_id < b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("short", false)]
    #[case("exactly 10", true)]
    #[case("a perfectly ordinary post", true)]
    #[case("ääääääääää", true)]
    fn test_content_length(#[case] content: &str, #[case] valid: bool) {
        assert_eq!(NewPost::new(content, UserId::new()).is_ok(), valid);
    }

    #[test]
    fn test_content_too_long() {
        let content = "x".repeat(NewPost::MAX_CONTENT_CHARS + 1);
        let err = NewPost::new(content, UserId::new()).unwrap_err();
        assert!(matches!(err, PostError::InvalidContent(_)));
    }

    #[test]
    fn test_query_matches() {
        let owner = UserId::new();
        let other = UserId::new();
        let query = TimelineQuery {
            owner: Some(owner),
            before: Some(PostId::new(5)),
        };

        assert!(query.matches(PostId::new(4), owner));
        assert!(!query.matches(PostId::new(5), owner));
        assert!(!query.matches(PostId::new(4), other));
        assert!(TimelineQuery::default().matches(PostId::new(99), other));
    }

    #[rstest]
    #[case("after", Direction::After)]
    #[case("AFTER", Direction::After)]
    #[case("After", Direction::After)]
    #[case("before", Direction::Before)]
    #[case("sideways", Direction::Before)]
    #[case("", Direction::Before)]
    fn test_direction_parse(#[case] raw: &str, #[case] expected: Direction) {
        assert_eq!(Direction::parse(raw), expected);
        let d: Direction = serde_json::from_value(serde_json::json!(raw)).unwrap();
        assert_eq!(d, expected);
    }

    #[test]
    fn test_direction_default_is_after() {
        assert_eq!(Direction::default(), Direction::After);
        assert_eq!(serde_json::to_string(&Direction::Before).unwrap(), "\"before\"");
    }
}
