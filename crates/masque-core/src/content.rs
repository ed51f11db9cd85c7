//! Validated user input: post content and usernames.

use std::fmt;
use std::str::FromStr;

use snafu::Snafu;

/// Maximum length of a post, in characters
pub const MAX_POST_CONTENT_LEN: usize = 140;

#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
pub enum ContentValidationError {
    #[snafu(display("Post content must be at least one character long."))]
    Empty,
    #[snafu(display("Post content must be no more than {max} characters (got {len})."))]
    TooLong { len: usize, max: usize },
}

pub type ContentValidationResult<T> = std::result::Result<T, ContentValidationError>;

/// Content of a post, public or anonymous
///
/// Non-blank and at most [`MAX_POST_CONTENT_LEN`] characters. The text is
/// kept as submitted, surrounding whitespace included.
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[cfg_attr(feature = "bincode", derive(::bincode::Encode, ::bincode::Decode))]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PostContent(String);

impl PostContent {
    pub fn new(content: impl Into<String>) -> ContentValidationResult<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return EmptySnafu.fail();
        }
        let len = content.chars().count();
        if MAX_POST_CONTENT_LEN < len {
            return TooLongSnafu {
                len,
                max: MAX_POST_CONTENT_LEN,
            }
            .fail();
        }
        Ok(Self(content))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PostContent {
    type Err = ContentValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
pub enum UsernameValidationError {
    #[snafu(display("Provided username must be nonempty."))]
    EmptyUsername,
    #[snafu(display("Username must not contain whitespace."))]
    UsernameWhitespace,
}

/// Username of a public user. Case-sensitive.
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[cfg_attr(feature = "bincode", derive(::bincode::Encode, ::bincode::Decode))]
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Username(String);

impl Username {
    pub fn new(username: impl Into<String>) -> Result<Self, UsernameValidationError> {
        let username = username.into();
        if username.is_empty() {
            return EmptyUsernameSnafu.fail();
        }
        if username.chars().any(char::is_whitespace) {
            return UsernameWhitespaceSnafu.fail();
        }
        Ok(Self(username))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Username {
    type Err = UsernameValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_content_is_empty() {
        assert_eq!(PostContent::new(""), Err(ContentValidationError::Empty));
        assert_eq!(
            PostContent::new(" \t\n "),
            Err(ContentValidationError::Empty)
        );
    }

    #[test]
    fn length_limit_counts_characters() {
        assert!(PostContent::new("a".repeat(MAX_POST_CONTENT_LEN)).is_ok());
        // Multi-byte characters count once each
        assert!(PostContent::new("ł".repeat(MAX_POST_CONTENT_LEN)).is_ok());
        assert_eq!(
            PostContent::new("a".repeat(MAX_POST_CONTENT_LEN + 1)),
            Err(ContentValidationError::TooLong {
                len: MAX_POST_CONTENT_LEN + 1,
                max: MAX_POST_CONTENT_LEN
            })
        );
    }

    #[test]
    fn content_is_kept_verbatim() {
        let content = PostContent::new("  hello  ").expect("valid");
        assert_eq!(content.as_str(), "  hello  ");
    }

    #[test]
    fn usernames() {
        assert!(Username::new("alice").is_ok());
        assert_ne!(
            Username::new("Alice").expect("valid"),
            Username::new("alice").expect("valid")
        );
        assert_eq!(
            Username::new(""),
            Err(UsernameValidationError::EmptyUsername)
        );
        assert_eq!(
            Username::new("al ice"),
            Err(UsernameValidationError::UsernameWhitespace)
        );
    }
}
