//! Namespaced item keys.
//!
//! Item types are looked up by a stable string key such as `stw:wood`. Keys
//! without an explicit namespace fall into [`DEFAULT_NAMESPACE`], so `wood`
//! and `stw:wood` name the same type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Namespace applied when a key omits one.
pub const DEFAULT_NAMESPACE: &str = "stw";

const MAX_NAMESPACE_LEN: usize = 32;
const MAX_PATH_LEN: usize = 96;

/// Reasons an item key fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemKeyError {
    /// Nothing but whitespace was supplied.
    #[error("item key cannot be empty")]
    Empty,
    /// One half of `namespace:path` was blank.
    #[error("item key `{0}` has an empty namespace or path")]
    MissingPart(String),
    /// Namespace or path exceeded its length limit.
    #[error("item key `{0}` is too long")]
    TooLong(String),
    /// A character outside `a-z0-9_-./` (`/` only in the path).
    #[error("item key `{key}` contains invalid character {ch:?}")]
    InvalidChar {
        /// The rejected input.
        key: String,
        /// First offending character.
        ch: char,
    },
}

/// A validated `namespace:path` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemKey {
    namespace: String,
    path: String,
}

impl ItemKey {
    /// Parse `namespace:path` or a bare `path`.
    pub fn parse(input: &str) -> Result<Self, ItemKeyError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ItemKeyError::Empty);
        }

        let (namespace, path) = input
            .split_once(':')
            .unwrap_or((DEFAULT_NAMESPACE, input));
        if namespace.is_empty() || path.is_empty() {
            return Err(ItemKeyError::MissingPart(input.to_string()));
        }
        if namespace.len() > MAX_NAMESPACE_LEN || path.len() > MAX_PATH_LEN {
            return Err(ItemKeyError::TooLong(input.to_string()));
        }

        let bad_namespace = namespace.chars().find(|c| !is_key_char(*c, false));
        let bad_path = path.chars().find(|c| !is_key_char(*c, true));
        if let Some(ch) = bad_namespace.or(bad_path) {
            return Err(ItemKeyError::InvalidChar {
                key: input.to_string(),
                ch,
            });
        }

        Ok(Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
        })
    }

    /// Key namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Key path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

fn is_key_char(c: char, allow_slash: bool) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.') || (allow_slash && c == '/')
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for ItemKey {
    type Err = ItemKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ItemKey {
    type Error = ItemKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ItemKey> for String {
    fn from(key: ItemKey) -> Self {
        key.to_string()
    }
}
