use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// Identifier of the consensus network a sign state belongs to.
///
/// Each chain gets its own watermark file; the coordinator layer routes
/// signing decisions by this id.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ChainId(String);

impl ChainId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Deref for ChainId {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl From<String> for ChainId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ChainId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
