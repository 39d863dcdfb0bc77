use std::fmt;
use uuid::Uuid;

/// Identity stamped on the processing claims taken by one running instance.
///
/// Any unique token satisfies the lease contract; a time-ordered UUID keeps
/// owners of the same host distinguishable across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClaimOwner(String);

impl ClaimOwner {
    /// A fresh owner identity for this process.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClaimOwner {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for ClaimOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
